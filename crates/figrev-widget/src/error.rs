use thiserror::Error;

/// Errors raised while merging widget edits into the parameter set.
#[derive(Debug, Error)]
pub enum WidgetError {
    #[error("unknown parameter '{0}'")]
    UnknownParam(String),

    #[error("parameter '{0}' is not editable")]
    NotEditable(String),

    #[error("parameter '{name}' does not accept '{value}'")]
    InvalidChoice { name: String, value: String },

    #[error("parameter '{name}' expects a {expected} value")]
    TypeMismatch { name: String, expected: &'static str },
}

pub type Result<T> = std::result::Result<T, WidgetError>;
