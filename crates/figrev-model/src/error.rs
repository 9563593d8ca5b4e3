use thiserror::Error;

/// Error taxonomy for the capture/publish pipeline.
///
/// Only [`FigrevError::Capture`] and [`FigrevError::SnapshotRestore`] abort a
/// publish attempt. Annotator failures are caught inside the pipeline and
/// recorded on the revision; identity problems degrade to placeholder values
/// with a warning.
#[derive(Debug, Error)]
pub enum FigrevError {
    /// No registered backend detected the artifact. Fatal for the attempt.
    #[error("capture failure: {0}")]
    Capture(String),

    /// An annotator raised. Recorded per-annotator, never fatal.
    #[error("annotator '{name}' failed: {message}")]
    Annotator { name: String, message: String },

    /// A snapshot could not be restored (missing backend, bad digest).
    #[error("snapshot restore failure: {0}")]
    SnapshotRestore(String),

    /// The external store rejected a submission. Surfaced, never retried.
    #[error("submission failure: {0}")]
    Submission(String),

    /// A named entity lookup failed and creation was not requested.
    #[error("not found: {kind} '{name}'")]
    NotFound { kind: String, name: String },

    /// A render step produced invalid output (e.g. undecodable raster bytes).
    #[error("render error: {0}")]
    Render(String),

    #[error("serialization error: {0}")]
    Serde(String),
}

impl FigrevError {
    pub fn capture(msg: impl Into<String>) -> Self {
        Self::Capture(msg.into())
    }

    pub fn snapshot_restore(msg: impl Into<String>) -> Self {
        Self::SnapshotRestore(msg.into())
    }

    pub fn submission(msg: impl Into<String>) -> Self {
        Self::Submission(msg.into())
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, FigrevError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            FigrevError::capture("x")
                .to_string()
                .contains("capture failure:")
        );
        assert!(
            FigrevError::snapshot_restore("x")
                .to_string()
                .contains("snapshot restore failure:")
        );
        assert!(
            FigrevError::submission("x")
                .to_string()
                .contains("submission failure:")
        );
    }

    #[test]
    fn annotator_error_names_the_annotator() {
        let err = FigrevError::Annotator {
            name: "history".to_string(),
            message: "boom".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("history"));
        assert!(text.contains("boom"));
    }
}
