//! Interactive parameter descriptors shared between the widget front-end
//! and the execution side.

use serde::{Deserialize, Serialize};

/// Widget control kind for one parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    Slider,
    Checkbox,
    Dropdown,
    Text,
    /// Shown but not editable; excluded from the interactive mapping.
    Static,
}

/// Current value of a parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl ParamValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// Declared bounds and choices for one interactive parameter.
///
/// Lifecycle: created when a reactive function is first wrapped, mutated by
/// widget edits, read before each re-execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub kind: ParamKind,
    pub value: ParamValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<String>,
}

impl ParamSpec {
    pub fn slider(value: f64, min: f64, max: f64, step: f64) -> Self {
        Self {
            kind: ParamKind::Slider,
            value: ParamValue::Number(value),
            min: Some(min),
            max: Some(max),
            step: Some(step),
            choices: Vec::new(),
        }
    }

    pub fn checkbox(value: bool) -> Self {
        Self {
            kind: ParamKind::Checkbox,
            value: ParamValue::Bool(value),
            min: None,
            max: None,
            step: None,
            choices: Vec::new(),
        }
    }

    pub fn dropdown(value: impl Into<String>, choices: Vec<String>) -> Self {
        Self {
            kind: ParamKind::Dropdown,
            value: ParamValue::Text(value.into()),
            min: None,
            max: None,
            step: None,
            choices,
        }
    }

    pub fn text(value: impl Into<String>) -> Self {
        Self {
            kind: ParamKind::Text,
            value: ParamValue::Text(value.into()),
            min: None,
            max: None,
            step: None,
            choices: Vec::new(),
        }
    }

    pub fn static_value(value: ParamValue) -> Self {
        Self {
            kind: ParamKind::Static,
            value,
            min: None,
            max: None,
            step: None,
            choices: Vec::new(),
        }
    }

    pub fn is_interactive(&self) -> bool {
        self.kind != ParamKind::Static
    }
}

/// Infer a widget kind from a plain value.
///
/// Booleans become checkboxes, numbers become sliders spanning an order of
/// magnitude around the default, strings become free-text inputs.
pub fn infer_spec(value: &ParamValue) -> ParamSpec {
    match value {
        ParamValue::Bool(b) => ParamSpec::checkbox(*b),
        ParamValue::Number(n) => {
            let magnitude = n.abs().max(1.0);
            ParamSpec::slider(*n, n - magnitude, n + magnitude, magnitude / 10.0)
        }
        ParamValue::Text(s) => ParamSpec::text(s.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_checkbox_from_bool() {
        let spec = infer_spec(&ParamValue::Bool(true));
        assert_eq!(spec.kind, ParamKind::Checkbox);
    }

    #[test]
    fn infers_slider_bounds_around_default() {
        let spec = infer_spec(&ParamValue::Number(20.0));
        assert_eq!(spec.kind, ParamKind::Slider);
        assert_eq!(spec.min, Some(0.0));
        assert_eq!(spec.max, Some(40.0));
    }

    #[test]
    fn spec_round_trips_through_json() {
        let spec = ParamSpec::dropdown("linear", vec!["linear".into(), "log".into()]);
        let json = serde_json::to_string(&spec).expect("serialize spec");
        let round: ParamSpec = serde_json::from_str(&json).expect("deserialize spec");
        assert_eq!(round, spec);
    }
}
