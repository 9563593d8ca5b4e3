//! The live parameter set behind one widget.
//!
//! Shared by reference between the front-end control surface and the
//! execution side: the front-end writes edits, the execution side reads
//! the merged values before each re-execution. Numeric edits are clamped
//! to the declared bounds and snapped to the declared step before they
//! land.

use std::collections::BTreeMap;

use figrev_model::{ParamKind, ParamSpec, ParamValue, infer_spec};
use tracing::debug;

use crate::error::{Result, WidgetError};

/// Ordered mapping of parameter name to spec.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamSet {
    specs: BTreeMap<String, ParamSpec>,
}

impl ParamSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from plain default values, inferring widget kinds.
    pub fn from_defaults(defaults: BTreeMap<String, ParamValue>) -> Self {
        let specs = defaults
            .into_iter()
            .map(|(name, value)| {
                let spec = infer_spec(&value);
                (name, spec)
            })
            .collect();
        Self { specs }
    }

    pub fn insert(&mut self, name: impl Into<String>, spec: ParamSpec) {
        self.specs.insert(name.into(), spec);
    }

    pub fn get(&self, name: &str) -> Option<&ParamSpec> {
        self.specs.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamSpec)> {
        self.specs.iter()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Current values, the shape handed to the producing function.
    pub fn values(&self) -> BTreeMap<String, ParamValue> {
        self.specs
            .iter()
            .map(|(name, spec)| (name.clone(), spec.value.clone()))
            .collect()
    }

    /// Merge one edit. The stored value after a successful merge is the
    /// clamped one, which may differ from what the front-end sent.
    pub fn merge(&mut self, name: &str, value: ParamValue) -> Result<&ParamSpec> {
        let spec = self
            .specs
            .get_mut(name)
            .ok_or_else(|| WidgetError::UnknownParam(name.to_string()))?;
        let merged = merge_value(name, spec, value)?;
        if merged != spec.value {
            debug!(param = name, "merged widget edit");
        }
        spec.value = merged;
        Ok(&self.specs[name])
    }
}

fn merge_value(name: &str, spec: &ParamSpec, value: ParamValue) -> Result<ParamValue> {
    match spec.kind {
        ParamKind::Static => Err(WidgetError::NotEditable(name.to_string())),
        ParamKind::Slider => {
            let number = value.as_number().ok_or(WidgetError::TypeMismatch {
                name: name.to_string(),
                expected: "numeric",
            })?;
            Ok(ParamValue::Number(clamp(number, spec)))
        }
        ParamKind::Checkbox => match value {
            ParamValue::Bool(b) => Ok(ParamValue::Bool(b)),
            _ => Err(WidgetError::TypeMismatch {
                name: name.to_string(),
                expected: "boolean",
            }),
        },
        ParamKind::Dropdown => {
            let text = value.as_text().ok_or(WidgetError::TypeMismatch {
                name: name.to_string(),
                expected: "choice",
            })?;
            if !spec.choices.iter().any(|choice| choice == text) {
                return Err(WidgetError::InvalidChoice {
                    name: name.to_string(),
                    value: text.to_string(),
                });
            }
            Ok(ParamValue::Text(text.to_string()))
        }
        ParamKind::Text => match value {
            ParamValue::Text(s) => Ok(ParamValue::Text(s)),
            _ => Err(WidgetError::TypeMismatch {
                name: name.to_string(),
                expected: "text",
            }),
        },
    }
}

/// Clamp to `[min, max]`, then snap to the nearest step multiple counted
/// from the lower bound.
fn clamp(value: f64, spec: &ParamSpec) -> f64 {
    let mut v = value;
    if let Some(min) = spec.min {
        v = v.max(min);
    }
    if let Some(max) = spec.max {
        v = v.min(max);
    }
    if let (Some(min), Some(step)) = (spec.min, spec.step)
        && step > 0.0
    {
        let snapped = min + ((v - min) / step).round() * step;
        v = snapped;
        if let Some(max) = spec.max {
            v = v.min(max);
        }
    }
    v
}
