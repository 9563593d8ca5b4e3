//! Bidirectional channel between the widget front-end and the execution
//! side.
//!
//! The front-end issues `(name, value)` edits against the shared parameter
//! set; the execution side merges them, re-runs the wrapped producing
//! function with the merged values, and hands the resulting artifact back
//! to the caller for re-entry into the publish pipeline. Only the
//! parameter mapping crosses the channel, never the function itself.
//!
//! Free-text edits are debounced; slider, checkbox, and dropdown edits
//! re-execute immediately.

use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::{Duration, Instant};

use figrev_core::Artifact;
use figrev_model::{ExecutionTrigger, ParamKind, ParamValue};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::debounce::{DEFAULT_DEBOUNCE, Debouncer};
use crate::error::{Result, WidgetError};
use crate::params::ParamSet;

/// The wrapped producing function: merged parameters in, artifact out.
pub type Producer = Box<dyn FnMut(&BTreeMap<String, ParamValue>) -> Rc<dyn Artifact>>;

/// One re-execution produced by an edit; the artifact re-enters the
/// publish pipeline.
#[derive(Debug)]
pub struct Reexecution {
    pub artifact: Rc<dyn Artifact>,
    pub trigger: ExecutionTrigger,
}

/// Execution-side end of the widget channel.
pub struct WidgetChannel {
    params: ParamSet,
    debouncer: Debouncer,
    producer: Producer,
}

impl WidgetChannel {
    pub fn new(params: ParamSet, producer: Producer) -> Self {
        Self::with_debounce(params, producer, DEFAULT_DEBOUNCE)
    }

    pub fn with_debounce(params: ParamSet, producer: Producer, window: Duration) -> Self {
        Self {
            params,
            debouncer: Debouncer::new(window),
            producer,
        }
    }

    pub fn params(&self) -> &ParamSet {
        &self.params
    }

    /// Snapshot of the shared state for the front-end.
    pub fn model(&self) -> FrontEndModel {
        FrontEndModel::from_params(&self.params)
    }

    /// Merge one front-end edit.
    ///
    /// Returns the re-execution it triggered, or `None` for a text edit
    /// now sitting in the debounce window; the host must keep calling
    /// [`WidgetChannel::poll`] until the window elapses.
    pub fn edit(
        &mut self,
        name: &str,
        value: ParamValue,
        now: Instant,
    ) -> Result<Option<Reexecution>> {
        let kind = self
            .params
            .get(name)
            .ok_or_else(|| WidgetError::UnknownParam(name.to_string()))?
            .kind;
        if kind == ParamKind::Text {
            if !matches!(value, ParamValue::Text(_)) {
                return Err(WidgetError::TypeMismatch {
                    name: name.to_string(),
                    expected: "text",
                });
            }
            debug!(param = name, "text edit held for debounce");
            self.debouncer.submit(name, value, now);
            return Ok(None);
        }
        self.params.merge(name, value)?;
        Ok(Some(self.reexecute(name)))
    }

    /// Release a debounced text edit whose window has elapsed.
    pub fn poll(&mut self, now: Instant) -> Result<Option<Reexecution>> {
        let Some((name, value)) = self.debouncer.poll(now) else {
            return Ok(None);
        };
        self.params.merge(&name, value)?;
        Ok(Some(self.reexecute(&name)))
    }

    /// Whether a text edit is waiting on its window.
    pub fn has_pending_edit(&self) -> bool {
        self.debouncer.has_pending()
    }

    fn reexecute(&mut self, param: &str) -> Reexecution {
        let values = self.params.values();
        let artifact = (self.producer)(&values);
        Reexecution {
            artifact,
            trigger: ExecutionTrigger::ParamEdit {
                param: param.to_string(),
            },
        }
    }
}

/// Front-end view of the shared parameter state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrontEndModel {
    /// Current value per parameter.
    pub params: BTreeMap<String, ParamValue>,
    /// Control metadata per parameter.
    pub param_meta: BTreeMap<String, ParamMeta>,
}

/// Everything the front-end needs to draw one control.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamMeta {
    #[serde(rename = "type")]
    pub kind: ParamKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<String>,
}

impl FrontEndModel {
    fn from_params(params: &ParamSet) -> Self {
        let mut values = BTreeMap::new();
        let mut meta = BTreeMap::new();
        for (name, spec) in params.iter() {
            values.insert(name.clone(), spec.value.clone());
            meta.insert(
                name.clone(),
                ParamMeta {
                    kind: spec.kind,
                    min: spec.min,
                    max: spec.max,
                    step: spec.step,
                    choices: spec.choices.clone(),
                },
            );
        }
        Self {
            params: values,
            param_meta: meta,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figrev_core::ChartArtifact;
    use figrev_model::ParamSpec;
    use std::cell::RefCell;

    fn params() -> ParamSet {
        let mut set = ParamSet::new();
        set.insert("bins", ParamSpec::slider(10.0, 0.0, 50.0, 1.0));
        set.insert("caption", ParamSpec::text(""));
        set
    }

    fn channel(runs: Rc<RefCell<Vec<BTreeMap<String, ParamValue>>>>) -> WidgetChannel {
        let producer: Producer = Box::new(move |values| {
            runs.borrow_mut().push(values.clone());
            Rc::new(ChartArtifact::figure(vec![(0.0, 0.0)]))
        });
        WidgetChannel::with_debounce(params(), producer, Duration::from_millis(300))
    }

    #[test]
    fn slider_edit_reexecutes_immediately_with_clamped_value() {
        let runs = Rc::new(RefCell::new(Vec::new()));
        let mut channel = channel(Rc::clone(&runs));

        let rerun = channel
            .edit("bins", ParamValue::Number(99.0), Instant::now())
            .unwrap()
            .expect("immediate re-execution");
        assert_eq!(
            rerun.trigger,
            ExecutionTrigger::ParamEdit {
                param: "bins".to_string()
            }
        );
        assert_eq!(runs.borrow().len(), 1);
        assert_eq!(runs.borrow()[0]["bins"], ParamValue::Number(50.0));
    }

    #[test]
    fn three_rapid_text_edits_reexecute_once_with_last_value() {
        let runs = Rc::new(RefCell::new(Vec::new()));
        let mut channel = channel(Rc::clone(&runs));
        let start = Instant::now();

        for (offset, text) in [(0u64, "d"), (50, "do"), (100, "dose")] {
            let result = channel
                .edit(
                    "caption",
                    ParamValue::Text(text.to_string()),
                    start + Duration::from_millis(offset),
                )
                .unwrap();
            assert!(result.is_none());
        }
        assert!(channel.has_pending_edit());
        assert!(channel.poll(start + Duration::from_millis(200)).unwrap().is_none());

        let rerun = channel
            .poll(start + Duration::from_millis(450))
            .unwrap()
            .expect("window elapsed");
        assert_eq!(
            rerun.trigger,
            ExecutionTrigger::ParamEdit {
                param: "caption".to_string()
            }
        );
        assert_eq!(runs.borrow().len(), 1);
        assert_eq!(runs.borrow()[0]["caption"], ParamValue::Text("dose".into()));
    }

    #[test]
    fn unknown_param_edit_is_rejected_without_reexecution() {
        let runs = Rc::new(RefCell::new(Vec::new()));
        let mut channel = channel(Rc::clone(&runs));
        let err = channel
            .edit("missing", ParamValue::Number(1.0), Instant::now())
            .unwrap_err();
        assert!(matches!(err, WidgetError::UnknownParam(_)));
        assert!(runs.borrow().is_empty());
    }

    #[test]
    fn model_carries_values_and_meta() {
        let runs = Rc::new(RefCell::new(Vec::new()));
        let channel = channel(runs);
        let model = channel.model();

        assert_eq!(model.params["bins"], ParamValue::Number(10.0));
        let json = serde_json::to_value(&model).unwrap();
        assert_eq!(json["param_meta"]["bins"]["type"], "slider");
        assert_eq!(json["param_meta"]["bins"]["max"], 50.0);

        let round: FrontEndModel = serde_json::from_value(json).unwrap();
        assert_eq!(round, model);
    }
}
