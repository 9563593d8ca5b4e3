//! Annotators attach auxiliary data and metadata to a draft revision.
//!
//! The pipeline is an explicit ordered list. Every annotator runs; one
//! failing is recorded on the draft as an error marker and the run
//! continues, so a best-effort revision is always produced. Overriding the
//! list at configuration time replaces it wholesale, with no hidden
//! defaults.

use std::collections::BTreeMap;

use figrev_model::{DataItem, FigrevError, NotebookEvent, Result, RevisionDraft};
use tracing::warn;

/// Host-side facts gathered before annotation runs.
#[derive(Debug, Clone, Default)]
pub struct CaptureContext {
    /// Notebook location event, when the front-end delivered one.
    pub notebook: Option<NotebookEvent>,
    pub cell_id: Option<String>,
    /// Source text of the executing cell.
    pub cell_code: Option<String>,
    pub session_id: String,
    /// Backend that captured the artifact.
    pub backend_name: String,
    /// Source of every cell executed so far this session, oldest first.
    pub history: Vec<String>,
    /// Dependency manifest lines, one crate/package per line.
    pub manifest: Vec<String>,
    /// Kernel and language facts (versions, implementation).
    pub runtime: BTreeMap<String, String>,
    /// Host facts (os, hostname, cpu).
    pub system: BTreeMap<String, String>,
}

/// One pluggable annotation step.
pub trait Annotator: Send + Sync {
    fn name(&self) -> &'static str;

    fn annotate(&self, draft: &mut RevisionDraft, context: &CaptureContext) -> Result<()>;
}

/// Ordered annotator list with per-annotator failure isolation.
pub struct AnnotatorPipeline {
    annotators: Vec<Box<dyn Annotator>>,
}

impl Default for AnnotatorPipeline {
    fn default() -> Self {
        Self::new(default_annotators())
    }
}

impl AnnotatorPipeline {
    pub fn new(annotators: Vec<Box<dyn Annotator>>) -> Self {
        Self { annotators }
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.annotators.iter().map(|a| a.name()).collect()
    }

    /// Run every annotator in order. A failure becomes a text item plus a
    /// metadata entry naming the annotator; later annotators still run.
    pub fn run(&self, draft: &mut RevisionDraft, context: &CaptureContext) {
        for annotator in &self.annotators {
            if let Err(err) = annotator.annotate(draft, context) {
                let err = FigrevError::Annotator {
                    name: annotator.name().to_string(),
                    message: err.to_string(),
                };
                warn!(annotator = annotator.name(), %err, "annotator failed");
                draft.push_item(DataItem::text(
                    format!("{} error", annotator.name()),
                    err.to_string(),
                ));
                draft.set_metadata(
                    format!("{}_error", annotator.name()),
                    serde_json::Value::String(err.to_string()),
                );
            }
        }
    }
}

const UNKNOWN_VALUE: &str = "Unknown";

/// Notebook name, path, and location.
pub struct NotebookAnnotator;

impl Annotator for NotebookAnnotator {
    fn name(&self) -> &'static str {
        "notebook"
    }

    fn annotate(&self, draft: &mut RevisionDraft, context: &CaptureContext) -> Result<()> {
        match &context.notebook {
            Some(event) => {
                draft.set_metadata("notebook_name", event.title.clone().into());
                draft.set_metadata("notebook_path", event.notebook_path.clone().into());
                draft.set_metadata("notebook_url", event.url.clone().into());
            }
            None => {
                warn!("notebook location unavailable, recording placeholders");
                draft.set_metadata("notebook_name", UNKNOWN_VALUE.into());
                draft.set_metadata("notebook_path", UNKNOWN_VALUE.into());
            }
        }
        Ok(())
    }
}

/// Kernel and language facts from the execution environment.
pub struct RuntimeAnnotator;

impl Annotator for RuntimeAnnotator {
    fn name(&self) -> &'static str {
        "runtime"
    }

    fn annotate(&self, draft: &mut RevisionDraft, context: &CaptureContext) -> Result<()> {
        for (key, value) in &context.runtime {
            draft.set_metadata(format!("runtime_{key}"), value.clone().into());
        }
        Ok(())
    }
}

/// Identifier of the executing cell.
pub struct CellIdAnnotator;

impl Annotator for CellIdAnnotator {
    fn name(&self) -> &'static str {
        "cell_id"
    }

    fn annotate(&self, draft: &mut RevisionDraft, context: &CaptureContext) -> Result<()> {
        let cell_id = context.cell_id.as_deref().unwrap_or(UNKNOWN_VALUE);
        draft.set_metadata("cell_id", cell_id.into());
        Ok(())
    }
}

/// Source text of the executing cell.
pub struct CellCodeAnnotator;

impl Annotator for CellCodeAnnotator {
    fn name(&self) -> &'static str {
        "cell_code"
    }

    fn annotate(&self, draft: &mut RevisionDraft, context: &CaptureContext) -> Result<()> {
        if let Some(code) = &context.cell_code {
            draft.push_item(DataItem::code("cell code", code.clone()));
        }
        Ok(())
    }
}

/// Host system facts.
pub struct SystemAnnotator;

impl Annotator for SystemAnnotator {
    fn name(&self) -> &'static str {
        "system"
    }

    fn annotate(&self, draft: &mut RevisionDraft, context: &CaptureContext) -> Result<()> {
        for (key, value) in &context.system {
            draft.set_metadata(format!("system_{key}"), value.clone().into());
        }
        Ok(())
    }
}

/// Dependency manifest of the environment, one package per line.
pub struct ManifestAnnotator;

impl Annotator for ManifestAnnotator {
    fn name(&self) -> &'static str {
        "manifest"
    }

    fn annotate(&self, draft: &mut RevisionDraft, context: &CaptureContext) -> Result<()> {
        if !context.manifest.is_empty() {
            draft.push_item(DataItem::text("dependencies", context.manifest.join("\n")));
        }
        Ok(())
    }
}

/// Which backend captured the artifact.
pub struct BackendAnnotator;

impl Annotator for BackendAnnotator {
    fn name(&self) -> &'static str {
        "backend"
    }

    fn annotate(&self, draft: &mut RevisionDraft, context: &CaptureContext) -> Result<()> {
        draft.set_metadata("backend", context.backend_name.clone().into());
        Ok(())
    }
}

/// Cumulative source of every cell executed so far this session.
pub struct HistoryAnnotator;

impl Annotator for HistoryAnnotator {
    fn name(&self) -> &'static str {
        "history"
    }

    fn annotate(&self, draft: &mut RevisionDraft, context: &CaptureContext) -> Result<()> {
        if !context.history.is_empty() {
            draft.push_item(DataItem::code("history", context.history.join("\n\n")));
        }
        Ok(())
    }
}

/// The standard annotator list, in its standard order.
pub fn default_annotators() -> Vec<Box<dyn Annotator>> {
    vec![
        Box::new(NotebookAnnotator),
        Box::new(RuntimeAnnotator),
        Box::new(CellIdAnnotator),
        Box::new(CellCodeAnnotator),
        Box::new(SystemAnnotator),
        Box::new(ManifestAnnotator),
        Box::new(BackendAnnotator),
        Box::new(HistoryAnnotator),
    ]
}
