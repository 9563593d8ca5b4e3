//! The publish engine: orchestrates capture, identity, annotation,
//! watermarking, and submission for one notebook session.
//!
//! A publish attempt moves through an explicit state machine. Capture is
//! the only stage whose failure aborts the attempt; annotation and
//! watermarking degrade in place, and a submission failure surfaces to the
//! caller without an internal retry.

use std::collections::BTreeMap;
use std::rc::Rc;

use figrev_model::{
    Classification, DataItem, FigrevError, FigureKey, ImageFormat, NodeKind, NodeRef,
    PublishConfig, Result, Revision, RevisionDraft, TargetSpec, WidgetStyle,
};
use tracing::{debug, info};

use crate::annotate::{AnnotatorPipeline, CaptureContext};
use crate::backend::{Artifact, BackendRegistry, RenderOptions};
use crate::identity::{CellContext, IdentityResolver};
use crate::snapshot;
use crate::store::Store;
use crate::watermark::Watermarker;

/// Stages of one publish attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishState {
    Draft,
    Captured,
    Annotated,
    Watermarked,
    /// Terminal success.
    Submitted,
    /// Terminal; only capture failures land here.
    Failed,
}

/// Result of a successful publish.
#[derive(Debug, Clone)]
pub struct PublishOutcome {
    pub revision: Revision,
    pub classification: Classification,
}

/// One renderable observed during the current cell run.
struct Observed {
    artifact: Rc<dyn Artifact>,
    key: FigureKey,
    /// Set once this object has been published during the run; the
    /// auto-publish sweep at cell end skips marked objects.
    published: bool,
}

/// State accumulated while one cell executes.
struct CellRun {
    context: CellContext,
    cell_code: Option<String>,
    observed: Vec<Observed>,
}

/// Facts about the host environment, filled in once per session.
#[derive(Debug, Clone, Default)]
pub struct HostInfo {
    pub notebook: Option<figrev_model::NotebookEvent>,
    pub history: Vec<String>,
    pub manifest: Vec<String>,
    pub runtime: BTreeMap<String, String>,
    pub system: BTreeMap<String, String>,
}

/// Publish pipeline for one notebook session.
pub struct PublishEngine {
    store: Rc<dyn Store>,
    registry: BackendRegistry,
    annotators: AnnotatorPipeline,
    watermarker: Watermarker,
    config: PublishConfig,
    host: HostInfo,
    session_id: String,
    /// Resolved lazily so a missing analysis surfaces at publish time.
    resolver: Option<IdentityResolver>,
    cell: Option<CellRun>,
}

impl PublishEngine {
    pub fn new(
        store: Rc<dyn Store>,
        registry: BackendRegistry,
        config: PublishConfig,
        session_id: impl Into<String>,
    ) -> Self {
        let watermarker = Watermarker::new(config.watermark.clone());
        Self {
            store,
            registry,
            annotators: AnnotatorPipeline::default(),
            watermarker,
            config,
            host: HostInfo::default(),
            session_id: session_id.into(),
            resolver: None,
            cell: None,
        }
    }

    /// Replace the annotator list wholesale.
    pub fn set_annotators(&mut self, annotators: AnnotatorPipeline) {
        self.annotators = annotators;
    }

    pub fn set_host_info(&mut self, host: HostInfo) {
        self.host = host;
    }

    pub fn registry_mut(&mut self) -> &mut BackendRegistry {
        &mut self.registry
    }

    /// Start a cell run. Any previous run's bookkeeping is dropped; the
    /// host is expected to have called [`PublishEngine::end_cell`] first.
    pub fn begin_cell(&mut self, cell_id: Option<&str>, cell_code: Option<&str>) {
        self.cell = Some(CellRun {
            context: CellContext::new(cell_id, self.session_id.clone()),
            cell_code: cell_code.map(str::to_string),
            observed: Vec::new(),
        });
        if let Some(code) = cell_code {
            self.host.history.push(code.to_string());
        }
    }

    /// Record a renderable displayed by the executing cell. Each distinct
    /// object gets the next per-cell figure key; observing the same object
    /// twice keeps its original key.
    pub fn observe(&mut self, artifact: Rc<dyn Artifact>) -> Result<FigureKey> {
        let run = self
            .cell
            .as_mut()
            .ok_or_else(|| FigrevError::capture("no cell is executing"))?;
        if let Some(seen) = run
            .observed
            .iter()
            .find(|obs| Rc::ptr_eq(&obs.artifact, &artifact))
        {
            return Ok(seen.key.clone());
        }
        let key = run.context.assign_next();
        debug!(key = %key, "observed renderable");
        run.observed.push(Observed {
            artifact,
            key: key.clone(),
            published: false,
        });
        Ok(key)
    }

    /// Publish an artifact.
    ///
    /// With no artifact, the most recently observed object in the current
    /// cell is used. With no target, the figure is resolved from the
    /// object's figure key. Every explicit call creates a revision, so the
    /// same object can be published repeatedly with different render
    /// options; only the auto-publish sweep in
    /// [`PublishEngine::end_cell`] skips already-published objects.
    pub fn publish(
        &mut self,
        artifact: Option<Rc<dyn Artifact>>,
        target: Option<TargetSpec>,
        render: &RenderOptions,
    ) -> Result<PublishOutcome> {
        let artifact = match artifact {
            Some(artifact) => artifact,
            None => self
                .cell
                .as_ref()
                .and_then(|run| run.observed.last())
                .map(|obs| Rc::clone(&obs.artifact))
                .ok_or_else(|| {
                    FigrevError::capture("no artifact was captured in the current cell")
                })?,
        };
        // Explicit calls on unobserved objects still participate in the
        // publish-once bookkeeping.
        let key = self.observe(Rc::clone(&artifact))?;

        let outcome = self.run_pipeline(&artifact, &key, target.as_ref(), render)?;
        self.mark_published(&artifact);
        Ok(outcome)
    }

    /// Finish the current cell run. With auto-publish enabled, every
    /// observed object not yet published gets one revision; objects an
    /// explicit call already handled are skipped. Returns one entry per
    /// auto-publish attempt, in observation order.
    pub fn end_cell(&mut self, render: &RenderOptions) -> Vec<(FigureKey, Result<Revision>)> {
        let Some(run) = self.cell.take() else {
            return Vec::new();
        };
        if !self.config.auto_publish {
            return Vec::new();
        }
        // Re-install the run so the pipeline sees the cell context.
        self.cell = Some(run);
        let pending: Vec<(Rc<dyn Artifact>, FigureKey)> = self
            .cell
            .as_ref()
            .map(|run| {
                run.observed
                    .iter()
                    .filter(|obs| !obs.published)
                    .map(|obs| (Rc::clone(&obs.artifact), obs.key.clone()))
                    .collect()
            })
            .unwrap_or_default();

        let mut results = Vec::with_capacity(pending.len());
        for (artifact, key) in pending {
            let result = self
                .run_pipeline(&artifact, &key, None, render)
                .map(|outcome| outcome.revision);
            if result.is_ok() {
                self.mark_published(&artifact);
            }
            results.push((key, result));
        }
        self.cell = None;
        results
    }

    /// Completion note for the UI, per the configured widget style.
    pub fn completion_message(&self, revision: &Revision) -> Option<String> {
        let sequence = revision.sequence;
        let name = &revision.figure.name;
        match self.config.widget {
            WidgetStyle::Detailed => Some(format!(
                "Published '{name}' revision {sequence} at {}",
                revision.created_on.to_rfc3339()
            )),
            WidgetStyle::Compact => Some(format!("{name} r{sequence}")),
            WidgetStyle::Hidden => None,
        }
    }

    pub fn store(&self) -> &Rc<dyn Store> {
        &self.store
    }

    fn mark_published(&mut self, artifact: &Rc<dyn Artifact>) {
        if let Some(run) = self.cell.as_mut()
            && let Some(obs) = run
                .observed
                .iter_mut()
                .find(|obs| Rc::ptr_eq(&obs.artifact, artifact))
        {
            obs.published = true;
        }
    }

    fn resolver(&mut self) -> Result<&IdentityResolver> {
        if self.resolver.is_none() {
            let workspace = match &self.config.workspace {
                Some(spec) => {
                    let (node, _) = self.store.find_or_create(
                        NodeKind::Workspace,
                        &spec.name,
                        None,
                        spec.create,
                    )?;
                    node
                }
                None => self.store.primary_workspace()?,
            };
            let analysis = self.config.analysis.as_ref().ok_or_else(|| {
                FigrevError::NotFound {
                    kind: NodeKind::Analysis.to_string(),
                    name: "<not configured>".to_string(),
                }
            })?;
            let (node, _) = self.store.find_or_create(
                NodeKind::Analysis,
                &analysis.name,
                Some(&workspace.id),
                analysis.create,
            )?;
            self.resolver = Some(IdentityResolver::new(node));
        }
        Ok(self.resolver.as_ref().expect("resolver just set"))
    }

    fn resolve_figure(
        &mut self,
        artifact: &dyn Artifact,
        key: &FigureKey,
        target: Option<&TargetSpec>,
    ) -> Result<(NodeRef, Classification)> {
        let store = Rc::clone(&self.store);
        let title = self
            .registry
            .detect(artifact)
            .and_then(|backend| backend.title(artifact));
        let resolver = self.resolver()?;
        match target {
            Some(target) => resolver.resolve_target(store.as_ref(), target),
            // A titled artifact publishes under its title; otherwise the
            // key's auto name (or the anonymous name) applies.
            None => match title {
                Some(title) => {
                    let spec = TargetSpec::ByName(
                        figrev_model::FindByName::new(title).create_if_missing(),
                    );
                    resolver.resolve_target(store.as_ref(), &spec)
                }
                None => {
                    resolver.resolve_key(store.as_ref(), key, artifact.has_parent_container())
                }
            },
        }
    }

    fn run_pipeline(
        &mut self,
        artifact: &Rc<dyn Artifact>,
        key: &FigureKey,
        target: Option<&TargetSpec>,
        render: &RenderOptions,
    ) -> Result<PublishOutcome> {
        let mut state = PublishState::Draft;
        debug!(?state, "publish stage");
        let (figure, classification) = self.resolve_figure(artifact.as_ref(), key, target)?;

        // Capture. The only fatal stage.
        let backend = match self.registry.require(artifact.as_ref()) {
            Ok(backend) => backend,
            Err(err) => {
                state = PublishState::Failed;
                debug!(?state, "capture failed");
                return Err(err);
            }
        };
        let rendered = backend.render(artifact.as_ref(), &self.config.image_formats, render)?;

        let mut draft = RevisionDraft::new(figure.clone());
        for (name, value) in &self.config.default_metadata {
            draft.set_metadata(name.clone(), value.clone());
        }
        for (format, output) in rendered {
            draft.push_item(DataItem::Image {
                name: "figure".to_string(),
                format,
                data: output.data,
                is_watermarked: false,
                width: output.width,
                height: output.height,
            });
        }
        for item in backend.data_items(artifact.as_ref()) {
            draft.push_item(item);
        }
        if backend.supports_interactive()
            && let Some(markup) = backend.render_interactive(artifact.as_ref())
        {
            draft.push_item(DataItem::Image {
                name: "figure".to_string(),
                format: ImageFormat::Html,
                data: markup.into_bytes(),
                is_watermarked: false,
                width: None,
                height: None,
            });
        }
        if self.config.save_snapshot {
            let blob = snapshot::snapshot(&self.registry, artifact.as_ref())?;
            draft.push_item(DataItem::Image {
                name: "figure".to_string(),
                format: ImageFormat::Snapshot,
                data: blob.to_bytes()?,
                is_watermarked: false,
                width: None,
                height: None,
            });
        }
        state = PublishState::Captured;
        debug!(?state, "publish stage");

        // Annotate. Failures are recorded on the draft, never raised.
        let context = CaptureContext {
            notebook: self.host.notebook.clone(),
            cell_id: self
                .cell
                .as_ref()
                .map(|run| run.context.cell_id.clone()),
            cell_code: self.cell.as_ref().and_then(|run| run.cell_code.clone()),
            session_id: self.session_id.clone(),
            backend_name: backend.name().to_string(),
            history: self.host.history.clone(),
            manifest: self.host.manifest.clone(),
            runtime: self.host.runtime.clone(),
            system: self.host.system.clone(),
        };
        self.annotators.run(&mut draft, &context);
        state = PublishState::Annotated;
        debug!(?state, "publish stage");

        // Watermark a copy of each image; originals stay untouched.
        let sequence = self.store.revision_count(&figure.id)? + 1;
        let identity = format!("{}/{}", figure.id, sequence);
        self.watermarker.apply(&mut draft, &identity);
        state = PublishState::Watermarked;
        debug!(?state, "publish stage");

        // Submit. Failures surface without retry.
        let mut revision = draft.into_revision(sequence);
        let id = self.store.submit(&revision)?;
        revision.id = Some(id);
        state = PublishState::Submitted;
        info!(
            figure = figure.name.as_str(),
            sequence,
            ?classification,
            ?state,
            "published revision"
        );
        Ok(PublishOutcome {
            revision,
            classification,
        })
    }
}
