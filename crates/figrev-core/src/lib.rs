//! Capture, identity resolution, annotation, watermarking, and publishing
//! of notebook figure revisions.
//!
//! The pipeline runs synchronously inside the host's cell-execution
//! callback: a renderable is observed, a backend captures it, annotators
//! attach provenance, the watermarker stamps copies of the rendered
//! images, and the finished revision goes to the external store through
//! the submission contract in [`store`].

pub mod annotate;
pub mod artifacts;
pub mod backend;
pub mod identity;
pub mod publish;
pub mod session;
pub mod snapshot;
pub mod store;
pub mod watermark;

pub use annotate::{Annotator, AnnotatorPipeline, CaptureContext, default_annotators};
pub use artifacts::{
    ChartArtifact, ChartBackend, SceneArtifact, SceneBackend, TableArtifact, TableBackend,
};
pub use backend::{
    Artifact, BackendRegistry, CaptureBackend, RenderOptions, Rendered, build_default_registry,
};
pub use identity::{CellContext, IdentityResolver};
pub use publish::{HostInfo, PublishEngine, PublishOutcome, PublishState};
pub use session::{SessionHandle, SessionState, SessionTable};
pub use snapshot::{SnapshotBlob, restore, snapshot};
pub use store::{MemoryStore, Store};
pub use watermark::Watermarker;
