//! Data model shared across the figrev workspace: hierarchy references,
//! revisions and their data items, figure identity, parameter specs,
//! configuration, and the error taxonomy.

pub mod entity;
pub mod error;
pub mod event;
pub mod identity;
pub mod options;
pub mod params;
pub mod revision;

pub use entity::{FindByName, NodeId, NodeKind, NodeRef, TargetSpec};
pub use error::{FigrevError, Result};
pub use event::{ExecutionTrigger, NotebookEvent};
pub use identity::{ANONYMOUS_FIGURE, Classification, FigureKey, UNKNOWN_CELL};
pub use options::{PublishConfig, WatermarkOptions, WidgetStyle};
pub use params::{ParamKind, ParamSpec, ParamValue, infer_spec};
pub use revision::{
    CodeLanguage, DataItem, ImageFormat, Revision, RevisionDraft, RevisionId,
};
