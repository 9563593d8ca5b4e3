//! Messages arriving from the host environment.

use serde::{Deserialize, Serialize};

/// Notebook metadata pushed by the front-end, once per kernel attach and
/// once per cell-state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotebookEvent {
    /// Current document location.
    pub url: String,
    /// Canonical notebook path.
    pub notebook_path: String,
    /// Path relative to the serving root.
    pub notebook_local_path: String,
    /// Display title.
    pub title: String,
}

/// What triggered a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ExecutionTrigger {
    /// A cell finished executing.
    CellRun { cell_id: Option<String> },
    /// A widget parameter changed and the producing function re-ran.
    ParamEdit { param: String },
}
