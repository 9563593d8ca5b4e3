//! Per-panel session table.
//!
//! One entry per live notebook panel/kernel pairing, keyed by panel
//! identity; kernels are replaceable. Attaching a kernel to a panel that
//! already has one replaces the old state wholesale. Cleanup is explicit:
//! the host calls `dispose` from the panel's close event; nothing is
//! collected implicitly.
//!
//! Epochs make stale references detectable. An in-flight submission that
//! started before a kernel restart holds a handle with the old epoch, and
//! liveness checks against the table refuse it, so late completions never
//! write into replaced state.

use std::collections::HashMap;

use figrev_model::NotebookEvent;
use tracing::{debug, info};

/// Capability to touch one panel's session state, valid for one epoch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionHandle {
    pub panel: String,
    epoch: u64,
}

/// State owned by the table for one panel.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub kernel_id: String,
    /// Stable id for figure keys derived during this pairing.
    pub session_id: String,
    pub notebook: Option<NotebookEvent>,
    epoch: u64,
}

/// Session table keyed by panel identity.
#[derive(Debug, Default)]
pub struct SessionTable {
    sessions: HashMap<String, SessionState>,
    next_epoch: u64,
}

impl SessionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a kernel to a panel. Existing state for the panel is
    /// replaced, never merged; handles minted before this call go stale.
    pub fn attach(&mut self, panel: &str, kernel_id: &str) -> SessionHandle {
        self.next_epoch += 1;
        let epoch = self.next_epoch;
        let state = SessionState {
            kernel_id: kernel_id.to_string(),
            session_id: format!("session-{epoch}"),
            notebook: None,
            epoch,
        };
        if self.sessions.insert(panel.to_string(), state).is_some() {
            info!(panel, kernel_id, "replaced session on kernel restart");
        } else {
            debug!(panel, kernel_id, "attached session");
        }
        SessionHandle {
            panel: panel.to_string(),
            epoch,
        }
    }

    /// Remove a panel's state. Called from the panel's dispose/close hook.
    pub fn dispose(&mut self, panel: &str) {
        if self.sessions.remove(panel).is_some() {
            debug!(panel, "disposed session");
        }
    }

    /// Whether a handle still refers to the panel's current state.
    pub fn is_live(&self, handle: &SessionHandle) -> bool {
        self.sessions
            .get(&handle.panel)
            .is_some_and(|state| state.epoch == handle.epoch)
    }

    /// Current state for a live handle; `None` once the handle is stale.
    pub fn get(&self, handle: &SessionHandle) -> Option<&SessionState> {
        self.sessions
            .get(&handle.panel)
            .filter(|state| state.epoch == handle.epoch)
    }

    /// Record the latest notebook location event for a live handle.
    pub fn record_notebook(&mut self, handle: &SessionHandle, event: NotebookEvent) -> bool {
        match self.sessions.get_mut(&handle.panel) {
            Some(state) if state.epoch == handle.epoch => {
                state.notebook = Some(event);
                true
            }
            _ => false,
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
