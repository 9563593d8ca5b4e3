//! Debouncing for free-text edits.
//!
//! Typing fires an edit per keystroke; re-running the producing function
//! on each one is wasteful. Edits submitted within the window collapse to
//! the last value, which is released once the window elapses with no
//! newer edit. The clock is an explicit argument so tests control time.

use std::time::{Duration, Instant};

use figrev_model::ParamValue;

/// Default quiet window before a pending text edit fires.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

#[derive(Debug, Clone)]
struct Pending {
    name: String,
    value: ParamValue,
    deadline: Instant,
}

/// Collapses rapid edits to one release per quiet window.
#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    pending: Option<Pending>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: None,
        }
    }

    /// Record an edit. A newer edit replaces the pending value and pushes
    /// the deadline out; nothing is released here.
    pub fn submit(&mut self, name: &str, value: ParamValue, now: Instant) {
        self.pending = Some(Pending {
            name: name.to_string(),
            value,
            deadline: now + self.window,
        });
    }

    /// Release the pending edit if its window has elapsed.
    pub fn poll(&mut self, now: Instant) -> Option<(String, ParamValue)> {
        if self.pending.as_ref().is_some_and(|p| now >= p.deadline) {
            let fired = self.pending.take().expect("pending just checked");
            return Some((fired.name, fired.value));
        }
        None
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Instant at which the pending edit will fire, when one exists.
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|p| p.deadline)
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}
