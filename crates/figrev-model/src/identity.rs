//! Derived figure identity used by auto-publish.
//!
//! A [`FigureKey`] ties a rendering to the cell execution that produced it.
//! Explicit publish targets bypass the key entirely and are looked up by
//! name instead.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Cell identifier used when the host cannot supply one.
pub const UNKNOWN_CELL: &str = "Unknown";

/// Name used for artifacts with no detectable parent container or title.
pub const ANONYMOUS_FIGURE: &str = "Anonymous Figure";

/// Identity of an auto-published rendering within one notebook session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FigureKey {
    /// Host-provided cell id, or [`UNKNOWN_CELL`].
    pub cell_id: String,
    /// 1-based index of the renderable within its cell.
    pub figure_index: u32,
    /// Notebook session this key was derived in.
    pub session_id: String,
}

impl FigureKey {
    pub fn new(cell_id: impl Into<String>, figure_index: u32, session_id: impl Into<String>) -> Self {
        Self {
            cell_id: cell_id.into(),
            figure_index,
            session_id: session_id.into(),
        }
    }

    /// Auto-generated figure name for this key.
    pub fn auto_name(&self) -> String {
        format!("Cell {}, Figure {}", self.cell_id, self.figure_index)
    }
}

impl fmt::Display for FigureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}#{}@{}",
            self.cell_id, self.figure_index, self.session_id
        )
    }
}

/// Whether a resolved identity starts a new figure or extends an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Classification {
    NewFigure,
    NewRevision,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_name_matches_convention() {
        let key = FigureKey::new("abc", 1, "session-1");
        assert_eq!(key.auto_name(), "Cell abc, Figure 1");
    }

    #[test]
    fn unknown_cell_still_names() {
        let key = FigureKey::new(UNKNOWN_CELL, 2, "session-1");
        assert_eq!(key.auto_name(), "Cell Unknown, Figure 2");
    }
}
