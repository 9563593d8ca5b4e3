//! Figure identity resolution.
//!
//! Two paths lead to a figure reference. Explicit publish calls carry a
//! [`TargetSpec`] that is looked up (or created) by name. Auto-publish
//! derives a [`FigureKey`] from the executing cell and a per-cell counter,
//! then resolves the key's auto name within the configured analysis. Either
//! way the result is classified as a brand-new figure or a new revision of
//! an existing one.

use figrev_model::{
    ANONYMOUS_FIGURE, Classification, FigrevError, FigureKey, NodeKind, NodeRef, Result,
    TargetSpec, UNKNOWN_CELL,
};
use tracing::warn;

use crate::store::Store;

/// Execution context for one cell run.
///
/// Assigns 1-based figure keys to distinct renderable objects observed
/// during the run. A fresh context is created each time a cell starts
/// executing; the counter never resets mid-run.
#[derive(Debug, Clone)]
pub struct CellContext {
    pub cell_id: String,
    pub session_id: String,
    next_index: u32,
}

impl CellContext {
    /// Start a cell run. A host that cannot supply a cell id degrades to
    /// the placeholder with a warning; resolution never fails over it.
    pub fn new(cell_id: Option<&str>, session_id: impl Into<String>) -> Self {
        let cell_id = match cell_id {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => {
                warn!("host supplied no cell id, publishing under the placeholder");
                UNKNOWN_CELL.to_string()
            }
        };
        Self {
            cell_id,
            session_id: session_id.into(),
            next_index: 0,
        }
    }

    /// Key for the next distinct renderable observed in this cell.
    pub fn assign_next(&mut self) -> FigureKey {
        self.next_index += 1;
        FigureKey::new(&self.cell_id, self.next_index, &self.session_id)
    }

    /// How many renderables have been observed so far.
    pub fn observed(&self) -> u32 {
        self.next_index
    }
}

/// Resolves figure references within one configured analysis.
#[derive(Debug, Clone)]
pub struct IdentityResolver {
    analysis: NodeRef,
}

impl IdentityResolver {
    pub fn new(analysis: NodeRef) -> Self {
        Self { analysis }
    }

    pub fn analysis(&self) -> &NodeRef {
        &self.analysis
    }

    /// Resolve an explicit publish target.
    pub fn resolve_target(
        &self,
        store: &dyn Store,
        target: &TargetSpec,
    ) -> Result<(NodeRef, Classification)> {
        match target {
            TargetSpec::Resolved(node) => {
                if node.kind != NodeKind::Figure {
                    return Err(FigrevError::NotFound {
                        kind: NodeKind::Figure.to_string(),
                        name: node.name.clone(),
                    });
                }
                Ok((node.clone(), Classification::NewRevision))
            }
            TargetSpec::ByName(spec) => {
                let (node, created) = store.find_or_create(
                    NodeKind::Figure,
                    &spec.name,
                    Some(&self.analysis.id),
                    spec.create,
                )?;
                Ok((node, classify(created)))
            }
        }
    }

    /// Resolve an auto-publish key. Objects with no detectable parent
    /// container publish under the anonymous name instead of the key's
    /// auto name; lookups are by name within the analysis, so re-running
    /// the same cell later lands on the same figure.
    pub fn resolve_key(
        &self,
        store: &dyn Store,
        key: &FigureKey,
        has_parent_container: bool,
    ) -> Result<(NodeRef, Classification)> {
        let name = if has_parent_container {
            key.auto_name()
        } else {
            ANONYMOUS_FIGURE.to_string()
        };
        let (node, created) =
            store.find_or_create(NodeKind::Figure, &name, Some(&self.analysis.id), true)?;
        Ok((node, classify(created)))
    }
}

fn classify(created: bool) -> Classification {
    if created {
        Classification::NewFigure
    } else {
        Classification::NewRevision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use figrev_model::FindByName;
    use proptest::prelude::*;

    fn resolver(store: &MemoryStore) -> IdentityResolver {
        let (analysis, _) = store
            .find_or_create(NodeKind::Analysis, "Study", None, true)
            .unwrap();
        IdentityResolver::new(analysis)
    }

    #[test]
    fn keys_count_up_from_one() {
        let mut ctx = CellContext::new(Some("abc"), "session-1");
        assert_eq!(ctx.assign_next().auto_name(), "Cell abc, Figure 1");
        assert_eq!(ctx.assign_next().auto_name(), "Cell abc, Figure 2");
        assert_eq!(ctx.observed(), 2);
    }

    #[test]
    fn missing_cell_id_degrades_to_placeholder() {
        let mut ctx = CellContext::new(None, "session-1");
        assert_eq!(ctx.cell_id, UNKNOWN_CELL);
        assert_eq!(ctx.assign_next().auto_name(), "Cell Unknown, Figure 1");
    }

    #[test]
    fn first_key_resolution_creates_then_reuses() {
        let store = MemoryStore::new();
        let resolver = resolver(&store);
        let key = FigureKey::new("abc", 1, "session-1");

        let (first, classification) = resolver.resolve_key(&store, &key, true).unwrap();
        assert_eq!(classification, Classification::NewFigure);
        assert_eq!(first.name, "Cell abc, Figure 1");

        // Same cell re-run later: same name, existing figure.
        let (second, classification) = resolver.resolve_key(&store, &key, true).unwrap();
        assert_eq!(classification, Classification::NewRevision);
        assert_eq!(second.id, first.id);
    }

    #[test]
    fn containerless_object_publishes_anonymously() {
        let store = MemoryStore::new();
        let resolver = resolver(&store);
        let key = FigureKey::new("abc", 2, "session-1");
        let (node, _) = resolver.resolve_key(&store, &key, false).unwrap();
        assert_eq!(node.name, ANONYMOUS_FIGURE);
    }

    #[test]
    fn explicit_lookup_without_create_errors() {
        let store = MemoryStore::new();
        let resolver = resolver(&store);
        let target = TargetSpec::ByName(FindByName::new("Tumor growth"));
        let err = resolver.resolve_target(&store, &target).unwrap_err();
        assert!(matches!(err, FigrevError::NotFound { .. }));
    }

    #[test]
    fn explicit_create_classifies_as_new_figure() {
        let store = MemoryStore::new();
        let resolver = resolver(&store);
        let target = TargetSpec::ByName(FindByName::new("Tumor growth").create_if_missing());
        let (node, classification) = resolver.resolve_target(&store, &target).unwrap();
        assert_eq!(classification, Classification::NewFigure);
        assert_eq!(node.name, "Tumor growth");

        let (_, classification) = resolver.resolve_target(&store, &target).unwrap();
        assert_eq!(classification, Classification::NewRevision);
    }

    proptest! {
        #[test]
        fn auto_names_count_up_for_any_cell_id(
            cell_id in "[A-Za-z0-9_-]{1,16}",
            count in 1u32..24,
        ) {
            let mut ctx = CellContext::new(Some(&cell_id), "session-1");
            for expected in 1..=count {
                let key = ctx.assign_next();
                prop_assert_eq!(
                    key.auto_name(),
                    format!("Cell {cell_id}, Figure {expected}")
                );
            }
            prop_assert_eq!(ctx.observed(), count);
        }
    }
}
