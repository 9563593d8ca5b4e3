//! Submission contract to the external store, plus an in-memory
//! implementation used by tests.
//!
//! The store owns the Workspace → Analysis → Figure hierarchy and the
//! durable revision records. The pipeline only resolves names through
//! `find_or_create` and hands finished revisions to `submit`; retry policy
//! and transport concerns stay on the store side.

use std::collections::BTreeMap;
use std::sync::Mutex;

use figrev_model::{FigrevError, NodeId, NodeKind, NodeRef, Result, Revision, RevisionId};
use tracing::info;

/// External persistence contract.
pub trait Store: Send + Sync {
    /// Resolve a node by `(kind, name, parent)`, creating it when `create`
    /// is set. Returns the node plus whether this call created it.
    fn find_or_create(
        &self,
        kind: NodeKind,
        name: &str,
        parent: Option<&NodeId>,
        create: bool,
    ) -> Result<(NodeRef, bool)>;

    /// Persist a finished revision. Submission failures surface to the
    /// caller; the pipeline never retries.
    fn submit(&self, revision: &Revision) -> Result<RevisionId>;

    /// Number of revisions already recorded under a figure.
    fn revision_count(&self, figure: &NodeId) -> Result<u64>;

    /// Fallback workspace when the configuration names none.
    fn primary_workspace(&self) -> Result<NodeRef>;
}

#[derive(Default)]
struct MemoryInner {
    /// (kind, parent id, name) -> node id.
    nodes: BTreeMap<(NodeKind, Option<NodeId>, String), NodeId>,
    revisions: Vec<Revision>,
    next_id: u64,
}

/// In-memory store for tests and offline runs.
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MemoryInner::default()),
        }
    }

    /// Everything submitted so far, in submission order.
    pub fn submitted(&self) -> Vec<Revision> {
        self.inner.lock().expect("store lock").revisions.clone()
    }

    fn mint(inner: &mut MemoryInner, kind: NodeKind) -> NodeId {
        inner.next_id += 1;
        let prefix = match kind {
            NodeKind::Workspace => "ws",
            NodeKind::Analysis => "an",
            NodeKind::Figure => "fig",
        };
        NodeId::new(format!("{prefix}-{}", inner.next_id))
    }
}

impl Store for MemoryStore {
    fn find_or_create(
        &self,
        kind: NodeKind,
        name: &str,
        parent: Option<&NodeId>,
        create: bool,
    ) -> Result<(NodeRef, bool)> {
        let mut inner = self.inner.lock().expect("store lock");
        let key = (kind, parent.cloned(), name.to_string());
        if let Some(id) = inner.nodes.get(&key) {
            return Ok((NodeRef::new(kind, id.clone(), name), false));
        }
        if !create {
            return Err(FigrevError::NotFound {
                kind: kind.to_string(),
                name: name.to_string(),
            });
        }
        let id = Self::mint(&mut inner, kind);
        inner.nodes.insert(key, id.clone());
        info!(kind = kind.as_str(), name, id = %id, "created node");
        Ok((NodeRef::new(kind, id, name), true))
    }

    fn submit(&self, revision: &Revision) -> Result<RevisionId> {
        let mut inner = self.inner.lock().expect("store lock");
        let id = RevisionId::new(format!("rev-{}", inner.revisions.len() + 1));
        let mut stored = revision.clone();
        stored.id = Some(id.clone());
        inner.revisions.push(stored);
        Ok(id)
    }

    fn revision_count(&self, figure: &NodeId) -> Result<u64> {
        let inner = self.inner.lock().expect("store lock");
        Ok(inner
            .revisions
            .iter()
            .filter(|rev| &rev.figure.id == figure)
            .count() as u64)
    }

    fn primary_workspace(&self) -> Result<NodeRef> {
        let (node, _) = self.find_or_create(NodeKind::Workspace, "Primary", None, true)?;
        Ok(node)
    }
}
