//! References to the three-level naming hierarchy owned by the external
//! store: Workspace → Analysis → Figure.
//!
//! The pipeline never persists these nodes itself; it only resolves which
//! figure a new rendering belongs to and hands the result to the store's
//! find-or-create contract.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of a node in the naming hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Workspace,
    Analysis,
    Figure,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Workspace => "workspace",
            Self::Analysis => "analysis",
            Self::Figure => "figure",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque identifier assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Resolved reference to a hierarchy node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRef {
    pub kind: NodeKind,
    pub id: NodeId,
    pub name: String,
}

impl NodeRef {
    pub fn new(kind: NodeKind, id: NodeId, name: impl Into<String>) -> Self {
        Self {
            kind,
            id,
            name: name.into(),
        }
    }
}

/// Lookup-by-name request against the store.
///
/// `create` controls whether a missing node is created or reported as an
/// error by the resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindByName {
    pub name: String,
    pub description: Option<String>,
    pub create: bool,
}

impl FindByName {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            create: false,
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Create the node if the lookup finds nothing.
    #[must_use]
    pub fn create_if_missing(mut self) -> Self {
        self.create = true;
        self
    }
}

/// How a publish call names its target figure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetSpec {
    /// Already-resolved node reference.
    Resolved(NodeRef),
    /// Name lookup, optionally creating the figure.
    ByName(FindByName),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_by_name_builder() {
        let spec = FindByName::new("Tumor growth")
            .with_description("weekly")
            .create_if_missing();
        assert_eq!(spec.name, "Tumor growth");
        assert_eq!(spec.description.as_deref(), Some("weekly"));
        assert!(spec.create);
    }

    #[test]
    fn node_kind_strings() {
        assert_eq!(NodeKind::Figure.as_str(), "figure");
        assert_eq!(NodeKind::Analysis.to_string(), "analysis");
    }
}
