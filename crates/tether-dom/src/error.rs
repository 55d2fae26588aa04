#![forbid(unsafe_code)]

//! Errors raised by the host document.

use crate::node::NodeId;

/// Result alias for document operations.
pub type Result<T> = std::result::Result<T, DomError>;

/// Errors from document operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomError {
    /// A selector could not be parsed by the selector engine.
    UnsupportedSelector(String),
    /// A node id does not belong to this document.
    UnknownNode(NodeId),
    /// Inserting `child` under `parent` would create a cycle.
    HierarchyRequest { parent: NodeId, child: NodeId },
}

impl std::fmt::Display for DomError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedSelector(selector) => write!(f, "unsupported selector: {selector}"),
            Self::UnknownNode(node) => write!(f, "unknown node: {node}"),
            Self::HierarchyRequest { parent, child } => {
                write!(f, "cannot insert {child} into its own subtree at {parent}")
            }
        }
    }
}

impl std::error::Error for DomError {}
