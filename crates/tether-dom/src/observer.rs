#![forbid(unsafe_code)]

//! Mutation and intersection observation.
//!
//! Both observers are delivered by the [`Dom`](crate::Dom) handle outside of
//! any internal borrow, so callbacks may freely read and mutate the document.
//!
//! - Mutation records are delivered synchronously, right after the mutation,
//!   in registration order of the observers.
//! - Intersection entries are delivered when the host reports a new
//!   intersection ratio, and once through the task queue when a node is first
//!   observed with a non-zero ratio.

use std::rc::Rc;

use crate::node::NodeId;

/// Identifier of a mutation observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MutationObserverId(pub(crate) u64);

/// Identifier of an intersection observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IntersectionObserverId(pub(crate) u64);

/// A structural or attribute change in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationRecord {
    /// The subtree rooted at this node entered the document.
    Connected(NodeId),
    /// The subtree rooted at this node left the document.
    Disconnected(NodeId),
    /// An attribute of a connected element changed.
    AttributeChanged {
        node: NodeId,
        name: String,
        old_value: Option<String>,
    },
}

/// One observed node's visibility state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntersectionEntry {
    pub target: NodeId,
    /// Visible fraction of the node, in `0.0..=1.0`.
    pub intersection_ratio: f64,
    pub is_intersecting: bool,
}

pub(crate) type MutationCallback = Rc<dyn Fn(&MutationRecord)>;
pub(crate) type IntersectionCallback = Rc<dyn Fn(&[IntersectionEntry])>;

pub(crate) struct MutationObserverEntry {
    pub(crate) id: MutationObserverId,
    pub(crate) callback: MutationCallback,
}

pub(crate) struct IntersectionObserverEntry {
    pub(crate) id: IntersectionObserverId,
    pub(crate) threshold: f64,
    pub(crate) targets: Vec<NodeId>,
    pub(crate) callback: IntersectionCallback,
}

impl IntersectionObserverEntry {
    pub(crate) fn entry_for(target: NodeId, ratio: f64) -> IntersectionEntry {
        IntersectionEntry {
            target,
            intersection_ratio: ratio,
            is_intersecting: ratio > 0.0,
        }
    }
}
