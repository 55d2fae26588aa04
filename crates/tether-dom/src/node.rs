#![forbid(unsafe_code)]

//! Node storage for the document arena.

use ahash::AHashMap;
use serde_json::Value;

use crate::event::ListenerEntry;

/// Handle to a node in a [`Dom`](crate::Dom).
///
/// Ids are arena indices. They are never reused, so a detached node keeps its
/// id and can be re-attached later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Get the raw arena index.
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// Properties every element exposes, whether or not they were assigned.
pub(crate) const BUILTIN_PROPERTIES: &[&str] = &[
    "textContent",
    "innerText",
    "id",
    "className",
    "hidden",
    "title",
    "value",
    "checked",
    "disabled",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NodeKind {
    Document,
    Element,
}

pub(crate) struct Node {
    pub(crate) kind: NodeKind,
    pub(crate) tag: String,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    /// Attributes in insertion order; names are lowercase.
    pub(crate) attributes: Vec<(String, String)>,
    pub(crate) properties: AHashMap<String, Value>,
    pub(crate) listeners: Vec<ListenerEntry>,
    pub(crate) intersection_ratio: f64,
}

impl Node {
    pub(crate) fn document() -> Self {
        Self::with_kind(NodeKind::Document, "#document")
    }

    pub(crate) fn element(tag: &str) -> Self {
        Self::with_kind(NodeKind::Element, &tag.to_ascii_lowercase())
    }

    fn with_kind(kind: NodeKind, tag: &str) -> Self {
        Self {
            kind,
            tag: tag.to_string(),
            parent: None,
            children: Vec::new(),
            attributes: Vec::new(),
            properties: AHashMap::new(),
            listeners: Vec::new(),
            intersection_ratio: 0.0,
        }
    }

    pub(crate) fn is_element(&self) -> bool {
        self.kind == NodeKind::Element
    }

    pub(crate) fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Set an attribute, returning the previous value.
    pub(crate) fn set_attribute(&mut self, name: &str, value: &str) -> Option<String> {
        let name = name.to_ascii_lowercase();
        if let Some(slot) = self.attributes.iter_mut().find(|(key, _)| *key == name) {
            return Some(std::mem::replace(&mut slot.1, value.to_string()));
        }
        self.attributes.push((name, value.to_string()));
        None
    }

    pub(crate) fn remove_attribute(&mut self, name: &str) -> Option<String> {
        let idx = self.attributes.iter().position(|(key, _)| key == name)?;
        Some(self.attributes.remove(idx).1)
    }

    pub(crate) fn has_class(&self, class_name: &str) -> bool {
        self.attribute("class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class_name))
    }
}

/// Convert a dataset key (`countValue`) to its attribute name
/// (`data-count-value`).
#[must_use]
pub fn dataset_attribute(key: &str) -> String {
    let mut name = String::with_capacity(key.len() + 8);
    name.push_str("data-");
    for ch in key.chars() {
        if ch.is_ascii_uppercase() {
            name.push('-');
            name.push(ch.to_ascii_lowercase());
        } else {
            name.push(ch);
        }
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dataset_key_maps_to_kebab_attribute() {
        assert_eq!(dataset_attribute("controller"), "data-controller");
        assert_eq!(dataset_attribute("countValue"), "data-count-value");
        assert_eq!(dataset_attribute("maxItemsValue"), "data-max-items-value");
    }

    #[test]
    fn set_attribute_replaces_in_place() {
        let mut node = Node::element("DIV");
        assert_eq!(node.tag, "div");
        assert_eq!(node.set_attribute("a", "1"), None);
        node.set_attribute("b", "2");
        assert_eq!(node.set_attribute("A", "3"), Some("1".to_string()));
        assert_eq!(
            node.attributes,
            vec![("a".to_string(), "3".to_string()), ("b".to_string(), "2".to_string())]
        );
    }

    #[test]
    fn class_membership() {
        let mut node = Node::element("p");
        node.set_attribute("class", "one  two");
        assert!(node.has_class("two"));
        assert!(!node.has_class("tw"));
    }
}
