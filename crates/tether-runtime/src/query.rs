#![forbid(unsafe_code)]

//! Boundary-aware memoised queries for one controller root.
//!
//! Every selector issued through a context is rewritten so that matches
//! inside the first nested controller are excluded:
//!
//! ```text
//! button            ->  button:not([data-controller="nested"] *)
//! a, b              ->  a:not([..] *), b:not([..] *)
//! ```
//!
//! # Invariants
//!
//! 1. The cache key is the rewritten selector, never the caller's raw text.
//! 2. An entry holds either the first match or the full list, never both.
//! 3. Without `invalidate`, a present key is returned without touching the
//!    document.
//! 4. The boundary element is fixed at construction. Its controller name is
//!    read at query time, so a boundary that lost its marker no longer
//!    excludes anything.

use ahash::AHashMap;
use tether_dom::{Dom, NodeId};
use tracing::trace;

use crate::error::Result;

/// Cached query result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    One(Option<NodeId>),
    All(Vec<NodeId>),
}

impl Selection {
    /// First matched element, whatever the shape.
    #[must_use]
    pub fn first(&self) -> Option<NodeId> {
        match self {
            Self::One(node) => *node,
            Self::All(nodes) => nodes.first().copied(),
        }
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<NodeId> {
        match self {
            Self::One(node) => node.into_iter().collect(),
            Self::All(nodes) => nodes,
        }
    }

    #[must_use]
    pub fn is_all(&self) -> bool {
        matches!(self, Self::All(_))
    }
}

/// Options for [`ScopedQueryCache::select`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelectOptions {
    /// Return every match instead of the first.
    pub all: bool,
    /// Ignore any cached entry and query the document.
    pub invalidate: bool,
}

impl SelectOptions {
    #[must_use]
    pub const fn one() -> Self {
        Self {
            all: false,
            invalidate: false,
        }
    }

    #[must_use]
    pub const fn all() -> Self {
        Self {
            all: true,
            invalidate: false,
        }
    }

    #[must_use]
    pub const fn invalidate(mut self) -> Self {
        self.invalidate = true;
        self
    }
}

/// Memoised lookups below one controller root.
#[derive(Debug)]
pub struct ScopedQueryCache {
    dom: Dom,
    root: NodeId,
    controller_attribute: String,
    boundary: Option<NodeId>,
    entries: AHashMap<String, Selection>,
}

impl ScopedQueryCache {
    /// Create a cache for `root`, locating the first nested controller.
    pub fn new(dom: &Dom, root: NodeId, controller_attribute: &str) -> Result<Self> {
        let boundary = dom.query_selector(root, &format!("[{controller_attribute}]"))?;
        Ok(Self {
            dom: dom.clone(),
            root,
            controller_attribute: controller_attribute.to_string(),
            boundary,
            entries: AHashMap::new(),
        })
    }

    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// The first nested controller root, if any.
    #[must_use]
    pub fn boundary(&self) -> Option<NodeId> {
        self.boundary
    }

    /// The selector actually executed for `selector`.
    #[must_use]
    pub fn query_string(&self, selector: &str) -> String {
        let Some(name) = self
            .boundary
            .and_then(|node| self.dom.attribute(node, &self.controller_attribute))
        else {
            return selector.to_string();
        };
        let exclusion = format!(":not([{}=\"{name}\"] *)", self.controller_attribute);
        split_groups(selector)
            .into_iter()
            .map(|group| format!("{}{exclusion}", group.trim()))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Look up `selector` below the root.
    pub fn select(&mut self, selector: &str, options: SelectOptions) -> Result<Selection> {
        let key = self.query_string(selector);
        if !options.invalidate
            && let Some(hit) = self.entries.get(&key)
        {
            trace!(selector = %key, "query cache hit");
            return Ok(hit.clone());
        }
        trace!(selector = %key, invalidate = options.invalidate, "query cache miss");
        let selection = if options.all {
            Selection::All(self.dom.query_selector_all(self.root, &key)?)
        } else {
            Selection::One(self.dom.query_selector(self.root, &key)?)
        };
        self.entries.insert(key, selection.clone());
        Ok(selection)
    }

    /// Drop the entry for `selector`. Returns whether one existed.
    pub fn invalidate(&mut self, selector: &str) -> bool {
        let key = self.query_string(selector);
        self.entries.remove(&key).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Split a selector list on top-level commas.
fn split_groups(selector: &str) -> Vec<&str> {
    let mut groups = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (idx, ch) in selector.char_indices() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(ch),
            (None, '(' | '[') => depth += 1,
            (None, ')' | ']') => depth = depth.saturating_sub(1),
            (None, ',') if depth == 0 => {
                groups.push(&selector[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    groups.push(&selector[start..]);
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    struct Fixture {
        dom: Dom,
        root: NodeId,
        nested: NodeId,
        outer_button: NodeId,
        inner_button: NodeId,
    }

    fn fixture() -> Fixture {
        let dom = Dom::new();
        let root = dom.create_element("div");
        dom.set_attribute(root, "data-controller", "parent").unwrap();
        let outer_button = dom.create_element("button");
        let nested = dom.create_element("div");
        dom.set_attribute(nested, "data-controller", "child").unwrap();
        let inner_button = dom.create_element("button");
        dom.append_child(dom.document(), root).unwrap();
        dom.append_child(root, outer_button).unwrap();
        dom.append_child(root, nested).unwrap();
        dom.append_child(nested, inner_button).unwrap();
        Fixture {
            dom,
            root,
            nested,
            outer_button,
            inner_button,
        }
    }

    #[test]
    fn rewrites_each_group() {
        let f = fixture();
        let cache = ScopedQueryCache::new(&f.dom, f.root, "data-controller").unwrap();
        assert_eq!(cache.boundary(), Some(f.nested));
        assert_eq!(
            cache.query_string("button, [data-x=\"a,b\"]"),
            "button:not([data-controller=\"child\"] *), \
             [data-x=\"a,b\"]:not([data-controller=\"child\"] *)"
        );
    }

    #[test]
    fn without_boundary_selector_is_unchanged() {
        let f = fixture();
        let cache = ScopedQueryCache::new(&f.dom, f.nested, "data-controller").unwrap();
        assert_eq!(cache.boundary(), None);
        assert_eq!(cache.query_string("button"), "button");
    }

    #[test]
    fn boundary_excludes_nested_matches_until_removed() {
        let f = fixture();
        let mut cache = ScopedQueryCache::new(&f.dom, f.root, "data-controller").unwrap();
        let all = cache.select("button", SelectOptions::all()).unwrap();
        assert_eq!(all, Selection::All(vec![f.outer_button]));

        f.dom.remove_attribute(f.nested, "data-controller").unwrap();
        let all = cache
            .select("button", SelectOptions::all().invalidate())
            .unwrap();
        assert_eq!(all, Selection::All(vec![f.outer_button, f.inner_button]));
    }

    #[test]
    fn cached_entry_survives_document_changes() {
        let f = fixture();
        let mut cache = ScopedQueryCache::new(&f.dom, f.root, "data-controller").unwrap();
        cache.select("button", SelectOptions::all()).unwrap();
        let extra = f.dom.create_element("button");
        f.dom.append_child(f.root, extra).unwrap();
        assert_eq!(
            cache.select("button", SelectOptions::all()).unwrap().into_vec(),
            vec![f.outer_button]
        );
        assert!(cache.invalidate("button"));
        assert_eq!(
            cache.select("button", SelectOptions::all()).unwrap().into_vec(),
            vec![f.outer_button, extra]
        );
    }

    #[test]
    fn raw_select_returns_stored_shape() {
        let f = fixture();
        let mut cache = ScopedQueryCache::new(&f.dom, f.root, "data-controller").unwrap();
        let one = cache.select("button", SelectOptions::one()).unwrap();
        assert_eq!(one, Selection::One(Some(f.outer_button)));
        let again = cache.select("button", SelectOptions::all()).unwrap();
        assert!(!again.is_all());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn split_groups_respects_nesting() {
        assert_eq!(split_groups("a, b:not(c, d)"), vec!["a", " b:not(c, d)"]);
        assert_eq!(split_groups("[x='1,2']"), vec!["[x='1,2']"]);
    }
}
