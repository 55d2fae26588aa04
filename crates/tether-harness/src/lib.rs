#![forbid(unsafe_code)]

//! Test harness for Tether.
//!
//! - [`Markup`] / [`el`]: compact element trees mounted into a [`Dom`]
//! - [`Fixture`]: a document plus id lookups over the mounted tree
//! - [`Recorder`]: listener that records every event it sees
//! - [`init_tracing`]: route `tracing` output to the test writer
//!
//! # Example
//!
//! ```
//! use tether_harness::{Fixture, el};
//!
//! let fixture = Fixture::mount(
//!     el("div")
//!         .attr("id", "root")
//!         .attr("data-controller", "menu")
//!         .child(el("button").attr("data-ref", "toggle")),
//! )
//! .unwrap();
//! assert!(fixture.dom().is_connected(fixture.id("root")));
//! ```

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Once;

use serde_json::Value;
use tether_dom::{Dom, Event, EventListener, NodeId};
use tracing_subscriber::EnvFilter;

/// Install a `fmt` subscriber writing through the test harness.
///
/// Honours `RUST_LOG`; defaults to `tether_runtime=debug`. Safe to call from
/// every test.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("tether_runtime=debug"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

// ============================================================================
// Markup
// ============================================================================

/// An element description: tag, attributes in order, text and children.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Markup {
    tag: String,
    attributes: Vec<(String, String)>,
    text: Option<String>,
    children: Vec<Markup>,
}

/// Start an element description.
#[must_use]
pub fn el(tag: &str) -> Markup {
    Markup {
        tag: tag.to_string(),
        ..Markup::default()
    }
}

impl Markup {
    #[must_use]
    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.push((name.to_string(), value.to_string()));
        self
    }

    #[must_use]
    pub fn text(mut self, text: &str) -> Self {
        self.text = Some(text.to_string());
        self
    }

    #[must_use]
    pub fn child(mut self, child: Markup) -> Self {
        self.children.push(child);
        self
    }

    #[must_use]
    pub fn children(mut self, children: impl IntoIterator<Item = Markup>) -> Self {
        self.children.extend(children);
        self
    }

    /// Build the tree detached, then append it under `parent` in one step,
    /// so observers see a single connection.
    pub fn mount(&self, dom: &Dom, parent: NodeId) -> tether_dom::Result<NodeId> {
        let node = self.build(dom)?;
        dom.append_child(parent, node)?;
        Ok(node)
    }

    fn build(&self, dom: &Dom) -> tether_dom::Result<NodeId> {
        let node = dom.create_element(&self.tag);
        for (name, value) in &self.attributes {
            dom.set_attribute(node, name, value)?;
        }
        if let Some(text) = &self.text {
            dom.set_text_content(node, text)?;
        }
        for child in &self.children {
            let child = child.build(dom)?;
            dom.append_child(node, child)?;
        }
        Ok(node)
    }
}

// ============================================================================
// Fixture
// ============================================================================

/// A document with a mounted tree.
#[derive(Debug, Clone)]
pub struct Fixture {
    dom: Dom,
    root: NodeId,
}

impl Fixture {
    /// Mount `markup` under the document of a fresh [`Dom`].
    pub fn mount(markup: Markup) -> tether_dom::Result<Self> {
        let dom = Dom::new();
        let root = markup.mount(&dom, dom.document())?;
        Ok(Self { dom, root })
    }

    #[must_use]
    pub fn dom(&self) -> &Dom {
        &self.dom
    }

    /// The top element of the mounted tree.
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Element with `id="{id}"`.
    ///
    /// # Panics
    ///
    /// Panics when no connected element carries the id.
    #[must_use]
    pub fn id(&self, id: &str) -> NodeId {
        self.dom
            .query_selector(self.dom.document(), &format!("#{id}"))
            .ok()
            .flatten()
            .unwrap_or_else(|| panic!("fixture has no element with id {id:?}"))
    }

    /// Every element matching `selector` in the document.
    pub fn all(&self, selector: &str) -> tether_dom::Result<Vec<NodeId>> {
        self.dom.query_selector_all(self.dom.document(), selector)
    }

    /// Mount `markup` under `parent` after construction.
    pub fn append(&self, parent: NodeId, markup: &Markup) -> tether_dom::Result<NodeId> {
        markup.mount(&self.dom, parent)
    }
}

// ============================================================================
// Recorder
// ============================================================================

/// One observed event.
#[derive(Debug, Clone, PartialEq)]
pub struct Recorded {
    pub event_type: String,
    pub detail: Value,
    pub target: Option<NodeId>,
    pub current_target: Option<NodeId>,
}

/// Shared log of events seen by its listeners.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    log: Rc<RefCell<Vec<Recorded>>>,
}

impl Recorder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A listener appending to this recorder.
    #[must_use]
    pub fn listener(&self) -> EventListener {
        let log = Rc::clone(&self.log);
        EventListener::new(move |event: &mut Event| {
            log.borrow_mut().push(Recorded {
                event_type: event.event_type().to_string(),
                detail: event.detail().clone(),
                target: event.target(),
                current_target: event.current_target(),
            });
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.log.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.log.borrow().is_empty()
    }

    #[must_use]
    pub fn records(&self) -> Vec<Recorded> {
        self.log.borrow().clone()
    }

    #[must_use]
    pub fn details(&self) -> Vec<Value> {
        self.log.borrow().iter().map(|r| r.detail.clone()).collect()
    }

    pub fn clear(&self) {
        self.log.borrow_mut().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn markup_mounts_in_document_order() {
        let fixture = Fixture::mount(
            el("ul")
                .attr("id", "list")
                .children((0..3).map(|i| el("li").attr("data-index", &i.to_string()))),
        )
        .unwrap();
        let items = fixture.all("li").unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(
            fixture.dom().attribute(items[2], "data-index").as_deref(),
            Some("2")
        );
        assert_eq!(fixture.dom().children(fixture.id("list")), items);
    }

    #[test]
    fn recorder_captures_detail() {
        let fixture = Fixture::mount(el("div").attr("id", "a")).unwrap();
        let recorder = Recorder::new();
        let a = fixture.id("a");
        fixture
            .dom()
            .add_event_listener(a, "ping", recorder.listener())
            .unwrap();
        fixture
            .dom()
            .dispatch_event(a, Event::custom("ping", Value::from(3)))
            .unwrap();
        assert_eq!(recorder.details(), vec![Value::from(3)]);
        assert_eq!(recorder.records()[0].target, Some(a));
    }
}
