#![forbid(unsafe_code)]

//! The document arena and its shared [`Dom`] handle.
//!
//! # Architecture
//!
//! `Dom` wraps a `Rc<RefCell<Document>>`. Every public operation borrows the
//! document for the shortest possible span; listener callbacks, mutation
//! records, intersection entries and queued tasks are always invoked with no
//! borrow held, so they may re-enter the document freely.
//!
//! # Invariants
//!
//! 1. A node has at most one parent and appears once in that parent's
//!    children.
//! 2. `Connected`/`Disconnected` records are emitted exactly when a subtree
//!    root changes connectedness; descendants are implied.
//! 3. Node ids are never reused; detached nodes stay addressable.
//! 4. `run_tasks` drains tasks in FIFO order, including tasks queued while
//!    draining.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use serde_json::Value;

use crate::error::{DomError, Result};
use crate::event::{Event, EventListener, EventPhase, ListenerEntry, ListenerId, ListenerOptions};
use crate::node::{BUILTIN_PROPERTIES, Node, NodeId};
use crate::observer::{
    IntersectionEntry, IntersectionObserverEntry, IntersectionObserverId, MutationObserverEntry,
    MutationObserverId, MutationRecord,
};
use crate::selector::SelectorList;

type Task = Box<dyn FnOnce()>;

/// Document storage. Accessed through [`Dom`].
pub(crate) struct Document {
    nodes: Vec<Node>,
    root: NodeId,
    next_id: u64,
    mutation_observers: Vec<MutationObserverEntry>,
    intersection_observers: Vec<IntersectionObserverEntry>,
    tasks: VecDeque<Task>,
}

impl Document {
    fn new() -> Self {
        Self {
            nodes: vec![Node::document()],
            root: NodeId(0),
            next_id: 1,
            mutation_observers: Vec::new(),
            intersection_observers: Vec::new(),
            tasks: VecDeque::new(),
        }
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes.get(id.0).ok_or(DomError::UnknownNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.nodes.get_mut(id.0).ok_or(DomError::UnknownNode(id))
    }

    pub(crate) fn is_element(&self, id: NodeId) -> bool {
        self.nodes.get(id.0).is_some_and(Node::is_element)
    }

    pub(crate) fn element_node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0).filter(|node| node.is_element())
    }

    pub(crate) fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0).and_then(|node| node.parent)
    }

    fn is_connected(&self, id: NodeId) -> bool {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if current == self.root {
                return true;
            }
            cursor = self.parent_of(current);
        }
        false
    }

    /// Inclusive ancestor check.
    fn contains(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.parent_of(current);
        }
        false
    }

    fn collect_descendants(&self, id: NodeId, out: &mut Vec<NodeId>) {
        if let Some(node) = self.nodes.get(id.0) {
            for child in &node.children {
                out.push(*child);
                self.collect_descendants(*child, out);
            }
        }
    }

    fn detach(&mut self, id: NodeId) -> Result<()> {
        let Some(parent) = self.node(id)?.parent else {
            return Ok(());
        };
        self.node_mut(parent)?.children.retain(|child| *child != id);
        self.node_mut(id)?.parent = None;
        Ok(())
    }
}

/// Shared handle to a document.
///
/// Cloning a `Dom` creates a new handle to the **same** document.
#[derive(Clone)]
pub struct Dom {
    inner: Rc<RefCell<Document>>,
}

impl Default for Dom {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Dom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let doc = self.inner.borrow();
        f.debug_struct("Dom")
            .field("nodes", &doc.nodes.len())
            .field("pending_tasks", &doc.tasks.len())
            .finish()
    }
}

impl Dom {
    /// Create an empty document containing only the document node.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(Document::new())),
        }
    }

    /// Whether both handles point at the same document.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// The document node. Nodes are connected when this is an ancestor.
    #[must_use]
    pub fn document(&self) -> NodeId {
        self.inner.borrow().root
    }

    /// Number of nodes ever created, including the document node.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.borrow().nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() <= 1
    }

    // --- Tree ---

    /// Create a detached element.
    pub fn create_element(&self, tag: &str) -> NodeId {
        let mut doc = self.inner.borrow_mut();
        let id = NodeId(doc.nodes.len());
        doc.nodes.push(Node::element(tag));
        id
    }

    /// Append `child` as the last child of `parent`, moving it if it already
    /// has a parent. Emits `Disconnected` for a connected child being moved
    /// and `Connected` when the child ends up connected.
    pub fn append_child(&self, parent: NodeId, child: NodeId) -> Result<()> {
        let (was_connected, now_connected) = {
            let mut doc = self.inner.borrow_mut();
            doc.node(parent)?;
            if !doc.is_element(child) {
                return Err(DomError::UnknownNode(child));
            }
            if doc.contains(child, parent) {
                return Err(DomError::HierarchyRequest { parent, child });
            }
            let was_connected = doc.is_connected(child);
            doc.detach(child)?;
            doc.node_mut(parent)?.children.push(child);
            doc.node_mut(child)?.parent = Some(parent);
            (was_connected, doc.is_connected(parent))
        };
        if was_connected {
            self.notify(&MutationRecord::Disconnected(child));
        }
        if now_connected {
            self.notify(&MutationRecord::Connected(child));
        }
        Ok(())
    }

    /// Detach `node` from its parent. A no-op for nodes without a parent.
    pub fn remove(&self, node: NodeId) -> Result<()> {
        let was_connected = {
            let mut doc = self.inner.borrow_mut();
            let was_connected = doc.is_connected(node);
            doc.detach(node)?;
            was_connected
        };
        if was_connected {
            self.notify(&MutationRecord::Disconnected(node));
        }
        Ok(())
    }

    #[must_use]
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.inner.borrow().parent_of(node)
    }

    #[must_use]
    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.inner
            .borrow()
            .nodes
            .get(node.0)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    /// All descendants of `node` in document order, excluding `node`.
    #[must_use]
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.inner.borrow().collect_descendants(node, &mut out);
        out
    }

    /// Inclusive ancestor check: `contains(a, a)` is true.
    #[must_use]
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.inner.borrow().contains(ancestor, node)
    }

    #[must_use]
    pub fn is_connected(&self, node: NodeId) -> bool {
        self.inner.borrow().is_connected(node)
    }

    #[must_use]
    pub fn is_element(&self, node: NodeId) -> bool {
        self.inner.borrow().is_element(node)
    }

    /// Lowercase tag name, or `None` for unknown nodes.
    #[must_use]
    pub fn tag_name(&self, node: NodeId) -> Option<String> {
        self.inner
            .borrow()
            .nodes
            .get(node.0)
            .map(|n| n.tag.clone())
    }

    // --- Attributes ---

    #[must_use]
    pub fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.inner
            .borrow()
            .nodes
            .get(node.0)
            .and_then(|n| n.attribute(&name.to_ascii_lowercase()).map(str::to_string))
    }

    #[must_use]
    pub fn has_attribute(&self, node: NodeId, name: &str) -> bool {
        self.attribute(node, name).is_some()
    }

    /// All attributes in insertion order.
    #[must_use]
    pub fn attributes(&self, node: NodeId) -> Vec<(String, String)> {
        self.inner
            .borrow()
            .nodes
            .get(node.0)
            .map(|n| n.attributes.clone())
            .unwrap_or_default()
    }

    /// Read a `dataset` entry: `dataset(el, "countValue")` reads
    /// `data-count-value`.
    #[must_use]
    pub fn dataset(&self, node: NodeId, key: &str) -> Option<String> {
        self.attribute(node, &crate::node::dataset_attribute(key))
    }

    pub fn set_attribute(&self, node: NodeId, name: &str, value: &str) -> Result<()> {
        let (old_value, connected) = {
            let mut doc = self.inner.borrow_mut();
            let old = doc.node_mut(node)?.set_attribute(name, value);
            (old, doc.is_connected(node))
        };
        if connected {
            self.notify(&MutationRecord::AttributeChanged {
                node,
                name: name.to_ascii_lowercase(),
                old_value,
            });
        }
        Ok(())
    }

    /// Remove an attribute. Returns whether it was present.
    pub fn remove_attribute(&self, node: NodeId, name: &str) -> Result<bool> {
        let name = name.to_ascii_lowercase();
        let (old_value, connected) = {
            let mut doc = self.inner.borrow_mut();
            let old = doc.node_mut(node)?.remove_attribute(&name);
            (old, doc.is_connected(node))
        };
        let removed = old_value.is_some();
        if removed && connected {
            self.notify(&MutationRecord::AttributeChanged {
                node,
                name,
                old_value,
            });
        }
        Ok(removed)
    }

    // --- Properties ---

    /// Whether `name` is a property of the element (built in, or assigned).
    #[must_use]
    pub fn has_property(&self, node: NodeId, name: &str) -> bool {
        let doc = self.inner.borrow();
        doc.element_node(node).is_some_and(|n| {
            BUILTIN_PROPERTIES.contains(&name) || n.properties.contains_key(name)
        })
    }

    /// Read a property. Reflected properties read through to attributes.
    #[must_use]
    pub fn property(&self, node: NodeId, name: &str) -> Option<Value> {
        let doc = self.inner.borrow();
        let n = doc.element_node(node)?;
        let key = canonical_property(name);
        if let Some(attr) = reflected_attribute(key) {
            return Some(match key {
                "hidden" | "disabled" | "checked" => Value::Bool(n.attribute(attr).is_some()),
                _ => Value::String(n.attribute(attr).unwrap_or_default().to_string()),
            });
        }
        if let Some(value) = n.properties.get(key) {
            return Some(value.clone());
        }
        BUILTIN_PROPERTIES
            .contains(&key)
            .then(|| Value::String(String::new()))
    }

    /// Assign a property. Reflected properties write through to attributes.
    pub fn set_property(&self, node: NodeId, name: &str, value: Value) -> Result<()> {
        let key = canonical_property(name);
        if let Some(attr) = reflected_attribute(key) {
            return match (key, &value) {
                ("hidden" | "disabled" | "checked", _) => {
                    if is_truthy(&value) {
                        self.set_attribute(node, attr, "")
                    } else {
                        self.remove_attribute(node, attr).map(|_| ())
                    }
                }
                _ => self.set_attribute(node, attr, &value_to_attribute(&value)),
            };
        }
        let mut doc = self.inner.borrow_mut();
        let n = doc.node_mut(node)?;
        n.properties.insert(key.to_string(), value);
        Ok(())
    }

    #[must_use]
    pub fn text_content(&self, node: NodeId) -> String {
        match self.property(node, "textContent") {
            Some(Value::String(text)) => text,
            Some(other) => value_to_attribute(&other),
            None => String::new(),
        }
    }

    pub fn set_text_content(&self, node: NodeId, text: &str) -> Result<()> {
        self.set_property(node, "textContent", Value::String(text.to_string()))
    }

    // --- Selectors ---

    /// First descendant of `scope` matching `selector`, in document order.
    pub fn query_selector(&self, scope: NodeId, selector: &str) -> Result<Option<NodeId>> {
        Ok(self.query_selector_all(scope, selector)?.into_iter().next())
    }

    /// All descendants of `scope` matching `selector`, in document order.
    pub fn query_selector_all(&self, scope: NodeId, selector: &str) -> Result<Vec<NodeId>> {
        let list = SelectorList::parse(selector)?;
        let doc = self.inner.borrow();
        doc.node(scope)?;
        let mut candidates = Vec::new();
        doc.collect_descendants(scope, &mut candidates);
        Ok(candidates
            .into_iter()
            .filter(|candidate| list.matches(&doc, *candidate))
            .collect())
    }

    pub fn matches(&self, node: NodeId, selector: &str) -> Result<bool> {
        let list = SelectorList::parse(selector)?;
        Ok(list.matches(&self.inner.borrow(), node))
    }

    /// Nearest inclusive ancestor of `node` matching `selector`.
    pub fn closest(&self, node: NodeId, selector: &str) -> Result<Option<NodeId>> {
        let list = SelectorList::parse(selector)?;
        let doc = self.inner.borrow();
        let mut cursor = Some(node);
        while let Some(current) = cursor {
            if list.matches(&doc, current) {
                return Ok(Some(current));
            }
            cursor = doc.parent_of(current);
        }
        Ok(None)
    }

    // --- Events ---

    /// Register a listener. Registering the same callback again for the same
    /// event type and capture flag returns the existing id.
    pub fn add_event_listener(
        &self,
        node: NodeId,
        event_type: &str,
        listener: EventListener,
    ) -> Result<ListenerId> {
        let mut doc = self.inner.borrow_mut();
        let capture = listener.options().contains(ListenerOptions::CAPTURE);
        let n = doc.node(node)?;
        if let Some(existing) = n.listeners.iter().find(|entry| {
            entry.event_type == event_type
                && entry.listener.options().contains(ListenerOptions::CAPTURE) == capture
                && entry.listener.same_callback(&listener)
        }) {
            return Ok(existing.id);
        }
        let id = ListenerId(doc.next_id());
        doc.node_mut(node)?.listeners.push(ListenerEntry {
            id,
            event_type: event_type.to_string(),
            listener,
        });
        Ok(id)
    }

    /// Remove a listener. Returns whether it was registered.
    pub fn remove_event_listener(&self, node: NodeId, id: ListenerId) -> bool {
        let mut doc = self.inner.borrow_mut();
        let Ok(n) = doc.node_mut(node) else {
            return false;
        };
        let before = n.listeners.len();
        n.listeners.retain(|entry| entry.id != id);
        n.listeners.len() != before
    }

    /// Number of listeners registered on `node` for `event_type`.
    #[must_use]
    pub fn listener_count(&self, node: NodeId, event_type: &str) -> usize {
        self.inner
            .borrow()
            .nodes
            .get(node.0)
            .map_or(0, |n| {
                n.listeners
                    .iter()
                    .filter(|entry| entry.event_type == event_type)
                    .count()
            })
    }

    /// Dispatch `event` at `target` through capture, target and (when the
    /// event bubbles) bubble phases. Returns the event after dispatch.
    pub fn dispatch_event(&self, target: NodeId, mut event: Event) -> Result<Event> {
        let path = {
            let doc = self.inner.borrow();
            doc.node(target)?;
            let mut path = Vec::new();
            let mut cursor = doc.parent_of(target);
            while let Some(node) = cursor {
                path.push(node);
                cursor = doc.parent_of(node);
            }
            path
        };

        #[cfg(feature = "tracing")]
        let _span = tracing::trace_span!(
            "dom_dispatch",
            event = event.event_type(),
            target = target.index(),
            depth = path.len()
        )
        .entered();

        event.target = Some(target);

        'dispatch: {
            for node in path.iter().rev() {
                self.invoke_listeners(*node, &mut event, EventPhase::Capturing, true);
                if event.propagation_stopped() {
                    break 'dispatch;
                }
            }
            self.invoke_listeners(target, &mut event, EventPhase::AtTarget, true);
            if event.propagation_stopped() {
                break 'dispatch;
            }
            self.invoke_listeners(target, &mut event, EventPhase::AtTarget, false);
            if event.propagation_stopped() || !event.bubbles() {
                break 'dispatch;
            }
            for node in &path {
                self.invoke_listeners(*node, &mut event, EventPhase::Bubbling, false);
                if event.propagation_stopped() {
                    break 'dispatch;
                }
            }
        }

        event.current_target = None;
        event.phase = EventPhase::None;
        event.passive = false;
        Ok(event)
    }

    /// Dispatch a bubbling, cancelable `click`.
    pub fn click(&self, target: NodeId) -> Result<Event> {
        self.dispatch_event(
            target,
            Event::new("click").with_bubbles(true).with_cancelable(true),
        )
    }

    fn invoke_listeners(&self, node: NodeId, event: &mut Event, phase: EventPhase, capture: bool) {
        let snapshot: Vec<(ListenerId, EventListener)> = {
            let doc = self.inner.borrow();
            let Some(n) = doc.nodes.get(node.0) else {
                return;
            };
            n.listeners
                .iter()
                .filter(|entry| {
                    entry.event_type == event.event_type()
                        && entry.listener.options().contains(ListenerOptions::CAPTURE) == capture
                })
                .map(|entry| (entry.id, entry.listener.clone()))
                .collect()
        };
        if snapshot.is_empty() {
            return;
        }

        event.current_target = Some(node);
        event.phase = phase;
        for (id, listener) in snapshot {
            // Listeners removed by an earlier callback in this phase do not fire.
            let live = {
                let mut doc = self.inner.borrow_mut();
                let Some(n) = doc.nodes.get_mut(node.0) else {
                    return;
                };
                let live = n.listeners.iter().any(|entry| entry.id == id);
                if live && listener.options().contains(ListenerOptions::ONCE) {
                    n.listeners.retain(|entry| entry.id != id);
                }
                live
            };
            if !live {
                continue;
            }
            event.passive = listener.options().contains(ListenerOptions::PASSIVE);
            listener.call(event);
            event.passive = false;
            if event.immediate_propagation_stopped() {
                break;
            }
        }
    }

    // --- Mutation observation ---

    /// Register a mutation callback for the whole document.
    pub fn observe_mutations(
        &self,
        callback: impl Fn(&MutationRecord) + 'static,
    ) -> MutationObserverId {
        let mut doc = self.inner.borrow_mut();
        let id = MutationObserverId(doc.next_id());
        doc.mutation_observers.push(MutationObserverEntry {
            id,
            callback: Rc::new(callback),
        });
        id
    }

    /// Stop delivering records to an observer. Returns whether it existed.
    pub fn disconnect_mutation_observer(&self, id: MutationObserverId) -> bool {
        let mut doc = self.inner.borrow_mut();
        let before = doc.mutation_observers.len();
        doc.mutation_observers.retain(|entry| entry.id != id);
        doc.mutation_observers.len() != before
    }

    fn notify(&self, record: &MutationRecord) {
        let callbacks: Vec<_> = self
            .inner
            .borrow()
            .mutation_observers
            .iter()
            .map(|entry| Rc::clone(&entry.callback))
            .collect();
        for callback in callbacks {
            callback(record);
        }
    }

    // --- Intersection observation ---

    /// Create an intersection observer firing when a target crosses
    /// `threshold` (`0.0` means "any pixel visible").
    pub fn create_intersection_observer(
        &self,
        threshold: f64,
        callback: impl Fn(&[IntersectionEntry]) + 'static,
    ) -> IntersectionObserverId {
        let mut doc = self.inner.borrow_mut();
        let id = IntersectionObserverId(doc.next_id());
        doc.intersection_observers.push(IntersectionObserverEntry {
            id,
            threshold: threshold.clamp(0.0, 1.0),
            targets: Vec::new(),
            callback: Rc::new(callback),
        });
        id
    }

    /// Start observing `node`. If the node already satisfies the threshold,
    /// an initial entry is delivered through the task queue.
    pub fn observe_intersection(&self, observer: IntersectionObserverId, node: NodeId) -> Result<()> {
        let initial = {
            let mut doc = self.inner.borrow_mut();
            let ratio = doc.node(node)?.intersection_ratio;
            let Some(entry) = doc
                .intersection_observers
                .iter_mut()
                .find(|entry| entry.id == observer)
            else {
                return Ok(());
            };
            if entry.targets.contains(&node) {
                return Ok(());
            }
            entry.targets.push(node);
            satisfies(ratio, entry.threshold).then_some(ratio)
        };
        if let Some(ratio) = initial {
            let dom = self.clone();
            self.queue_task(move || {
                let callback = {
                    let doc = dom.inner.borrow();
                    doc.intersection_observers
                        .iter()
                        .find(|entry| entry.id == observer && entry.targets.contains(&node))
                        .map(|entry| Rc::clone(&entry.callback))
                };
                if let Some(callback) = callback {
                    callback(&[IntersectionObserverEntry::entry_for(node, ratio)]);
                }
            });
        }
        Ok(())
    }

    /// Stop observing `node`. Returns whether it was observed.
    pub fn unobserve_intersection(&self, observer: IntersectionObserverId, node: NodeId) -> bool {
        let mut doc = self.inner.borrow_mut();
        doc.intersection_observers
            .iter_mut()
            .find(|entry| entry.id == observer)
            .is_some_and(|entry| {
                let before = entry.targets.len();
                entry.targets.retain(|target| *target != node);
                entry.targets.len() != before
            })
    }

    #[must_use]
    pub fn is_observing(&self, observer: IntersectionObserverId, node: NodeId) -> bool {
        self.inner
            .borrow()
            .intersection_observers
            .iter()
            .any(|entry| entry.id == observer && entry.targets.contains(&node))
    }

    /// Drop an intersection observer and all its targets.
    pub fn disconnect_intersection_observer(&self, observer: IntersectionObserverId) -> bool {
        let mut doc = self.inner.borrow_mut();
        let before = doc.intersection_observers.len();
        doc.intersection_observers.retain(|entry| entry.id != observer);
        doc.intersection_observers.len() != before
    }

    /// Host hook: report the visible fraction of `node`. Observers whose
    /// threshold state flips receive an entry.
    pub fn set_intersection_ratio(&self, node: NodeId, ratio: f64) -> Result<()> {
        let ratio = ratio.clamp(0.0, 1.0);
        let deliveries: Vec<_> = {
            let mut doc = self.inner.borrow_mut();
            let n = doc.node_mut(node)?;
            let old = std::mem::replace(&mut n.intersection_ratio, ratio);
            doc.intersection_observers
                .iter()
                .filter(|entry| entry.targets.contains(&node))
                .filter(|entry| satisfies(old, entry.threshold) != satisfies(ratio, entry.threshold))
                .map(|entry| Rc::clone(&entry.callback))
                .collect()
        };
        let entry = IntersectionObserverEntry::entry_for(node, ratio);
        for callback in deliveries {
            callback(&[entry]);
        }
        Ok(())
    }

    #[must_use]
    pub fn intersection_ratio(&self, node: NodeId) -> f64 {
        self.inner
            .borrow()
            .nodes
            .get(node.0)
            .map_or(0.0, |n| n.intersection_ratio)
    }

    // --- Task queue ---

    /// Queue a task for the next [`run_tasks`](Self::run_tasks).
    pub fn queue_task(&self, task: impl FnOnce() + 'static) {
        self.inner.borrow_mut().tasks.push_back(Box::new(task));
    }

    #[must_use]
    pub fn pending_tasks(&self) -> usize {
        self.inner.borrow().tasks.len()
    }

    /// Run queued tasks until the queue is empty. Returns how many ran.
    pub fn run_tasks(&self) -> usize {
        let mut ran = 0;
        loop {
            let next = self.inner.borrow_mut().tasks.pop_front();
            let Some(task) = next else {
                return ran;
            };
            task();
            ran += 1;
        }
    }
}

fn satisfies(ratio: f64, threshold: f64) -> bool {
    if threshold <= 0.0 {
        ratio > 0.0
    } else {
        ratio >= threshold
    }
}

fn canonical_property(name: &str) -> &str {
    match name {
        "innerText" => "textContent",
        other => other,
    }
}

fn reflected_attribute(property: &str) -> Option<&'static str> {
    match property {
        "id" => Some("id"),
        "className" => Some("class"),
        "title" => Some("title"),
        "hidden" => Some("hidden"),
        "disabled" => Some("disabled"),
        "checked" => Some("checked"),
        _ => None,
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Stringify a value the way attribute assignment does: strings verbatim,
/// everything else as JSON.
#[must_use]
pub fn value_to_attribute(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
