#![forbid(unsafe_code)]

//! Named reference handles over a context's query cache.
//!
//! A [`RefHandle`] looks up elements tagged `data-ref="<name>"` below its
//! controller root. It remembers whether its last access returned one element
//! or all of them; switching shape forces a fresh query, since a cached
//! single-element snapshot says nothing about the full set (and vice versa).
//!
//! ```text
//! last access   current access   cache
//! -----------   --------------   ---------------
//! none          one / all        honored
//! one           one              honored
//! one           all              invalidated
//! all           one              invalidated
//! (reset)       any              invalidated once
//! ```

use std::cell::Cell;
use std::rc::Rc;

use serde_json::Value;
use tether_dom::{Dom, EventListener, NodeId};
use tracing::trace;

use crate::context::WeakContext;
use crate::error::{Error, Result};
use crate::query::SelectOptions;

/// Shape of the last access through a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccessMode {
    #[default]
    None,
    One,
    All,
}

struct RefState {
    name: String,
    selector: String,
    mode: Cell<AccessMode>,
    force: Cell<bool>,
    context: WeakContext,
}

/// Stateful accessor for one reference name.
///
/// Handles are memoised per context, so `ctx.reference("item")` always
/// returns the same handle state.
#[derive(Clone)]
pub struct RefHandle {
    state: Rc<RefState>,
}

impl std::fmt::Debug for RefHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefHandle")
            .field("name", &self.state.name)
            .field("last_access", &self.state.mode.get())
            .finish()
    }
}

impl RefHandle {
    pub(crate) fn new(name: &str, selector: String, context: WeakContext) -> Self {
        Self {
            state: Rc::new(RefState {
                name: name.to_string(),
                selector,
                mode: Cell::new(AccessMode::None),
                force: Cell::new(false),
                context,
            }),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.state.name
    }

    /// Raw selector before boundary rewriting.
    #[must_use]
    pub fn selector(&self) -> &str {
        &self.state.selector
    }

    #[must_use]
    pub fn last_access(&self) -> AccessMode {
        self.state.mode.get()
    }

    /// First matching element.
    pub fn one(&self) -> Result<Option<NodeId>> {
        Ok(self.access(AccessMode::One)?.into_iter().next())
    }

    /// First matching element, hydrated with `hydration`.
    pub fn one_with(&self, hydration: &Hydration) -> Result<Option<NodeId>> {
        let found = self.one()?;
        if let Some(node) = found {
            hydration.apply(&self.dom()?, node)?;
        }
        Ok(found)
    }

    /// Every matching element in document order.
    pub fn all(&self) -> Result<Vec<NodeId>> {
        self.access(AccessMode::All)
    }

    /// Every matching element, each hydrated with `hydration`.
    pub fn all_with(&self, hydration: &Hydration) -> Result<Vec<NodeId>> {
        let found = self.all()?;
        let dom = self.dom()?;
        for node in &found {
            hydration.apply(&dom, *node)?;
        }
        Ok(found)
    }

    /// Drop the cached entry and force the next access to query again.
    pub fn reset(&self) -> &Self {
        if let Some(ctx) = self.state.context.upgrade() {
            ctx.forget(&self.state.selector);
        }
        self.state.force.set(true);
        self.state.mode.set(AccessMode::None);
        self
    }

    fn dom(&self) -> Result<Dom> {
        self.state
            .context
            .upgrade()
            .map(|ctx| ctx.dom().clone())
            .ok_or_else(|| self.released())
    }

    fn released(&self) -> Error {
        Error::ContextReleased {
            reference: self.state.name.clone(),
        }
    }

    fn access(&self, mode: AccessMode) -> Result<Vec<NodeId>> {
        let ctx = self.state.context.upgrade().ok_or_else(|| self.released())?;
        let last = self.state.mode.replace(mode);
        let switched = last != AccessMode::None && last != mode;
        if switched {
            trace!(reference = %self.state.name, ?last, ?mode, "access mode switched, invalidating");
        }
        let invalidate = self.state.force.replace(false) || switched;
        let options = SelectOptions {
            all: mode == AccessMode::All,
            invalidate,
        };
        Ok(ctx.select(&self.state.selector, options)?.into_vec())
    }
}

/// Values a [`Hydration`] can assign.
#[derive(Clone)]
enum HydrationValue {
    Listener(EventListener),
    Compute(Rc<dyn Fn(&Dom, NodeId) -> Value>),
    Value(Value),
}

/// Ordered side effects applied to elements returned by a reference.
///
/// - `on(event, listener)` registers a listener with the listener's options.
/// - `compute(key, f)` assigns the property `key` to `f(dom, element)`.
/// - `set(key, value)` assigns a property when the element has one named
///   `key`, and an attribute otherwise.
#[derive(Clone, Default)]
pub struct Hydration {
    entries: Vec<(String, HydrationValue)>,
}

impl std::fmt::Debug for Hydration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let keys: Vec<&str> = self.entries.iter().map(|(k, _)| k.as_str()).collect();
        f.debug_struct("Hydration").field("keys", &keys).finish()
    }
}

impl Hydration {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn on(mut self, event: &str, listener: EventListener) -> Self {
        self.entries
            .push((format!("on{event}"), HydrationValue::Listener(listener)));
        self
    }

    #[must_use]
    pub fn compute(mut self, key: &str, f: impl Fn(&Dom, NodeId) -> Value + 'static) -> Self {
        self.entries
            .push((key.to_string(), HydrationValue::Compute(Rc::new(f))));
        self
    }

    #[must_use]
    pub fn set(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.entries
            .push((key.to_string(), HydrationValue::Value(value.into())));
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Apply every entry to `node`, in insertion order.
    pub fn apply(&self, dom: &Dom, node: NodeId) -> Result<()> {
        for (key, value) in &self.entries {
            match value {
                HydrationValue::Listener(listener) => {
                    let event = key.strip_prefix("on").unwrap_or(key);
                    dom.add_event_listener(node, event, listener.clone())?;
                }
                HydrationValue::Compute(compute) => {
                    dom.set_property(node, key, compute(dom, node))?;
                }
                HydrationValue::Value(value) if dom.has_property(node, key) => {
                    dom.set_property(node, key, value.clone())?;
                }
                HydrationValue::Value(value) => {
                    dom.set_attribute(node, key, &tether_dom::value_to_attribute(value))?;
                }
            }
        }
        Ok(())
    }
}
