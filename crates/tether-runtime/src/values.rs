#![forbid(unsafe_code)]

//! Reactive values derived from dataset attributes.
//!
//! A controller declares a [`ValuesSchema`]; each entry names a key, a
//! transformer and a default. For key `count` the attribute read is
//! `data-count-value`:
//!
//! - attribute present (even empty): `transformer(attribute)`
//! - attribute absent: `default`
//!
//! Every [`Values::set`] dispatches a bubbling `<controller>.<key>` event at
//! the controller root, with the new value as `detail`, before returning. The
//! initial derivation is announced the same way through the host task queue,
//! so listeners registered right after construction still observe it.

use std::rc::{Rc, Weak};

use serde_json::Value;
use tether_dom::{Dom, Event, NodeId, dataset_attribute};
use tracing::warn;

use crate::error::{Error, Result};
use crate::reactive::{Binding, Observable, Subscription, bind_mapped, bind_observable};

/// Converts a raw attribute string into a value.
pub type Transformer = Rc<dyn Fn(&str) -> Value>;

#[derive(Clone)]
struct ValueDecl {
    transformer: Transformer,
    default: Value,
}

/// Ordered value declarations for one controller.
#[derive(Clone, Default)]
pub struct ValuesSchema {
    entries: Vec<(String, ValueDecl)>,
}

impl std::fmt::Debug for ValuesSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValuesSchema").field("keys", &self.keys()).finish()
    }
}

impl ValuesSchema {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare `key`. Redeclaring a key replaces the earlier entry.
    #[must_use]
    pub fn with(
        mut self,
        key: &str,
        transformer: impl Fn(&str) -> Value + 'static,
        default: impl Into<Value>,
    ) -> Self {
        let decl = ValueDecl {
            transformer: Rc::new(transformer),
            default: default.into(),
        };
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some(slot) => slot.1 = decl,
            None => self.entries.push((key.to_string(), decl)),
        }
        self
    }

    #[must_use]
    pub fn keys(&self) -> Vec<&str> {
        self.entries.iter().map(|(k, _)| k.as_str()).collect()
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

/// Ready-made transformers.
pub mod transformers {
    use serde_json::Value;

    /// Numeric conversion. Blank input is `0`, unparsable input is `null`.
    #[must_use]
    pub fn number(raw: &str) -> Value {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Value::from(0);
        }
        if let Ok(int) = trimmed.parse::<i64>() {
            return Value::from(int);
        }
        trimmed
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map_or(Value::Null, Value::Number)
    }

    /// `false` and `0` are false; any other present value is true.
    #[must_use]
    pub fn boolean(raw: &str) -> Value {
        Value::Bool(!matches!(raw.trim(), "false" | "0"))
    }

    #[must_use]
    pub fn string(raw: &str) -> Value {
        Value::String(raw.to_string())
    }

    /// JSON parse, falling back to the raw string.
    #[must_use]
    pub fn json(raw: &str) -> Value {
        serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
    }
}

struct Slot {
    key: String,
    attribute: String,
    decl: ValueDecl,
    value: Observable<Value>,
}

struct ValuesInner {
    dom: Dom,
    root: NodeId,
    controller: String,
    slots: Vec<Slot>,
}

/// Live values of one controller instance.
#[derive(Clone)]
pub struct Values {
    inner: Rc<ValuesInner>,
}

impl std::fmt::Debug for Values {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for slot in &self.inner.slots {
            map.entry(&slot.key, &slot.value.get());
        }
        map.finish()
    }
}

impl Values {
    /// Derive every declared value from `root`'s attributes and queue the
    /// initial announcements.
    #[must_use]
    pub fn new(dom: &Dom, root: NodeId, controller: &str, schema: &ValuesSchema) -> Self {
        let slots = schema
            .entries
            .iter()
            .map(|(key, decl)| {
                let attribute = dataset_attribute(&format!("{key}Value"));
                let initial = derive(dom, root, &attribute, decl);
                Slot {
                    key: key.clone(),
                    attribute,
                    decl: decl.clone(),
                    value: Observable::new(initial),
                }
            })
            .collect();
        let values = Self {
            inner: Rc::new(ValuesInner {
                dom: dom.clone(),
                root,
                controller: controller.to_string(),
                slots,
            }),
        };
        values.schedule_initial_emit();
        values
    }

    fn schedule_initial_emit(&self) {
        for slot in &self.inner.slots {
            let weak: Weak<ValuesInner> = Rc::downgrade(&self.inner);
            let key = slot.key.clone();
            self.inner.dom.queue_task(move || {
                let Some(inner) = weak.upgrade() else {
                    return;
                };
                let values = Values { inner };
                if let Some(current) = values.get(&key)
                    && let Err(err) = values.emit(&key, current)
                {
                    warn!(controller = %values.inner.controller, key = %key, %err, "initial value event failed");
                }
            });
        }
    }

    #[must_use]
    pub fn controller(&self) -> &str {
        &self.inner.controller
    }

    #[must_use]
    pub fn keys(&self) -> Vec<&str> {
        self.inner.slots.iter().map(|s| s.key.as_str()).collect()
    }

    /// Dataset attribute backing `key`.
    #[must_use]
    pub fn attribute_name(&self, key: &str) -> Option<&str> {
        self.slot(key).map(|s| s.attribute.as_str())
    }

    /// Key backed by the attribute `name`, if any.
    #[must_use]
    pub fn key_for_attribute(&self, name: &str) -> Option<&str> {
        self.inner
            .slots
            .iter()
            .find(|s| s.attribute == name)
            .map(|s| s.key.as_str())
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        self.slot(key).map(|s| s.value.get())
    }

    /// Store `value` and announce it, whether or not it changed.
    pub fn set(&self, key: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        let slot = self.slot(key).ok_or_else(|| self.unknown(key))?;
        slot.value.set(value.clone());
        self.emit(key, value)
    }

    /// Run `key`'s transformer on `raw` and store the result.
    pub fn set_raw(&self, key: &str, raw: &str) -> Result<Value> {
        let slot = self.slot(key).ok_or_else(|| self.unknown(key))?;
        let value = (slot.decl.transformer)(raw);
        self.set(key, value.clone())?;
        Ok(value)
    }

    /// Re-derive `key` from the root's current attribute.
    pub fn sync_attribute(&self, key: &str) -> Result<Value> {
        let slot = self.slot(key).ok_or_else(|| self.unknown(key))?;
        let value = derive(&self.inner.dom, self.inner.root, &slot.attribute, &slot.decl);
        self.set(key, value.clone())?;
        Ok(value)
    }

    /// Observe changes of `key`. Only value-changing sets notify.
    pub fn subscribe(&self, key: &str, callback: impl Fn(&Value) + 'static) -> Result<Subscription> {
        let slot = self.slot(key).ok_or_else(|| self.unknown(key))?;
        Ok(slot.value.subscribe(callback))
    }

    /// Read binding over `key`.
    pub fn binding(&self, key: &str) -> Result<Binding<Value>> {
        Ok(bind_observable(self.observable(key)?))
    }

    /// Read binding over `key`, projected through `map` on every read.
    pub fn binding_with<T: 'static>(
        &self,
        key: &str,
        map: impl Fn(&Value) -> T + 'static,
    ) -> Result<Binding<T>> {
        Ok(bind_mapped(self.observable(key)?, map))
    }

    pub(crate) fn observable(&self, key: &str) -> Result<&Observable<Value>> {
        self.slot(key)
            .map(|s| &s.value)
            .ok_or_else(|| self.unknown(key))
    }

    fn slot(&self, key: &str) -> Option<&Slot> {
        self.inner.slots.iter().find(|s| s.key == key)
    }

    fn unknown(&self, key: &str) -> Error {
        Error::UnknownValue {
            controller: self.inner.controller.clone(),
            key: key.to_string(),
        }
    }

    fn emit(&self, key: &str, value: Value) -> Result<()> {
        let event = Event::custom(format!("{}.{key}", self.inner.controller), value)
            .with_bubbles(true);
        self.inner.dom.dispatch_event(self.inner.root, event)?;
        Ok(())
    }
}

fn derive(dom: &Dom, root: NodeId, attribute: &str, decl: &ValueDecl) -> Value {
    match dom.attribute(root, attribute) {
        Some(raw) => (decl.transformer)(&raw),
        None => decl.default.clone(),
    }
}
