#![forbid(unsafe_code)]

//! Per-element controller context.
//!
//! A [`Context`] is created exactly once for each bound element and lives
//! as long as the binding. It owns the element's query cache, its memoised
//! reference handles, its scope, its values and the subscriptions the
//! controller asked it to hold.
//!
//! # Invariants
//!
//! 1. One context per bound element per attached lifetime. Reattaching an
//!    element creates a new context.
//! 2. `scope()` always returns the same shared scope; mutations are visible
//!    to every holder.
//! 3. After [`release`](Context::release) the cache, references and held
//!    subscriptions are gone and the scope is emptied; handles still pointing
//!    at the context observe an empty state.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use ahash::AHashMap;
use serde_json::Value;
use tether_dom::{Dom, NodeId};

use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::query::{ScopedQueryCache, SelectOptions, Selection};
use crate::reactive::{BindingScope, Subscription};
use crate::reference::RefHandle;
use crate::scope::{Member, Scope};
use crate::values::{Values, ValuesSchema};

struct ContextInner {
    dom: Dom,
    root: NodeId,
    name: String,
    config: Rc<EngineConfig>,
    scope: Scope,
    cache: RefCell<ScopedQueryCache>,
    refs: RefCell<AHashMap<String, RefHandle>>,
    values: Option<Values>,
    bindings: RefCell<BindingScope>,
    released: Cell<bool>,
}

/// Runtime state of one controller instance.
#[derive(Clone)]
pub struct Context {
    inner: Rc<ContextInner>,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("name", &self.inner.name)
            .field("root", &self.inner.root)
            .field("scope", &self.inner.scope)
            .field("released", &self.inner.released.get())
            .finish()
    }
}

impl Context {
    pub(crate) fn new(
        dom: &Dom,
        root: NodeId,
        name: &str,
        config: Rc<EngineConfig>,
        schema: Option<&ValuesSchema>,
    ) -> Result<Self> {
        let cache = ScopedQueryCache::new(dom, root, &config.controller_attribute)?;
        Ok(Self {
            inner: Rc::new(ContextInner {
                dom: dom.clone(),
                root,
                name: name.to_string(),
                config,
                scope: Scope::new(),
                cache: RefCell::new(cache),
                refs: RefCell::new(AHashMap::new()),
                values: schema.map(|schema| Values::new(dom, root, name, schema)),
                bindings: RefCell::new(BindingScope::new()),
                released: Cell::new(false),
            }),
        })
    }

    /// The bound element.
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.inner.root
    }

    #[must_use]
    pub fn dom(&self) -> &Dom {
        &self.inner.dom
    }

    /// Controller name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn scope(&self) -> Scope {
        self.inner.scope.clone()
    }

    /// Shallow-merge `scope` into the context scope.
    pub fn extend_scope(&self, scope: &Scope) {
        self.inner.scope.merge(scope);
    }

    /// Build a sub-scope with `f` and mount it under `namespace`.
    pub fn mount(&self, namespace: &str, f: impl FnOnce(&Context) -> Scope) -> Scope {
        let sub = f(self);
        self.inner
            .scope
            .insert(namespace, Member::Namespace(sub.clone()));
        sub
    }

    /// Query below the root, excluding the first nested controller.
    pub fn select(&self, selector: &str, options: SelectOptions) -> Result<Selection> {
        self.inner.cache.borrow_mut().select(selector, options)
    }

    pub(crate) fn select_all_fresh(&self, selector: &str) -> Result<Vec<NodeId>> {
        Ok(self
            .select(selector, SelectOptions::all().invalidate())?
            .into_vec())
    }

    pub(crate) fn forget(&self, selector: &str) {
        self.inner.cache.borrow_mut().invalidate(selector);
    }

    /// The selector executed for `selector` after boundary rewriting.
    #[must_use]
    pub fn query_string(&self, selector: &str) -> String {
        self.inner.cache.borrow().query_string(selector)
    }

    /// First nested controller root, if any.
    #[must_use]
    pub fn boundary(&self) -> Option<NodeId> {
        self.inner.cache.borrow().boundary()
    }

    /// Handle for reference `name`, created on first use.
    #[must_use]
    pub fn reference(&self, name: &str) -> RefHandle {
        if let Some(handle) = self.inner.refs.borrow().get(name) {
            return handle.clone();
        }
        let handle = RefHandle::new(name, self.inner.config.ref_selector(name), self.downgrade());
        self.inner
            .refs
            .borrow_mut()
            .insert(name.to_string(), handle.clone());
        handle
    }

    /// Declared values, when the controller has a schema.
    #[must_use]
    pub fn values(&self) -> Option<&Values> {
        self.inner.values.as_ref()
    }

    /// Run `callback` on every change of value `key` until the element is
    /// detached.
    pub fn watch(&self, key: &str, callback: impl Fn(&Value) + 'static) -> Result<()> {
        let values = self.values().ok_or_else(|| Error::UnknownValue {
            controller: self.inner.name.clone(),
            key: key.to_string(),
        })?;
        let source = values.observable(key)?;
        if !self.inner.released.get() {
            self.inner.bindings.borrow_mut().subscribe(source, callback);
        }
        Ok(())
    }

    /// Keep `subscription` alive until the element is detached.
    pub fn hold(&self, subscription: Subscription) {
        if self.inner.released.get() {
            return;
        }
        self.inner.bindings.borrow_mut().hold(subscription);
    }

    #[must_use]
    pub fn downgrade(&self) -> WeakContext {
        WeakContext {
            inner: Rc::downgrade(&self.inner),
        }
    }

    #[must_use]
    pub fn is_released(&self) -> bool {
        self.inner.released.get()
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Context) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Tear down per-binding state. Idempotent.
    pub(crate) fn release(&self) {
        if self.inner.released.replace(true) {
            return;
        }
        self.inner.bindings.borrow_mut().clear();
        self.inner.refs.borrow_mut().clear();
        self.inner.cache.borrow_mut().clear();
        for name in self.inner.scope.names() {
            self.inner.scope.remove(&name);
        }
    }
}

/// Non-owning context handle.
#[derive(Clone, Default)]
pub struct WeakContext {
    inner: Weak<ContextInner>,
}

impl WeakContext {
    #[must_use]
    pub fn upgrade(&self) -> Option<Context> {
        self.inner.upgrade().map(|inner| Context { inner })
    }
}

impl std::fmt::Debug for WeakContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeakContext")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}
