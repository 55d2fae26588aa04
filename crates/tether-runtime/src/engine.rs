#![forbid(unsafe_code)]

//! Controller registry and lifecycle engine.
//!
//! The [`Engine`] owns the controller declarations, the element to context
//! registry and the pending queues of elements whose initialization is
//! deferred by a load trigger.
//!
//! # Lifecycle
//!
//! ```text
//!             initialize()
//!  unbound ─────────────────────────────┐ immediate
//!     │ deferred trigger                 ▼
//!     ▼                               registered ──── disconnected() ──► unbound
//!  pending ── trigger / resolve_pending() ──┘
//!     │
//!     └──── disconnected() ──► unbound (queue discarded)
//! ```
//!
//! # Invariants
//!
//! 1. An element is registered at most once per attached lifetime. The
//!    registry and an in-progress marker are checked before any factory work,
//!    so a factory that re-enters `initialize` for its own element is a no-op.
//! 2. A pending queue exists only between the first deferred initialization
//!    attempt and registration; it is drained in FIFO order inside the
//!    registration call, then removed. When registration fails after the
//!    trigger fired (the controller is not declared yet), the queue stays and
//!    the next `initialize` or `declare` registers without re-arming the
//!    trigger.
//! 3. A `disconnected` hook runs at most once. The registry entry is removed
//!    before it runs, and a panicking hook cannot undo that.
//! 4. No engine borrow is held while factories, hooks, queued callbacks or
//!    document callbacks run.
//! 5. Visibility observers are shared: one per threshold.

use std::cell::RefCell;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::{Rc, Weak};

use ahash::{AHashMap, AHashSet};
use tether_dom::{
    Dom, EventListener, IntersectionEntry, IntersectionObserverId, ListenerId, ListenerOptions,
    MutationObserverId, MutationRecord, NodeId,
};
use tracing::{debug, error, warn};
use web_time::Instant;

use crate::config::EngineConfig;
use crate::context::Context;
use crate::controller::Controller;
use crate::error::{Error, Result};
use crate::events;
use crate::scope::{CONNECTED_HOOK, DISCONNECTED_HOOK, ElementHook};
use crate::trigger::{LoadTrigger, Visibility};

type Continuation = Box<dyn FnOnce()>;

struct Registration {
    context: Context,
    disconnected: Option<ElementHook>,
}

struct PendingEntry {
    callbacks: Vec<Continuation>,
    trigger: LoadTrigger,
    listener: Option<ListenerId>,
    /// The trigger fired but registration failed; the next initialization
    /// attempt registers directly.
    fired: bool,
}

#[derive(Default)]
struct EngineState {
    controllers: AHashMap<String, Controller>,
    registry: AHashMap<NodeId, Registration>,
    initializing: AHashSet<NodeId>,
    pending: AHashMap<NodeId, PendingEntry>,
    observers: AHashMap<Visibility, IntersectionObserverId>,
    mutation_observer: Option<MutationObserverId>,
}

struct EngineInner {
    dom: Dom,
    config: Rc<EngineConfig>,
    state: RefCell<EngineState>,
}

/// Binds declared controllers to elements of one document.
///
/// Cloning an `Engine` creates a new handle to the same engine.
#[derive(Clone)]
pub struct Engine {
    inner: Rc<EngineInner>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.borrow();
        let mut controllers: Vec<&str> = state.controllers.keys().map(String::as_str).collect();
        controllers.sort_unstable();
        f.debug_struct("Engine")
            .field("controllers", &controllers)
            .field("registered", &state.registry.len())
            .field("pending", &state.pending.len())
            .field("observing_mutations", &state.mutation_observer.is_some())
            .finish()
    }
}

impl Engine {
    /// Create an engine with the default marker vocabulary.
    #[must_use]
    pub fn new(dom: &Dom) -> Self {
        Self::with_config(dom, EngineConfig::default())
    }

    #[must_use]
    pub fn with_config(dom: &Dom, config: EngineConfig) -> Self {
        Self {
            inner: Rc::new(EngineInner {
                dom: dom.clone(),
                config: Rc::new(config),
                state: RefCell::new(EngineState::default()),
            }),
        }
    }

    fn downgrade(&self) -> Weak<EngineInner> {
        Rc::downgrade(&self.inner)
    }

    fn from_weak(weak: &Weak<EngineInner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    #[must_use]
    pub fn dom(&self) -> &Dom {
        &self.inner.dom
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    // --- Declarations ---

    /// Declare `name` and initialize every connected element that already
    /// names it. Returns the first initialization error, after trying all.
    pub fn declare(&self, name: &str, controller: Controller) -> Result<()> {
        {
            let mut state = self.inner.state.borrow_mut();
            if state.controllers.contains_key(name) {
                return Err(Error::DuplicateController {
                    name: name.to_string(),
                });
            }
            state.controllers.insert(name.to_string(), controller);
        }
        let dom = &self.inner.dom;
        let roots =
            dom.query_selector_all(dom.document(), &self.inner.config.controller_selector(name))?;
        debug!(controller = name, elements = roots.len(), "controller declared");
        self.initialize_all(roots)
    }

    #[must_use]
    pub fn is_declared(&self, name: &str) -> bool {
        self.inner.state.borrow().controllers.contains_key(name)
    }

    /// Follow the document's mutation feed and initialize every connected
    /// controller root in document order.
    pub fn start(&self) -> Result<()> {
        let installed = self.inner.state.borrow().mutation_observer.is_some();
        if !installed {
            let weak = self.downgrade();
            let id = self.inner.dom.observe_mutations(move |record| {
                if let Some(engine) = Self::from_weak(&weak) {
                    engine.handle_mutation(record);
                }
            });
            self.inner.state.borrow_mut().mutation_observer = Some(id);
        }
        let dom = &self.inner.dom;
        let roots = dom.query_selector_all(
            dom.document(),
            &format!("[{}]", self.inner.config.controller_attribute),
        )?;
        self.initialize_all(roots)
    }

    fn initialize_all(&self, roots: Vec<NodeId>) -> Result<()> {
        let mut first_error = None;
        for root in roots {
            if let Err(err) = self.initialize(root) {
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn handle_mutation(&self, record: &MutationRecord) {
        let outcome = match record {
            MutationRecord::Connected(node) => self.connected(*node),
            MutationRecord::Disconnected(node) => {
                self.disconnected(*node);
                Ok(())
            }
            MutationRecord::AttributeChanged { node, name, .. } => {
                self.attribute_changed(*node, name)
            }
        };
        if let Err(err) = outcome {
            error!(%err, "controller lifecycle failed on document mutation");
        }
    }

    // --- Initialization ---

    /// Bind `element` according to its load trigger.
    ///
    /// A no-op for elements that are registered, being registered, or
    /// already waiting on a deferred trigger. An element whose trigger fired
    /// without a successful registration is registered now.
    pub fn initialize(&self, element: NodeId) -> Result<()> {
        let fired = {
            let state = self.inner.state.borrow();
            if state.registry.contains_key(&element) || state.initializing.contains(&element) {
                return Ok(());
            }
            match state.pending.get(&element) {
                Some(entry) if entry.fired => true,
                Some(_) => return Ok(()),
                None => false,
            }
        };
        if fired {
            return self.resolve_pending(element);
        }
        let dom = &self.inner.dom;
        let config = &self.inner.config;
        if !dom.has_attribute(element, &config.controller_attribute) {
            return Err(Error::MissingControllerName { element });
        }

        let trigger = LoadTrigger::parse(dom.attribute(element, &config.load_attribute).as_deref());
        match &trigger {
            LoadTrigger::Immediate => self.register(element, &trigger),
            LoadTrigger::Visible(visibility) => {
                self.create_pending(element, trigger.clone());
                let observer = self.visibility_observer(*visibility);
                dom.observe_intersection(observer, element)?;
                debug!(%element, %trigger, "initialization deferred");
                Ok(())
            }
            LoadTrigger::Event(event) => {
                self.create_pending(element, trigger.clone());
                let weak = self.downgrade();
                let listener = EventListener::new(move |_| {
                    let Some(engine) = Self::from_weak(&weak) else {
                        return;
                    };
                    if let Err(err) = engine.resolve_pending(element) {
                        error!(%element, %err, "deferred initialization failed");
                    }
                })
                .with_options(ListenerOptions::ONCE);
                let id = dom.add_event_listener(element, event, listener)?;
                if let Some(entry) = self.inner.state.borrow_mut().pending.get_mut(&element) {
                    entry.listener = Some(id);
                }
                debug!(%element, %trigger, "initialization deferred");
                Ok(())
            }
        }
    }

    fn create_pending(&self, element: NodeId, trigger: LoadTrigger) {
        self.inner.state.borrow_mut().pending.insert(
            element,
            PendingEntry {
                callbacks: Vec::new(),
                trigger,
                listener: None,
                fired: false,
            },
        );
    }

    fn visibility_observer(&self, visibility: Visibility) -> IntersectionObserverId {
        if let Some(id) = self.inner.state.borrow().observers.get(&visibility) {
            return *id;
        }
        let weak = self.downgrade();
        let id = self
            .inner
            .dom
            .create_intersection_observer(visibility.threshold(), move |entries| {
                if let Some(engine) = Self::from_weak(&weak) {
                    engine.on_intersection(visibility, entries);
                }
            });
        self.inner
            .state
            .borrow_mut()
            .observers
            .insert(visibility, id);
        id
    }

    fn on_intersection(&self, visibility: Visibility, entries: &[IntersectionEntry]) {
        let observer = self.inner.state.borrow().observers.get(&visibility).copied();
        for entry in entries {
            if !entry.is_intersecting || !visibility.reached(entry.intersection_ratio) {
                continue;
            }
            let element = entry.target;
            let repeat = self
                .inner
                .dom
                .has_attribute(element, &self.inner.config.repeat_attribute);
            if !repeat && let Some(observer) = observer {
                self.inner.dom.unobserve_intersection(observer, element);
            }
            if let Err(err) = self.resolve_pending(element) {
                error!(%element, %err, "deferred initialization failed");
            }
        }
    }

    /// Run the deferred registration path for `element` and drain its
    /// pending queue. Elements without a queue are registered directly.
    pub fn resolve_pending(&self, element: NodeId) -> Result<()> {
        let trigger = {
            let mut state = self.inner.state.borrow_mut();
            if state.registry.contains_key(&element) {
                return Ok(());
            }
            match state.pending.get_mut(&element) {
                Some(entry) => {
                    if let Some(id) = entry.listener.take() {
                        self.inner.dom.remove_event_listener(element, id);
                    }
                    entry.fired = true;
                    entry.trigger.clone()
                }
                None => LoadTrigger::Immediate,
            }
        };
        if let LoadTrigger::Visible(visibility) = trigger
            && !self
                .inner
                .dom
                .has_attribute(element, &self.inner.config.repeat_attribute)
        {
            let observer = self.inner.state.borrow().observers.get(&visibility).copied();
            if let Some(observer) = observer {
                self.inner.dom.unobserve_intersection(observer, element);
            }
        }
        self.register(element, &trigger)
    }

    fn register(&self, element: NodeId, trigger: &LoadTrigger) -> Result<()> {
        {
            let mut state = self.inner.state.borrow_mut();
            if state.registry.contains_key(&element) || !state.initializing.insert(element) {
                return Ok(());
            }
        }
        let result = self.register_guarded(element, trigger);
        self.inner.state.borrow_mut().initializing.remove(&element);
        result
    }

    fn register_guarded(&self, element: NodeId, trigger: &LoadTrigger) -> Result<()> {
        let started = Instant::now();
        let dom = &self.inner.dom;
        let name = dom
            .attribute(element, &self.inner.config.controller_attribute)
            .ok_or(Error::MissingControllerName { element })?;
        let controller = self
            .inner
            .state
            .borrow()
            .controllers
            .get(&name)
            .cloned()
            .ok_or_else(|| Error::UnknownController {
                name: name.clone(),
                element,
            })?;

        let context = Context::new(
            dom,
            element,
            &name,
            Rc::clone(&self.inner.config),
            controller.values(),
        )?;
        if let Some(scope) = controller.build(&context) {
            context.extend_scope(&scope);
        }

        let scope = context.scope();
        if let Some(connected) = scope.take_hook(CONNECTED_HOOK) {
            connected(dom, element);
        }
        let disconnected = scope.take_hook(DISCONNECTED_HOOK);

        self.inner.state.borrow_mut().registry.insert(
            element,
            Registration {
                context: context.clone(),
                disconnected,
            },
        );

        let hydrated = events::hydrate(&context);

        let queued = self
            .inner
            .state
            .borrow_mut()
            .pending
            .remove(&element)
            .map(|entry| entry.callbacks)
            .unwrap_or_default();
        if !queued.is_empty() {
            debug!(controller = %name, %element, queued = queued.len(), "draining pending queue");
        }
        for callback in queued {
            callback();
        }

        let listeners = hydrated?;
        debug!(
            controller = %name,
            %element,
            %trigger,
            listeners,
            elapsed_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX),
            "controller initialized"
        );
        Ok(())
    }

    /// Run `callback` once `element` is registered: immediately when it
    /// already is, otherwise from its pending queue. Unbound elements are
    /// initialized first.
    pub fn when_initialized(&self, element: NodeId, callback: impl FnOnce() + 'static) -> Result<()> {
        if !self.is_initialized(element) && !self.is_pending(element) {
            self.initialize(element)?;
        }
        let deferred = {
            let mut state = self.inner.state.borrow_mut();
            match state.pending.get_mut(&element) {
                Some(entry) => {
                    entry.callbacks.push(Box::new(callback));
                    None
                }
                None => Some(callback),
            }
        };
        if let Some(callback) = deferred {
            callback();
        }
        Ok(())
    }

    // --- Tree events ---

    /// `node` entered the document: initialize controller roots in its
    /// subtree, then bind binders whose controller is already registered.
    pub fn connected(&self, node: NodeId) -> Result<()> {
        let dom = &self.inner.dom;
        let config = &self.inner.config;
        let controller_selector = format!("[{}]", config.controller_attribute);

        let mut roots = Vec::new();
        if dom.has_attribute(node, &config.controller_attribute) {
            roots.push(node);
        }
        roots.extend(dom.query_selector_all(node, &controller_selector)?);
        let mut first_error = self.initialize_all(roots).err();

        let mut binders = Vec::new();
        if dom.tag_name(node).as_deref() == Some(config.binder_tag.as_str()) {
            binders.push(node);
        }
        binders.extend(dom.query_selector_all(node, &config.binder_tag)?);
        for binder in binders {
            if !dom.is_connected(binder) {
                continue;
            }
            let owner = match dom.parent(binder) {
                Some(parent) => dom.closest(parent, &controller_selector)?,
                None => None,
            };
            let Some(owner) = owner else {
                debug!(%binder, "binder outside any controller, skipped");
                continue;
            };
            let outcome = match self.context(owner) {
                Some(ctx) => events::bind_binder(&ctx, binder).map(|_| ()),
                None => self.initialize(owner),
            };
            if let Err(err) = outcome {
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// `node` left the document: tear down every binding in its subtree, in
    /// tree order. Repeated calls are no-ops.
    pub fn disconnected(&self, node: NodeId) {
        let dom = &self.inner.dom;
        let mut subtree = vec![node];
        subtree.extend(dom.descendants(node));
        for element in subtree {
            self.teardown(element);
        }
    }

    fn teardown(&self, element: NodeId) {
        let dom = &self.inner.dom;
        let (pending, registration, observers) = {
            let mut state = self.inner.state.borrow_mut();
            let observers: Vec<IntersectionObserverId> = state.observers.values().copied().collect();
            (
                state.pending.remove(&element),
                state.registry.remove(&element),
                observers,
            )
        };
        for observer in observers {
            dom.unobserve_intersection(observer, element);
        }

        if let Some(entry) = pending {
            if let Some(id) = entry.listener {
                dom.remove_event_listener(element, id);
            }
            debug!(%element, discarded = entry.callbacks.len(), "pending initialization cancelled");
        }

        let Some(registration) = registration else {
            return;
        };
        let name = registration.context.name().to_string();
        if let Some(hook) = registration.disconnected {
            let outcome = catch_unwind(AssertUnwindSafe(|| hook(dom, element)));
            if outcome.is_err() {
                warn!(controller = %name, %element, "disconnected hook panicked");
            }
        }
        registration.context.release();
        debug!(controller = %name, %element, "controller detached");
    }

    /// An attribute of `node` changed.
    ///
    /// - Controller marker: the old binding (if any) is torn down and the
    ///   element is initialized again under its new name.
    /// - Value attribute of a bound root: the value is re-derived.
    pub fn attribute_changed(&self, node: NodeId, name: &str) -> Result<()> {
        let dom = &self.inner.dom;
        let config = &self.inner.config;
        let context = self.context(node);

        if name == config.controller_attribute {
            let current = dom.attribute(node, &config.controller_attribute);
            if let Some(ctx) = &context
                && current.as_deref() == Some(ctx.name())
            {
                return Ok(());
            }
            self.teardown(node);
            if current.is_some() && dom.is_connected(node) {
                return self.initialize(node);
            }
            return Ok(());
        }

        let Some(values) = context.as_ref().and_then(Context::values) else {
            return Ok(());
        };
        if let Some(key) = values.key_for_attribute(name) {
            values.sync_attribute(key)?;
        }
        Ok(())
    }

    // --- Inspection ---

    /// Context bound to `element`.
    #[must_use]
    pub fn context(&self, element: NodeId) -> Option<Context> {
        self.inner
            .state
            .borrow()
            .registry
            .get(&element)
            .map(|registration| registration.context.clone())
    }

    #[must_use]
    pub fn is_initialized(&self, element: NodeId) -> bool {
        self.inner.state.borrow().registry.contains_key(&element)
    }

    /// The shared intersection observer for `visibility`, once an element
    /// has been deferred on that threshold.
    #[must_use]
    pub fn visibility_observer_id(&self, visibility: Visibility) -> Option<IntersectionObserverId> {
        self.inner.state.borrow().observers.get(&visibility).copied()
    }

    #[must_use]
    pub fn is_pending(&self, element: NodeId) -> bool {
        self.inner.state.borrow().pending.contains_key(&element)
    }

    /// Number of callbacks waiting on `element`.
    #[must_use]
    pub fn pending_len(&self, element: NodeId) -> usize {
        self.inner
            .state
            .borrow()
            .pending
            .get(&element)
            .map_or(0, |entry| entry.callbacks.len())
    }

    /// Number of registered elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.state.borrow().registry.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // --- Teardown ---

    /// Stop following the document, cancel every pending initialization and
    /// detach every bound element. Declarations are kept.
    pub fn shutdown(&self) {
        let (mutation_observer, observers, mut elements) = {
            let mut state = self.inner.state.borrow_mut();
            let observers: Vec<IntersectionObserverId> =
                state.observers.drain().map(|(_, id)| id).collect();
            let mut elements: Vec<NodeId> = state.registry.keys().copied().collect();
            elements.extend(state.pending.keys().copied());
            (state.mutation_observer.take(), observers, elements)
        };
        let dom = &self.inner.dom;
        if let Some(id) = mutation_observer {
            dom.disconnect_mutation_observer(id);
        }
        for observer in observers {
            dom.disconnect_intersection_observer(observer);
        }
        elements.sort_unstable();
        for element in elements {
            self.teardown(element);
        }
        debug!("engine shut down");
    }
}
