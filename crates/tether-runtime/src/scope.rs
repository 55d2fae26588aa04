#![forbid(unsafe_code)]

//! Controller scopes: the named members a controller exposes to bindings.
//!
//! A [`Scope`] is a shared map from member name to [`Member`]. Cloning a
//! scope shares identity, so a factory that captures its scope observes every
//! later mutation made through the context (mounts, merges, hook removal).
//!
//! Members are addressed by dotted paths (`menu.open`), walking through
//! [`Member::Namespace`] entries.

use std::cell::RefCell;
use std::rc::Rc;

use ahash::AHashMap;
use serde_json::Value;
use tether_dom::{Dom, Event, EventListener, ListenerOptions, NodeId};

/// Name of the one-shot hook run right after initialization.
pub const CONNECTED_HOOK: &str = "connected";
/// Name of the hook run once when the bound element leaves the document.
pub const DISCONNECTED_HOOK: &str = "disconnected";

/// Literal prefixes that resolve against the root scope, bypassing any
/// binding namespace.
const ROOT_PREFIXES: [&str; 2] = ["controller#", "context#"];

/// Lifecycle hook receiving the bound element.
pub type ElementHook = Rc<dyn Fn(&Dom, NodeId)>;

/// One scope member.
#[derive(Clone)]
pub enum Member {
    /// A plain bindable method, optionally carrying listener options. Every
    /// binding of it registers a distinct listener.
    Listener(EventListener),
    /// A `handleEvent`-style object. Every binding registers the same
    /// listener, so repeated bindings for one event collapse into one.
    Handler(EventListener),
    /// A nested scope reachable through a dotted path.
    Namespace(Scope),
    /// A lifecycle hook.
    Hook(ElementHook),
    /// Plain state.
    Data(Value),
}

impl std::fmt::Debug for Member {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Listener(listener) => f.debug_tuple("Listener").field(listener).finish(),
            Self::Handler(listener) => f.debug_tuple("Handler").field(listener).finish(),
            Self::Namespace(scope) => f.debug_tuple("Namespace").field(scope).finish(),
            Self::Hook(_) => f.write_str("Hook(..)"),
            Self::Data(value) => f.debug_tuple("Data").field(value).finish(),
        }
    }
}

/// Shared, mutable member map of one controller instance.
#[derive(Clone, Default)]
pub struct Scope {
    members: Rc<RefCell<AHashMap<String, Member>>>,
}

impl std::fmt::Debug for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names = self.names();
        names.sort_unstable();
        f.debug_struct("Scope").field("members", &names).finish()
    }
}

impl Scope {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a plain method, registered with empty listener options.
    #[must_use]
    pub fn with_method(self, name: &str, method: impl Fn(&mut Event) + 'static) -> Self {
        self.insert(name, Member::Listener(EventListener::new(method)));
        self
    }

    /// Add a method carrying its own listener options.
    #[must_use]
    pub fn with_method_options(
        self,
        name: &str,
        method: impl Fn(&mut Event) + 'static,
        options: ListenerOptions,
    ) -> Self {
        self.insert(
            name,
            Member::Listener(EventListener::new(method).with_options(options)),
        );
        self
    }

    /// Add a prepared listener (a `handleEvent`-style object).
    #[must_use]
    pub fn with_handler(self, name: &str, listener: EventListener) -> Self {
        self.insert(name, Member::Handler(listener));
        self
    }

    #[must_use]
    pub fn with_namespace(self, name: &str, scope: Scope) -> Self {
        self.insert(name, Member::Namespace(scope));
        self
    }

    #[must_use]
    pub fn with_value(self, name: &str, value: impl Into<Value>) -> Self {
        self.insert(name, Member::Data(value.into()));
        self
    }

    /// Hook invoked once with the element right after initialization.
    #[must_use]
    pub fn on_connected(self, hook: impl Fn(&Dom, NodeId) + 'static) -> Self {
        self.insert(CONNECTED_HOOK, Member::Hook(Rc::new(hook)));
        self
    }

    /// Hook invoked once when the element leaves the document.
    #[must_use]
    pub fn on_disconnected(self, hook: impl Fn(&Dom, NodeId) + 'static) -> Self {
        self.insert(DISCONNECTED_HOOK, Member::Hook(Rc::new(hook)));
        self
    }

    /// Insert or replace a member, returning the previous one.
    pub fn insert(&self, name: &str, member: Member) -> Option<Member> {
        self.members.borrow_mut().insert(name.to_string(), member)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Member> {
        self.members.borrow().get(name).cloned()
    }

    pub fn remove(&self, name: &str) -> Option<Member> {
        self.members.borrow_mut().remove(name)
    }

    /// Remove and return `name` if it holds a hook. Other members stay.
    pub fn take_hook(&self, name: &str) -> Option<ElementHook> {
        let mut members = self.members.borrow_mut();
        match members.get(name) {
            Some(Member::Hook(_)) => match members.remove(name) {
                Some(Member::Hook(hook)) => Some(hook),
                _ => None,
            },
            _ => None,
        }
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.members.borrow().contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.members.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.borrow().is_empty()
    }

    /// Member names, unordered.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.members.borrow().keys().cloned().collect()
    }

    /// Shallow merge: every member of `other` is assigned into `self`,
    /// replacing same-named members.
    pub fn merge(&self, other: &Scope) {
        if self.ptr_eq(other) {
            return;
        }
        let incoming: Vec<(String, Member)> = other
            .members
            .borrow()
            .iter()
            .map(|(name, member)| (name.clone(), member.clone()))
            .collect();
        self.members.borrow_mut().extend(incoming);
    }

    /// Resolve a dotted path through namespaces.
    #[must_use]
    pub fn resolve(&self, path: &str) -> Option<Member> {
        let mut segments = path.split('.');
        let mut current = self.get(segments.next()?)?;
        for segment in segments {
            let Member::Namespace(scope) = current else {
                return None;
            };
            current = scope.get(segment)?;
        }
        Some(current)
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Scope) -> bool {
        Rc::ptr_eq(&self.members, &other.members)
    }
}

/// Resolve a binding method identifier to a listener.
///
/// `controller#path` and `context#path` resolve against `scope` directly;
/// other paths are prefixed with `namespace` when one is given. Anything
/// that does not end at a [`Member::Listener`] or [`Member::Handler`]
/// resolves to `None`.
///
/// A plain method resolves to a fresh listener on every call; a handler
/// resolves to its shared listener.
#[must_use]
pub fn resolve_method(scope: &Scope, method: &str, namespace: Option<&str>) -> Option<EventListener> {
    let literal = ROOT_PREFIXES
        .iter()
        .find_map(|prefix| method.strip_prefix(prefix));
    let member = match (literal, namespace.filter(|ns| !ns.is_empty())) {
        (Some(path), _) => scope.resolve(path),
        (None, Some(ns)) => scope.resolve(&format!("{ns}.{method}")),
        (None, None) => scope.resolve(method),
    };
    match member? {
        Member::Listener(listener) => Some(
            EventListener::from_rc(Rc::new({
                let callback = Rc::clone(listener.callback());
                move |event: &mut Event| callback(event)
            }))
            .with_options(listener.options()),
        ),
        Member::Handler(listener) => Some(listener),
        _ => None,
    }
}
