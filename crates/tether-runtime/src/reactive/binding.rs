#![forbid(unsafe_code)]

//! Read bindings over [`Observable`] values and subscription lifetimes.
//!
//! # Invariants
//!
//! 1. `Binding::get()` always returns the current value; the transform runs
//!    on every call.
//! 2. Bindings are `Clone` and share their source.
//! 3. A [`BindingScope`] releases every held subscription on `clear()` or
//!    drop; after that no callback from the scope fires.

use std::rc::Rc;

use super::observable::{Observable, Subscription};

/// A read-only binding to an [`Observable`] with an optional transform.
pub struct Binding<T> {
    eval: Rc<dyn Fn() -> T>,
}

impl<T> Clone for Binding<T> {
    fn clone(&self) -> Self {
        Self {
            eval: Rc::clone(&self.eval),
        }
    }
}

impl<T: std::fmt::Debug + 'static> std::fmt::Debug for Binding<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Binding").field("value", &self.get()).finish()
    }
}

impl<T: 'static> Binding<T> {
    /// Create a binding that evaluates `f` on each `get()`.
    pub fn new(f: impl Fn() -> T + 'static) -> Self {
        Self { eval: Rc::new(f) }
    }

    #[must_use]
    pub fn get(&self) -> T {
        (self.eval)()
    }

    /// Chain a further transform.
    pub fn then<U: 'static>(self, f: impl Fn(T) -> U + 'static) -> Binding<U> {
        Binding {
            eval: Rc::new(move || f((self.eval)())),
        }
    }
}

/// Identity binding to an observable.
pub fn bind_observable<T: Clone + PartialEq + 'static>(source: &Observable<T>) -> Binding<T> {
    let src = source.clone();
    Binding::new(move || src.get())
}

/// Binding to an observable transformed by `map`.
pub fn bind_mapped<S: Clone + PartialEq + 'static, T: 'static>(
    source: &Observable<S>,
    map: impl Fn(&S) -> T + 'static,
) -> Binding<T> {
    let src = source.clone();
    Binding::new(move || src.with(|v| map(v)))
}

/// Subscriptions owned by one logical scope (a controller context).
#[derive(Default)]
pub struct BindingScope {
    subscriptions: Vec<Subscription>,
}

impl BindingScope {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep `sub` alive until the scope is cleared or dropped.
    pub fn hold(&mut self, sub: Subscription) {
        self.subscriptions.push(sub);
    }

    /// Subscribe to `source` for the lifetime of the scope.
    pub fn subscribe<T: Clone + PartialEq + 'static>(
        &mut self,
        source: &Observable<T>,
        callback: impl Fn(&T) + 'static,
    ) -> &mut Self {
        self.subscriptions.push(source.subscribe(callback));
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Release every subscription, last registered first.
    pub fn clear(&mut self) {
        while self.subscriptions.pop().is_some() {}
    }
}

impl std::fmt::Debug for BindingScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BindingScope")
            .field("binding_count", &self.subscriptions.len())
            .finish()
    }
}
