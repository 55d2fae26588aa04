#![forbid(unsafe_code)]

//! Change-tracking primitives backing reactive controller values.
//!
//! - [`Observable`]: a shared, version-tracked value with subscriber
//!   callbacks.
//! - [`Subscription`]: RAII guard that unsubscribes on drop.
//! - [`Binding`]: a read-only view over an observable, optionally mapped.
//! - [`BindingScope`]: owns subscriptions for one controller context and
//!   releases them together when the context is detached.
//!
//! # Architecture
//!
//! `Observable<T>` uses `Rc<RefCell<..>>` for single-threaded shared
//! ownership. Subscribers are stored as `Weak` callbacks and pruned lazily
//! during notification. Callbacks run with no borrow held.
//!
//! # Invariants
//!
//! 1. Version increments exactly once per mutation that changes the value.
//! 2. Subscribers are notified in registration order.
//! 3. Setting a value equal to the current value is a no-op.
//! 4. Dropping a [`Subscription`] removes the callback before the next
//!    notification cycle.

pub mod binding;
pub mod observable;

pub use binding::{Binding, BindingScope, bind_mapped, bind_observable};
pub use observable::{Observable, Subscription};
