#![forbid(unsafe_code)]

//! In-memory host document for Tether.
//!
//! This crate provides:
//! - [`Dom`]: a shared, single-threaded element tree with attributes,
//!   properties and an event system (capture, target, bubble)
//! - [`SelectorList`]: the CSS selector subset the runtime relies on,
//!   including `:not(<list>)` with descendant combinators
//! - mutation and intersection observers, plus a FIFO task queue standing in
//!   for the host's deferred-callback mechanism
//!
//! The host drives everything explicitly: it builds the tree, reports
//! visibility with [`Dom::set_intersection_ratio`] and drains deferred work
//! with [`Dom::run_tasks`].

pub mod document;
pub mod error;
pub mod event;
pub mod node;
pub mod observer;
pub mod selector;

pub use document::{Dom, value_to_attribute};
pub use error::{DomError, Result};
pub use event::{Event, EventCallback, EventListener, EventPhase, ListenerId, ListenerOptions};
pub use node::{NodeId, dataset_attribute};
pub use observer::{
    IntersectionEntry, IntersectionObserverId, MutationObserverId, MutationRecord,
};
pub use selector::SelectorList;
