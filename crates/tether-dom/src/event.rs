#![forbid(unsafe_code)]

//! Events and listeners.
//!
//! # Invariants
//!
//! 1. Listeners on one node fire in registration order within a phase.
//! 2. A `ONCE` listener is removed before its callback runs, so a nested
//!    dispatch of the same event cannot fire it a second time.
//! 3. Registering the same callback (`Rc` identity) for the same event type
//!    and capture flag twice is a no-op.

use std::rc::Rc;

use bitflags::bitflags;
use serde_json::Value;
use web_time::Instant;

use crate::node::NodeId;

bitflags! {
    /// Listener registration options.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ListenerOptions: u8 {
        /// Remove the listener after its first invocation.
        const ONCE = 1 << 0;
        /// Fire during the capture phase instead of the bubble phase.
        const CAPTURE = 1 << 1;
        /// The listener promises not to call `prevent_default`.
        const PASSIVE = 1 << 2;
    }
}

/// Identifier returned by [`Dom::add_event_listener`](crate::Dom::add_event_listener).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) u64);

/// Event propagation phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EventPhase {
    #[default]
    None,
    Capturing,
    AtTarget,
    Bubbling,
}

/// A dispatched event.
#[derive(Debug, Clone)]
pub struct Event {
    event_type: String,
    bubbles: bool,
    cancelable: bool,
    detail: Value,
    pub(crate) target: Option<NodeId>,
    pub(crate) current_target: Option<NodeId>,
    pub(crate) phase: EventPhase,
    pub(crate) passive: bool,
    propagation_stopped: bool,
    immediate_propagation_stopped: bool,
    default_prevented: bool,
    time_stamp: Instant,
}

impl Event {
    /// Create a non-bubbling event with a `null` detail.
    #[must_use]
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            bubbles: false,
            cancelable: false,
            detail: Value::Null,
            target: None,
            current_target: None,
            phase: EventPhase::None,
            passive: false,
            propagation_stopped: false,
            immediate_propagation_stopped: false,
            default_prevented: false,
            time_stamp: Instant::now(),
        }
    }

    /// Create a custom event carrying `detail`.
    #[must_use]
    pub fn custom(event_type: impl Into<String>, detail: Value) -> Self {
        Self::new(event_type).with_detail(detail)
    }

    /// Set whether the event bubbles.
    #[must_use]
    pub fn with_bubbles(mut self, bubbles: bool) -> Self {
        self.bubbles = bubbles;
        self
    }

    /// Set whether the event is cancelable.
    #[must_use]
    pub fn with_cancelable(mut self, cancelable: bool) -> Self {
        self.cancelable = cancelable;
        self
    }

    /// Replace the event payload.
    #[must_use]
    pub fn with_detail(mut self, detail: Value) -> Self {
        self.detail = detail;
        self
    }

    #[must_use]
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    #[must_use]
    pub fn bubbles(&self) -> bool {
        self.bubbles
    }

    #[must_use]
    pub fn detail(&self) -> &Value {
        &self.detail
    }

    /// The node the event was dispatched on.
    #[must_use]
    pub fn target(&self) -> Option<NodeId> {
        self.target
    }

    /// The node whose listeners are currently running.
    #[must_use]
    pub fn current_target(&self) -> Option<NodeId> {
        self.current_target
    }

    #[must_use]
    pub fn phase(&self) -> EventPhase {
        self.phase
    }

    #[must_use]
    pub fn time_stamp(&self) -> Instant {
        self.time_stamp
    }

    /// Stop propagation to further nodes. Remaining listeners on the current
    /// node still run.
    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    /// Stop propagation and skip the remaining listeners on the current node.
    pub fn stop_immediate_propagation(&mut self) {
        self.propagation_stopped = true;
        self.immediate_propagation_stopped = true;
    }

    /// Mark the default action as prevented. Ignored for non-cancelable
    /// events and inside passive listeners.
    pub fn prevent_default(&mut self) {
        if self.cancelable && !self.passive {
            self.default_prevented = true;
        }
    }

    #[must_use]
    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }

    #[must_use]
    pub fn propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }

    pub(crate) fn immediate_propagation_stopped(&self) -> bool {
        self.immediate_propagation_stopped
    }
}

/// Listener callback type.
pub type EventCallback = Rc<dyn Fn(&mut Event)>;

/// A callback plus its registration options.
///
/// Covers both DOM listener shapes: a plain function (registered with empty
/// options) and a `handleEvent` object carrying its own options.
#[derive(Clone)]
pub struct EventListener {
    callback: EventCallback,
    options: ListenerOptions,
}

impl EventListener {
    /// Wrap a closure with empty options.
    pub fn new(callback: impl Fn(&mut Event) + 'static) -> Self {
        Self::from_rc(Rc::new(callback))
    }

    /// Wrap an existing shared callback.
    #[must_use]
    pub fn from_rc(callback: EventCallback) -> Self {
        Self {
            callback,
            options: ListenerOptions::empty(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: ListenerOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn options(&self) -> ListenerOptions {
        self.options
    }

    #[must_use]
    pub fn callback(&self) -> &EventCallback {
        &self.callback
    }

    /// Whether both listeners share the same callback allocation.
    #[must_use]
    pub fn same_callback(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.callback, &other.callback)
    }

    pub fn call(&self, event: &mut Event) {
        (self.callback)(event);
    }
}

impl std::fmt::Debug for EventListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventListener")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

pub(crate) struct ListenerEntry {
    pub(crate) id: ListenerId,
    pub(crate) event_type: String,
    pub(crate) listener: EventListener,
}
