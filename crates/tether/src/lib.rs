#![forbid(unsafe_code)]

//! Tether public facade.
//!
//! Re-exports the host document ([`dom`]) and the controller runtime
//! ([`runtime`]). Most applications only need the [`prelude`].
//!
//! ```
//! use tether::prelude::*;
//!
//! let dom = Dom::new();
//! let button = dom.create_element("button");
//! dom.set_attribute(button, "data-controller", "counter").unwrap();
//! dom.set_attribute(button, "data-on", "(click): inc").unwrap();
//! dom.append_child(dom.document(), button).unwrap();
//!
//! let engine = Engine::new(&dom);
//! engine
//!     .declare(
//!         "counter",
//!         Controller::new(|ctx| {
//!             let values = ctx.values().cloned();
//!             Some(Scope::new().with_method("inc", move |_| {
//!                 if let Some(values) = &values {
//!                     let next = values.get("count").and_then(|v| v.as_i64()).unwrap_or(0) + 1;
//!                     values.set("count", next).unwrap();
//!                 }
//!             }))
//!         })
//!         .with_values(ValuesSchema::new().with("count", transformers::number, 0)),
//!     )
//!     .unwrap();
//!
//! dom.click(button).unwrap();
//! let count = engine.context(button).unwrap().values().unwrap().get("count");
//! assert_eq!(count, Some(1.into()));
//! ```

pub use tether_dom as dom;
pub use tether_runtime as runtime;

pub use tether_dom::{Dom, DomError, Event, EventListener, ListenerOptions, NodeId};
pub use tether_runtime::{
    Context, Controller, Engine, EngineConfig, Error, Result, Scope, SelectOptions, Values,
    ValuesSchema,
};

/// Everything a controller author usually needs.
pub mod prelude {
    pub use tether_dom::{Dom, Event, EventListener, ListenerOptions, NodeId};
    pub use tether_runtime::{
        Context, Controller, Engine, EngineConfig, Hydration, LoadTrigger, Member, RefHandle,
        Scope, SelectOptions, Selection, Values, ValuesSchema, transformers,
    };
}
