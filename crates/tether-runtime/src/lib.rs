#![forbid(unsafe_code)]

//! Controller runtime for Tether.
//!
//! This crate provides:
//! - [`Engine`] binding named [`Controller`]s to document elements, with
//!   immediate, visibility and event load triggers
//! - [`Context`] per bound element: scoped queries, [`RefHandle`]s, [`Values`]
//!   and a shared [`Scope`]
//! - [`events`] for the declarative `data-on` and binder element forms
//! - [`reactive`] change-tracking primitives behind controller values

pub mod config;
pub mod context;
pub mod controller;
pub mod engine;
pub mod error;
pub mod events;
pub mod query;
pub mod reactive;
pub mod reference;
pub mod scope;
pub mod trigger;
pub mod values;

pub use config::EngineConfig;
pub use context::{Context, WeakContext};
pub use controller::{Controller, Factory};
pub use engine::Engine;
pub use error::{Error, Result};
pub use events::{EventMap, bind_events, event_map_from_attributes, parse_event_map};
pub use query::{ScopedQueryCache, SelectOptions, Selection};
pub use reactive::{Binding, BindingScope, Observable, Subscription};
pub use reference::{AccessMode, Hydration, RefHandle};
pub use scope::{CONNECTED_HOOK, DISCONNECTED_HOOK, ElementHook, Member, Scope, resolve_method};
pub use trigger::{LoadTrigger, Visibility};
pub use values::{Transformer, Values, ValuesSchema, transformers};
