#![forbid(unsafe_code)]

//! Declarative event binding.
//!
//! Two attribute forms reduce to the same [`EventMap`]:
//!
//! ```text
//! data-on="(click,mouseover): inc | (click): other"
//! <x-on :click="inc,other" :mouseover="inc">
//! ```
//!
//! Both yield `click -> [inc, other]`, `mouseover -> [inc]`. Method lists
//! keep duplicates and concatenate in encounter order when an event repeats.
//!
//! Binding resolves each method against the controller scope (see
//! [`resolve_method`]) and registers the resulting listener on the target in
//! parse order. Methods that do not resolve are skipped.

use tether_dom::NodeId;
use tracing::{debug, warn};

use crate::context::Context;
use crate::error::{Error, Result};
use crate::scope::resolve_method;

/// Ordered event name to method list mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventMap {
    entries: Vec<(String, Vec<String>)>,
}

impl EventMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `methods` to `event`'s list, creating it if needed.
    pub fn push(&mut self, event: &str, methods: impl IntoIterator<Item = String>) {
        match self.entries.iter_mut().find(|(name, _)| name == event) {
            Some((_, list)) => list.extend(methods),
            None => self
                .entries
                .push((event.to_string(), methods.into_iter().collect())),
        }
    }

    #[must_use]
    pub fn get(&self, event: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(name, _)| name == event)
            .map(|(_, list)| list.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(name, list)| (name.as_str(), list.as_slice()))
    }

    /// Number of distinct events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn split_list(list: &str) -> impl Iterator<Item = String> + '_ {
    list.split(',')
        .filter(|item| !item.is_empty())
        .map(str::to_string)
}

/// Parse the combined `(events): methods | ...` form.
///
/// Whitespace is insignificant and empty clauses are ignored.
pub fn parse_event_map(source: &str) -> Result<EventMap> {
    let compact: String = source.chars().filter(|c| !c.is_whitespace()).collect();
    let syntax = |reason: &str| Error::BindingSyntax {
        source: source.to_string(),
        reason: reason.to_string(),
    };

    let mut map = EventMap::new();
    for clause in compact.split('|').filter(|clause| !clause.is_empty()) {
        let body = clause
            .strip_prefix('(')
            .ok_or_else(|| syntax("clause must start with '('"))?;
        let (events, methods) = body
            .split_once("):")
            .ok_or_else(|| syntax("expected '):' after the event list"))?;
        if events.contains(['(', ')']) || methods.contains(['(', ')']) {
            return Err(syntax("unbalanced parentheses"));
        }
        let mut events = split_list(events).peekable();
        if events.peek().is_none() {
            return Err(syntax("empty event list"));
        }
        let methods: Vec<String> = split_list(methods).collect();
        for event in events {
            map.push(&event, methods.iter().cloned());
        }
    }
    Ok(map)
}

/// Collect the discrete `:event="m1,m2"` attributes of a binder element.
#[must_use]
pub fn event_map_from_attributes(attributes: &[(String, String)]) -> EventMap {
    let mut map = EventMap::new();
    for (name, value) in attributes {
        let Some(event) = name.strip_prefix(':').filter(|event| !event.is_empty()) else {
            continue;
        };
        let compact: String = value.chars().filter(|c| !c.is_whitespace()).collect();
        map.push(event, split_list(&compact).collect::<Vec<_>>());
    }
    map
}

/// Register every resolvable method of `map` on `target`. Returns the number
/// of listeners newly registered; a handler already present for the event
/// is not counted again.
pub fn bind_events(
    ctx: &Context,
    map: &EventMap,
    target: NodeId,
    namespace: Option<&str>,
) -> Result<usize> {
    let scope = ctx.scope();
    let mut bound = 0;
    for (event, methods) in map.iter() {
        for method in methods {
            let Some(listener) = resolve_method(&scope, method, namespace) else {
                debug!(
                    controller = %ctx.name(),
                    event,
                    method = %method,
                    ?namespace,
                    "binding method did not resolve, skipped"
                );
                continue;
            };
            let before = ctx.dom().listener_count(target, event);
            ctx.dom().add_event_listener(target, event, listener)?;
            if ctx.dom().listener_count(target, event) > before {
                bound += 1;
            }
        }
    }
    Ok(bound)
}

/// Bind one binder element and remove it from the document.
///
/// The target is the binder's parent, or the element returned by the
/// reference named in its target attribute.
pub fn bind_binder(ctx: &Context, binder: NodeId) -> Result<usize> {
    let dom = ctx.dom();
    let config = ctx.config();
    let target = match dom.attribute(binder, &config.binder_target_attribute) {
        Some(name) => ctx.reference(&name).reset().one()?,
        None => dom.parent(binder).filter(|parent| dom.is_element(*parent)),
    };
    let Some(target) = target else {
        debug!(controller = %ctx.name(), %binder, "binder has no target, skipped");
        return Ok(0);
    };
    let namespace = dom.attribute(target, &config.scope_attribute);
    let map = event_map_from_attributes(&dom.attributes(binder));
    let bound = bind_events(ctx, &map, target, namespace.as_deref())?;
    dom.remove(binder)?;
    Ok(bound)
}

/// Wire every declarative binding below the controller root: elements
/// carrying the events attribute (the root included) and binder elements.
pub fn hydrate(ctx: &Context) -> Result<usize> {
    let dom = ctx.dom();
    let config = ctx.config();
    let mut bound = 0;

    let owner_selector = format!("[{}]", config.controller_attribute);
    let owned = |element: NodeId| -> Result<bool> {
        let Some(parent) = dom.parent(element) else {
            return Ok(false);
        };
        Ok(dom.closest(parent, &owner_selector)? == Some(ctx.root()))
    };

    let mut carriers = Vec::new();
    if dom.has_attribute(ctx.root(), &config.events_attribute) {
        carriers.push(ctx.root());
    }
    let selector = format!("[{}]", config.events_attribute);
    for element in ctx.select_all_fresh(&selector)? {
        if owned(element)? && !dom.has_attribute(element, &config.controller_attribute) {
            carriers.push(element);
        }
    }
    for element in carriers {
        let Some(source) = dom.attribute(element, &config.events_attribute) else {
            continue;
        };
        let map = match parse_event_map(&source) {
            Ok(map) => map,
            Err(err) => {
                warn!(controller = %ctx.name(), %element, %err, "malformed event binding, skipped");
                continue;
            }
        };
        let namespace = dom.attribute(element, &config.scope_attribute);
        bound += bind_events(ctx, &map, element, namespace.as_deref())?;
    }

    for binder in ctx.select_all_fresh(&config.binder_tag)? {
        if owned(binder)? {
            bound += bind_binder(ctx, binder)?;
        }
    }
    Ok(bound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    use std::cell::Cell;
    use std::rc::Rc;

    use tether_dom::{Dom, EventListener, ListenerOptions};

    use crate::config::EngineConfig;
    use crate::scope::Scope;

    fn methods(list: &[&str]) -> Vec<String> {
        list.iter().map(|m| (*m).to_string()).collect()
    }

    #[test]
    fn combined_form_concatenates_repeated_events() {
        let map = parse_event_map("(click,mouseover): inc | (click): other").unwrap();
        assert_eq!(map.get("click"), Some(methods(&["inc", "other"]).as_slice()));
        assert_eq!(map.get("mouseover"), Some(methods(&["inc"]).as_slice()));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn whitespace_and_empty_clauses_are_ignored() {
        let map = parse_event_map("  ( input ) : a , b ||  (change):c|").unwrap();
        assert_eq!(map.get("input"), Some(methods(&["a", "b"]).as_slice()));
        assert_eq!(map.get("change"), Some(methods(&["c"]).as_slice()));
        assert!(parse_event_map("").unwrap().is_empty());
    }

    #[test]
    fn duplicates_are_kept() {
        let map = parse_event_map("(click): a,a | (click): a").unwrap();
        assert_eq!(map.get("click"), Some(methods(&["a", "a", "a"]).as_slice()));
    }

    #[test]
    fn repeated_methods_register_one_listener_per_listing() {
        let dom = Dom::new();
        let root = dom.create_element("div");
        dom.append_child(dom.document(), root).unwrap();
        let ctx = Context::new(&dom, root, "c", Rc::new(EngineConfig::default()), None).unwrap();
        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        ctx.extend_scope(
            &Scope::new()
                .with_method("inc", move |_| h.set(h.get() + 1))
                .with_handler(
                    "handler",
                    EventListener::new(|_| {}).with_options(ListenerOptions::ONCE),
                ),
        );

        let map = parse_event_map("(click): inc,inc,handler | (click): inc,handler").unwrap();
        assert_eq!(bind_events(&ctx, &map, root, None).unwrap(), 4);
        assert_eq!(dom.listener_count(root, "click"), 4);
        dom.click(root).unwrap();
        assert_eq!(hits.get(), 3);
    }

    #[test]
    fn malformed_clauses_are_errors() {
        for source in ["click: inc", "(click inc", "(): inc", "((click)): inc"] {
            assert!(
                matches!(parse_event_map(source), Err(Error::BindingSyntax { .. })),
                "{source}"
            );
        }
    }

    #[test]
    fn discrete_form_matches_combined_form() {
        let attrs = vec![
            (":click".to_string(), "inc, other".to_string()),
            ("target".to_string(), "button".to_string()),
            (":mouseover".to_string(), "inc".to_string()),
            (":".to_string(), "ignored".to_string()),
        ];
        assert_eq!(
            event_map_from_attributes(&attrs),
            parse_event_map("(click): inc,other | (mouseover): inc").unwrap()
        );
    }

    proptest! {
        #[test]
        fn parse_never_panics(source in "\\PC{0,64}") {
            let _ = parse_event_map(&source);
        }

        #[test]
        fn clauses_concatenate_in_order(
            lists in proptest::collection::vec(
                proptest::collection::vec("[a-z]{1,6}", 1..4),
                1..5,
            )
        ) {
            let source = lists
                .iter()
                .map(|list| format!("(click): {}", list.join(",")))
                .collect::<Vec<_>>()
                .join(" | ");
            let map = parse_event_map(&source).unwrap();
            let expected: Vec<String> = lists.concat();
            prop_assert_eq!(map.get("click"), Some(expected.as_slice()));
        }
    }
}
