#![forbid(unsafe_code)]

//! Integration tests: declarative event binding.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use pretty_assertions::assert_eq;
use tether_dom::{Event, EventListener, ListenerOptions};
use tether_harness::{Fixture, el, init_tracing};
use tether_runtime::{Controller, Engine, Scope, parse_event_map};

type Log = Rc<RefCell<Vec<String>>>;

fn logging(log: &Log, entry: &'static str) -> impl Fn(&mut Event) + 'static {
    let log = Rc::clone(log);
    move |event: &mut Event| {
        log.borrow_mut()
            .push(format!("{entry}:{}", event.event_type()));
    }
}

#[test]
fn combined_form_parses_to_ordered_lists() {
    let map = parse_event_map("(click,mouseover): inc | (click): other").unwrap();
    let collected: Vec<(&str, Vec<&str>)> = map
        .iter()
        .map(|(event, methods)| (event, methods.iter().map(String::as_str).collect()))
        .collect();
    assert_eq!(
        collected,
        vec![("click", vec!["inc", "other"]), ("mouseover", vec!["inc"])]
    );
}

#[test]
fn data_on_binds_methods_in_parse_order() {
    init_tracing();
    let fixture = Fixture::mount(
        el("div").attr("data-controller", "counter").child(
            el("button")
                .attr("id", "btn")
                .attr("data-on", "(click, mouseover): inc | (click): other, missing"),
        ),
    )
    .unwrap();
    let engine = Engine::new(fixture.dom());
    let log: Log = Rc::default();
    let l = Rc::clone(&log);
    engine
        .declare(
            "counter",
            Controller::new(move |_| {
                Some(
                    Scope::new()
                        .with_method("inc", logging(&l, "inc"))
                        .with_method("other", logging(&l, "other")),
                )
            }),
        )
        .unwrap();

    let btn = fixture.id("btn");
    fixture.dom().click(btn).unwrap();
    fixture.dom().dispatch_event(btn, Event::new("mouseover")).unwrap();
    assert_eq!(
        *log.borrow(),
        vec!["inc:click", "other:click", "inc:mouseover"]
    );
}

#[test]
fn repeated_method_fires_once_per_listing() {
    init_tracing();
    let fixture = Fixture::mount(
        el("div")
            .attr("id", "root")
            .attr("data-controller", "repeat")
            .attr("data-on", "(click): inc,inc | (click): inc"),
    )
    .unwrap();
    let engine = Engine::new(fixture.dom());
    let hits = Rc::new(Cell::new(0));
    let h = Rc::clone(&hits);
    engine
        .declare(
            "repeat",
            Controller::new(move |_| {
                let h = Rc::clone(&h);
                Some(Scope::new().with_method("inc", move |_| h.set(h.get() + 1)))
            }),
        )
        .unwrap();

    let root = fixture.id("root");
    assert_eq!(fixture.dom().listener_count(root, "click"), 3);
    fixture.dom().click(root).unwrap();
    assert_eq!(hits.get(), 3);
}

#[test]
fn once_handler_fires_once_across_two_clicks() {
    init_tracing();
    let fixture = Fixture::mount(
        el("div")
            .attr("id", "root")
            .attr("data-controller", "once")
            .attr("data-on", "(click): handler"),
    )
    .unwrap();
    let engine = Engine::new(fixture.dom());
    let hits = Rc::new(Cell::new(0));
    let h = Rc::clone(&hits);
    engine
        .declare(
            "once",
            Controller::new(move |_| {
                let h = Rc::clone(&h);
                let handler = EventListener::new(move |_| h.set(h.get() + 1))
                    .with_options(ListenerOptions::ONCE);
                Some(Scope::new().with_handler("handler", handler))
            }),
        )
        .unwrap();

    let root = fixture.id("root");
    fixture.dom().click(root).unwrap();
    fixture.dom().click(root).unwrap();
    assert_eq!(hits.get(), 1);
}

#[test]
fn scope_attribute_and_literal_prefix_resolve_namespaces() {
    init_tracing();
    let fixture = Fixture::mount(
        el("nav").attr("data-controller", "nav").child(
            el("button")
                .attr("id", "toggle")
                .attr("data-scope", "menu")
                .attr("data-on", "(click): open, controller#track"),
        ),
    )
    .unwrap();
    let engine = Engine::new(fixture.dom());
    let log: Log = Rc::default();
    let l = Rc::clone(&log);
    engine
        .declare(
            "nav",
            Controller::new(move |ctx| {
                let l2 = Rc::clone(&l);
                ctx.mount("menu", move |_| {
                    Scope::new().with_method("open", logging(&l2, "menu.open"))
                });
                Some(
                    Scope::new()
                        .with_method("open", logging(&l, "root.open"))
                        .with_method("track", logging(&l, "track")),
                )
            }),
        )
        .unwrap();

    fixture.dom().click(fixture.id("toggle")).unwrap();
    assert_eq!(*log.borrow(), vec!["menu.open:click", "track:click"]);
}

#[test]
fn binder_attaches_to_parent_and_removes_itself() {
    init_tracing();
    let fixture = Fixture::mount(
        el("form").attr("data-controller", "form").child(
            el("input").attr("id", "field").child(
                el("x-on")
                    .attr(":input", "changed")
                    .attr(":focus", "focused, changed"),
            ),
        ),
    )
    .unwrap();
    let engine = Engine::new(fixture.dom());
    let log: Log = Rc::default();
    let l = Rc::clone(&log);
    engine
        .declare(
            "form",
            Controller::new(move |_| {
                Some(
                    Scope::new()
                        .with_method("changed", logging(&l, "changed"))
                        .with_method("focused", logging(&l, "focused")),
                )
            }),
        )
        .unwrap();

    let field = fixture.id("field");
    assert!(fixture.all("x-on").unwrap().is_empty());
    assert!(fixture.dom().children(field).is_empty());
    fixture.dom().dispatch_event(field, Event::new("focus")).unwrap();
    fixture.dom().dispatch_event(field, Event::new("input")).unwrap();
    assert_eq!(
        *log.borrow(),
        vec!["focused:focus", "changed:focus", "changed:input"]
    );
}

#[test]
fn binder_target_names_a_reference() {
    init_tracing();
    let fixture = Fixture::mount(
        el("div").attr("data-controller", "dialog").children([
            el("button").attr("id", "close").attr("data-ref", "close"),
            el("x-on").attr("target", "close").attr(":click", "dismiss"),
        ]),
    )
    .unwrap();
    let engine = Engine::new(fixture.dom());
    let log: Log = Rc::default();
    let l = Rc::clone(&log);
    engine
        .declare(
            "dialog",
            Controller::new(move |_| Some(Scope::new().with_method("dismiss", logging(&l, "dismiss")))),
        )
        .unwrap();

    fixture.dom().click(fixture.id("close")).unwrap();
    assert_eq!(*log.borrow(), vec!["dismiss:click"]);
    assert!(fixture.all("x-on").unwrap().is_empty());
}

#[test]
fn late_binder_binds_under_a_registered_controller() {
    init_tracing();
    let fixture = Fixture::mount(
        el("div")
            .attr("data-controller", "panel")
            .child(el("button").attr("id", "go")),
    )
    .unwrap();
    let engine = Engine::new(fixture.dom());
    engine.start().unwrap();
    let log: Log = Rc::default();
    let l = Rc::clone(&log);
    engine
        .declare(
            "panel",
            Controller::new(move |_| Some(Scope::new().with_method("go", logging(&l, "go")))),
        )
        .unwrap();

    let go = fixture.id("go");
    fixture.append(go, &el("x-on").attr(":click", "go")).unwrap();
    assert!(fixture.dom().children(go).is_empty());
    fixture.dom().click(go).unwrap();
    assert_eq!(*log.borrow(), vec!["go:click"]);
}

#[test]
fn nested_controller_keeps_its_own_bindings() {
    init_tracing();
    let fixture = Fixture::mount(
        el("div").attr("data-controller", "outer").children([
            el("div")
                .attr("data-controller", "first")
                .child(el("button").attr("id", "a").attr("data-on", "(click): hit")),
            el("div")
                .attr("data-controller", "second")
                .child(el("button").attr("id", "b").attr("data-on", "(click): hit")),
        ]),
    )
    .unwrap();
    let engine = Engine::new(fixture.dom());
    let log: Log = Rc::default();
    for name in ["outer", "first", "second"] {
        let l = Rc::clone(&log);
        engine
            .declare(
                name,
                Controller::new(move |_| Some(Scope::new().with_method("hit", logging(&l, name)))),
            )
            .unwrap();
    }

    fixture.dom().click(fixture.id("a")).unwrap();
    fixture.dom().click(fixture.id("b")).unwrap();
    assert_eq!(*log.borrow(), vec!["first:click", "second:click"]);
}

#[test]
fn malformed_binding_is_skipped_without_aborting() {
    init_tracing();
    let fixture = Fixture::mount(
        el("div").attr("data-controller", "form").children([
            el("button").attr("id", "bad").attr("data-on", "click: save"),
            el("button").attr("id", "good").attr("data-on", "(click): save"),
        ]),
    )
    .unwrap();
    let engine = Engine::new(fixture.dom());
    let log: Log = Rc::default();
    let l = Rc::clone(&log);
    engine
        .declare(
            "form",
            Controller::new(move |_| Some(Scope::new().with_method("save", logging(&l, "save")))),
        )
        .unwrap();

    fixture.dom().click(fixture.id("bad")).unwrap();
    fixture.dom().click(fixture.id("good")).unwrap();
    assert_eq!(*log.borrow(), vec!["save:click"]);
}

// ============================================================================
// Properties
// ============================================================================

mod properties {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// Listeners fire in parse order, once per listing.
        #[test]
        fn dispatch_follows_parse_order(methods in proptest::collection::vec(0usize..3, 1..8)) {
            const NAMES: [&str; 3] = ["a", "b", "c"];
            let listed: Vec<&str> = methods.iter().map(|i| NAMES[*i]).collect();
            let fixture = Fixture::mount(
                el("div")
                    .attr("id", "root")
                    .attr("data-controller", "p")
                    .attr("data-on", &format!("(click): {}", listed.join(","))),
            )
            .unwrap();
            let engine = Engine::new(fixture.dom());
            let log: Log = Rc::default();
            let l = Rc::clone(&log);
            engine
                .declare(
                    "p",
                    Controller::new(move |_| {
                        Some(NAMES.iter().fold(Scope::new(), |scope, &name| {
                            scope.with_method(name, logging(&l, name))
                        }))
                    }),
                )
                .unwrap();

            fixture.dom().click(fixture.id("root")).unwrap();
            let expected: Vec<String> = listed.iter().map(|name| format!("{name}:click")).collect();
            prop_assert_eq!(&*log.borrow(), &expected);
        }
    }
}
