#![forbid(unsafe_code)]

//! Integration tests: controller lifecycle through the engine.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use pretty_assertions::assert_eq;
use tether_dom::Event;
use tether_harness::{Fixture, el, init_tracing};
use tether_runtime::{Controller, Engine, Error, Scope, Visibility};

fn counting(calls: &Rc<Cell<u32>>) -> Controller {
    let calls = Rc::clone(calls);
    Controller::new(move |_| {
        calls.set(calls.get() + 1);
        None
    })
}

fn push_log(log: &Rc<RefCell<Vec<String>>>, entry: impl Into<String>) {
    log.borrow_mut().push(entry.into());
}

// ============================================================================
// Immediate initialization
// ============================================================================

#[test]
fn immediate_initialization_is_idempotent() {
    init_tracing();
    let fixture = Fixture::mount(el("div").attr("id", "hello").attr("data-controller", "hello")).unwrap();
    let engine = Engine::new(fixture.dom());
    let calls = Rc::new(Cell::new(0));
    engine.declare("hello", counting(&calls)).unwrap();

    let hello = fixture.id("hello");
    assert!(engine.is_initialized(hello));
    for _ in 0..3 {
        engine.initialize(hello).unwrap();
        engine.resolve_pending(hello).unwrap();
    }
    engine.start().unwrap();
    assert_eq!(calls.get(), 1);
    assert_eq!(engine.len(), 1);
}

#[test]
fn start_binds_in_document_order_and_follows_new_elements() {
    init_tracing();
    let fixture = Fixture::mount(
        el("main").children([
            el("div").attr("id", "a").attr("data-controller", "tag"),
            el("div").attr("id", "b").attr("data-controller", "tag"),
        ]),
    )
    .unwrap();
    let engine = Engine::new(fixture.dom());
    let order = Rc::new(RefCell::new(Vec::new()));
    let o = Rc::clone(&order);
    engine
        .declare(
            "tag",
            Controller::new(move |ctx| {
                let id = ctx.dom().attribute(ctx.root(), "id").unwrap_or_default();
                push_log(&o, id);
                None
            }),
        )
        .unwrap();
    engine.start().unwrap();
    assert_eq!(*order.borrow(), vec!["a", "b"]);

    let added = fixture
        .append(
            fixture.root(),
            &el("section").child(el("div").attr("id", "c").attr("data-controller", "tag")),
        )
        .unwrap();
    assert!(engine.is_initialized(fixture.id("c")));
    assert_eq!(order.borrow().last().map(String::as_str), Some("c"));
    assert!(!engine.is_initialized(added));
}

#[test]
fn unknown_controller_surfaces_as_error() {
    init_tracing();
    let fixture = Fixture::mount(el("div").attr("id", "x").attr("data-controller", "missing")).unwrap();
    let engine = Engine::new(fixture.dom());
    let x = fixture.id("x");
    assert_eq!(
        engine.start(),
        Err(Error::UnknownController {
            name: "missing".into(),
            element: x,
        })
    );
    assert!(engine.is_empty());

    // Declaring later binds the element that was skipped.
    engine.declare("missing", Controller::new(|_| None)).unwrap();
    assert!(engine.is_initialized(x));
}

// ============================================================================
// Deferred initialization
// ============================================================================

#[test]
fn event_trigger_drains_pending_queue_in_order() {
    init_tracing();
    let fixture = Fixture::mount(
        el("div")
            .attr("id", "menu")
            .attr("data-controller", "menu")
            .attr("data-load", "on:mouseenter"),
    )
    .unwrap();
    let engine = Engine::new(fixture.dom());
    let log = Rc::new(RefCell::new(Vec::new()));
    let l = Rc::clone(&log);
    engine
        .declare(
            "menu",
            Controller::new(move |_| {
                push_log(&l, "factory");
                None
            }),
        )
        .unwrap();

    let menu = fixture.id("menu");
    assert!(engine.is_pending(menu));
    assert!(!engine.is_initialized(menu));
    for name in ["first", "second", "third"] {
        let l = Rc::clone(&log);
        engine.when_initialized(menu, move || push_log(&l, name)).unwrap();
    }
    assert_eq!(engine.pending_len(menu), 3);
    assert!(log.borrow().is_empty());

    // A different event does not resolve the trigger.
    fixture.dom().click(menu).unwrap();
    assert!(engine.is_pending(menu));

    fixture.dom().dispatch_event(menu, Event::new("mouseenter")).unwrap();
    assert!(engine.is_initialized(menu));
    assert!(!engine.is_pending(menu));
    assert_eq!(engine.pending_len(menu), 0);
    assert_eq!(*log.borrow(), vec!["factory", "first", "second", "third"]);
    assert_eq!(fixture.dom().listener_count(menu, "mouseenter"), 0);

    // Continuations added after registration run at once.
    let l = Rc::clone(&log);
    engine.when_initialized(menu, move || push_log(&l, "late")).unwrap();
    assert_eq!(log.borrow().last().map(String::as_str), Some("late"));
}

#[test]
fn visibility_triggers_respect_thresholds() {
    init_tracing();
    let fixture = Fixture::mount(el("div").children([
        el("div")
            .attr("id", "lazy")
            .attr("data-controller", "panel")
            .attr("data-load", "visible"),
        el("div")
            .attr("id", "strict")
            .attr("data-controller", "panel")
            .attr("data-load", "fully-visible"),
    ]))
    .unwrap();
    let engine = Engine::new(fixture.dom());
    let calls = Rc::new(Cell::new(0));
    engine.declare("panel", counting(&calls)).unwrap();
    let (lazy, strict) = (fixture.id("lazy"), fixture.id("strict"));
    assert!(engine.is_pending(lazy) && engine.is_pending(strict));

    fixture.dom().set_intersection_ratio(lazy, 0.1).unwrap();
    fixture.dom().set_intersection_ratio(strict, 0.5).unwrap();
    assert!(engine.is_initialized(lazy));
    assert!(engine.is_pending(strict));

    fixture.dom().set_intersection_ratio(strict, 1.0).unwrap();
    assert!(engine.is_initialized(strict));
    assert_eq!(calls.get(), 2);
}

#[test]
fn already_visible_element_resolves_on_next_task() {
    init_tracing();
    let dom = tether_dom::Dom::new();
    let node = el("div")
        .attr("data-controller", "panel")
        .attr("data-load", "visible")
        .mount(&dom, dom.document())
        .unwrap();
    dom.set_intersection_ratio(node, 1.0).unwrap();

    let engine = Engine::new(&dom);
    engine.declare("panel", Controller::new(|_| None)).unwrap();
    assert!(engine.is_pending(node));
    assert_eq!(dom.run_tasks(), 1);
    assert!(engine.is_initialized(node));
}

#[test]
fn repeat_marker_keeps_observing_without_reinitializing() {
    init_tracing();
    let fixture = Fixture::mount(
        el("div")
            .attr("id", "feed")
            .attr("data-controller", "feed")
            .attr("data-load", "visible")
            .attr("data-load-repeat", ""),
    )
    .unwrap();
    let engine = Engine::new(fixture.dom());
    let calls = Rc::new(Cell::new(0));
    engine.declare("feed", counting(&calls)).unwrap();
    let feed = fixture.id("feed");

    for ratio in [0.5, 0.0, 0.7, 0.0, 1.0] {
        fixture.dom().set_intersection_ratio(feed, ratio).unwrap();
    }
    assert!(engine.is_initialized(feed));
    assert_eq!(calls.get(), 1);
    let observer = engine.visibility_observer_id(Visibility::Any).unwrap();
    assert!(fixture.dom().is_observing(observer, feed));
}

#[test]
fn visible_element_without_repeat_is_unobserved() {
    init_tracing();
    let fixture = Fixture::mount(
        el("div")
            .attr("id", "card")
            .attr("data-controller", "card")
            .attr("data-load", "visible"),
    )
    .unwrap();
    let engine = Engine::new(fixture.dom());
    engine.declare("card", Controller::new(|_| None)).unwrap();
    let card = fixture.id("card");
    let observer = engine.visibility_observer_id(Visibility::Any).unwrap();
    assert!(fixture.dom().is_observing(observer, card));

    fixture.dom().set_intersection_ratio(card, 0.3).unwrap();
    assert!(engine.is_initialized(card));
    assert!(!fixture.dom().is_observing(observer, card));
}

#[test]
fn visibility_observers_are_shared_per_threshold() {
    init_tracing();
    let fixture = Fixture::mount(el("div").children([
        el("div").attr("id", "a").attr("data-controller", "tile").attr("data-load", "visible"),
        el("div").attr("id", "b").attr("data-controller", "tile").attr("data-load", "visible"),
        el("div")
            .attr("id", "c")
            .attr("data-controller", "tile")
            .attr("data-load", "fully-visible"),
    ]))
    .unwrap();
    let engine = Engine::new(fixture.dom());
    assert_eq!(engine.visibility_observer_id(Visibility::Any), None);
    engine.declare("tile", Controller::new(|_| None)).unwrap();

    let any = engine.visibility_observer_id(Visibility::Any).unwrap();
    let full = engine.visibility_observer_id(Visibility::Full).unwrap();
    assert_ne!(any, full);
    let dom = fixture.dom();
    assert!(dom.is_observing(any, fixture.id("a")));
    assert!(dom.is_observing(any, fixture.id("b")));
    assert!(dom.is_observing(full, fixture.id("c")));
    assert!(!dom.is_observing(any, fixture.id("c")));
}

#[test]
fn unrecognised_trigger_falls_back_to_immediate() {
    init_tracing();
    let fixture = Fixture::mount(el("div").children([
        el("div").attr("id", "a").attr("data-controller", "x").attr("data-load", "soon"),
        el("div").attr("id", "b").attr("data-controller", "x").attr("data-load", "on:"),
    ]))
    .unwrap();
    let engine = Engine::new(fixture.dom());
    engine.declare("x", Controller::new(|_| None)).unwrap();
    assert!(engine.is_initialized(fixture.id("a")));
    assert!(engine.is_initialized(fixture.id("b")));
}

// ============================================================================
// Detachment
// ============================================================================

#[test]
fn detachment_runs_hook_once_and_reattachment_starts_fresh() {
    init_tracing();
    let fixture = Fixture::mount(
        el("div").child(el("div").attr("id", "card").attr("data-controller", "card")),
    )
    .unwrap();
    let engine = Engine::new(fixture.dom());
    engine.start().unwrap();
    let log = Rc::new(RefCell::new(Vec::new()));
    let l = Rc::clone(&log);
    engine
        .declare(
            "card",
            Controller::new(move |_| {
                let (a, b) = (Rc::clone(&l), Rc::clone(&l));
                Some(
                    Scope::new()
                        .on_connected(move |_, _| push_log(&a, "connected"))
                        .on_disconnected(move |_, _| push_log(&b, "disconnected")),
                )
            }),
        )
        .unwrap();

    let card = fixture.id("card");
    let first = engine.context(card).unwrap();
    fixture.dom().remove(card).unwrap();
    engine.disconnected(card);
    assert!(!engine.is_initialized(card));
    assert!(first.is_released());
    assert_eq!(*log.borrow(), vec!["connected", "disconnected"]);

    fixture.dom().append_child(fixture.root(), card).unwrap();
    let second = engine.context(card).unwrap();
    assert!(!second.ptr_eq(&first));
    assert_eq!(
        *log.borrow(),
        vec!["connected", "disconnected", "connected"]
    );
}

#[test]
fn removing_an_ancestor_detaches_nested_controllers() {
    init_tracing();
    let fixture = Fixture::mount(
        el("section").attr("id", "outer").attr("data-controller", "node").child(
            el("div")
                .attr("id", "inner")
                .attr("data-controller", "node")
                .child(el("div").attr("id", "leaf").attr("data-controller", "node")),
        ),
    )
    .unwrap();
    let engine = Engine::new(fixture.dom());
    engine.start().unwrap();
    let detached = Rc::new(RefCell::new(Vec::new()));
    let d = Rc::clone(&detached);
    engine
        .declare(
            "node",
            Controller::new(move |ctx| {
                let d = Rc::clone(&d);
                let id = ctx.dom().attribute(ctx.root(), "id").unwrap_or_default();
                Some(Scope::new().on_disconnected(move |_, _| push_log(&d, id.clone())))
            }),
        )
        .unwrap();
    assert_eq!(engine.len(), 3);

    fixture.dom().remove(fixture.id("outer")).unwrap();
    assert!(engine.is_empty());
    assert_eq!(*detached.borrow(), vec!["outer", "inner", "leaf"]);
}

#[test]
fn panicking_hook_does_not_block_cleanup() {
    init_tracing();
    let fixture = Fixture::mount(el("div").children([
        el("div").attr("id", "bad").attr("data-controller", "bad"),
        el("div").attr("id", "good").attr("data-controller", "good"),
    ]))
    .unwrap();
    let engine = Engine::new(fixture.dom());
    engine.start().unwrap();
    let good_ran = Rc::new(Cell::new(false));
    let g = Rc::clone(&good_ran);
    engine
        .declare(
            "bad",
            Controller::new(|_| Some(Scope::new().on_disconnected(|_, _| panic!("teardown failed")))),
        )
        .unwrap();
    engine
        .declare(
            "good",
            Controller::new(move |_| {
                let g = Rc::clone(&g);
                Some(Scope::new().on_disconnected(move |_, _| g.set(true)))
            }),
        )
        .unwrap();

    fixture.dom().remove(fixture.root()).unwrap();
    assert!(engine.is_empty());
    assert!(good_ran.get());
}

#[test]
fn detaching_pending_element_discards_continuations() {
    init_tracing();
    let fixture = Fixture::mount(
        el("div").child(
            el("div")
                .attr("id", "late")
                .attr("data-controller", "late")
                .attr("data-load", "on:focus"),
        ),
    )
    .unwrap();
    let engine = Engine::new(fixture.dom());
    engine.start().unwrap();
    let calls = Rc::new(Cell::new(0));
    engine.declare("late", counting(&calls)).unwrap();
    let late = fixture.id("late");
    let ran = Rc::new(Cell::new(false));
    let r = Rc::clone(&ran);
    engine.when_initialized(late, move || r.set(true)).unwrap();

    fixture.dom().remove(late).unwrap();
    assert!(!engine.is_pending(late));
    fixture.dom().dispatch_event(late, Event::new("focus")).unwrap();
    assert!(!ran.get());
    assert_eq!(calls.get(), 0);
}

#[test]
fn renaming_the_controller_rebinds_the_element() {
    init_tracing();
    let fixture = Fixture::mount(el("div").attr("id", "w").attr("data-controller", "a")).unwrap();
    let engine = Engine::new(fixture.dom());
    engine.declare("a", Controller::new(|_| None)).unwrap();
    engine.declare("b", Controller::new(|_| None)).unwrap();
    engine.start().unwrap();
    let w = fixture.id("w");
    assert_eq!(engine.context(w).unwrap().name(), "a");

    fixture.dom().set_attribute(w, "data-controller", "b").unwrap();
    assert_eq!(engine.context(w).unwrap().name(), "b");
    assert_eq!(engine.len(), 1);
}
