#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use tether_dom::{Dom, Event, NodeId};
use tether_runtime::{Controller, Engine, Scope};

const NAMES: [&str; 3] = ["alpha", "beta", "gamma"];
const TRIGGERS: [Option<&str>; 4] = [None, Some("visible"), Some("fully-visible"), Some("on:poke")];

#[derive(Debug, Arbitrary)]
enum Op {
    Create { controller: u8, trigger: u8 },
    Append { parent: u8, child: u8 },
    Remove { node: u8 },
    Rename { node: u8, controller: u8 },
    Poke { node: u8 },
    Show { node: u8, ratio: u8 },
    RunTasks,
    Shutdown,
}

fn pick(nodes: &[NodeId], index: u8) -> Option<NodeId> {
    if nodes.is_empty() {
        None
    } else {
        Some(nodes[usize::from(index) % nodes.len()])
    }
}

fuzz_target!(|ops: Vec<Op>| {
    let dom = Dom::new();
    let engine = Engine::new(&dom);
    for name in NAMES {
        let _ = engine.declare(
            name,
            Controller::new(|_| Some(Scope::new().on_disconnected(|_, _| {}))),
        );
    }
    let _ = engine.start();

    let mut nodes = Vec::new();
    for op in ops.into_iter().take(256) {
        match op {
            Op::Create { controller, trigger } => {
                let node = dom.create_element("div");
                let name = NAMES[usize::from(controller) % NAMES.len()];
                let _ = dom.set_attribute(node, "data-controller", name);
                if let Some(trigger) = TRIGGERS[usize::from(trigger) % TRIGGERS.len()] {
                    let _ = dom.set_attribute(node, "data-load", trigger);
                }
                nodes.push(node);
            }
            Op::Append { parent, child } => {
                let parent = if parent % 4 == 0 {
                    Some(dom.document())
                } else {
                    pick(&nodes, parent)
                };
                if let (Some(parent), Some(child)) = (parent, pick(&nodes, child)) {
                    let _ = dom.append_child(parent, child);
                }
            }
            Op::Remove { node } => {
                if let Some(node) = pick(&nodes, node) {
                    let _ = dom.remove(node);
                }
            }
            Op::Rename { node, controller } => {
                if let Some(node) = pick(&nodes, node) {
                    let name = NAMES[usize::from(controller) % NAMES.len()];
                    let _ = dom.set_attribute(node, "data-controller", name);
                }
            }
            Op::Poke { node } => {
                if let Some(node) = pick(&nodes, node) {
                    let _ = dom.dispatch_event(node, Event::new("poke"));
                }
            }
            Op::Show { node, ratio } => {
                if let Some(node) = pick(&nodes, node) {
                    let _ = dom.set_intersection_ratio(node, f64::from(ratio) / 255.0);
                }
            }
            Op::RunTasks => {
                dom.run_tasks();
            }
            Op::Shutdown => {
                engine.shutdown();
                let _ = engine.start();
            }
        }

        // Bound or pending elements are always attached, and never both.
        for node in &nodes {
            let registered = engine.is_initialized(*node);
            let pending = engine.is_pending(*node);
            assert!(!(registered && pending));
            if registered || pending {
                assert!(dom.is_connected(*node));
            }
        }
    }
});
