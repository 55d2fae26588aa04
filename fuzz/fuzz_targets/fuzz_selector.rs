#![no_main]

use libfuzzer_sys::fuzz_target;
use tether_dom::{Dom, SelectorList};

fuzz_target!(|data: &[u8]| {
    let Ok(selector) = std::str::from_utf8(data) else {
        return;
    };
    if SelectorList::parse(selector).is_err() {
        return;
    }

    let dom = Dom::new();
    let section = dom.create_element("section");
    let _ = dom.set_attribute(section, "data-controller", "outer");
    let _ = dom.append_child(dom.document(), section);
    for (i, tag) in ["button", "div", "x-on", "li"].into_iter().enumerate() {
        let child = dom.create_element(tag);
        let _ = dom.set_attribute(child, "data-ref", &i.to_string());
        let _ = dom.set_attribute(child, "class", "item");
        let _ = dom.append_child(section, child);
    }

    // Every match of a full query also matches on its own, and `closest`
    // starting at a match returns that match.
    let Ok(found) = dom.query_selector_all(dom.document(), selector) else {
        return;
    };
    for node in found {
        assert_eq!(dom.matches(node, selector).ok(), Some(true));
        assert_eq!(dom.closest(node, selector).ok().flatten(), Some(node));
    }
});
