#![no_main]

use libfuzzer_sys::fuzz_target;
use tether_runtime::{event_map_from_attributes, parse_event_map};

fuzz_target!(|data: &[u8]| {
    let Ok(source) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(map) = parse_event_map(source) else {
        return;
    };

    // Every accepted clause carries a non-empty, whitespace-free event name.
    for (event, methods) in map.iter() {
        assert!(!event.is_empty());
        assert!(!event.chars().any(char::is_whitespace));
        assert!(methods.iter().all(|m| !m.is_empty()));
    }

    // The discrete form of the same mapping parses back to it.
    let attributes: Vec<(String, String)> = map
        .iter()
        .map(|(event, methods)| (format!(":{event}"), methods.join(",")))
        .collect();
    assert_eq!(event_map_from_attributes(&attributes), map);
});
