//! Fuzz target: MQTT message routing
//!
//! Feeds arbitrary topics and payloads through the router that runs on
//! the MQTT task.  Nothing may panic; queued messages must round-trip
//! byte-for-byte and update requests must only ever hold HTTP URLs.
//!
//! cargo fuzz run fuzz_inbound_route

#![no_main]

use libfuzzer_sys::fuzz_target;
use prophead::adapters::mqtt::{Routed, route};
use prophead::adapters::ota::UpdateRequestSlot;
use prophead::events::InboundQueue;

const SUB: &str = "cmnd/goblinhead";

fuzz_target!(|data: &[u8]| {
    let split = data.iter().position(|b| *b == 0).unwrap_or(data.len());
    let Ok(topic) = core::str::from_utf8(&data[..split]) else {
        return;
    };
    let payload = data.get(split + 1..).unwrap_or(&[]);

    let queue = InboundQueue::new();
    let slot = UpdateRequestSlot::new();
    match route(SUB, topic, payload, &queue, &slot) {
        Routed::Queued => {
            let msg = queue.pop().expect("queued message");
            assert_eq!(msg.topic.as_str(), topic);
            assert_eq!(msg.payload.as_bytes(), payload);
        }
        Routed::UpdateRequested => {
            let url = slot.take().expect("recorded url");
            assert!(url.starts_with("http://") || url.starts_with("https://"));
        }
        Routed::Dropped => {
            assert!(queue.pop().is_none());
            assert!(slot.take().is_none());
        }
    }
});
