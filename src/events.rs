//! Inbound message hand-off between the network task and the control loop.
//!
//! The MQTT client delivers messages on its own task.  That task never
//! touches behaviour state; it copies each message into a bounded queue
//! and the main loop drains it once per tick.
//!
//! ```text
//! ┌──────────────┐  InboundMessage  ┌──────────────┐
//! │ MQTT callback│─────────────────▶│  Main loop   │
//! │ (producer)   │   bounded queue  │  (consumer)  │
//! └──────────────┘                  └──────────────┘
//! ```
//!
//! Overflow drops the newest message and bumps a counter; the loop never
//! waits on the queue.

use core::sync::atomic::{AtomicU32, Ordering};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use heapless::String;

/// Longest topic accepted (`cmnd/<device>/<Command>`).
pub const TOPIC_CAP: usize = 96;
/// Longest payload accepted.  Commands are tiny; anything bigger is junk.
pub const PAYLOAD_CAP: usize = 128;
/// Pending messages held between ticks.
const QUEUE_DEPTH: usize = 8;

/// One message received on the command topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: String<TOPIC_CAP>,
    pub payload: String<PAYLOAD_CAP>,
}

impl InboundMessage {
    /// Copy a raw message into fixed-capacity storage.
    /// Returns `None` for oversized or non-UTF-8 messages.
    pub fn new(topic: &str, payload: &[u8]) -> Option<Self> {
        let payload = core::str::from_utf8(payload).ok()?;
        let mut msg = Self {
            topic: String::new(),
            payload: String::new(),
        };
        msg.topic.push_str(topic).ok()?;
        msg.payload.push_str(payload).ok()?;
        Some(msg)
    }
}

/// Bounded single-producer queue of inbound messages.
pub struct InboundQueue {
    channel: Channel<CriticalSectionRawMutex, InboundMessage, QUEUE_DEPTH>,
    dropped: AtomicU32,
}

impl Default for InboundQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl InboundQueue {
    pub const fn new() -> Self {
        Self {
            channel: Channel::new(),
            dropped: AtomicU32::new(0),
        }
    }

    /// Enqueue a message.  Safe to call from the network task.
    /// Returns `false` if the queue was full (message dropped).
    pub fn push(&self, msg: InboundMessage) -> bool {
        if self.channel.try_send(msg).is_ok() {
            true
        } else {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            false
        }
    }

    /// Dequeue the oldest message, if any.  Main loop only.
    pub fn pop(&self) -> Option<InboundMessage> {
        self.channel.try_receive().ok()
    }

    /// Messages lost to overflow since boot.
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }
}
