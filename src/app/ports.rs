//! Port traits: the hexagonal boundary between behaviour logic and the
//! outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ AppService (domain)
//! ```
//!
//! Driven adapters (motion sensor, servo/eyes/audio, broker link, update
//! transport, event sinks) implement these traits.  The
//! [`AppService`](super::service::AppService) consumes them via generics,
//! so the domain core never touches hardware directly.

use crate::config::Rgb;
use crate::error::{ActuatorError, CommsError, SensorError};

// ───────────────────────────────────────────────────────────────
// Motion sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port for the PIR sensor.  Polled once per tick.
pub trait MotionSensorPort {
    /// `Ok(true)` while the sensor reports presence.  No debounce is
    /// expected of the implementation.
    fn read_motion(&mut self) -> Result<bool, SensorError>;
}

// ───────────────────────────────────────────────────────────────
// Actuator port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Write-side port: servo, eye LEDs and the audio module.
pub trait ActuatorPort {
    /// Drive the servo to `degrees` (0–180).
    fn set_head_angle(&mut self, degrees: u8) -> Result<(), ActuatorError>;

    /// Write all three eye channels in one call.
    fn set_eyes(&mut self, colour: Rgb) -> Result<(), ActuatorError>;

    /// Start playing a track.  Fire-and-forget.
    fn play_track(&mut self, track: u16) -> Result<(), ActuatorError>;

    /// Set playback volume (0–30).
    fn set_volume(&mut self, volume: u8) -> Result<(), ActuatorError>;
}

// ───────────────────────────────────────────────────────────────
// Status publisher port (driven adapter: domain → broker)
// ───────────────────────────────────────────────────────────────

/// Outbound half of the message-queue link.  Inbound messages arrive
/// through [`InboundQueue`](crate::events::InboundQueue) instead.
pub trait StatusPublisher {
    fn publish(&mut self, topic: &str, payload: &str) -> Result<(), CommsError>;
}

// ───────────────────────────────────────────────────────────────
// Update port (driven adapter: firmware-update transport ↔ domain)
// ───────────────────────────────────────────────────────────────

/// The update transport raises a flag when a client asks to flash new
/// firmware; the domain answers once per request.
pub trait UpdatePort {
    /// A request is waiting for an answer.
    fn update_requested(&mut self) -> bool;

    /// Let the pending request proceed.
    fn accept_update(&mut self);

    /// Drop the pending request.  The requester is not told why.
    fn reject_update(&mut self) {}
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}
