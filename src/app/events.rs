//! Outbound application events and the status snapshot.
//!
//! The [`AppService`](super::service::AppService) emits [`AppEvent`]s
//! through the [`EventSink`](super::ports::EventSink) port and publishes
//! [`StatusReport`]s through the
//! [`StatusPublisher`](super::ports::StatusPublisher) port.

use serde::Serialize;

use crate::config::Rgb;
use crate::error::{ActuatorError, CommsError, SensorError};
use crate::fsm::StateId;
use crate::fsm::context::FsmContext;
use crate::update_gate::WindowPhase;

/// Structured events emitted by the application core.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// The application service has started (carries initial state).
    Started(StateId),

    /// The FSM transitioned between states.
    StateChanged { from: StateId, to: StateId },

    /// A remote command was decoded and applied.
    CommandApplied(&'static str),

    /// An inbound message did not decode to a command.
    CommandIgnored,

    /// Inbound messages were lost to queue overflow (running total).
    InboundDropped(u32),

    /// The update window opened or closed.
    UpdateWindow(WindowPhase),

    UpdateAccepted,
    UpdateRejected,

    /// The motion sensor read failed; treated as no motion.
    SensorFault(SensorError),

    /// An actuator write failed; retried on the next change.
    ActuatorFault(ActuatorError),

    /// A status publish did not go out.
    PublishFailed(CommsError),
}

/// Compact status snapshot published to the status topic.
///
/// Reports the logical eye colour, not the blink sub-state, so two
/// snapshots with no intervening change serialise identically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub state: StateId,
    pub motion: bool,
    pub position: u8,
    pub colour: Rgb,
    pub idle_colour: Rgb,
    pub active_colour: Rgb,
    pub volume: u8,
    pub auto_motion: bool,
    pub auto_blink: bool,
    pub position_override: Option<u8>,
}

impl StatusReport {
    pub fn capture(state: StateId, ctx: &FsmContext) -> Self {
        Self {
            state,
            motion: ctx.state.motion_active,
            position: ctx.state.head.angle(),
            colour: ctx.state.eyes.colour(),
            idle_colour: ctx.config.idle_colour,
            active_colour: ctx.config.active_colour,
            volume: ctx.config.audio_volume,
            auto_motion: ctx.config.auto_motion,
            auto_blink: ctx.config.auto_blink,
            position_override: ctx.state.position_override,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
