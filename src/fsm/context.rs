//! Shared mutable context threaded through every FSM handler.
//!
//! `FsmContext` is the single struct that state handlers read from and
//! write to: this tick's motion input, the behaviour state the machine
//! owns, the live configuration, and one-shot audio cues for the main loop
//! to forward.  Think of it as the "blackboard" in a blackboard architecture.

use crate::config::BehaviorConfig;

use super::blink::BlinkCycle;
use super::eyes::Eyes;
use super::head::Head;

// ---------------------------------------------------------------------------
// Behaviour state (owned by the state machine; mutated by handlers and the
// command applier, both on the main loop)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct BehaviorState {
    /// Uptime at initialisation.  Reference point for the update window.
    pub boot_ms: u32,
    /// Uptime at which the current FSM state was entered.
    pub state_entered_ms: u32,
    /// True from detection until the head has settled back to idle.
    pub motion_active: bool,
    /// Last tick on which motion was seen while active.
    pub last_motion_ms: u32,
    pub head: Head,
    /// Manual position set over the command topic.  Suspends automatic
    /// aiming until motion re-triggers or `Resume` arrives.
    pub position_override: Option<u8>,
    pub eyes: Eyes,
    pub blink: BlinkCycle,
}

impl BehaviorState {
    pub fn new(config: &BehaviorConfig, boot_ms: u32) -> Self {
        Self {
            boot_ms,
            state_entered_ms: boot_ms,
            motion_active: false,
            last_motion_ms: boot_ms,
            head: Head::new(config.home_position),
            position_override: None,
            eyes: Eyes::new(config.idle_colour),
            blink: BlinkCycle::new(blink_seed(boot_ms)),
        }
    }
}

/// Seed for the blink timing generator.
///
/// ESP-IDF: drawn from the hardware RNG so every power-up blinks
/// differently.
#[cfg(target_os = "espidf")]
fn blink_seed(_boot_ms: u32) -> u32 {
    let mut buf = [0u8; 4];
    // SAFETY: esp_fill_random writes `buf.len()` bytes into a buffer we
    // exclusively own.
    unsafe {
        esp_idf_svc::sys::esp_fill_random(buf.as_mut_ptr().cast(), buf.len());
    }
    u32::from_le_bytes(buf)
}

/// Host builds derive the seed from boot time so runs are reproducible.
#[cfg(not(target_os = "espidf"))]
fn blink_seed(boot_ms: u32) -> u32 {
    boot_ms ^ 0x5EED_B11C
}

// ---------------------------------------------------------------------------
// Audio cues (written by handlers and commands; consumed by the main loop)
// ---------------------------------------------------------------------------

/// Fire-and-forget audio requests raised during a tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AudioCues {
    pub play: Option<u16>,
    pub volume: Option<u8>,
}

impl AudioCues {
    /// Hand over pending cues and clear them.
    pub fn take(&mut self) -> Self {
        core::mem::take(self)
    }
}

// ---------------------------------------------------------------------------
// FsmContext
// ---------------------------------------------------------------------------

/// The shared context passed to every state handler function.
pub struct FsmContext {
    // -- Timing --
    /// Uptime in ms for this tick (wrapping).
    pub now_ms: u32,

    // -- Input --
    /// Motion sensor reading for this tick.  A failed read counts as `false`.
    pub motion: bool,
    /// `motion` went from low to high on this tick.
    pub motion_rising: bool,

    // -- State --
    pub state: BehaviorState,

    // -- Configuration --
    /// Boot defaults plus any runtime overrides.
    pub config: BehaviorConfig,

    // -- Outputs --
    pub cues: AudioCues,
}

impl FsmContext {
    /// Create a new context with the given configuration.
    pub fn new(config: BehaviorConfig, boot_ms: u32) -> Self {
        let config = config.sanitized();
        Self {
            now_ms: boot_ms,
            motion: false,
            motion_rising: false,
            state: BehaviorState::new(&config, boot_ms),
            config,
            cues: AudioCues::default(),
        }
    }

    /// Record this tick's time and motion reading.
    pub fn observe(&mut self, now_ms: u32, motion: bool) {
        self.motion_rising = motion && !self.motion;
        self.motion = motion;
        self.now_ms = now_ms;
    }

    /// Milliseconds since the current state was entered.
    pub fn ms_in_state(&self) -> u32 {
        self.now_ms.wrapping_sub(self.state.state_entered_ms)
    }

    /// Milliseconds since the last recorded motion.
    pub fn ms_since_motion(&self) -> u32 {
        self.now_ms.wrapping_sub(self.state.last_motion_ms)
    }

    /// Where the head should be heading when nothing is overriding it.
    pub fn aim_head(&mut self, target: u8) {
        if self.state.position_override.is_none() {
            self.state.head.aim(target, self.now_ms);
        }
    }

    /// Advance the head one step if its delay has elapsed.
    pub fn step_head(&mut self) -> bool {
        self.state.head.step(self.now_ms, self.config.step_delay_ms)
    }

    /// Colour the eyes should currently show, before blink is applied.
    pub fn eye_colour(&self) -> crate::config::Rgb {
        self.state.eyes.shown(self.now_ms)
    }
}
