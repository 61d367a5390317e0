//! Mock adapters and a tick harness for integration tests.
//!
//! Records every actuator call with the uptime it happened at, so tests
//! can assert on the full output history without touching real
//! GPIO/PWM/UART.

use prophead::app::events::AppEvent;
use prophead::app::ports::{ActuatorPort, EventSink, MotionSensorPort, StatusPublisher, UpdatePort};
use prophead::app::service::AppService;
use prophead::config::{BehaviorConfig, HeadProfile, NetworkConfig, Rgb};
use prophead::error::{ActuatorError, CommsError, SensorError};
use prophead::events::{InboundMessage, InboundQueue};
use prophead::fsm::StateId;

/// Control loop period used by the harness.
pub const TICK_MS: u32 = 10;

// ── Actuator call record ──────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwCall {
    Angle(u8),
    Eyes(Rgb),
    Play(u16),
    Volume(u8),
}

// ── MockHardware ──────────────────────────────────────────────

pub struct MockHardware {
    pub now_ms: u32,
    pub motion: bool,
    pub sensor_fails: bool,
    pub calls: Vec<(u32, HwCall)>,
}

#[allow(dead_code)]
impl MockHardware {
    pub fn new() -> Self {
        Self {
            now_ms: 0,
            motion: false,
            sensor_fails: false,
            calls: Vec::new(),
        }
    }

    pub fn angle(&self) -> Option<u8> {
        self.calls.iter().rev().find_map(|(_, c)| match c {
            HwCall::Angle(a) => Some(*a),
            _ => None,
        })
    }

    pub fn eyes(&self) -> Option<Rgb> {
        self.calls.iter().rev().find_map(|(_, c)| match c {
            HwCall::Eyes(rgb) => Some(*rgb),
            _ => None,
        })
    }

    /// `(time, colour)` of every eye write.
    pub fn eye_writes(&self) -> Vec<(u32, Rgb)> {
        self.calls
            .iter()
            .filter_map(|(t, c)| match c {
                HwCall::Eyes(rgb) => Some((*t, *rgb)),
                _ => None,
            })
            .collect()
    }

    pub fn plays(&self) -> Vec<u16> {
        self.calls
            .iter()
            .filter_map(|(_, c)| match c {
                HwCall::Play(track) => Some(*track),
                _ => None,
            })
            .collect()
    }

    pub fn volumes(&self) -> Vec<u8> {
        self.calls
            .iter()
            .filter_map(|(_, c)| match c {
                HwCall::Volume(v) => Some(*v),
                _ => None,
            })
            .collect()
    }

    fn record(&mut self, call: HwCall) -> Result<(), ActuatorError> {
        self.calls.push((self.now_ms, call));
        Ok(())
    }
}

impl MotionSensorPort for MockHardware {
    fn read_motion(&mut self) -> Result<bool, SensorError> {
        if self.sensor_fails {
            Err(SensorError::GpioReadFailed)
        } else {
            Ok(self.motion)
        }
    }
}

impl ActuatorPort for MockHardware {
    fn set_head_angle(&mut self, degrees: u8) -> Result<(), ActuatorError> {
        self.record(HwCall::Angle(degrees))
    }

    fn set_eyes(&mut self, colour: Rgb) -> Result<(), ActuatorError> {
        self.record(HwCall::Eyes(colour))
    }

    fn play_track(&mut self, track: u16) -> Result<(), ActuatorError> {
        self.record(HwCall::Play(track))
    }

    fn set_volume(&mut self, volume: u8) -> Result<(), ActuatorError> {
        self.record(HwCall::Volume(volume))
    }
}

// ── MockLink ──────────────────────────────────────────────────

pub struct MockLink {
    pub connected: bool,
    pub published: Vec<(String, String)>,
}

impl StatusPublisher for MockLink {
    fn publish(&mut self, topic: &str, payload: &str) -> Result<(), CommsError> {
        if !self.connected {
            return Err(CommsError::NotConnected);
        }
        self.published.push((topic.to_owned(), payload.to_owned()));
        Ok(())
    }
}

// ── MockUpdates ───────────────────────────────────────────────

#[derive(Default)]
pub struct MockUpdates {
    pub pending: bool,
    pub accepted: u32,
    pub rejected: u32,
}

impl UpdatePort for MockUpdates {
    fn update_requested(&mut self) -> bool {
        self.pending
    }

    fn accept_update(&mut self) {
        self.pending = false;
        self.accepted += 1;
    }

    fn reject_update(&mut self) {
        self.pending = false;
        self.rejected += 1;
    }
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── Harness ───────────────────────────────────────────────────

pub struct Harness {
    pub app: AppService,
    pub hw: MockHardware,
    pub inbound: InboundQueue,
    pub link: MockLink,
    pub updates: MockUpdates,
    pub sink: RecordingSink,
    pub now_ms: u32,
}

#[allow(dead_code)]
impl Harness {
    pub fn goblin() -> Self {
        Self::with_config(BehaviorConfig::for_profile(HeadProfile::Goblin))
    }

    /// Build and start a service booted at t=0.
    pub fn with_config(config: BehaviorConfig) -> Self {
        let network = NetworkConfig::for_profile(HeadProfile::Goblin);
        let mut h = Self {
            app: AppService::new(config, &network, 0),
            hw: MockHardware::new(),
            inbound: InboundQueue::new(),
            link: MockLink {
                connected: true,
                published: Vec::new(),
            },
            updates: MockUpdates::default(),
            sink: RecordingSink::default(),
            now_ms: 0,
        };
        h.app.start(&mut h.hw, &mut h.sink);
        h
    }

    /// Run one tick at the current time, then advance the clock.
    pub fn tick(&mut self) {
        self.hw.now_ms = self.now_ms;
        self.app.tick(
            self.now_ms,
            &mut self.hw,
            &self.inbound,
            &mut self.link,
            &mut self.updates,
            &mut self.sink,
        );
        self.now_ms = self.now_ms.wrapping_add(TICK_MS);
    }

    /// Tick up to and including `t_ms`.
    pub fn run_through(&mut self, t_ms: u32) {
        while self.now_ms <= t_ms {
            self.tick();
        }
    }

    /// Queue a message as the MQTT task would.
    pub fn send(&mut self, topic: &str, payload: &str) {
        let msg = InboundMessage::new(topic, payload.as_bytes()).expect("message fits");
        assert!(self.inbound.push(msg), "inbound queue full");
    }

    pub fn state(&self) -> StateId {
        self.app.state()
    }

    /// Every state change, in order.
    pub fn transitions(&self) -> Vec<(StateId, StateId)> {
        self.sink
            .events
            .iter()
            .filter_map(|e| match e {
                AppEvent::StateChanged { from, to } => Some((*from, *to)),
                _ => None,
            })
            .collect()
    }

    pub fn last_status(&self) -> Option<serde_json::Value> {
        self.link
            .published
            .last()
            .and_then(|(_, p)| serde_json::from_str(p).ok())
    }
}
