//! Application service: the hexagonal core.
//!
//! [`AppService`] owns the FSM, the behaviour context and the update
//! window gate.  It exposes a hardware-agnostic API.  All I/O flows
//! through port traits injected at call sites, making the entire service
//! testable with mock adapters.
//!
//! ```text
//!  MotionSensorPort ──▶ ┌──────────────────────────┐ ──▶ EventSink
//!      InboundQueue ──▶ │        AppService        │ ──▶ StatusPublisher
//!        UpdatePort ◀─▶ │  FSM · commands · gate   │
//!      ActuatorPort ◀── └──────────────────────────┘
//! ```

use log::{debug, info, warn};

use crate::config::{BehaviorConfig, NetworkConfig, Rgb};
use crate::events::{InboundMessage, InboundQueue};
use crate::fsm::context::FsmContext;
use crate::fsm::states::build_state_table;
use crate::fsm::{Fsm, StateId};
use crate::update_gate::{UpdateWindowGate, WindowPhase};

use super::commands::{self, RemoteCommand};
use super::events::{AppEvent, StatusReport};
use super::ports::{ActuatorPort, EventSink, MotionSensorPort, StatusPublisher, UpdatePort};

/// Last values successfully written to each output.
#[derive(Debug, Default)]
struct Written {
    angle: Option<u8>,
    eyes: Option<Rgb>,
}

// ───────────────────────────────────────────────────────────────
// AppService
// ───────────────────────────────────────────────────────────────

/// The application service orchestrates all behaviour logic.
pub struct AppService {
    fsm: Fsm,
    ctx: FsmContext,
    gate: UpdateWindowGate,
    sub_topic: &'static str,
    pub_topic: &'static str,
    written: Written,
    sensor_ok: bool,
    dropped_seen: u32,
    tick_count: u64,
}

impl AppService {
    /// Construct the service.  `boot_ms` is the uptime the update window
    /// is measured from.
    ///
    /// Does **not** start the FSM; call [`start`](Self::start) next.
    pub fn new(config: BehaviorConfig, network: &NetworkConfig, boot_ms: u32) -> Self {
        let ctx = FsmContext::new(config, boot_ms);
        let gate = UpdateWindowGate::new(&ctx.config, boot_ms);
        let fsm = Fsm::new(build_state_table(), StateId::Idle);

        Self {
            fsm,
            ctx,
            gate,
            sub_topic: network.sub_topic,
            pub_topic: network.pub_topic,
            written: Written::default(),
            sensor_ok: true,
            dropped_seen: 0,
            tick_count: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Enter Idle, push the boot volume and drive every output once.
    pub fn start(&mut self, hw: &mut impl ActuatorPort, sink: &mut impl EventSink) {
        self.fsm.start(&mut self.ctx);
        self.ctx.cues.volume = Some(self.ctx.config.audio_volume);
        self.write_outputs(hw, sink);
        sink.emit(&AppEvent::Started(self.fsm.current_state()));
        info!(
            "AppService started in {:?}, head {}°",
            self.fsm.current_state(),
            self.ctx.state.head.angle()
        );
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one full control cycle:
    /// update gate → motion read → head step → FSM → commands → outputs.
    ///
    /// Never blocks and never fails; port errors are reported through
    /// `sink` and the loop carries on with the last known state.
    pub fn tick(
        &mut self,
        now_ms: u32,
        hw: &mut (impl MotionSensorPort + ActuatorPort),
        inbound: &InboundQueue,
        link: &mut impl StatusPublisher,
        updates: &mut impl UpdatePort,
        sink: &mut impl EventSink,
    ) {
        self.tick_count += 1;

        // 1. Update window
        if let Some(phase) = self.gate.poll(now_ms) {
            sink.emit(&AppEvent::UpdateWindow(phase));
        }
        if updates.update_requested() {
            if self.gate.permits(now_ms) {
                updates.accept_update();
                sink.emit(&AppEvent::UpdateAccepted);
            } else {
                updates.reject_update();
                sink.emit(&AppEvent::UpdateRejected);
            }
        }

        // 2. Motion input (a failed read is "no motion")
        let motion = match hw.read_motion() {
            Ok(m) => {
                if !self.sensor_ok {
                    info!("Motion sensor recovered");
                    self.sensor_ok = true;
                }
                m
            }
            Err(e) => {
                if self.sensor_ok {
                    self.sensor_ok = false;
                    sink.emit(&AppEvent::SensorFault(e));
                }
                false
            }
        };
        self.ctx.observe(now_ms, motion);

        // 3. Head step, then FSM tick (pure state logic)
        self.ctx.step_head();
        let prev_state = self.fsm.current_state();
        if let Some(next) = self.fsm.tick(&mut self.ctx) {
            sink.emit(&AppEvent::StateChanged {
                from: prev_state,
                to: next,
            });
            self.publish_status(link, sink);
        }
        self.ctx.state.eyes.settle(now_ms);

        // 4. Remote commands queued since the last tick
        while let Some(msg) = inbound.pop() {
            self.handle_message(&msg, link, sink);
        }
        let dropped = inbound.dropped();
        if dropped != self.dropped_seen {
            self.dropped_seen = dropped;
            sink.emit(&AppEvent::InboundDropped(dropped));
        }

        // 5. Outputs
        self.write_outputs(hw, sink);
    }

    // ── Command handling ──────────────────────────────────────

    /// Decode and apply one inbound message.
    pub fn handle_message(
        &mut self,
        msg: &InboundMessage,
        link: &mut impl StatusPublisher,
        sink: &mut impl EventSink,
    ) {
        match commands::decode(self.sub_topic, &msg.topic, &msg.payload) {
            Some(cmd) => self.handle_command(cmd, link, sink),
            None => {
                debug!("CMD ignored: {} = {:?}", msg.topic, msg.payload.as_str());
                sink.emit(&AppEvent::CommandIgnored);
            }
        }
    }

    /// Apply a decoded command and publish the resulting status.
    pub fn handle_command(
        &mut self,
        cmd: RemoteCommand,
        link: &mut impl StatusPublisher,
        sink: &mut impl EventSink,
    ) {
        if cmd.is_mutating() {
            commands::apply(cmd, &mut self.ctx, self.fsm.current_state());
            sink.emit(&AppEvent::CommandApplied(cmd.name()));
        }
        self.publish_status(link, sink);
    }

    /// Serialise the current status and hand it to the publisher.
    pub fn publish_status(&mut self, link: &mut impl StatusPublisher, sink: &mut impl EventSink) {
        let json = match self.status().to_json() {
            Ok(json) => json,
            Err(e) => {
                warn!("Status serialisation failed: {}", e);
                return;
            }
        };
        if let Err(e) = link.publish(self.pub_topic, &json) {
            sink.emit(&AppEvent::PublishFailed(e));
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn status(&self) -> StatusReport {
        StatusReport::capture(self.fsm.current_state(), &self.ctx)
    }

    /// Current FSM state.
    pub fn state(&self) -> StateId {
        self.fsm.current_state()
    }

    /// Behaviour context (state, live config).
    pub fn context(&self) -> &FsmContext {
        &self.ctx
    }

    /// Live configuration including runtime overrides.
    pub fn config(&self) -> &BehaviorConfig {
        &self.ctx.config
    }

    pub fn update_window(&self) -> WindowPhase {
        self.gate.phase()
    }

    /// Total control ticks executed since startup.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    // ── Internal ──────────────────────────────────────────────

    /// Write changed outputs and forward pending audio cues.
    fn write_outputs(&mut self, hw: &mut impl ActuatorPort, sink: &mut impl EventSink) {
        // ── Servo ─────────────────────────────────────────────
        let angle = self.ctx.state.head.angle();
        if self.written.angle != Some(angle) {
            match hw.set_head_angle(angle) {
                Ok(()) => self.written.angle = Some(angle),
                Err(e) => sink.emit(&AppEvent::ActuatorFault(e)),
            }
        }

        // ── Eyes (all three channels in one write) ───────────
        let eyes = if self.ctx.state.blink.eyes_closed() {
            Rgb::OFF
        } else {
            self.ctx.eye_colour()
        };
        if self.written.eyes != Some(eyes) {
            match hw.set_eyes(eyes) {
                Ok(()) => self.written.eyes = Some(eyes),
                Err(e) => sink.emit(&AppEvent::ActuatorFault(e)),
            }
        }

        // ── Audio (fire-and-forget; volume before play) ──────
        let cues = self.ctx.cues.take();
        if let Some(volume) = cues.volume {
            if let Err(e) = hw.set_volume(volume) {
                sink.emit(&AppEvent::ActuatorFault(e));
            }
        }
        if let Some(track) = cues.play {
            if let Err(e) = hw.play_track(track) {
                sink.emit(&AppEvent::ActuatorFault(e));
            }
        }
    }
}
