//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (which goes to UART / USB-CDC in production).

use log::{debug, info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;
use crate::update_gate::WindowPhase;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started(state) => {
                info!("START | initial_state={}", state.as_str());
            }
            AppEvent::StateChanged { from, to } => {
                info!("STATE | {} -> {}", from.as_str(), to.as_str());
            }
            AppEvent::CommandApplied(name) => {
                info!("CMD | applied {}", name);
            }
            AppEvent::CommandIgnored => {
                debug!("CMD | ignored");
            }
            AppEvent::InboundDropped(total) => {
                warn!("CMD | inbound queue overflow, {} dropped since boot", total);
            }
            AppEvent::UpdateWindow(phase) => match phase {
                WindowPhase::Open => info!("OTA | window open"),
                WindowPhase::Closed => info!("OTA | window closed"),
                WindowPhase::Pending => {}
            },
            AppEvent::UpdateAccepted => {
                info!("OTA | update request accepted");
            }
            AppEvent::UpdateRejected => {
                info!("OTA | update request rejected (window closed)");
            }
            AppEvent::SensorFault(e) => {
                warn!("FAULT | motion sensor: {}", e);
            }
            AppEvent::ActuatorFault(e) => {
                warn!("FAULT | actuator: {}", e);
            }
            AppEvent::PublishFailed(e) => {
                debug!("LINK | status not published: {}", e);
            }
        }
    }
}
