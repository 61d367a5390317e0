//! MQTT adapter: command intake and status publishing.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `EspMqttClient` from `esp_idf_svc::mqtt`.
//!   The client runs its own task; its callback only copies messages into
//!   the [`InboundQueue`] and flips connection flags.
//! - **all other targets**: an in-memory link for host-side tests.
//!
//! ## Routing
//!
//! Messages on `<sub_topic>/Upgrade` carry a firmware image URL and go to
//! the [`UpdateRequestSlot`]; they never reach the command decoder.
//! Everything else is queued for the control loop.

use log::{info, warn};

use crate::adapters::ota::UpdateRequestSlot;
use crate::app::ports::StatusPublisher;
use crate::config::NetworkConfig;
use crate::error::CommsError;
use crate::events::{InboundMessage, InboundQueue};

#[cfg(target_os = "espidf")]
use core::sync::atomic::{AtomicBool, Ordering};
#[cfg(target_os = "espidf")]
use esp_idf_svc::mqtt::client::{
    EspMqttClient, EventPayload, MqttClientConfiguration, QoS,
};

/// Command word that asks for a firmware update.
pub const UPGRADE_COMMAND: &str = "Upgrade";

/// Where an inbound message ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Routed {
    Queued,
    UpdateRequested,
    Dropped,
}

/// Sort one received message.  Runs on the MQTT task.
pub fn route(
    sub_topic: &str,
    topic: &str,
    data: &[u8],
    inbound: &InboundQueue,
    updates: &UpdateRequestSlot,
) -> Routed {
    let is_upgrade = topic
        .strip_prefix(sub_topic)
        .and_then(|rest| rest.strip_prefix('/'))
        .is_some_and(|cmd| cmd.eq_ignore_ascii_case(UPGRADE_COMMAND));
    if is_upgrade {
        let url = core::str::from_utf8(data).unwrap_or("");
        return if updates.request(url) {
            Routed::UpdateRequested
        } else {
            warn!("MQTT: bad upgrade URL {:?}", url);
            Routed::Dropped
        };
    }
    match InboundMessage::new(topic, data) {
        Some(msg) => {
            if inbound.push(msg) {
                Routed::Queued
            } else {
                Routed::Dropped
            }
        }
        None => {
            warn!("MQTT: oversized or non-UTF-8 message on {}", topic);
            Routed::Dropped
        }
    }
}

// ── ESP-IDF callback state ────────────────────────────────────

#[cfg(target_os = "espidf")]
static MQTT_CONNECTED: AtomicBool = AtomicBool::new(false);
/// Set on every (re)connect; the control loop subscribes and clears it.
#[cfg(target_os = "espidf")]
static MQTT_RESUBSCRIBE: AtomicBool = AtomicBool::new(false);

// ── Link ──────────────────────────────────────────────────────

pub struct MqttLink {
    enabled: bool,
    #[cfg_attr(not(target_os = "espidf"), allow(dead_code))]
    url: Option<&'static str>,
    #[cfg_attr(not(target_os = "espidf"), allow(dead_code))]
    client_id: &'static str,
    sub_topic: &'static str,
    inbound: &'static InboundQueue,
    updates: &'static UpdateRequestSlot,
    #[cfg(target_os = "espidf")]
    client: Option<EspMqttClient<'static>>,
    #[cfg(not(target_os = "espidf"))]
    sim_connected: bool,
    #[cfg(not(target_os = "espidf"))]
    sim_published: std::vec::Vec<(std::string::String, std::string::String)>,
}

impl MqttLink {
    pub fn new(
        network: &NetworkConfig,
        inbound: &'static InboundQueue,
        updates: &'static UpdateRequestSlot,
    ) -> Self {
        let enabled = network.mqtt_enabled && network.mqtt_url.is_some();
        if network.mqtt_enabled && !enabled {
            warn!("MQTT: enabled but no broker URL compiled in");
        }
        Self {
            enabled,
            url: network.mqtt_url,
            client_id: network.mqtt_client_id,
            sub_topic: network.sub_topic,
            inbound,
            updates,
            #[cfg(target_os = "espidf")]
            client: None,
            #[cfg(not(target_os = "espidf"))]
            sim_connected: false,
            #[cfg(not(target_os = "espidf"))]
            sim_published: std::vec::Vec::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    // ── Per-tick upkeep ───────────────────────────────────────

    /// Create the client once the network is up and resubscribe after
    /// every broker (re)connect.  Never blocks.
    #[cfg(target_os = "espidf")]
    pub fn poll(&mut self, network_up: bool) -> Result<(), CommsError> {
        if !self.enabled {
            return Ok(());
        }
        if self.client.is_none() {
            if !network_up {
                return Ok(());
            }
            let Some(url) = self.url else {
                return Ok(());
            };
            let (sub_topic, inbound, updates) = (self.sub_topic, self.inbound, self.updates);
            let conf = MqttClientConfiguration {
                client_id: Some(self.client_id),
                ..Default::default()
            };
            let client = EspMqttClient::new_cb(url, &conf, move |event| match event.payload() {
                EventPayload::Connected(_) => {
                    MQTT_CONNECTED.store(true, Ordering::Relaxed);
                    MQTT_RESUBSCRIBE.store(true, Ordering::Relaxed);
                }
                EventPayload::Disconnected => {
                    MQTT_CONNECTED.store(false, Ordering::Relaxed);
                }
                EventPayload::Received {
                    topic: Some(topic),
                    data,
                    ..
                } => {
                    route(sub_topic, topic, data, inbound, updates);
                }
                _ => {}
            })
            .map_err(|e| {
                warn!("MQTT: client init failed: {:?}", e);
                CommsError::MqttConnectFailed
            })?;
            info!("MQTT: client started for {}", url);
            self.client = Some(client);
        }

        if MQTT_RESUBSCRIBE.swap(false, Ordering::Relaxed) {
            if let Some(client) = self.client.as_mut() {
                let wildcard = topic_wildcard(self.sub_topic)?;
                for topic in [self.sub_topic, wildcard.as_str()] {
                    if let Err(e) = client.subscribe(topic, QoS::AtMostOnce) {
                        warn!("MQTT: subscribe to {} failed: {:?}", topic, e);
                        MQTT_RESUBSCRIBE.store(true, Ordering::Relaxed);
                        return Err(CommsError::MqttSubscribeFailed);
                    }
                }
                info!("MQTT: connected, listening on {}", self.sub_topic);
            }
        }
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn poll(&mut self, network_up: bool) -> Result<(), CommsError> {
        if self.enabled && network_up && !self.sim_connected {
            self.sim_connected = true;
            info!("MQTT(sim): connected, listening on {}", self.sub_topic);
        }
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    pub fn is_connected(&self) -> bool {
        self.client.is_some() && MQTT_CONNECTED.load(Ordering::Relaxed)
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn is_connected(&self) -> bool {
        self.sim_connected
    }

    // ── Simulation hooks ──────────────────────────────────────

    /// Deliver a message as the broker would.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_deliver(&self, topic: &str, data: &[u8]) -> Routed {
        route(self.sub_topic, topic, data, self.inbound, self.updates)
    }

    /// Every `(topic, payload)` published so far.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_published(&self) -> &[(std::string::String, std::string::String)] {
        &self.sim_published
    }
}

/// `<sub_topic>/+`
#[cfg(target_os = "espidf")]
fn topic_wildcard(sub_topic: &str) -> Result<heapless::String<{ crate::events::TOPIC_CAP }>, CommsError> {
    let mut t = heapless::String::new();
    t.push_str(sub_topic)
        .and_then(|()| t.push_str("/+"))
        .map_err(|()| CommsError::MqttSubscribeFailed)?;
    Ok(t)
}

impl StatusPublisher for MqttLink {
    #[cfg(target_os = "espidf")]
    fn publish(&mut self, topic: &str, payload: &str) -> Result<(), CommsError> {
        if !self.is_connected() {
            return Err(CommsError::NotConnected);
        }
        let client = self.client.as_mut().ok_or(CommsError::NotConnected)?;
        client
            .enqueue(topic, QoS::AtMostOnce, false, payload.as_bytes())
            .map(|_| ())
            .map_err(|e| {
                warn!("MQTT: publish to {} failed: {:?}", topic, e);
                CommsError::MqttPublishFailed
            })
    }

    #[cfg(not(target_os = "espidf"))]
    fn publish(&mut self, topic: &str, payload: &str) -> Result<(), CommsError> {
        if !self.sim_connected {
            return Err(CommsError::NotConnected);
        }
        self.sim_published.push((topic.into(), payload.into()));
        Ok(())
    }
}
