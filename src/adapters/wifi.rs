//! WiFi adapter: station, soft-AP, or both.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: real ESP-IDF WiFi driver via `esp_idf_svc::wifi`.
//! - **all other targets**: simulation stubs for host-side tests.
//!
//! ## Reconnection policy
//!
//! Connects are non-blocking: [`WifiAdapter::poll`] is called from the
//! control loop and starts a new attempt once the backoff has elapsed
//! (2 s → 4 s → 8 s … capped at 60 s).  Nothing here ever waits on the
//! radio, so a missing access point never stalls the head.

use core::fmt;
use log::{info, warn};

use crate::config::{NetworkConfig, WifiMode};

#[cfg(target_os = "espidf")]
use esp_idf_svc::{
    eventloop::EspSystemEventLoop,
    hal::modem::Modem,
    nvs::EspDefaultNvsPartition,
    wifi::{AccessPointConfiguration, AuthMethod, ClientConfiguration, Configuration, EspWifi},
};

// ───────────────────────────────────────────────────────────────
// Errors
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityError {
    NoCredentials,
    InvalidSsid,
    InvalidPassword,
    ConnectionFailed,
}

impl fmt::Display for ConnectivityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCredentials => write!(f, "no WiFi credentials configured"),
            Self::InvalidSsid => write!(f, "SSID invalid (must be 1-32 printable ASCII bytes)"),
            Self::InvalidPassword => write!(f, "password invalid (must be 8-64 bytes for WPA2, or empty for open)"),
            Self::ConnectionFailed => write!(f, "WiFi connection failed"),
        }
    }
}

impl core::error::Error for ConnectivityError {}

// ───────────────────────────────────────────────────────────────
// Connection state
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiState {
    /// Radio not started.
    Down,
    /// Soft-AP only; no station link expected.
    AccessPoint,
    Connecting,
    Connected,
    Reconnecting { attempt: u32 },
}

const INITIAL_BACKOFF_MS: u32 = 2_000;
const MAX_BACKOFF_MS: u32 = 60_000;

/// Exponential retry delay.
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    delay_ms: u32,
    last_attempt_ms: u32,
}

impl Backoff {
    pub fn new() -> Self {
        Self {
            delay_ms: INITIAL_BACKOFF_MS,
            last_attempt_ms: 0,
        }
    }

    pub fn delay_ms(&self) -> u32 {
        self.delay_ms
    }

    /// Whether a new attempt may start at `now_ms`.
    pub fn ready(&self, now_ms: u32) -> bool {
        now_ms.wrapping_sub(self.last_attempt_ms) >= self.delay_ms
    }

    /// Record a failed attempt at `now_ms` and double the delay.
    pub fn failed(&mut self, now_ms: u32) {
        self.last_attempt_ms = now_ms;
        self.delay_ms = self.delay_ms.saturating_mul(2).min(MAX_BACKOFF_MS);
    }

    pub fn reset(&mut self) {
        self.delay_ms = INITIAL_BACKOFF_MS;
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new()
    }
}

// ───────────────────────────────────────────────────────────────
// Validation
// ───────────────────────────────────────────────────────────────

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

fn validate_ssid(ssid: &str) -> Result<(), ConnectivityError> {
    if ssid.is_empty() || ssid.len() > 32 || !is_printable_ascii(ssid) {
        return Err(ConnectivityError::InvalidSsid);
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), ConnectivityError> {
    if password.is_empty() {
        return Ok(());
    }
    if password.len() < 8 || password.len() > 64 {
        return Err(ConnectivityError::InvalidPassword);
    }
    Ok(())
}

// ───────────────────────────────────────────────────────────────
// WiFi adapter
// ───────────────────────────────────────────────────────────────

pub struct WifiAdapter {
    state: WifiState,
    mode: WifiMode,
    ssid: heapless::String<32>,
    password: heapless::String<64>,
    ap_ssid: heapless::String<32>,
    backoff: Backoff,
    #[cfg(target_os = "espidf")]
    wifi: Option<EspWifi<'static>>,
}

impl WifiAdapter {
    /// Validate the compiled network identity.  A station mode without
    /// credentials falls back to soft-AP only.
    pub fn new(network: &NetworkConfig) -> Result<Self, ConnectivityError> {
        let mut mode = network.wifi_mode;
        let mut ssid = heapless::String::new();
        let mut password = heapless::String::new();

        match (mode, network.wifi_ssid) {
            (WifiMode::SoftApOnly, _) => {}
            (_, Some(s)) => {
                let pass = network.wifi_password.unwrap_or("");
                validate_ssid(s)?;
                validate_password(pass)?;
                ssid.push_str(s).map_err(|_| ConnectivityError::InvalidSsid)?;
                password
                    .push_str(pass)
                    .map_err(|_| ConnectivityError::InvalidPassword)?;
            }
            (WifiMode::StationOnly, None) => return Err(ConnectivityError::NoCredentials),
            (WifiMode::Both, None) => {
                warn!("WiFi: no station credentials, soft-AP only");
                mode = WifiMode::SoftApOnly;
            }
        }

        let mut ap_ssid = heapless::String::new();
        ap_ssid
            .push_str(network.ota_hostname)
            .map_err(|_| ConnectivityError::InvalidSsid)?;

        Ok(Self {
            state: WifiState::Down,
            mode,
            ssid,
            password,
            ap_ssid,
            backoff: Backoff::new(),
            #[cfg(target_os = "espidf")]
            wifi: None,
        })
    }

    pub fn state(&self) -> WifiState {
        self.state
    }

    pub fn mode(&self) -> WifiMode {
        self.mode
    }

    pub fn is_connected(&self) -> bool {
        self.state == WifiState::Connected
    }

    fn wants_station(&self) -> bool {
        self.mode != WifiMode::SoftApOnly
    }

    // ── Bring-up ──────────────────────────────────────────────

    /// Configure and start the radio, then kick off the first connect.
    #[cfg(target_os = "espidf")]
    pub fn start(
        &mut self,
        modem: Modem,
        sysloop: EspSystemEventLoop,
        nvs: EspDefaultNvsPartition,
    ) -> Result<(), ConnectivityError> {
        let fail = |e: esp_idf_svc::sys::EspError| {
            warn!("WiFi: driver error {:?}", e);
            ConnectivityError::ConnectionFailed
        };
        let mut wifi = EspWifi::new(modem, sysloop, Some(nvs)).map_err(fail)?;

        let ap = AccessPointConfiguration {
            ssid: self
                .ap_ssid
                .as_str()
                .try_into()
                .map_err(|_| ConnectivityError::InvalidSsid)?,
            auth_method: AuthMethod::None,
            ..Default::default()
        };
        let client = || -> Result<ClientConfiguration, ConnectivityError> {
            Ok(ClientConfiguration {
                ssid: self
                    .ssid
                    .as_str()
                    .try_into()
                    .map_err(|_| ConnectivityError::InvalidSsid)?,
                password: self
                    .password
                    .as_str()
                    .try_into()
                    .map_err(|_| ConnectivityError::InvalidPassword)?,
                auth_method: if self.password.is_empty() {
                    AuthMethod::None
                } else {
                    AuthMethod::WPA2Personal
                },
                ..Default::default()
            })
        };
        let config = match self.mode {
            WifiMode::SoftApOnly => Configuration::AccessPoint(ap),
            WifiMode::StationOnly => Configuration::Client(client()?),
            WifiMode::Both => Configuration::Mixed(client()?, ap),
        };
        wifi.set_configuration(&config).map_err(fail)?;
        wifi.start().map_err(fail)?;
        info!("WiFi: radio up ({:?}, AP '{}')", self.mode, self.ap_ssid);

        if self.wants_station() {
            wifi.connect().map_err(fail)?;
            self.state = WifiState::Connecting;
            info!("WiFi: connecting to '{}'", self.ssid);
        } else {
            self.state = WifiState::AccessPoint;
        }
        self.wifi = Some(wifi);
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn start(&mut self) -> Result<(), ConnectivityError> {
        self.state = if self.wants_station() {
            info!("WiFi(sim): connected to '{}'", self.ssid);
            WifiState::Connected
        } else {
            info!("WiFi(sim): soft-AP '{}'", self.ap_ssid);
            WifiState::AccessPoint
        };
        Ok(())
    }

    // ── Per-tick upkeep ───────────────────────────────────────

    /// Track the link and retry with backoff.  Never blocks.
    pub fn poll(&mut self, now_ms: u32) {
        let link_up = self.platform_is_connected();
        match self.state {
            WifiState::Connecting | WifiState::Reconnecting { .. } if link_up => {
                self.state = WifiState::Connected;
                self.backoff.reset();
                info!("WiFi: connected");
            }
            WifiState::Connected if !link_up => {
                warn!("WiFi: connection lost, entering reconnect");
                self.state = WifiState::Reconnecting { attempt: 0 };
                self.backoff.failed(now_ms);
            }
            WifiState::Connecting => {
                if self.backoff.ready(now_ms) {
                    self.state = WifiState::Reconnecting { attempt: 0 };
                    self.backoff.failed(now_ms);
                }
            }
            WifiState::Reconnecting { attempt } if self.backoff.ready(now_ms) => {
                info!(
                    "WiFi: reconnect attempt {} (backoff {} ms)",
                    attempt + 1,
                    self.backoff.delay_ms()
                );
                self.platform_connect();
                self.backoff.failed(now_ms);
                self.state = WifiState::Reconnecting {
                    attempt: attempt + 1,
                };
            }
            _ => {}
        }
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_connect(&mut self) {
        if let Some(wifi) = self.wifi.as_mut() {
            if let Err(e) = wifi.connect() {
                warn!("WiFi: connect request failed: {:?}", e);
            }
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_connect(&mut self) {
        info!("WiFi(sim): connect requested");
    }

    #[cfg(target_os = "espidf")]
    fn platform_is_connected(&self) -> bool {
        self.wifi
            .as_ref()
            .is_some_and(|w| w.is_connected().unwrap_or(false))
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_is_connected(&self) -> bool {
        self.state == WifiState::Connected
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HeadProfile;

    fn network(mode: WifiMode, ssid: Option<&'static str>, pass: Option<&'static str>) -> NetworkConfig {
        NetworkConfig {
            wifi_mode: mode,
            wifi_ssid: ssid,
            wifi_password: pass,
            ..NetworkConfig::for_profile(HeadProfile::Goblin)
        }
    }

    #[test]
    fn rejects_empty_ssid() {
        let n = network(WifiMode::StationOnly, Some(""), Some("password123"));
        assert_eq!(WifiAdapter::new(&n).err(), Some(ConnectivityError::InvalidSsid));
    }

    #[test]
    fn rejects_short_password() {
        let n = network(WifiMode::StationOnly, Some("MyNet"), Some("short"));
        assert_eq!(WifiAdapter::new(&n).err(), Some(ConnectivityError::InvalidPassword));
    }

    #[test]
    fn accepts_open_network() {
        let n = network(WifiMode::StationOnly, Some("OpenCafe"), None);
        assert!(WifiAdapter::new(&n).is_ok());
    }

    #[test]
    fn station_only_needs_credentials() {
        let n = network(WifiMode::StationOnly, None, None);
        assert_eq!(WifiAdapter::new(&n).err(), Some(ConnectivityError::NoCredentials));
    }

    #[test]
    fn both_without_credentials_falls_back_to_ap() {
        let n = network(WifiMode::Both, None, None);
        let mut a = WifiAdapter::new(&n).unwrap();
        assert_eq!(a.mode(), WifiMode::SoftApOnly);
        a.start().unwrap();
        assert_eq!(a.state(), WifiState::AccessPoint);
        assert!(!a.is_connected());
    }

    #[test]
    fn sim_station_connects() {
        let n = network(WifiMode::Both, Some("HomeWiFi"), Some("mysecret8"));
        let mut a = WifiAdapter::new(&n).unwrap();
        a.start().unwrap();
        a.poll(10);
        assert!(a.is_connected());
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let mut b = Backoff::new();
        assert!(b.ready(2_000));
        b.failed(2_000);
        assert_eq!(b.delay_ms(), 4_000);
        assert!(!b.ready(5_999));
        assert!(b.ready(6_000));
        for _ in 0..10 {
            b.failed(0);
        }
        assert_eq!(b.delay_ms(), MAX_BACKOFF_MS);
        b.reset();
        assert_eq!(b.delay_ms(), INITIAL_BACKOFF_MS);
    }
}
