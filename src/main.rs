//! PropHead firmware entry point
//!
//! Hexagonal architecture around a non-blocking control loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter    LogEventSink   MqttLink        OtaAdapter  │
//! │  (Motion+Actuator)  (EventSink)    (StatusPublisher)(UpdatePort)│
//! │  WifiAdapter        Esp32TimeAdapter                           │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              AppService (pure logic)                   │    │
//! │  │  FSM · commands · update window gate                   │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use log::{error, info, warn};

use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::delay::FreeRtos;
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::nvs::EspDefaultNvsPartition;

use prophead::adapters::hardware::HardwareAdapter;
use prophead::adapters::log_sink::LogEventSink;
use prophead::adapters::mqtt::MqttLink;
use prophead::adapters::ota::{self, OtaAdapter, UpdateRequestSlot};
use prophead::adapters::time::Esp32TimeAdapter;
use prophead::adapters::wifi::WifiAdapter;
use prophead::app::service::AppService;
use prophead::config::{BehaviorConfig, HeadProfile, NetworkConfig};
use prophead::drivers::audio::AudioPlayer;
use prophead::drivers::eyes::EyeLeds;
use prophead::drivers::hw_init;
use prophead::drivers::servo::Servo;
use prophead::drivers::watchdog::{Watchdog, DEFAULT_TIMEOUT_MS};
use prophead::events::InboundQueue;
use prophead::pins;
use prophead::sensors::{MotionSensor, PIR_WARMUP_MS};

/// Commands handed over from the MQTT task.
static INBOUND: InboundQueue = InboundQueue::new();
/// Firmware image URL handed over from the MQTT task.
static UPDATE_REQUESTS: UpdateRequestSlot = UpdateRequestSlot::new();

/// Pause between control ticks.  Well under the one-degree step delay.
const LOOP_DELAY_MS: u32 = 10;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("PropHead v{} ({:?})", env!("CARGO_PKG_VERSION"), HeadProfile::ACTIVE);

    // ── 1b. OTA rollback check ────────────────────────────────
    ota::check_rollback();

    let config = BehaviorConfig::default();
    let network = NetworkConfig::default();

    // ── 2. Peripherals ────────────────────────────────────────
    if let Err(e) = hw_init::init_peripherals(config.eye_wiring) {
        error!("HAL init failed: {}", e);
        return Err(e.into());
    }
    let watchdog = Watchdog::new(DEFAULT_TIMEOUT_MS);

    let clock = Esp32TimeAdapter::new();
    let boot_ms = clock.uptime_ms();
    let mut hw = HardwareAdapter::new(
        clock,
        MotionSensor::new(pins::MOTION_GPIO, boot_ms, PIR_WARMUP_MS),
        Servo::new(),
        EyeLeds::new(config.eye_wiring),
        AudioPlayer::new(),
    );
    if let Err(e) = hw.reset_audio() {
        warn!("Audio reset failed ({}), continuing", e);
    }

    // ── 3. Network ────────────────────────────────────────────
    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;

    let mut wifi = match WifiAdapter::new(&network) {
        Ok(mut w) => match w.start(peripherals.modem, sysloop, nvs) {
            Ok(()) => Some(w),
            Err(e) => {
                warn!("WiFi start failed ({}), running offline", e);
                None
            }
        },
        Err(e) => {
            warn!("WiFi config rejected ({}), running offline", e);
            None
        }
    };
    let mut link = MqttLink::new(&network, &INBOUND, &UPDATE_REQUESTS);
    let mut updates = OtaAdapter::new(&UPDATE_REQUESTS);
    let mut sink = LogEventSink::new();

    // ── 4. Application service ────────────────────────────────
    let mut app = AppService::new(config, &network, boot_ms);
    app.start(&mut hw, &mut sink);

    info!("System ready. Entering control loop.");

    // ── 5. Control loop ───────────────────────────────────────
    loop {
        let now_ms = clock.uptime_ms();

        if let Some(w) = wifi.as_mut() {
            w.poll(now_ms);
        }
        let network_up = wifi.as_ref().is_some_and(WifiAdapter::is_connected);
        if let Err(e) = link.poll(network_up) {
            warn!("MQTT: {}", e);
        }

        app.tick(now_ms, &mut hw, &INBOUND, &mut link, &mut updates, &mut sink);

        watchdog.feed();
        FreeRtos::delay_ms(LOOP_DELAY_MS);
    }
}
