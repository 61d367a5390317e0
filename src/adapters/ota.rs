//! Firmware update over HTTP pull, backed by the `esp-ota` crate.
//!
//! Flow: `Upgrade <url>` message → [`UpdateRequestSlot`] → the control
//! loop asks the update window gate → accepted requests download on a
//! worker thread → OtaBegin → N × write → finalize → reboot.
//!
//! The `esp-ota` crate provides a safe Rust wrapper around the ESP-IDF
//! OTA partition API, so this module carries no unsafe FFI.

use core::fmt;
use log::{info, warn};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use heapless::String;

use crate::app::ports::UpdatePort;
use crate::events::PAYLOAD_CAP;

const MAX_FIRMWARE_SIZE: u32 = 4 * 1024 * 1024; // 4 MB

/// Bytes pulled from the HTTP body per flash write.
#[cfg(target_os = "espidf")]
const DOWNLOAD_CHUNK: usize = 4096;

// ── Error type ────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtaError {
    AlreadyInProgress,
    InvalidSize,
    BeginFailed,
    WriteFailed,
    VerifyFailed,
    BootSetFailed,
    IncompleteTransfer,
    NotReceiving,
    Overflow,
    ConnectFailed,
    HttpStatus(u16),
    DownloadFailed,
}

impl fmt::Display for OtaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyInProgress => write!(f, "OTA session already in progress"),
            Self::InvalidSize => write!(f, "firmware size missing or out of range (max 4 MB)"),
            Self::BeginFailed => write!(f, "OTA begin failed"),
            Self::WriteFailed => write!(f, "OTA write failed"),
            Self::VerifyFailed => write!(f, "OTA verification failed"),
            Self::BootSetFailed => write!(f, "set boot partition failed"),
            Self::IncompleteTransfer => write!(f, "finalize called before all bytes written"),
            Self::NotReceiving => write!(f, "operation requires active Receiving state"),
            Self::Overflow => write!(f, "data would exceed declared firmware size"),
            Self::ConnectFailed => write!(f, "could not reach the image server"),
            Self::HttpStatus(code) => write!(f, "image server answered HTTP {}", code),
            Self::DownloadFailed => write!(f, "image download interrupted"),
        }
    }
}

impl core::error::Error for OtaError {}

// ── State machine ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtaState {
    Idle,
    Receiving {
        expected_size: u32,
        bytes_written: u32,
    },
    Verifying,
    ReadyToReboot,
    Failed,
}

// ── Manager (ESP-IDF: uses esp-ota crate) ─────────────────────

/// Writes one firmware image into the inactive partition.
///
/// On ESP-IDF targets, uses the `esp-ota` crate for partition
/// management.  On simulation targets, only the bookkeeping runs.
pub struct OtaManager {
    state: OtaState,
    #[cfg(target_os = "espidf")]
    ota_update: Option<esp_ota::OtaUpdate>,
}

impl OtaManager {
    pub fn new() -> Self {
        Self {
            state: OtaState::Idle,
            #[cfg(target_os = "espidf")]
            ota_update: None,
        }
    }

    pub fn state(&self) -> OtaState {
        self.state
    }

    /// Begin a session.  Validates size and opens the inactive partition.
    pub fn begin(&mut self, firmware_size: u32) -> Result<(), OtaError> {
        if !matches!(self.state, OtaState::Idle | OtaState::Failed) {
            return Err(OtaError::AlreadyInProgress);
        }
        if firmware_size == 0 || firmware_size > MAX_FIRMWARE_SIZE {
            return Err(OtaError::InvalidSize);
        }

        #[cfg(target_os = "espidf")]
        {
            let update = esp_ota::OtaUpdate::begin().map_err(|e| {
                warn!("esp-ota begin failed: {:?}", e);
                OtaError::BeginFailed
            })?;
            self.ota_update = Some(update);
        }

        self.state = OtaState::Receiving {
            expected_size: firmware_size,
            bytes_written: 0,
        };
        info!("OTA: begin ({} bytes)", firmware_size);
        Ok(())
    }

    /// Append the next slice of the image.  Returns total bytes written.
    pub fn write_chunk(&mut self, data: &[u8]) -> Result<u32, OtaError> {
        let OtaState::Receiving {
            expected_size,
            bytes_written,
        } = self.state
        else {
            return Err(OtaError::NotReceiving);
        };

        let new_written = bytes_written.saturating_add(data.len() as u32);
        if new_written > expected_size {
            self.abort();
            return Err(OtaError::Overflow);
        }

        #[cfg(target_os = "espidf")]
        {
            let Some(update) = self.ota_update.as_mut() else {
                return Err(OtaError::NotReceiving);
            };
            if let Err(e) = update.write(data) {
                warn!("esp-ota write failed: {:?}", e);
                self.abort();
                return Err(OtaError::WriteFailed);
            }
        }

        self.state = OtaState::Receiving {
            expected_size,
            bytes_written: new_written,
        };
        Ok(new_written)
    }

    /// Verify the image and mark its partition bootable.
    pub fn finalize(&mut self) -> Result<(), OtaError> {
        match self.state {
            OtaState::Receiving {
                expected_size,
                bytes_written,
            } if bytes_written == expected_size => {}
            OtaState::Receiving { .. } => return Err(OtaError::IncompleteTransfer),
            _ => return Err(OtaError::NotReceiving),
        }

        self.state = OtaState::Verifying;

        #[cfg(target_os = "espidf")]
        {
            let Some(update) = self.ota_update.take() else {
                self.state = OtaState::Failed;
                return Err(OtaError::NotReceiving);
            };
            let mut completed = update.finalize().map_err(|e| {
                warn!("esp-ota finalize failed: {:?}", e);
                self.state = OtaState::Failed;
                OtaError::VerifyFailed
            })?;
            completed.set_as_boot_partition().map_err(|e| {
                warn!("esp-ota set_as_boot_partition failed: {:?}", e);
                self.state = OtaState::Failed;
                OtaError::BootSetFailed
            })?;
        }

        self.state = OtaState::ReadyToReboot;
        info!("OTA: finalized, ready to reboot");
        Ok(())
    }

    /// Abandon the session; the partial image is discarded.
    pub fn abort(&mut self) {
        #[cfg(target_os = "espidf")]
        {
            // esp-ota aborts when OtaUpdate is dropped
            self.ota_update.take();
        }
        self.state = OtaState::Failed;
        warn!("OTA: aborted");
    }

    /// Soft-reset into the newly flashed firmware.
    #[cfg(target_os = "espidf")]
    pub fn reboot(&self) -> ! {
        info!("OTA: rebooting into new firmware");
        esp_ota::restart();
    }
}

impl Default for OtaManager {
    fn default() -> Self {
        Self::new()
    }
}

// ── Request slot ──────────────────────────────────────────────

/// Latest image URL asked for by the network.  Written from the MQTT
/// task, read by the control loop.  A newer request replaces an
/// unanswered one.
pub struct UpdateRequestSlot {
    url: Signal<CriticalSectionRawMutex, String<PAYLOAD_CAP>>,
}

impl Default for UpdateRequestSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl UpdateRequestSlot {
    pub const fn new() -> Self {
        Self { url: Signal::new() }
    }

    /// Record a request.  Returns `false` (and records nothing) unless
    /// `url` is an `http://` or `https://` URL that fits.
    pub fn request(&self, url: &str) -> bool {
        let url = url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return false;
        }
        let mut owned = String::new();
        if owned.push_str(url).is_err() {
            return false;
        }
        self.url.signal(owned);
        true
    }

    pub fn take(&self) -> Option<String<PAYLOAD_CAP>> {
        self.url.try_take()
    }
}

// ── Update port adapter ───────────────────────────────────────

/// [`UpdatePort`] backed by the request slot and a download worker.
pub struct OtaAdapter {
    requests: &'static UpdateRequestSlot,
    pending: Option<String<PAYLOAD_CAP>>,
    worker: Option<std::thread::JoinHandle<Result<(), OtaError>>>,
}

impl OtaAdapter {
    pub fn new(requests: &'static UpdateRequestSlot) -> Self {
        Self {
            requests,
            pending: None,
            worker: None,
        }
    }

    /// A download is running.
    pub fn in_progress(&self) -> bool {
        self.worker.as_ref().is_some_and(|w| !w.is_finished())
    }

    /// Collect the result of a finished download, if any.
    fn reap(&mut self) {
        if self.worker.as_ref().is_some_and(std::thread::JoinHandle::is_finished) {
            if let Some(worker) = self.worker.take() {
                match worker.join() {
                    Ok(Ok(())) => info!("OTA: download finished"),
                    Ok(Err(e)) => warn!("OTA: update failed: {}", e),
                    Err(_) => warn!("OTA: download worker panicked"),
                }
            }
        }
    }
}

impl UpdatePort for OtaAdapter {
    fn update_requested(&mut self) -> bool {
        self.reap();
        if let Some(url) = self.requests.take() {
            if self.in_progress() {
                warn!("OTA: request for {} ignored, download already running", url);
            } else {
                self.pending = Some(url);
            }
        }
        self.pending.is_some()
    }

    fn accept_update(&mut self) {
        let Some(url) = self.pending.take() else {
            return;
        };
        info!("OTA: fetching {}", url);
        let spawned = std::thread::Builder::new()
            .name("ota".into())
            .stack_size(8 * 1024)
            .spawn(move || download_and_flash(&url));
        match spawned {
            Ok(handle) => self.worker = Some(handle),
            Err(e) => warn!("OTA: could not start download worker: {}", e),
        }
    }

    fn reject_update(&mut self) {
        if let Some(url) = self.pending.take() {
            info!("OTA: request for {} dropped", url);
        }
    }
}

// ── Download ──────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
fn download_and_flash(url: &str) -> Result<(), OtaError> {
    use esp_idf_svc::http::Method;
    use esp_idf_svc::http::client::{Configuration, EspHttpConnection};

    let mut conn = EspHttpConnection::new(&Configuration {
        buffer_size: Some(DOWNLOAD_CHUNK),
        ..Default::default()
    })
    .map_err(|e| {
        warn!("OTA: http client init failed: {:?}", e);
        OtaError::ConnectFailed
    })?;
    conn.initiate_request(Method::Get, url, &[])
        .and_then(|()| conn.initiate_response())
        .map_err(|e| {
            warn!("OTA: request failed: {:?}", e);
            OtaError::ConnectFailed
        })?;

    let status = conn.status();
    if status != 200 {
        return Err(OtaError::HttpStatus(status));
    }
    let size = conn
        .header("Content-Length")
        .and_then(|v| v.trim().parse::<u32>().ok())
        .ok_or(OtaError::InvalidSize)?;

    let mut ota = OtaManager::new();
    ota.begin(size)?;
    let mut buf = [0u8; DOWNLOAD_CHUNK];
    let mut last_decile = 0;
    loop {
        let n = match conn.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                warn!("OTA: read failed: {:?}", e);
                ota.abort();
                return Err(OtaError::DownloadFailed);
            }
        };
        let written = ota.write_chunk(&buf[..n])?;
        let decile = u64::from(written) * 10 / u64::from(size);
        if decile != last_decile {
            last_decile = decile;
            info!("OTA: {}%", decile * 10);
        }
    }
    ota.finalize()?;
    ota.reboot();
}

#[cfg(not(target_os = "espidf"))]
fn download_and_flash(url: &str) -> Result<(), OtaError> {
    info!("OTA(sim): would download {}", url);
    Ok(())
}

// ── Boot validation ───────────────────────────────────────────

/// Mark the running firmware as valid.
///
/// Without this, the bootloader reverts to the previous image on the
/// next reset.
#[cfg(target_os = "espidf")]
pub fn check_rollback() {
    match esp_ota::mark_app_valid() {
        Ok(()) => info!("OTA: firmware marked valid (rollback cancelled)"),
        Err(e) => warn!("OTA: mark_app_valid failed: {:?}", e),
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn check_rollback() {
    log::info!("OTA rollback check (simulation): skipped");
}

// ── Tests ─────────────────────────────────────────────────────
