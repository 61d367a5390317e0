//! Time-boxed firmware update window.
//!
//! Updates are only honoured for a short window shortly after boot:
//!
//! ```text
//!  boot ──── boot_window ────▶ OPEN ──── window ────▶ CLOSED (latched)
//! ```
//!
//! Once closed, the window stays closed until the next reboot.

use log::info;

use crate::config::BehaviorConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowPhase {
    /// Boot grace period; the window has not opened yet.
    Pending,
    Open,
    /// Closed for the rest of this boot.
    Closed,
}

/// Tracks the update window relative to boot.
#[derive(Debug, Clone)]
pub struct UpdateWindowGate {
    enabled: bool,
    boot_ms: u32,
    opens_after_ms: u32,
    open_for_ms: u32,
    phase: WindowPhase,
}

impl UpdateWindowGate {
    pub fn new(config: &BehaviorConfig, boot_ms: u32) -> Self {
        Self {
            enabled: config.ota_enabled,
            boot_ms,
            opens_after_ms: config.ota_boot_window_ms,
            open_for_ms: config.ota_window_ms,
            phase: if config.ota_enabled {
                WindowPhase::Pending
            } else {
                WindowPhase::Closed
            },
        }
    }

    pub fn phase(&self) -> WindowPhase {
        self.phase
    }

    /// Advance the phase for `now_ms`.  Returns the new phase when it
    /// changed on this call.
    pub fn poll(&mut self, now_ms: u32) -> Option<WindowPhase> {
        if !self.enabled || self.phase == WindowPhase::Closed {
            return None;
        }
        let since_boot = now_ms.wrapping_sub(self.boot_ms) as u64;
        let opens = self.opens_after_ms as u64;
        let closes = opens + self.open_for_ms as u64;

        let next = if since_boot >= closes {
            WindowPhase::Closed
        } else if since_boot >= opens {
            WindowPhase::Open
        } else {
            WindowPhase::Pending
        };
        if next == self.phase {
            return None;
        }
        self.phase = next;
        match next {
            WindowPhase::Open => info!("OTA: update window open for {} ms", self.open_for_ms),
            WindowPhase::Closed => info!("OTA: update window closed"),
            WindowPhase::Pending => {}
        }
        Some(next)
    }

    /// Whether an update request arriving at `now_ms` may proceed.
    pub fn permits(&mut self, now_ms: u32) -> bool {
        self.poll(now_ms);
        self.phase == WindowPhase::Open
    }
}
