//! HC-SR501 passive-infrared motion sensor.
//!
//! Digital output, HIGH while presence is detected.  The module has its
//! own retrigger timer and needs up to a minute after power-up before its
//! output means anything; reads during that warm-up report
//! [`SensorError::WarmingUp`].
//!
//! ## Dual-target design
//!
//! On ESP-IDF: reads the GPIO level via hw_init helpers.
//! On host/test: reads a simulated level set with [`sim_set_motion`].

#[cfg(not(target_os = "espidf"))]
use core::sync::atomic::{AtomicBool, Ordering};

use crate::drivers::hw_init;
use crate::error::SensorError;

#[cfg(not(target_os = "espidf"))]
static SIM_MOTION: AtomicBool = AtomicBool::new(false);

#[cfg(not(target_os = "espidf"))]
pub fn sim_set_motion(present: bool) {
    SIM_MOTION.store(present, Ordering::Relaxed);
}

pub struct MotionSensor {
    gpio: i32,
    ready_at_ms: u32,
    warm: bool,
}

impl MotionSensor {
    /// `warmup_ms` after `now_ms`, readings are trusted.
    pub fn new(gpio: i32, now_ms: u32, warmup_ms: u32) -> Self {
        Self {
            gpio,
            ready_at_ms: now_ms.wrapping_add(warmup_ms),
            warm: warmup_ms == 0,
        }
    }

    pub fn read(&mut self, now_ms: u32) -> Result<bool, SensorError> {
        if !self.warm {
            // Signed distance keeps this right across the u32 wrap.
            if (now_ms.wrapping_sub(self.ready_at_ms) as i32) < 0 {
                return Err(SensorError::WarmingUp);
            }
            self.warm = true;
            log::info!("Motion sensor ready");
        }
        Ok(self.read_level())
    }

    #[cfg(target_os = "espidf")]
    fn read_level(&self) -> bool {
        hw_init::gpio_read(self.gpio)
    }

    #[cfg(not(target_os = "espidf"))]
    fn read_level(&self) -> bool {
        // Pin level is meaningless on the host; keep the helper exercised.
        hw_init::gpio_read(self.gpio) || SIM_MOTION.load(Ordering::Relaxed)
    }
}
