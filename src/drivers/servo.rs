//! Hobby servo on an LEDC channel.
//!
//! 50 Hz frame, pulse width linear in angle between
//! [`SERVO_MIN_PULSE_US`](pins::SERVO_MIN_PULSE_US) and
//! [`SERVO_MAX_PULSE_US`](pins::SERVO_MAX_PULSE_US).  Open loop: the
//! driver never learns where the horn actually is.

use crate::config::SERVO_MAX_DEGREES;
use crate::drivers::hw_init;
use crate::error::ActuatorError;
use crate::pins;

const PERIOD_US: u32 = 1_000_000 / pins::SERVO_PWM_FREQ_HZ;
const DUTY_MAX: u32 = 1 << pins::SERVO_PWM_RESOLUTION_BITS;

/// LEDC duty count for `degrees` (clamped to 0–180).
pub fn angle_to_duty(degrees: u8) -> u32 {
    let deg = degrees.min(SERVO_MAX_DEGREES) as u32;
    let span = pins::SERVO_MAX_PULSE_US - pins::SERVO_MIN_PULSE_US;
    let pulse_us = pins::SERVO_MIN_PULSE_US + span * deg / SERVO_MAX_DEGREES as u32;
    pulse_us * DUTY_MAX / PERIOD_US
}

pub struct Servo {
    channel: u32,
    angle: Option<u8>,
}

impl Servo {
    pub fn new() -> Self {
        Self {
            channel: hw_init::LEDC_CH_SERVO,
            angle: None,
        }
    }

    pub fn set_angle(&mut self, degrees: u8) -> Result<(), ActuatorError> {
        hw_init::ledc_set(self.channel, angle_to_duty(degrees))?;
        self.angle = Some(degrees.min(SERVO_MAX_DEGREES));
        Ok(())
    }

    /// Last angle written, `None` before the first write.
    pub fn angle(&self) -> Option<u8> {
        self.angle
    }
}

impl Default for Servo {
    fn default() -> Self {
        Self::new()
    }
}
