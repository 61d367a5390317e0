//! Open-loop, time-stepped servo position.
//!
//! The head moves one degree per `step_delay` boundary and never more than
//! one degree per call to [`Head::step`], however late the call is.  A
//! stalled loop therefore slows the head down instead of making it jump.

use crate::config::SERVO_MAX_DEGREES;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Head {
    angle: u8,
    target: u8,
    last_step_ms: u32,
}

impl Head {
    pub fn new(angle: u8) -> Self {
        let angle = angle.min(SERVO_MAX_DEGREES);
        Self {
            angle,
            target: angle,
            last_step_ms: 0,
        }
    }

    /// Current commanded angle in degrees.
    pub fn angle(&self) -> u8 {
        self.angle
    }

    pub fn target(&self) -> u8 {
        self.target
    }

    pub fn at_target(&self) -> bool {
        self.angle == self.target
    }

    /// Point the head at `target`.  A head at rest waits a full step delay
    /// from `now_ms` before its first step; a moving head keeps its cadence.
    pub fn aim(&mut self, target: u8, now_ms: u32) {
        let target = target.min(SERVO_MAX_DEGREES);
        if self.at_target() {
            self.last_step_ms = now_ms;
        }
        self.target = target;
    }

    /// Advance at most one degree toward the target.  Returns `true` if the
    /// head moved.
    pub fn step(&mut self, now_ms: u32, step_delay_ms: u32) -> bool {
        if self.at_target() {
            return false;
        }
        if now_ms.wrapping_sub(self.last_step_ms) < step_delay_ms {
            return false;
        }
        if self.target > self.angle {
            self.angle += 1;
        } else {
            self.angle -= 1;
        }
        self.last_step_ms = now_ms;
        true
    }
}
