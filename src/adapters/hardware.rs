//! Hardware adapter: bridges real peripherals to domain port traits.
//!
//! Owns the motion sensor and all actuator drivers, exposing them
//! through [`MotionSensorPort`] and [`ActuatorPort`].  This is the only
//! module in the system that touches actual hardware.  On non-espidf
//! targets, the underlying drivers use cfg-gated simulation stubs.

use crate::adapters::time::Esp32TimeAdapter;
use crate::app::ports::{ActuatorPort, MotionSensorPort};
use crate::config::Rgb;
use crate::drivers::audio::AudioPlayer;
use crate::drivers::eyes::EyeLeds;
use crate::drivers::servo::Servo;
use crate::error::{ActuatorError, SensorError};
use crate::sensors::MotionSensor;

/// Concrete adapter that combines all hardware behind port traits.
pub struct HardwareAdapter {
    clock: Esp32TimeAdapter,
    motion: MotionSensor,
    servo: Servo,
    eyes: EyeLeds,
    audio: AudioPlayer,
}

impl HardwareAdapter {
    pub fn new(
        clock: Esp32TimeAdapter,
        motion: MotionSensor,
        servo: Servo,
        eyes: EyeLeds,
        audio: AudioPlayer,
    ) -> Self {
        Self {
            clock,
            motion,
            servo,
            eyes,
            audio,
        }
    }

    /// Reset the audio module.  Call once at boot before the first command.
    pub fn reset_audio(&mut self) -> Result<(), ActuatorError> {
        self.audio.reset()
    }

    /// Last colour written to the eyes.
    pub fn eye_colour(&self) -> Rgb {
        self.eyes.current_colour()
    }

    /// Last angle written to the servo.
    pub fn head_angle(&self) -> Option<u8> {
        self.servo.angle()
    }
}

// ── MotionSensorPort implementation ───────────────────────────

impl MotionSensorPort for HardwareAdapter {
    fn read_motion(&mut self) -> Result<bool, SensorError> {
        self.motion.read(self.clock.uptime_ms())
    }
}

// ── ActuatorPort implementation ───────────────────────────────

impl ActuatorPort for HardwareAdapter {
    fn set_head_angle(&mut self, degrees: u8) -> Result<(), ActuatorError> {
        self.servo.set_angle(degrees)
    }

    fn set_eyes(&mut self, colour: Rgb) -> Result<(), ActuatorError> {
        self.eyes.set_colour(colour)
    }

    fn play_track(&mut self, track: u16) -> Result<(), ActuatorError> {
        self.audio.play(track)
    }

    fn set_volume(&mut self, volume: u8) -> Result<(), ActuatorError> {
        self.audio.set_volume(volume)
    }
}
