//! Sensor subsystem.
//!
//! The head has a single input, the PIR motion sensor, polled once per
//! control tick through [`MotionSensorPort`](crate::app::ports::MotionSensorPort).

pub mod motion;

pub use motion::MotionSensor;

/// HC-SR501 settling time after power-up.
pub const PIR_WARMUP_MS: u32 = 30_000;
