//! Actuator drivers, hardware initialisation, and peripheral helpers.

pub mod audio;
pub mod eyes;
pub mod hw_init;
pub mod servo;
pub mod watchdog;
