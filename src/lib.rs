//! PropHead firmware library.
//!
//! Exposes the pure-logic modules for integration testing and host-side
//! simulation. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod error;
pub mod events;
pub mod fsm;
pub mod pins;
pub mod update_gate;

// Hardware and network adapters; host builds get simulation stubs.
pub mod adapters;
pub mod drivers;
pub mod sensors;
