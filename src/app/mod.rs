//! Application core: behaviour logic, zero I/O.
//!
//! This module contains the rules for the prop head: FSM orchestration,
//! remote command handling, status reporting and the update window.
//! All interaction with hardware happens through **port traits** defined
//! in [`ports`], keeping this layer fully testable without real peripherals.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
