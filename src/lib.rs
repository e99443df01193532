#![no_std]

//! LE Counter BLE Firmware Library
//!
//! Application layer for a custom GATT service: a periodic heartbeat
//! counter plus a remotely readable/writable LED status, with the standard
//! Battery Service fed by a simulated drain.
//!
//! The session state machine and the ATT data plane are pure and build on
//! the host, which is where the test suite runs. Everything touching the
//! SoftDevice or Embassy HAL lives behind the `embedded` feature.

// This must come first so the logging macros are visible below.
#[macro_use]
mod fmt;

pub mod battery;
pub mod ble;
pub mod heartbeat;
pub mod led;
pub mod state;
