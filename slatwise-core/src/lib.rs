//! Board-agnostic core logic for the window-covering actuator firmware
//!
//! This crate contains all application logic that does not depend on
//! specific hardware implementations:
//!
//! - Quadrature decoding and the shared sensor counters
//! - Calibration profile and tick ↔ normalized conversion
//! - Record persistence over the `FlashStorage` trait
//! - Motion actuator, stall watchdog and the motion controller
//! - The calibration handshake
//! - Motion configuration

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod calibration;
pub mod config;
pub mod motion;
pub mod safety;
pub mod sensor;
pub mod storage;
pub mod traits;

#[cfg(test)]
pub(crate) mod mock;
