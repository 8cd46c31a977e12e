//! Slatwise Link Protocol
//!
//! This crate defines the UART protocol between the actuator controller and
//! the messaging coprocessor that owns the network connection. The
//! coprocessor translates between these frames and the remote server's JSON
//! messages; the controller only ever sees this binary vocabulary.
//!
//! # Protocol Overview
//!
//! All messages use a simple binary frame format:
//! ```text
//! ┌───────┬────────┬──────┬─────────────┬──────────┐
//! │ START │ LENGTH │ TYPE │ PAYLOAD     │ CRC8     │
//! │ 1B    │ 1B     │ 1B   │ 0–32B       │ 1B       │
//! └───────┴────────┴──────┴─────────────┴──────────┘
//! ```
//!
//! Every inbound request names the actuator it addresses. Only actuator `1`
//! exists on current hardware.

#![no_std]
#![deny(unsafe_code)]

pub mod events;
pub mod frame;
pub mod messages;

pub use events::{CalibrationErrorKind, EventName, JogDirection};
pub use frame::{crc8, Frame, FrameError, FrameParser, FRAME_START, MAX_PAYLOAD_SIZE};
pub use messages::{ActuatorReport, LinkRequest};
