//! Calibration profile and the multi-stage calibration handshake

pub mod profile;
pub mod protocol;

pub use profile::{CalibrationError, CalibrationProfile};
pub use protocol::{CalibrationProtocol, CalibrationRequest, HandshakeError};
