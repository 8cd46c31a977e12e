//! Motion control
//!
//! The actuator wrapper, the motion modes and commands, and the controller
//! that arbitrates between the wand, remote moves and calibration.

pub mod actuator;
pub mod controller;
pub mod mode;

pub use actuator::{DriveSource, MotionActuator};
pub use controller::{ControlError, MotionController, OUTBOX_DEPTH};
pub use mode::{MotionCommand, MotionMode};
