//! Motor driver implementations
//!
//! - Continuous-rotation servo: pulse-width PWM plus a supply switch

pub mod servo;

pub use servo::{ServoConfig, ServoMotor};
