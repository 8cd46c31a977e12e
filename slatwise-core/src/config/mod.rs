//! Configuration types
//!
//! Board-agnostic tuning for the motion controller. The firmware fills
//! these from its build-time `actuator.toml`.

pub mod motion;

pub use motion::*;
