//! RP2040-specific HAL for the Slatwise actuator firmware
//!
//! This crate provides RP2040-specific implementations of the shared
//! `slatwise-hal` traits, plus RP2040-specific functionality:
//!
//! - Flash storage driver (implements `slatwise_hal::FlashStorage`)
//! - 50 Hz servo PWM slice configuration

#![no_std]

pub mod flash;
pub mod servo_pwm;

// Re-export shared traits from slatwise-hal for convenience
pub use slatwise_hal::{FlashStorage as FlashStorageTrait, StorageKey};
