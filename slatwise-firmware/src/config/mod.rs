//! Board configuration
//!
//! Constants generated from actuator.toml by the build script, and the
//! typed configs the tasks are built from.

use slatwise_core::config::MotionConfig;
use slatwise_drivers::motor::ServoConfig;

mod generated {
    include!(concat!(env!("OUT_DIR"), "/actuator_config.rs"));
}

pub use generated::*;

/// PWM frame rate implied by the servo period
pub const SERVO_FRAME_HZ: u32 = 1_000_000 / SERVO_PERIOD_US as u32;

pub fn motion_config() -> MotionConfig {
    MotionConfig {
        deadband_ticks: DEADBAND_TICKS,
        watchdog_window_ms: WATCHDOG_WINDOW_MS,
        remote_settle_ms: REMOTE_SETTLE_MS,
        calibration_settle_ms: CALIBRATION_SETTLE_MS,
        target_id: TARGET_ID,
    }
}

pub fn servo_config() -> ServoConfig {
    ServoConfig {
        period_us: SERVO_PERIOD_US,
        stop_us: SERVO_STOP_US,
        forward_us: SERVO_FORWARD_US,
        reverse_us: SERVO_REVERSE_US,
        power_active_high: SERVO_POWER_ACTIVE_HIGH,
    }
}
