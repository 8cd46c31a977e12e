//! Motion controller tuning

/// Highest normalized position; 0 is the bottom bound
pub const MAX_NORMALIZED: u8 = 10;

/// The only actuator port current hardware has
pub const DEFAULT_TARGET_ID: u8 = 1;

/// Tick tolerance around a target
pub const DEFAULT_DEADBAND_TICKS: i32 = 1;

/// Stall window: a primary detent must arrive this often while moving
pub const DEFAULT_WATCHDOG_WINDOW_MS: u64 = 500;

/// Pause before reading the position for a remote move
pub const DEFAULT_REMOTE_SETTLE_MS: u32 = 500;

/// Pause before recording a calibration bound
pub const DEFAULT_CALIBRATION_SETTLE_MS: u32 = 1000;

/// Motion controller configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MotionConfig {
    /// Errors within ±deadband ticks are treated as zero
    pub deadband_ticks: i32,
    /// Stall watchdog window
    pub watchdog_window_ms: u64,
    /// Settle delay before a remote move samples the position
    pub remote_settle_ms: u32,
    /// Settle delay before a calibration bound is recorded
    pub calibration_settle_ms: u32,
    /// Actuator port this controller answers to
    pub target_id: u8,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            deadband_ticks: DEFAULT_DEADBAND_TICKS,
            watchdog_window_ms: DEFAULT_WATCHDOG_WINDOW_MS,
            remote_settle_ms: DEFAULT_REMOTE_SETTLE_MS,
            calibration_settle_ms: DEFAULT_CALIBRATION_SETTLE_MS,
            target_id: DEFAULT_TARGET_ID,
        }
    }
}
