//! Safety monitoring
//!
//! Detects a stalled or runaway actuator.

pub mod watchdog;

pub use watchdog::{StallWatchdog, WatchdogState};
