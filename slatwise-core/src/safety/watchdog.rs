//! Stall watchdog
//!
//! While the actuator is commanded to move, every primary detent feeds the
//! watchdog. If the window passes without a feed, the caller decides what
//! the expiry means: a stall if motion was active, otherwise the end of a
//! movement and a good moment to checkpoint the position.
//!
//! Time is passed in as milliseconds since boot so the monitor stays pure.

/// Watchdog arming state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WatchdogState {
    /// Feeds are ignored and nothing expires
    Disarmed,
    /// Feeds restart the deadline
    Armed,
}

/// Restartable countdown fed by primary detents
#[derive(Debug, Clone)]
pub struct StallWatchdog {
    window_ms: u64,
    state: WatchdogState,
    deadline_ms: Option<u64>,
}

impl StallWatchdog {
    /// Create a disarmed watchdog
    pub fn new(window_ms: u64) -> Self {
        Self {
            window_ms,
            state: WatchdogState::Disarmed,
            deadline_ms: None,
        }
    }

    pub fn state(&self) -> WatchdogState {
        self.state
    }

    pub fn is_armed(&self) -> bool {
        self.state == WatchdogState::Armed
    }

    /// Enable feeding; the countdown starts on the next feed
    pub fn arm(&mut self) {
        self.state = WatchdogState::Armed;
    }

    /// Disable feeding and cancel any pending deadline
    pub fn pause(&mut self) {
        self.state = WatchdogState::Disarmed;
        self.deadline_ms = None;
    }

    /// Restart the countdown if armed
    pub fn feed(&mut self, now_ms: u64) {
        if self.is_armed() {
            self.deadline_ms = Some(now_ms.saturating_add(self.window_ms));
        }
    }

    /// Pending deadline, if any
    pub fn deadline(&self) -> Option<u64> {
        self.deadline_ms
    }

    /// Consume the deadline if it has passed
    pub fn expired(&mut self, now_ms: u64) -> bool {
        match self.deadline_ms {
            Some(deadline) if now_ms >= deadline => {
                self.deadline_ms = None;
                true
            }
            _ => false,
        }
    }
}
