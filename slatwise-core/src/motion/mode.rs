//! Motion modes and commands

use crate::traits::Direction;

/// What the controller is currently doing; exactly one at a time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MotionMode {
    #[default]
    Idle,
    /// Shaft tracks the wand
    ManualFollow,
    /// Unconditional manual drive until stopped
    Jogging(Direction),
    /// Driving toward a tick target
    RemoteMove {
        target_ticks: i32,
        /// Started below the target, so arrival is `position >= target`
        approach_from_below: bool,
    },
    /// Calibration stage 1: operator brings the slats to the top
    CalibratingUpward,
    /// Calibration stage 2: operator brings the slats to the bottom
    CalibratingDownward,
}

impl MotionMode {
    pub fn is_calibrating(&self) -> bool {
        matches!(
            self,
            MotionMode::CalibratingUpward | MotionMode::CalibratingDownward
        )
    }

    /// Wand follow or jog
    pub fn is_manual(&self) -> bool {
        matches!(self, MotionMode::ManualFollow | MotionMode::Jogging(_))
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, MotionMode::RemoteMove { .. })
    }
}

/// External motion command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MotionCommand {
    Stop,
    MoveDirection(Direction),
    /// Normalized 0..=10
    MoveToNormalizedPosition(u8),
}
