//! Motor output trait
//!
//! The actuator is a continuous-rotation servo behind a power switch. The
//! core only needs three primitives from it: spin one way, spin the other
//! way, and halt. Speed is fixed by the driver configuration.

#[cfg(feature = "defmt")]
use defmt::Format;

/// Motor rotation direction
///
/// `CounterClockwise` moves the shaft toward increasing primary sensor
/// ticks, `Clockwise` toward decreasing ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(Format))]
pub enum Direction {
    /// Clockwise rotation (ticks decrease)
    Clockwise,
    /// Counter-clockwise rotation (ticks increase)
    CounterClockwise,
}

impl Direction {
    /// Get the opposite direction
    pub fn opposite(self) -> Self {
        match self {
            Direction::Clockwise => Direction::CounterClockwise,
            Direction::CounterClockwise => Direction::Clockwise,
        }
    }

    /// Direction that closes a signed tick error, if it lies outside the deadband
    ///
    /// A positive error means the shaft has to move toward larger ticks.
    pub fn to_close(error: i32, deadband: i32) -> Option<Self> {
        if error > deadband {
            Some(Direction::CounterClockwise)
        } else if error < -deadband {
            Some(Direction::Clockwise)
        } else {
            None
        }
    }
}

/// Errors that can occur with motor operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(Format))]
pub enum MotorError {
    /// The PWM output rejected the duty cycle
    Output,
    /// The power switch could not be driven
    PowerSwitch,
}

/// Low-level motor output
///
/// Implementations must make `halt` safe to call at any time, including
/// when the output is already halted.
pub trait MotorOutput {
    /// Spin in the given direction
    fn drive(&mut self, dir: Direction) -> Result<(), MotorError>;

    /// Command the stop pulse
    fn halt(&mut self) -> Result<(), MotorError>;

    /// Switch motor supply power
    fn set_power(&mut self, on: bool) -> Result<(), MotorError>;
}
