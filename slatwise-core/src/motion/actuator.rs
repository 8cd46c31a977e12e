//! Motion actuator
//!
//! Owns the motor output and remembers who started the current run.

use crate::traits::{Direction, MotorError, MotorOutput};

/// Origin of a drive request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DriveSource {
    /// Wand follow, jog or calibration
    Manual,
    /// Remote position request
    Remote,
}

/// Motor output plus run state
#[derive(Debug)]
pub struct MotionActuator<M> {
    output: M,
    running: Option<(Direction, DriveSource)>,
}

impl<M: MotorOutput> MotionActuator<M> {
    pub fn new(output: M) -> Self {
        Self {
            output,
            running: None,
        }
    }

    /// Power the motor and spin in `dir`
    pub fn drive(&mut self, dir: Direction, source: DriveSource) -> Result<(), MotorError> {
        self.output.set_power(true)?;
        self.output.drive(dir)?;
        self.running = Some((dir, source));
        Ok(())
    }

    /// Halt and remove power
    ///
    /// Both steps are attempted even if the first fails. Idempotent.
    pub fn stop(&mut self) -> Result<(), MotorError> {
        self.running = None;
        let halted = self.output.halt();
        let unpowered = self.output.set_power(false);
        halted.and(unpowered)
    }

    /// Switch supply power without touching the drive state
    pub fn power_switch(&mut self, on: bool) -> Result<(), MotorError> {
        self.output.set_power(on)
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    pub fn direction(&self) -> Option<Direction> {
        self.running.map(|(dir, _)| dir)
    }

    pub fn source(&self) -> Option<DriveSource> {
        self.running.map(|(_, source)| source)
    }

    /// Access the underlying output
    pub fn output(&self) -> &M {
        &self.output
    }

    pub fn output_mut(&mut self) -> &mut M {
        &mut self.output
    }
}
