//! Continuous-rotation servo driver
//!
//! The servo is commanded by pulse width within a fixed PWM frame: the
//! neutral pulse holds it still, longer pulses spin it counter-clockwise and
//! shorter pulses clockwise. A separate switch pin cuts supply power so the
//! servo does not creep or hum at neutral.
//!
//! ```ignore
//! let mut servo = ServoMotor::new(pwm, power_pin, ServoConfig::default())?;
//! servo.set_power(true)?;
//! servo.drive(Direction::CounterClockwise)?;
//! ```

use embedded_hal::digital::OutputPin;
use embedded_hal::pwm::SetDutyCycle;
use slatwise_core::traits::{Direction, MotorError, MotorOutput};

/// Servo pulse timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ServoConfig {
    /// PWM frame length (20 ms at 50 Hz)
    pub period_us: u16,
    /// Neutral pulse
    pub stop_us: u16,
    /// Counter-clockwise pulse (ticks increase)
    pub forward_us: u16,
    /// Clockwise pulse (ticks decrease)
    pub reverse_us: u16,
    /// Power switch is active-high
    pub power_active_high: bool,
}

impl Default for ServoConfig {
    fn default() -> Self {
        Self {
            period_us: 20_000,
            stop_us: 1_500,
            forward_us: 2_000,
            reverse_us: 1_000,
            power_active_high: true,
        }
    }
}

impl ServoConfig {
    /// Every pulse must fit inside the frame
    pub fn is_valid(&self) -> bool {
        self.period_us > 0
            && [self.stop_us, self.forward_us, self.reverse_us]
                .iter()
                .all(|&pulse| pulse > 0 && pulse < self.period_us)
    }

    /// Pulse width that spins the servo in `dir`
    pub fn pulse_for(&self, dir: Direction) -> u16 {
        match dir {
            Direction::CounterClockwise => self.forward_us,
            Direction::Clockwise => self.reverse_us,
        }
    }
}

/// Servo on a PWM channel plus a power switch pin
pub struct ServoMotor<P, S> {
    pwm: P,
    power: S,
    config: ServoConfig,
    pulse_us: u16,
    powered: bool,
}

impl<P, S> ServoMotor<P, S>
where
    P: SetDutyCycle,
    S: OutputPin,
{
    /// Take the outputs and leave the servo unpowered at neutral
    pub fn new(pwm: P, power: S, config: ServoConfig) -> Result<Self, MotorError> {
        if !config.is_valid() {
            return Err(MotorError::Output);
        }
        let mut servo = Self {
            pwm,
            power,
            config,
            pulse_us: config.stop_us,
            powered: true,
        };
        servo.set_power(false)?;
        servo.set_pulse(config.stop_us)?;
        Ok(servo)
    }

    pub fn config(&self) -> &ServoConfig {
        &self.config
    }

    /// Pulse width currently commanded
    pub fn pulse_us(&self) -> u16 {
        self.pulse_us
    }

    pub fn is_powered(&self) -> bool {
        self.powered
    }

    fn set_pulse(&mut self, pulse_us: u16) -> Result<(), MotorError> {
        self.pwm
            .set_duty_cycle_fraction(pulse_us, self.config.period_us)
            .map_err(|_| MotorError::Output)?;
        self.pulse_us = pulse_us;
        Ok(())
    }

    /// Release the outputs
    pub fn release(self) -> (P, S) {
        (self.pwm, self.power)
    }
}

impl<P, S> MotorOutput for ServoMotor<P, S>
where
    P: SetDutyCycle,
    S: OutputPin,
{
    fn drive(&mut self, dir: Direction) -> Result<(), MotorError> {
        self.set_pulse(self.config.pulse_for(dir))
    }

    fn halt(&mut self) -> Result<(), MotorError> {
        self.set_pulse(self.config.stop_us)
    }

    fn set_power(&mut self, on: bool) -> Result<(), MotorError> {
        let level_high = on == self.config.power_active_high;
        let result = if level_high {
            self.power.set_high()
        } else {
            self.power.set_low()
        };
        result.map_err(|_| MotorError::PowerSwitch)?;
        self.powered = on;
        Ok(())
    }
}
