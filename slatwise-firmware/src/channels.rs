//! Inter-task communication channels
//!
//! Defines the static channels and shared state used between Embassy tasks.
//! Uses embassy-sync primitives for safe async communication.

use core::cell::Cell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::channel::Channel;

use slatwise_core::calibration::{CalibrationProfile, CalibrationRequest};
use slatwise_core::motion::MotionCommand;
use slatwise_core::sensor::{PositionSensor, SensorEvent, SensorId};
use slatwise_protocol::ActuatorReport;

/// Detents buffered between sensor tasks and the control task
const SENSOR_CHANNEL_SIZE: usize = 32;

/// Channel capacity for link requests
const CONTROL_CHANNEL_SIZE: usize = 8;

/// Channel capacity for outbound reports
const REPORT_CHANNEL_SIZE: usize = 16;

/// Detent counter of the actuated shaft
pub static PRIMARY_SENSOR: PositionSensor = PositionSensor::new(SensorId::Primary);

/// Detent counter of the wand
pub static SECONDARY_SENSOR: PositionSensor = PositionSensor::new(SensorId::Secondary);

/// Work for the control task that did not come from a sensor
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControlRequest {
    Motion { port: u8, command: MotionCommand },
    Calibration { port: u8, request: CalibrationRequest },
    /// The link reported an error; any calibration in progress is abandoned
    LinkLost,
}

/// Detents from both sensor tasks, in arrival order
pub static SENSOR_EVENTS: Channel<CriticalSectionRawMutex, SensorEvent, SENSOR_CHANNEL_SIZE> =
    Channel::new();

/// Requests decoded by the link receive task
pub static CONTROL_REQUESTS: Channel<CriticalSectionRawMutex, ControlRequest, CONTROL_CHANNEL_SIZE> =
    Channel::new();

/// Reports waiting for the link transmit task
pub static REPORTS: Channel<CriticalSectionRawMutex, ActuatorReport, REPORT_CHANNEL_SIZE> =
    Channel::new();

/// Last calibration profile published by the control task
///
/// One lock covers the bounds and the flag so readers never see a mix.
pub static PROFILE_SNAPSHOT: Mutex<CriticalSectionRawMutex, Cell<CalibrationProfile>> =
    Mutex::new(Cell::new(CalibrationProfile::new()));

pub fn publish_profile(profile: CalibrationProfile) {
    PROFILE_SNAPSHOT.lock(|cell| cell.set(profile));
}

pub fn profile_snapshot() -> CalibrationProfile {
    PROFILE_SNAPSHOT.lock(|cell| cell.get())
}
