//! Event vocabulary shared with the messaging coprocessor
//!
//! The coprocessor forwards every message to the server under its canonical
//! event name, so those names are part of the protocol.

/// Canonical server-side event names
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EventName {
    // Server → actuator
    CalibStart,
    UserStage1Complete,
    UserStage2Complete,
    CancelCalib,
    CalibDoneAck,
    MoveToPos,
    StopMotion,
    Jog,
    // Actuator → server
    CalibStage1Ready,
    CalibStage2Ready,
    CalibDone,
    DeviceCalibError,
    ReportCalibStatus,
    PosHit,
    RecalibRequired,
}

impl EventName {
    pub const ALL: [EventName; 15] = [
        EventName::CalibStart,
        EventName::UserStage1Complete,
        EventName::UserStage2Complete,
        EventName::CancelCalib,
        EventName::CalibDoneAck,
        EventName::MoveToPos,
        EventName::StopMotion,
        EventName::Jog,
        EventName::CalibStage1Ready,
        EventName::CalibStage2Ready,
        EventName::CalibDone,
        EventName::DeviceCalibError,
        EventName::ReportCalibStatus,
        EventName::PosHit,
        EventName::RecalibRequired,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EventName::CalibStart => "calib_start",
            EventName::UserStage1Complete => "user_stage1_complete",
            EventName::UserStage2Complete => "user_stage2_complete",
            EventName::CancelCalib => "cancel_calib",
            EventName::CalibDoneAck => "calib_done_ack",
            EventName::MoveToPos => "move_to_pos",
            EventName::StopMotion => "stop_motion",
            EventName::Jog => "jog",
            EventName::CalibStage1Ready => "calib_stage1_ready",
            EventName::CalibStage2Ready => "calib_stage2_ready",
            EventName::CalibDone => "calib_done",
            EventName::DeviceCalibError => "device_calib_error",
            EventName::ReportCalibStatus => "report_calib_status",
            EventName::PosHit => "pos_hit",
            EventName::RecalibRequired => "recalib_required",
        }
    }

    /// Look up an event by its server-side name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|event| event.as_str() == name)
    }
}

/// Reasons carried by `device_calib_error`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CalibrationErrorKind {
    /// `calib_start` could not enter calibration
    InitFailed,
    /// Stage 1 could not record the top bound
    DirectionSwitchFailed,
    /// Stage 2 could not record the bottom bound
    CompletionFailed,
    /// Stage 2 was completed at the top bound
    NoRange,
    /// The request addressed an actuator other than 1
    NonOnePort,
    /// The motor could not be stopped when abandoning calibration
    CancelFailed,
}

// Wire format values
const ERR_INIT_FAILED: u8 = 0x01;
const ERR_DIRECTION_SWITCH_FAILED: u8 = 0x02;
const ERR_COMPLETION_FAILED: u8 = 0x03;
const ERR_NO_RANGE: u8 = 0x04;
const ERR_NON_ONE_PORT: u8 = 0x05;
const ERR_CANCEL_FAILED: u8 = 0x06;

impl CalibrationErrorKind {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            ERR_INIT_FAILED => Some(CalibrationErrorKind::InitFailed),
            ERR_DIRECTION_SWITCH_FAILED => Some(CalibrationErrorKind::DirectionSwitchFailed),
            ERR_COMPLETION_FAILED => Some(CalibrationErrorKind::CompletionFailed),
            ERR_NO_RANGE => Some(CalibrationErrorKind::NoRange),
            ERR_NON_ONE_PORT => Some(CalibrationErrorKind::NonOnePort),
            ERR_CANCEL_FAILED => Some(CalibrationErrorKind::CancelFailed),
            _ => None,
        }
    }

    pub fn to_byte(self) -> u8 {
        match self {
            CalibrationErrorKind::InitFailed => ERR_INIT_FAILED,
            CalibrationErrorKind::DirectionSwitchFailed => ERR_DIRECTION_SWITCH_FAILED,
            CalibrationErrorKind::CompletionFailed => ERR_COMPLETION_FAILED,
            CalibrationErrorKind::NoRange => ERR_NO_RANGE,
            CalibrationErrorKind::NonOnePort => ERR_NON_ONE_PORT,
            CalibrationErrorKind::CancelFailed => ERR_CANCEL_FAILED,
        }
    }

    /// Human-readable message forwarded to the server
    pub fn message(self) -> &'static str {
        match self {
            CalibrationErrorKind::InitFailed => "init failed",
            CalibrationErrorKind::DirectionSwitchFailed => "direction switch failed",
            CalibrationErrorKind::CompletionFailed => "completion failed",
            CalibrationErrorKind::NoRange => "no range",
            CalibrationErrorKind::NonOnePort => "non-1 port",
            CalibrationErrorKind::CancelFailed => "cancel failed",
        }
    }
}

/// Direction of a manual jog request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum JogDirection {
    /// Toward increasing sensor ticks
    Up,
    /// Toward decreasing sensor ticks
    Down,
}

const JOG_UP: u8 = 0x01;
const JOG_DOWN: u8 = 0x02;

impl JogDirection {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            JOG_UP => Some(JogDirection::Up),
            JOG_DOWN => Some(JogDirection::Down),
            _ => None,
        }
    }

    pub fn to_byte(self) -> u8 {
        match self {
            JogDirection::Up => JOG_UP,
            JogDirection::Down => JOG_DOWN,
        }
    }
}
