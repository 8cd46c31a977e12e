//! Message types for the link protocol
//!
//! Message types are divided into two categories:
//! - Coprocessor → Actuator: calibration handshake and motion requests
//! - Actuator → Coprocessor: handshake replies and position reports
//!
//! Every payload starts with the actuator port the message concerns.

use crate::events::{CalibrationErrorKind, EventName, JogDirection};
use crate::frame::{Frame, FrameError};

// Message type IDs: Coprocessor → Actuator
pub const MSG_CALIB_START: u8 = 0x01;
pub const MSG_STAGE1_COMPLETE: u8 = 0x02;
pub const MSG_STAGE2_COMPLETE: u8 = 0x03;
pub const MSG_CANCEL_CALIB: u8 = 0x04;
pub const MSG_CALIB_DONE_ACK: u8 = 0x05;
pub const MSG_MOVE_TO: u8 = 0x10;
pub const MSG_STOP: u8 = 0x11;
pub const MSG_JOG: u8 = 0x12;

// Message type IDs: Actuator → Coprocessor
pub const MSG_STAGE1_READY: u8 = 0x81;
pub const MSG_STAGE2_READY: u8 = 0x82;
pub const MSG_CALIB_DONE: u8 = 0x83;
pub const MSG_CALIB_ERROR: u8 = 0x84;
pub const MSG_CALIB_STATUS: u8 = 0x85;
pub const MSG_POS_HIT: u8 = 0x86;
pub const MSG_RECALIB_REQUIRED: u8 = 0x87;

/// Requests received from the coprocessor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkRequest {
    /// Begin calibration (stage 1: operator drives to the top)
    CalibStart { port: u8 },
    /// Operator confirmed the top bound
    Stage1Complete { port: u8 },
    /// Operator confirmed the bottom bound
    Stage2Complete { port: u8 },
    /// Abort calibration
    CancelCalib { port: u8 },
    /// Server acknowledged `calib_done`
    CalibDoneAck { port: u8 },
    /// Move to a normalized position (0..=10)
    MoveTo { port: u8, position: u8 },
    /// Stop any non-calibration motion
    Stop { port: u8 },
    /// Drive in one direction until stopped
    Jog { port: u8, direction: JogDirection },
}

fn port_only(frame: &Frame) -> Result<u8, FrameError> {
    frame.payload.first().copied().ok_or(FrameError::InvalidFrame)
}

fn port_and_arg(frame: &Frame) -> Result<(u8, u8), FrameError> {
    match frame.payload.as_slice() {
        &[port, arg, ..] => Ok((port, arg)),
        _ => Err(FrameError::InvalidFrame),
    }
}

impl LinkRequest {
    /// Parse a request from a frame
    pub fn from_frame(frame: &Frame) -> Result<Self, FrameError> {
        match frame.msg_type {
            MSG_CALIB_START => Ok(LinkRequest::CalibStart {
                port: port_only(frame)?,
            }),
            MSG_STAGE1_COMPLETE => Ok(LinkRequest::Stage1Complete {
                port: port_only(frame)?,
            }),
            MSG_STAGE2_COMPLETE => Ok(LinkRequest::Stage2Complete {
                port: port_only(frame)?,
            }),
            MSG_CANCEL_CALIB => Ok(LinkRequest::CancelCalib {
                port: port_only(frame)?,
            }),
            MSG_CALIB_DONE_ACK => Ok(LinkRequest::CalibDoneAck {
                port: port_only(frame)?,
            }),
            MSG_MOVE_TO => {
                let (port, position) = port_and_arg(frame)?;
                Ok(LinkRequest::MoveTo { port, position })
            }
            MSG_STOP => Ok(LinkRequest::Stop {
                port: port_only(frame)?,
            }),
            MSG_JOG => {
                let (port, direction) = port_and_arg(frame)?;
                let direction = JogDirection::from_byte(direction).ok_or(FrameError::InvalidFrame)?;
                Ok(LinkRequest::Jog { port, direction })
            }
            _ => Err(FrameError::InvalidFrame),
        }
    }

    /// Encode this request into a frame (for testing or simulation)
    pub fn to_frame(&self) -> Result<Frame, FrameError> {
        match *self {
            LinkRequest::CalibStart { port } => Frame::new(MSG_CALIB_START, &[port]),
            LinkRequest::Stage1Complete { port } => Frame::new(MSG_STAGE1_COMPLETE, &[port]),
            LinkRequest::Stage2Complete { port } => Frame::new(MSG_STAGE2_COMPLETE, &[port]),
            LinkRequest::CancelCalib { port } => Frame::new(MSG_CANCEL_CALIB, &[port]),
            LinkRequest::CalibDoneAck { port } => Frame::new(MSG_CALIB_DONE_ACK, &[port]),
            LinkRequest::MoveTo { port, position } => Frame::new(MSG_MOVE_TO, &[port, position]),
            LinkRequest::Stop { port } => Frame::new(MSG_STOP, &[port]),
            LinkRequest::Jog { port, direction } => {
                Frame::new(MSG_JOG, &[port, direction.to_byte()])
            }
        }
    }

    /// Actuator port this request addresses
    pub fn port(&self) -> u8 {
        match *self {
            LinkRequest::CalibStart { port }
            | LinkRequest::Stage1Complete { port }
            | LinkRequest::Stage2Complete { port }
            | LinkRequest::CancelCalib { port }
            | LinkRequest::CalibDoneAck { port }
            | LinkRequest::MoveTo { port, .. }
            | LinkRequest::Stop { port }
            | LinkRequest::Jog { port, .. } => port,
        }
    }

    pub fn event_name(&self) -> EventName {
        match self {
            LinkRequest::CalibStart { .. } => EventName::CalibStart,
            LinkRequest::Stage1Complete { .. } => EventName::UserStage1Complete,
            LinkRequest::Stage2Complete { .. } => EventName::UserStage2Complete,
            LinkRequest::CancelCalib { .. } => EventName::CancelCalib,
            LinkRequest::CalibDoneAck { .. } => EventName::CalibDoneAck,
            LinkRequest::MoveTo { .. } => EventName::MoveToPos,
            LinkRequest::Stop { .. } => EventName::StopMotion,
            LinkRequest::Jog { .. } => EventName::Jog,
        }
    }
}

/// Reports sent to the coprocessor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ActuatorReport {
    CalibStage1Ready { port: u8 },
    CalibStage2Ready { port: u8 },
    CalibDone { port: u8 },
    CalibError { port: u8, kind: CalibrationErrorKind },
    CalibStatus { port: u8, calibrated: bool },
    /// Actuator settled at a normalized position
    PosHit { port: u8, position: u8 },
    /// A stall invalidated the calibration
    RecalibrationRequired { port: u8 },
}

impl ActuatorReport {
    /// Encode this report into a frame
    pub fn to_frame(&self) -> Result<Frame, FrameError> {
        match *self {
            ActuatorReport::CalibStage1Ready { port } => Frame::new(MSG_STAGE1_READY, &[port]),
            ActuatorReport::CalibStage2Ready { port } => Frame::new(MSG_STAGE2_READY, &[port]),
            ActuatorReport::CalibDone { port } => Frame::new(MSG_CALIB_DONE, &[port]),
            ActuatorReport::CalibError { port, kind } => {
                Frame::new(MSG_CALIB_ERROR, &[port, kind.to_byte()])
            }
            ActuatorReport::CalibStatus { port, calibrated } => {
                Frame::new(MSG_CALIB_STATUS, &[port, calibrated as u8])
            }
            ActuatorReport::PosHit { port, position } => {
                Frame::new(MSG_POS_HIT, &[port, position])
            }
            ActuatorReport::RecalibrationRequired { port } => {
                Frame::new(MSG_RECALIB_REQUIRED, &[port])
            }
        }
    }

    /// Parse a report from a frame (for testing or simulation)
    pub fn from_frame(frame: &Frame) -> Result<Self, FrameError> {
        match frame.msg_type {
            MSG_STAGE1_READY => Ok(ActuatorReport::CalibStage1Ready {
                port: port_only(frame)?,
            }),
            MSG_STAGE2_READY => Ok(ActuatorReport::CalibStage2Ready {
                port: port_only(frame)?,
            }),
            MSG_CALIB_DONE => Ok(ActuatorReport::CalibDone {
                port: port_only(frame)?,
            }),
            MSG_CALIB_ERROR => {
                let (port, code) = port_and_arg(frame)?;
                let kind = CalibrationErrorKind::from_byte(code).ok_or(FrameError::InvalidFrame)?;
                Ok(ActuatorReport::CalibError { port, kind })
            }
            MSG_CALIB_STATUS => {
                let (port, flag) = port_and_arg(frame)?;
                Ok(ActuatorReport::CalibStatus {
                    port,
                    calibrated: flag != 0,
                })
            }
            MSG_POS_HIT => {
                let (port, position) = port_and_arg(frame)?;
                Ok(ActuatorReport::PosHit { port, position })
            }
            MSG_RECALIB_REQUIRED => Ok(ActuatorReport::RecalibrationRequired {
                port: port_only(frame)?,
            }),
            _ => Err(FrameError::InvalidFrame),
        }
    }

    pub fn event_name(&self) -> EventName {
        match self {
            ActuatorReport::CalibStage1Ready { .. } => EventName::CalibStage1Ready,
            ActuatorReport::CalibStage2Ready { .. } => EventName::CalibStage2Ready,
            ActuatorReport::CalibDone { .. } => EventName::CalibDone,
            ActuatorReport::CalibError { .. } => EventName::DeviceCalibError,
            ActuatorReport::CalibStatus { .. } => EventName::ReportCalibStatus,
            ActuatorReport::PosHit { .. } => EventName::PosHit,
            ActuatorReport::RecalibrationRequired { .. } => EventName::RecalibRequired,
        }
    }
}
