//! Three-stage calibration handshake
//!
//! ```text
//! server                          actuator
//!   calib_start            ->     clear profile, follow wand freely
//!                          <-     calib_stage1_ready
//!   user_stage1_complete   ->     record top bound
//!                          <-     calib_stage2_ready
//!   user_stage2_complete   ->     record bottom bound, arm wand
//!                          <-     calib_done
//!   calib_done_ack         ->
//! ```
//!
//! Any failed stage is answered with `device_calib_error` and leaves the
//! controller in the stage it was in, so the operator can retry. A cancel
//! is only answered when the motor could not be stopped.

use embedded_hal_async::delay::DelayNs;
use slatwise_hal::FlashStorage;
use slatwise_protocol::{ActuatorReport, CalibrationErrorKind};

use crate::motion::{ControlError, MotionController};
use crate::traits::MotorOutput;

/// Calibration requests from the link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CalibrationRequest {
    Start,
    Stage1Complete,
    Stage2Complete,
    Cancel,
    DoneAck,
}

/// A stage that failed, with the reply owed to the server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HandshakeError {
    pub port: u8,
    pub kind: CalibrationErrorKind,
    pub cause: ControlError,
}

impl HandshakeError {
    pub fn reply(&self) -> ActuatorReport {
        ActuatorReport::CalibError {
            port: self.port,
            kind: self.kind,
        }
    }
}

/// Maps handshake requests onto controller calibration stages
#[derive(Debug, Clone, Copy)]
pub struct CalibrationProtocol {
    target_id: u8,
}

impl CalibrationProtocol {
    pub fn new(target_id: u8) -> Self {
        Self { target_id }
    }

    /// Run one handshake step
    ///
    /// `Ok(None)` for requests that are not answered.
    pub async fn handle<M, F, D>(
        &self,
        controller: &mut MotionController<'_, M, F, D>,
        port: u8,
        request: CalibrationRequest,
        now_ms: u64,
    ) -> Result<Option<ActuatorReport>, HandshakeError>
    where
        M: MotorOutput,
        F: FlashStorage,
        D: DelayNs,
    {
        let fail = |kind, cause| HandshakeError { port, kind, cause };

        if port != self.target_id {
            return Err(fail(
                CalibrationErrorKind::NonOnePort,
                ControlError::InvalidTarget,
            ));
        }

        match request {
            CalibrationRequest::Start => controller
                .start_calibration()
                .await
                .map(|()| Some(ActuatorReport::CalibStage1Ready { port }))
                .map_err(|e| fail(CalibrationErrorKind::InitFailed, e)),
            CalibrationRequest::Stage1Complete => controller
                .switch_calibration_direction()
                .await
                .map(|()| Some(ActuatorReport::CalibStage2Ready { port }))
                .map_err(|e| fail(CalibrationErrorKind::DirectionSwitchFailed, e)),
            CalibrationRequest::Stage2Complete => controller
                .complete_calibration(now_ms)
                .await
                .map(|()| Some(ActuatorReport::CalibDone { port }))
                .map_err(|e| match e {
                    ControlError::NoRange => fail(CalibrationErrorKind::NoRange, e),
                    _ => fail(CalibrationErrorKind::CompletionFailed, e),
                }),
            CalibrationRequest::Cancel => match controller.cancel_calibration() {
                // Nothing to undo outside calibration
                Ok(()) | Err(ControlError::InvalidMode) => Ok(None),
                Err(e) => Err(fail(CalibrationErrorKind::CancelFailed, e)),
            },
            CalibrationRequest::DoneAck => Ok(None),
        }
    }
}
