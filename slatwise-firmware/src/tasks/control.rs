//! Control task
//!
//! Sole owner of the motion controller. Waits on sensor detents, link
//! requests and the stall watchdog deadline in one select, so a stall is
//! acted on in the same loop that drives the motor. Pending detents are
//! always drained before a link request is looked at.

use defmt::*;
use embassy_futures::select::{select3, Either3};
use embassy_rp::gpio::Output;
use embassy_rp::pwm::PwmOutput;
use embassy_time::{Delay, Instant, Timer};

use slatwise_core::calibration::{CalibrationProtocol, CalibrationRequest};
use slatwise_core::motion::{MotionCommand, MotionController, MotionMode};
use slatwise_core::sensor::SensorEvent;
use slatwise_drivers::motor::ServoMotor;
use slatwise_hal_rp2040::flash::Rp2040FlashStorage;
use slatwise_protocol::ActuatorReport;

use crate::channels::{publish_profile, ControlRequest, CONTROL_REQUESTS, REPORTS, SENSOR_EVENTS};

/// The controller as wired on this board
pub type ActuatorController = MotionController<
    'static,
    ServoMotor<PwmOutput<'static>, Output<'static>>,
    Rp2040FlashStorage<'static>,
    Delay,
>;

fn now_ms() -> u64 {
    Instant::now().as_millis()
}

/// Control task - the motion state machine's event loop
#[embassy_executor::task]
pub async fn control_task(mut controller: ActuatorController, protocol: CalibrationProtocol) {
    info!("Control task started");

    flush_reports(&mut controller);

    loop {
        while let Ok(event) = SENSOR_EVENTS.try_receive() {
            on_sensor_event(&mut controller, event).await;
        }
        flush_reports(&mut controller);

        let deadline = controller.watchdog_deadline();
        let mode = controller.mode();

        match select3(
            SENSOR_EVENTS.receive(),
            CONTROL_REQUESTS.receive(),
            watchdog_expiry(deadline),
        )
        .await
        {
            Either3::First(event) => {
                on_sensor_event(&mut controller, event).await;
            }
            Either3::Second(request) => {
                on_request(&mut controller, &protocol, request).await;
            }
            Either3::Third(()) => {
                if let Err(e) = controller.poll_watchdog(now_ms()).await {
                    error!("Watchdog handling failed: {:?}", e);
                }
                if !controller.profile().is_calibrated() && mode != MotionMode::Idle {
                    warn!("Stall detected in {:?}, recalibration required", mode);
                }
            }
        }

        if controller.mode() != mode {
            debug!("Mode {:?} -> {:?}", mode, controller.mode());
        }
        flush_reports(&mut controller);
    }
}

/// Resolves at the watchdog deadline, never if there is none
async fn watchdog_expiry(deadline: Option<u64>) {
    match deadline {
        Some(ms) => Timer::at(Instant::from_millis(ms)).await,
        None => core::future::pending::<()>().await,
    }
}

async fn on_sensor_event(controller: &mut ActuatorController, event: SensorEvent) {
    if let Err(e) = controller.handle_sensor_event(event, now_ms()).await {
        warn!("{:?} detent handling failed: {:?}", event.source, e);
    }
}

async fn on_request(
    controller: &mut ActuatorController,
    protocol: &CalibrationProtocol,
    request: ControlRequest,
) {
    match request {
        ControlRequest::Motion { port, command } => {
            run_command(controller, port, command).await;
        }
        ControlRequest::Calibration { port, request } => {
            run_calibration(controller, protocol, port, request).await;
        }
        ControlRequest::LinkLost => {
            if controller.mode().is_calibrating() {
                warn!("Link lost during calibration, cancelling");
                if let Err(e) = controller.cancel_calibration() {
                    error!("Failed to cancel calibration: {:?}", e);
                }
            }
        }
    }
}

async fn run_command(controller: &mut ActuatorController, port: u8, command: MotionCommand) {
    match controller.handle_remote(port, command, now_ms()).await {
        Ok(()) => debug!("{:?} accepted", command),
        Err(e) => warn!("{:?} for port {} rejected: {:?}", command, port, e),
    }
}

async fn run_calibration(
    controller: &mut ActuatorController,
    protocol: &CalibrationProtocol,
    port: u8,
    request: CalibrationRequest,
) {
    if request == CalibrationRequest::DoneAck {
        info!("Calibration acknowledged by server");
    }

    match protocol.handle(controller, port, request, now_ms()).await {
        Ok(Some(reply)) => {
            info!("Calibration {:?} ok", request);
            send(reply);
        }
        Ok(None) => {}
        Err(e) => {
            warn!(
                "Calibration {:?} failed ({}): {:?}",
                request,
                e.kind.message(),
                e.cause
            );
            send(e.reply());
        }
    }
}

fn flush_reports(controller: &mut ActuatorController) {
    while let Some(report) = controller.pop_report() {
        send(report);
    }
    publish_profile(controller.profile());
}

fn send(report: ActuatorReport) {
    if REPORTS.try_send(report).is_err() {
        warn!("Report channel full, dropping {:?}", report);
    }
}
