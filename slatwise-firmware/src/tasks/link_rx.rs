//! Link UART receive task
//!
//! Receives frames from the messaging coprocessor and forwards the decoded
//! requests to the control task.

use defmt::*;
use embassy_rp::uart::BufferedUartRx;
use embedded_io_async::Read;

use slatwise_core::calibration::CalibrationRequest;
use slatwise_core::motion::MotionCommand;
use slatwise_core::traits::Direction;
use slatwise_protocol::{FrameParser, JogDirection, LinkRequest};

use crate::channels::{ControlRequest, CONTROL_REQUESTS};

/// Buffer size for UART receive
const RX_BUF_SIZE: usize = 64;

/// Link RX task - receives and parses frames from the coprocessor
#[embassy_executor::task]
pub async fn link_rx_task(mut rx: BufferedUartRx) {
    info!("Link RX task started");

    let mut parser = FrameParser::new();
    let mut buf = [0u8; RX_BUF_SIZE];
    // Report a broken link once, not on every failed read
    let mut link_lost = false;

    loop {
        match rx.read(&mut buf).await {
            Ok(n) if n > 0 => {
                trace!("RX: {} bytes", n);
                link_lost = false;

                for &byte in &buf[..n] {
                    match parser.feed(byte) {
                        Ok(Some(frame)) => match LinkRequest::from_frame(&frame) {
                            Ok(request) => {
                                debug!("<- {}", request.event_name().as_str());
                                forward(control_request(request));
                            }
                            Err(e) => {
                                warn!("Failed to parse link request: {:?}", e);
                            }
                        },
                        Ok(None) => {
                            // Need more bytes
                        }
                        Err(e) => {
                            warn!("Frame parse error: {:?}", e);
                        }
                    }
                }
            }
            Ok(_) => {
                // No bytes read, continue
            }
            Err(e) => {
                warn!("UART read error: {:?}", e);
                parser.reset();
                if !link_lost {
                    link_lost = true;
                    forward(ControlRequest::LinkLost);
                }
            }
        }
    }
}

fn forward(request: ControlRequest) {
    if CONTROL_REQUESTS.try_send(request).is_err() {
        warn!("Control channel full, dropping {:?}", request);
    }
}

/// Map a wire request onto the control task's vocabulary
fn control_request(request: LinkRequest) -> ControlRequest {
    let calibration = |port, request| ControlRequest::Calibration { port, request };
    let motion = |port, command| ControlRequest::Motion { port, command };

    match request {
        LinkRequest::CalibStart { port } => calibration(port, CalibrationRequest::Start),
        LinkRequest::Stage1Complete { port } => {
            calibration(port, CalibrationRequest::Stage1Complete)
        }
        LinkRequest::Stage2Complete { port } => {
            calibration(port, CalibrationRequest::Stage2Complete)
        }
        LinkRequest::CancelCalib { port } => calibration(port, CalibrationRequest::Cancel),
        LinkRequest::CalibDoneAck { port } => calibration(port, CalibrationRequest::DoneAck),
        LinkRequest::MoveTo { port, position } => {
            motion(port, MotionCommand::MoveToNormalizedPosition(position))
        }
        LinkRequest::Stop { port } => motion(port, MotionCommand::Stop),
        LinkRequest::Jog { port, direction } => {
            let dir = match direction {
                JogDirection::Up => Direction::CounterClockwise,
                JogDirection::Down => Direction::Clockwise,
            };
            motion(port, MotionCommand::MoveDirection(dir))
        }
    }
}
