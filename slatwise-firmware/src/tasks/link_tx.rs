//! Link UART transmit task
//!
//! Frames the controller's reports and writes them to the coprocessor.

use defmt::*;
use embassy_rp::uart::BufferedUartTx;
use embedded_io_async::Write;

use slatwise_protocol::ActuatorReport;

use crate::channels::REPORTS;

/// Link TX task - sends reports in the order they were produced
#[embassy_executor::task]
pub async fn link_tx_task(mut tx: BufferedUartTx) {
    info!("Link TX task started");

    loop {
        let report = REPORTS.receive().await;
        send_report(&mut tx, report).await;
    }
}

async fn send_report(tx: &mut BufferedUartTx, report: ActuatorReport) {
    let frame = match report.to_frame() {
        Ok(frame) => frame,
        Err(e) => {
            warn!("Failed to frame {:?}: {:?}", report, e);
            return;
        }
    };

    let mut buf = [0u8; 64];
    match frame.encode(&mut buf) {
        Ok(len) => {
            if let Err(e) = tx.write_all(&buf[..len]).await {
                warn!("Failed to send {}: {:?}", report.event_name().as_str(), e);
            } else {
                debug!("-> {}", report.event_name().as_str());
            }
        }
        Err(e) => warn!("Failed to encode {:?}: {:?}", report, e),
    }
}
