//! Quadrature sensor edge task
//!
//! One instance per encoder. Waits for an edge on either channel, samples
//! both levels and turns each completed detent into a `SensorEvent`.
//! Decode state stays local to the task; only the counter is shared.

use defmt::*;
use embassy_futures::select::select;
use embassy_rp::gpio::Input;

use slatwise_core::sensor::{PositionSensor, QuadratureDecoder};

use crate::channels::SENSOR_EVENTS;

#[embassy_executor::task(pool_size = 2)]
pub async fn sensor_task(
    sensor: &'static PositionSensor,
    mut a: Input<'static>,
    mut b: Input<'static>,
) {
    info!("Sensor task started: {:?}", sensor.id());

    let mut decoder = QuadratureDecoder::new(a.is_high(), b.is_high());

    loop {
        select(a.wait_for_any_edge(), b.wait_for_any_edge()).await;

        if let Some(detent) = decoder.update(a.is_high(), b.is_high()) {
            let event = sensor.apply(detent);
            trace!("{:?} -> {}", event.source, event.new_position);

            if SENSOR_EVENTS.try_send(event).is_err() {
                warn!("Sensor channel full, dropping {:?} detent", event.source);
            }
        }
    }
}
