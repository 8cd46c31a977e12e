//! Rotary position sensors
//!
//! Two quadrature sensors share the same wiring and decoder: the primary
//! sensor on the actuated shaft and the secondary "wand" turned by hand.
//! Each sensor's detent counter is a single atomic so the edge handler can
//! publish it and any task can read it without locking.

pub mod quadrature;

pub use quadrature::{Detent, QuadratureDecoder};

use portable_atomic::{AtomicI32, Ordering};

/// Which physical sensor an event came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorId {
    /// Sensor on the actuated shaft
    Primary,
    /// Hand-turned wand
    Secondary,
}

/// A detent counter changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SensorEvent {
    pub source: SensorId,
    pub new_position: i32,
}

/// Shared detent counter of one sensor
///
/// Written only by the sensor's edge handler, plus one restore at boot
/// before edges are handled.
#[derive(Debug)]
pub struct PositionSensor {
    id: SensorId,
    position: AtomicI32,
}

impl PositionSensor {
    pub const fn new(id: SensorId) -> Self {
        Self {
            id,
            position: AtomicI32::new(0),
        }
    }

    pub fn id(&self) -> SensorId {
        self.id
    }

    /// Current detent count
    pub fn position(&self) -> i32 {
        self.position.load(Ordering::Acquire)
    }

    /// Overwrite the counter (boot restore)
    pub fn set_position(&self, ticks: i32) {
        self.position.store(ticks, Ordering::Release);
    }

    /// Apply one detent and build the event to publish
    pub fn apply(&self, detent: Detent) -> SensorEvent {
        let delta = detent.delta();
        let new_position = self.position.fetch_add(delta, Ordering::AcqRel).wrapping_add(delta);
        SensorEvent {
            source: self.id,
            new_position,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_reports_new_position() {
        let sensor = PositionSensor::new(SensorId::Secondary);
        sensor.set_position(41);
        let event = sensor.apply(Detent::Forward);
        assert_eq!(
            event,
            SensorEvent {
                source: SensorId::Secondary,
                new_position: 42
            }
        );
        assert_eq!(sensor.apply(Detent::Backward).new_position, 41);
        assert_eq!(sensor.position(), 41);
    }

    #[test]
    fn test_counter_goes_negative() {
        let sensor = PositionSensor::new(SensorId::Primary);
        sensor.apply(Detent::Backward);
        sensor.apply(Detent::Backward);
        assert_eq!(sensor.position(), -2);
    }
}
