//! Calibration profile
//!
//! Maps raw primary-sensor ticks onto the normalized 0..=10 position the
//! server works in. `top_ticks` is normalized 10, `bottom_ticks` is 0; either
//! bound may be the larger one.

use slatwise_hal::FlashStorage;

use crate::config::MAX_NORMALIZED;
use crate::storage::{Persistence, StorageError};

/// Calibration stage errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CalibrationError {
    /// Bottom bound equals the top bound
    NoRange,
    /// The new profile could not be persisted
    Storage(StorageError),
}

impl From<StorageError> for CalibrationError {
    fn from(e: StorageError) -> Self {
        CalibrationError::Storage(e)
    }
}

/// Tick bounds of the travel plus the calibrated flag
///
/// Never calibrated with equal bounds. Mutations compute the next profile,
/// persist it, and only then replace `self`, so a failed write leaves the
/// previous profile in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalibrationProfile {
    top_ticks: i32,
    bottom_ticks: i32,
    calibrated: bool,
}

impl CalibrationProfile {
    /// Uncalibrated profile with zero bounds
    pub const fn new() -> Self {
        Self {
            top_ticks: 0,
            bottom_ticks: 0,
            calibrated: false,
        }
    }

    /// Build a profile from stored fields
    pub fn from_parts(top_ticks: i32, bottom_ticks: i32, calibrated: bool) -> Self {
        Self {
            top_ticks,
            bottom_ticks,
            calibrated: calibrated && top_ticks != bottom_ticks,
        }
    }

    pub fn top_ticks(&self) -> i32 {
        self.top_ticks
    }

    pub fn bottom_ticks(&self) -> i32 {
        self.bottom_ticks
    }

    pub fn is_calibrated(&self) -> bool {
        self.calibrated
    }

    /// `(min, max)` of the bounds when calibrated
    pub fn bounds(&self) -> Option<(i32, i32)> {
        self.calibrated.then(|| {
            (
                self.top_ticks.min(self.bottom_ticks),
                self.top_ticks.max(self.bottom_ticks),
            )
        })
    }

    /// Load the stored profile, falling back to uncalibrated
    pub async fn load<F: FlashStorage>(store: &mut Persistence<F>) -> Self {
        store.load_profile().await.unwrap_or_default()
    }

    /// Record the top bound (calibration stage 1)
    pub async fn begin_calibration<F: FlashStorage>(
        &mut self,
        current_ticks: i32,
        store: &mut Persistence<F>,
    ) -> Result<(), CalibrationError> {
        let next = Self {
            top_ticks: current_ticks,
            bottom_ticks: self.bottom_ticks,
            calibrated: false,
        };
        store.save_profile(&next).await?;
        *self = next;
        Ok(())
    }

    /// Record the bottom bound and mark calibrated (calibration stage 2)
    pub async fn complete_calibration<F: FlashStorage>(
        &mut self,
        current_ticks: i32,
        store: &mut Persistence<F>,
    ) -> Result<(), CalibrationError> {
        if current_ticks == self.top_ticks {
            return Err(CalibrationError::NoRange);
        }
        let next = Self {
            top_ticks: self.top_ticks,
            bottom_ticks: current_ticks,
            calibrated: true,
        };
        store.save_profile(&next).await?;
        *self = next;
        Ok(())
    }

    /// Mark uncalibrated; a no-op when already clear
    pub async fn clear<F: FlashStorage>(
        &mut self,
        store: &mut Persistence<F>,
    ) -> Result<(), CalibrationError> {
        if !self.calibrated {
            return Ok(());
        }
        let next = Self {
            calibrated: false,
            ..*self
        };
        store.save_profile(&next).await?;
        *self = next;
        Ok(())
    }

    /// Drop the calibrated flag in memory only
    ///
    /// Used on a stall when the persisted clear failed: the bounds can no
    /// longer be trusted regardless of what flash says.
    pub fn invalidate(&mut self) {
        self.calibrated = false;
    }

    /// Tick position for a normalized position
    ///
    /// `None` when uncalibrated or `pos` is above 10.
    pub fn ticks_from_normalized(&self, pos: u8) -> Option<i32> {
        if !self.calibrated || pos > MAX_NORMALIZED {
            return None;
        }
        let range = self.top_ticks as i64 - self.bottom_ticks as i64;
        let offset = div_round(pos as i64 * range, MAX_NORMALIZED as i64);
        i32::try_from(offset + self.bottom_ticks as i64).ok()
    }

    /// Normalized position for a tick position, clamped to 0..=10
    pub fn normalized_from_ticks(&self, ticks: i32) -> Option<u8> {
        if !self.calibrated {
            return None;
        }
        let range = self.top_ticks as i64 - self.bottom_ticks as i64;
        let scaled = (ticks as i64 - self.bottom_ticks as i64) * MAX_NORMALIZED as i64;
        let pos = div_round(scaled, range).clamp(0, MAX_NORMALIZED as i64);
        Some(pos as u8)
    }
}

/// Integer division rounding half away from zero
fn div_round(num: i64, den: i64) -> i64 {
    let (num, den) = if den < 0 { (-num, -den) } else { (num, den) };
    if num >= 0 {
        (2 * num + den) / (2 * den)
    } else {
        -((-2 * num + den) / (2 * den))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MemoryFlash;
    use embassy_futures::block_on;
    use proptest::prelude::*;

    fn calibrated(top: i32, bottom: i32) -> CalibrationProfile {
        CalibrationProfile::from_parts(top, bottom, true)
    }

    #[test]
    fn test_div_round_half_away_from_zero() {
        assert_eq!(div_round(5, 10), 1);
        assert_eq!(div_round(4, 10), 0);
        assert_eq!(div_round(-5, 10), -1);
        assert_eq!(div_round(-4, 10), 0);
        assert_eq!(div_round(15, -10), -2);
        assert_eq!(div_round(-15, -10), 2);
    }

    #[test]
    fn test_reference_conversions() {
        let profile = calibrated(1000, 0);
        assert_eq!(profile.ticks_from_normalized(5), Some(500));
        assert_eq!(profile.normalized_from_ticks(500), Some(5));
        assert_eq!(profile.normalized_from_ticks(1500), Some(10));
        assert_eq!(profile.normalized_from_ticks(-50), Some(0));
    }

    #[test]
    fn test_inverted_bounds() {
        let profile = calibrated(-400, 600);
        assert_eq!(profile.ticks_from_normalized(0), Some(600));
        assert_eq!(profile.ticks_from_normalized(10), Some(-400));
        assert_eq!(profile.normalized_from_ticks(100), Some(5));
        assert_eq!(profile.bounds(), Some((-400, 600)));
    }

    #[test]
    fn test_uncalibrated_conversions_unavailable() {
        let profile = CalibrationProfile::new();
        assert_eq!(profile.ticks_from_normalized(5), None);
        assert_eq!(profile.normalized_from_ticks(5), None);
        assert_eq!(profile.bounds(), None);
    }

    #[test]
    fn test_position_above_range_rejected() {
        assert_eq!(calibrated(1000, 0).ticks_from_normalized(11), None);
    }

    #[test]
    fn test_load_falls_back_to_uncalibrated() {
        let mut store = Persistence::new(MemoryFlash::new());
        let profile = block_on(CalibrationProfile::load(&mut store));
        assert_eq!(profile, CalibrationProfile::new());
    }

    #[test]
    fn test_calibration_stages_persist() {
        let mut store = Persistence::new(MemoryFlash::new());
        let mut profile = CalibrationProfile::new();

        block_on(profile.begin_calibration(1000, &mut store)).unwrap();
        assert_eq!(profile.top_ticks(), 1000);
        assert!(!profile.is_calibrated());

        block_on(profile.complete_calibration(0, &mut store)).unwrap();
        assert!(profile.is_calibrated());
        assert_eq!(block_on(CalibrationProfile::load(&mut store)), profile);
    }

    #[test]
    fn test_complete_at_top_is_no_range() {
        let mut store = Persistence::new(MemoryFlash::new());
        let mut profile = CalibrationProfile::new();
        block_on(profile.begin_calibration(1000, &mut store)).unwrap();

        let result = block_on(profile.complete_calibration(1000, &mut store));
        assert_eq!(result, Err(CalibrationError::NoRange));
        assert!(!profile.is_calibrated());
    }

    #[test]
    fn test_failed_write_keeps_previous_profile() {
        let mut store = Persistence::new(MemoryFlash::new());
        let mut profile = calibrated(1000, 0);
        store.flash_mut().fail_writes(true);

        assert!(block_on(profile.begin_calibration(50, &mut store)).is_err());
        assert!(block_on(profile.clear(&mut store)).is_err());
        assert_eq!(profile, calibrated(1000, 0));
    }

    #[test]
    fn test_clear_when_clear_does_not_write() {
        let mut store = Persistence::new(MemoryFlash::new());
        let mut profile = CalibrationProfile::new();
        store.flash_mut().fail_writes(true);
        assert_eq!(block_on(profile.clear(&mut store)), Ok(()));
    }

    #[test]
    fn test_clear_persists() {
        let mut store = Persistence::new(MemoryFlash::new());
        let mut profile = calibrated(1000, 0);
        block_on(profile.clear(&mut store)).unwrap();
        assert!(!profile.is_calibrated());
        assert!(!block_on(CalibrationProfile::load(&mut store)).is_calibrated());
    }

    fn bounds() -> impl Strategy<Value = (i32, i32)> {
        (-1_000_000i32..1_000_000, -1_000_000i32..1_000_000).prop_filter("distinct", |(t, b)| t != b)
    }

    proptest! {
        #[test]
        fn prop_normalized_survives_round_trip((top, bottom) in bounds(), pos in 0u8..=10) {
            prop_assume!((top as i64 - bottom as i64).abs() >= 10);
            let profile = calibrated(top, bottom);
            let ticks = profile.ticks_from_normalized(pos).unwrap();
            prop_assert_eq!(profile.normalized_from_ticks(ticks), Some(pos));
        }

        #[test]
        fn prop_ticks_within_half_step((top, bottom) in bounds(), frac in 0.0f64..=1.0) {
            let profile = calibrated(top, bottom);
            let range = (top as i64 - bottom as i64).abs();
            let lo = top.min(bottom) as i64;
            let ticks = (lo + (frac * range as f64) as i64) as i32;
            let pos = profile.normalized_from_ticks(ticks).unwrap();
            let back = profile.ticks_from_normalized(pos).unwrap();
            let tolerance = (range + 19) / 20;
            prop_assert!((back as i64 - ticks as i64).abs() <= tolerance);
        }

        #[test]
        fn prop_normalized_is_clamped((top, bottom) in bounds(), ticks in any::<i32>()) {
            let pos = calibrated(top, bottom).normalized_from_ticks(ticks).unwrap();
            prop_assert!(pos <= 10);
        }
    }
}
