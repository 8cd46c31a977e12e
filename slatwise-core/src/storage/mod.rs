//! Persistence of the calibration profile and last position
//!
//! Wraps a `FlashStorage` and moves postcard records in and out of it.
//! Every operation can fail; callers keep their in-memory state when a
//! save fails.

pub mod record;

pub use record::{PositionRecord, ProfileRecord, MAX_RECORD_SIZE};

use slatwise_hal::{FlashError, FlashStorage, StorageKey};

use crate::calibration::CalibrationProfile;

/// Record persistence errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StorageError {
    /// Flash operation failed
    Flash(FlashError),
    /// Serialization failed
    Serialize,
    /// Deserialization failed
    Deserialize,
    /// CRC check failed
    CrcMismatch,
    /// Invalid magic or version
    InvalidFormat,
}

impl From<FlashError> for StorageError {
    fn from(e: FlashError) -> Self {
        StorageError::Flash(e)
    }
}

impl StorageError {
    /// Nothing has been stored under the key yet
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::Flash(FlashError::NotFound))
    }
}

/// Record store over a flash backend
pub struct Persistence<F> {
    flash: F,
}

impl<F: FlashStorage> Persistence<F> {
    pub fn new(flash: F) -> Self {
        Self { flash }
    }

    /// Access the backend
    pub fn flash_mut(&mut self) -> &mut F {
        &mut self.flash
    }

    pub fn into_inner(self) -> F {
        self.flash
    }

    pub async fn load_profile(&mut self) -> Result<CalibrationProfile, StorageError> {
        let mut buffer = [0u8; MAX_RECORD_SIZE];
        let len = self
            .flash
            .read(StorageKey::CalibrationProfile, &mut buffer)
            .await?;

        let record: ProfileRecord =
            postcard::from_bytes(&buffer[..len]).map_err(|_| StorageError::Deserialize)?;

        if !record.is_valid() {
            return Err(StorageError::InvalidFormat);
        }
        if !record.verify_crc() {
            return Err(StorageError::CrcMismatch);
        }

        Ok(record.profile())
    }

    pub async fn save_profile(&mut self, profile: &CalibrationProfile) -> Result<(), StorageError> {
        let record = ProfileRecord::new(profile);
        let mut buffer = [0u8; MAX_RECORD_SIZE];
        let bytes =
            postcard::to_slice(&record, &mut buffer).map_err(|_| StorageError::Serialize)?;

        self.flash
            .write(StorageKey::CalibrationProfile, bytes)
            .await
            .map_err(StorageError::Flash)
    }

    pub async fn load_position(&mut self) -> Result<i32, StorageError> {
        let mut buffer = [0u8; MAX_RECORD_SIZE];
        let len = self.flash.read(StorageKey::LastPosition, &mut buffer).await?;

        let record: PositionRecord =
            postcard::from_bytes(&buffer[..len]).map_err(|_| StorageError::Deserialize)?;

        if !record.is_valid() {
            return Err(StorageError::InvalidFormat);
        }
        if !record.verify_crc() {
            return Err(StorageError::CrcMismatch);
        }

        Ok(record.ticks)
    }

    pub async fn save_position(&mut self, ticks: i32) -> Result<(), StorageError> {
        let record = PositionRecord::new(ticks);
        let mut buffer = [0u8; MAX_RECORD_SIZE];
        let bytes =
            postcard::to_slice(&record, &mut buffer).map_err(|_| StorageError::Serialize)?;

        self.flash
            .write(StorageKey::LastPosition, bytes)
            .await
            .map_err(StorageError::Flash)
    }
}
