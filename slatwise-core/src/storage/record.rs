//! Persisted record formats
//!
//! Each record is postcard-encoded and carries a magic, a format version
//! and a CRC32 so stale or torn writes are rejected on load.

use serde::{Deserialize, Serialize};

use crate::calibration::CalibrationProfile;

/// Magic for the calibration profile record
pub const PROFILE_MAGIC: u32 = 0x534C_4350; // "SLCP"

/// Magic for the last-position record
pub const POSITION_MAGIC: u32 = 0x534C_5053; // "SLPS"

/// Current record format version
pub const RECORD_VERSION: u8 = 1;

/// Upper bound on an encoded record
pub const MAX_RECORD_SIZE: usize = 32;

/// Calibration profile as stored in flash
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ProfileRecord {
    pub magic: u32,
    pub version: u8,
    pub top_ticks: i32,
    pub bottom_ticks: i32,
    pub calibrated: bool,
    /// CRC32 over magic..calibrated
    pub crc: u32,
}

impl ProfileRecord {
    /// Build a sealed record from a profile
    pub fn new(profile: &CalibrationProfile) -> Self {
        let mut record = Self {
            magic: PROFILE_MAGIC,
            version: RECORD_VERSION,
            top_ticks: profile.top_ticks(),
            bottom_ticks: profile.bottom_ticks(),
            calibrated: profile.is_calibrated(),
            crc: 0,
        };
        record.crc = record.calculate_crc();
        record
    }

    /// Check magic and version
    pub fn is_valid(&self) -> bool {
        self.magic == PROFILE_MAGIC && self.version == RECORD_VERSION
    }

    pub fn calculate_crc(&self) -> u32 {
        let mut crc = 0xFFFF_FFFF;
        crc = crc32_update(crc, &self.magic.to_le_bytes());
        crc = crc32_update(crc, &[self.version]);
        crc = crc32_update(crc, &self.top_ticks.to_le_bytes());
        crc = crc32_update(crc, &self.bottom_ticks.to_le_bytes());
        crc = crc32_update(crc, &[self.calibrated as u8]);
        !crc
    }

    pub fn verify_crc(&self) -> bool {
        self.crc == self.calculate_crc()
    }

    /// Recover the profile
    ///
    /// A record claiming calibration with equal bounds is downgraded to
    /// uncalibrated.
    pub fn profile(&self) -> CalibrationProfile {
        CalibrationProfile::from_parts(self.top_ticks, self.bottom_ticks, self.calibrated)
    }
}

/// Last known primary sensor position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PositionRecord {
    pub magic: u32,
    pub version: u8,
    pub ticks: i32,
    pub crc: u32,
}

impl PositionRecord {
    pub fn new(ticks: i32) -> Self {
        let mut record = Self {
            magic: POSITION_MAGIC,
            version: RECORD_VERSION,
            ticks,
            crc: 0,
        };
        record.crc = record.calculate_crc();
        record
    }

    pub fn is_valid(&self) -> bool {
        self.magic == POSITION_MAGIC && self.version == RECORD_VERSION
    }

    pub fn calculate_crc(&self) -> u32 {
        let mut crc = 0xFFFF_FFFF;
        crc = crc32_update(crc, &self.magic.to_le_bytes());
        crc = crc32_update(crc, &[self.version]);
        crc = crc32_update(crc, &self.ticks.to_le_bytes());
        !crc
    }

    pub fn verify_crc(&self) -> bool {
        self.crc == self.calculate_crc()
    }
}

/// CRC32 update (IEEE 802.3 polynomial, reflected)
fn crc32_update(mut crc: u32, data: &[u8]) -> u32 {
    const POLY: u32 = 0xEDB8_8320;

    for &byte in data {
        crc ^= byte as u32;
        for _ in 0..8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ POLY;
            } else {
                crc >>= 1;
            }
        }
    }

    crc
}
