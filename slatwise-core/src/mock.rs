//! In-memory stand-ins for flash, motor and delay used by host tests

use embedded_hal_async::delay::DelayNs;
use heapless::Vec;
use slatwise_hal::{FlashError, FlashStorage, StorageKey};

use crate::traits::{Direction, MotorError, MotorOutput};

const SLOTS: usize = 3;

/// Key-value flash backed by RAM that can be told to fail
#[derive(Debug, Default)]
pub struct MemoryFlash {
    slots: [Option<Vec<u8, 64>>; SLOTS],
    fail_writes: bool,
    pub writes: usize,
}

impl MemoryFlash {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    /// Flip the low bit of one stored byte
    pub fn corrupt(&mut self, key: StorageKey, index: usize) {
        if let Some(data) = self.slots[key.as_u8() as usize].as_mut() {
            data[index] ^= 0x01;
        }
    }
}

impl FlashStorage for MemoryFlash {
    async fn read(&mut self, key: StorageKey, buffer: &mut [u8]) -> Result<usize, FlashError> {
        let data = self.slots[key.as_u8() as usize]
            .as_ref()
            .ok_or(FlashError::NotFound)?;
        if buffer.len() < data.len() {
            return Err(FlashError::BufferTooSmall);
        }
        buffer[..data.len()].copy_from_slice(data);
        Ok(data.len())
    }

    async fn write(&mut self, key: StorageKey, data: &[u8]) -> Result<(), FlashError> {
        if self.fail_writes {
            return Err(FlashError::Flash);
        }
        let stored = Vec::from_slice(data).map_err(|_| FlashError::Full)?;
        self.slots[key.as_u8() as usize] = Some(stored);
        self.writes += 1;
        Ok(())
    }

    async fn exists(&mut self, key: StorageKey) -> bool {
        self.slots[key.as_u8() as usize].is_some()
    }

    async fn erase_all(&mut self) -> Result<(), FlashError> {
        self.slots = Default::default();
        Ok(())
    }
}

/// Motor output that remembers what it was told, or rejects everything
#[derive(Debug, Default)]
pub struct MockMotor {
    pub spinning: Option<Direction>,
    pub powered: bool,
    pub fail: bool,
}

impl MotorOutput for MockMotor {
    fn drive(&mut self, dir: Direction) -> Result<(), MotorError> {
        if self.fail {
            return Err(MotorError::Output);
        }
        self.spinning = Some(dir);
        Ok(())
    }

    fn halt(&mut self) -> Result<(), MotorError> {
        if self.fail {
            return Err(MotorError::Output);
        }
        self.spinning = None;
        Ok(())
    }

    fn set_power(&mut self, on: bool) -> Result<(), MotorError> {
        if self.fail {
            return Err(MotorError::Output);
        }
        self.powered = on;
        Ok(())
    }
}

/// Delay that returns immediately and tallies the requested time
#[derive(Debug, Default)]
pub struct NoopDelay {
    pub total_ns: u64,
}

impl DelayNs for NoopDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.total_ns += ns as u64;
    }
}
