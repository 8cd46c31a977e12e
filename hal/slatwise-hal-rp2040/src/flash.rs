//! Flash storage driver for RP2040
//!
//! Keeps the calibration profile and last position as wear-leveled
//! sequential-storage map items in the last 64KB of flash.

use embassy_rp::dma::Channel;
use embassy_rp::flash::{Async, Flash, ERASE_SIZE};
use embassy_rp::peripherals::FLASH;
use embassy_rp::Peri;
use embedded_storage_async::nor_flash::NorFlash;
use sequential_storage::cache::NoCache;
use sequential_storage::map;

pub use slatwise_hal::flash::{FlashError, StorageKey};

/// Total flash on the reference board
pub const FLASH_SIZE: usize = 2 * 1024 * 1024;
/// Size of the record partition
pub const RECORD_PARTITION_SIZE: usize = 64 * 1024;
pub const RECORD_PARTITION_START: usize = FLASH_SIZE - RECORD_PARTITION_SIZE;

/// Flash erase size for RP2040
pub const FLASH_ERASE_SIZE: usize = ERASE_SIZE;

/// Flash range for the record partition
pub const RECORD_RANGE: core::ops::Range<u32> =
    (RECORD_PARTITION_START as u32)..(FLASH_SIZE as u32);

/// Scratch size for one map item. Both records fit in well under this.
const ITEM_BUFFER_SIZE: usize = 256;

/// RP2040 record storage
pub struct Rp2040FlashStorage<'d> {
    flash: Flash<'d, FLASH, Async, FLASH_SIZE>,
}

impl<'d> Rp2040FlashStorage<'d> {
    pub fn new(flash: Peri<'d, FLASH>, dma: Peri<'d, impl Channel>) -> Self {
        Self {
            flash: Flash::new(flash, dma),
        }
    }
}

fn map_storage_error<E>(err: sequential_storage::Error<E>) -> FlashError {
    match err {
        sequential_storage::Error::Storage { .. } => FlashError::Flash,
        sequential_storage::Error::FullStorage => FlashError::Full,
        sequential_storage::Error::Corrupted { .. } => FlashError::Corrupted,
        sequential_storage::Error::BufferTooSmall(_) => FlashError::BufferTooSmall,
        _ => FlashError::Storage,
    }
}

impl<'d> slatwise_hal::FlashStorage for Rp2040FlashStorage<'d> {
    async fn read(&mut self, key: StorageKey, buffer: &mut [u8]) -> Result<usize, FlashError> {
        let mut item_buffer = [0u8; ITEM_BUFFER_SIZE];

        let item = map::fetch_item::<StorageKey, &[u8], _>(
            &mut self.flash,
            RECORD_RANGE,
            &mut NoCache::new(),
            &mut item_buffer,
            &key,
        )
        .await
        .map_err(map_storage_error)?;

        let data = item.ok_or(FlashError::NotFound)?;
        let len = data.len();
        if buffer.len() < len {
            return Err(FlashError::BufferTooSmall);
        }
        buffer[..len].copy_from_slice(data);
        Ok(len)
    }

    async fn write(&mut self, key: StorageKey, data: &[u8]) -> Result<(), FlashError> {
        let mut item_buffer = [0u8; ITEM_BUFFER_SIZE];

        map::store_item(
            &mut self.flash,
            RECORD_RANGE,
            &mut NoCache::new(),
            &mut item_buffer,
            &key,
            &data,
        )
        .await
        .map_err(map_storage_error)
    }

    async fn exists(&mut self, key: StorageKey) -> bool {
        let mut item_buffer = [0u8; ITEM_BUFFER_SIZE];

        matches!(
            map::fetch_item::<StorageKey, &[u8], _>(
                &mut self.flash,
                RECORD_RANGE,
                &mut NoCache::new(),
                &mut item_buffer,
                &key,
            )
            .await,
            Ok(Some(_))
        )
    }

    async fn erase_all(&mut self) -> Result<(), FlashError> {
        self.flash
            .erase(RECORD_RANGE.start, RECORD_RANGE.end)
            .await
            .map_err(|_| FlashError::Flash)
    }
}
