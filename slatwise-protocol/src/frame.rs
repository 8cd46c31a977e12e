//! UART link framing
//!
//! ```text
//! 0x5A | len | type | payload[len] | crc8
//! ```
//!
//! The trailing byte is CRC-8/SMBUS (poly 0x07, init 0x00) over `len`, `type`
//! and the payload, so a glitch on the line cannot turn one request into
//! another. Every message in this vocabulary fits in two payload bytes; the
//! 32-byte limit only bounds what the receiver will buffer.

use heapless::Vec;

/// Marks the start of every frame on the wire
pub const FRAME_START: u8 = 0x5A;

/// Largest payload the receiver accepts
pub const MAX_PAYLOAD_SIZE: usize = 32;

/// Start, length, type and CRC bytes around the payload
const OVERHEAD: usize = 4;

/// Largest encoded frame
pub const MAX_FRAME_SIZE: usize = OVERHEAD + MAX_PAYLOAD_SIZE;

const CRC8_POLY: u8 = 0x07;

/// Framing errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Payload longer than `MAX_PAYLOAD_SIZE`
    PayloadTooLarge,
    /// Trailing CRC did not match
    InvalidChecksum,
    /// Bad length byte, or a payload that does not fit its message type
    InvalidFrame,
    /// Output buffer shorter than the encoded frame
    BufferTooSmall,
}

/// Continue a CRC-8 computation over `data`
fn crc8_update(mut crc: u8, data: &[u8]) -> u8 {
    for &byte in data {
        crc ^= byte;
        for _ in 0..8 {
            crc = if crc & 0x80 != 0 {
                (crc << 1) ^ CRC8_POLY
            } else {
                crc << 1
            };
        }
    }
    crc
}

/// CRC-8/SMBUS of a byte slice
pub fn crc8(data: &[u8]) -> u8 {
    crc8_update(0, data)
}

/// One message on the link
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub msg_type: u8,
    pub payload: Vec<u8, MAX_PAYLOAD_SIZE>,
}

impl Frame {
    pub fn new(msg_type: u8, payload: &[u8]) -> Result<Self, FrameError> {
        let payload = Vec::from_slice(payload).map_err(|_| FrameError::PayloadTooLarge)?;
        Ok(Self { msg_type, payload })
    }

    /// A frame whose type says everything
    pub fn empty(msg_type: u8) -> Self {
        Self {
            msg_type,
            payload: Vec::new(),
        }
    }

    /// Encoded size in bytes
    pub fn wire_len(&self) -> usize {
        OVERHEAD + self.payload.len()
    }

    fn crc(&self) -> u8 {
        crc8_update(
            crc8(&[self.payload.len() as u8, self.msg_type]),
            &self.payload,
        )
    }

    /// Write the frame into `buffer` and return the number of bytes used
    pub fn encode(&self, buffer: &mut [u8]) -> Result<usize, FrameError> {
        let len = self.wire_len();
        let out = buffer
            .get_mut(..len)
            .ok_or(FrameError::BufferTooSmall)?;

        let (header, rest) = out.split_at_mut(3);
        header.copy_from_slice(&[FRAME_START, self.payload.len() as u8, self.msg_type]);
        let (body, trailer) = rest.split_at_mut(self.payload.len());
        body.copy_from_slice(&self.payload);
        trailer[0] = self.crc();

        Ok(len)
    }

    pub fn encode_to_vec(&self) -> Result<Vec<u8, MAX_FRAME_SIZE>, FrameError> {
        let mut out = Vec::new();
        out.resize(self.wire_len(), 0)
            .map_err(|_| FrameError::BufferTooSmall)?;
        self.encode(&mut out)?;
        Ok(out)
    }
}

/// Where the receiver is within the current frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Sync,
    Length,
    Type { len: u8 },
    Payload { len: u8 },
    Crc,
}

/// Incremental receiver for bytes coming off the UART
///
/// The CRC is accumulated as bytes arrive. Noise before a start byte is
/// skipped; a bad length or CRC is reported once and the receiver goes
/// back to hunting for the next start byte.
#[derive(Debug, Clone)]
pub struct FrameParser {
    stage: Stage,
    msg_type: u8,
    payload: Vec<u8, MAX_PAYLOAD_SIZE>,
    crc: u8,
}

impl Default for FrameParser {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameParser {
    pub fn new() -> Self {
        Self {
            stage: Stage::Sync,
            msg_type: 0,
            payload: Vec::new(),
            crc: 0,
        }
    }

    /// Drop any partial frame
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Consume one byte, yielding a frame once its CRC checks out
    pub fn feed(&mut self, byte: u8) -> Result<Option<Frame>, FrameError> {
        match self.stage {
            Stage::Sync => {
                if byte == FRAME_START {
                    self.stage = Stage::Length;
                }
            }
            Stage::Length => {
                if usize::from(byte) > MAX_PAYLOAD_SIZE {
                    self.reset();
                    return Err(FrameError::InvalidFrame);
                }
                self.crc = crc8(&[byte]);
                self.stage = Stage::Type { len: byte };
            }
            Stage::Type { len } => {
                self.msg_type = byte;
                self.crc = crc8_update(self.crc, &[byte]);
                self.stage = if len == 0 {
                    Stage::Crc
                } else {
                    Stage::Payload { len }
                };
            }
            Stage::Payload { len } => {
                // Bounded by the length check
                let _ = self.payload.push(byte);
                self.crc = crc8_update(self.crc, &[byte]);
                if self.payload.len() == usize::from(len) {
                    self.stage = Stage::Crc;
                }
            }
            Stage::Crc => {
                let valid = byte == self.crc;
                let frame = Frame {
                    msg_type: self.msg_type,
                    payload: core::mem::take(&mut self.payload),
                };
                self.reset();
                return if valid {
                    Ok(Some(frame))
                } else {
                    Err(FrameError::InvalidChecksum)
                };
            }
        }
        Ok(None)
    }

    /// Feed bytes until the first complete frame
    ///
    /// Bytes after that frame are left unread.
    pub fn feed_bytes(&mut self, bytes: &[u8]) -> Result<Option<Frame>, FrameError> {
        for &byte in bytes {
            if let Some(frame) = self.feed(byte)? {
                return Ok(Some(frame));
            }
        }
        Ok(None)
    }
}
