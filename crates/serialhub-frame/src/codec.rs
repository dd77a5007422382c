use bytes::{Bytes, BytesMut};

use crate::checksum::{seal, CHECKSUM_LEN, MIN_CHECKSUM_FRAME, NO_MASK};
use crate::cobs;
use crate::error::{FrameError, Result};

/// Largest message that stuffs with exactly one byte of overhead. A 254-byte
/// run of literals fills a 255 block and forces a second block, so the stuffed
/// frame would no longer be `message_size + 1` bytes.
pub const MAX_MESSAGE_SIZE: usize = 253;

/// Smallest message: a leading byte plus the checksum trailer.
pub const MIN_MESSAGE_SIZE: usize = MIN_CHECKSUM_FRAME;

/// Fixed frame geometry shared by both ends of the link.
///
/// Wire format of one frame:
/// ```text
/// ┌──────────────┬──────────────────────────────┬────────────┬───────────┐
/// │ Stuffing (1B)│ Fields (message_size - 4 B)  │ CRC32 LE 4B│ Delimiter │
/// └──────────────┴──────────────────────────────┴────────────┴───────────┘
///                 \________ message_size bytes once unstuffed ________/
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLayout {
    message_size: usize,
    delimiter: u8,
}

impl FrameLayout {
    /// Validate and build a layout.
    pub fn new(message_size: usize, delimiter: u8) -> Result<Self> {
        if !(MIN_MESSAGE_SIZE..=MAX_MESSAGE_SIZE).contains(&message_size) {
            return Err(FrameError::InvalidLayout(format!(
                "message size {message_size} outside {MIN_MESSAGE_SIZE}..={MAX_MESSAGE_SIZE}"
            )));
        }
        Ok(Self {
            message_size,
            delimiter,
        })
    }

    /// Unstuffed message length, checksum trailer included.
    pub fn message_size(&self) -> usize {
        self.message_size
    }

    /// Frame delimiter byte.
    pub fn delimiter(&self) -> u8 {
        self.delimiter
    }

    /// Stuffed frame length without the delimiter.
    pub fn packet_size(&self) -> usize {
        self.message_size + 1
    }

    /// Longest command payload that fits in front of the trailer.
    pub fn max_command_len(&self) -> usize {
        self.message_size - CHECKSUM_LEN
    }

    /// Build a ready-to-send command frame.
    ///
    /// `payload` is placed at offset 0 and zero padded to `message_size`; the
    /// trailer receives the unmasked checksum; the result is stuffed and
    /// terminated with the delimiter.
    pub fn encode_command(&self, payload: &[u8]) -> Result<Bytes> {
        let mut dst = BytesMut::with_capacity(cobs::max_encoded_len(self.message_size));
        self.encode_command_into(payload, &mut dst)?;
        Ok(dst.freeze())
    }

    /// Like [`encode_command`](Self::encode_command), appending to `dst`.
    pub fn encode_command_into(&self, payload: &[u8], dst: &mut BytesMut) -> Result<()> {
        if payload.len() > self.max_command_len() {
            return Err(FrameError::PayloadTooLarge {
                size: payload.len(),
                max: self.max_command_len(),
            });
        }

        let mut message = vec![0u8; self.message_size];
        message[..payload.len()].copy_from_slice(payload);
        seal(&mut message, NO_MASK)?;

        cobs::encode_into(&message, self.delimiter, dst);
        Ok(())
    }

    /// Unstuff a frame emitted by the scanner and check its size.
    pub fn decode_message(&self, frame: &[u8]) -> Result<Bytes> {
        let decoded = cobs::decode(frame, self.delimiter)?;
        if decoded.len() != self.message_size {
            return Err(FrameError::SizeMismatch {
                expected: self.message_size,
                actual: decoded.len(),
            });
        }
        Ok(decoded.freeze())
    }
}
