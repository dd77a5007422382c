//! Streaming frame engine for byte-stuffed serial links.
//!
//! Every message on the wire is:
//! - `message_size` bytes of fields, the last 4 holding a little-endian CRC-32
//! - byte-stuffed so the delimiter never appears inside the frame
//! - terminated by the delimiter
//!
//! The [`FrameScanner`] recovers frame boundaries from a raw stream held in a
//! [`RingBuffer`], dropping anything that does not line up with the expected
//! packet size.

#[cfg(feature = "async")]
pub mod async_codec;
pub mod checksum;
pub mod cobs;
pub mod codec;
pub mod error;
pub mod reader;
pub mod ring;
pub mod scanner;
pub mod writer;

#[cfg(feature = "async")]
pub use async_codec::MessageCodec;
pub use checksum::{
    checksum, checksum_with_mask, seal, stored_checksum, CHECKSUM_LEN, MIN_CHECKSUM_FRAME, NO_MASK,
};
pub use codec::{FrameLayout, MAX_MESSAGE_SIZE, MIN_MESSAGE_SIZE};
pub use error::{FrameError, Result};
pub use reader::{FrameReader, DEFAULT_DATA_BUFFER_SIZE, DEFAULT_READ_BUFFER_SIZE};
pub use ring::RingBuffer;
pub use scanner::{FrameScanner, ScanEvent, ScanWarning};
pub use writer::{FrameWriter, WriteOutcome};
