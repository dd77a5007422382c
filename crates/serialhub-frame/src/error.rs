/// Errors that can occur while buffering, stuffing or checksumming frames.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// Decoding was asked to process zero bytes.
    #[error("encoded data is empty")]
    EmptyInput,

    /// A stuffing block declared a length of zero.
    #[error("zero length byte at offset {offset}")]
    ZeroLength { offset: usize },

    /// A stuffing block declared more bytes than remain in the input.
    #[error("block at offset {offset} declares {length} bytes but only {remaining} remain")]
    TruncatedFrame {
        offset: usize,
        length: usize,
        remaining: usize,
    },

    /// The ring buffer has no free slot.
    #[error("ring buffer full (capacity {capacity})")]
    BufferFull { capacity: usize },

    /// The ring buffer holds no element.
    #[error("ring buffer empty")]
    BufferEmpty,

    /// An unstuffed frame does not have the configured message size.
    #[error("decoded message size {actual} does not match expected {expected}")]
    SizeMismatch { expected: usize, actual: usize },

    /// A command payload does not fit in a message.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The frame layout parameters are out of bounds.
    #[error("invalid frame layout: {0}")]
    InvalidLayout(String),

    /// The data is too short to carry a leading byte and a checksum trailer.
    #[error("data too short for checksum window ({len} bytes, need at least 5)")]
    ChecksumWindow { len: usize },

    /// A zero-fill range falls outside the data.
    #[error("mask range {start}..={end} outside data of {len} bytes")]
    InvalidMaskRange { start: usize, end: usize, len: usize },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream ended.
    #[error("connection closed")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, FrameError>;
