use serialhub_frame::FrameError;

/// Errors that can occur while loading schemas or decoding records.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// A field's byte range does not fit the frame.
    #[error("invalid index range for field {field:?}: {start}..={end} in frame of {len} bytes")]
    InvalidFieldRange {
        field: String,
        start: usize,
        end: usize,
        len: usize,
    },

    /// The frame cannot carry a checksum trailer.
    #[error("frame too short to decode ({len} bytes)")]
    FrameTooShort { len: usize },

    /// The schema document could not be loaded.
    #[error("failed to load schema: {0}")]
    LoadFailed(String),

    /// The schema document does not have the expected shape.
    #[error("invalid schema document: {0}")]
    InvalidDocument(String),

    /// The schema document is not valid JSON.
    #[error("schema document is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// No schema is known for the given version key.
    #[error("no schema for version {0}")]
    UnknownVersion(u32),

    /// Checksum computation failed.
    #[error(transparent)]
    Frame(#[from] FrameError),
}

pub type Result<T> = std::result::Result<T, SchemaError>;
