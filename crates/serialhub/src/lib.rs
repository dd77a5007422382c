//! Framed serial links for telemetry devices.
//!
//! serialhub turns a raw serial byte stream into checksummed, schema-decoded
//! records: byte-stuffed frames with a configurable delimiter, a masked CRC-32
//! trailer, and field schemas selected by a version key inside each frame.
//!
//! # Crate Structure
//!
//! - [`transport`]: serial port abstraction and port enumeration
//! - [`frame`]: ring buffer, byte stuffing, checksums and the frame scanner
//! - [`schema`]: field schemas and record decoding (behind `schema` feature)
//! - [`link`]: threaded link driver with output queues (behind `link` feature)

/// Re-export transport types.
pub mod transport {
    pub use serialhub_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use serialhub_frame::*;
}

/// Re-export schema types (requires `schema` feature).
#[cfg(feature = "schema")]
pub mod schema {
    pub use serialhub_schema::*;
}

/// Re-export link driver types (requires `link` feature).
#[cfg(feature = "link")]
pub mod link {
    pub use serialhub_link::*;
}
