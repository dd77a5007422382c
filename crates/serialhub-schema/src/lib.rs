//! Field schemas and record decoding for serialhub frames.
//!
//! A schema is an ordered list of named byte ranges. Decoding a frame against
//! it yields a [`DecodedRecord`] of little-endian integers (or raw bytes for
//! wide fields) plus the stored and recomputed checksums. Which schema applies
//! to a frame is decided by a version key read from a fixed offset.

pub mod config;
pub mod decoder;
pub mod error;
pub mod field;
#[cfg(feature = "http")]
pub mod http;
pub mod record;
pub mod registry;
pub mod source;
pub mod validator;

pub use config::RegistryConfig;
pub use decoder::{checksum_with_fields, decode, field_value};
pub use error::{Result, SchemaError};
pub use field::{FieldDescriptor, Schema};
#[cfg(feature = "http")]
pub use http::{HttpSource, HttpSourceBuilder, DEFAULT_HTTP_TIMEOUT, VERSION_PLACEHOLDER};
pub use record::{DecodedRecord, FieldValue, CALCULATED_HASH, DESIRED_HASH};
pub use registry::{SchemaRegistry, VersionLocator, VersionedRecord};
pub use source::{DirectorySource, EmbeddedSource, SchemaSource};
pub use validator::DocumentValidator;
