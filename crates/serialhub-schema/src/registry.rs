use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::config::RegistryConfig;
use crate::decoder::decode;
use crate::error::{Result, SchemaError};
use crate::field::{FieldDescriptor, Schema};
use crate::record::DecodedRecord;
use crate::source::SchemaSource;

/// Where the version key sits inside every decoded frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionLocator {
    pub start_idx: usize,
    pub end_idx: usize,
}

impl VersionLocator {
    /// Key spans `start_idx..=end_idx`, at most 4 bytes.
    pub fn new(start_idx: usize, end_idx: usize) -> Result<Self> {
        if start_idx > end_idx || end_idx - start_idx >= 4 {
            return Err(SchemaError::InvalidFieldRange {
                field: "version".to_string(),
                start: start_idx,
                end: end_idx,
                len: 4,
            });
        }
        Ok(Self { start_idx, end_idx })
    }

    /// Read the little-endian version key from `frame`.
    pub fn locate(&self, frame: &[u8]) -> Result<u32> {
        let field = FieldDescriptor::new("version", self.start_idx, self.end_idx);
        field.check_bounds(frame.len())?;
        let mut widened = [0u8; 4];
        let bytes = &frame[field.range()];
        widened[..bytes.len()].copy_from_slice(bytes);
        Ok(u32::from_le_bytes(widened))
    }
}

/// A record together with the version key its schema was chosen by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedRecord {
    pub version: u32,
    pub record: DecodedRecord,
}

/// Version-keyed schema lookup over a [`SchemaSource`].
pub struct SchemaRegistry<S> {
    source: S,
    locator: VersionLocator,
    config: RegistryConfig,
    cache: HashMap<u32, Arc<Schema>>,
}

impl<S: SchemaSource> SchemaRegistry<S> {
    pub fn new(source: S, locator: VersionLocator) -> Self {
        Self::with_config(source, locator, RegistryConfig::default())
    }

    pub fn with_config(source: S, locator: VersionLocator, config: RegistryConfig) -> Self {
        Self {
            source,
            locator,
            config,
            cache: HashMap::new(),
        }
    }

    /// Schema for `key`, from cache when enabled.
    pub fn schema(&mut self, key: u32) -> Result<Arc<Schema>> {
        if let Some(schema) = self.cache.get(&key) {
            return Ok(Arc::clone(schema));
        }

        let schema = Arc::new(self.source.load(key)?);
        if self.config.cache_schemas {
            debug!(key, "caching schema");
            self.cache.insert(key, Arc::clone(&schema));
        }
        Ok(schema)
    }

    /// Locate the version key, load its schema and decode `frame`.
    pub fn decode_frame(&mut self, frame: &[u8]) -> Result<VersionedRecord> {
        let version = self.locator.locate(frame)?;
        let schema = self.schema(version)?;
        let record = decode(frame, &schema)?;
        Ok(VersionedRecord { version, record })
    }

    /// Version keys currently cached, ascending.
    pub fn cached_versions(&self) -> Vec<u32> {
        let mut keys: Vec<u32> = self.cache.keys().copied().collect();
        keys.sort_unstable();
        keys
    }

    /// Forget cached schemas so the next lookup hits the source again.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    pub fn locator(&self) -> VersionLocator {
        self.locator
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use serialhub_frame::{seal, NO_MASK};

    use super::*;
    use crate::source::EmbeddedSource;

    const V258: &str = r#"{
        "fields": [
            { "name": "Version", "startIdx": 7, "endIdx": 8 },
            { "name": "Temp", "startIdx": 9, "endIdx": 10 }
        ]
    }"#;

    fn frame_with_version(version: u16) -> Vec<u8> {
        let mut frame = vec![0u8; 20];
        frame[7..9].copy_from_slice(&version.to_le_bytes());
        frame[9..11].copy_from_slice(&[0x2C, 0x01]);
        seal(&mut frame, NO_MASK).unwrap();
        frame
    }

    struct CountingSource {
        inner: EmbeddedSource,
        loads: Cell<usize>,
    }

    impl SchemaSource for CountingSource {
        fn load(&self, key: u32) -> Result<Schema> {
            self.loads.set(self.loads.get() + 1);
            self.inner.load(key)
        }
    }

    fn counting() -> CountingSource {
        CountingSource {
            inner: EmbeddedSource::from_documents(&[(258, V258)]).unwrap(),
            loads: Cell::new(0),
        }
    }

    #[test]
    fn locator_reads_little_endian_key() {
        let locator = VersionLocator::new(7, 8).unwrap();
        assert_eq!(locator.locate(&frame_with_version(0x0102)).unwrap(), 0x0102);
        assert!(matches!(
            locator.locate(&[0u8; 8]),
            Err(SchemaError::InvalidFieldRange { .. })
        ));
    }

    #[test]
    fn locator_rejects_wide_or_reversed_ranges() {
        assert!(VersionLocator::new(0, 3).is_ok());
        assert!(VersionLocator::new(0, 4).is_err());
        assert!(VersionLocator::new(5, 4).is_err());
    }

    #[test]
    fn decode_frame_selects_schema_by_version() {
        let mut registry = SchemaRegistry::new(counting(), VersionLocator::new(7, 8).unwrap());
        let decoded = registry.decode_frame(&frame_with_version(258)).unwrap();

        assert_eq!(decoded.version, 258);
        assert_eq!(decoded.record.get_u32("Version"), Some(258));
        assert_eq!(decoded.record.get_u32("Temp"), Some(300));
        assert!(decoded.record.is_hash_valid());
    }

    #[test]
    fn unknown_version_is_error() {
        let mut registry = SchemaRegistry::new(counting(), VersionLocator::new(7, 8).unwrap());
        assert!(matches!(
            registry.decode_frame(&frame_with_version(7)),
            Err(SchemaError::UnknownVersion(7))
        ));
    }

    #[test]
    fn schemas_are_cached() {
        let mut registry = SchemaRegistry::new(counting(), VersionLocator::new(7, 8).unwrap());
        registry.decode_frame(&frame_with_version(258)).unwrap();
        registry.decode_frame(&frame_with_version(258)).unwrap();
        assert_eq!(registry.source().loads.get(), 1);
        assert_eq!(registry.cached_versions(), vec![258]);

        registry.clear_cache();
        registry.decode_frame(&frame_with_version(258)).unwrap();
        assert_eq!(registry.source().loads.get(), 2);
    }

    #[test]
    fn cache_can_be_disabled() {
        let config = RegistryConfig {
            cache_schemas: false,
            ..RegistryConfig::default()
        };
        let mut registry =
            SchemaRegistry::with_config(counting(), VersionLocator::new(7, 8).unwrap(), config);
        registry.decode_frame(&frame_with_version(258)).unwrap();
        registry.decode_frame(&frame_with_version(258)).unwrap();
        assert_eq!(registry.source().loads.get(), 2);
        assert!(registry.cached_versions().is_empty());
        assert_eq!(registry.config(), &config);
    }
}
