use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::RegistryConfig;
use crate::error::{Result, SchemaError};
use crate::field::Schema;
use crate::validator::DocumentValidator;

/// Supplies the schema for a version key.
pub trait SchemaSource {
    fn load(&self, key: u32) -> Result<Schema>;
}

impl<S: SchemaSource + ?Sized> SchemaSource for &S {
    fn load(&self, key: u32) -> Result<Schema> {
        (**self).load(key)
    }
}

impl<S: SchemaSource + ?Sized> SchemaSource for Box<S> {
    fn load(&self, key: u32) -> Result<Schema> {
        (**self).load(key)
    }
}

/// Loads `<dir>/<key>.json` documents.
#[derive(Debug)]
pub struct DirectorySource {
    dir: PathBuf,
    validator: DocumentValidator,
    max_file_size: usize,
}

impl DirectorySource {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        Self::with_config(dir, RegistryConfig::default())
    }

    pub fn with_config(dir: impl Into<PathBuf>, config: RegistryConfig) -> Result<Self> {
        Ok(Self {
            dir: dir.into(),
            validator: DocumentValidator::new(config.strict_mode)?,
            max_file_size: config.max_schema_file_size,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path the document for `key` is read from.
    pub fn path_for(&self, key: u32) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    fn read_document(&self, path: &Path) -> Result<String> {
        let file_name = path.display();
        let path_metadata = std::fs::symlink_metadata(path)
            .map_err(|err| SchemaError::LoadFailed(format!("{file_name}: {err}")))?;
        let file_type = path_metadata.file_type();
        if file_type.is_symlink() {
            return Err(SchemaError::LoadFailed(format!(
                "refusing to load schema symlink: {file_name}"
            )));
        }
        if !file_type.is_file() {
            return Err(SchemaError::LoadFailed(format!(
                "not a regular file: {file_name}"
            )));
        }

        let file = std::fs::File::open(path).map_err(|err| {
            SchemaError::LoadFailed(format!("failed opening schema {file_name}: {err}"))
        })?;
        let opened_metadata = file
            .metadata()
            .map_err(|err| SchemaError::LoadFailed(err.to_string()))?;

        #[cfg(unix)]
        {
            if !same_file_identity(&path_metadata, &opened_metadata) {
                return Err(SchemaError::LoadFailed(format!(
                    "schema file changed during load: {file_name}"
                )));
            }
        }

        if opened_metadata.len() > self.max_file_size as u64 {
            return Err(SchemaError::LoadFailed(format!(
                "schema file too large ({} bytes): {file_name}",
                opened_metadata.len()
            )));
        }

        let read_limit = u64::try_from(self.max_file_size.saturating_add(1)).unwrap_or(u64::MAX);
        let mut content = String::new();
        file.take(read_limit)
            .read_to_string(&mut content)
            .map_err(|err| {
                SchemaError::LoadFailed(format!("failed reading schema {file_name}: {err}"))
            })?;
        if content.len() > self.max_file_size {
            return Err(SchemaError::LoadFailed(format!(
                "schema file too large while reading: {file_name}"
            )));
        }
        Ok(content)
    }
}

impl SchemaSource for DirectorySource {
    fn load(&self, key: u32) -> Result<Schema> {
        let path = self.path_for(key);
        if !path.exists() {
            return Err(SchemaError::UnknownVersion(key));
        }
        let content = self.read_document(&path)?;
        let schema = self.validator.parse(&content)?;
        debug!(key, path = %path.display(), fields = schema.len(), "loaded schema");
        Ok(schema)
    }
}

/// In-memory schemas, typically compiled into the binary.
#[derive(Debug, Clone, Default)]
pub struct EmbeddedSource {
    schemas: HashMap<u32, Schema>,
}

impl EmbeddedSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and add documents keyed by version.
    pub fn from_documents(documents: &[(u32, &str)]) -> Result<Self> {
        let validator = DocumentValidator::new(false)?;
        let mut source = Self::new();
        for (key, text) in documents {
            source.insert(*key, validator.parse(text)?);
        }
        Ok(source)
    }

    pub fn insert(&mut self, key: u32, schema: Schema) {
        self.schemas.insert(key, schema);
    }

    /// Known version keys, ascending.
    pub fn keys(&self) -> Vec<u32> {
        let mut keys: Vec<u32> = self.schemas.keys().copied().collect();
        keys.sort_unstable();
        keys
    }
}

impl SchemaSource for EmbeddedSource {
    fn load(&self, key: u32) -> Result<Schema> {
        self.schemas
            .get(&key)
            .cloned()
            .ok_or(SchemaError::UnknownVersion(key))
    }
}

#[cfg(unix)]
fn same_file_identity(
    path_metadata: &std::fs::Metadata,
    opened_metadata: &std::fs::Metadata,
) -> bool {
    use std::os::unix::fs::MetadataExt;
    path_metadata.dev() == opened_metadata.dev() && path_metadata.ino() == opened_metadata.ino()
}
