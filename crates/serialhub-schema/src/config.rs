/// Controls how schema documents are loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryConfig {
    /// When true, schema documents with unknown keys are rejected.
    pub strict_mode: bool,
    /// Maximum bytes allowed per schema file.
    pub max_schema_file_size: usize,
    /// When true, each version key is loaded from its source once.
    pub cache_schemas: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            strict_mode: false,
            max_schema_file_size: 256 * 1024,
            cache_schemas: true,
        }
    }
}
