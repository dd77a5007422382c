use serialhub_frame::{checksum_with_mask, stored_checksum, NO_MASK};
use serialhub_schema::{
    decode, DirectorySource, DocumentValidator, RegistryConfig, Schema, SchemaRegistry,
    VersionLocator,
};

use crate::cmd::SchemaArgs;
use crate::exit::{io_error, schema_error, CliResult};
use crate::output::{print_message, print_record, OutputFormat};

/// Turns unstuffed messages into printed records.
pub enum RecordDecoder {
    /// No schema configured: print the message bytes.
    Raw,
    /// One schema for every message.
    Single(Schema),
    /// Schema chosen per message by its version key.
    Registry(SchemaRegistry<DirectorySource>),
}

impl RecordDecoder {
    pub fn from_args(args: &SchemaArgs) -> CliResult<Self> {
        let config = RegistryConfig {
            strict_mode: args.strict,
            ..RegistryConfig::default()
        };

        if let Some(path) = &args.schema {
            let text = std::fs::read_to_string(path)
                .map_err(|err| io_error(&format!("failed reading {}", path.display()), err))?;
            let schema = DocumentValidator::new(config.strict_mode)
                .and_then(|validator| validator.parse(&text))
                .map_err(|err| schema_error("invalid schema document", err))?;
            return Ok(Self::Single(schema));
        }

        if let Some(dir) = &args.schemas {
            let locator = VersionLocator::new(args.version_start, args.version_end)
                .map_err(|err| schema_error("invalid version range", err))?;
            let source = DirectorySource::with_config(dir, config)
                .map_err(|err| schema_error("schema directory unusable", err))?;
            return Ok(Self::Registry(SchemaRegistry::with_config(
                source, locator, config,
            )));
        }

        Ok(Self::Raw)
    }

    /// Decode and print `message`. Returns whether its checksum matched.
    pub fn render(&mut self, message: &[u8], format: OutputFormat) -> CliResult<bool> {
        match self {
            Self::Raw => {
                print_message(message, format);
                Ok(raw_hash_valid(message))
            }
            Self::Single(schema) => {
                let record = decode(message, schema)
                    .map_err(|err| schema_error("record decode failed", err))?;
                print_record(None, &record, format);
                Ok(record.is_hash_valid())
            }
            Self::Registry(registry) => {
                let decoded = registry
                    .decode_frame(message)
                    .map_err(|err| schema_error("record decode failed", err))?;
                print_record(Some(decoded.version), &decoded.record, format);
                Ok(decoded.record.is_hash_valid())
            }
        }
    }
}

fn raw_hash_valid(message: &[u8]) -> bool {
    match (stored_checksum(message), checksum_with_mask(message, NO_MASK)) {
        (Ok(desired), Ok(calculated)) => desired == calculated,
        _ => false,
    }
}
