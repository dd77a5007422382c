//! Shape checking of schema documents.
//!
//! A schema document is `{"fields": [{name?, startIdx, endIdx, zerofill?}]}`.
//! Documents are checked against an embedded JSON Schema before they are
//! deserialized, so malformed files fail with a readable message.

use jsonschema::Validator;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{Result, SchemaError};
use crate::field::{FieldDescriptor, Schema};

const DOCUMENT_SCHEMA: &str = r#"{
    "type": "object",
    "properties": {
        "fields": {
            "type": "array",
            "items": {
                "type": "object",
                "properties": {
                    "name": { "type": "string" },
                    "startIdx": { "type": "integer", "minimum": 0 },
                    "endIdx": { "type": "integer", "minimum": 0 },
                    "zerofill": { "type": "boolean" }
                },
                "required": ["startIdx", "endIdx"]
            }
        }
    },
    "required": ["fields"]
}"#;

#[derive(Deserialize)]
struct Document {
    fields: Vec<FieldDescriptor>,
}

/// Compiled checker for schema documents.
pub struct DocumentValidator {
    validator: Validator,
}

impl DocumentValidator {
    /// Compile the document checker. In strict mode unknown keys are rejected.
    pub fn new(strict_mode: bool) -> Result<Self> {
        let mut schema: Value = serde_json::from_str(DOCUMENT_SCHEMA)?;
        if strict_mode {
            apply_strict_mode(&mut schema);
        }
        let validator = jsonschema::validator_for(&schema)
            .map_err(|err| SchemaError::InvalidDocument(err.to_string()))?;
        Ok(Self { validator })
    }

    /// Parse and check a document.
    pub fn parse(&self, text: &str) -> Result<Schema> {
        let value: Value = serde_json::from_str(text)?;
        self.parse_value(value)
    }

    /// Check an already parsed document.
    pub fn parse_value(&self, value: Value) -> Result<Schema> {
        let mut errors = self.validator.iter_errors(&value);
        if let Some(first) = errors.next() {
            let mut message = first.to_string();
            for err in errors.take(3) {
                message.push_str("; ");
                message.push_str(&err.to_string());
            }
            return Err(SchemaError::InvalidDocument(message));
        }
        drop(errors);

        let document: Document = serde_json::from_value(value)?;
        Ok(Schema::new(document.fields))
    }
}

impl std::fmt::Debug for DocumentValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentValidator").finish_non_exhaustive()
    }
}

fn apply_strict_mode(value: &mut Value) {
    if let Value::Object(map) = value {
        if map.get("type") == Some(&Value::String("object".to_string()))
            && !map.contains_key("additionalProperties")
        {
            map.insert("additionalProperties".to_string(), Value::Bool(false));
        }
        recurse_children(map);
    }
}

fn recurse_children(map: &mut Map<String, Value>) {
    if let Some(Value::Object(properties)) = map.get_mut("properties") {
        for value in properties.values_mut() {
            apply_strict_mode(value);
        }
    }
    if let Some(items) = map.get_mut("items") {
        apply_strict_mode(items);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"{
        "fields": [
            { "name": "Version", "startIdx": 7, "endIdx": 8 },
            { "startIdx": 9, "endIdx": 10 },
            { "name": "Seq", "startIdx": 11, "endIdx": 11, "zerofill": true }
        ]
    }"#;

    #[test]
    fn parses_valid_document() {
        let schema = DocumentValidator::new(false).unwrap().parse(DOC).unwrap();
        assert_eq!(schema.len(), 3);
        assert_eq!(schema.fields()[0], FieldDescriptor::new("Version", 7, 8));
        assert!(!schema.fields()[1].is_named());
        assert!(schema.fields()[2].zerofill);
    }

    #[test]
    fn missing_fields_key_rejected() {
        let err = DocumentValidator::new(false)
            .unwrap()
            .parse(r#"{"items": []}"#)
            .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidDocument(_)));
    }

    #[test]
    fn wrong_types_rejected() {
        let validator = DocumentValidator::new(false).unwrap();
        for doc in [
            r#"{"fields": [{"startIdx": -1, "endIdx": 2}]}"#,
            r#"{"fields": [{"startIdx": "0", "endIdx": 2}]}"#,
            r#"{"fields": [{"name": 3, "startIdx": 0, "endIdx": 2}]}"#,
            r#"{"fields": [{"startIdx": 0}]}"#,
            r#"{"fields": {}}"#,
        ] {
            assert!(
                matches!(validator.parse(doc), Err(SchemaError::InvalidDocument(_))),
                "accepted {doc}"
            );
        }
    }

    #[test]
    fn not_json_rejected() {
        let err = DocumentValidator::new(false)
            .unwrap()
            .parse("fields:")
            .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidJson(_)));
    }

    #[test]
    fn strict_mode_rejects_unknown_keys() {
        let doc = r#"{"fields": [{"name": "A", "startIdx": 0, "endIdx": 1, "unit": "C"}]}"#;
        assert!(DocumentValidator::new(false).unwrap().parse(doc).is_ok());
        assert!(matches!(
            DocumentValidator::new(true).unwrap().parse(doc),
            Err(SchemaError::InvalidDocument(_))
        ));

        let doc = r#"{"fields": [], "comment": "x"}"#;
        assert!(DocumentValidator::new(true).unwrap().parse(doc).is_err());
    }
}
