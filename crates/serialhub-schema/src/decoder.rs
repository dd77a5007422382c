use std::collections::BTreeMap;

use serialhub_frame::{checksum_with_mask, stored_checksum, MIN_CHECKSUM_FRAME};
use tracing::trace;

use crate::error::{Result, SchemaError};
use crate::field::{FieldDescriptor, Schema};
use crate::record::{DecodedRecord, FieldValue};

/// Decode `frame` into a record according to `schema`.
///
/// Named fields are range-checked and extracted; unnamed fields are skipped.
/// The record always carries both checksums. A mismatch between them is not
/// an error here.
pub fn decode(frame: &[u8], schema: &Schema) -> Result<DecodedRecord> {
    if frame.len() < MIN_CHECKSUM_FRAME {
        return Err(SchemaError::FrameTooShort { len: frame.len() });
    }

    let mut values = BTreeMap::new();
    for field in schema.fields().iter().filter(|f| f.is_named()) {
        field.check_bounds(frame.len())?;
        let value = field_value(&frame[field.range()]);
        values.insert(field.name.clone(), value);
    }

    let desired = stored_checksum(frame)?;
    let calculated = checksum_with_fields(frame, schema.fields())?;
    trace!(
        fields = values.len(),
        desired, calculated, "decoded record"
    );

    Ok(DecodedRecord::new(values, desired, calculated))
}

/// Masked checksum of `data`, zero-filling every `zerofill` field.
pub fn checksum_with_fields(data: &[u8], fields: &[FieldDescriptor]) -> Result<u32> {
    let mut mask = Vec::new();
    for field in fields.iter().filter(|f| f.zerofill) {
        field.check_bounds(data.len())?;
        mask.push(field.range());
    }
    Ok(checksum_with_mask(data, mask)?)
}

/// Interpret a field slice: 1 to 4 bytes little-endian, anything else raw.
pub fn field_value(bytes: &[u8]) -> FieldValue {
    match bytes.len() {
        1..=4 => {
            let mut widened = [0u8; 4];
            widened[..bytes.len()].copy_from_slice(bytes);
            FieldValue::Integer(u32::from_le_bytes(widened))
        }
        _ => FieldValue::Bytes(bytes.to_vec()),
    }
}

#[cfg(test)]
mod tests {
    use serialhub_frame::{checksum, seal, NO_MASK};

    use super::*;
    use crate::record::{CALCULATED_HASH, DESIRED_HASH};

    fn sealed(mut frame: Vec<u8>) -> Vec<u8> {
        seal(&mut frame, NO_MASK).unwrap();
        frame
    }

    #[test]
    fn two_byte_field_is_little_endian() {
        let frame = sealed(vec![0x34, 0x12, 0, 0, 0, 0, 0, 0, 0, 0]);
        let schema = Schema::new(vec![FieldDescriptor::new("X", 0, 1)]);
        let record = decode(&frame, &schema).unwrap();
        assert_eq!(record.get_u32("X"), Some(0x1234));
    }

    #[test]
    fn widths_map_to_values() {
        let frame = sealed(vec![
            0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A, 0x0B, 0x0C, 0, 0, 0, 0,
        ]);
        let schema = Schema::new(vec![
            FieldDescriptor::new("one", 0, 0),
            FieldDescriptor::new("three", 1, 3),
            FieldDescriptor::new("four", 4, 7),
            FieldDescriptor::new("wide", 7, 11),
        ]);
        let record = decode(&frame, &schema).unwrap();

        assert_eq!(record.get_u32("one"), Some(0x01));
        assert_eq!(record.get_u32("three"), Some(0x0004_0302));
        assert_eq!(record.get_u32("four"), Some(0x0807_0605));
        assert_eq!(
            record.get("wide"),
            Some(&FieldValue::Bytes(vec![0x08, 0x09, 0x0A, 0x0B, 0x0C]))
        );
    }

    #[test]
    fn unnamed_fields_are_skipped_even_when_out_of_range() {
        let frame = sealed(vec![0xAA; 8]);
        let schema = Schema::new(vec![
            FieldDescriptor::new("", 0, 100),
            FieldDescriptor::new("B", 1, 1),
        ]);
        let record = decode(&frame, &schema).unwrap();
        assert_eq!(record.len(), 3);
        assert!(record.get("").is_none());
    }

    #[test]
    fn out_of_range_named_field_is_error() {
        let frame = sealed(vec![0; 8]);
        let schema = Schema::new(vec![FieldDescriptor::new("Late", 6, 8)]);
        assert!(matches!(
            decode(&frame, &schema),
            Err(SchemaError::InvalidFieldRange { field, .. }) if field == "Late"
        ));

        let schema = Schema::new(vec![FieldDescriptor::new("Rev", 3, 1)]);
        assert!(matches!(
            decode(&frame, &schema),
            Err(SchemaError::InvalidFieldRange { .. })
        ));
    }

    #[test]
    fn hashes_match_for_sealed_frame() {
        let frame = sealed(vec![0x00, 0x10, 0x20, 0x30, 0x40, 0, 0, 0, 0]);
        let record = decode(&frame, &Schema::default()).unwrap();
        assert!(record.is_hash_valid());
        assert_eq!(record.desired_hash(), checksum(&[0x10, 0x20, 0x30, 0x40]));
        assert_eq!(record.get_u32(DESIRED_HASH), record.get_u32(CALCULATED_HASH));
    }

    #[test]
    fn corrupted_frame_still_decodes_with_mismatch() {
        let mut frame = sealed(vec![0x00, 0x10, 0x20, 0x30, 0x40, 0, 0, 0, 0]);
        frame[2] ^= 0xFF;
        let record = decode(&frame, &Schema::default()).unwrap();
        assert!(!record.is_hash_valid());
    }

    #[test]
    fn zerofill_fields_excluded_from_hash() {
        let schema = Schema::new(vec![
            FieldDescriptor::new("Counter", 2, 3).zerofilled(),
            FieldDescriptor::new("Value", 4, 5),
        ]);
        let mut frame = vec![0x00, 0x01, 0x00, 0x00, 0x07, 0x08, 0, 0, 0, 0];
        let crc = checksum_with_fields(&frame, schema.fields()).unwrap();
        frame[6..].copy_from_slice(&crc.to_le_bytes());

        frame[2] = 0xEE;
        frame[3] = 0xFF;
        let record = decode(&frame, &schema).unwrap();
        assert!(record.is_hash_valid());
        assert_eq!(record.get_u32("Counter"), Some(0xFFEE));
    }

    #[test]
    fn zerofill_range_outside_frame_is_error() {
        let frame = vec![0u8; 8];
        let fields = [FieldDescriptor::new("", 7, 9).zerofilled()];
        assert!(matches!(
            checksum_with_fields(&frame, &fields),
            Err(SchemaError::InvalidFieldRange { .. })
        ));
    }

    #[test]
    fn short_frame_is_error() {
        assert!(matches!(
            decode(&[1, 2, 3, 4], &Schema::default()),
            Err(SchemaError::FrameTooShort { len: 4 })
        ));
    }

    #[test]
    fn field_value_widths() {
        assert_eq!(field_value(&[0xFF]), FieldValue::Integer(0xFF));
        assert_eq!(field_value(&[0x01, 0x02, 0x03]), FieldValue::Integer(0x030201));
        assert_eq!(field_value(&[]), FieldValue::Bytes(Vec::new()));
        assert_eq!(field_value(&[0; 5]), FieldValue::Bytes(vec![0; 5]));
    }
}
