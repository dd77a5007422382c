use std::collections::btree_map;
use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// Record key holding the checksum read from the frame trailer.
pub const DESIRED_HASH: &str = "DesiredHash";

/// Record key holding the checksum recomputed over the masked frame.
pub const CALCULATED_HASH: &str = "CalculatedHash";

/// One decoded field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Little-endian value of a 1 to 4 byte field.
    Integer(u32),
    /// Raw bytes of a wider field.
    Bytes(Vec<u8>),
}

impl FieldValue {
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Self::Integer(value) => Some(*value),
            Self::Bytes(_) => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Integer(_) => None,
            Self::Bytes(bytes) => Some(bytes),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(value) => write!(f, "{value}"),
            Self::Bytes(bytes) => {
                for byte in bytes {
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
        }
    }
}

/// Field values of one frame plus its stored and recomputed checksums.
///
/// The two checksums are also present as [`DESIRED_HASH`] and
/// [`CALCULATED_HASH`] entries and replace schema fields with those names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DecodedRecord {
    values: BTreeMap<String, FieldValue>,
    #[serde(skip)]
    desired_hash: u32,
    #[serde(skip)]
    calculated_hash: u32,
}

impl DecodedRecord {
    pub(crate) fn new(
        mut values: BTreeMap<String, FieldValue>,
        desired_hash: u32,
        calculated_hash: u32,
    ) -> Self {
        values.insert(DESIRED_HASH.to_string(), FieldValue::Integer(desired_hash));
        values.insert(
            CALCULATED_HASH.to_string(),
            FieldValue::Integer(calculated_hash),
        );
        Self {
            values,
            desired_hash,
            calculated_hash,
        }
    }

    /// Checksum stored in the frame trailer.
    pub fn desired_hash(&self) -> u32 {
        self.desired_hash
    }

    /// Checksum recomputed with zero-filled fields masked.
    pub fn calculated_hash(&self) -> u32 {
        self.calculated_hash
    }

    /// True when the stored and recomputed checksums agree.
    pub fn is_hash_valid(&self) -> bool {
        self.desired_hash == self.calculated_hash
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.values.get(name)
    }

    /// Integer value of `name`, if present and integral.
    pub fn get_u32(&self, name: &str) -> Option<u32> {
        self.get(name).and_then(FieldValue::as_u32)
    }

    /// Entries in key order, checksums included.
    pub fn iter(&self) -> btree_map::Iter<'_, String, FieldValue> {
        self.values.iter()
    }

    /// Number of entries, checksums included.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<'a> IntoIterator for &'a DecodedRecord {
    type Item = (&'a String, &'a FieldValue);
    type IntoIter = btree_map::Iter<'a, String, FieldValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_entries_are_inserted() {
        let record = DecodedRecord::new(BTreeMap::new(), 7, 7);
        assert_eq!(record.len(), 2);
        assert_eq!(record.get_u32(DESIRED_HASH), Some(7));
        assert_eq!(record.get_u32(CALCULATED_HASH), Some(7));
        assert!(record.is_hash_valid());
    }

    #[test]
    fn reserved_entries_override_fields() {
        let mut values = BTreeMap::new();
        values.insert(DESIRED_HASH.to_string(), FieldValue::Integer(1));
        let record = DecodedRecord::new(values, 2, 3);
        assert_eq!(record.get_u32(DESIRED_HASH), Some(2));
        assert!(!record.is_hash_valid());
    }

    #[test]
    fn serializes_as_flat_object() {
        let mut values = BTreeMap::new();
        values.insert("A".to_string(), FieldValue::Integer(0x1234));
        values.insert("Blob".to_string(), FieldValue::Bytes(vec![1, 2, 3, 4, 5]));
        let record = DecodedRecord::new(values, 10, 11);

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "A": 4660,
                "Blob": [1, 2, 3, 4, 5],
                "CalculatedHash": 11,
                "DesiredHash": 10
            })
        );
    }

    #[test]
    fn value_display() {
        assert_eq!(FieldValue::Integer(42).to_string(), "42");
        assert_eq!(FieldValue::Bytes(vec![0x0a, 0xff]).to_string(), "0aff");
        assert_eq!(FieldValue::Bytes(vec![1]).as_bytes(), Some(&[1u8][..]));
        assert_eq!(FieldValue::Integer(1).as_bytes(), None);
    }
}
