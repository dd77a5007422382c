use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SchemaError};

/// A named, inclusive byte range inside a decoded frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
    /// Empty names mark reserved or padding ranges that are not decoded.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    pub start_idx: usize,
    pub end_idx: usize,
    /// Mask this range to zero before computing the checksum.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub zerofill: bool,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, start_idx: usize, end_idx: usize) -> Self {
        Self {
            name: name.into(),
            start_idx,
            end_idx,
            zerofill: false,
        }
    }

    /// Mark the range as excluded from the checksum.
    pub fn zerofilled(mut self) -> Self {
        self.zerofill = true;
        self
    }

    pub fn is_named(&self) -> bool {
        !self.name.is_empty()
    }

    pub fn range(&self) -> RangeInclusive<usize> {
        self.start_idx..=self.end_idx
    }

    /// Check that the range lies inside a frame of `len` bytes.
    pub fn check_bounds(&self, len: usize) -> Result<()> {
        if self.start_idx > self.end_idx || self.end_idx >= len {
            return Err(SchemaError::InvalidFieldRange {
                field: self.name.clone(),
                start: self.start_idx,
                end: self.end_idx,
                len,
            });
        }
        Ok(())
    }
}

/// Ordered field list for one frame version. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    fields: Vec<FieldDescriptor>,
}

impl Schema {
    pub fn new(fields: Vec<FieldDescriptor>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Ranges zero-filled before checksumming.
    pub fn zerofill_ranges(&self) -> impl Iterator<Item = RangeInclusive<usize>> + '_ {
        self.fields
            .iter()
            .filter(|field| field.zerofill)
            .map(FieldDescriptor::range)
    }
}

impl From<Vec<FieldDescriptor>> for Schema {
    fn from(fields: Vec<FieldDescriptor>) -> Self {
        Self::new(fields)
    }
}
