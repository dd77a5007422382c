//! CRC-32 (IEEE) integrity checks.
//!
//! Frames carry a little-endian CRC-32 in their last [`CHECKSUM_LEN`] bytes.
//! The stored value covers `frame[1..len - 4]` after selected byte ranges
//! (and the trailer itself) have been zero-filled. Byte 0 is never hashed.

use std::ops::RangeInclusive;

use crate::error::{FrameError, Result};

/// Width of the checksum trailer.
pub const CHECKSUM_LEN: usize = 4;

/// Smallest frame that has a hashed region: one leading byte plus the trailer.
pub const MIN_CHECKSUM_FRAME: usize = 1 + CHECKSUM_LEN;

/// Empty zero-fill mask.
pub const NO_MASK: [RangeInclusive<usize>; 0] = [];

/// Plain CRC-32 over `data`.
pub fn checksum(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

/// CRC-32 over `data[1..len - 4]` after zero-filling every range in `mask`
/// and the trailer.
///
/// Ranges are inclusive byte indices. The input is not modified.
pub fn checksum_with_mask<I>(data: &[u8], mask: I) -> Result<u32>
where
    I: IntoIterator<Item = RangeInclusive<usize>>,
{
    let len = data.len();
    if len < MIN_CHECKSUM_FRAME {
        return Err(FrameError::ChecksumWindow { len });
    }

    let mut masked = data.to_vec();
    for range in mask {
        let (start, end) = (*range.start(), *range.end());
        if start > end || end >= len {
            return Err(FrameError::InvalidMaskRange { start, end, len });
        }
        masked[start..=end].fill(0);
    }
    masked[len - CHECKSUM_LEN..].fill(0);

    Ok(checksum(&masked[1..len - CHECKSUM_LEN]))
}

/// Read the little-endian trailer of `frame`.
pub fn stored_checksum(frame: &[u8]) -> Result<u32> {
    let len = frame.len();
    if len < MIN_CHECKSUM_FRAME {
        return Err(FrameError::ChecksumWindow { len });
    }
    let mut trailer = [0u8; CHECKSUM_LEN];
    trailer.copy_from_slice(&frame[len - CHECKSUM_LEN..]);
    Ok(u32::from_le_bytes(trailer))
}

/// Overwrite the trailer of `frame` with the masked checksum of its contents.
pub fn seal<I>(frame: &mut [u8], mask: I) -> Result<u32>
where
    I: IntoIterator<Item = RangeInclusive<usize>>,
{
    let crc = checksum_with_mask(frame, mask)?;
    let len = frame.len();
    frame[len - CHECKSUM_LEN..].copy_from_slice(&crc.to_le_bytes());
    Ok(crc)
}
