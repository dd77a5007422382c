//! Consistent overhead byte stuffing with a configurable delimiter.
//!
//! Block layout: a length byte `L` followed by `L - 1` literal bytes. Every
//! block shorter than 255 stands for its literals followed by one delimiter,
//! except the final block. A run of 254 literals is emitted as a 255 block that
//! chains straight into the next one with no implied delimiter.
//!
//! ```text
//! payload  : 11 CF 22 33          (delimiter 0xCF)
//! encoded  : 02 11 03 22 33 CF
//!            ^^    ^^       ^^ terminator
//! ```

use bytes::{BufMut, BytesMut};

use crate::error::{FrameError, Result};

/// Largest block length byte.
pub const MAX_BLOCK: u8 = 0xFF;

/// Worst-case encoded length for a payload of `len` bytes, terminator included.
pub const fn max_encoded_len(len: usize) -> usize {
    len + len / 254 + 2
}

/// Stuff `payload` so that `delimiter` only appears as the final byte.
pub fn encode(payload: &[u8], delimiter: u8) -> BytesMut {
    let mut out = BytesMut::with_capacity(max_encoded_len(payload.len()));
    encode_into(payload, delimiter, &mut out);
    out
}

/// Stuff `payload` onto the end of `dst`.
pub fn encode_into(payload: &[u8], delimiter: u8, dst: &mut BytesMut) {
    dst.reserve(max_encoded_len(payload.len()));

    let mut code_index = dst.len();
    let mut code: u8 = 1;
    dst.put_u8(0);

    for &byte in payload {
        if byte == delimiter {
            dst[code_index] = code;
            code_index = dst.len();
            dst.put_u8(0);
            code = 1;
            continue;
        }

        dst.put_u8(byte);
        code += 1;
        if code == MAX_BLOCK {
            dst[code_index] = code;
            code_index = dst.len();
            dst.put_u8(0);
            code = 1;
        }
    }

    dst[code_index] = code;
    dst.put_u8(delimiter);
}

/// Reverse [`encode`].
///
/// Accepts the encoding with or without its terminating delimiter; a single
/// trailing delimiter byte is dropped before blocks are read. Fails with
/// `EmptyInput` on no input, `ZeroLength` on a zero length byte and
/// `TruncatedFrame` when a block runs past the end.
pub fn decode(encoded: &[u8], delimiter: u8) -> Result<BytesMut> {
    if encoded.is_empty() {
        return Err(FrameError::EmptyInput);
    }

    let body = match encoded.split_last() {
        Some((&last, rest)) if last == delimiter => rest,
        _ => encoded,
    };

    let mut out = BytesMut::with_capacity(body.len());
    let mut index = 0usize;

    while index < body.len() {
        let length = body[index] as usize;
        if length == 0 {
            return Err(FrameError::ZeroLength { offset: index });
        }

        let next = index + length;
        if next > body.len() {
            return Err(FrameError::TruncatedFrame {
                offset: index,
                length,
                remaining: body.len() - index,
            });
        }

        out.put_slice(&body[index + 1..next]);
        if length < MAX_BLOCK as usize && next < body.len() {
            out.put_u8(delimiter);
        }

        index = next;
    }

    Ok(out)
}
