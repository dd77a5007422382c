use std::fmt::Write;

use crate::exit::{CliError, CliResult, USAGE};

/// Lowercase hex, no separators.
pub fn encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

/// Parse hex text. Whitespace, `:` and `-` separators and a leading `0x` are ignored.
pub fn decode(text: &str) -> CliResult<Vec<u8>> {
    let trimmed = text.trim();
    let body = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    let digits: Vec<u8> = body
        .bytes()
        .filter(|b| !b.is_ascii_whitespace() && *b != b':' && *b != b'-')
        .collect();

    if digits.len() % 2 != 0 {
        return Err(CliError::new(
            USAGE,
            format!("hex input has odd length ({} digits)", digits.len()),
        ));
    }

    digits
        .chunks_exact(2)
        .map(|pair| -> CliResult<u8> { Ok((nibble(pair[0])? << 4) | nibble(pair[1])?) })
        .collect()
}

fn nibble(digit: u8) -> CliResult<u8> {
    match digit {
        b'0'..=b'9' => Ok(digit - b'0'),
        b'a'..=b'f' => Ok(digit - b'a' + 10),
        b'A'..=b'F' => Ok(digit - b'A' + 10),
        other => Err(CliError::new(
            USAGE,
            format!("invalid hex digit {:?}", other as char),
        )),
    }
}

/// Parse a byte given as decimal or `0x` hex.
pub fn parse_byte(text: &str) -> Result<u8, String> {
    let text = text.trim();
    let parsed = match text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
    {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => text.parse(),
    };
    parsed.map_err(|_| format!("expected a byte (0-255 or 0x00-0xFF), got {text:?}"))
}
