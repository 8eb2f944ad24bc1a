//! Modified UTF-8, the string encoding of the tag format.
//!
//! Differs from UTF-8 in two places: NUL is written as `C0 80`, and
//! characters outside the BMP are written as a surrogate pair, each half
//! encoded as a 3-byte sequence. Decoding also accepts plain 4-byte UTF-8,
//! which many writers emit.

use crate::error::{NbtError, Result};

/// Encode `s` as modified UTF-8.
pub fn encode(s: &str) -> Vec<u8> {
    if !needs_escaping(s) {
        return s.as_bytes().to_vec();
    }
    let mut out = Vec::with_capacity(s.len() + 8);
    for c in s.chars() {
        let cp = c as u32;
        match cp {
            0 => out.extend_from_slice(&[0xC0, 0x80]),
            0x01..=0x7F => out.push(cp as u8),
            0x80..=0x7FF => {
                out.push(0xC0 | (cp >> 6) as u8);
                out.push(0x80 | (cp & 0x3F) as u8);
            }
            0x800..=0xFFFF => push_unit(&mut out, cp as u16),
            _ => {
                let v = cp - 0x1_0000;
                push_unit(&mut out, 0xD800 | (v >> 10) as u16);
                push_unit(&mut out, 0xDC00 | (v & 0x3FF) as u16);
            }
        }
    }
    out
}

/// Number of bytes [`encode`] produces for `s`.
pub fn encoded_len(s: &str) -> usize {
    s.chars()
        .map(|c| match c as u32 {
            0 => 2,
            0x01..=0x7F => 1,
            0x80..=0x7FF => 2,
            0x800..=0xFFFF => 3,
            _ => 6,
        })
        .sum()
}

/// Decode modified (or plain) UTF-8 bytes.
pub fn decode(bytes: &[u8]) -> Result<String> {
    if let Ok(s) = std::str::from_utf8(bytes) {
        return Ok(s.to_string());
    }

    let mut out = String::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b0 = bytes[i];
        if b0 < 0x80 {
            out.push(b0 as char);
            i += 1;
        } else if b0 & 0xE0 == 0xC0 {
            let b1 = continuation(bytes, i + 1)?;
            let cp = ((b0 as u32 & 0x1F) << 6) | b1;
            out.push(to_char(cp)?);
            i += 2;
        } else if b0 & 0xF0 == 0xE0 {
            let unit = three_byte_unit(bytes, i)?;
            i += 3;
            match unit {
                0xD800..=0xDBFF => {
                    let low = if i < bytes.len() && bytes[i] & 0xF0 == 0xE0 {
                        three_byte_unit(bytes, i)?
                    } else {
                        return Err(NbtError::malformed("unpaired high surrogate in string"));
                    };
                    if !(0xDC00..=0xDFFF).contains(&low) {
                        return Err(NbtError::malformed("unpaired high surrogate in string"));
                    }
                    i += 3;
                    let cp = 0x1_0000 + (((unit - 0xD800) << 10) | (low - 0xDC00));
                    out.push(to_char(cp)?);
                }
                0xDC00..=0xDFFF => {
                    return Err(NbtError::malformed("unpaired low surrogate in string"));
                }
                _ => out.push(to_char(unit)?),
            }
        } else if b0 & 0xF8 == 0xF0 {
            let b1 = continuation(bytes, i + 1)?;
            let b2 = continuation(bytes, i + 2)?;
            let b3 = continuation(bytes, i + 3)?;
            let cp = ((b0 as u32 & 0x07) << 18) | (b1 << 12) | (b2 << 6) | b3;
            out.push(to_char(cp)?);
            i += 4;
        } else {
            return Err(NbtError::malformed(format!(
                "invalid string byte 0x{:02x} at offset {}",
                b0, i
            )));
        }
    }
    Ok(out)
}

fn needs_escaping(s: &str) -> bool {
    s.bytes().any(|b| b == 0 || b >= 0xF0)
}

fn push_unit(out: &mut Vec<u8>, unit: u16) {
    out.push(0xE0 | (unit >> 12) as u8);
    out.push(0x80 | ((unit >> 6) & 0x3F) as u8);
    out.push(0x80 | (unit & 0x3F) as u8);
}

fn continuation(bytes: &[u8], at: usize) -> Result<u32> {
    match bytes.get(at) {
        Some(&b) if b & 0xC0 == 0x80 => Ok((b & 0x3F) as u32),
        Some(_) => Err(NbtError::malformed("invalid continuation byte in string")),
        None => Err(NbtError::malformed("truncated character in string")),
    }
}

fn three_byte_unit(bytes: &[u8], at: usize) -> Result<u32> {
    let b1 = continuation(bytes, at + 1)?;
    let b2 = continuation(bytes, at + 2)?;
    Ok(((bytes[at] as u32 & 0x0F) << 12) | (b1 << 6) | b2)
}

fn to_char(cp: u32) -> Result<char> {
    char::from_u32(cp).ok_or_else(|| NbtError::malformed(format!("invalid code point U+{:X}", cp)))
}
