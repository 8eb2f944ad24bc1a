//! Stream decoder.

use std::io::Read;

use byteorder::{BigEndian, ReadBytesExt};

use crate::error::{NbtError, Result};
use crate::mutf8;
use crate::tag::{Compound, NamedTag, Tag, TagList, TagType};

/// Deepest list/compound nesting accepted by the decoder.
pub const MAX_DEPTH: usize = 512;

/// Upper bound on capacity reserved up front for a declared element count.
/// Larger collections grow as elements actually arrive, so a bogus count
/// on a short stream fails on EOF instead of allocating.
const MAX_PREALLOC: usize = 4096;

/// Decode one named root tag from `reader`.
///
/// Bytes after the root are left unread.
pub fn decode<R: Read>(reader: &mut R) -> Result<NamedTag> {
    let mut decoder = Decoder { reader };
    let ty = decoder.read_type()?;
    if ty == TagType::End {
        return Ok(NamedTag::new(String::new(), Tag::End));
    }
    let name = decoder.read_string()?;
    let tag = decoder.read_payload(ty, 0)?;
    Ok(NamedTag { name, tag })
}

/// Decode one named root tag from a byte slice.
pub fn from_bytes(bytes: &[u8]) -> Result<NamedTag> {
    let mut cursor = bytes;
    decode(&mut cursor)
}

struct Decoder<'a, R> {
    reader: &'a mut R,
}

impl<R: Read> Decoder<'_, R> {
    fn read_type(&mut self) -> Result<TagType> {
        let code = self.reader.read_u8().map_err(NbtError::from_read)?;
        TagType::from_code(code)
            .ok_or_else(|| NbtError::malformed(format!("unknown tag type {}", code)))
    }

    fn read_string(&mut self) -> Result<String> {
        let len = self
            .reader
            .read_u16::<BigEndian>()
            .map_err(NbtError::from_read)? as usize;
        let mut buf = vec![0u8; len];
        self.reader.read_exact(&mut buf).map_err(NbtError::from_read)?;
        mutf8::decode(&buf)
    }

    fn read_len(&mut self, what: &str) -> Result<usize> {
        let len = self
            .reader
            .read_i32::<BigEndian>()
            .map_err(NbtError::from_read)?;
        if len < 0 {
            return Err(NbtError::malformed(format!("negative {} length {}", what, len)));
        }
        Ok(len as usize)
    }

    fn read_payload(&mut self, ty: TagType, depth: usize) -> Result<Tag> {
        let tag = match ty {
            TagType::End => Tag::End,
            TagType::Byte => Tag::Byte(
                self.reader
                    .read_i8()
                    .map_err(NbtError::from_read)?,
            ),
            TagType::Short => Tag::Short(
                self.reader
                    .read_i16::<BigEndian>()
                    .map_err(NbtError::from_read)?,
            ),
            TagType::Int => Tag::Int(
                self.reader
                    .read_i32::<BigEndian>()
                    .map_err(NbtError::from_read)?,
            ),
            TagType::Long => Tag::Long(
                self.reader
                    .read_i64::<BigEndian>()
                    .map_err(NbtError::from_read)?,
            ),
            TagType::Float => Tag::Float(
                self.reader
                    .read_f32::<BigEndian>()
                    .map_err(NbtError::from_read)?,
            ),
            TagType::Double => Tag::Double(
                self.reader
                    .read_f64::<BigEndian>()
                    .map_err(NbtError::from_read)?,
            ),
            TagType::String => Tag::String(self.read_string()?),
            TagType::ByteArray => {
                let len = self.read_len("byte array")?;
                let mut buf = Vec::with_capacity(len.min(MAX_PREALLOC));
                self.reader
                    .by_ref()
                    .take(len as u64)
                    .read_to_end(&mut buf)
                    .map_err(NbtError::from_read)?;
                if buf.len() != len {
                    return Err(NbtError::malformed("unexpected end of stream"));
                }
                Tag::ByteArray(buf.into_iter().map(|b| b as i8).collect())
            }
            TagType::IntArray => {
                let len = self.read_len("int array")?;
                let mut values = Vec::with_capacity(len.min(MAX_PREALLOC));
                for _ in 0..len {
                    values.push(
                        self.reader
                            .read_i32::<BigEndian>()
                            .map_err(NbtError::from_read)?,
                    );
                }
                Tag::IntArray(values)
            }
            TagType::LongArray => {
                let len = self.read_len("long array")?;
                let mut values = Vec::with_capacity(len.min(MAX_PREALLOC));
                for _ in 0..len {
                    values.push(
                        self.reader
                            .read_i64::<BigEndian>()
                            .map_err(NbtError::from_read)?,
                    );
                }
                Tag::LongArray(values)
            }
            TagType::List => {
                check_depth(depth)?;
                let element_type = self.read_type()?;
                let len = self.read_len("list")?;
                if element_type == TagType::End && len > 0 {
                    return Err(NbtError::malformed("non-empty list of TAG_End"));
                }
                let mut items = Vec::with_capacity(len.min(MAX_PREALLOC));
                for _ in 0..len {
                    items.push(self.read_payload(element_type, depth + 1)?);
                }
                Tag::List(TagList::from_parts_unchecked(element_type, items))
            }
            TagType::Compound => {
                check_depth(depth)?;
                let mut compound = Compound::new();
                loop {
                    let child_type = self.read_type()?;
                    if child_type == TagType::End {
                        break;
                    }
                    let name = self.read_string()?;
                    let child = self.read_payload(child_type, depth + 1)?;
                    compound.push(name, child);
                }
                Tag::Compound(compound)
            }
        };
        Ok(tag)
    }
}

fn check_depth(depth: usize) -> Result<()> {
    if depth >= MAX_DEPTH {
        return Err(NbtError::malformed(format!(
            "tags nested deeper than {} levels",
            MAX_DEPTH
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_empty_string_golden() {
        // Compound "Test" holding an empty string named "empty string".
        let golden = b"\x0A\x00\x04Test\x08\x00\x0Cempty string\x00\x00\x00";
        let root = from_bytes(golden).unwrap();
        assert_eq!(root.name, "Test");
        let c = root.as_compound().unwrap();
        assert_eq!(c.get("empty string"), Some(&Tag::String(String::new())));
    }

    #[test]
    fn test_empty_stream_is_malformed() {
        let err = from_bytes(b"").unwrap_err();
        assert!(err.is_malformed());
    }

    #[test]
    fn test_unknown_type_code() {
        let err = from_bytes(b"\x0D\x00\x00").unwrap_err();
        assert!(err.is_malformed());
        assert!(err.to_string().contains("unknown tag type 13"));
    }

    #[test]
    fn test_truncated_compound() {
        // Missing the closing TAG_End.
        let err = from_bytes(b"\x0A\x00\x00\x01\x00\x01a\x05").unwrap_err();
        assert!(err.is_malformed());
    }

    #[test]
    fn test_negative_array_length() {
        let err = from_bytes(b"\x07\x00\x00\xFF\xFF\xFF\xFF").unwrap_err();
        assert!(err.is_malformed());
        assert!(err.to_string().contains("negative"));
    }

    #[test]
    fn test_huge_declared_length_fails_fast() {
        // Claims 2^31-1 longs but carries none.
        let err = from_bytes(b"\x0C\x00\x00\x7F\xFF\xFF\xFF").unwrap_err();
        assert!(err.is_malformed());
    }

    #[test]
    fn test_end_root() {
        let root = from_bytes(b"\x00").unwrap();
        assert_eq!(root.tag, Tag::End);
    }

    #[test]
    fn test_non_compound_root_allowed() {
        let root = from_bytes(b"\x03\x00\x01n\x00\x00\x00\x2A").unwrap();
        assert_eq!(root.name, "n");
        assert_eq!(root.tag, Tag::Int(42));
    }

    #[test]
    fn test_nesting_limit() {
        // MAX_DEPTH + 1 nested lists of lists.
        let mut bytes = vec![0x09, 0x00, 0x00];
        for _ in 0..MAX_DEPTH {
            bytes.extend_from_slice(&[0x09, 0x00, 0x00, 0x00, 0x01]);
        }
        bytes.extend_from_slice(&[0x00, 0x00, 0x00, 0x00, 0x00]);
        let err = from_bytes(&bytes).unwrap_err();
        assert!(err.to_string().contains("nested deeper"));
    }

    #[test]
    fn test_list_of_end_with_elements_rejected() {
        let err = from_bytes(b"\x09\x00\x00\x00\x00\x00\x00\x02").unwrap_err();
        assert!(err.is_malformed());
    }
}
