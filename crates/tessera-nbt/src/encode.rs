//! Stream encoder. Output is a deterministic function of the tree.

use std::io::Write;

use byteorder::{BigEndian, WriteBytesExt};

use crate::error::{NbtError, Result};
use crate::mutf8;
use crate::tag::{NamedTag, Tag, TagType};

/// Encode `root` to `writer`.
///
/// A `Tag::End` root is written as the single end byte with no name.
pub fn encode<W: Write>(root: &NamedTag, writer: &mut W) -> Result<()> {
    let ty = root.tag.tag_type();
    writer.write_u8(ty.code())?;
    if ty == TagType::End {
        return Ok(());
    }
    write_string(writer, &root.name)?;
    write_payload(writer, &root.tag)
}

/// Encode `root` into a fresh buffer.
pub fn to_bytes(root: &NamedTag) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    encode(root, &mut buf)?;
    Ok(buf)
}

fn write_string<W: Write>(w: &mut W, s: &str) -> Result<()> {
    // Checked before encoding so an oversized string is never copied.
    let encoded = mutf8::encoded_len(s);
    let len = u16::try_from(encoded).map_err(|_| {
        NbtError::unencodable(format!(
            "string of {} encoded bytes exceeds {}",
            encoded,
            u16::MAX
        ))
    })?;
    w.write_u16::<BigEndian>(len)?;
    w.write_all(&mutf8::encode(s))?;
    Ok(())
}

fn write_len<W: Write>(w: &mut W, len: usize) -> Result<()> {
    let len = i32::try_from(len)
        .map_err(|_| NbtError::unencodable(format!("collection of {} elements is too long", len)))?;
    w.write_i32::<BigEndian>(len)?;
    Ok(())
}

fn write_payload<W: Write>(w: &mut W, tag: &Tag) -> Result<()> {
    match tag {
        Tag::End => {}
        Tag::Byte(v) => w.write_i8(*v)?,
        Tag::Short(v) => w.write_i16::<BigEndian>(*v)?,
        Tag::Int(v) => w.write_i32::<BigEndian>(*v)?,
        Tag::Long(v) => w.write_i64::<BigEndian>(*v)?,
        Tag::Float(v) => w.write_f32::<BigEndian>(*v)?,
        Tag::Double(v) => w.write_f64::<BigEndian>(*v)?,
        Tag::String(s) => write_string(w, s)?,
        Tag::ByteArray(values) => {
            write_len(w, values.len())?;
            let bytes: Vec<u8> = values.iter().map(|&b| b as u8).collect();
            w.write_all(&bytes)?;
        }
        Tag::IntArray(values) => {
            write_len(w, values.len())?;
            for v in values {
                w.write_i32::<BigEndian>(*v)?;
            }
        }
        Tag::LongArray(values) => {
            write_len(w, values.len())?;
            for v in values {
                w.write_i64::<BigEndian>(*v)?;
            }
        }
        Tag::List(list) => {
            let element_type = list.element_type();
            if element_type == TagType::End && !list.is_empty() {
                return Err(NbtError::unencodable("non-empty list of TAG_End"));
            }
            w.write_u8(element_type.code())?;
            write_len(w, list.len())?;
            for item in list.iter() {
                if item.tag_type() != element_type {
                    return Err(NbtError::unencodable(format!(
                        "{} element in a list of {}",
                        item.tag_type(),
                        element_type
                    )));
                }
                write_payload(w, item)?;
            }
        }
        Tag::Compound(compound) => {
            for (name, child) in compound.iter() {
                let ty = child.tag_type();
                if ty == TagType::End {
                    return Err(NbtError::unencodable(format!(
                        "compound entry '{}' is a TAG_End",
                        name
                    )));
                }
                w.write_u8(ty.code())?;
                write_string(w, name)?;
                write_payload(w, child)?;
            }
            w.write_u8(TagType::End.code())?;
        }
    }
    Ok(())
}
