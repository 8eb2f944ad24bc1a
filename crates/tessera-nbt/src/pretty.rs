//! Indented text rendering of a tag tree, for logs and debugging.

use std::fmt::{self, Write};

use crate::tag::{NamedTag, Tag};

const INDENT: &str = "  ";

impl NamedTag {
    /// Render the whole tree, one tag per line.
    ///
    /// ```
    /// use tessera_nbt::{Compound, NamedTag};
    ///
    /// let mut level = Compound::new();
    /// level.push("xPos", 3i32);
    /// let root = NamedTag::new("Level", level);
    /// assert_eq!(
    ///     root.pretty_tree(),
    ///     "TAG_Compound('Level'): 1 entry\n{\n  TAG_Int('xPos'): 3\n}"
    /// );
    /// ```
    pub fn pretty_tree(&self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = write_tag(&mut out, Some(&self.name), &self.tag, 0);
        out
    }
}

impl fmt::Display for NamedTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pretty_tree())
    }
}

fn plural(n: usize, one: &str, many: &str) -> String {
    if n == 1 {
        format!("{} {}", n, one)
    } else {
        format!("{} {}", n, many)
    }
}

fn write_tag(out: &mut String, name: Option<&str>, tag: &Tag, depth: usize) -> fmt::Result {
    let pad = INDENT.repeat(depth);
    let label = match name {
        Some(n) => format!("{}{}('{}')", pad, tag.tag_type(), n),
        None => format!("{}{}", pad, tag.tag_type()),
    };
    match tag {
        Tag::End => write!(out, "{}", label),
        Tag::Byte(v) => write!(out, "{}: {}", label, v),
        Tag::Short(v) => write!(out, "{}: {}", label, v),
        Tag::Int(v) => write!(out, "{}: {}", label, v),
        Tag::Long(v) => write!(out, "{}: {}", label, v),
        Tag::Float(v) => write!(out, "{}: {}", label, v),
        Tag::Double(v) => write!(out, "{}: {}", label, v),
        Tag::String(s) => write!(out, "{}: {}", label, s),
        Tag::ByteArray(v) => write!(out, "{}: [{}]", label, plural(v.len(), "byte", "bytes")),
        Tag::IntArray(v) => write!(out, "{}: [{}]", label, plural(v.len(), "int", "ints")),
        Tag::LongArray(v) => write!(out, "{}: [{}]", label, plural(v.len(), "long", "longs")),
        Tag::List(list) => {
            write!(
                out,
                "{}: {} of type {}\n{}{{",
                label,
                plural(list.len(), "entry", "entries"),
                list.element_type(),
                pad
            )?;
            for item in list.iter() {
                out.push('\n');
                write_tag(out, None, item, depth + 1)?;
            }
            write!(out, "\n{}}}", pad)
        }
        Tag::Compound(compound) => {
            write!(
                out,
                "{}: {}\n{}{{",
                label,
                plural(compound.len(), "entry", "entries"),
                pad
            )?;
            for (child_name, child) in compound.iter() {
                out.push('\n');
                write_tag(out, Some(child_name), child, depth + 1)?;
            }
            write!(out, "\n{}}}", pad)
        }
    }
}
