//! In-memory tag tree.
//!
//! A stream holds one [`NamedTag`] root. Compound children are named,
//! list elements are not; everything else is a plain [`Tag`] value.

use crate::error::{NbtError, Result};

/// Wire type code of a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum TagType {
    End = 0,
    Byte = 1,
    Short = 2,
    Int = 3,
    Long = 4,
    Float = 5,
    Double = 6,
    ByteArray = 7,
    String = 8,
    List = 9,
    Compound = 10,
    IntArray = 11,
    LongArray = 12,
}

/// Code-indexed table: `TAG_TYPES[code]` is the type for that wire code.
const TAG_TYPES: [TagType; 13] = [
    TagType::End,
    TagType::Byte,
    TagType::Short,
    TagType::Int,
    TagType::Long,
    TagType::Float,
    TagType::Double,
    TagType::ByteArray,
    TagType::String,
    TagType::List,
    TagType::Compound,
    TagType::IntArray,
    TagType::LongArray,
];

/// Display names, indexed the same way as [`TAG_TYPES`].
const TAG_NAMES: [&str; 13] = [
    "TAG_End",
    "TAG_Byte",
    "TAG_Short",
    "TAG_Int",
    "TAG_Long",
    "TAG_Float",
    "TAG_Double",
    "TAG_Byte_Array",
    "TAG_String",
    "TAG_List",
    "TAG_Compound",
    "TAG_Int_Array",
    "TAG_Long_Array",
];

impl TagType {
    /// Look up a wire code. Returns `None` for codes above 12.
    #[inline]
    pub fn from_code(code: u8) -> Option<Self> {
        TAG_TYPES.get(code as usize).copied()
    }

    #[inline]
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        TAG_NAMES[self as usize]
    }
}

impl std::fmt::Display for TagType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A tag value.
#[derive(Debug, Clone, PartialEq)]
pub enum Tag {
    End,
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    ByteArray(Vec<i8>),
    String(String),
    List(TagList),
    Compound(Compound),
    IntArray(Vec<i32>),
    LongArray(Vec<i64>),
}

impl Tag {
    pub fn tag_type(&self) -> TagType {
        match self {
            Tag::End => TagType::End,
            Tag::Byte(_) => TagType::Byte,
            Tag::Short(_) => TagType::Short,
            Tag::Int(_) => TagType::Int,
            Tag::Long(_) => TagType::Long,
            Tag::Float(_) => TagType::Float,
            Tag::Double(_) => TagType::Double,
            Tag::ByteArray(_) => TagType::ByteArray,
            Tag::String(_) => TagType::String,
            Tag::List(_) => TagType::List,
            Tag::Compound(_) => TagType::Compound,
            Tag::IntArray(_) => TagType::IntArray,
            Tag::LongArray(_) => TagType::LongArray,
        }
    }

    pub fn as_compound(&self) -> Option<&Compound> {
        match self {
            Tag::Compound(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_compound_mut(&mut self) -> Option<&mut Compound> {
        match self {
            Tag::Compound(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&TagList> {
        match self {
            Tag::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Tag::String(s) => Some(s),
            _ => None,
        }
    }

    /// Integer view of any integral scalar.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Tag::Byte(v) => Some(v as i64),
            Tag::Short(v) => Some(v as i64),
            Tag::Int(v) => Some(v as i64),
            Tag::Long(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Tag::Float(v) => Some(v as f64),
            Tag::Double(v) => Some(v),
            _ => None,
        }
    }
}

impl From<i8> for Tag {
    fn from(v: i8) -> Self {
        Tag::Byte(v)
    }
}

impl From<i16> for Tag {
    fn from(v: i16) -> Self {
        Tag::Short(v)
    }
}

impl From<i32> for Tag {
    fn from(v: i32) -> Self {
        Tag::Int(v)
    }
}

impl From<i64> for Tag {
    fn from(v: i64) -> Self {
        Tag::Long(v)
    }
}

impl From<f32> for Tag {
    fn from(v: f32) -> Self {
        Tag::Float(v)
    }
}

impl From<f64> for Tag {
    fn from(v: f64) -> Self {
        Tag::Double(v)
    }
}

impl From<&str> for Tag {
    fn from(v: &str) -> Self {
        Tag::String(v.to_string())
    }
}

impl From<String> for Tag {
    fn from(v: String) -> Self {
        Tag::String(v)
    }
}

impl From<Compound> for Tag {
    fn from(v: Compound) -> Self {
        Tag::Compound(v)
    }
}

impl From<TagList> for Tag {
    fn from(v: TagList) -> Self {
        Tag::List(v)
    }
}

/// Homogeneous list of unnamed tags.
///
/// The element type is fixed at construction; every pushed element must
/// match it. An empty list may declare any element type (`End` is what
/// most writers use).
#[derive(Debug, Clone, PartialEq)]
pub struct TagList {
    element_type: TagType,
    items: Vec<Tag>,
}

impl TagList {
    pub fn new(element_type: TagType) -> Self {
        Self {
            element_type,
            items: Vec::new(),
        }
    }

    /// Build a list from a vector, checking every element against `element_type`.
    pub fn from_items(element_type: TagType, items: Vec<Tag>) -> Result<Self> {
        if let Some(bad) = items.iter().find(|t| t.tag_type() != element_type) {
            return Err(NbtError::unencodable(format!(
                "{} element in a list of {}",
                bad.tag_type(),
                element_type
            )));
        }
        Ok(Self {
            element_type,
            items,
        })
    }

    pub fn push(&mut self, tag: Tag) -> Result<()> {
        if tag.tag_type() != self.element_type {
            return Err(NbtError::unencodable(format!(
                "{} element in a list of {}",
                tag.tag_type(),
                self.element_type
            )));
        }
        self.items.push(tag);
        Ok(())
    }

    pub fn element_type(&self) -> TagType {
        self.element_type
    }

    pub fn items(&self) -> &[Tag] {
        &self.items
    }

    pub fn get(&self, index: usize) -> Option<&Tag> {
        self.items.get(index)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Tag> {
        self.items.iter()
    }

    pub(crate) fn from_parts_unchecked(element_type: TagType, items: Vec<Tag>) -> Self {
        Self {
            element_type,
            items,
        }
    }
}

/// Ordered collection of named tags.
///
/// Entries keep wire order. Names are not required to be unique on the
/// wire; lookups resolve duplicates to the last entry.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Compound {
    entries: Vec<(String, Tag)>,
}

impl Compound {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Tag> {
        self.entries
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, t)| t)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Tag> {
        self.entries
            .iter_mut()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, t)| t)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Set `name` to `tag`, replacing the entry lookups currently resolve to.
    /// Returns the replaced value.
    pub fn insert(&mut self, name: impl Into<String>, tag: impl Into<Tag>) -> Option<Tag> {
        let name = name.into();
        let tag = tag.into();
        match self.entries.iter_mut().rev().find(|(n, _)| *n == name) {
            Some((_, slot)) => Some(std::mem::replace(slot, tag)),
            None => {
                self.entries.push((name, tag));
                None
            }
        }
    }

    /// Append an entry without checking for an existing name.
    pub fn push(&mut self, name: impl Into<String>, tag: impl Into<Tag>) {
        self.entries.push((name.into(), tag.into()));
    }

    /// Remove every entry called `name`; returns the one lookups resolved to.
    pub fn remove(&mut self, name: &str) -> Option<Tag> {
        let mut removed = None;
        self.entries.retain_mut(|(n, t)| {
            if n == name {
                removed = Some(std::mem::replace(t, Tag::End));
                false
            } else {
                true
            }
        });
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Tag)> {
        self.entries.iter().map(|(n, t)| (n.as_str(), t))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }
}

impl<N: Into<String>, T: Into<Tag>> FromIterator<(N, T)> for Compound {
    fn from_iter<I: IntoIterator<Item = (N, T)>>(iter: I) -> Self {
        let mut compound = Compound::new();
        for (name, tag) in iter {
            compound.push(name, tag);
        }
        compound
    }
}

/// Root of a tag stream: a tag plus its name.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedTag {
    pub name: String,
    pub tag: Tag,
}

impl NamedTag {
    pub fn new(name: impl Into<String>, tag: impl Into<Tag>) -> Self {
        Self {
            name: name.into(),
            tag: tag.into(),
        }
    }

    /// Unnamed compound root, the usual shape of a chunk payload.
    pub fn compound(root: Compound) -> Self {
        Self::new(String::new(), root)
    }

    pub fn tag_type(&self) -> TagType {
        self.tag.tag_type()
    }

    pub fn as_compound(&self) -> Option<&Compound> {
        self.tag.as_compound()
    }

    pub fn is_compound(&self) -> bool {
        self.tag_type() == TagType::Compound
    }
}
