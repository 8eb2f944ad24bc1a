//! # tessera-nbt
//!
//! Binary tag-tree codec for Tessera chunk payloads.
//!
//! A tag tree is a recursive structure of typed values: scalars, arrays,
//! homogeneous lists and compounds of named children. The wire format is
//! big-endian and self-describing:
//!
//! ```text
//! named tag := type:u8 [name_len:u16 name:mutf8] payload   (no name for End)
//! String    := len:u16 bytes:mutf8
//! *Array    := count:i32 elements
//! List      := element_type:u8 count:i32 payload*count
//! Compound  := named tag* End
//! ```
//!
//! ## Usage
//!
//! ```
//! use tessera_nbt::{Compound, NamedTag, Tag};
//!
//! let mut level = Compound::new();
//! level.push("xPos", 12i32);
//! level.push("Heights", Tag::IntArray(vec![64; 4]));
//! let root = NamedTag::new("Level", level);
//!
//! let bytes = tessera_nbt::to_bytes(&root).unwrap();
//! assert_eq!(tessera_nbt::from_bytes(&bytes).unwrap(), root);
//! ```

mod decode;
mod encode;
mod error;
mod gzip;
pub mod mutf8;
mod pretty;
mod tag;

pub use decode::{decode, from_bytes, MAX_DEPTH};
pub use encode::{encode, to_bytes};
pub use error::{NbtError, Result};
pub use gzip::{from_gzip_reader, read_gzip_file, to_gzip_writer, write_gzip_file};
pub use tag::{Compound, NamedTag, Tag, TagList, TagType};
