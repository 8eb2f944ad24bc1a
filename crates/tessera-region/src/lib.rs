//! # tessera-region
//!
//! Region containers for Tessera: 1024 chunk slots in one file, allocated
//! in 4096-byte sectors.
//!
//! ## Container Format
//!
//! ```text
//! +---------------------+  sector 0
//! | Locations (4 KiB)   |  [offset:u24][count:u8] x 1024, slot = x + z*32
//! +---------------------+  sector 1
//! | Timestamps (4 KiB)  |  [unix seconds:u32] x 1024
//! +---------------------+  sector 2..
//! | Chunk blocks        |  [length:u32][compression:u8][payload][pad]
//! +---------------------+
//! ```
//!
//! Every slot is classified into a [`ChunkStatus`] when the region is
//! opened and again after each write or delete. Reads dispatch on that
//! status; writes place the chunk in place, in the first free gap, or at
//! the end of the file, and give trailing free sectors back.
//!
//! ## Usage
//!
//! ```
//! use std::io::Cursor;
//! use tessera_nbt::{Compound, NamedTag};
//! use tessera_region::RegionFile;
//!
//! let mut level = Compound::new();
//! level.push("xPos", 4i32);
//! let chunk = NamedTag::compound(level);
//!
//! let mut region = RegionFile::from_storage(Cursor::new(Vec::new())).unwrap();
//! region.put(4, 0, &chunk).unwrap();
//! assert_eq!(region.get(4, 0).unwrap(), chunk);
//! assert_eq!(region.size(), 3 * 4096);
//! ```

mod compression;
mod error;
mod metadata;
mod region;
mod status;
mod storage;
mod world;

pub use compression::Compression;
pub use error::{ErrorCategory, HeaderFault, RegionError, Result};
pub use metadata::{
    slot_index, ChunkHeader, ChunkMetadata, HeaderEntry, HEADER_BYTES, MAX_SECTOR_COUNT,
    SECTOR_BYTES, SLOT_COUNT,
};
pub use region::{ChunkEntry, ChunkIter, RegionFile, RegionOptions};
pub use status::{classify, ChunkStatus};
pub use storage::{RegionStorage, SectorCursor};
pub use world::{ChunkPos, RegionPos, WorldRegions};
