//! Per-slot header records and the derived chunk metadata.
//!
//! ```text
//! bytes 0..4096      location table: [offset:u24 BE][count:u8] x 1024
//! bytes 4096..8192   timestamp table: [unix seconds:u32 BE] x 1024
//! sector N (N >= 2)  [length:u32 BE][compression:u8][payload][zero pad]
//! ```

use std::ops::Range;

use byteorder::{BigEndian, ByteOrder};

use crate::status::ChunkStatus;

/// Size of one allocation unit
pub const SECTOR_BYTES: u64 = 4096;
/// Sectors reserved for the location and timestamp tables
pub const HEADER_SECTORS: u32 = 2;
/// Total header size in bytes
pub const HEADER_BYTES: u64 = SECTOR_BYTES * HEADER_SECTORS as u64;
/// Chunk slots per region (32 x 32)
pub const SLOT_COUNT: usize = 1024;
/// Chunks per region edge
pub const REGION_WIDTH: usize = 32;
/// Length field plus compression byte at the start of every chunk
pub const CHUNK_HEADER_BYTES: u64 = 5;
/// Largest sector count a location entry can hold
pub const MAX_SECTOR_COUNT: u32 = 0xFF;
/// Largest sector offset a location entry can hold
pub const MAX_SECTOR_OFFSET: u32 = 0xFF_FFFF;

/// Slot index of local coordinates, `x + z * 32`.
pub fn slot_index(x: usize, z: usize) -> usize {
    x + z * REGION_WIDTH
}

/// Local coordinates of a slot index.
pub fn slot_coords(index: usize) -> (usize, usize) {
    (index % REGION_WIDTH, index / REGION_WIDTH)
}

/// Sectors needed to hold `bytes` bytes.
pub fn sectors_for(bytes: u64) -> u64 {
    bytes.div_ceil(SECTOR_BYTES)
}

/// One slot of the region header as stored on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HeaderEntry {
    pub sector_start: u32,
    pub sector_length: u32,
    pub timestamp: u32,
}

impl HeaderEntry {
    /// Parse a slot from its 4-byte location and 4-byte timestamp fields.
    pub fn parse(location: &[u8], timestamp: &[u8]) -> Self {
        Self {
            sector_start: BigEndian::read_u24(&location[..3]),
            sector_length: location[3] as u32,
            timestamp: BigEndian::read_u32(timestamp),
        }
    }

    /// The 4-byte location field.
    pub fn location_bytes(&self) -> [u8; 4] {
        let mut buf = [0u8; 4];
        BigEndian::write_u24(&mut buf[..3], self.sector_start & MAX_SECTOR_OFFSET);
        buf[3] = self.sector_length.min(MAX_SECTOR_COUNT) as u8;
        buf
    }

    pub fn timestamp_bytes(&self) -> [u8; 4] {
        let mut buf = [0u8; 4];
        BigEndian::write_u32(&mut buf, self.timestamp);
        buf
    }

    /// Byte offset of the chunk header this entry points at.
    pub fn byte_offset(&self) -> u64 {
        self.sector_start as u64 * SECTOR_BYTES
    }

    /// Whether a chunk header should be read for this slot in a container
    /// of `file_size` bytes.
    pub fn needs_chunk_header(&self, file_size: u64) -> bool {
        self.sector_start >= HEADER_SECTORS
            && self.sector_length > 0
            && self.byte_offset() + CHUNK_HEADER_BYTES <= file_size
    }
}

/// The 5-byte prefix of a stored chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    /// Bytes following the length field: compression byte plus payload
    pub length: u32,
    pub compression: u8,
}

impl ChunkHeader {
    pub fn parse(buf: &[u8; 5]) -> Self {
        Self {
            length: BigEndian::read_u32(&buf[..4]),
            compression: buf[4],
        }
    }

    pub fn to_bytes(self) -> [u8; 5] {
        let mut buf = [0u8; 5];
        BigEndian::write_u32(&mut buf[..4], self.length);
        buf[4] = self.compression;
        buf
    }
}

/// Everything known about one slot after classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkMetadata {
    pub x: usize,
    pub z: usize,
    pub sector_start: u32,
    pub sector_length: u32,
    pub timestamp: u32,
    /// Declared chunk length (compression byte + payload); 0 if not read
    pub length: u32,
    /// Compression code; `None` if the chunk header was not read
    pub compression: Option<u8>,
    pub status: ChunkStatus,
}

impl ChunkMetadata {
    pub(crate) fn from_entry(index: usize, entry: &HeaderEntry) -> Self {
        let (x, z) = slot_coords(index);
        Self {
            x,
            z,
            sector_start: entry.sector_start,
            sector_length: entry.sector_length,
            timestamp: entry.timestamp,
            length: 0,
            compression: None,
            status: ChunkStatus::NotCreated,
        }
    }

    pub fn is_created(&self) -> bool {
        self.status.is_created()
    }

    /// Sectors the stored chunk actually needs, including its length field.
    pub fn required_sectors(&self) -> u64 {
        sectors_for(self.length as u64 + 4)
    }

    /// Declared sector run `[start, start + count)`.
    pub fn sector_range(&self) -> Range<u64> {
        let start = self.sector_start as u64;
        start..start + self.sector_length as u64
    }

    /// First sector after the bytes the chunk header says are in use.
    pub fn data_end_sector(&self) -> u64 {
        if self.compression.is_none() {
            return self.sector_start as u64;
        }
        sectors_for(self.sector_start as u64 * SECTOR_BYTES + 4 + self.length as u64)
    }

    /// Sectors this slot may hold data in: the declared run widened by the
    /// data footprint, clipped to `file_sectors`. Empty for slots outside
    /// the data area.
    pub fn claimed_range(&self, file_sectors: u64) -> Range<u64> {
        let start = self.sector_start as u64;
        if !self.is_created() || start < HEADER_SECTORS as u64 || start >= file_sectors {
            return start..start;
        }
        let end = self
            .sector_range()
            .end
            .max(self.data_end_sector())
            .min(file_sectors);
        start..end
    }

    /// Sectors placement must not hand out while this slot points at them:
    /// the whole declared run, also where it lies past the container end,
    /// widened by the data footprint inside the container.
    pub fn reserved_range(&self, file_sectors: u64) -> Range<u64> {
        let start = self.sector_start as u64;
        if !self.is_created() || start < HEADER_SECTORS as u64 {
            return start..start;
        }
        let footprint = self.data_end_sector().min(file_sectors);
        start..self.sector_range().end.max(footprint)
    }

    /// Byte offset of the first payload byte.
    pub(crate) fn payload_offset(&self) -> u64 {
        self.sector_start as u64 * SECTOR_BYTES + CHUNK_HEADER_BYTES
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_entry_parse() {
        let entry = HeaderEntry::parse(&[0x00, 0x00, 0x06, 0x01], &[0x4f, 0x8a, 0xe1, 0x35]);
        assert_eq!(entry.sector_start, 6);
        assert_eq!(entry.sector_length, 1);
        assert_eq!(entry.timestamp, 1334501685);
        assert_eq!(entry.location_bytes(), [0x00, 0x00, 0x06, 0x01]);
        assert_eq!(entry.timestamp_bytes(), [0x4f, 0x8a, 0xe1, 0x35]);
    }

    #[test]
    fn test_slot_index_roundtrip() {
        assert_eq!(slot_index(9, 0), 9);
        assert_eq!(slot_index(3, 1), 35);
        assert_eq!(slot_coords(35), (3, 1));
        assert_eq!(slot_coords(1023), (31, 31));
    }

    #[test]
    fn test_required_sectors() {
        let mut m = ChunkMetadata::from_entry(0, &HeaderEntry::default());
        m.length = 4092;
        assert_eq!(m.required_sectors(), 1);
        m.length = 4093;
        assert_eq!(m.required_sectors(), 2);
        m.length = 613566756;
        assert_eq!(m.required_sectors(), 149797);
    }

    #[test]
    fn test_chunk_header_bytes() {
        let header = ChunkHeader::parse(&[0x00, 0x00, 0x0f, 0x81, 0x02]);
        assert_eq!(header.length, 3969);
        assert_eq!(header.compression, 2);
        assert_eq!(header.to_bytes(), [0x00, 0x00, 0x0f, 0x81, 0x02]);
    }

    #[test]
    fn test_needs_chunk_header() {
        let entry = HeaderEntry {
            sector_start: 2,
            sector_length: 1,
            timestamp: 0,
        };
        assert!(entry.needs_chunk_header(8197));
        assert!(!entry.needs_chunk_header(8196));
        let empty = HeaderEntry {
            sector_length: 0,
            ..entry
        };
        assert!(!empty.needs_chunk_header(3 * 4096));
    }

    #[test]
    fn test_reserved_range_ignores_file_end() {
        let mut m = ChunkMetadata::from_entry(
            0,
            &HeaderEntry {
                sector_start: 2,
                sector_length: 4,
                timestamp: 0,
            },
        );
        m.status = ChunkStatus::OutOfFile;
        m.length = 10240;
        m.compression = Some(0);
        assert_eq!(m.claimed_range(3), 2..3);
        assert_eq!(m.reserved_range(3), 2..6);

        // A huge declared length only reserves what exists.
        m.length = 613566756;
        assert_eq!(m.reserved_range(4), 2..6);

        m.sector_start = 30;
        m.sector_length = 1;
        m.compression = None;
        assert!(m.claimed_range(27).is_empty());
        assert_eq!(m.reserved_range(27), 30..31);

        m.status = ChunkStatus::NotCreated;
        assert!(m.reserved_range(27).is_empty());
    }
}
