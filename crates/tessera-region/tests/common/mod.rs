//! Shared fixtures for region integration tests.
#![allow(dead_code)]

use std::io::Write;
use std::path::{Path, PathBuf};

use flate2::write::{GzEncoder, ZlibEncoder};
use tessera_nbt::{Compound, NamedTag, Tag};
use tessera_region::{RegionFile, RegionStorage};

pub const SECTOR: usize = 4096;
pub const FIXTURE_SECTORS: usize = 27;
pub const OLD_TIMESTAMP: u32 = 1334530101;

/// Deterministic, incompressible bytes.
pub fn noise(len: usize, seed: u64) -> Vec<u8> {
    let mut state = seed.wrapping_mul(0x9E37_79B9_7F4A_7C15) | 1;
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state >> 24) as u8
        })
        .collect()
}

/// A small chunk tree.
pub fn level(x: i32, z: i32) -> NamedTag {
    let mut inner = Compound::new();
    inner.push("xPos", x);
    inner.push("zPos", z);
    inner.push("LastUpdate", 1334530101i64);
    inner.push("TerrainPopulated", 1i8);
    inner.push("HeightMap", Tag::ByteArray(vec![64; 256]));
    let mut root = Compound::new();
    root.push("Level", inner);
    NamedTag::compound(root)
}

/// A chunk tree carrying `len` random bytes, so its zlib payload is
/// slightly larger than `len`.
pub fn noisy_level(len: usize, seed: u64) -> NamedTag {
    let mut root = Compound::new();
    let bytes = noise(len, seed).into_iter().map(|b| b as i8).collect();
    root.push("data", Tag::ByteArray(bytes));
    NamedTag::compound(root)
}

pub fn one_sector_level() -> NamedTag {
    noisy_level(1000, 1)
}

pub fn two_sector_level() -> NamedTag {
    noisy_level(6000, 2)
}

pub fn three_sector_level() -> NamedTag {
    noisy_level(10000, 3)
}

pub fn encode(tag: &NamedTag) -> Vec<u8> {
    tessera_nbt::to_bytes(tag).unwrap()
}

pub fn zlib(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

pub fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// Byte-level region writer for hand-made (and deliberately broken) files.
pub struct RegionBuilder {
    pub data: Vec<u8>,
}

impl RegionBuilder {
    pub fn new(sectors: usize) -> Self {
        Self {
            data: vec![0u8; sectors * SECTOR],
        }
    }

    pub fn location(&mut self, x: usize, z: usize, offset: u32, count: u8) -> &mut Self {
        let at = 4 * (x + 32 * z);
        let bytes = offset.to_be_bytes();
        self.data[at..at + 3].copy_from_slice(&bytes[1..]);
        self.data[at + 3] = count;
        self
    }

    pub fn timestamp(&mut self, x: usize, z: usize, ts: u32) -> &mut Self {
        let at = SECTOR + 4 * (x + 32 * z);
        self.data[at..at + 4].copy_from_slice(&ts.to_be_bytes());
        self
    }

    /// Write a chunk block at `sector`; `length` is the stored length field.
    pub fn block(&mut self, sector: usize, length: u32, compression: u8, payload: &[u8]) -> &mut Self {
        let at = sector * SECTOR;
        self.data[at..at + 4].copy_from_slice(&length.to_be_bytes());
        self.data[at + 4] = compression;
        self.data[at + 5..at + 5 + payload.len()].copy_from_slice(payload);
        self
    }

    /// Location, timestamp and a well-formed block in one go.
    pub fn chunk(
        &mut self,
        x: usize,
        z: usize,
        sector: usize,
        count: u8,
        compression: u8,
        payload: &[u8],
    ) -> &mut Self {
        self.location(x, z, sector as u32, count)
            .timestamp(x, z, OLD_TIMESTAMP)
            .block(sector, payload.len() as u32 + 1, compression, payload)
    }

    /// Fill `range` of sector-relative bytes with `byte`.
    pub fn fill(&mut self, from: usize, to: usize, byte: u8) -> &mut Self {
        self.data[from..to].iter_mut().for_each(|b| *b = byte);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        self.data.clone()
    }
}

/// Raw tree stored uncompressed in chunk (3,1): 4092 bytes, so its block
/// spills one byte past its single declared sector.
pub fn spilling_level() -> NamedTag {
    noisy_level(4077, 31)
}

/// The 27-sector legacy test region.
///
/// ```text
/// sector 02: 6,0            sector 15: 12,0 (inside 4,0's run)
/// sector 03: 7,0 (+garbage) sector 16: 4,0 part 3/3
/// sector 04: garbage        sector 17-18: 16,0
/// sector 05: 8,0            sector 19-20: 5,1 (zlib, not a tag stream)
/// sector 06: 9,0            sector 21: 6,1 (13,0 points here, 0 sectors)
/// sector 07: 10,0 gzip      sector 22: 7,1 (no timestamp)
/// sector 08: 11,0 code 3    sector 23: 4,1 (length 0)
/// sector 09: 2,0 raw        sector 24: 8,1 (length 1)
/// sector 10-11: free        sector 25: 3,1 raw, spills into 26
/// sector 12: 3,0 garbled    sector 26: free apart from the spill
/// sector 13: 1,0
/// sector 14: 4,0 part 1/3 (3 sectors declared)
/// header only: 14,0 in header, 15,0 at sector 30, 17,0 timestamp only
/// ```
pub fn fixture_bytes() -> Vec<u8> {
    let mut b = RegionBuilder::new(FIXTURE_SECTORS);
    let z = |x: i32, z: i32| zlib(&encode(&level(x, z)));

    b.chunk(6, 0, 2, 1, 2, &z(6, 0));
    let seven = z(7, 0);
    b.chunk(7, 0, 3, 1, 2, &seven);
    b.fill(3 * SECTOR + 5 + seven.len(), 4 * SECTOR, 0xAB);
    b.fill(4 * SECTOR, 5 * SECTOR, 0x5A);
    b.chunk(8, 0, 5, 1, 2, &z(8, 0));
    b.chunk(9, 0, 6, 1, 2, &z(9, 0));
    b.chunk(10, 0, 7, 1, 1, &gzip(&encode(&level(10, 0))));
    b.chunk(11, 0, 8, 1, 3, &z(11, 0));
    b.chunk(2, 0, 9, 1, 0, &encode(&level(2, 0)));
    let mut garbled = vec![0x78, 0x9c, 0xff];
    garbled.extend(noise(600, 30));
    b.chunk(3, 0, 12, 1, 2, &garbled);
    b.chunk(1, 0, 13, 1, 2, &z(1, 0));
    b.chunk(4, 0, 14, 3, 2, &z(4, 0));
    b.chunk(12, 0, 15, 1, 2, &z(12, 0));
    b.chunk(16, 0, 17, 2, 2, &z(16, 0));
    b.chunk(5, 1, 19, 2, 2, &zlib(b"this is zlib, but not a tag stream"));
    b.chunk(6, 1, 21, 1, 2, &z(6, 1));
    b.chunk(7, 1, 22, 1, 2, &z(7, 1)).timestamp(7, 1, 0);
    b.location(4, 1, 23, 1).timestamp(4, 1, OLD_TIMESTAMP).block(23, 0, 2, &[]);
    b.location(8, 1, 24, 1).timestamp(8, 1, OLD_TIMESTAMP).block(24, 1, 2, &[]);
    b.chunk(3, 1, 25, 1, 0, &encode(&spilling_level()));

    b.location(13, 0, 21, 0).timestamp(13, 0, 1376433958);
    b.location(14, 0, 1, 1).timestamp(14, 0, 1376433960);
    b.location(15, 0, 30, 1).timestamp(15, 0, 1376433961);
    b.timestamp(17, 0, OLD_TIMESTAMP);

    b.build()
}

/// Write the fixture to `dir/regiontest.mca`.
pub fn write_fixture(dir: &Path) -> PathBuf {
    let path = dir.join("regiontest.mca");
    std::fs::write(&path, fixture_bytes()).unwrap();
    path
}

/// Read one whole sector of a region file.
pub fn read_sector(path: &Path, sector: usize) -> Vec<u8> {
    let data = std::fs::read(path).unwrap();
    data[sector * SECTOR..(sector + 1) * SECTOR].to_vec()
}

pub fn is_zeroed(bytes: &[u8]) -> bool {
    bytes.iter().all(|b| *b == 0)
}

/// Other created slots whose declared run shares a sector with `(x, z)`.
pub fn aliases<S: RegionStorage>(region: &RegionFile<S>, x: usize, z: usize) -> Vec<(usize, usize)> {
    let target = region.metadata(x, z).unwrap().sector_range();
    region
        .all_metadata()
        .iter()
        .filter(|m| (m.x, m.z) != (x, z) && m.is_created() && m.sector_start >= 2)
        .filter(|m| {
            let run = m.sector_range();
            run.start < target.end && target.start < run.end
        })
        .map(|m| (m.x, m.z))
        .collect()
}
