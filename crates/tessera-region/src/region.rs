//! Region container: sector allocation and chunk I/O.

use std::fs::{File, OpenOptions};
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use tessera_config::{log_region_debug, log_region_info, log_region_warn, StorageConfig};
use tessera_nbt::NamedTag;
use tracing::{field, instrument};

use crate::compression::Compression;
use crate::error::{HeaderFault, RegionError, Result};
use crate::metadata::{
    sectors_for, slot_coords, slot_index, ChunkHeader, ChunkMetadata, HeaderEntry,
    CHUNK_HEADER_BYTES, HEADER_BYTES, HEADER_SECTORS, MAX_SECTOR_COUNT, MAX_SECTOR_OFFSET,
    REGION_WIDTH, SECTOR_BYTES, SLOT_COUNT,
};
use crate::status::{classify, ChunkStatus};
use crate::storage::{RegionStorage, SectorCursor};

/// Write-side tuning for a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionOptions {
    /// Zlib level for new payloads (0-9)
    pub compression_level: u32,
    /// Sync payload bytes before the header entry that points at them
    pub sync_writes: bool,
}

impl Default for RegionOptions {
    fn default() -> Self {
        Self {
            compression_level: 6,
            sync_writes: true,
        }
    }
}

impl From<&StorageConfig> for RegionOptions {
    fn from(config: &StorageConfig) -> Self {
        Self {
            compression_level: config.compression_level,
            sync_writes: config.sync_writes,
        }
    }
}

/// A decoded chunk yielded by [`RegionFile::iter_chunks`].
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkEntry {
    pub x: usize,
    pub z: usize,
    pub tag: NamedTag,
}

/// A region container of 32 x 32 chunk slots.
///
/// The header is parsed when the region is opened and every slot's
/// [`ChunkMetadata`] is re-derived from the container bytes after each
/// mutation.
pub struct RegionFile<S: RegionStorage = File> {
    cursor: SectorCursor<S>,
    path: Option<PathBuf>,
    metadata: Vec<ChunkMetadata>,
    size: u64,
    options: RegionOptions,
}

impl RegionFile<File> {
    /// Open an existing region file for reading and writing.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        let mut region = Self::from_storage(file)?;
        region.path = Some(path.to_path_buf());
        Ok(region)
    }

    /// Open a region file, creating an empty one if it does not exist.
    ///
    /// A new file stays 0 bytes long until the first chunk is written.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        let mut region = Self::from_storage(file)?;
        region.path = Some(path.to_path_buf());
        log_region_debug!("Region opened for writing", size = region.size);
        Ok(region)
    }
}

impl<S: RegionStorage> RegionFile<S> {
    /// Wrap any storage. A 0-byte storage is a valid empty region.
    pub fn from_storage(storage: S) -> Result<Self> {
        let mut region = Self {
            cursor: SectorCursor::new(storage),
            path: None,
            metadata: Vec::new(),
            size: 0,
            options: RegionOptions::default(),
        };
        region.refresh()?;
        Ok(region)
    }

    pub fn with_options(mut self, options: RegionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> RegionOptions {
        self.options
    }

    /// Path the region was opened from, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Current container size in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    // ========================================================================
    // Metadata
    // ========================================================================

    /// Re-read the header and chunk headers, then reclassify every slot.
    fn refresh(&mut self) -> Result<()> {
        let size = self.cursor.len()?;
        if size > 0 && size < HEADER_BYTES {
            return Err(RegionError::NoRegionHeader { size });
        }

        let mut entries = Box::new([HeaderEntry::default(); SLOT_COUNT]);
        if size >= HEADER_BYTES {
            let mut header = vec![0u8; HEADER_BYTES as usize];
            self.cursor.read_at(0, &mut header)?;
            let (locations, timestamps) = header.split_at(SECTOR_BYTES as usize);
            for (index, entry) in entries.iter_mut().enumerate() {
                let at = index * 4;
                *entry = HeaderEntry::parse(&locations[at..at + 4], &timestamps[at..at + 4]);
            }
        }

        let mut headers = Box::new([None; SLOT_COUNT]);
        for (index, entry) in entries.iter().enumerate() {
            if entry.needs_chunk_header(size) {
                let mut buf = [0u8; CHUNK_HEADER_BYTES as usize];
                self.cursor.read_at(entry.byte_offset(), &mut buf)?;
                headers[index] = Some(ChunkHeader::parse(&buf));
            }
        }

        self.metadata = classify(size, &entries, &headers);
        self.size = size;
        Ok(())
    }

    fn check_coords(x: usize, z: usize) -> Result<usize> {
        if x >= REGION_WIDTH || z >= REGION_WIDTH {
            return Err(RegionError::InvalidCoordinates { x, z });
        }
        Ok(slot_index(x, z))
    }

    pub fn metadata(&self, x: usize, z: usize) -> Result<&ChunkMetadata> {
        let index = Self::check_coords(x, z)?;
        Ok(&self.metadata[index])
    }

    /// Metadata of all 1024 slots, in slot order.
    pub fn all_metadata(&self) -> &[ChunkMetadata] {
        &self.metadata
    }

    pub fn status(&self, x: usize, z: usize) -> Result<ChunkStatus> {
        Ok(self.metadata(x, z)?.status)
    }

    /// Number of created slots, corrupt ones included.
    pub fn chunk_count(&self) -> usize {
        self.metadata.iter().filter(|m| m.is_created()).count()
    }

    /// Coordinates of all created slots, in slot order.
    pub fn chunk_coords(&self) -> Vec<(usize, usize)> {
        self.metadata
            .iter()
            .filter(|m| m.is_created())
            .map(|m| (m.x, m.z))
            .collect()
    }

    /// Stored timestamp, which may be set even for slots without data.
    pub fn get_timestamp(&self, x: usize, z: usize) -> Result<u32> {
        Ok(self.metadata(x, z)?.timestamp)
    }

    /// Check a slot against its header-derived faults without reading the
    /// payload. Unlike [`get`](Self::get), a chunk longer than its sectors
    /// is reported as a fault here.
    pub fn validate(&self, x: usize, z: usize) -> Result<ChunkStatus> {
        let m = self.metadata(x, z)?;
        if let Some(err) = header_error(m) {
            return Err(err);
        }
        if m.status == ChunkStatus::MismatchedLengths {
            return Err(RegionError::ChunkHeader {
                x,
                z,
                fault: HeaderFault::MismatchedLength,
            });
        }
        Ok(m.status)
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Decompressed payload of a chunk, without decoding it.
    ///
    /// Reads stop at the end of the container, so a chunk whose declared
    /// length or run reaches past it returns the bytes that exist, as long
    /// as its chunk header is inside the file.
    #[instrument(skip(self), level = "debug")]
    pub fn get_blockdata(&mut self, x: usize, z: usize) -> Result<Vec<u8>> {
        let index = Self::check_coords(x, z)?;
        let m = self.metadata[index].clone();
        let partial_read = m.status == ChunkStatus::OutOfFile && m.compression.is_some();
        if !partial_read {
            if let Some(err) = header_error(&m) {
                return Err(err);
            }
        }
        self.read_payload(&m)
    }

    fn read_payload(&mut self, m: &ChunkMetadata) -> Result<Vec<u8>> {
        let (x, z, status) = (m.x, m.z, m.status);
        let code = m.compression.ok_or(RegionError::RegionHeader {
            x,
            z,
            fault: HeaderFault::OutOfFile,
        })?;

        let wanted = m.length.saturating_sub(1) as u64;
        let raw = self.cursor.read_up_to(m.payload_offset(), wanted)?;
        if (raw.len() as u64) < wanted {
            log_region_warn!(
                "Chunk data cut short by end of file",
                x = x,
                z = z,
                declared = wanted,
                available = raw.len()
            );
        }

        let compression = Compression::from_code(code).ok_or_else(|| RegionError::ChunkData {
            x,
            z,
            status,
            reason: format!("unknown compression type {}", code),
        })?;
        compression
            .decompress(&raw)
            .map_err(|e| RegionError::ChunkData {
                x,
                z,
                status,
                reason: format!("{} decompression failed: {}", compression, e),
            })
    }

    /// Read and decode a chunk. The root tag is always a compound.
    #[instrument(skip(self), level = "debug")]
    pub fn get(&mut self, x: usize, z: usize) -> Result<NamedTag> {
        let index = Self::check_coords(x, z)?;
        let m = self.metadata[index].clone();
        if let Some(err) = header_error(&m) {
            return Err(err);
        }
        let data = self.read_payload(&m)?;
        let tag = tessera_nbt::from_bytes(&data).map_err(|e| RegionError::ChunkData {
            x,
            z,
            status: m.status,
            reason: e.to_string(),
        })?;
        if !tag.is_compound() {
            return Err(RegionError::ChunkData {
                x,
                z,
                status: m.status,
                reason: format!("root tag is {}, expected TAG_Compound", tag.tag_type()),
            });
        }
        Ok(tag)
    }

    /// Iterate over every decodable chunk in slot order.
    pub fn iter_chunks(&mut self) -> ChunkIter<'_, S> {
        ChunkIter {
            region: self,
            next: 0,
        }
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Encode `tag` and store it in slot `(x, z)`, zlib-compressed.
    #[instrument(skip(self, tag), level = "debug")]
    pub fn put(&mut self, x: usize, z: usize, tag: &NamedTag) -> Result<()> {
        let index = Self::check_coords(x, z)?;
        if !tag.is_compound() {
            return Err(RegionError::NotCompound { x, z });
        }
        let data = tessera_nbt::to_bytes(tag)?;
        let payload = Compression::Zlib.compress(&data, self.options.compression_level)?;
        self.place(index, Compression::Zlib, payload)
    }

    /// Store an already-encoded tag stream, zlib-compressed.
    pub fn write_blockdata(&mut self, x: usize, z: usize, data: &[u8]) -> Result<()> {
        self.write_blockdata_with(x, z, data, Compression::Zlib)
    }

    /// Store an already-encoded tag stream with the given compression.
    pub fn write_blockdata_with(
        &mut self,
        x: usize,
        z: usize,
        data: &[u8],
        compression: Compression,
    ) -> Result<()> {
        let index = Self::check_coords(x, z)?;
        let payload = compression.compress(data, self.options.compression_level)?;
        self.place(index, compression, payload)
    }

    fn place(&mut self, index: usize, compression: Compression, payload: Vec<u8>) -> Result<()> {
        let (x, z) = slot_coords(index);
        let length = payload.len() as u64 + 1;
        let required = sectors_for(length + 4);
        if required > MAX_SECTOR_COUNT as u64 || length > u32::MAX as u64 {
            return Err(RegionError::ChunkTooLarge {
                x,
                z,
                sectors: required,
            });
        }

        let start = self.find_placement(index, required);
        if start > MAX_SECTOR_OFFSET as u64 {
            return Err(RegionError::RegionFull { x, z });
        }
        let old = self.metadata[index].clone();
        let new_run = start..start + required;

        // Grow first; set_len zero-fills the header of an empty container.
        let new_end = new_run.end * SECTOR_BYTES;
        let current = self.cursor.len()?;
        if current < new_end {
            self.cursor.set_len(new_end)?;
        }

        let mut block = Vec::with_capacity((required * SECTOR_BYTES) as usize);
        block.extend_from_slice(
            &ChunkHeader {
                length: length as u32,
                compression: compression.code(),
            }
            .to_bytes(),
        );
        block.extend_from_slice(&payload);
        block.resize((required * SECTOR_BYTES) as usize, 0);
        self.cursor.write_at(start * SECTOR_BYTES, &block)?;
        if self.options.sync_writes {
            self.cursor.sync()?;
        }

        self.write_entry(
            index,
            HeaderEntry {
                sector_start: start as u32,
                sector_length: required as u32,
                timestamp: unix_now(),
            },
        )?;

        let file_sectors = sectors_for(self.cursor.len()?);
        let others = self.claimed_by_others(index, file_sectors);
        let freed: Vec<u64> = old
            .claimed_range(file_sectors)
            .filter(|sector| !new_run.contains(sector) && !is_claimed(&others, *sector))
            .collect();
        self.zero_sectors(&freed)?;
        if self.options.sync_writes {
            self.cursor.sync()?;
        }

        log_region_debug!(
            "Chunk placed",
            x = x,
            z = z,
            sector = start,
            sectors = required,
            moved = (old.is_created() && old.sector_start as u64 != start),
            freed = freed.len()
        );

        self.refresh()?;
        self.truncate_free_tail()
    }

    /// First sector of the run chunk `index` will be written to.
    ///
    /// A chunk whose run is known to be exclusive keeps its start sector
    /// when the new run does not collide with another chunk. Otherwise the
    /// first gap between other chunks that fits wins, else the chunk goes
    /// after the last reserved sector. Runs declared past the container end
    /// stay reserved, so growing the container never revives a stale slot
    /// on top of the new chunk.
    fn find_placement(&self, index: usize, required: u64) -> u64 {
        let file_sectors = sectors_for(self.size);
        let mut others = self.reserved_by_others(index, file_sectors);

        let current = &self.metadata[index];
        if matches!(
            current.status,
            ChunkStatus::Ok | ChunkStatus::MismatchedLengths
        ) {
            let start = current.sector_start as u64;
            let run = start..start + required;
            if !others.iter().any(|r| r.start < run.end && run.start < r.end) {
                return start;
            }
        }

        others.sort_by_key(|r| r.start);
        let mut cursor = HEADER_SECTORS as u64;
        for run in &others {
            if run.start >= cursor + required {
                return cursor;
            }
            cursor = cursor.max(run.end);
        }
        cursor
    }

    /// Non-empty sector ranges held by every slot except `index`.
    fn claimed_by_others(&self, index: usize, file_sectors: u64) -> Vec<Range<u64>> {
        self.metadata
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != index)
            .map(|(_, m)| m.claimed_range(file_sectors))
            .filter(|r| !r.is_empty())
            .collect()
    }

    /// Non-empty sector ranges every slot except `index` keeps from
    /// placement, including runs past the container end.
    fn reserved_by_others(&self, index: usize, file_sectors: u64) -> Vec<Range<u64>> {
        self.metadata
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != index)
            .map(|(_, m)| m.reserved_range(file_sectors))
            .filter(|r| !r.is_empty())
            .collect()
    }

    fn write_entry(&mut self, index: usize, entry: HeaderEntry) -> Result<()> {
        let at = index as u64 * 4;
        self.cursor.write_at(at, &entry.location_bytes())?;
        self.cursor
            .write_at(SECTOR_BYTES + at, &entry.timestamp_bytes())?;
        Ok(())
    }

    fn zero_sectors(&mut self, sectors: &[u64]) -> Result<()> {
        for sector in sectors {
            self.cursor.zero_range(sector * SECTOR_BYTES, SECTOR_BYTES)?;
        }
        Ok(())
    }

    /// Remove a chunk and its timestamp, zeroing sectors no other chunk uses.
    ///
    /// Deleting from an empty (0-byte) region does nothing.
    #[instrument(skip(self), level = "debug")]
    pub fn delete(&mut self, x: usize, z: usize) -> Result<()> {
        let index = Self::check_coords(x, z)?;
        if self.size == 0 {
            return Ok(());
        }

        let old = self.metadata[index].clone();
        self.write_entry(index, HeaderEntry::default())?;

        let file_sectors = sectors_for(self.size);
        let others = self.claimed_by_others(index, file_sectors);
        let freed: Vec<u64> = old
            .claimed_range(file_sectors)
            .filter(|sector| !is_claimed(&others, *sector))
            .collect();
        self.zero_sectors(&freed)?;
        if self.options.sync_writes {
            self.cursor.sync()?;
        }

        if old.is_created() {
            log_region_debug!(
                "Chunk deleted",
                x = x,
                z = z,
                status = old.status.name(),
                freed = freed.len()
            );
        }

        self.refresh()?;
        self.truncate_free_tail()
    }

    /// First sector past every byte a created chunk may use.
    fn logical_end(&self) -> u64 {
        let file_sectors = sectors_for(self.size);
        self.metadata
            .iter()
            .map(|m| m.claimed_range(file_sectors))
            .filter(|r| !r.is_empty())
            .map(|r| r.end)
            .max()
            .unwrap_or(0)
            .max(HEADER_SECTORS as u64)
    }

    /// Drop trailing sectors no chunk uses. Never grows the container.
    fn truncate_free_tail(&mut self) -> Result<()> {
        let end = self.logical_end() * SECTOR_BYTES;
        if self.size > end {
            log_region_info!("Truncating region", from = self.size, to = end);
            self.cursor.set_len(end)?;
            self.refresh()?;
        }
        Ok(())
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Flush outstanding writes and release the storage.
    pub fn close(mut self) -> Result<()> {
        self.cursor.sync()?;
        Ok(())
    }

    pub fn get_ref(&self) -> &S {
        self.cursor.get_ref()
    }

    pub fn into_inner(self) -> S {
        self.cursor.into_inner()
    }
}

/// Format or lookup error implied by a slot's status, if any.
fn header_error(m: &ChunkMetadata) -> Option<RegionError> {
    let (x, z) = (m.x, m.z);
    let region_header = |fault| RegionError::RegionHeader { x, z, fault };
    match m.status {
        ChunkStatus::NotCreated => Some(RegionError::InconceivedChunk { x, z }),
        ChunkStatus::InHeader => Some(region_header(HeaderFault::InHeader)),
        ChunkStatus::OutOfFile => Some(region_header(HeaderFault::OutOfFile)),
        ChunkStatus::ZeroLength if m.sector_length == 0 => {
            Some(region_header(HeaderFault::ZeroLength))
        }
        ChunkStatus::ZeroLength => Some(RegionError::ChunkHeader {
            x,
            z,
            fault: HeaderFault::ZeroLength,
        }),
        ChunkStatus::Ok | ChunkStatus::MismatchedLengths | ChunkStatus::Overlapping => None,
    }
}

fn is_claimed(ranges: &[Range<u64>], sector: u64) -> bool {
    ranges.iter().any(|r| r.contains(&sector))
}

fn unix_now() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().min(u32::MAX as u64) as u32)
        .unwrap_or(0)
}

/// Lazily decodes the chunks of a region, skipping unreadable slots.
pub struct ChunkIter<'a, S: RegionStorage> {
    region: &'a mut RegionFile<S>,
    next: usize,
}

impl<S: RegionStorage> Iterator for ChunkIter<'_, S> {
    type Item = ChunkEntry;

    fn next(&mut self) -> Option<Self::Item> {
        while self.next < SLOT_COUNT {
            let index = self.next;
            self.next += 1;
            if !self.region.metadata[index].status.is_readable() {
                continue;
            }
            let (x, z) = slot_coords(index);
            match self.region.get(x, z) {
                Ok(tag) => return Some(ChunkEntry { x, z, tag }),
                Err(e) => {
                    log_region_debug!(
                        "Skipping unreadable chunk",
                        x = x,
                        z = z,
                        error = field::display(&e)
                    );
                }
            }
        }
        None
    }
}

impl<'a, S: RegionStorage> IntoIterator for &'a mut RegionFile<S> {
    type Item = ChunkEntry;
    type IntoIter = ChunkIter<'a, S>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_chunks()
    }
}
