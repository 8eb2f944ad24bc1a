//! Slot status classification.
//!
//! Every slot gets exactly one status. Checks run in priority order and the
//! first failing check wins:
//!
//! 1. `NotCreated`: sector offset is zero
//! 2. `InHeader`: sector offset is one
//! 3. `OutOfFile`: chunk header or declared run lies past the container end
//! 4. `ZeroLength`: sector count is zero, or the chunk holds no payload byte
//! 5. `MismatchedLengths`: chunk length exceeds its declared run
//! 6. `Overlapping`: declared runs of two survivors of 1-5 intersect
//! 7. `Ok`

use std::fmt;

use crate::metadata::{
    sectors_for, ChunkHeader, ChunkMetadata, HeaderEntry, CHUNK_HEADER_BYTES, SECTOR_BYTES,
    SLOT_COUNT,
};

/// Health of a single chunk slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChunkStatus {
    Ok,
    NotCreated,
    InHeader,
    OutOfFile,
    ZeroLength,
    MismatchedLengths,
    Overlapping,
}

const STATUS_NAMES: [(ChunkStatus, &str); 7] = [
    (ChunkStatus::Ok, "ok"),
    (ChunkStatus::NotCreated, "not created"),
    (ChunkStatus::InHeader, "in header"),
    (ChunkStatus::OutOfFile, "out of file"),
    (ChunkStatus::ZeroLength, "zero length"),
    (ChunkStatus::MismatchedLengths, "mismatched lengths"),
    (ChunkStatus::Overlapping, "overlapping"),
];

impl ChunkStatus {
    pub fn name(self) -> &'static str {
        STATUS_NAMES[self as usize].1
    }

    /// Numeric status code used by older region tooling.
    pub fn code(self) -> i8 {
        match self {
            ChunkStatus::Overlapping => -5,
            ChunkStatus::MismatchedLengths => -4,
            ChunkStatus::ZeroLength => -3,
            ChunkStatus::InHeader => -2,
            ChunkStatus::OutOfFile => -1,
            ChunkStatus::Ok => 0,
            ChunkStatus::NotCreated => 1,
        }
    }

    pub fn from_code(code: i8) -> Option<Self> {
        STATUS_NAMES
            .iter()
            .map(|(status, _)| *status)
            .find(|status| status.code() == code)
    }

    /// Whether a read is attempted for this status.
    pub fn is_readable(self) -> bool {
        matches!(
            self,
            ChunkStatus::Ok | ChunkStatus::MismatchedLengths | ChunkStatus::Overlapping
        )
    }

    pub fn is_created(self) -> bool {
        self != ChunkStatus::NotCreated
    }
}

impl fmt::Display for ChunkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Status from the location entry alone, or `None` when the chunk header
/// decides.
fn location_status(file_size: u64, entry: &HeaderEntry) -> Option<ChunkStatus> {
    if entry.sector_start == 0 {
        return Some(ChunkStatus::NotCreated);
    }
    if entry.sector_start == 1 {
        return Some(ChunkStatus::InHeader);
    }
    let file_sectors = sectors_for(file_size);
    let run_end = entry.sector_start as u64 + entry.sector_length as u64;
    if entry.byte_offset() + CHUNK_HEADER_BYTES > file_size || run_end > file_sectors {
        return Some(ChunkStatus::OutOfFile);
    }
    if entry.sector_length == 0 {
        return Some(ChunkStatus::ZeroLength);
    }
    None
}

/// Classify all slots of a container of `file_size` bytes.
///
/// `headers[i]` is the chunk header stored at slot `i`'s location, read by
/// the caller for every slot where [`HeaderEntry::needs_chunk_header`]
/// holds. Headers of slots that fail the location checks are still kept in
/// the returned metadata.
pub fn classify(
    file_size: u64,
    entries: &[HeaderEntry; SLOT_COUNT],
    headers: &[Option<ChunkHeader>; SLOT_COUNT],
) -> Vec<ChunkMetadata> {
    let mut metadata: Vec<ChunkMetadata> = entries
        .iter()
        .zip(headers.iter())
        .enumerate()
        .map(|(index, (entry, header))| {
            let mut m = ChunkMetadata::from_entry(index, entry);
            if entry.sector_start >= 2 {
                if let Some(header) = header {
                    m.length = header.length;
                    m.compression = Some(header.compression);
                }
            }
            m.status = match location_status(file_size, entry) {
                Some(status) => status,
                None => match header {
                    // The caller could not read the chunk header.
                    None => ChunkStatus::OutOfFile,
                    Some(h) if h.length <= 1 => ChunkStatus::ZeroLength,
                    Some(h) if h.length as u64 + 4 > entry.sector_length as u64 * SECTOR_BYTES => {
                        ChunkStatus::MismatchedLengths
                    }
                    Some(_) => ChunkStatus::Ok,
                },
            };
            m
        })
        .collect();

    mark_overlaps(file_size, &mut metadata);
    metadata
}

/// Reclassify survivors whose declared runs share a sector.
fn mark_overlaps(file_size: u64, metadata: &mut [ChunkMetadata]) {
    let file_sectors = sectors_for(file_size) as usize;
    // Survivors lie inside the file, so a per-sector owner table suffices.
    let mut owner: Vec<Option<usize>> = vec![None; file_sectors];
    let mut overlapping = vec![false; metadata.len()];

    for (index, m) in metadata.iter().enumerate() {
        if !matches!(m.status, ChunkStatus::Ok | ChunkStatus::MismatchedLengths) {
            continue;
        }
        for sector in m.sector_range() {
            let slot = &mut owner[sector as usize];
            match slot {
                Some(other) => {
                    overlapping[*other] = true;
                    overlapping[index] = true;
                }
                None => *slot = Some(index),
            }
        }
    }

    for (m, flagged) in metadata.iter_mut().zip(overlapping) {
        if flagged {
            m.status = ChunkStatus::Overlapping;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::slot_index;

    fn empty_tables() -> (Box<[HeaderEntry; SLOT_COUNT]>, Box<[Option<ChunkHeader>; SLOT_COUNT]>) {
        (
            Box::new([HeaderEntry::default(); SLOT_COUNT]),
            Box::new([None; SLOT_COUNT]),
        )
    }

    fn place(
        entries: &mut [HeaderEntry; SLOT_COUNT],
        headers: &mut [Option<ChunkHeader>; SLOT_COUNT],
        index: usize,
        start: u32,
        count: u32,
        length: Option<u32>,
    ) {
        entries[index] = HeaderEntry {
            sector_start: start,
            sector_length: count,
            timestamp: 1,
        };
        headers[index] = length.map(|length| ChunkHeader {
            length,
            compression: 2,
        });
    }

    #[test]
    fn test_all_not_created() {
        let (entries, headers) = empty_tables();
        let metadata = classify(0, &entries, &headers);
        assert_eq!(metadata.len(), SLOT_COUNT);
        assert!(metadata.iter().all(|m| m.status == ChunkStatus::NotCreated));
    }

    #[test]
    fn test_priority_order() {
        let (mut entries, mut headers) = empty_tables();
        let size = 10 * 4096;
        place(&mut entries, &mut headers, 0, 1, 1, None);
        place(&mut entries, &mut headers, 1, 12, 1, None);
        place(&mut entries, &mut headers, 2, 9, 2, None);
        place(&mut entries, &mut headers, 3, 3, 0, None);
        place(&mut entries, &mut headers, 4, 4, 1, Some(1));
        place(&mut entries, &mut headers, 5, 5, 1, Some(4093));
        place(&mut entries, &mut headers, 6, 6, 1, Some(100));

        let m = classify(size, &entries, &headers);
        assert_eq!(m[0].status, ChunkStatus::InHeader);
        assert_eq!(m[1].status, ChunkStatus::OutOfFile);
        assert_eq!(m[2].status, ChunkStatus::OutOfFile);
        assert_eq!(m[3].status, ChunkStatus::ZeroLength);
        assert_eq!(m[4].status, ChunkStatus::ZeroLength);
        assert_eq!(m[5].status, ChunkStatus::MismatchedLengths);
        assert_eq!(m[6].status, ChunkStatus::Ok);
        assert_eq!(m[6].length, 100);
        assert_eq!(m[7].status, ChunkStatus::NotCreated);
    }

    #[test]
    fn test_missing_tail_padding_tolerated() {
        let (mut entries, mut headers) = empty_tables();
        place(&mut entries, &mut headers, 0, 2, 1, Some(39));
        let m = classify(8235, &entries, &headers);
        assert_eq!(m[0].status, ChunkStatus::Ok);
    }

    #[test]
    fn test_overlap_marks_both() {
        let (mut entries, mut headers) = empty_tables();
        let a = slot_index(4, 0);
        let b = slot_index(12, 0);
        let c = slot_index(13, 0);
        place(&mut entries, &mut headers, a, 14, 3, Some(200));
        place(&mut entries, &mut headers, b, 15, 1, Some(200));
        // Zero-length slots do not take part in overlap detection.
        place(&mut entries, &mut headers, c, 16, 0, None);
        let m = classify(27 * 4096, &entries, &headers);
        assert_eq!(m[a].status, ChunkStatus::Overlapping);
        assert_eq!(m[b].status, ChunkStatus::Overlapping);
        assert_eq!(m[c].status, ChunkStatus::ZeroLength);
        assert!(m[a].status.is_readable());
    }

    #[test]
    fn test_out_of_file_keeps_chunk_header() {
        let (mut entries, mut headers) = empty_tables();
        place(&mut entries, &mut headers, 0, 2, 4, Some(10240));
        let m = classify(16384, &entries, &headers);
        assert_eq!(m[0].status, ChunkStatus::OutOfFile);
        assert_eq!(m[0].length, 10240);
        assert_eq!(m[0].compression, Some(2));
    }

    #[test]
    fn test_status_codes_and_names() {
        assert_eq!(ChunkStatus::Overlapping.code(), -5);
        assert_eq!(ChunkStatus::NotCreated.code(), 1);
        assert_eq!(ChunkStatus::from_code(-4), Some(ChunkStatus::MismatchedLengths));
        assert_eq!(ChunkStatus::from_code(7), None);
        assert_eq!(ChunkStatus::OutOfFile.to_string(), "out of file");
        assert!(!ChunkStatus::ZeroLength.is_readable());
        assert!(ChunkStatus::MismatchedLengths.is_readable());
    }
}
