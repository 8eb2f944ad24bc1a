use std::fmt;
use std::io;

use tessera_nbt::NbtError;
use thiserror::Error;

use crate::status::ChunkStatus;

/// Header-level defect of a single slot, derived from header bytes alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderFault {
    InHeader,
    OutOfFile,
    ZeroLength,
    MismatchedLength,
}

impl fmt::Display for HeaderFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HeaderFault::InHeader => "chunk is located inside the region header",
            HeaderFault::OutOfFile => "chunk is located beyond the end of the file",
            HeaderFault::ZeroLength => "chunk has zero length",
            HeaderFault::MismatchedLength => "chunk length exceeds its allocated sectors",
        })
    }
}

/// Broad error classes callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Header bytes are inconsistent; no payload was touched.
    Format,
    /// Payload bytes could not be decompressed or decoded.
    Data,
    /// The slot has never been written, or its region file does not exist.
    Lookup,
    /// A write was rejected before any byte changed.
    Write,
    /// The caller passed an impossible argument.
    Usage,
    Io,
}

/// Errors that can occur during region operations
#[derive(Error, Debug)]
pub enum RegionError {
    #[error("No region header: file is {size} bytes, at least 8192 required")]
    NoRegionHeader { size: u64 },

    #[error("Region header error for chunk ({x}, {z}): {fault}")]
    RegionHeader { x: usize, z: usize, fault: HeaderFault },

    #[error("Chunk header error for chunk ({x}, {z}): {fault}")]
    ChunkHeader { x: usize, z: usize, fault: HeaderFault },

    #[error("Chunk data error for chunk ({x}, {z}) with status {status}: {reason}")]
    ChunkData {
        x: usize,
        z: usize,
        status: ChunkStatus,
        reason: String,
    },

    #[error("Chunk ({x}, {z}) is not present in the region")]
    InconceivedChunk { x: usize, z: usize },

    #[error("Chunk ({x}, {z}) lies in region file {file}, which does not exist")]
    MissingRegion { x: i32, z: i32, file: String },

    #[error("Chunk ({x}, {z}) needs {sectors} sectors, at most 255 are addressable")]
    ChunkTooLarge { x: usize, z: usize, sectors: u64 },

    #[error("No addressable space left in region for chunk ({x}, {z})")]
    RegionFull { x: usize, z: usize },

    #[error("Chunk ({x}, {z}) root tag must be a compound")]
    NotCompound { x: usize, z: usize },

    #[error("Chunk coordinates ({x}, {z}) out of range 0..32")]
    InvalidCoordinates { x: usize, z: usize },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Tag encoding error: {0}")]
    Nbt(#[from] NbtError),
}

impl RegionError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            RegionError::NoRegionHeader { .. }
            | RegionError::RegionHeader { .. }
            | RegionError::ChunkHeader { .. } => ErrorCategory::Format,
            RegionError::ChunkData { .. } => ErrorCategory::Data,
            RegionError::InconceivedChunk { .. } | RegionError::MissingRegion { .. } => {
                ErrorCategory::Lookup
            }
            RegionError::ChunkTooLarge { .. }
            | RegionError::RegionFull { .. }
            | RegionError::NotCompound { .. }
            | RegionError::Nbt(_) => ErrorCategory::Write,
            RegionError::InvalidCoordinates { .. } => ErrorCategory::Usage,
            RegionError::Io(_) => ErrorCategory::Io,
        }
    }

    pub fn is_format_error(&self) -> bool {
        self.category() == ErrorCategory::Format
    }

    pub fn is_data_error(&self) -> bool {
        self.category() == ErrorCategory::Data
    }

    pub fn is_lookup_error(&self) -> bool {
        self.category() == ErrorCategory::Lookup
    }

    /// Header fault carried by a format error, if any.
    pub fn header_fault(&self) -> Option<HeaderFault> {
        match self {
            RegionError::RegionHeader { fault, .. } | RegionError::ChunkHeader { fault, .. } => {
                Some(*fault)
            }
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, RegionError>;
