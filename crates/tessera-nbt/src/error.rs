use std::io;

use thiserror::Error;

/// Errors that can occur while encoding or decoding a tag tree
#[derive(Error, Debug)]
pub enum NbtError {
    /// The byte stream is not a valid tag tree: premature end of stream,
    /// an unknown type code, a negative length, bad string bytes, or
    /// nesting beyond [`crate::MAX_DEPTH`].
    #[error("Malformed tag data: {0}")]
    Malformed(String),

    /// The in-memory tree cannot be represented on the wire.
    #[error("Cannot encode tag: {0}")]
    Unencodable(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl NbtError {
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        NbtError::Malformed(msg.into())
    }

    pub(crate) fn unencodable(msg: impl Into<String>) -> Self {
        NbtError::Unencodable(msg.into())
    }

    /// Map a read-side I/O error. A short stream is a malformed stream,
    /// anything else is a genuine I/O failure of the underlying reader.
    pub(crate) fn from_read(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            NbtError::malformed("unexpected end of stream")
        } else {
            NbtError::Io(err)
        }
    }

    /// True for every decode-side failure caused by the bytes themselves.
    pub fn is_malformed(&self) -> bool {
        matches!(self, NbtError::Malformed(_))
    }
}

pub type Result<T> = std::result::Result<T, NbtError>;
