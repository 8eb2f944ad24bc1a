use std::fmt;
use std::io::{self, Read, Write};

use flate2::read::{GzDecoder, ZlibDecoder};
use flate2::write::{GzEncoder, ZlibEncoder};
use tessera_config::log_codec_debug;

/// Payload compression, stored as the byte after a chunk's length field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Compression {
    Raw = 0,
    Gzip = 1,
    Zlib = 2,
}

impl Compression {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Compression::Raw),
            1 => Some(Compression::Gzip),
            2 => Some(Compression::Zlib),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    /// Compress `data` at `level` (0-9, clamped).
    pub fn compress(self, data: &[u8], level: u32) -> io::Result<Vec<u8>> {
        let level = flate2::Compression::new(level.min(9));
        let out = match self {
            Compression::Raw => data.to_vec(),
            Compression::Gzip => {
                let mut encoder = GzEncoder::new(Vec::new(), level);
                encoder.write_all(data)?;
                encoder.finish()?
            }
            Compression::Zlib => {
                let mut encoder = ZlibEncoder::new(Vec::new(), level);
                encoder.write_all(data)?;
                encoder.finish()?
            }
        };
        log_codec_debug!(
            "Compressed payload",
            compression = self.code(),
            input = data.len(),
            output = out.len()
        );
        Ok(out)
    }

    pub fn decompress(self, data: &[u8]) -> io::Result<Vec<u8>> {
        let mut buffer = Vec::new();
        match self {
            Compression::Raw => buffer.extend_from_slice(data),
            Compression::Gzip => {
                GzDecoder::new(data).read_to_end(&mut buffer)?;
            }
            Compression::Zlib => {
                ZlibDecoder::new(data).read_to_end(&mut buffer)?;
            }
        }
        Ok(buffer)
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Compression::Raw => "raw",
            Compression::Gzip => "gzip",
            Compression::Zlib => "zlib",
        })
    }
}
