//! Gzip-framed tag files (level and player data live in these).

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::decode::decode;
use crate::encode::encode;
use crate::error::{NbtError, Result};
use crate::tag::NamedTag;

/// Decode a gzip-compressed tag stream.
pub fn from_gzip_reader<R: Read>(reader: R) -> Result<NamedTag> {
    let mut decoder = GzDecoder::new(reader);
    decode(&mut decoder).map_err(|e| match e {
        // flate2 reports corrupt gzip framing as InvalidInput/InvalidData.
        NbtError::Io(io) => NbtError::malformed(format!("gzip stream: {}", io)),
        other => other,
    })
}

/// Encode `root` as a gzip-compressed tag stream.
pub fn to_gzip_writer<W: Write>(root: &NamedTag, writer: W) -> Result<W> {
    let mut encoder = GzEncoder::new(writer, Compression::default());
    encode(root, &mut encoder)?;
    Ok(encoder.finish()?)
}

/// Read a gzip-compressed tag file from disk.
pub fn read_gzip_file<P: AsRef<Path>>(path: P) -> Result<NamedTag> {
    let file = File::open(path)?;
    from_gzip_reader(BufReader::new(file))
}

/// Write `root` to disk as a gzip-compressed tag file.
pub fn write_gzip_file<P: AsRef<Path>>(path: P, root: &NamedTag) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = to_gzip_writer(root, BufWriter::new(file))?;
    writer.flush()?;
    Ok(())
}
