//! Backing storage for region containers.
//!
//! All container I/O goes through [`SectorCursor`], which addresses the
//! storage by absolute byte offset and never reads past its end.

use std::fs::File;
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};

/// Random-access byte container a region lives in.
pub trait RegionStorage: Read + Write + Seek {
    /// Truncate or zero-extend to exactly `len` bytes.
    fn set_len(&mut self, len: u64) -> io::Result<()>;

    /// Make previous writes durable.
    fn sync(&mut self) -> io::Result<()> {
        self.flush()
    }
}

impl RegionStorage for File {
    fn set_len(&mut self, len: u64) -> io::Result<()> {
        File::set_len(self, len)
    }

    fn sync(&mut self) -> io::Result<()> {
        self.sync_data()
    }
}

impl RegionStorage for Cursor<Vec<u8>> {
    fn set_len(&mut self, len: u64) -> io::Result<()> {
        let len = usize::try_from(len).map_err(|_| io::Error::other("length exceeds memory"))?;
        self.get_mut().resize(len, 0);
        Ok(())
    }
}

const ZERO_BLOCK: [u8; 4096] = [0u8; 4096];

/// Offset-addressed view over a [`RegionStorage`].
#[derive(Debug)]
pub struct SectorCursor<S> {
    inner: S,
}

impl<S: RegionStorage> SectorCursor<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    /// Current container length in bytes.
    pub fn len(&mut self) -> io::Result<u64> {
        self.inner.seek(SeekFrom::End(0))
    }

    /// Fill `buf` from `offset`; fails if the container ends first.
    pub fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        self.inner.seek(SeekFrom::Start(offset))?;
        self.inner.read_exact(buf)
    }

    /// Read at most `max` bytes from `offset`, stopping at the container end.
    pub fn read_up_to(&mut self, offset: u64, max: u64) -> io::Result<Vec<u8>> {
        let len = self.len()?;
        let available = len.saturating_sub(offset).min(max);
        let mut buf = vec![0u8; available as usize];
        if available > 0 {
            self.read_at(offset, &mut buf)?;
        }
        Ok(buf)
    }

    pub fn write_at(&mut self, offset: u64, data: &[u8]) -> io::Result<()> {
        self.inner.seek(SeekFrom::Start(offset))?;
        self.inner.write_all(data)
    }

    /// Overwrite `len` bytes at `offset` with zeroes.
    pub fn zero_range(&mut self, offset: u64, len: u64) -> io::Result<()> {
        self.inner.seek(SeekFrom::Start(offset))?;
        let mut remaining = len;
        while remaining > 0 {
            let n = remaining.min(ZERO_BLOCK.len() as u64) as usize;
            self.inner.write_all(&ZERO_BLOCK[..n])?;
            remaining -= n as u64;
        }
        Ok(())
    }

    pub fn set_len(&mut self, len: u64) -> io::Result<()> {
        self.inner.set_len(len)
    }

    pub fn sync(&mut self) -> io::Result<()> {
        self.inner.flush()?;
        self.inner.sync()
    }

    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_storage_resize() {
        let mut cursor = SectorCursor::new(Cursor::new(vec![1u8; 10]));
        assert_eq!(cursor.len().unwrap(), 10);
        cursor.set_len(16).unwrap();
        assert_eq!(cursor.len().unwrap(), 16);
        assert_eq!(cursor.read_up_to(8, 100).unwrap(), vec![1, 1, 0, 0, 0, 0, 0, 0]);
        cursor.set_len(4).unwrap();
        assert_eq!(cursor.into_inner().into_inner(), vec![1u8; 4]);
    }

    #[test]
    fn test_read_up_to_clamps() {
        let mut cursor = SectorCursor::new(Cursor::new((0u8..20).collect::<Vec<_>>()));
        assert_eq!(cursor.read_up_to(15, 3).unwrap(), vec![15, 16, 17]);
        assert_eq!(cursor.read_up_to(18, 1 << 30).unwrap(), vec![18, 19]);
        assert!(cursor.read_up_to(40, 5).unwrap().is_empty());
    }

    #[test]
    fn test_read_at_past_end_fails() {
        let mut cursor = SectorCursor::new(Cursor::new(vec![0u8; 4]));
        let mut buf = [0u8; 8];
        let err = cursor.read_at(0, &mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_zero_range_and_write_extend() {
        let mut cursor = SectorCursor::new(Cursor::new(vec![0xffu8; 8192]));
        cursor.zero_range(100, 5000).unwrap();
        cursor.write_at(8190, &[7, 7, 7, 7]).unwrap();
        let data = cursor.into_inner().into_inner();
        assert_eq!(data.len(), 8194);
        assert_eq!(data[99], 0xff);
        assert!(data[100..5100].iter().all(|b| *b == 0));
        assert_eq!(data[5100], 0xff);
        assert_eq!(&data[8190..], &[7, 7, 7, 7]);
    }

    #[test]
    fn test_file_storage() {
        let temp = tempfile::tempfile().unwrap();
        let mut cursor = SectorCursor::new(temp);
        cursor.set_len(4096).unwrap();
        cursor.write_at(10, b"abc").unwrap();
        cursor.sync().unwrap();
        let mut buf = [0u8; 3];
        cursor.read_at(10, &mut buf).unwrap();
        assert_eq!(&buf, b"abc");
        assert_eq!(cursor.len().unwrap(), 4096);
    }
}
