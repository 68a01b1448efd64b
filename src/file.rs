//! Narrow file traits the table builder and reader are written against, so tests can swap in an
//! in-memory buffer instead of touching disk.

use std::fs::File;
use std::io::{self, Write};
use std::os::unix::fs::FileExt;

/// A file that can be read at arbitrary offsets without disturbing any other reader of the same
/// file (no shared cursor).
pub trait RandomAccessFile {
    fn read_at(&self, offset: u64, len: usize, buf: &mut Vec<u8>) -> io::Result<()>;
    fn len(&self) -> io::Result<u64>;
}

/// A file that is only ever appended to, in the order a table builder writes it.
pub trait WritableFile: Write {
    fn sync(&mut self) -> io::Result<()>;
}

impl RandomAccessFile for File {
    fn read_at(&self, offset: u64, len: usize, buf: &mut Vec<u8>) -> io::Result<()> {
        buf.resize(len, 0);
        let mut read = 0;
        while read < len {
            let n = FileExt::read_at(self, &mut buf[read..], offset + read as u64)?;
            if n == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "short read from file",
                ));
            }
            read += n;
        }
        Ok(())
    }

    fn len(&self) -> io::Result<u64> {
        Ok(self.metadata()?.len())
    }
}

impl WritableFile for File {
    fn sync(&mut self) -> io::Result<()> {
        self.sync_all()
    }
}

/// An in-memory stand-in for a table file, used in tests and by callers that want to build a
/// table entirely in memory.
impl RandomAccessFile for Vec<u8> {
    fn read_at(&self, offset: u64, len: usize, buf: &mut Vec<u8>) -> io::Result<()> {
        let offset = offset as usize;
        if offset + len > self.len() {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "short read from in-memory file",
            ));
        }
        buf.clear();
        buf.extend_from_slice(&self[offset..offset + len]);
        Ok(())
    }

    fn len(&self) -> io::Result<u64> {
        Ok(<[u8]>::len(self) as u64)
    }
}

impl WritableFile for Vec<u8> {
    fn sync(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<T: WritableFile + ?Sized> WritableFile for &mut T {
    fn sync(&mut self) -> io::Result<()> {
        (**self).sync()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec_random_access() {
        let data: Vec<u8> = (0..32u8).collect();
        let mut buf = Vec::new();
        data.read_at(4, 8, &mut buf).unwrap();
        assert_eq!(buf, (4..12u8).collect::<Vec<u8>>());
    }

    #[test]
    fn test_vec_read_past_end_errors() {
        let data: Vec<u8> = vec![0u8; 4];
        let mut buf = Vec::new();
        assert!(data.read_at(0, 8, &mut buf).is_err());
    }
}
