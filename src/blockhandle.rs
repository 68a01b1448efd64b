//! `BlockHandle` addresses a block within a table file; `Footer` is the fixed-size trailer
//! that bootstraps a reader straight to the index block.

use integer_encoding::VarInt;

use crate::error::{Status, StatusCode};
use crate::Result;

/// Offset and size of a block inside a table, excluding the 5-byte trailer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHandle {
    offset: u64,
    size: u64,
}

impl BlockHandle {
    /// Max bytes a `BlockHandle` can take up once encoded (two varint64s).
    pub const MAX_ENCODED_LENGTH: usize = 20;

    pub fn new(offset: u64, size: u64) -> BlockHandle {
        BlockHandle { offset, size }
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Decodes a block handle from the front of `from`, returning it along with how many bytes
    /// were consumed.
    pub fn decode(from: &[u8]) -> Result<(BlockHandle, usize)> {
        let (offset, off_len) = u64::decode_var(from)
            .ok_or_else(|| Status::corruption("bad block handle (offset)"))?;
        let (size, size_len) = u64::decode_var(&from[off_len..])
            .ok_or_else(|| Status::corruption("bad block handle (size)"))?;
        Ok((BlockHandle::new(offset, size), off_len + size_len))
    }

    /// Encodes this handle to `dst`, returning the number of bytes written.
    pub fn encode_to(&self, dst: &mut [u8]) -> usize {
        let off_len = self.offset.encode_var(dst);
        off_len + self.size.encode_var(&mut dst[off_len..])
    }

    /// Encodes this handle into a freshly allocated buffer.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = [0u8; BlockHandle::MAX_ENCODED_LENGTH];
        let n = self.encode_to(&mut buf);
        buf[..n].to_vec()
    }
}

/// The fixed trailer at the end of a table file: a pointer to the index block, padded out to a
/// constant size, followed by the format's magic number.
#[derive(Debug, Clone, Copy)]
pub struct Footer {
    pub index_handle: BlockHandle,
}

/// `index_handle` padded to 40 bytes, then an 8-byte magic number.
pub const FOOTER_LENGTH: usize = 40;
pub const FULL_FOOTER_LENGTH: usize = FOOTER_LENGTH + 8;
pub const MAGIC: u64 = 0xdb47_7524_8b80_fb57;

impl Footer {
    pub fn new(index_handle: BlockHandle) -> Footer {
        Footer { index_handle }
    }

    pub fn decode(from: &[u8]) -> Result<Footer> {
        if from.len() < FULL_FOOTER_LENGTH {
            return Err(Status::corruption("truncated footer"));
        }
        let magic_lo = u32::from_le_bytes(from[FOOTER_LENGTH..FOOTER_LENGTH + 4].try_into().unwrap());
        let magic_hi =
            u32::from_le_bytes(from[FOOTER_LENGTH + 4..FOOTER_LENGTH + 8].try_into().unwrap());
        let magic = (u64::from(magic_hi) << 32) | u64::from(magic_lo);
        if magic != MAGIC {
            return Err(Status::new(
                StatusCode::Corruption,
                "not an sstable (bad magic number)",
            ));
        }

        let (index_handle, _) = BlockHandle::decode(from)?;
        Ok(Footer { index_handle })
    }

    /// Encodes the footer into a buffer of exactly `FULL_FOOTER_LENGTH` bytes.
    pub fn encode(&self) -> [u8; FULL_FOOTER_LENGTH] {
        let mut buf = [0u8; FULL_FOOTER_LENGTH];
        let n = self.index_handle.encode_to(&mut buf);
        for b in buf.iter_mut().take(FOOTER_LENGTH).skip(n) {
            *b = 0;
        }
        buf[FOOTER_LENGTH..FOOTER_LENGTH + 4].copy_from_slice(&(MAGIC as u32).to_le_bytes());
        buf[FOOTER_LENGTH + 4..FULL_FOOTER_LENGTH]
            .copy_from_slice(&((MAGIC >> 32) as u32).to_le_bytes());
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blockhandle_roundtrip() {
        let h = BlockHandle::new(55, 5);
        let mut buf = [0u8; BlockHandle::MAX_ENCODED_LENGTH];
        let n = h.encode_to(&mut buf);
        let (h2, n2) = BlockHandle::decode(&buf).unwrap();
        assert_eq!(n, n2);
        assert_eq!(h.offset(), h2.offset());
        assert_eq!(h.size(), h2.size());
    }

    #[test]
    fn test_footer_roundtrip() {
        let f = Footer::new(BlockHandle::new(55, 5));
        let buf = f.encode();
        let f2 = Footer::decode(&buf).unwrap();
        assert_eq!(f2.index_handle.offset(), 55);
        assert_eq!(f2.index_handle.size(), 5);
    }

    #[test]
    fn test_footer_bad_magic_rejected() {
        let f = Footer::new(BlockHandle::new(1, 2));
        let mut buf = f.encode();
        buf[FULL_FOOTER_LENGTH - 1] ^= 0xff;
        let err = Footer::decode(&buf).unwrap_err();
        assert_eq!(err.code, StatusCode::Corruption);
    }

    #[test]
    fn test_footer_truncated_rejected() {
        let f = Footer::new(BlockHandle::new(1, 2));
        let buf = f.encode();
        assert!(Footer::decode(&buf[..FULL_FOOTER_LENGTH - 1]).is_err());
    }
}
