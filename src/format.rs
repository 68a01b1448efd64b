//! Reads the length-prefixed, checksummed, optionally-compressed block that `BlockHandle`
//! addresses.

use crate::blockhandle::BlockHandle;
use crate::crc;
use crate::error::Status;
use crate::file::RandomAccessFile;
use crate::options::{compression_type_from_byte, CompressionType, ReadOptions};
use crate::Result;

/// Bytes appended after every block: a one-byte compression type, then a masked CRC32C covering
/// the block data and that type byte.
pub const BLOCK_TRAILER_SIZE: usize = 5;

/// Reads and, if necessary, decompresses and verifies the block addressed by `handle`.
pub fn read_block<F: RandomAccessFile>(
    file: &F,
    handle: &BlockHandle,
    opt: &ReadOptions,
) -> Result<Vec<u8>> {
    let n = handle.size() as usize;
    let mut raw = Vec::new();
    file.read_at(handle.offset(), n + BLOCK_TRAILER_SIZE, &mut raw)?;

    if opt.verify_checksums {
        let stored = u32::from_le_bytes(raw[n + 1..n + 5].try_into().unwrap());
        let got = crc::crc32c(&raw[..n + 1]);
        if crc::unmask(stored) != got {
            return Err(Status::corruption("block checksum mismatch"));
        }
    }

    let compression = compression_type_from_byte(raw[n])
        .ok_or_else(|| Status::corruption("unknown block compression type"))?;

    raw.truncate(n);
    match compression {
        CompressionType::None => Ok(raw),
        CompressionType::Snappy => {
            let mut decoder = snap::raw::Decoder::new();
            decoder
                .decompress_vec(&raw)
                .map_err(|e| Status::corruption(&e.to_string()))
        }
    }
}
