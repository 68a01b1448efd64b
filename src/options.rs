//! Tunables shared by the table builder and reader.

use std::default::Default;
use std::sync::Arc;

use crate::cmp::{Cmp, DefaultCmp};

const KB: usize = 1 << 10;

const BLOCK_MAX_SIZE: usize = 4 * KB;

/// Whether blocks are compressed before being written, and with what.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CompressionType {
    None = 0,
    Snappy = 1,
}

/// Maps the on-disk block-type byte back to a `CompressionType`.
pub fn compression_type_from_byte(b: u8) -> Option<CompressionType> {
    match b {
        0 => Some(CompressionType::None),
        1 => Some(CompressionType::Snappy),
        _ => None,
    }
}

/// Parameters governing how a table is built and read back. Cloning an `Options` is cheap; the
/// comparator is shared behind an `Arc`.
#[derive(Clone)]
pub struct Options {
    pub cmp: Arc<dyn Cmp>,
    /// Target size, in bytes, of a data block before it is flushed. Blocks may exceed this by
    /// the size of the entry that crossed the threshold.
    pub block_size: usize,
    /// Number of entries between restart points in a block.
    pub block_restart_interval: usize,
    pub compression: CompressionType,
}

impl Default for Options {
    fn default() -> Options {
        Options {
            cmp: Arc::new(DefaultCmp),
            block_size: BLOCK_MAX_SIZE,
            block_restart_interval: 16,
            compression: CompressionType::Snappy,
        }
    }
}

/// Parameters for a single read, independent of how the table was built.
#[derive(Clone, Copy, Debug)]
pub struct ReadOptions {
    /// Verify the CRC32C of each block before returning its contents.
    pub verify_checksums: bool,
}

impl Default for ReadOptions {
    fn default() -> ReadOptions {
        ReadOptions {
            verify_checksums: true,
        }
    }
}
