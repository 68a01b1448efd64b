//! An immutable, sorted key/value table file format: prefix-compressed, restart-indexed data
//! blocks under a two-level index, written once by `TableBuilder` and read back by `Table`.

#[cfg(test)]
#[macro_use]
extern crate time_test;

mod block;
mod block_builder;
mod blockhandle;
mod cmp;
mod crc;
pub mod error;
mod file;
mod format;
mod options;
mod table_builder;
mod table_reader;
mod types;

pub use crate::cmp::{Cmp, DefaultCmp};
pub use crate::error::{Result, Status, StatusCode};
pub use crate::file::{RandomAccessFile, WritableFile};
pub use crate::options::{CompressionType, Options, ReadOptions};
pub use crate::table_builder::TableBuilder;
pub use crate::table_reader::{Table, TableIterator};
pub use crate::types::{current_key_val, SSIterator};

#[cfg(test)]
mod test_util;
