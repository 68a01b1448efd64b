//! Assembles a table file from key/value pairs presented in sorted order.

use crate::block_builder::BlockBuilder;
use crate::blockhandle::{BlockHandle, Footer};
use crate::crc;
use crate::file::WritableFile;
use crate::options::{CompressionType, Options};
use crate::Result;

/// Builds a table incrementally, writing blocks to `dst` as they fill up. Keys must be added in
/// strictly increasing order.
///
/// The index entry for a data block is written lazily: once the block has been flushed, we hold
/// onto its handle and wait for the *next* block's first key before deciding how short a
/// separator key we can get away with. This is what lets the index store `"g"` instead of
/// `"google"` to separate a block ending in `"googax"` from one starting with `"gzoo"`.
pub struct TableBuilder<Dst: WritableFile> {
    opt: Options,
    dst: Dst,

    offset: usize,
    num_entries: usize,
    last_key: Vec<u8>,
    closed: bool,

    data_block: BlockBuilder,
    index_block: BlockBuilder,

    pending_index_entry: bool,
    pending_handle: BlockHandle,
}

impl<Dst: WritableFile> TableBuilder<Dst> {
    pub fn new(opt: Options, dst: Dst) -> TableBuilder<Dst> {
        TableBuilder {
            data_block: BlockBuilder::new(opt.clone()),
            index_block: BlockBuilder::new(opt.clone()),
            opt,
            dst,
            offset: 0,
            num_entries: 0,
            last_key: Vec::new(),
            closed: false,
            pending_index_entry: false,
            pending_handle: BlockHandle::new(0, 0),
        }
    }

    /// Number of entries added so far.
    pub fn num_entries(&self) -> usize {
        self.num_entries
    }

    /// Bytes written to `dst` so far, including any block currently buffered but not yet
    /// flushed. Only meaningful as an estimate until `finish` returns.
    pub fn file_size(&self) -> usize {
        self.offset
    }

    /// Adds a key/value pair. `key` must be strictly greater than every previously added key.
    pub fn add(&mut self, key: &[u8], val: &[u8]) -> Result<()> {
        assert!(!self.closed, "add() called after finish()");
        assert!(
            self.num_entries == 0 || self.opt.cmp.cmp(&self.last_key, key) == std::cmp::Ordering::Less,
            "keys added out of order"
        );

        if self.pending_index_entry {
            assert!(self.data_block.is_empty());
            let mut sep = self.last_key.clone();
            self.opt.cmp.find_shortest_separator(&mut sep, key);
            let handle_enc = self.pending_handle.encode();
            self.index_block.add(&sep, &handle_enc);
            self.pending_index_entry = false;
        }

        self.last_key.clear();
        self.last_key.extend_from_slice(key);
        self.num_entries += 1;
        self.data_block.add(key, val);

        if self.data_block.size_estimate() >= self.opt.block_size {
            self.flush()?;
        }
        Ok(())
    }

    /// Flushes the current data block to `dst`, if it holds any entries.
    fn flush(&mut self) -> Result<()> {
        assert!(!self.pending_index_entry);
        if self.data_block.is_empty() {
            return Ok(());
        }
        let block = std::mem::replace(&mut self.data_block, BlockBuilder::new(self.opt.clone()));
        let handle = self.write_block(block.finish())?;
        self.pending_handle = handle;
        self.pending_index_entry = true;
        self.dst.flush()?;
        Ok(())
    }

    /// Compresses (if configured) and writes one block plus its trailer, returning the handle
    /// pointing at it.
    fn write_block(&mut self, raw: Vec<u8>) -> Result<BlockHandle> {
        let (payload, ctype) = match self.opt.compression {
            CompressionType::None => (raw, CompressionType::None),
            CompressionType::Snappy => {
                let mut encoder = snap::raw::Encoder::new();
                let compressed = encoder
                    .compress_vec(&raw)
                    .map_err(|e| crate::error::Status::corruption(&e.to_string()))?;
                // Only ship the compressed form if it's actually worth it.
                if compressed.len() < raw.len() - (raw.len() / 8) {
                    (compressed, CompressionType::Snappy)
                } else {
                    (raw, CompressionType::None)
                }
            }
        };

        let handle = BlockHandle::new(self.offset as u64, payload.len() as u64);

        let mut crc_input = payload.clone();
        crc_input.push(ctype as u8);
        let masked_crc = crc::mask(crc::crc32c(&crc_input));

        self.dst.write_all(&payload)?;
        self.dst.write_all(&[ctype as u8])?;
        self.dst.write_all(&masked_crc.to_le_bytes())?;

        self.offset += payload.len() + 1 + 4;
        Ok(handle)
    }

    /// Flushes any pending data, writes the index block and footer, and syncs the file. No
    /// further entries may be added afterward.
    pub fn finish(mut self) -> Result<()> {
        self.flush()?;
        self.closed = true;

        if self.pending_index_entry {
            self.opt.cmp.find_short_successor(&mut self.last_key);
            let handle_enc = self.pending_handle.encode();
            let key = self.last_key.clone();
            self.index_block.add(&key, &handle_enc);
            self.pending_index_entry = false;
        }

        let index_contents = std::mem::replace(&mut self.index_block, BlockBuilder::new(self.opt.clone())).finish();
        let index_handle = self.write_block(index_contents)?;

        let footer = Footer::new(index_handle);
        let footer_enc = footer.encode();
        self.dst.write_all(&footer_enc)?;
        self.offset += footer_enc.len();

        self.dst.sync()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(opt: Options, data: &[(&[u8], &[u8])]) -> Vec<u8> {
        let mut dst: Vec<u8> = Vec::new();
        let mut b = TableBuilder::new(opt, &mut dst);
        for (k, v) in data {
            b.add(k, v).unwrap();
        }
        b.finish().unwrap();
        dst
    }

    #[test]
    fn test_table_builder_roundtrip() {
        let mut opt = Options::default();
        opt.block_restart_interval = 3;
        let data: &[(&[u8], &[u8])] = &[
            (b"abc", b"def"),
            (b"abd", b"dee"),
            (b"bcd", b"asa"),
            (b"bsr", b"a00"),
        ];
        let bytes = build(opt, data);
        assert!(!bytes.is_empty());
        assert!(bytes.len() >= crate::blockhandle::FULL_FOOTER_LENGTH);
    }

    #[test]
    #[should_panic]
    fn test_table_builder_rejects_duplicate_keys() {
        let opt = Options::default();
        let mut dst: Vec<u8> = Vec::new();
        let mut b = TableBuilder::new(opt, &mut dst);
        b.add(b"abc", b"def").unwrap();
        b.add(b"abc", b"dee").unwrap();
    }

    #[test]
    fn test_table_builder_counts_entries() {
        let opt = Options::default();
        let mut dst: Vec<u8> = Vec::new();
        let mut b = TableBuilder::new(opt, &mut dst);
        for (k, v) in [(b"abc".as_ref(), b"1".as_ref()), (b"abd".as_ref(), b"2".as_ref())] {
            b.add(k, v).unwrap();
        }
        assert_eq!(b.num_entries(), 2);
        b.finish().unwrap();
    }
}
