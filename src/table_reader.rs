//! Reads a table written by `TableBuilder` back: point lookups via the index block, and a
//! two-level iterator over the whole table in key order.

use std::cmp::Ordering;

use crate::block::{Block, BlockIter};
use crate::blockhandle::{BlockHandle, Footer, FULL_FOOTER_LENGTH};
use crate::file::RandomAccessFile;
use crate::format::read_block;
use crate::options::{Options, ReadOptions};
use crate::types::SSIterator;
use crate::Result;

/// An opened table file: the footer and index block are parsed eagerly, data blocks are read on
/// demand.
pub struct Table<F: RandomAccessFile> {
    file: F,
    opt: Options,
    read_opt: ReadOptions,
    footer: Footer,
    index_block: Block,
}

impl<F: RandomAccessFile> Table<F> {
    /// Opens a table backed by `file`, which must be exactly the bytes `TableBuilder` wrote.
    pub fn new(opt: Options, file: F, read_opt: ReadOptions) -> Result<Table<F>> {
        let size = file.len()?;
        let mut footer_buf = Vec::new();
        file.read_at(size - FULL_FOOTER_LENGTH as u64, FULL_FOOTER_LENGTH, &mut footer_buf)?;
        let footer = Footer::decode(&footer_buf)?;

        let index_contents = read_block(&file, &footer.index_handle, &read_opt)?;
        let index_block = Block::new(opt.clone(), index_contents)?;

        Ok(Table {
            file,
            opt,
            read_opt,
            footer,
            index_block,
        })
    }

    /// Convenience constructor for opening a table at a filesystem path.
    pub fn new_from_file(opt: Options, path: &std::path::Path) -> Result<Table<std::fs::File>> {
        let f = std::fs::File::open(path)?;
        Table::new(opt, f, ReadOptions::default())
    }

    fn read_data_block(&self, handle: &BlockHandle) -> Result<Block> {
        let contents = read_block(&self.file, handle, &self.read_opt)?;
        Block::new(self.opt.clone(), contents)
    }

    /// Offset of the block that would contain `key`, or the size of the table if `key` falls
    /// after every block. Useful for translating a key range into an approximate byte range.
    pub fn approx_offset_of(&self, key: &[u8]) -> u64 {
        let mut iter = self.index_block.iter();
        iter.seek(key);
        let mut k = Vec::new();
        let mut v = Vec::new();
        if iter.current(&mut k, &mut v) {
            let (handle, _) = BlockHandle::decode(&v).unwrap_or((BlockHandle::new(0, 0), 0));
            handle.offset()
        } else {
            self.footer.index_handle.offset()
        }
    }

    /// Looks up `key` and, if found, invokes `handler` with the exact key and its value. Takes a
    /// callback rather than returning an owned value so callers that only need to inspect the
    /// value (e.g. to check a prefix) don't pay for a copy they'll discard.
    pub fn internal_get<H>(&self, key: &[u8], mut handler: H) -> Result<bool>
    where
        H: FnMut(&[u8], &[u8]),
    {
        let mut iter = self.index_block.iter();
        iter.seek(key);

        let mut ik = Vec::new();
        let mut iv = Vec::new();
        if !iter.current(&mut ik, &mut iv) {
            return Ok(false);
        }
        let (handle, _) = BlockHandle::decode(&iv)?;

        let block = self.read_data_block(&handle)?;
        let mut bit = block.iter();
        bit.seek(key);

        let mut k = Vec::new();
        let mut v = Vec::new();
        if bit.current(&mut k, &mut v) && self.opt.cmp.cmp(key, &k) == Ordering::Equal {
            handler(&k, &v);
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Looks up `key`, returning a copy of its value if present.
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let mut result = None;
        self.internal_get(key, |_, v| result = Some(v.to_vec()))?;
        Ok(result)
    }

    /// Returns a fresh iterator over every entry in the table, in key order.
    pub fn iter(&self) -> TableIterator<'_, F> {
        TableIterator {
            table: self,
            index_iter: self.index_block.iter(),
            current_block: None,
            init: false,
            index_exhausted: false,
        }
    }
}

/// Drives iteration over a whole table via a two-level scheme: the index block names which data
/// block each key range lives in, and this iterator loads that block lazily as it's reached.
pub struct TableIterator<'a, F: RandomAccessFile> {
    table: &'a Table<F>,
    index_iter: BlockIter,
    current_block: Option<BlockIter>,
    /// Whether `current_block` holds an actual data block yet. Before the first `advance`, or
    /// after a `reset`, it doesn't.
    init: bool,
    /// Set whenever `index_iter.advance()` fails to reach a next block, i.e. `index_iter` is left
    /// positioned past its last entry rather than on it. `prev` needs to know this: stepping an
    /// exhausted `BlockIter` backward once just re-lands on the entry it was last positioned at,
    /// so the first real backward step has to be preceded by a throwaway resync step.
    index_exhausted: bool,
}

impl<'a, F: RandomAccessFile> TableIterator<'a, F> {
    fn load_block(&mut self, handle_enc: &[u8]) -> Result<()> {
        let (handle, _) = BlockHandle::decode(handle_enc)?;
        let block = self.table.read_data_block(&handle)?;
        self.current_block = Some(block.iter());
        Ok(())
    }

    fn skip_to_next_entry(&mut self) -> Result<bool> {
        let mut k = Vec::new();
        let mut v = Vec::new();
        if self.index_iter.advance() && self.index_iter.current(&mut k, &mut v) {
            self.index_exhausted = false;
            self.load_block(&v)?;
            Ok(true)
        } else {
            self.index_exhausted = true;
            Ok(false)
        }
    }
}

impl<'a, F: RandomAccessFile> Iterator for TableIterator<'a, F> {
    type Item = (Vec<u8>, Vec<u8>);

    fn next(&mut self) -> Option<Self::Item> {
        if self.advance() {
            let mut k = Vec::new();
            let mut v = Vec::new();
            self.current(&mut k, &mut v);
            Some((k, v))
        } else {
            None
        }
    }
}

impl<'a, F: RandomAccessFile> SSIterator for TableIterator<'a, F> {
    fn advance(&mut self) -> bool {
        if self.init {
            if let Some(block) = self.current_block.as_mut() {
                if block.advance() {
                    return true;
                }
            }
        }
        match self.skip_to_next_entry() {
            Ok(true) => {
                self.init = true;
                self.current_block.as_mut().unwrap().advance()
            }
            _ => {
                self.init = true;
                false
            }
        }
    }

    fn current(&self, key: &mut Vec<u8>, val: &mut Vec<u8>) -> bool {
        if !self.init {
            return false;
        }
        match self.current_block.as_ref() {
            Some(block) => block.current(key, val),
            None => false,
        }
    }

    fn prev(&mut self) -> bool {
        if self.init {
            if let Some(block) = self.current_block.as_mut() {
                if block.prev() {
                    return true;
                }
            }
        }
        if self.index_exhausted {
            // index_iter is sitting past its last entry, not on it: one throwaway step resyncs
            // it onto the entry for the block we were just reading, so the real step below moves
            // to the previous block instead of re-selecting the current one.
            self.index_iter.prev();
            self.index_exhausted = false;
        }
        if !self.index_iter.prev() {
            return false;
        }
        let mut k = Vec::new();
        let mut v = Vec::new();
        if !self.index_iter.current(&mut k, &mut v) {
            return false;
        }
        if self.load_block(&v).is_err() {
            return false;
        }
        let block = self.current_block.as_mut().unwrap();
        block.seek_to_last();
        block.valid()
    }

    fn reset(&mut self) {
        self.index_iter.reset();
        self.current_block = None;
        self.init = false;
        self.index_exhausted = false;
    }

    fn valid(&self) -> bool {
        self.init
            && self
                .current_block
                .as_ref()
                .map(|b| b.valid())
                .unwrap_or(false)
    }

    fn seek(&mut self, target: &[u8]) {
        self.index_iter.seek(target);
        self.index_exhausted = false;
        let mut k = Vec::new();
        let mut v = Vec::new();
        if !self.index_iter.current(&mut k, &mut v) {
            self.reset();
            return;
        }
        if self.load_block(&v).is_err() {
            self.reset();
            return;
        }
        self.current_block.as_mut().unwrap().seek(target);
        self.init = true;
    }

    fn status(&self) -> Result<()> {
        match self.current_block.as_ref() {
            Some(block) => block.status(),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table_builder::TableBuilder;

    fn build_data() -> Vec<(&'static str, &'static str)> {
        vec![
            ("abc", "def"),
            ("abd", "dee"),
            ("bcd", "asa"),
            ("bsr", "a00"),
            ("xyz", "xxx"),
            ("xzz", "yyy"),
            ("zzz", "111"),
        ]
    }

    fn build_table() -> (Vec<u8>, Options) {
        let mut opt = Options::default();
        opt.block_restart_interval = 2;
        opt.block_size = 32;

        let mut dst: Vec<u8> = Vec::new();
        let mut b = TableBuilder::new(opt.clone(), &mut dst);
        for (k, v) in build_data() {
            b.add(k.as_bytes(), v.as_bytes()).unwrap();
        }
        b.finish().unwrap();
        (dst, opt)
    }

    #[test]
    fn test_table_get() {
        let (src, opt) = build_table();
        let table = Table::new(opt, src, ReadOptions::default()).unwrap();

        assert!(table.get(b"aaa").unwrap().is_none());
        assert_eq!(table.get(b"abc").unwrap(), Some(b"def".to_vec()));
        assert!(table.get(b"abcd").unwrap().is_none());
        assert_eq!(table.get(b"bcd").unwrap(), Some(b"asa".to_vec()));
        assert_eq!(table.get(b"zzz").unwrap(), Some(b"111".to_vec()));
        assert!(table.get(b"zz1").unwrap().is_none());
    }

    #[test]
    fn test_table_iterator_fwd() {
        let (src, opt) = build_table();
        let data = build_data();
        let table = Table::new(opt, src, ReadOptions::default()).unwrap();

        let mut iter = table.iter();
        let mut i = 0;
        while let Some((k, v)) = iter.next() {
            assert_eq!((data[i].0.as_bytes(), data[i].1.as_bytes()), (k.as_slice(), v.as_slice()));
            i += 1;
        }
        assert_eq!(i, data.len());
    }

    #[test]
    fn test_table_iterator_seek() {
        let (src, opt) = build_table();
        let table = Table::new(opt, src, ReadOptions::default()).unwrap();
        let mut iter = table.iter();

        iter.seek(b"bcd");
        assert!(iter.valid());
        let mut k = Vec::new();
        let mut v = Vec::new();
        iter.current(&mut k, &mut v);
        assert_eq!((k.as_slice(), v.as_slice()), (b"bcd".as_ref(), b"asa".as_ref()));
    }

    #[test]
    fn test_table_iterator_fwd_then_bwd() {
        let (src, opt) = build_table();
        let data = build_data();
        let table = Table::new(opt, src, ReadOptions::default()).unwrap();
        let mut iter = table.iter();

        for _ in 0..data.len() {
            assert!(iter.advance());
        }
        assert!(!iter.advance());

        let mut j = data.len();
        while iter.prev() {
            j -= 1;
            let mut k = Vec::new();
            let mut v = Vec::new();
            iter.current(&mut k, &mut v);
            assert_eq!((data[j].0.as_bytes(), data[j].1.as_bytes()), (k.as_slice(), v.as_slice()));
        }
    }

    #[test]
    fn test_table_corrupted_block_detected() {
        let (mut src, opt) = build_table();
        // Flip a byte inside the first data block; the checksum should catch it.
        src[2] ^= 0xff;
        let table = Table::new(opt, src, ReadOptions::default()).unwrap();
        assert!(table.get(b"abc").is_err());
    }
}
