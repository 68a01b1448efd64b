//! Assembles a single data or index block: a run of prefix-compressed entries, periodically
//! interrupted by a "restart" that stores a full key so seeks don't have to scan from the top.

use integer_encoding::VarInt;

use crate::options::Options;

/// Accumulates key/value pairs in sorted order and produces the encoded bytes of one block.
///
/// Entries must be added in increasing key order; `BlockBuilder` only compresses against the
/// immediately preceding key, so it has no way to check a weaker ordering.
pub struct BlockBuilder {
    opt: Options,
    buffer: Vec<u8>,
    restarts: Vec<u32>,
    last_key: Vec<u8>,
    counter: usize,
    finished: bool,
}

impl BlockBuilder {
    pub fn new(opt: Options) -> BlockBuilder {
        let mut restarts = Vec::new();
        restarts.push(0);
        BlockBuilder {
            opt,
            buffer: Vec::new(),
            restarts,
            last_key: Vec::new(),
            counter: 0,
            finished: false,
        }
    }

    pub fn last_key(&self) -> &[u8] {
        &self.last_key
    }

    /// Roughly how large the finished block will be, including the restart array and its count.
    pub fn size_estimate(&self) -> usize {
        self.buffer.len() + self.restarts.len() * 4 + 4
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Adds a key/value pair. `key` must be strictly greater than the previous key added.
    pub fn add(&mut self, key: &[u8], val: &[u8]) {
        assert!(!self.finished, "block already finished");
        assert!(
            self.counter <= self.opt.block_restart_interval,
            "restart interval exceeded without a restart"
        );
        assert!(
            self.buffer.is_empty() || self.opt.cmp.cmp(key, &self.last_key) == std::cmp::Ordering::Greater,
            "keys added out of order"
        );

        let mut shared = 0;
        if self.counter < self.opt.block_restart_interval {
            let min_len = key.len().min(self.last_key.len());
            while shared < min_len && key[shared] == self.last_key[shared] {
                shared += 1;
            }
        } else {
            self.restarts.push(self.buffer.len() as u32);
            self.counter = 0;
        }

        let non_shared = key.len() - shared;

        self.buffer.extend(varint32(shared as u32));
        self.buffer.extend(varint32(non_shared as u32));
        self.buffer.extend(varint32(val.len() as u32));
        self.buffer.extend_from_slice(&key[shared..]);
        self.buffer.extend_from_slice(val);

        self.last_key.resize(key.len(), 0);
        self.last_key.copy_from_slice(key);
        self.counter += 1;
    }

    /// Finishes the block, appending the restart array and its count, and returns the encoded
    /// bytes. The builder cannot be reused afterwards without calling `reset`.
    pub fn finish(mut self) -> Vec<u8> {
        for r in &self.restarts {
            self.buffer.extend_from_slice(&r.to_le_bytes());
        }
        self.buffer
            .extend_from_slice(&(self.restarts.len() as u32).to_le_bytes());
        self.finished = true;
        self.buffer
    }
}

fn varint32(v: u32) -> Vec<u8> {
    let mut buf = [0u8; 5];
    let n = v.encode_var(&mut buf);
    buf[..n].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Block;

    #[test]
    fn test_block_builder_restarts() {
        let o = Options {
            block_restart_interval: 3,
            ..Options::default()
        };
        let mut b = BlockBuilder::new(o.clone());
        let entries: &[(&[u8], &[u8])] = &[
            (b"key1", b"val1"),
            (b"key2", b"val2"),
            (b"key3", b"val3"),
            (b"key4", b"val4"),
        ];
        for (k, v) in entries {
            b.add(k, v);
        }
        let contents = b.finish();
        let blk = Block::new(o, contents).unwrap();
        let mut it = blk.iter();
        let mut collected = Vec::new();
        while let Some((k, v)) = it.next() {
            collected.push((k, v));
        }
        assert_eq!(collected.len(), 4);
        assert_eq!(collected[0].0, b"key1");
        assert_eq!(collected[3].1, b"val4");
    }

    #[test]
    #[should_panic]
    fn test_block_builder_rejects_out_of_order() {
        let mut b = BlockBuilder::new(Options::default());
        b.add(b"b", b"1");
        b.add(b"a", b"2");
    }
}
