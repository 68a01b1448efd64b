//! A read-only view over one decoded block: the prefix-compressed entry stream produced by
//! `BlockBuilder`, plus the restart-point array used to binary-search it.

use std::cmp::Ordering;
use std::rc::Rc;

use integer_encoding::VarInt;

use crate::error::Status;
use crate::options::Options;
use crate::types::SSIterator;
use crate::Result;

/// An in-memory, parsed block. Cheap to clone: the underlying bytes are reference-counted.
#[derive(Clone)]
pub struct Block {
    data: Rc<Vec<u8>>,
    opt: Options,
    restarts_offset: usize,
    num_restarts: usize,
}

impl Block {
    /// Wraps the raw bytes of a decompressed, checksum-verified block.
    pub fn new(opt: Options, contents: Vec<u8>) -> Result<Block> {
        if contents.len() < 4 {
            return Err(Status::corruption("block too small to contain a restart count"));
        }
        let num_restarts =
            u32::from_le_bytes(contents[contents.len() - 4..].try_into().unwrap()) as usize;
        if num_restarts * 4 > contents.len() - 4 {
            return Err(Status::corruption("block restart count out of bounds"));
        }
        let restarts_offset = contents.len() - 4 - num_restarts * 4;
        Ok(Block {
            data: Rc::new(contents),
            opt,
            restarts_offset,
            num_restarts,
        })
    }

    pub fn iter(&self) -> BlockIter {
        BlockIter {
            opt: self.opt.clone(),
            data: self.data.clone(),
            restarts_offset: self.restarts_offset,
            num_restarts: self.num_restarts,
            offset: 0,
            current_entry_offset: 0,
            current_restart_idx: 0,
            key: Vec::new(),
            val_offset: 0,
            val_len: 0,
            valid: false,
            started: false,
            status: None,
        }
    }
}

/// Bounds-checked lookup of restart point `idx`. Returns `None` rather than panicking if `idx`
/// or the block's own restart-array bookkeeping is out of range.
fn restart_point(data: &[u8], restarts_offset: usize, idx: usize) -> Option<usize> {
    let off = restarts_offset.checked_add(idx.checked_mul(4)?)?;
    let end = off.checked_add(4)?;
    if end > data.len() {
        return None;
    }
    Some(u32::from_le_bytes(data[off..end].try_into().unwrap()) as usize)
}

/// Decodes the entry header (shared, non-shared, value length) at `offset`, returning those
/// three values and the offset of the first byte after the header. `limit` bounds how far into
/// `data` the entry may reach (the start of the restart array); returns `None` on any varint or
/// bounds violation instead of panicking, so a malformed block degrades to "iterator invalid"
/// rather than crashing the process.
fn decode_entry(data: &[u8], offset: usize, limit: usize) -> Option<(usize, usize, usize, usize)> {
    if offset > limit || limit > data.len() {
        return None;
    }
    let (shared, n1) = u32::decode_var(&data[offset..limit])?;
    let after_shared = offset.checked_add(n1)?;
    if after_shared > limit {
        return None;
    }
    let (non_shared, n2) = u32::decode_var(&data[after_shared..limit])?;
    let after_non_shared = after_shared.checked_add(n2)?;
    if after_non_shared > limit {
        return None;
    }
    let (val_len, n3) = u32::decode_var(&data[after_non_shared..limit])?;
    let body_off = after_non_shared.checked_add(n3)?;
    let (shared, non_shared, val_len) = (shared as usize, non_shared as usize, val_len as usize);
    let end = body_off.checked_add(non_shared)?.checked_add(val_len)?;
    if end > limit {
        return None;
    }
    Some((shared, non_shared, val_len, body_off))
}

/// Iterates a single `Block` forward and backward, using the restart-point array to support
/// `seek` and `prev` without re-scanning from the start every time.
pub struct BlockIter {
    opt: Options,
    data: Rc<Vec<u8>>,
    restarts_offset: usize,
    num_restarts: usize,
    /// Offset of the next entry to be read by `advance`, or `restarts_offset` at end-of-block.
    offset: usize,
    /// Offset of the entry `key`/`val_offset` currently describe. Meaningless while `!valid()`.
    current_entry_offset: usize,
    /// Index of the restart point at or before `current_entry_offset`.
    current_restart_idx: usize,
    key: Vec<u8>,
    val_offset: usize,
    val_len: usize,
    valid: bool,
    /// Whether `advance` has ever successfully parsed an entry since the last `reset`. Lets
    /// `prev` tell "ran off the end after visiting entries" (recoverable) apart from "never
    /// moved" (nothing to go back to).
    started: bool,
    /// Latched once a decode failure is hit. Once set, the iterator reports invalid and every
    /// further movement is a no-op until the next `reset`.
    status: Option<Status>,
}

impl BlockIter {
    fn val(&self) -> &[u8] {
        &self.data[self.val_offset..self.val_offset + self.val_len]
    }

    /// Latches `msg` as this iterator's status and invalidates it. Always returns `false`, so
    /// callers can write `return self.fail(...)`.
    fn fail(&mut self, msg: &str) -> bool {
        self.status = Some(Status::corruption(msg));
        self.valid = false;
        self.offset = self.restarts_offset;
        false
    }

    /// `restart_point`, latching a corruption status instead of returning `None` on failure.
    fn restart_point_at(&mut self, idx: usize) -> Option<usize> {
        match restart_point(&self.data, self.restarts_offset, idx) {
            Some(off) => Some(off),
            None => {
                self.fail("restart point index out of bounds");
                None
            }
        }
    }

    /// Reads the full key at restart point `restart_idx` without disturbing iterator state, for
    /// use during seek's binary search over restart points. Returns `None` on any corruption;
    /// the caller (which can mutate `self`) is responsible for latching a status.
    fn key_at_restart(&self, restart_idx: usize) -> Option<Vec<u8>> {
        let off = restart_point(&self.data, self.restarts_offset, restart_idx)?;
        let (shared, non_shared, _, body_off) = decode_entry(&self.data, off, self.restarts_offset)?;
        if shared != 0 {
            return None;
        }
        Some(self.data[body_off..body_off + non_shared].to_vec())
    }

    /// Positions the iterator at the last entry in the block.
    pub fn seek_to_last(&mut self) {
        self.reset();
        if self.num_restarts == 0 {
            return;
        }
        self.current_restart_idx = self.num_restarts - 1;
        self.offset = match self.restart_point_at(self.current_restart_idx) {
            Some(off) => off,
            None => return,
        };
        // Each successful advance() moves self.offset to the start of the *next* entry, so the
        // loop stops cleanly once that lands exactly on restarts_offset; a failing advance()
        // (corruption) also terminates it.
        while self.offset < self.restarts_offset {
            if !self.advance() {
                break;
            }
        }
    }
}

impl Iterator for BlockIter {
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

impl SSIterator for BlockIter {
    fn advance(&mut self) -> bool {
        if self.status.is_some() {
            return false;
        }
        if self.offset >= self.restarts_offset {
            self.offset = self.restarts_offset;
            self.valid = false;
            return false;
        }
        let (shared, non_shared, val_len, body_off) =
            match decode_entry(&self.data, self.offset, self.restarts_offset) {
                Some(e) => e,
                None => return self.fail("corrupt block entry"),
            };
        if shared > self.key.len() {
            return self.fail("shared prefix longer than previous key");
        }
        self.key.truncate(shared);
        self.key
            .extend_from_slice(&self.data[body_off..body_off + non_shared]);

        self.current_entry_offset = self.offset;
        self.val_offset = body_off + non_shared;
        self.val_len = val_len;
        self.offset = self.val_offset + val_len;

        while self.current_restart_idx + 1 < self.num_restarts {
            let next_restart = match self.restart_point_at(self.current_restart_idx + 1) {
                Some(off) => off,
                None => return false,
            };
            if next_restart <= self.current_entry_offset {
                self.current_restart_idx += 1;
            } else {
                break;
            }
        }
        self.valid = true;
        self.started = true;
        true
    }

    fn current(&self, key: &mut Vec<u8>, val: &mut Vec<u8>) -> bool {
        if !self.valid() {
            return false;
        }
        key.clear();
        key.extend_from_slice(&self.key);
        val.clear();
        val.extend_from_slice(self.val());
        true
    }

    fn prev(&mut self) -> bool {
        if !self.started || self.status.is_some() {
            return false;
        }
        // If we ran off the end of the block, the entry to back up from is the one past the
        // last real entry, i.e. the restart array itself.
        let original_offset = if self.valid {
            self.current_entry_offset
        } else {
            self.restarts_offset
        };

        // Back up to the restart point at or before the current entry, then rebuild keys
        // forward until we're immediately before where we started.
        loop {
            let rp = match self.restart_point_at(self.current_restart_idx) {
                Some(off) => off,
                None => return false,
            };
            if rp < original_offset {
                break;
            }
            if self.current_restart_idx == 0 {
                self.reset();
                return false;
            }
            self.current_restart_idx -= 1;
        }

        self.offset = match self.restart_point_at(self.current_restart_idx) {
            Some(off) => off,
            None => return false,
        };
        self.key.clear();

        loop {
            if !self.advance() {
                break;
            }
            if self.offset >= original_offset {
                break;
            }
        }
        self.valid && self.current_entry_offset < original_offset
    }

    fn reset(&mut self) {
        self.offset = 0;
        self.current_entry_offset = 0;
        self.current_restart_idx = 0;
        self.key.clear();
        self.val_offset = 0;
        self.val_len = 0;
        self.valid = false;
        self.started = false;
        self.status = None;
    }

    fn valid(&self) -> bool {
        self.valid
    }

    fn seek(&mut self, target: &[u8]) {
        self.reset();

        if self.num_restarts == 0 {
            return;
        }

        let mut left = 0usize;
        let mut right = self.num_restarts - 1;
        while left < right {
            let mid = left + (right - left + 1) / 2;
            let mid_key = match self.key_at_restart(mid) {
                Some(k) => k,
                None => {
                    self.fail("corrupt restart point during seek");
                    return;
                }
            };
            match self.opt.cmp.cmp(&mid_key, target) {
                Ordering::Less | Ordering::Equal => left = mid,
                Ordering::Greater => right = mid - 1,
            }
        }

        self.offset = match self.restart_point_at(left) {
            Some(off) => off,
            None => return,
        };
        self.current_restart_idx = left;

        while self.advance() {
            if self.opt.cmp.cmp(&self.key, target) != Ordering::Less {
                return;
            }
        }
    }

    fn status(&self) -> Result<()> {
        match &self.status {
            Some(s) => Err(s.clone()),
            None => Ok(()),
        }
    }
}
