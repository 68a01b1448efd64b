//! The bidirectional, reset-able iterator trait both block and table iterators implement.

use crate::Result;

/// A cursor over sorted key/value pairs that can move in both directions and be reset to either
/// end. Distinct from `std::iter::Iterator` because callers frequently need `prev` and `seek`,
/// which don't fit that trait's shape.
pub trait SSIterator {
    /// Moves to the next entry. Returns `false` if there was no next entry, leaving the iterator
    /// invalid.
    fn advance(&mut self) -> bool;

    /// Writes the current key and value into `key`/`val` and returns `true`, or returns `false`
    /// without touching either buffer if the iterator is not positioned on an entry.
    fn current(&self, key: &mut Vec<u8>, val: &mut Vec<u8>) -> bool;

    /// Moves to the previous entry. Returns `false` if there was no previous entry.
    fn prev(&mut self) -> bool;

    /// Resets the iterator to before the first entry.
    fn reset(&mut self);

    /// Whether the iterator currently points at an entry.
    fn valid(&self) -> bool;

    /// Positions the iterator at the first entry with a key `>= target`, or past the end if none
    /// exists.
    fn seek(&mut self, target: &[u8]);

    /// Positions the iterator at the first entry.
    fn seek_to_first(&mut self) {
        self.reset();
        self.advance();
    }

    /// Reports any decode failure encountered so far. An iterator that has latched a corrupt
    /// status stays invalid and keeps returning that status until the next `reset`/`seek`.
    fn status(&self) -> Result<()> {
        Ok(())
    }
}

/// Convenience wrapper around `SSIterator::current` that allocates fresh buffers, for callers
/// that don't want to manage their own scratch space.
pub fn current_key_val<It: SSIterator>(it: &It) -> Option<(Vec<u8>, Vec<u8>)> {
    let mut key = Vec::new();
    let mut val = Vec::new();
    if it.current(&mut key, &mut val) {
        Some((key, val))
    } else {
        None
    }
}
