//! Change Block Sequence
//!
//! Folds a stream of per-element edits into the fewest contiguous blocks that
//! describe one transaction's net effect on a list.
//!
//! Edits arrive in forward order over the live index space: each call is made
//! against the list as it looks after every earlier call. The sequence tracks a
//! cursor, the furthest point touched so far, and an edit that starts before
//! it is refused with `false` so the caller can fall back to a more general
//! strategy. The only edits allowed to reach back behind the cursor are the
//! ones that fuse with the trailing block:
//!
//! - a delete over freshly inserted elements cancels them
//! - a delete over freshly updated elements deletes the originals
//! - an update overlapping a trailing update merges into it
//!
//! ```text
//! insert(0,2) insert(4,6) delete(8,10) delete(10,12)
//!
//! blocks:   I[0,2)  I[4,6)  D[8,10)  D[10,12)
//! replay:   I0 I1   I4 I5   D8 D8    D10 D10
//! ```
//!
//! Replay semantics: INSERT and UPDATE blocks name the indices their elements
//! occupy; a DELETE block of n elements removes n times at its start index,
//! since each removal closes the gap.

mod iter;

use std::fmt;

use tracing::debug;

pub use iter::{Change, ChangeIterator};

/// What happened to a block of elements.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChangeType {
    Insert,
    Delete,
    Update,
}

/// A maximal run of one kind of change, `[start, end)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Block {
    pub start: usize,
    pub end: usize,
    pub kind: ChangeType,
}

impl Block {
    fn new(start: usize, end: usize, kind: ChangeType) -> Block {
        return Block { start, end, kind };
    }

    /// Number of elements in the block.
    #[inline(always)]
    pub fn len(&self) -> usize {
        return self.end - self.start;
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        return self.start == self.end;
    }

    /// The point after the block in live coordinates. Deleted elements take
    /// up no room, so a delete block ends where it starts.
    #[inline(always)]
    fn cursor(&self) -> usize {
        if self.kind == ChangeType::Delete {
            return self.start;
        }
        return self.end;
    }
}

/// One transaction's changes, compressed into ordered blocks.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChangeBlockSequence {
    blocks: Vec<Block>,
}

impl ChangeBlockSequence {
    pub fn new() -> ChangeBlockSequence {
        return ChangeBlockSequence { blocks: Vec::new() };
    }

    /// The lowest index the next edit may start at.
    pub fn cursor(&self) -> usize {
        return self.blocks.last().map_or(0, Block::cursor);
    }

    pub fn is_empty(&self) -> bool {
        return self.blocks.is_empty();
    }

    pub fn block_count(&self) -> usize {
        return self.blocks.len();
    }

    pub fn blocks(&self) -> &[Block] {
        return &self.blocks;
    }

    /// Forgets every recorded change, ready for the next transaction.
    pub fn clear(&mut self) {
        self.blocks.clear();
    }

    pub fn iter(&self) -> ChangeIterator<'_> {
        return ChangeIterator::new(self);
    }

    /// Records `end - start` new elements at `start`.
    pub fn insert(&mut self, start: usize, end: usize) -> bool {
        if end < start || start < self.cursor() {
            debug!(start, end, cursor = self.cursor(), "insert refused");
            return false;
        }
        self.append(ChangeType::Insert, start, end - start);
        return true;
    }

    /// Records removal of the elements currently at `[start, end)`.
    pub fn delete(&mut self, start: usize, end: usize) -> bool {
        if end < start {
            debug!(start, end, "delete refused: inverted range");
            return false;
        }
        let count = end - start;
        if start >= self.cursor() {
            self.append(ChangeType::Delete, start, count);
            return true;
        }

        let Some(last) = self.blocks.last().copied() else {
            return false;
        };
        if last.kind == ChangeType::Delete || start < last.start {
            debug!(start, end, cursor = self.cursor(), "delete refused");
            return false;
        }

        if last.kind == ChangeType::Insert {
            // the overlap was never visible outside this transaction
            let cancelled = count.min(last.end - start);
            let remaining = count - cancelled;
            self.pop_or_shrink(last.end - cancelled);
            self.append(ChangeType::Delete, start, remaining);
            return true;
        }

        // updated elements become deletes of the originals; an updated tail
        // after the deleted range stays an update and slides down to `start`
        let tail = last.end.saturating_sub(end);
        self.pop_or_shrink(start);
        self.append(ChangeType::Delete, start, count);
        self.append(ChangeType::Update, start, tail);
        return true;
    }

    /// Records in-place replacement of the elements at `[start, end)`.
    pub fn update(&mut self, start: usize, end: usize) -> bool {
        if end < start {
            debug!(start, end, "update refused: inverted range");
            return false;
        }
        if start >= self.cursor() {
            self.append(ChangeType::Update, start, end - start);
            return true;
        }

        match self.blocks.last_mut() {
            Some(last) if last.kind == ChangeType::Update && start >= last.start => {
                last.end = last.end.max(end);
                return true;
            }
            _ => {
                debug!(start, end, cursor = self.cursor(), "update refused");
                return false;
            }
        }
    }

    /// Truncates the trailing block to end at `end`, dropping it if empty.
    fn pop_or_shrink(&mut self, end: usize) {
        if let Some(last) = self.blocks.last_mut() {
            last.end = end;
            if last.is_empty() {
                self.blocks.pop();
            }
        }
    }

    /// Adds `count` elements of `kind` at `start`, which must not precede the
    /// cursor, coalescing with the trailing block where the two meet.
    fn append(&mut self, kind: ChangeType, start: usize, count: usize) {
        if count == 0 {
            return;
        }
        if let Some(last) = self.blocks.last_mut() {
            if last.kind == kind && last.cursor() == start {
                last.end += count;
                return;
            }
        }
        self.blocks.push(Block::new(start, start + count, kind));
    }

    /// Replays the changes onto `list`, a copy of the list as it was before
    /// the transaction. `value_at` supplies the new element for every inserted
    /// or updated index.
    pub fn apply_to<T, F>(&self, list: &mut Vec<T>, mut value_at: F)
    where
        F: FnMut(usize) -> T,
    {
        for block in &self.blocks {
            match block.kind {
                ChangeType::Insert => {
                    for index in block.start..block.end {
                        list.insert(index, value_at(index));
                    }
                }
                ChangeType::Delete => {
                    list.drain(block.start..block.start + block.len());
                }
                ChangeType::Update => {
                    for index in block.start..block.end {
                        list[index] = value_at(index);
                    }
                }
            }
        }
    }
}

impl fmt::Display for ChangeBlockSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, block) in self.blocks.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            let tag = match block.kind {
                ChangeType::Insert => "I",
                ChangeType::Delete => "D",
                ChangeType::Update => "U",
            };
            write!(f, "{}[{},{})", tag, block.start, block.end)?;
        }
        return Ok(());
    }
}
