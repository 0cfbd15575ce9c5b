//! Replaying a [`ChangeBlockSequence`] by element or by block.

use super::{Block, ChangeBlockSequence, ChangeType};

/// One element-level step of a replay.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Change {
    pub index: usize,
    pub kind: ChangeType,
}

/// Cursor over a sequence's blocks and the elements inside them.
///
/// Stepping by element visits every element of every block: INSERT and
/// UPDATE indices ascend through the block, DELETE repeats the block's start.
/// Stepping by block visits each block once. The two can be mixed; a block
/// step always lands on the first element of the next block.
#[derive(Clone, Debug)]
pub struct ChangeIterator<'a> {
    blocks: &'a [Block],
    /// Index of the current block, `None` before the first step.
    block: Option<usize>,
    /// Position of the current element within its block.
    offset: usize,
}

impl<'a> ChangeIterator<'a> {
    pub fn new(sequence: &'a ChangeBlockSequence) -> ChangeIterator<'a> {
        return ChangeIterator { blocks: sequence.blocks(), block: None, offset: 0 };
    }

    /// Rewinds to before the first block.
    pub fn reset(&mut self) {
        self.block = None;
        self.offset = 0;
    }

    fn current(&self) -> Option<&'a Block> {
        return self.block.map(|i| &self.blocks[i]);
    }

    fn next_block_index(&self) -> usize {
        return self.block.map_or(0, |i| i + 1);
    }

    pub fn has_next(&self) -> bool {
        if let Some(block) = self.current() {
            if self.offset + 1 < block.len() {
                return true;
            }
        }
        return self.has_next_block();
    }

    pub fn has_next_block(&self) -> bool {
        return self.next_block_index() < self.blocks.len();
    }

    /// Steps to the start of the next block.
    pub fn next_block(&mut self) -> Option<Block> {
        let next = self.next_block_index();
        let block = *self.blocks.get(next)?;
        self.block = Some(next);
        self.offset = 0;
        return Some(block);
    }

    /// Index of the current element, as a replay would apply it.
    pub fn index(&self) -> Option<usize> {
        let block = self.current()?;
        return match block.kind {
            ChangeType::Insert | ChangeType::Update => Some(block.start + self.offset),
            ChangeType::Delete => Some(block.start),
        };
    }

    pub fn block_start(&self) -> Option<usize> {
        return self.current().map(|block| block.start);
    }

    pub fn block_end(&self) -> Option<usize> {
        return self.current().map(|block| block.end);
    }

    pub fn kind(&self) -> Option<ChangeType> {
        return self.current().map(|block| block.kind);
    }
}

impl Iterator for ChangeIterator<'_> {
    type Item = Change;

    fn next(&mut self) -> Option<Change> {
        match self.current() {
            Some(block) if self.offset + 1 < block.len() => self.offset += 1,
            _ => {
                self.next_block()?;
            }
        }
        return Some(Change { index: self.index()?, kind: self.kind()? });
    }
}
