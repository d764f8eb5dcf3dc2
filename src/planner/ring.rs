//! Fixed-capacity ring of motion blocks.
//!
//! One slot always stays free so `head == tail` means empty; a ring of `N`
//! slots holds at most `N - 1` blocks.

use super::block::MotionBlock;

/// Default slot count.
pub const DEFAULT_QUEUE_CAPACITY: usize = 16;

/// Block ring indexed from `tail` (oldest) to `head` (next free slot).
#[derive(Debug, Clone)]
pub struct BlockRing<const N: usize> {
    slots: [MotionBlock; N],
    head: usize,
    tail: usize,
}

impl<const N: usize> Default for BlockRing<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> BlockRing<N> {
    /// Empty ring.
    pub const fn new() -> Self {
        assert!(N >= 2, "block ring needs at least two slots");
        Self {
            slots: [MotionBlock::EMPTY; N],
            head: 0,
            tail: 0,
        }
    }

    /// Index after `index`, wrapping.
    #[inline]
    pub const fn next_index(index: usize) -> usize {
        if index + 1 == N {
            0
        } else {
            index + 1
        }
    }

    /// Index before `index`, wrapping.
    #[inline]
    pub const fn prev_index(index: usize) -> usize {
        if index == 0 {
            N - 1
        } else {
            index - 1
        }
    }

    /// No blocks queued.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.head == self.tail
    }

    /// No free slot left.
    #[inline]
    pub fn is_full(&self) -> bool {
        Self::next_index(self.head) == self.tail
    }

    /// Number of queued blocks.
    #[inline]
    pub fn len(&self) -> usize {
        (self.head + N - self.tail) % N
    }

    /// Maximum number of queued blocks.
    #[inline]
    pub const fn capacity(&self) -> usize {
        N - 1
    }

    /// Index of the oldest block.
    #[inline]
    pub fn tail_index(&self) -> usize {
        self.tail
    }

    /// Index of the next free slot.
    #[inline]
    pub fn head_index(&self) -> usize {
        self.head
    }

    /// Append a block. Hands it back if the ring is full.
    pub fn push(&mut self, block: MotionBlock) -> Result<(), MotionBlock> {
        if self.is_full() {
            return Err(block);
        }
        self.slots[self.head] = block;
        self.head = Self::next_index(self.head);
        Ok(())
    }

    /// Oldest block.
    #[inline]
    pub fn tail(&self) -> Option<&MotionBlock> {
        if self.is_empty() {
            None
        } else {
            Some(&self.slots[self.tail])
        }
    }

    /// Drop the oldest block.
    pub fn pop(&mut self) -> Option<MotionBlock> {
        if self.is_empty() {
            return None;
        }
        let block = self.slots[self.tail];
        self.tail = Self::next_index(self.tail);
        Some(block)
    }

    /// Slot at a raw index. Callers keep indices within `tail..head`.
    #[inline]
    pub fn slot(&self, index: usize) -> &MotionBlock {
        &self.slots[index]
    }

    /// Mutable slot at a raw index.
    #[inline]
    pub fn slot_mut(&mut self, index: usize) -> &mut MotionBlock {
        &mut self.slots[index]
    }

    /// Queued blocks from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &MotionBlock> + '_ {
        let mut index = self.tail;
        core::iter::from_fn(move || {
            if index == self.head {
                return None;
            }
            let block = &self.slots[index];
            index = Self::next_index(index);
            Some(block)
        })
    }

    /// Drop every queued block.
    #[inline]
    pub fn clear(&mut self) {
        self.tail = self.head;
    }
}
