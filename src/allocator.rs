//! A pooled bump allocator for tree nodes.
//!
//! Nodes are handed out from large chunks and referenced by [`NodeId`] instead of pointers.
//! Nothing is freed individually: the whole pool is released by [`PooledAllocator::clear`]
//! or when it is dropped.

use std::mem::size_of;
use std::ops::Range;

use crate::error::{Result, TreeIndexError};

/// The default number of slots in the first chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 512;

/// A handle on a slot in a [`PooledAllocator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    chunk: u32,
    slot: u32,
}

impl NodeId {
    /// The id of the slot `offset` places after this one in the same block.
    #[inline]
    pub fn offset(self, offset: usize) -> Self {
        Self {
            chunk: self.chunk,
            slot: self.slot + offset as u32,
        }
    }
}

/// A contiguous block of slots returned by [`PooledAllocator::allocate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    chunk: u32,
    slots: Range<u32>,
}

impl Block {
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// The id of the `index`-th slot of this block.
    pub fn get(&self, index: usize) -> NodeId {
        assert!(index < self.len(), "Slot {} out of block of {}.", index, self.len());
        NodeId {
            chunk: self.chunk,
            slot: self.slots.start + index as u32,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.slots.clone().map(move |slot| NodeId {
            chunk: self.chunk,
            slot,
        })
    }
}

#[derive(Debug)]
struct Chunk<T> {
    slots: Vec<T>,
    capacity: usize,
}

/// An arena of `T` values grown chunk by chunk.
#[derive(Debug)]
pub struct PooledAllocator<T> {
    chunks: Vec<Chunk<T>>,
    chunk_size: usize,
    used: usize,
    wasted: usize,
    reserved: usize,
}

impl<T: Default> PooledAllocator<T> {
    /// Create an empty pool with the default first chunk size.
    pub fn new() -> Self {
        Self::with_chunk_size(DEFAULT_CHUNK_SIZE)
    }

    /// Create an empty pool whose first chunk holds `chunk_size` slots.
    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self {
            chunks: vec![],
            chunk_size: chunk_size.max(1),
            used: 0,
            wasted: 0,
            reserved: 0,
        }
    }

    /// Reserve a contiguous block of `n` default-initialized slots.
    ///
    /// When the active chunk cannot hold the block, its unused tail is abandoned and a new
    /// chunk of at least twice the previous size is reserved.
    pub fn allocate(&mut self, n: usize) -> Result<Block> {
        if n == 0 {
            return Ok(Block {
                chunk: self.chunks.len().saturating_sub(1) as u32,
                slots: 0..0,
            });
        }
        if n > self.remaining() {
            self.grow(n)?;
        }

        let chunk_index = self.chunks.len() - 1;
        let chunk = &mut self.chunks[chunk_index];
        let start = chunk.slots.len();
        chunk.slots.extend((0..n).map(|_| T::default()));
        self.used += n;

        Ok(Block {
            chunk: chunk_index as u32,
            slots: start as u32..(start + n) as u32,
        })
    }

    /// Allocate a single slot holding `value`.
    pub fn push(&mut self, value: T) -> Result<NodeId> {
        let id = self.allocate(1)?.get(0);
        *self.get_mut(id) = value;
        Ok(id)
    }

    fn grow(&mut self, n: usize) -> Result<()> {
        self.wasted += self.remaining();

        let capacity = match self.chunks.last() {
            Some(last) => (last.capacity * 2).max(n),
            None => self.chunk_size.max(n),
        };
        if self.chunks.len() >= u32::MAX as usize || capacity > u32::MAX as usize {
            return Err(TreeIndexError::Allocation { requested: n });
        }

        let mut slots = Vec::new();
        slots
            .try_reserve_exact(capacity)
            .map_err(|_| TreeIndexError::Allocation { requested: n })?;
        self.chunks.push(Chunk { slots, capacity });
        self.reserved += capacity;
        Ok(())
    }
}

impl<T: Default> Default for PooledAllocator<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> PooledAllocator<T> {
    #[inline]
    pub fn get(&self, id: NodeId) -> &T {
        &self.chunks[id.chunk as usize].slots[id.slot as usize]
    }

    #[inline]
    pub fn get_mut(&mut self, id: NodeId) -> &mut T {
        &mut self.chunks[id.chunk as usize].slots[id.slot as usize]
    }

    /// Unused slots left in the active chunk.
    pub fn remaining(&self) -> usize {
        self.chunks
            .last()
            .map_or(0, |chunk| chunk.capacity - chunk.slots.len())
    }

    /// Slots handed out so far.
    pub fn used(&self) -> usize {
        self.used
    }

    /// Slots abandoned at the end of full chunks.
    pub fn wasted(&self) -> usize {
        self.wasted
    }

    /// Slots reserved across all chunks.
    pub fn reserved(&self) -> usize {
        self.reserved
    }

    pub fn used_bytes(&self) -> usize {
        self.used * size_of::<T>()
    }

    pub fn reserved_bytes(&self) -> usize {
        self.reserved * size_of::<T>()
    }

    pub fn num_chunks(&self) -> usize {
        self.chunks.len()
    }

    /// Release every chunk. All previously returned ids become invalid.
    pub fn clear(&mut self) {
        self.chunks = vec![];
        self.used = 0;
        self.wasted = 0;
        self.reserved = 0;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn blocks_are_contiguous() {
        let mut pool = PooledAllocator::<u64>::with_chunk_size(8);
        let block = pool.allocate(3).unwrap();
        assert_eq!(block.len(), 3);
        for (i, id) in block.iter().enumerate() {
            *pool.get_mut(id) = i as u64 * 10;
        }
        assert_eq!(*pool.get(block.get(2)), 20);
        assert_eq!(block.get(0).offset(1), block.get(1));
        assert_eq!(pool.remaining(), 5);
        assert_eq!(pool.used(), 3);
    }

    #[test]
    fn empty_blocks_reserve_nothing() {
        let mut pool = PooledAllocator::<u32>::new();
        let block = pool.allocate(0).unwrap();
        assert!(block.is_empty());
        assert_eq!(block.iter().count(), 0);
        assert_eq!(pool.num_chunks(), 0);
        assert_eq!(pool.reserved(), 0);

        pool.allocate(2).unwrap();
        assert!(pool.allocate(0).unwrap().is_empty());
        assert_eq!(pool.used(), 2);
        assert_eq!(pool.num_chunks(), 1);
    }

    #[test]
    fn grows_into_larger_chunks() {
        let mut pool = PooledAllocator::<u32>::with_chunk_size(4);
        pool.allocate(3).unwrap();
        assert_eq!(pool.remaining(), 1);

        // does not fit, the last slot is wasted
        pool.allocate(2).unwrap();
        assert_eq!(pool.num_chunks(), 2);
        assert_eq!(pool.wasted(), 1);
        assert_eq!(pool.reserved(), 4 + 8);
        assert_eq!(pool.remaining(), 6);

        // oversized requests get a chunk of their own size
        pool.allocate(40).unwrap();
        assert_eq!(pool.reserved(), 4 + 8 + 40);
        assert_eq!(pool.remaining(), 0);
    }

    #[test]
    fn remaining_decreases_until_growth() {
        let mut pool = PooledAllocator::<[f64; 4]>::with_chunk_size(16);
        let mut last_remaining = None;
        let mut last_chunks = 0;
        for i in 0..200 {
            pool.allocate(1 + i % 3).unwrap();
            assert!(pool.used_bytes() <= pool.reserved_bytes());
            assert_eq!(pool.used() + pool.wasted() + pool.remaining(), pool.reserved());
            if pool.num_chunks() == last_chunks {
                assert!(pool.remaining() < last_remaining.unwrap());
            }
            last_remaining = Some(pool.remaining());
            last_chunks = pool.num_chunks();
        }
    }

    #[test]
    fn push_and_clear() {
        let mut pool = PooledAllocator::<i32>::new();
        let a = pool.push(5).unwrap();
        let b = pool.push(7).unwrap();
        assert_eq!(*pool.get(a) + *pool.get(b), 12);
        pool.clear();
        assert_eq!(pool.used(), 0);
        assert_eq!(pool.remaining(), 0);
        assert_eq!(pool.num_chunks(), 0);
    }
}
