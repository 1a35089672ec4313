//! Pool allocator implementation - fixed-size chunk allocation

use std::{cell::Cell, mem};

use super::{
    region::{align_up, Region},
    traits::{Allocator, AllocatorCapabilities, Block},
};
use crate::{
    config::MAX_ALIGNMENT,
    error::{Result, UglyError},
};

/// End-of-list marker for the free list
const NIL: usize = usize::MAX;

/// Pool allocator for fixed-size chunks
///
/// The region is split into equal chunks at construction. Free chunks store
/// the offset of the next free chunk in their first word, so the free list
/// needs no memory of its own. Allocation pops the head and freeing pushes
/// onto it, which makes reuse LIFO.
#[derive(Debug)]
pub struct PoolAllocator<'a> {
    region: Region<'a>,
    /// Offset of the first chunk
    start: usize,
    /// Size of each chunk
    chunk_size: usize,
    /// Total number of chunks
    chunk_count: usize,
    /// Offset of the first free chunk, or `NIL`
    free_head: Cell<usize>,
    /// Number of chunks handed out
    allocated: Cell<usize>,
}

impl<'a> PoolAllocator<'a> {
    /// Create a new pool allocator over `memory`
    ///
    /// `chunk_size` is raised to hold at least one free-list link and then
    /// rounded up to [`MAX_ALIGNMENT`] so every chunk is maximally aligned.
    /// The pool holds `usable_len / rounded_chunk_size` chunks, where
    /// `usable_len` is the buffer length past its leading alignment padding.
    /// A buffer of `n * chunk_size` bytes therefore yields fewer than `n`
    /// chunks when `chunk_size` is not a multiple of [`MAX_ALIGNMENT`]:
    /// 240 bytes split into 24 byte chunks gives 7 chunks of 32 bytes.
    pub fn new(memory: &'a mut [u8], chunk_size: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(UglyError::invalid_parameter(
                "chunk_size",
                "Chunk size must be greater than 0",
            ));
        }

        let chunk_size = align_up(chunk_size.max(mem::size_of::<usize>()), MAX_ALIGNMENT)
            .ok_or_else(|| UglyError::invalid_parameter("chunk_size", "Chunk size overflows"))?;

        let region = Region::new(memory)?;
        let start = region.align_offset(0, MAX_ALIGNMENT);
        let chunk_count = (region.len() - start) / chunk_size;

        if chunk_count == 0 {
            return Err(UglyError::invalid_parameter(
                "chunk_size",
                "Chunk size too large for memory region",
            ));
        }

        let allocator = Self {
            region,
            start,
            chunk_size,
            chunk_count,
            free_head: Cell::new(NIL),
            allocated: Cell::new(0),
        };

        allocator.initialize_free_list()?;

        log::debug!(
            "pool allocator with {} chunks of {} bytes",
            chunk_count,
            chunk_size
        );

        Ok(allocator)
    }

    /// Get chunk size
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Get total number of chunks
    pub fn chunk_count(&self) -> usize {
        self.chunk_count
    }

    /// Get number of free chunks
    pub fn free_chunks(&self) -> usize {
        self.chunk_count - self.allocated.get()
    }

    /// Check if every chunk is handed out
    pub fn is_full(&self) -> bool {
        self.allocated.get() >= self.chunk_count
    }

    /// Initialize the free list by linking all chunks in address order
    fn initialize_free_list(&self) -> Result<()> {
        for i in 0..self.chunk_count {
            let offset = self.start + i * self.chunk_size;
            let next = if i + 1 < self.chunk_count {
                offset + self.chunk_size
            } else {
                NIL
            };
            self.region.write_word(offset, next)?;
        }

        self.free_head.set(self.start);
        self.allocated.set(0);
        Ok(())
    }

    /// Validate that an offset corresponds to a chunk boundary
    fn is_chunk_offset(&self, offset: usize) -> bool {
        offset >= self.start
            && (offset - self.start) % self.chunk_size == 0
            && (offset - self.start) / self.chunk_size < self.chunk_count
    }

    fn chunk_of(&self, block: &Block) -> Result<usize> {
        self.region
            .offset_of(block)
            .filter(|offset| self.is_chunk_offset(*offset))
            .ok_or_else(|| UglyError::foreign_block(block.address()))
    }
}

impl Allocator for PoolAllocator<'_> {
    fn allocate(&self, size: usize) -> Result<Block> {
        if size == 0 {
            return Err(UglyError::invalid_parameter(
                "size",
                "Size must be greater than 0",
            ));
        }

        // Pool allocator only supports allocations <= chunk_size
        if size > self.chunk_size {
            return Err(UglyError::chunk_too_large(size, self.chunk_size));
        }

        let head = self.free_head.get();
        if head == NIL {
            log::trace!("pool allocator exhausted ({} chunks)", self.chunk_count);
            return Err(UglyError::insufficient_space(size, 0));
        }

        let next = self.region.read_word(head)?;
        if next != NIL && !self.is_chunk_offset(next) {
            // a freed chunk was written to after release
            return Err(UglyError::foreign_block(self.region.block(head, 1).address()));
        }

        self.free_head.set(next);
        self.allocated.set(self.allocated.get() + 1);
        Ok(self.region.block(head, size))
    }

    /// Chunks are already maximally sized, so this only checks the size.
    ///
    /// Success returns the same chunk with its size updated. No bytes move
    /// and no bookkeeping changes.
    unsafe fn reallocate(&self, block: Block, size: usize) -> Result<Block> {
        self.chunk_of(&block)?;

        if size == 0 {
            return Err(UglyError::invalid_parameter(
                "size",
                "Size must be greater than 0",
            ));
        }

        if size > self.chunk_size {
            return Err(UglyError::chunk_too_large(size, self.chunk_size));
        }

        Ok(block.with_size(size))
    }

    unsafe fn deallocate(&self, block: Block) -> Result<()> {
        let offset = self.chunk_of(&block)?;

        // Add the chunk back to the free list
        self.region.write_word(offset, self.free_head.get())?;
        self.free_head.set(offset);
        self.allocated.set(self.allocated.get().saturating_sub(1));
        Ok(())
    }

    fn total_size(&self) -> usize {
        self.chunk_count * self.chunk_size
    }

    fn used_size(&self) -> usize {
        self.allocated.get() * self.chunk_size
    }

    fn owns(&self, block: &Block) -> bool {
        self.chunk_of(block).is_ok()
    }

    fn reset(&mut self) -> Result<()> {
        self.initialize_free_list()
    }

    fn capabilities(&self) -> AllocatorCapabilities {
        AllocatorCapabilities {
            fixed_chunk_size: Some(self.chunk_size),
            ..Default::default()
        }
    }
}
