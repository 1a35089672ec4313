//! Bump allocator implementation - allocates sequentially from a memory region

use std::cell::Cell;

use super::{
    region::Region,
    traits::{Allocator, AllocatorCapabilities, Block},
};
use crate::{
    config::MAX_ALIGNMENT,
    error::{Result, UglyError},
};

/// Simple bump allocator - allocates sequentially from a memory region
///
/// Allocation is a pointer bump. Individual blocks are never freed; only the
/// most recent allocation can be resized in place. All memory is reclaimed by
/// [`Allocator::reset`].
#[derive(Debug)]
pub struct BumpAllocator<'a> {
    region: Region<'a>,
    /// First aligned offset in the region
    start: usize,
    /// Next free offset, always aligned or equal to the region end
    current: Cell<usize>,
    /// Start of the most recent allocation, or the region end when there is none
    previous: Cell<usize>,
}

impl<'a> BumpAllocator<'a> {
    /// Create a new bump allocator over `memory`
    pub fn new(memory: &'a mut [u8]) -> Result<Self> {
        let region = Region::new(memory)?;
        let start = region.align_offset(0, MAX_ALIGNMENT);
        let end = region.len();

        log::debug!("bump allocator over {} bytes (start offset {})", end, start);

        Ok(Self {
            region,
            start,
            current: Cell::new(start),
            previous: Cell::new(end),
        })
    }

    /// Get current position in the allocation region
    pub fn position(&self) -> usize {
        self.current.get()
    }

    /// Check if a specific size can be allocated
    pub fn can_allocate_size(&self, size: usize) -> bool {
        self.current
            .get()
            .checked_add(size)
            .is_some_and(|end| end <= self.region.len())
    }

    /// Place a block of `size` bytes at `start` and bump past it
    fn bump(&self, start: usize, size: usize) -> Result<Block> {
        let end = self.region.len();
        match start.checked_add(size) {
            Some(block_end) if block_end <= end => {
                self.previous.set(start);
                self.current
                    .set(self.region.align_offset(block_end, MAX_ALIGNMENT));
                Ok(self.region.block(start, size))
            }
            _ => {
                log::trace!("bump allocator exhausted: {} bytes at offset {}", size, start);
                Err(UglyError::insufficient_space(size, end - start))
            }
        }
    }
}

impl Allocator for BumpAllocator<'_> {
    fn allocate(&self, size: usize) -> Result<Block> {
        if size == 0 {
            return Err(UglyError::invalid_parameter(
                "size",
                "Size must be greater than 0",
            ));
        }

        self.bump(self.current.get(), size)
    }

    unsafe fn reallocate(&self, block: Block, size: usize) -> Result<Block> {
        if size == 0 {
            return Err(UglyError::invalid_parameter(
                "size",
                "Size must be greater than 0",
            ));
        }

        let offset = self
            .region
            .offset_of(&block)
            .ok_or_else(|| UglyError::foreign_block(block.address()))?;

        // only the most recent allocation sits right below the bump pointer
        let previous = self.previous.get();
        if previous == self.region.len() || offset != previous {
            return Err(UglyError::out_of_order("bump", offset));
        }

        self.bump(previous, size)
    }

    unsafe fn deallocate(&self, _block: Block) -> Result<()> {
        // Bump allocator doesn't support individual deallocation
        Ok(())
    }

    fn total_size(&self) -> usize {
        self.region.len() - self.start
    }

    fn used_size(&self) -> usize {
        self.current.get() - self.start
    }

    fn owns(&self, block: &Block) -> bool {
        self.region
            .offset_of(block)
            .is_some_and(|offset| offset >= self.start && offset < self.current.get())
    }

    fn reset(&mut self) -> Result<()> {
        self.current.set(self.start);
        self.previous.set(self.region.len());
        Ok(())
    }

    fn capabilities(&self) -> AllocatorCapabilities {
        AllocatorCapabilities {
            supports_deallocation: false,
            lifo_only: true,
            ..Default::default()
        }
    }
}
