//! Heap-backed allocator used as the explicit default

use std::{alloc::Layout, ptr::NonNull};

use super::traits::{Allocator, AllocatorCapabilities, Block};
use crate::{
    config::MAX_ALIGNMENT,
    error::{Result, UglyError},
};

/// Shared instance behind [`AllocatorHandle::system`](super::AllocatorHandle::system)
pub(crate) static SYSTEM: SystemAllocator = SystemAllocator;

/// Allocator backed by the process heap
///
/// Stateless: it keeps no counters, so `used_size` is always zero. Unlike the
/// buffer strategies, a successful reallocation may move the block.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemAllocator;

impl SystemAllocator {
    fn layout(size: usize) -> Result<Layout> {
        Layout::from_size_align(size, MAX_ALIGNMENT)
            .map_err(|err| UglyError::invalid_parameter("size", err.to_string()))
    }
}

impl Allocator for SystemAllocator {
    fn allocate(&self, size: usize) -> Result<Block> {
        if size == 0 {
            return Err(UglyError::invalid_parameter(
                "size",
                "Size must be greater than 0",
            ));
        }

        let layout = Self::layout(size)?;
        // SAFETY: layout has a non-zero size
        let ptr = unsafe { std::alloc::alloc(layout) };
        NonNull::new(ptr)
            .map(|ptr| Block::new(ptr, size))
            .ok_or_else(|| UglyError::insufficient_space(size, 0))
    }

    unsafe fn reallocate(&self, block: Block, size: usize) -> Result<Block> {
        if size == 0 {
            return Err(UglyError::invalid_parameter(
                "size",
                "Size must be greater than 0",
            ));
        }

        // validates the new size against the alignment before touching the block
        Self::layout(size)?;
        let old = Self::layout(block.size())?;
        let ptr = std::alloc::realloc(block.as_ptr(), old, size);
        NonNull::new(ptr)
            .map(|ptr| Block::new(ptr, size))
            .ok_or_else(|| UglyError::insufficient_space(size, 0))
    }

    unsafe fn deallocate(&self, block: Block) -> Result<()> {
        let layout = Self::layout(block.size())?;
        std::alloc::dealloc(block.as_ptr(), layout);
        Ok(())
    }

    fn total_size(&self) -> usize {
        isize::MAX as usize
    }

    fn used_size(&self) -> usize {
        0
    }

    /// Heap blocks cannot be told apart from foreign ones; any non-empty block is accepted.
    fn owns(&self, block: &Block) -> bool {
        block.size() > 0
    }

    fn reset(&mut self) -> Result<()> {
        Err(UglyError::invalid_parameter(
            "reset",
            "The system allocator cannot drop outstanding heap blocks",
        ))
    }

    fn capabilities(&self) -> AllocatorCapabilities {
        AllocatorCapabilities {
            may_move_on_realloc: true,
            ..Default::default()
        }
    }
}
