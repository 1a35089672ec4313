//! Stack allocator implementation - LIFO allocation with per-block headers

use std::cell::Cell;

use super::{
    region::Region,
    traits::{Allocator, AllocatorCapabilities, Block},
};
use crate::{
    config::MAX_ALIGNMENT,
    error::{Result, UglyError},
};

/// Bytes reserved in front of every payload.
///
/// The header holds one word: the distance from the header to the stack top
/// right after its block was (re)sized. It is padded to a full alignment unit
/// so the payload that follows is maximally aligned too.
pub const HEADER_SIZE: usize = MAX_ALIGNMENT;

/// Stack allocator - frees and resizes, but only the topmost live block
///
/// Each block's header lets the allocator check, on every free or resize,
/// that the block is the top of the stack. Out-of-order requests are rejected
/// with [`UglyError::OutOfOrder`] and leave the allocator untouched.
#[derive(Debug)]
pub struct StackAllocator<'a> {
    region: Region<'a>,
    /// First aligned offset in the region
    start: usize,
    /// Offset just past the topmost live block, or `start` when empty
    current: Cell<usize>,
    /// Number of live blocks
    depth: Cell<usize>,
}

impl<'a> StackAllocator<'a> {
    /// Create a new stack allocator over `memory`
    pub fn new(memory: &'a mut [u8]) -> Result<Self> {
        let region = Region::new(memory)?;
        let start = region.align_offset(0, MAX_ALIGNMENT);

        log::debug!(
            "stack allocator over {} bytes (start offset {})",
            region.len(),
            start
        );

        Ok(Self {
            region,
            start,
            current: Cell::new(start),
            depth: Cell::new(0),
        })
    }

    /// Get current stack top offset
    pub fn position(&self) -> usize {
        self.current.get()
    }

    /// Get the number of live blocks
    pub fn depth(&self) -> usize {
        self.depth.get()
    }

    /// Size the block whose header sits at `header` and move the top past it
    fn close(&self, header: usize, size: usize) -> Result<Block> {
        let end = self.region.len();
        let payload = header + HEADER_SIZE;

        let payload_end = match payload.checked_add(size) {
            Some(payload_end) if payload_end <= end => payload_end,
            _ => {
                log::trace!("stack allocator exhausted: {} bytes at offset {}", size, payload);
                return Err(UglyError::insufficient_space(
                    size,
                    end.saturating_sub(payload),
                ));
            }
        };

        let next = self.region.align_offset(payload_end, MAX_ALIGNMENT);
        self.region.write_word(header, next - header)?;
        self.current.set(next);

        Ok(self.region.block(payload, size))
    }

    /// Header offset of `block`, provided it is the top of the stack
    fn top_header(&self, block: &Block) -> Result<usize> {
        let foreign = || UglyError::foreign_block(block.address());

        let offset = self.region.offset_of(block).ok_or_else(foreign)?;
        let header = offset
            .checked_sub(HEADER_SIZE)
            .filter(|header| *header >= self.start)
            .ok_or_else(foreign)?;

        let distance = self.region.read_word(header)?;
        if distance < HEADER_SIZE || header.checked_add(distance) != Some(self.current.get()) {
            return Err(UglyError::out_of_order("stack", offset));
        }

        Ok(header)
    }
}

impl Allocator for StackAllocator<'_> {
    fn allocate(&self, size: usize) -> Result<Block> {
        if size == 0 {
            return Err(UglyError::invalid_parameter(
                "size",
                "Size must be greater than 0",
            ));
        }

        let block = self.close(self.current.get(), size)?;
        self.depth.set(self.depth.get() + 1);
        Ok(block)
    }

    unsafe fn reallocate(&self, block: Block, size: usize) -> Result<Block> {
        if size == 0 {
            return Err(UglyError::invalid_parameter(
                "size",
                "Size must be greater than 0",
            ));
        }

        let header = self.top_header(&block)?;
        self.close(header, size)
    }

    unsafe fn deallocate(&self, block: Block) -> Result<()> {
        let header = self.top_header(&block)?;
        self.current.set(header);
        self.depth.set(self.depth.get().saturating_sub(1));
        Ok(())
    }

    fn total_size(&self) -> usize {
        self.region.len() - self.start
    }

    fn used_size(&self) -> usize {
        self.current.get() - self.start
    }

    fn owns(&self, block: &Block) -> bool {
        self.region.offset_of(block).is_some_and(|offset| {
            offset >= self.start + HEADER_SIZE && offset < self.current.get()
        })
    }

    fn reset(&mut self) -> Result<()> {
        self.current.set(self.start);
        self.depth.set(0);
        Ok(())
    }

    fn capabilities(&self) -> AllocatorCapabilities {
        AllocatorCapabilities {
            lifo_only: true,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capabilities() {
        let mut memory = vec![0u8; 64];
        let caps = StackAllocator::new(&mut memory).unwrap().capabilities();
        assert!(caps.supports_deallocation);
        assert!(caps.lifo_only);
        assert_eq!(caps.fixed_chunk_size, None);
        assert!(!caps.may_move_on_realloc);
    }

    #[test]
    fn test_header_precedes_payload() {
        let mut memory = vec![0u8; 256];
        let stack = StackAllocator::new(&mut memory).unwrap();
        let start = stack.position();

        let a = stack.allocate(20).unwrap();
        assert!(a.is_aligned_to(MAX_ALIGNMENT));
        // header + 20 bytes rounded up to 32
        assert_eq!(stack.position(), start + HEADER_SIZE + 32);
        assert_eq!(stack.depth(), 1);
    }

    #[test]
    fn test_free_restores_position() {
        let mut memory = vec![0u8; 256];
        let stack = StackAllocator::new(&mut memory).unwrap();
        let start = stack.position();

        let a = stack.allocate(8).unwrap();
        let after_a = stack.position();
        let b = stack.allocate(8).unwrap();

        unsafe { stack.deallocate(b) }.unwrap();
        assert_eq!(stack.position(), after_a);
        unsafe { stack.deallocate(a) }.unwrap();
        assert_eq!(stack.position(), start);
        assert_eq!(stack.depth(), 0);
    }

    #[test]
    fn test_out_of_order_rejected() {
        let mut memory = vec![0u8; 256];
        let stack = StackAllocator::new(&mut memory).unwrap();

        let a = stack.allocate(8).unwrap();
        let _b = stack.allocate(8).unwrap();
        let top = stack.position();

        assert!(matches!(
            unsafe { stack.deallocate(a) },
            Err(UglyError::OutOfOrder { allocator: "stack", .. })
        ));
        assert!(unsafe { stack.reallocate(a, 64) }.is_err());
        assert_eq!(stack.position(), top);
        assert_eq!(stack.depth(), 2);
    }

    #[test]
    fn test_stale_block_rejected_after_free() {
        let mut memory = vec![0u8; 256];
        let stack = StackAllocator::new(&mut memory).unwrap();

        let _a = stack.allocate(8).unwrap();
        let b = stack.allocate(8).unwrap();
        unsafe { stack.deallocate(b) }.unwrap();

        assert!(unsafe { stack.deallocate(b) }.is_err());
    }

    #[test]
    fn test_realloc_top_in_place() {
        let mut memory = vec![0u8; 256];
        let stack = StackAllocator::new(&mut memory).unwrap();

        let a = stack.allocate(8).unwrap();
        unsafe { a.as_mut_slice() }.copy_from_slice(b"abcdefgh");

        let grown = unsafe { stack.reallocate(a, 100) }.unwrap();
        assert_eq!(grown.as_ptr(), a.as_ptr());
        assert_eq!(&unsafe { grown.as_slice() }[..8], b"abcdefgh");

        let too_big = unsafe { stack.reallocate(grown, 4096) };
        assert!(matches!(too_big, Err(UglyError::InsufficientSpace { .. })));
        // the failed resize left the top where it was
        unsafe { stack.deallocate(grown) }.unwrap();
        assert_eq!(stack.depth(), 0);
    }
}
