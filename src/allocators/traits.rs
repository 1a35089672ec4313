//! Allocator trait definition

use std::{fmt, ptr::NonNull};

use crate::error::{Result, UglyError};

/// A live allocation handed out by an [`Allocator`]
///
/// Blocks are plain handles: copying one does not duplicate the memory, and
/// dropping one does not release it. Only allocators create them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    ptr: NonNull<u8>,
    size: usize,
}

impl Block {
    pub(crate) fn new(ptr: NonNull<u8>, size: usize) -> Self {
        Self { ptr, size }
    }

    pub(crate) fn with_size(self, size: usize) -> Self {
        Self { size, ..self }
    }

    /// Start of the block
    pub fn as_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    /// Start of the block as a non-null pointer
    pub fn as_non_null(&self) -> NonNull<u8> {
        self.ptr
    }

    /// Numeric address of the block start
    pub fn address(&self) -> usize {
        self.ptr.as_ptr() as usize
    }

    /// Usable size in bytes, as requested by the caller
    pub fn size(&self) -> usize {
        self.size
    }

    /// Check whether the block start satisfies `align`
    pub fn is_aligned_to(&self, align: usize) -> bool {
        align.is_power_of_two() && self.address() & (align - 1) == 0
    }

    /// View the block contents
    ///
    /// # Safety
    /// - The block must still be live in the allocator that produced it
    /// - No mutable view of the same bytes may exist for `'b`
    pub unsafe fn as_slice<'b>(&self) -> &'b [u8] {
        std::slice::from_raw_parts(self.ptr.as_ptr(), self.size)
    }

    /// Mutably view the block contents
    ///
    /// # Safety
    /// - The block must still be live in the allocator that produced it
    /// - No other view of the same bytes may exist for `'b`
    pub unsafe fn as_mut_slice<'b>(&self) -> &'b mut [u8] {
        std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.size)
    }
}

/// Trait for buffer-backed allocators
///
/// All strategies share `&self` access so a single allocator can back several
/// containers at once. State lives in `Cell`s; none of the implementations is
/// meant to be shared across threads.
pub trait Allocator: fmt::Debug {
    /// Allocate at least `size` bytes aligned to [`crate::config::MAX_ALIGNMENT`]
    fn allocate(&self, size: usize) -> Result<Block>;

    /// Resize `block` to `size` bytes
    ///
    /// Buffer-backed strategies only resize in place. On failure the original
    /// block is left untouched and remains live.
    ///
    /// # Safety
    /// `block` must have been returned by this allocator and not released since.
    unsafe fn reallocate(&self, block: Block, size: usize) -> Result<Block>;

    /// Release `block`
    ///
    /// # Safety
    /// `block` must have been returned by this allocator and not released since.
    unsafe fn deallocate(&self, block: Block) -> Result<()>;

    /// Get the total number of bytes this allocator can hand out
    fn total_size(&self) -> usize;

    /// Get the number of bytes currently handed out, including bookkeeping
    fn used_size(&self) -> usize;

    /// Get the amount of available memory
    fn available_size(&self) -> usize {
        self.total_size().saturating_sub(self.used_size())
    }

    /// Check if a block lies inside the memory this allocator manages
    fn owns(&self, block: &Block) -> bool;

    /// Discard every allocation at once
    fn reset(&mut self) -> Result<()>;

    /// Describe what the strategy supports
    fn capabilities(&self) -> AllocatorCapabilities;

    /// Get allocator type name for debugging
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Borrow this allocator as a handle for consumers
    fn handle(&self) -> AllocatorHandle<'_>
    where
        Self: Sized,
    {
        AllocatorHandle::new(self)
    }
}

/// Common allocator operations
pub trait AllocatorExt: Allocator {
    /// Allocate and zero-initialize memory
    fn allocate_zeroed(&self, size: usize) -> Result<Block> {
        let block = self.allocate(size)?;
        unsafe {
            std::ptr::write_bytes(block.as_ptr(), 0, block.size());
        }
        Ok(block)
    }

    /// Resize in place, falling back to allocate + copy + free
    ///
    /// Allocators never move blocks on their own; containers that need
    /// move-on-grow go through this. If the fallback allocation fails the
    /// original block is still live.
    ///
    /// # Safety
    /// `block` must have been returned by this allocator and not released since.
    unsafe fn resize_or_move(&self, block: Block, size: usize) -> Result<Block> {
        match self.reallocate(block, size) {
            Ok(resized) => Ok(resized),
            Err(_) => {
                let fresh = self.allocate(size)?;
                std::ptr::copy_nonoverlapping(
                    block.as_ptr(),
                    fresh.as_ptr(),
                    block.size().min(size),
                );
                if let Err(err) = self.deallocate(block) {
                    log::trace!("old block kept after move: {}", err);
                }
                Ok(fresh)
            }
        }
    }

    /// Get utilization percentage (0.0 to 1.0)
    fn utilization(&self) -> f64 {
        if self.total_size() == 0 {
            return 0.0;
        }
        self.used_size() as f64 / self.total_size() as f64
    }
}

// Blanket implementation for all Allocators
impl<T: Allocator + ?Sized> AllocatorExt for T {}

/// Allocator capabilities flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocatorCapabilities {
    /// Releasing a block gives its memory back
    pub supports_deallocation: bool,
    /// Only the most recent live block may be released or resized
    pub lifo_only: bool,
    /// Every allocation is served from chunks of this size
    pub fixed_chunk_size: Option<usize>,
    /// A successful reallocation may return a different address
    pub may_move_on_realloc: bool,
}

impl Default for AllocatorCapabilities {
    fn default() -> Self {
        Self {
            supports_deallocation: true,
            lifo_only: false,
            fixed_chunk_size: None,
            may_move_on_realloc: false,
        }
    }
}

/// One allocator operation, selected explicitly instead of by argument pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    /// Fresh block of at least `size` bytes
    Allocate { size: usize },
    /// Resize an existing block
    Reallocate { block: Block, size: usize },
    /// Release an existing block
    Deallocate { block: Block },
    /// Nothing to do
    Noop,
}

impl Request {
    /// Classify the classic `(ptr, size)` calling convention
    ///
    /// | block  | size | request      |
    /// |--------|------|--------------|
    /// | none   | 0    | `Noop`       |
    /// | none   | n    | `Allocate`   |
    /// | some   | 0    | `Deallocate` |
    /// | some   | n    | `Reallocate` |
    pub fn from_parts(block: Option<Block>, size: usize) -> Self {
        match (block, size) {
            (None, 0) => Self::Noop,
            (None, size) => Self::Allocate { size },
            (Some(block), 0) => Self::Deallocate { block },
            (Some(block), size) => Self::Reallocate { block, size },
        }
    }
}

/// Non-owning view of an allocator, passed by value to consumers
#[derive(Clone, Copy)]
pub struct AllocatorHandle<'a> {
    inner: &'a (dyn Allocator + 'a),
}

impl<'a> AllocatorHandle<'a> {
    /// Wrap an allocator
    pub fn new(allocator: &'a (dyn Allocator + 'a)) -> Self {
        Self { inner: allocator }
    }

    /// Handle to the heap-backed [`SystemAllocator`](super::SystemAllocator)
    pub fn system() -> AllocatorHandle<'static> {
        AllocatorHandle::new(&super::system::SYSTEM)
    }

    /// The allocator behind this handle
    pub fn allocator(&self) -> &'a (dyn Allocator + 'a) {
        self.inner
    }

    /// Allocate a fresh block
    pub fn allocate(&self, size: usize) -> Result<Block> {
        self.inner.allocate(size)
    }

    /// Resize a block, see [`Allocator::reallocate`]
    ///
    /// # Safety
    /// `block` must come from this handle's allocator and still be live.
    pub unsafe fn reallocate(&self, block: Block, size: usize) -> Result<Block> {
        self.inner.reallocate(block, size)
    }

    /// Release a block, see [`Allocator::deallocate`]
    ///
    /// # Safety
    /// `block` must come from this handle's allocator and still be live.
    pub unsafe fn deallocate(&self, block: Block) -> Result<()> {
        self.inner.deallocate(block)
    }

    /// Run one request against the allocator
    ///
    /// Returns the resulting block for `Allocate`/`Reallocate` and `None` for
    /// `Deallocate`/`Noop`.
    ///
    /// # Safety
    /// Any block inside `request` must come from this handle's allocator and
    /// still be live.
    pub unsafe fn request(&self, request: Request) -> Result<Option<Block>> {
        match request {
            Request::Allocate { size } => self.inner.allocate(size).map(Some),
            Request::Reallocate { block, size } => self.inner.reallocate(block, size).map(Some),
            Request::Deallocate { block } => self.inner.deallocate(block).map(|()| None),
            Request::Noop => Ok(None),
        }
    }

    /// Check that a block handed back by a foreign party is plausible
    pub fn check_owned(&self, block: &Block) -> Result<()> {
        if self.inner.owns(block) {
            Ok(())
        } else {
            Err(UglyError::foreign_block(block.address()))
        }
    }
}

impl Default for AllocatorHandle<'static> {
    fn default() -> Self {
        Self::system()
    }
}

impl fmt::Debug for AllocatorHandle<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AllocatorHandle")
            .field("allocator", &self.inner.type_name())
            .field("used", &self.inner.used_size())
            .field("total", &self.inner.total_size())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_owned() {
        use crate::allocators::{BumpAllocator, PoolAllocator};

        let mut memory = vec![0u8; 128];
        let bump = BumpAllocator::new(&mut memory).unwrap();
        let mut other = vec![0u8; 128];
        let pool = PoolAllocator::new(&mut other, 32).unwrap();

        let ours = bump.allocate(16).unwrap();
        let theirs = pool.allocate(16).unwrap();

        let handle = bump.handle();
        assert!(handle.check_owned(&ours).is_ok());
        assert!(matches!(
            handle.check_owned(&theirs),
            Err(UglyError::ForeignBlock { .. })
        ));
        assert!(pool.handle().check_owned(&theirs).is_ok());
    }

    fn dangling_block(size: usize) -> Block {
        Block::new(NonNull::dangling(), size)
    }

    #[test]
    fn test_request_from_parts() {
        let block = dangling_block(8);
        assert_eq!(Request::from_parts(None, 0), Request::Noop);
        assert_eq!(Request::from_parts(None, 16), Request::Allocate { size: 16 });
        assert_eq!(
            Request::from_parts(Some(block), 0),
            Request::Deallocate { block }
        );
        assert_eq!(
            Request::from_parts(Some(block), 32),
            Request::Reallocate { block, size: 32 }
        );
    }

    #[test]
    fn test_block_alignment_check() {
        let block = dangling_block(4);
        assert!(block.is_aligned_to(1));
        assert!(!block.is_aligned_to(3));
        assert_eq!(block.with_size(12).size(), 12);
    }

    #[test]
    fn test_noop_request_touches_nothing() {
        let handle = AllocatorHandle::system();
        let result = unsafe { handle.request(Request::Noop) }.unwrap();
        assert!(result.is_none());
    }
}
