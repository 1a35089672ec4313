//! Bounds-checked access to a caller-owned backing buffer
//!
//! Every raw read or write the buffer strategies perform goes through here.
//! Positions are byte offsets from the buffer start; pointers only come back
//! out wrapped in a [`Block`].

use std::{marker::PhantomData, mem, ptr::NonNull};

use super::traits::Block;
use crate::error::{Result, UglyError};

const WORD: usize = mem::size_of::<usize>();

/// Round `value` up to a multiple of `align` (a power of two)
pub(crate) fn align_up(value: usize, align: usize) -> Option<usize> {
    debug_assert!(align.is_power_of_two());
    value.checked_add(align - 1).map(|v| v & !(align - 1))
}

pub(crate) struct Region<'a> {
    base: NonNull<u8>,
    len: usize,
    _buffer: PhantomData<&'a mut [u8]>,
}

impl<'a> Region<'a> {
    pub(crate) fn new(memory: &'a mut [u8]) -> Result<Self> {
        if memory.is_empty() {
            return Err(UglyError::invalid_parameter(
                "memory",
                "Memory region cannot be empty",
            ));
        }

        let len = memory.len();
        let base = NonNull::from(memory).cast::<u8>();

        Ok(Self {
            base,
            len,
            _buffer: PhantomData,
        })
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    fn base_addr(&self) -> usize {
        self.base.as_ptr() as usize
    }

    /// Smallest offset `>= offset` whose address is aligned to `align`,
    /// clamped to the buffer end
    pub(crate) fn align_offset(&self, offset: usize, align: usize) -> usize {
        self.base_addr()
            .checked_add(offset)
            .and_then(|addr| align_up(addr, align))
            .map_or(self.len, |aligned| aligned - self.base_addr())
            .min(self.len)
    }

    /// Offset of `block` inside this buffer, if it lies entirely within it
    pub(crate) fn offset_of(&self, block: &Block) -> Option<usize> {
        let offset = block.address().checked_sub(self.base_addr())?;
        let end = offset.checked_add(block.size())?;
        (offset < self.len && end <= self.len).then_some(offset)
    }

    pub(crate) fn block(&self, offset: usize, size: usize) -> Block {
        debug_assert!(offset < self.len && offset + size <= self.len);
        // SAFETY: offset is inside the buffer, so the pointer is in bounds and non-null
        let ptr = unsafe { NonNull::new_unchecked(self.base.as_ptr().add(offset)) };
        Block::new(ptr, size)
    }

    pub(crate) fn read_word(&self, offset: usize) -> Result<usize> {
        self.check_word(offset)?;
        // SAFETY: checked to lie within the buffer; every byte of it is initialized
        Ok(unsafe { self.base.as_ptr().add(offset).cast::<usize>().read_unaligned() })
    }

    pub(crate) fn write_word(&self, offset: usize, value: usize) -> Result<()> {
        self.check_word(offset)?;
        // SAFETY: checked to lie within the buffer, which this region borrows exclusively
        unsafe {
            self.base
                .as_ptr()
                .add(offset)
                .cast::<usize>()
                .write_unaligned(value);
        }
        Ok(())
    }

    fn check_word(&self, offset: usize) -> Result<()> {
        match offset.checked_add(WORD) {
            Some(end) if end <= self.len => Ok(()),
            _ => Err(UglyError::foreign_block(
                self.base_addr().wrapping_add(offset),
            )),
        }
    }
}

impl std::fmt::Debug for Region<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Region")
            .field("base", &self.base)
            .field("len", &self.len)
            .finish()
    }
}
