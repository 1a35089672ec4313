//! Slot storage for [`Map`](super::Map): two parallel arrays in allocator memory

use std::{borrow::Borrow, marker::PhantomData, mem::MaybeUninit, ptr::NonNull};

use crate::{
    allocators::{AllocatorHandle, Block},
    error::{Result, UglyError},
};

/// Lifecycle of one slot
///
/// `Free -> InUse` on insert into a never-used slot, `InUse -> Tombstone` on
/// removal, `Tombstone -> InUse` when an insert reuses it. A rehash starts
/// every slot of the new table as `Free`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub(crate) enum SlotState {
    Free,
    InUse,
    Tombstone,
}

/// One slot of the keys array
#[repr(C)]
pub(crate) struct Entry<K> {
    pub(crate) state: SlotState,
    pub(crate) key: MaybeUninit<K>,
}

impl<K> Entry<K> {
    pub(crate) fn is_live(&self) -> bool {
        self.state == SlotState::InUse
    }

    /// # Safety
    /// The slot must be live.
    pub(crate) unsafe fn key(&self) -> &K {
        self.key.assume_init_ref()
    }
}

/// Fixed-length array of `T` carved out of one allocator block
struct RawArray<T> {
    ptr: NonNull<T>,
    len: usize,
    block: Option<Block>,
}

impl<T> RawArray<T> {
    fn allocate(alloc: AllocatorHandle<'_>, len: usize) -> Result<Self> {
        let bytes = std::mem::size_of::<T>()
            .checked_mul(len)
            .ok_or_else(|| UglyError::invalid_parameter("capacity", "Capacity overflows"))?;

        // zero-sized storage needs no memory
        if bytes == 0 {
            return Ok(Self {
                ptr: NonNull::dangling(),
                len,
                block: None,
            });
        }

        let block = alloc
            .allocate(bytes)
            .map_err(|err| UglyError::out_of_memory(bytes, err))?;

        let align = std::mem::align_of::<T>();
        if !block.is_aligned_to(align) {
            // SAFETY: the block was just handed out by this allocator
            if let Err(err) = unsafe { alloc.deallocate(block) } {
                log::warn!("misaligned block not returned to allocator: {}", err);
            }
            return Err(UglyError::alignment(block.address(), align));
        }

        Ok(Self {
            ptr: block.as_non_null().cast(),
            len,
            block: Some(block),
        })
    }

    /// # Safety
    /// The array must have been allocated from `alloc` and must not be used afterwards.
    unsafe fn release(&mut self, alloc: AllocatorHandle<'_>) -> Result<()> {
        match self.block.take() {
            Some(block) => alloc.deallocate(block),
            None => Ok(()),
        }
    }
}

/// Result of walking a key's probe sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Probe {
    /// The key is live at this slot
    Occupied(usize),
    /// The key is absent; this is where it would be inserted
    Vacant(usize),
}

/// Keys-with-metadata and values arrays of equal length
pub(crate) struct Table<K, V> {
    entries: RawArray<Entry<K>>,
    values: RawArray<MaybeUninit<V>>,
    _marker: PhantomData<(K, V)>,
}

impl<K, V> Table<K, V> {
    /// Allocate a table of `capacity` slots, all `Free`
    pub(crate) fn allocate(alloc: AllocatorHandle<'_>, capacity: usize) -> Result<Self> {
        debug_assert!(capacity.is_power_of_two());

        let mut entries = RawArray::<Entry<K>>::allocate(alloc, capacity)?;
        let values = match RawArray::<MaybeUninit<V>>::allocate(alloc, capacity) {
            Ok(values) => values,
            Err(err) => {
                // SAFETY: allocated from `alloc` above and never exposed
                if let Err(release) = unsafe { entries.release(alloc) } {
                    log::warn!("keys array not returned to allocator: {}", release);
                }
                return Err(err);
            }
        };

        for i in 0..capacity {
            // SAFETY: i < capacity, and the memory is owned by this array
            unsafe {
                entries.ptr.as_ptr().add(i).write(Entry {
                    state: SlotState::Free,
                    key: MaybeUninit::uninit(),
                });
            }
        }

        Ok(Self {
            entries,
            values,
            _marker: PhantomData,
        })
    }

    pub(crate) fn capacity(&self) -> usize {
        self.entries.len
    }

    pub(crate) fn entries(&self) -> &[Entry<K>] {
        // SAFETY: every slot was initialized in `allocate`
        unsafe { std::slice::from_raw_parts(self.entries.ptr.as_ptr(), self.entries.len) }
    }

    pub(crate) fn values(&self) -> &[MaybeUninit<V>] {
        // SAFETY: MaybeUninit needs no initialization
        unsafe { std::slice::from_raw_parts(self.values.ptr.as_ptr(), self.values.len) }
    }

    pub(crate) fn parts_mut(&mut self) -> (&mut [Entry<K>], &mut [MaybeUninit<V>]) {
        // SAFETY: the two arrays never overlap and are exclusively borrowed through `self`
        unsafe {
            (
                std::slice::from_raw_parts_mut(self.entries.ptr.as_ptr(), self.entries.len),
                std::slice::from_raw_parts_mut(self.values.ptr.as_ptr(), self.values.len),
            )
        }
    }

    /// Drop every live key and value and mark all slots `Free`
    pub(crate) fn clear(&mut self) {
        let (entries, values) = self.parts_mut();
        for (entry, value) in entries.iter_mut().zip(values.iter_mut()) {
            let live = entry.is_live();
            // freed before dropping so a panicking drop cannot leave a live, dropped slot
            entry.state = SlotState::Free;
            if live {
                // SAFETY: the slot was live, so key and value are initialized
                unsafe {
                    entry.key.assume_init_drop();
                    value.assume_init_drop();
                }
            }
        }
    }

    /// Return both arrays to `alloc`, values first so a LIFO allocator can take them
    ///
    /// # Safety
    /// The table must have been allocated from `alloc`; no live slots may remain.
    pub(crate) unsafe fn release(&mut self, alloc: AllocatorHandle<'_>) -> Result<()> {
        let values = self.values.release(alloc);
        let entries = self.entries.release(alloc);
        values.and(entries)
    }
}

/// Walk the probe sequence for `key`
///
/// 1. `hash & mask`: stop on a live match or a never-used slot.
/// 2. `(hash + (hash >> 16)) & mask`, then linearly onward, remembering the
///    first tombstone; stop on a live match or a never-used slot.
///
/// A miss resolves to the earliest tombstone seen, else the never-used slot.
/// Terminates because the load factor keeps at least one slot `Free`.
pub(crate) fn probe<K, Q>(entries: &[Entry<K>], hash: u64, key: &Q) -> Probe
where
    K: Borrow<Q>,
    Q: Eq + ?Sized,
{
    let mask = entries.len() - 1;
    let hash = hash as usize;
    let mut tombstone = None;

    let first = hash & mask;
    match entries[first].state {
        SlotState::Free => return Probe::Vacant(first),
        // SAFETY: live slots hold initialized keys
        SlotState::InUse if unsafe { entries[first].key() }.borrow() == key => {
            return Probe::Occupied(first)
        }
        SlotState::Tombstone => tombstone = Some(first),
        SlotState::InUse => {}
    }

    let mut index = hash.wrapping_add(hash >> 16) & mask;
    loop {
        let entry = &entries[index];
        match entry.state {
            SlotState::Free => return Probe::Vacant(tombstone.unwrap_or(index)),
            SlotState::Tombstone => {
                tombstone.get_or_insert(index);
            }
            SlotState::InUse => {
                // SAFETY: live slots hold initialized keys
                if unsafe { entry.key() }.borrow() == key {
                    return Probe::Occupied(index);
                }
            }
        }
        index = (index + 1) & mask;
    }
}

/// First never-used slot on the probe sequence for `hash`
///
/// Used while rehashing, where the table has no tombstones and keys are
/// known to be distinct, so no comparison is needed.
pub(crate) fn vacant_slot<K>(entries: &[Entry<K>], hash: u64) -> usize {
    let mask = entries.len() - 1;
    let hash = hash as usize;

    let first = hash & mask;
    if entries[first].state == SlotState::Free {
        return first;
    }

    let mut index = hash.wrapping_add(hash >> 16) & mask;
    while entries[index].state != SlotState::Free {
        index = (index + 1) & mask;
    }
    index
}
