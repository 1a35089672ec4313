//! Open-addressing hash map backed by an [`AllocatorHandle`]
//!
//! Keys and values live inline in two parallel arrays obtained from the
//! map's allocator. Removal leaves a tombstone so probe sequences stay intact;
//! tombstones count against the load factor until the next rehash drops them.

pub mod config;
pub mod stats;

mod table;

pub use config::{MapConfig, MapConfigBuilder};
pub use stats::MapStats;

use std::{
    borrow::Borrow,
    fmt,
    hash::{BuildHasher, Hash},
    mem::{self, MaybeUninit},
};

use table::{probe, vacant_slot, Entry, Probe, SlotState, Table};

use crate::{
    allocators::AllocatorHandle,
    config::DEFAULT_GROWTH_CAPACITY,
    error::{Result, UglyError},
    hash::FnvBuildHasher,
};

/// Hash map with tombstone deletion and power-of-two capacity
///
/// Capacity doubles when `filled + 1` would exceed `capacity * max_load_factor`.
/// Failed growth leaves the map exactly as it was.
pub struct Map<'a, K, V, S = FnvBuildHasher> {
    /// Live mappings
    count: usize,
    /// Live plus tombstoned slots
    filled: usize,
    max_load_factor: f64,
    table: Table<K, V>,
    hasher: S,
    alloc: AllocatorHandle<'a>,
}

impl<'a, K, V> Map<'a, K, V, FnvBuildHasher> {
    /// Create a map sized for `capacity` mappings, hashing keys with FNV-1a
    pub fn new(capacity: usize, alloc: AllocatorHandle<'a>) -> Result<Self> {
        Self::with_config(MapConfig::new(capacity), FnvBuildHasher::default(), alloc)
    }
}

impl<'a, K, V, S> Map<'a, K, V, S> {
    /// Create a map sized for `capacity` mappings with a custom key hasher
    pub fn with_hasher(capacity: usize, hasher: S, alloc: AllocatorHandle<'a>) -> Result<Self> {
        Self::with_config(MapConfig::new(capacity), hasher, alloc)
    }

    /// Create a map from a validated configuration
    pub fn with_config(config: MapConfig, hasher: S, alloc: AllocatorHandle<'a>) -> Result<Self> {
        config.validate()?;
        let capacity = config.table_capacity()?;
        let table = Table::allocate(alloc, capacity)?;

        log::trace!(
            "map created with {} slots from {}",
            capacity,
            alloc.allocator().type_name()
        );

        Ok(Self {
            count: 0,
            filled: 0,
            max_load_factor: config.max_load_factor,
            table,
            hasher,
            alloc,
        })
    }

    /// Gets the number of mappings contained in the map
    pub fn len(&self) -> usize {
        self.count
    }

    /// Checks whether the map is empty
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Number of slots, always a power of two
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// The allocator backing this map
    pub fn allocator(&self) -> AllocatorHandle<'a> {
        self.alloc
    }

    pub fn stats(&self) -> MapStats {
        MapStats {
            count: self.count,
            filled: self.filled,
            capacity: self.capacity(),
        }
    }

    /// Iterate over live entries in slot order
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            entries: self.table.entries().iter(),
            values: self.table.values().iter(),
            remaining: self.count,
        }
    }

    /// Visit every live entry in slot order
    ///
    /// The first error returned by `visit` halts the iteration and is passed
    /// back to the caller.
    pub fn for_each<E, F>(&mut self, mut visit: F) -> std::result::Result<(), E>
    where
        F: FnMut(&K, &mut V) -> std::result::Result<(), E>,
    {
        let (entries, values) = self.table.parts_mut();
        for (entry, value) in entries.iter().zip(values.iter_mut()) {
            if entry.is_live() {
                // SAFETY: live slots hold initialized keys and values
                unsafe { visit(entry.key(), value.assume_init_mut())? };
            }
        }
        Ok(())
    }

    /// Remove every mapping, keeping the current capacity
    pub fn clear(&mut self) {
        self.count = 0;
        self.filled = 0;
        self.table.clear();
    }

    fn exceeds_load(&self, filled: usize, capacity: usize) -> bool {
        filled as f64 > capacity as f64 * self.max_load_factor
    }
}

impl<'a, K, V, S> Map<'a, K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    /// Finds the value associated with the given key
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        let index = self.find(key)?;
        // SAFETY: `find` only returns live slots
        Some(unsafe { self.table.values()[index].assume_init_ref() })
    }

    /// Finds the value associated with the given key, mutably
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        let index = self.find(key)?;
        let (_, values) = self.table.parts_mut();
        // SAFETY: `find` only returns live slots
        Some(unsafe { values[index].assume_init_mut() })
    }

    /// Checks whether a mapping exists for the given key
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.find(key).is_some()
    }

    /// Puts the `key -> value` mapping in the map
    ///
    /// Returns `Ok(None)` when a new mapping was created and `Ok(Some(old))`
    /// when the key already existed; both key and value are then replaced.
    /// Fails only if growing the table needs memory the allocator cannot give.
    pub fn insert(&mut self, key: K, value: V) -> Result<Option<V>> {
        if self.exceeds_load(self.filled + 1, self.capacity()) {
            self.grow()?;
        }

        let hash = self.hasher.hash_one(&key);
        let (entries, values) = self.table.parts_mut();

        match probe(entries, hash, &key) {
            Probe::Occupied(index) => {
                let entry = &mut entries[index];
                // SAFETY: occupied slots hold initialized keys and values
                let (old_key, old_value) = unsafe {
                    (
                        mem::replace(&mut entry.key, MaybeUninit::new(key)).assume_init(),
                        mem::replace(&mut values[index], MaybeUninit::new(value)).assume_init(),
                    )
                };
                // the slot is consistent again before any user drop code runs
                drop(old_key);
                Ok(Some(old_value))
            }
            Probe::Vacant(index) => {
                let entry = &mut entries[index];
                if entry.state == SlotState::Free {
                    self.filled += 1;
                }
                entry.state = SlotState::InUse;
                entry.key.write(key);
                values[index].write(value);
                self.count += 1;
                Ok(None)
            }
        }
    }

    /// Removes a key's mapping from the map
    ///
    /// Returns the removed value, or `None` when the key was not in the map.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        let index = self.find(key)?;
        let (entries, values) = self.table.parts_mut();

        let entry = &mut entries[index];
        entry.state = SlotState::Tombstone;
        self.count -= 1;

        // SAFETY: the slot was live until the line above
        let (old_key, old_value) =
            unsafe { (entry.key.assume_init_read(), values[index].assume_init_read()) };
        drop(old_key);
        Some(old_value)
    }

    fn find<Q>(&self, key: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        if self.count == 0 {
            return None;
        }

        match probe(self.table.entries(), self.hasher.hash_one(key), key) {
            Probe::Occupied(index) => Some(index),
            Probe::Vacant(_) => None,
        }
    }

    /// Double the capacity until one more mapping fits under the load factor
    fn grow(&mut self) -> Result<()> {
        let current = self.capacity();
        let mut capacity = if current > 0 {
            current * 2
        } else {
            DEFAULT_GROWTH_CAPACITY
        };

        while self.exceeds_load(self.count + 1, capacity) {
            capacity = capacity.checked_mul(2).ok_or_else(|| {
                UglyError::invalid_parameter("capacity", "Capacity overflows")
            })?;
        }

        self.rehash(capacity)
    }

    /// Move every live mapping into a fresh table of `capacity` slots
    fn rehash(&mut self, capacity: usize) -> Result<()> {
        // nothing is touched until the new arrays exist
        let mut fresh = Table::<K, V>::allocate(self.alloc, capacity)?;

        {
            let (new_entries, new_values) = fresh.parts_mut();
            let (old_entries, old_values) = self.table.parts_mut();

            for (entry, value) in old_entries.iter_mut().zip(old_values.iter_mut()) {
                if !entry.is_live() {
                    continue;
                }

                // SAFETY: live slot; ownership moves to the new table and the
                // old slot is marked free so it is never read again
                unsafe {
                    let hash = self.hasher.hash_one(entry.key());
                    let index = vacant_slot(new_entries, hash);
                    new_entries[index] = Entry {
                        state: SlotState::InUse,
                        key: MaybeUninit::new(entry.key.assume_init_read()),
                    };
                    new_values[index] = MaybeUninit::new(value.assume_init_read());
                }
                entry.state = SlotState::Free;
            }
        }

        let mut old = mem::replace(&mut self.table, fresh);
        let tombstones = self.filled - self.count;
        self.filled = self.count;

        // SAFETY: the old table came from this allocator and holds no live slots
        if let Err(err) = unsafe { old.release(self.alloc) } {
            log::warn!("old map storage not returned to allocator: {}", err);
        }

        log::debug!(
            "map rehashed to {} slots ({} live, {} tombstones dropped)",
            capacity,
            self.count,
            tombstones
        );

        Ok(())
    }
}

impl<K, V, S> Drop for Map<'_, K, V, S> {
    fn drop(&mut self) {
        self.table.clear();
        // SAFETY: the table came from this allocator and was just cleared
        if let Err(err) = unsafe { self.table.release(self.alloc) } {
            log::warn!("map storage not returned to allocator: {}", err);
        }
    }
}

impl<K, V, S> fmt::Debug for Map<'_, K, V, S>
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<'m, K, V, S> IntoIterator for &'m Map<'_, K, V, S> {
    type Item = (&'m K, &'m V);
    type IntoIter = Iter<'m, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the live entries of a [`Map`]
pub struct Iter<'m, K, V> {
    entries: std::slice::Iter<'m, Entry<K>>,
    values: std::slice::Iter<'m, MaybeUninit<V>>,
    remaining: usize,
}

impl<'m, K, V> Iterator for Iter<'m, K, V> {
    type Item = (&'m K, &'m V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = self.entries.next()?;
            let value = self.values.next()?;
            if entry.is_live() {
                self.remaining -= 1;
                // SAFETY: live slots hold initialized keys and values
                return Some(unsafe { (entry.key(), value.assume_init_ref()) });
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}
