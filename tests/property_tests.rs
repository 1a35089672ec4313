//! Property tests for allocator and map invariants

use std::collections::HashMap;

use proptest::prelude::*;
use ugly::{
    allocators::stack::HEADER_SIZE, config::MAX_ALIGNMENT, Allocator, AllocatorHandle,
    BumpAllocator, Map, PoolAllocator, StackAllocator,
};

const BUFFER: usize = 4096;

#[repr(C, align(16))]
struct Aligned([u8; BUFFER]);

impl Aligned {
    fn new() -> Box<Self> {
        Box::new(Self([0; BUFFER]))
    }
}

fn rounded_chunk(chunk_size: usize) -> usize {
    let linked = chunk_size.max(std::mem::size_of::<usize>());
    (linked + MAX_ALIGNMENT - 1) / MAX_ALIGNMENT * MAX_ALIGNMENT
}

#[derive(Debug, Clone)]
enum Op {
    Insert(u16, u32),
    Remove(u16),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0u16..64, any::<u32>()).prop_map(|(k, v)| Op::Insert(k, v)),
        1 => (0u16..64).prop_map(Op::Remove),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn every_block_is_max_aligned(sizes in proptest::collection::vec(1usize..200, 1..16)) {
        let mut bump_memory = Aligned::new();
        let mut stack_memory = Aligned::new();
        let mut pool_memory = Aligned::new();

        let bump = BumpAllocator::new(&mut bump_memory.0).unwrap();
        let stack = StackAllocator::new(&mut stack_memory.0).unwrap();
        let pool = PoolAllocator::new(&mut pool_memory.0, 200).unwrap();

        for handle in [bump.handle(), stack.handle(), pool.handle(), AllocatorHandle::system()] {
            let mut blocks = Vec::new();
            for size in &sizes {
                if let Ok(block) = handle.allocate(*size) {
                    prop_assert!(block.is_aligned_to(MAX_ALIGNMENT));
                    blocks.push(block);
                }
            }
            for block in blocks.into_iter().rev() {
                unsafe { handle.deallocate(block) }.unwrap();
            }
        }
    }

    #[test]
    fn bump_reallocation_keeps_memory_below(
        prefix in 1usize..512,
        first in 1usize..512,
        grown in 1usize..BUFFER,
    ) {
        let mut memory = Aligned::new();
        let bump = BumpAllocator::new(&mut memory.0).unwrap();

        let below = bump.allocate(prefix).unwrap();
        unsafe { below.as_mut_slice() }.fill(0xAB);

        let block = bump.allocate(first).unwrap();
        unsafe { block.as_mut_slice() }.fill(0xCD);

        match unsafe { bump.reallocate(block, grown) } {
            Ok(resized) => {
                prop_assert_eq!(resized.as_ptr(), block.as_ptr());
            }
            Err(err) => {
                prop_assert!(err.is_exhaustion());
                prop_assert!(unsafe { block.as_slice() }.iter().all(|b| *b == 0xCD), "failed block contents changed");
            }
        }

        prop_assert!(unsafe { below.as_slice() }.iter().all(|b| *b == 0xAB), "block below was modified");
    }

    #[test]
    fn stack_enforces_lifo(a in 1usize..1024, b in 1usize..1024) {
        let mut memory = Aligned::new();
        let stack = StackAllocator::new(&mut memory.0).unwrap();
        let empty = stack.position();

        let first = stack.allocate(a).unwrap();
        let after_first = stack.position();
        let second = stack.allocate(b).unwrap();

        prop_assert!(unsafe { stack.deallocate(first) }.is_err(), "non-top deallocate should fail");
        prop_assert!(unsafe { stack.reallocate(first, a + 1) }.is_err(), "non-top reallocate should fail");

        unsafe { stack.deallocate(second) }.unwrap();
        prop_assert_eq!(stack.position(), after_first);
        unsafe { stack.deallocate(first) }.unwrap();
        prop_assert_eq!(stack.position(), empty);
        prop_assert!(after_first >= empty + HEADER_SIZE + a);
    }

    #[test]
    fn pool_saturates_exactly(chunk_size in 1usize..=256, victim in any::<prop::sample::Index>()) {
        let mut memory = Aligned::new();
        let pool = PoolAllocator::new(&mut memory.0, chunk_size).unwrap();

        // chunks hold at least one link word and are padded to the alignment unit
        let slot = rounded_chunk(chunk_size);
        let expected = BUFFER / slot;
        prop_assert_eq!(pool.chunk_size(), slot);
        prop_assert_eq!(pool.chunk_count(), expected);

        let blocks: Vec<_> = (0..expected)
            .map(|_| pool.allocate(chunk_size).unwrap())
            .collect();
        prop_assert!(pool.allocate(1).is_err());

        let freed = blocks[victim.index(blocks.len())];
        unsafe { pool.deallocate(freed) }.unwrap();
        prop_assert_eq!(pool.allocate(chunk_size).unwrap().as_ptr(), freed.as_ptr());
    }

    #[test]
    fn map_matches_model(ops in proptest::collection::vec(op(), 1..300)) {
        let mut map = Map::new(2, AllocatorHandle::system()).unwrap();
        let mut model = HashMap::new();

        for op in ops {
            match op {
                Op::Insert(key, value) => {
                    prop_assert_eq!(map.insert(key, value).unwrap(), model.insert(key, value));
                }
                Op::Remove(key) => {
                    prop_assert_eq!(map.remove(&key), model.remove(&key));
                    prop_assert_eq!(map.remove(&key), None);
                }
            }
            prop_assert_eq!(map.len(), model.len());
        }

        for key in 0u16..64 {
            prop_assert_eq!(map.get(&key), model.get(&key));
        }
        prop_assert_eq!(map.iter().count(), model.len());
    }

    #[test]
    fn map_respects_load_factor(hint in 0usize..64, n in 0u32..2000) {
        let mut map = Map::new(hint, AllocatorHandle::system()).unwrap();

        for i in 0..n {
            map.insert(i, i).unwrap();
            let stats = map.stats();
            prop_assert!(stats.capacity.is_power_of_two());
            prop_assert!(stats.filled as f64 <= stats.capacity as f64 * 0.75);
        }
    }
}
