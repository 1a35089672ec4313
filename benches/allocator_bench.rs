use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::Rng;
use ugly::{
    allocators::{Allocator, BumpAllocator, PoolAllocator, StackAllocator},
    AllocatorHandle, Map,
};

fn benchmark_bump_allocator(c: &mut Criterion) {
    let mut group = c.benchmark_group("BumpAllocator");

    for size in [64, 256, 1024, 4096].iter() {
        group.bench_with_input(BenchmarkId::new("allocate", size), size, |b, &size| {
            let mut memory = vec![0u8; 1024 * 1024]; // 1MB
            let mut allocator = BumpAllocator::new(&mut memory).unwrap();

            b.iter(|| {
                // Reset allocator for each iteration
                allocator.reset().unwrap();

                for _ in 0..100 {
                    let _ = black_box(allocator.allocate(size));
                }
            });
        });
    }

    group.finish();
}

fn benchmark_stack_allocator(c: &mut Criterion) {
    let mut group = c.benchmark_group("StackAllocator");

    for size in [64, 256, 1024, 4096].iter() {
        group.bench_with_input(
            BenchmarkId::new("allocate_deallocate", size),
            size,
            |b, &size| {
                let mut memory = vec![0u8; 1024 * 1024]; // 1MB
                let allocator = StackAllocator::new(&mut memory).unwrap();

                b.iter(|| {
                    let mut blocks = Vec::with_capacity(100);

                    for _ in 0..100 {
                        match allocator.allocate(size) {
                            Ok(block) => blocks.push(block),
                            Err(_) => break,
                        }
                    }

                    // Release in reverse order
                    while let Some(block) = blocks.pop() {
                        let _ = unsafe { allocator.deallocate(block) };
                    }
                });
            },
        );
    }

    group.finish();
}

fn benchmark_pool_allocator(c: &mut Criterion) {
    let mut group = c.benchmark_group("PoolAllocator");

    for block_size in [64, 256, 1024, 4096].iter() {
        group.bench_with_input(
            BenchmarkId::new("allocate_deallocate", block_size),
            block_size,
            |b, &block_size| {
                let mut memory = vec![0u8; 1024 * 1024]; // 1MB
                let allocator = PoolAllocator::new(&mut memory, block_size).unwrap();

                b.iter(|| {
                    let mut blocks = Vec::new();

                    // Allocate
                    for _ in 0..50 {
                        match allocator.allocate(block_size) {
                            Ok(block) => blocks.push(block),
                            Err(_) => break,
                        }
                    }

                    // Deallocate
                    for block in blocks {
                        let _ = unsafe { allocator.deallocate(block) };
                    }
                });
            },
        );
    }

    group.finish();
}

fn benchmark_map_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("Map");

    for (n, reserve) in [(10_000, 0), (10_000, 10_000), (100_000, 0)].iter() {
        let keys: Vec<u64> = {
            let mut rng = rand::thread_rng();
            (0..*n).map(|_| rng.gen()).collect()
        };

        group.bench_with_input(
            BenchmarkId::new(format!("insert_reserve_{}", reserve), n),
            &keys,
            |b, keys| {
                b.iter(|| {
                    let mut map = Map::new(*reserve, AllocatorHandle::system()).unwrap();
                    for (i, key) in keys.iter().enumerate() {
                        map.insert(*key, i).unwrap();
                    }
                    black_box(map.len())
                });
            },
        );
    }

    group.finish();
}

fn benchmark_map_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("Map");

    for n in [1_000u32, 100_000].iter() {
        let mut memory = vec![0u8; 16 * 1024 * 1024]; // 16MB
        let stack = StackAllocator::new(&mut memory).unwrap();
        let mut map = Map::new(*n as usize, stack.handle()).unwrap();
        for i in 0..*n {
            map.insert(i, i).unwrap();
        }

        group.bench_with_input(BenchmarkId::new("get", n), n, |b, &n| {
            let mut i = 0;
            b.iter(|| {
                i = (i + 7919) % n;
                black_box(map.get(&i))
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_bump_allocator,
    benchmark_stack_allocator,
    benchmark_pool_allocator,
    benchmark_map_insert,
    benchmark_map_lookup
);
criterion_main!(benches);
