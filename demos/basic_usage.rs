#!/usr/bin/env rust

//! Basic usage example of the Ugly allocators and hash map

use ugly::{
    allocators::{Allocator, AllocatorExt, BumpAllocator, PoolAllocator, StackAllocator},
    FnvBuildHasher, Map, MapConfigBuilder, Result,
};

fn main() -> Result<()> {
    // Initialize logging
    env_logger::init();

    println!("Ugly Allocators Example");
    println!("=======================");

    // Bump allocator: sequential allocation, whole-arena reset
    let mut arena = vec![0u8; 4096];
    let mut bump = BumpAllocator::new(&mut arena)?;

    let greeting = bump.allocate(32)?;
    let grown = unsafe { bump.reallocate(greeting, 64)? };
    println!("\nBump allocator:");
    println!("  Grew block in place: {}", grown.as_ptr() == greeting.as_ptr());
    println!("  Used: {} / {} bytes", bump.used_size(), bump.total_size());
    bump.reset()?;
    println!("  After reset: {} bytes used", bump.used_size());

    // Stack allocator: strict LIFO release
    let mut scratch = vec![0u8; 4096];
    let stack = StackAllocator::new(&mut scratch)?;

    let outer = stack.allocate(100)?;
    let inner = stack.allocate(200)?;
    println!("\nStack allocator:");
    println!("  Depth: {}", stack.depth());
    if let Err(e) = unsafe { stack.deallocate(outer) } {
        println!("  Out of order release refused: {}", e);
    }
    unsafe {
        stack.deallocate(inner)?;
        stack.deallocate(outer)?;
    }
    println!("  Depth after release: {}", stack.depth());

    // Pool allocator: fixed-size chunks
    let mut chunks = vec![0u8; 4096];
    let pool = PoolAllocator::new(&mut chunks, 256)?;
    let block = pool.allocate_zeroed(200)?;
    println!("\nPool allocator:");
    println!("  Chunk size: {} bytes", pool.chunk_size());
    println!("  Free chunks: {} / {}", pool.free_chunks(), pool.chunk_count());
    unsafe { pool.deallocate(block)? };

    // Hash map on top of the stack allocator
    let config = MapConfigBuilder::new()
        .initial_capacity(8)
        .max_load_factor(0.75)
        .build()?;
    let mut numbers = Map::with_config(config, FnvBuildHasher::default(), stack.handle())?;

    for (i, name) in ["zero", "one", "two", "three", "four", "five"].iter().enumerate() {
        numbers.insert(*name, i)?;
    }
    numbers.remove("three");

    println!("\nHash map:");
    println!("  {:?}", numbers);
    println!("  {}", numbers.stats().summary());
    println!("  Stack utilization: {:.1}%", stack.utilization() * 100.0);

    let mut total = 0;
    numbers.for_each(|_, value| {
        total += *value;
        Ok::<(), ugly::UglyError>(())
    })?;
    println!("  Sum of values: {}", total);

    println!("\nExample completed successfully!");
    Ok(())
}
