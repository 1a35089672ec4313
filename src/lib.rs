//! # Ugly - Allocator-Aware Containers
//!
//! Ugly provides three allocation strategies over caller-supplied memory and
//! an open-addressing hash map whose storage is obtained from any of them.
//!
//! ## Features
//!
//! - **Bump allocator**: arena allocation, in-place growth of the last block
//! - **Stack allocator**: LIFO blocks with per-block headers
//! - **Pool allocator**: fixed-size chunks with an intrusive free list
//! - **Uniform interface**: one [`Allocator`] trait and a copyable [`AllocatorHandle`]
//! - **Hash map**: linear probing with tombstones, FNV-1a by default
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                  Map<K, V>                   │
//! │  keys + states array │ values array          │
//! └──────────────────────────────────────────────┘
//!                      │ AllocatorHandle
//!                      ▼
//! ┌──────────┬───────────┬──────────┬──────────┐
//! │   Bump   │   Stack   │   Pool   │  System  │
//! └──────────┴───────────┴──────────┴──────────┘
//!                      │
//!                      ▼
//!            caller-supplied &mut [u8]
//! ```
//!
//! ## Example
//!
//! ```
//! use ugly::{Allocator, Map, StackAllocator};
//!
//! let mut memory = vec![0u8; 4096];
//! let stack = StackAllocator::new(&mut memory)?;
//!
//! let mut map = Map::new(4, stack.handle())?;
//! map.insert("one", 1)?;
//! assert_eq!(map.get("one"), Some(&1));
//! # Ok::<(), ugly::UglyError>(())
//! ```

pub mod allocators;
pub mod error;
pub mod hash;
pub mod map;

pub use allocators::{
    Allocator, AllocatorCapabilities, AllocatorExt, AllocatorHandle, Block, BumpAllocator,
    PoolAllocator, Request, StackAllocator, SystemAllocator,
};
pub use error::{Result, UglyError};
pub use hash::{fnv_1a, FnvBuildHasher, FnvHasher};
pub use map::{Map, MapConfig, MapConfigBuilder, MapStats};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const VERSION_MAJOR: u32 = 0;
pub const VERSION_MINOR: u32 = 1;
pub const VERSION_PATCH: u32 = 0;

/// Default configuration constants
pub mod config {
    /// Alignment of every block handed out by the allocators
    pub const MAX_ALIGNMENT: usize = 16;

    /// Ratio of filled slots that triggers a map rehash
    pub const DEFAULT_MAX_LOAD_FACTOR: f64 = 0.75;

    /// Slot count used when a zero-capacity map first grows
    pub const DEFAULT_GROWTH_CAPACITY: usize = 8;
}
