//! Allocators over caller-supplied buffers
//!
//! Three strategies share the [`Allocator`] trait: [`BumpAllocator`] (arena),
//! [`StackAllocator`] (LIFO with per-block headers) and [`PoolAllocator`]
//! (fixed-size chunks). [`SystemAllocator`] is the heap-backed default.
//! Consumers receive an [`AllocatorHandle`] and never manage raw memory
//! themselves.

pub mod bump;
pub mod pool;
pub mod stack;
pub mod system;
pub mod traits;

mod region;

pub use bump::BumpAllocator;
pub use pool::PoolAllocator;
pub use stack::StackAllocator;
pub use system::SystemAllocator;
pub use traits::{Allocator, AllocatorCapabilities, AllocatorExt, AllocatorHandle, Block, Request};
