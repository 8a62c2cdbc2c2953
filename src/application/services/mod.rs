//! Business logic services for the application layer.

pub mod key_pool;
pub mod segment_allocator;

pub use key_pool::{KeyPool, PoolConfig};
pub use segment_allocator::{SegmentAllocator, SegmentConfig};
