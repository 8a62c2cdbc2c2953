//! Application layer services implementing the two generation strategies.
//!
//! This layer orchestrates domain operations over the repository traits and
//! provides the crate's outward API, consumed by the web/CRUD layer of the
//! embedding service.
//!
//! # Available Services
//!
//! - [`services::key_pool::KeyPool`] - pre-validated random keys, `take()`/refill
//! - [`services::segment_allocator::SegmentAllocator`] - sequential base62 codes

pub mod services;
