//! Shared counter implementations.

pub mod redis_counter;

pub use redis_counter::RedisCounter;
