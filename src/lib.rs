//! # Shortlink Keygen
//!
//! Key and code generation core for a URL shortener. Hands out short, unique,
//! collision-free identifiers at high rate without making every request pay a
//! uniqueness check against durable storage.
//!
//! ## Architecture
//!
//! This crate follows Clean Architecture principles with clear layer separation:
//!
//! - **Domain Layer** ([`domain`]) - Key lifecycle model and repository traits
//! - **Application Layer** ([`application`]) - The two generation strategies
//! - **Infrastructure Layer** ([`infrastructure`]) - PostgreSQL key store and
//!   Redis counter adapters
//! - **Utilities** ([`utils`]) - base62 codec, candidate generation, membership filter
//!
//! ## Generation strategies
//!
//! Two independent strategies coexist:
//!
//! - [`application::services::SegmentAllocator`] leases blocks of integers
//!   from a shared Redis counter and encodes them as fixed-width base62
//!   codes. One counter round trip per `step` allocations.
//! - [`application::services::KeyPool`] maintains an in-memory queue of
//!   random keys pre-validated against PostgreSQL, deduplicated through a
//!   probabilistic membership filter, and replenished asynchronously when
//!   the queue drops below half capacity.
//!
//! ## Quick Start
//!
//! ```ignore
//! use shortlink_keygen::prelude::*;
//! use std::sync::Arc;
//!
//! let config = shortlink_keygen::config::load_from_env()?;
//!
//! let pg = Arc::new(connect_pool(&config).await?);
//! let pool = KeyPool::new(Arc::new(PgKeyStore::new(pg)), config.pool_config());
//! pool.init().await?;
//!
//! // hot path: in-memory pop, refill happens in the background
//! let key = pool.take(); // Some("x7Gh2k") or None when exhausted
//! ```
//!
//! ## Configuration
//!
//! Loaded from environment variables via [`config::Config`]. See [`config`]
//! module for available options.

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod utils;

pub use config::Config;
pub use error::KeygenError;

/// Commonly used types for external consumers.
///
/// Re-exports frequently used types to simplify imports for library users
/// and integration tests.
pub mod prelude {
    pub use crate::application::services::{KeyPool, PoolConfig, SegmentAllocator, SegmentConfig};
    pub use crate::config::Config;
    pub use crate::domain::RefillOutcome;
    pub use crate::domain::repositories::{CounterStore, KeyStore};
    pub use crate::error::KeygenError;
    pub use crate::infrastructure::counter::RedisCounter;
    pub use crate::infrastructure::persistence::PgKeyStore;
    pub use crate::infrastructure::persistence::db::connect_pool;
    pub use crate::utils::{MembershipFilter, RandomCandidateGenerator};
}
