//! PostgreSQL repository implementations.
//!
//! # Repositories
//!
//! - [`PgKeyStore`] - valid/used key records with batch operations
//!
//! [`db::connect_pool`] builds the shared connection pool and applies
//! migrations.

pub mod db;
pub mod pg_key_store;

pub use pg_key_store::PgKeyStore;
