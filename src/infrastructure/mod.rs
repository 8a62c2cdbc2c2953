//! Infrastructure layer for external integrations.
//!
//! Concrete implementations of the domain repository traits.
//!
//! # Modules
//!
//! - [`persistence`] - PostgreSQL key store
//! - [`counter`] - Redis-backed shared segment counter

pub mod counter;
pub mod persistence;
