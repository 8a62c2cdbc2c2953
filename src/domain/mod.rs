//! Domain layer for key generation.
//!
//! Defines the repository contracts and value types the services are built
//! on, independent of any concrete storage engine.
//!
//! # Key lifecycle
//!
//! A key moves through four states and is in at most one of the last three
//! at any time:
//!
//! 1. *Candidate* - freshly generated, existence unknown
//! 2. *Valid* - confirmed absent from the store, held in the in-memory pool
//! 3. *Dispensed* - popped from the pool and returned to a caller
//! 4. *Used* - durably recorded as consumed; never re-enters the pool
//!
//! # Architecture
//!
//! - [`repositories`] - data access trait definitions
//! - [`refill`] - explicit accounting for pool refill passes

pub mod refill;
pub mod repositories;

pub use refill::RefillOutcome;
