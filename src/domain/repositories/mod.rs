//! Repository trait definitions for the domain layer.
//!
//! Traits define the contract for durable state; concrete implementations
//! live in `crate::infrastructure`. Mock implementations are auto-generated
//! via `mockall` for unit tests.
//!
//! # Available Repositories
//!
//! - [`KeyStore`] - valid/used key records in the persistent store
//! - [`CounterStore`] - the shared segment counter

pub mod counter_store;
pub mod key_store;

pub use counter_store::CounterStore;
pub use key_store::KeyStore;

#[cfg(test)]
pub use counter_store::MockCounterStore;
#[cfg(test)]
pub use key_store::MockKeyStore;
