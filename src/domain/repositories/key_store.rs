//! Repository trait for durable key state.

use crate::error::KeygenError;
use async_trait::async_trait;

/// Durable record of key lifecycle state, shared across process instances.
///
/// Two logical tables back this trait: `valid_keys` (validated, not yet
/// consumed) and `used_keys` (consumed, never dispensed again). The store is
/// authoritative; the in-memory membership filter only short-circuits
/// lookups that would certainly miss.
///
/// The batch existence check in [`Self::filter_existing`] is the sole
/// collision-avoidance mechanism across instances. Two instances can both
/// pass it for the same candidate before either inserts; at the configured
/// key length the practical probability is negligible and the risk is
/// accepted.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgKeyStore`] - PostgreSQL implementation
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// Fetches up to `limit` validated, unconsumed keys.
    ///
    /// # Errors
    ///
    /// Returns [`KeygenError::StoreUnavailable`] on database errors.
    async fn load_valid_keys(&self, limit: usize) -> Result<Vec<String>, KeygenError>;

    /// Fetches every validated, unconsumed key. Used once at startup to warm
    /// the membership filter.
    ///
    /// # Errors
    ///
    /// Returns [`KeygenError::StoreUnavailable`] on database errors.
    async fn all_valid_keys(&self) -> Result<Vec<String>, KeygenError>;

    /// Returns the subset of `keys` that already has a record, valid or used,
    /// in a single batch query.
    ///
    /// # Errors
    ///
    /// Returns [`KeygenError::StoreUnavailable`] on database errors.
    async fn filter_existing(&self, keys: &[String]) -> Result<Vec<String>, KeygenError>;

    /// Batch-inserts newly validated keys.
    ///
    /// # Errors
    ///
    /// Returns [`KeygenError::StoreUnavailable`] on database errors.
    async fn insert_valid_keys(&self, keys: &[String]) -> Result<(), KeygenError>;

    /// Atomically transitions a dispensed key to Used: recorded in
    /// `used_keys` and removed from `valid_keys` as one unit, so a crash
    /// cannot leave the key in both states.
    ///
    /// # Errors
    ///
    /// Returns [`KeygenError::StoreUnavailable`] on database errors.
    async fn mark_consumed(&self, key: &str) -> Result<(), KeygenError>;
}
