//! Repository trait for the shared segment counter.

use crate::error::KeygenError;
use async_trait::async_trait;
use std::time::Duration;

/// A single monotonically increasing counter shared by every allocator
/// instance. Segments are leased by atomically advancing it by a fixed step.
///
/// The expiry is a safety net against unbounded key growth in the counter
/// store, not a correctness mechanism; losing it early only costs a jump in
/// the code sequence.
///
/// # Implementations
///
/// - [`crate::infrastructure::counter::RedisCounter`] - Redis-backed counter
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Atomically adds `step` to the counter and returns the new total.
    ///
    /// # Errors
    ///
    /// Returns [`KeygenError::StoreUnavailable`] if the counter store is
    /// unreachable.
    async fn increment_and_get(&self, counter_id: &str, step: i64) -> Result<i64, KeygenError>;

    /// Resets the counter key's expiry.
    ///
    /// # Errors
    ///
    /// Returns [`KeygenError::StoreUnavailable`] if the counter store is
    /// unreachable.
    async fn set_expiry(&self, counter_id: &str, ttl: Duration) -> Result<(), KeygenError>;
}
