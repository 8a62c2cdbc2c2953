//! Error taxonomy for the key generation core.
//!
//! Two failure classes exist:
//!
//! - [`KeygenError::StoreUnavailable`] - transient; the next scheduled refill
//!   or allocation retries. Background refill failures are logged and never
//!   reach `take()` callers.
//! - [`KeygenError::CounterOverflow`] - fatal misconfiguration; the configured
//!   code length cannot represent the counter range and startup must abort.
//!
//! Pool exhaustion is deliberately *not* an error: [`KeyPool::take`] returns
//! `None` and the caller decides whether to retry.
//!
//! [`KeyPool::take`]: crate::application::services::KeyPool::take

use thiserror::Error;

/// Errors produced by the key generation subsystem.
#[derive(Debug, Error)]
pub enum KeygenError {
    /// The persistent key store or the shared counter store could not be
    /// reached. Transient.
    #[error("backing store unavailable: {0}")]
    StoreUnavailable(String),

    /// A leased counter value does not fit in the configured code length.
    /// Values are never silently truncated.
    #[error("counter value {value} does not fit in a {code_length}-character base62 code")]
    CounterOverflow { value: i64, code_length: usize },

    /// Invalid configuration detected at construction time.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl KeygenError {
    /// Shorthand for a transient store failure.
    pub fn store(message: impl Into<String>) -> Self {
        Self::StoreUnavailable(message.into())
    }
}

impl From<sqlx::Error> for KeygenError {
    fn from(e: sqlx::Error) -> Self {
        Self::StoreUnavailable(e.to_string())
    }
}

impl From<redis::RedisError> for KeygenError {
    fn from(e: redis::RedisError) -> Self {
        Self::StoreUnavailable(e.to_string())
    }
}
