//! Segment-leased numeric code allocation.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::domain::repositories::CounterStore;
use crate::error::KeygenError;
use crate::utils::base62;

/// Half-open integer range `[cursor, end)` leased from the shared counter,
/// owned exclusively by one allocator instance.
#[derive(Debug, Default)]
struct SegmentState {
    cursor: i64,
    end: i64,
}

/// Allocates monotonically increasing integers in leased segments and
/// encodes them as fixed-width base62 codes.
///
/// Contacting the shared counter only once per `step` allocations keeps the
/// hot path in-process. The whole allocation path runs under one async lock
/// so two tasks can never refill from a stale segment.
///
/// # Example
///
/// ```ignore
/// let allocator = SegmentAllocator::new(counter, SegmentConfig::default())?;
/// let code = allocator.next_code().await?; // e.g. "pppp5"
/// ```
pub struct SegmentAllocator<C: CounterStore> {
    counter: Arc<C>,
    state: Mutex<SegmentState>,
    config: SegmentConfig,
}

/// Tunables for [`SegmentAllocator`].
#[derive(Debug, Clone)]
pub struct SegmentConfig {
    /// Identifier of the shared counter key.
    pub counter_id: String,
    /// Segment size: integers leased per counter round trip.
    pub step: i64,
    /// Fixed output code length.
    pub code_length: usize,
    /// Expiry applied to the counter key after each lease.
    pub counter_expiry: Duration,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            counter_id: "short_code_key".to_string(),
            step: 1000,
            code_length: 5,
            counter_expiry: Duration::from_secs(10 * 24 * 60 * 60),
        }
    }
}

impl<C: CounterStore> SegmentAllocator<C> {
    /// Creates an allocator over the given counter store.
    ///
    /// # Errors
    ///
    /// Returns [`KeygenError::Config`] if the step is not positive or the
    /// code length cannot represent even a single segment.
    pub fn new(counter: Arc<C>, config: SegmentConfig) -> Result<Self, KeygenError> {
        if config.step <= 0 {
            return Err(KeygenError::Config(format!(
                "segment step must be positive, got {}",
                config.step
            )));
        }

        let max = base62::max_encodable(config.code_length)?;
        if config.step > max {
            return Err(KeygenError::Config(format!(
                "segment step {} exceeds the {}-character code range ({})",
                config.step, config.code_length, max
            )));
        }

        Ok(Self {
            counter,
            state: Mutex::new(SegmentState::default()),
            config,
        })
    }

    /// Returns the next code in allocation order.
    ///
    /// Leases a fresh segment from the shared counter when the current one
    /// is exhausted (or on first use). Within a segment no storage call is
    /// made.
    ///
    /// # Errors
    ///
    /// - [`KeygenError::StoreUnavailable`] if a lease is needed and the
    ///   counter store is unreachable
    /// - [`KeygenError::CounterOverflow`] once the counter outgrows the
    ///   configured code length; fatal, the code length must be raised
    pub async fn next_code(&self) -> Result<String, KeygenError> {
        let mut state = self.state.lock().await;

        if state.cursor >= state.end {
            let end = self
                .counter
                .increment_and_get(&self.config.counter_id, self.config.step)
                .await?;
            state.cursor = end - self.config.step;
            state.end = end;
            debug!(start = state.cursor, end, "leased new code segment");

            // Expiry is a safety net only; a failed reset never voids a lease.
            if let Err(e) = self
                .counter
                .set_expiry(&self.config.counter_id, self.config.counter_expiry)
                .await
            {
                warn!(error = %e, "failed to reset counter expiry");
            }
        }

        state.cursor += 1;
        base62::encode(state.cursor, self.config.code_length)
    }
}
