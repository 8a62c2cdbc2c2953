//! Accounting for a single pool refill pass.

/// Explicit quantities from one refill pass.
///
/// `desired`, `loaded`, `generated` and `validated` are tracked as separate
/// counters rather than inferred from intermediate list lengths, which is
/// where off-by-one bugs creep in when two fill strategies feed one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefillOutcome {
    /// Target pool size the pass aimed for.
    pub desired: usize,
    /// Keys loaded from the store (validated by a previous run, unconsumed).
    pub loaded: usize,
    /// Random candidates generated to cover the shortfall.
    pub generated: usize,
    /// Candidates that survived deduplication and were persisted as Valid.
    pub validated: usize,
}

impl RefillOutcome {
    /// Number of keys the pass appended to the in-memory pool.
    pub fn enqueued(&self) -> usize {
        self.loaded + self.validated
    }

    /// Candidates discarded as collisions (filter hit or store record).
    pub fn discarded(&self) -> usize {
        self.generated - self.validated
    }
}
