//! Self-replenishing pool of pre-validated keys.
//!
//! Callers pop keys from an in-memory queue; everything slow (batch store
//! queries, inserts, mark-used writes) happens on one background worker task
//! fed through an mpsc channel, so [`KeyPool::take`] never blocks on storage.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crossbeam_queue::SegQueue;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::domain::RefillOutcome;
use crate::domain::repositories::KeyStore;
use crate::error::KeygenError;
use crate::utils::{MembershipFilter, RandomCandidateGenerator};

/// Work dispatched to the pool's background worker.
enum PoolCommand {
    Refill,
    MarkUsed(String),
}

/// Tunables for [`KeyPool`].
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Target pool size. Refill triggers below `capacity / 2`.
    pub capacity: usize,
    /// Length of generated keys.
    pub key_length: usize,
    /// Membership filter size in bits.
    pub filter_bits: usize,
    /// Hash probes per key in the membership filter.
    pub filter_hashes: u32,
    /// Capacity of the worker command channel.
    pub command_capacity: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            capacity: 50_000,
            key_length: 6,
            filter_bits: 1_000_000,
            filter_hashes: 3,
            command_capacity: 10_000,
        }
    }
}

struct PoolInner<S: KeyStore> {
    store: Arc<S>,
    generator: RandomCandidateGenerator,
    filter: MembershipFilter,
    /// Valid keys ready for dispensing, FIFO for simplicity only.
    queue: SegQueue<String>,
    /// Keys currently pooled, plus dispensed keys whose consumed write has
    /// not landed yet. A refill never re-loads these, so a store row that
    /// lags behind its asynchronous mark-used write cannot be re-dispensed.
    reserved: Mutex<HashSet<String>>,
    /// Idle (false) / Refilling (true). At most one refill pass runs at a
    /// time; concurrent low-watermark triggers collapse into it.
    refilling: AtomicBool,
    capacity: usize,
}

/// In-memory buffer of pre-validated keys with asynchronous refill.
///
/// [`take`](Self::take) is the hot path: an in-memory pop plus at most two
/// non-blocking channel sends. The background worker owns all storage I/O.
///
/// Dropping the pool without [`shutdown`](Self::shutdown) abandons the
/// worker mid-flight; queued mark-used writes may be lost (the known
/// durability gap of the fire-and-forget design).
pub struct KeyPool<S: KeyStore + 'static> {
    inner: Arc<PoolInner<S>>,
    tx: mpsc::Sender<PoolCommand>,
    worker: JoinHandle<()>,
}

impl<S: KeyStore + 'static> KeyPool<S> {
    /// Creates the pool and spawns its background worker.
    pub fn new(store: Arc<S>, config: PoolConfig) -> Self {
        let (tx, rx) = mpsc::channel(config.command_capacity.max(1));

        let inner = Arc::new(PoolInner {
            store,
            generator: RandomCandidateGenerator::new(config.key_length),
            filter: MembershipFilter::new(config.filter_bits, config.filter_hashes),
            queue: SegQueue::new(),
            reserved: Mutex::new(HashSet::new()),
            refilling: AtomicBool::new(false),
            capacity: config.capacity.max(2),
        });

        let worker = tokio::spawn(run_pool_worker(rx, inner.clone()));

        Self { inner, tx, worker }
    }

    /// Warms the pool: populates the membership filter from every valid key
    /// already in the store, then runs one refill pass inline.
    ///
    /// Call once at startup, before `take()` is relied on for low-latency
    /// responses.
    ///
    /// # Errors
    ///
    /// Returns [`KeygenError::StoreUnavailable`] if the store cannot be
    /// reached. Unlike background refills, startup failures surface to the
    /// caller.
    pub async fn init(&self) -> Result<(), KeygenError> {
        let known = self.inner.store.all_valid_keys().await?;
        for key in &known {
            self.inner.filter.add(key);
        }
        info!(known = known.len(), "membership filter warmed from store");

        if self.inner.begin_refill() {
            let result = self.inner.refill().await;
            self.inner.end_refill();
            let outcome = result?;
            info!(
                loaded = outcome.loaded,
                validated = outcome.validated,
                "key pool warmed"
            );
        }

        Ok(())
    }

    /// Dispenses one pre-validated key, or `None` when the pool is
    /// exhausted (a retryable condition, not an error).
    ///
    /// Never blocks on storage. Below the low-watermark a refill is
    /// dispatched fire-and-forget; the dispensed key's Used transition is
    /// likewise dispatched without waiting. A crash between return and that
    /// write completing leaves the key Valid in the store but already handed
    /// out - a documented durability gap.
    pub fn take(&self) -> Option<String> {
        let key = self.inner.queue.pop();

        if self.inner.queue.len() < self.inner.capacity / 2 {
            self.trigger_refill();
        }

        if let Some(key) = &key {
            metrics::counter!("keygen_keys_dispensed_total").increment(1);
            metrics::gauge!("keygen_pool_size").set(self.inner.queue.len() as f64);

            if let Err(e) = self.tx.try_send(PoolCommand::MarkUsed(key.clone())) {
                warn!(key = %key, error = %e, "mark-used write dropped, command queue unavailable");
            }
        }

        key
    }

    /// Current number of pooled keys.
    pub fn len(&self) -> usize {
        self.inner.queue.len()
    }

    /// Whether the pool is currently exhausted.
    pub fn is_empty(&self) -> bool {
        self.inner.queue.is_empty()
    }

    /// Stops the background worker, letting already-queued mark-used writes
    /// finish first.
    pub async fn shutdown(self) {
        let Self {
            inner: _,
            tx,
            worker,
        } = self;
        // closing the channel lets the worker drain and exit
        drop(tx);
        if let Err(e) = worker.await {
            warn!(error = %e, "pool worker did not shut down cleanly");
        }
    }

    /// Dispatches a refill unless one is already in flight.
    fn trigger_refill(&self) {
        if !self.inner.begin_refill() {
            return;
        }
        if self.tx.try_send(PoolCommand::Refill).is_err() {
            // worker gone or queue full; clear so a later trigger retries
            self.inner.end_refill();
            warn!("refill trigger dropped, command queue unavailable");
        }
    }
}

impl<S: KeyStore> PoolInner<S> {
    /// Idle -> Refilling transition. Returns false when already refilling.
    fn begin_refill(&self) -> bool {
        self.refilling
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn end_refill(&self) {
        self.refilling.store(false, Ordering::Release);
    }

    fn reserved_set(&self) -> MutexGuard<'_, HashSet<String>> {
        // the set is only ever mutated point-wise, a poisoned lock is safe to reuse
        self.reserved.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// One refill pass: load previously validated keys, cover any shortfall
    /// with fresh candidates, deduplicate against the filter and the store,
    /// persist the survivors, and enqueue everything.
    async fn refill(&self) -> Result<RefillOutcome, KeygenError> {
        let desired = self.capacity;
        let loaded_keys = self.load_unreserved(desired).await?;

        let mut outcome = RefillOutcome {
            desired,
            loaded: loaded_keys.len(),
            ..RefillOutcome::default()
        };

        let mut new_valid = Vec::new();
        if outcome.loaded < desired {
            let shortfall = desired - outcome.loaded;
            let candidates = self.generator.generate(shortfall);
            outcome.generated = candidates.len();

            // The filter short-circuits candidates that certainly collide;
            // the store check below stays authoritative for the rest.
            let unseen: Vec<String> = candidates
                .into_iter()
                .filter(|key| !self.filter.might_contain(key))
                .collect();

            if !unseen.is_empty() {
                let existing: HashSet<String> = self
                    .store
                    .filter_existing(&unseen)
                    .await?
                    .into_iter()
                    .collect();
                new_valid = unseen
                    .into_iter()
                    .filter(|key| !existing.contains(key))
                    .collect();
            }

            if !new_valid.is_empty() {
                self.store.insert_valid_keys(&new_valid).await?;
            }
            outcome.validated = new_valid.len();
        }

        for key in loaded_keys.into_iter().chain(new_valid) {
            self.filter.add(&key);
            self.reserved_set().insert(key.clone());
            self.queue.push(key);
        }

        metrics::counter!("keygen_refill_passes_total").increment(1);
        metrics::counter!("keygen_candidates_discarded_total")
            .increment(outcome.discarded() as u64);
        metrics::gauge!("keygen_pool_size").set(self.queue.len() as f64);

        Ok(outcome)
    }

    /// Loads valid keys from the store, skipping any that are pooled or
    /// dispensed with a pending consumed write.
    async fn load_unreserved(&self, limit: usize) -> Result<Vec<String>, KeygenError> {
        let loaded = self.store.load_valid_keys(limit).await?;
        let reserved = self.reserved_set();
        Ok(loaded
            .into_iter()
            .filter(|key| !reserved.contains(key))
            .collect())
    }
}

/// Background worker: executes refill passes and mark-used writes off the
/// caller's critical path. Exits when the pool handle closes the channel.
async fn run_pool_worker<S: KeyStore>(
    mut rx: mpsc::Receiver<PoolCommand>,
    inner: Arc<PoolInner<S>>,
) {
    while let Some(command) = rx.recv().await {
        match command {
            PoolCommand::Refill => {
                match inner.refill().await {
                    Ok(outcome) => debug!(
                        loaded = outcome.loaded,
                        generated = outcome.generated,
                        validated = outcome.validated,
                        "refill pass completed"
                    ),
                    // refill failures never reach take() callers
                    Err(e) => warn!(error = %e, "refill pass failed"),
                }
                inner.end_refill();
            }
            PoolCommand::MarkUsed(key) => {
                match inner.store.mark_consumed(&key).await {
                    Ok(()) => {
                        inner.reserved_set().remove(&key);
                    }
                    // best-effort: the key already left the pool, no retry.
                    // It stays reserved so this process never re-pools it.
                    Err(e) => warn!(key = %key, error = %e, "failed to mark key as consumed"),
                }
            }
        }
    }
    debug!("pool worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repositories::MockKeyStore;
    use std::time::Duration;

    fn small_config(capacity: usize) -> PoolConfig {
        PoolConfig {
            capacity,
            key_length: 6,
            filter_bits: 4096,
            filter_hashes: 3,
            command_capacity: 100,
        }
    }

    /// Polls until `predicate` holds or the deadline passes.
    async fn wait_until(mut predicate: impl FnMut() -> bool) {
        for _ in 0..200 {
            if predicate() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not reached within deadline");
    }

    fn store_with_empty_valid_table() -> MockKeyStore {
        let mut store = MockKeyStore::new();
        store.expect_all_valid_keys().returning(|| Ok(Vec::new()));
        store.expect_load_valid_keys().returning(|_| Ok(Vec::new()));
        store.expect_filter_existing().returning(|_| Ok(Vec::new()));
        store.expect_insert_valid_keys().returning(|_| Ok(()));
        store.expect_mark_consumed().returning(|_| Ok(()));
        store
    }

    #[tokio::test]
    async fn test_init_fills_pool_to_capacity() {
        let pool = KeyPool::new(Arc::new(store_with_empty_valid_table()), small_config(10));

        pool.init().await.unwrap();

        assert_eq!(pool.len(), 10);
        pool.shutdown().await;
    }

    #[tokio::test]
    async fn test_init_prefers_keys_already_in_store() {
        let mut store = MockKeyStore::new();
        store.expect_all_valid_keys().returning(|| Ok(Vec::new()));
        store
            .expect_load_valid_keys()
            .returning(|_| Ok(vec!["stored1".into(), "stored2".into(), "stored3".into()]));
        store.expect_filter_existing().returning(|_| Ok(Vec::new()));
        store.expect_insert_valid_keys().returning(|_| Ok(()));
        store.expect_mark_consumed().returning(|_| Ok(()));

        let pool = KeyPool::new(Arc::new(store), small_config(3));
        pool.init().await.unwrap();

        assert_eq!(pool.len(), 3);
        let mut keys = vec![
            pool.take().unwrap(),
            pool.take().unwrap(),
            pool.take().unwrap(),
        ];
        keys.sort();
        assert_eq!(keys, vec!["stored1", "stored2", "stored3"]);
        pool.shutdown().await;
    }

    #[tokio::test]
    async fn test_take_on_empty_pool_returns_none() {
        let pool = KeyPool::new(Arc::new(store_with_empty_valid_table()), small_config(10));
        // no init: pool is cold and empty
        assert!(pool.take().is_none());
        pool.shutdown().await;
    }

    #[tokio::test]
    async fn test_takes_never_repeat_a_key() {
        let pool = KeyPool::new(Arc::new(store_with_empty_valid_table()), small_config(20));
        pool.init().await.unwrap();

        let mut seen = HashSet::new();
        while let Some(key) = pool.take() {
            assert!(seen.insert(key), "duplicate key dispensed");
        }
        assert_eq!(seen.len(), 20);
        pool.shutdown().await;
    }

    #[tokio::test]
    async fn test_low_watermark_triggers_exactly_one_refill() {
        let mut store = MockKeyStore::new();
        store.expect_all_valid_keys().returning(|| Ok(Vec::new()));
        // init pass + exactly one low-watermark pass
        store
            .expect_load_valid_keys()
            .times(2)
            .returning(|_| Ok(Vec::new()));
        store.expect_filter_existing().returning(|_| Ok(Vec::new()));
        store.expect_insert_valid_keys().returning(|_| Ok(()));
        store.expect_mark_consumed().returning(|_| Ok(()));

        let pool = KeyPool::new(Arc::new(store), small_config(10));
        pool.init().await.unwrap();
        assert_eq!(pool.len(), 10);

        // 6 takes drain the pool to 4, crossing the watermark of 5
        let keys: Vec<_> = (0..6).map(|_| pool.take().unwrap()).collect();
        assert_eq!(keys.len(), 6);

        wait_until(|| pool.len() >= 10).await;
        pool.shutdown().await;
    }

    #[tokio::test]
    async fn test_burst_of_triggers_collapses_into_one_pass() {
        let mut store = MockKeyStore::new();
        store.expect_all_valid_keys().returning(|| Ok(Vec::new()));
        store
            .expect_load_valid_keys()
            .times(1)
            .returning(|_| Ok(Vec::new()));
        store.expect_filter_existing().returning(|_| Ok(Vec::new()));
        store.expect_insert_valid_keys().returning(|_| Ok(()));

        let pool = KeyPool::new(Arc::new(store), small_config(10));

        // empty pool: every take sits below the watermark. No await between
        // the calls, so the first trigger is still in flight for all eight.
        for _ in 0..8 {
            assert!(pool.take().is_none());
        }

        wait_until(|| pool.len() == 10).await;
        // times(1) on load_valid_keys verifies the single pass on drop
        pool.shutdown().await;
    }

    #[tokio::test]
    async fn test_store_collisions_are_discarded() {
        let mut store = MockKeyStore::new();
        store.expect_all_valid_keys().returning(|| Ok(Vec::new()));
        store.expect_load_valid_keys().returning(|_| Ok(Vec::new()));
        // claim every candidate already exists
        store
            .expect_filter_existing()
            .returning(|keys| Ok(keys.to_vec()));
        // with no survivors the batch insert must be skipped
        store.expect_insert_valid_keys().times(0);

        let pool = KeyPool::new(Arc::new(store), small_config(10));
        pool.init().await.unwrap();

        assert_eq!(pool.len(), 0);
        pool.shutdown().await;
    }

    #[tokio::test]
    async fn test_refill_failure_clears_flag_for_retry() {
        let mut store = MockKeyStore::new();
        store.expect_all_valid_keys().returning(|| Ok(Vec::new()));

        let mut calls = 0;
        store.expect_load_valid_keys().returning(move |_| {
            calls += 1;
            if calls == 1 {
                Err(KeygenError::store("db down"))
            } else {
                Ok(Vec::new())
            }
        });
        store.expect_filter_existing().returning(|_| Ok(Vec::new()));
        store.expect_insert_valid_keys().returning(|_| Ok(()));

        let pool = KeyPool::new(Arc::new(store), small_config(10));

        // first pass fails and must surface at init
        assert!(pool.init().await.is_err());
        assert_eq!(pool.len(), 0);

        // flag was cleared: the next low-watermark trigger runs a new pass
        assert!(pool.take().is_none());
        wait_until(|| pool.len() == 10).await;
        pool.shutdown().await;
    }

    #[tokio::test]
    async fn test_refill_skips_keys_already_pooled() {
        let mut store = MockKeyStore::new();
        store.expect_all_valid_keys().returning(|| Ok(Vec::new()));
        // the store keeps returning the same valid row, as it would while
        // the key sits in the pool unconsumed
        store
            .expect_load_valid_keys()
            .returning(|_| Ok(vec!["samekey".into()]));
        store.expect_filter_existing().returning(|_| Ok(Vec::new()));
        store.expect_insert_valid_keys().returning(|_| Ok(()));
        store.expect_mark_consumed().returning(|_| Ok(()));

        let pool = KeyPool::new(Arc::new(store), small_config(2));
        pool.init().await.unwrap();
        assert_eq!(pool.len(), 2);

        // a second pass must not enqueue "samekey" again while it is pooled
        pool.init().await.unwrap();
        assert_eq!(pool.len(), 4);

        let mut seen = HashSet::new();
        while let Some(key) = pool.take() {
            assert!(seen.insert(key), "duplicate key dispensed");
        }
        assert_eq!(seen.len(), 4);
        pool.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_drains_mark_used_writes() {
        let mut store = MockKeyStore::new();
        store.expect_all_valid_keys().returning(|| Ok(Vec::new()));
        store.expect_load_valid_keys().returning(|_| Ok(Vec::new()));
        store.expect_filter_existing().returning(|_| Ok(Vec::new()));
        store.expect_insert_valid_keys().returning(|_| Ok(()));
        // every dispensed key gets its consumed transition before exit
        store.expect_mark_consumed().times(4).returning(|_| Ok(()));

        let pool = KeyPool::new(Arc::new(store), small_config(4));
        pool.init().await.unwrap();

        for _ in 0..4 {
            pool.take().unwrap();
        }
        pool.shutdown().await;
    }
}
