//! Probabilistic membership filter for key deduplication.
//!
//! A fixed-size bit vector with k probes per key. Guarantees zero false
//! negatives: once [`MembershipFilter::add`] has been called for a key,
//! [`MembershipFilter::might_contain`] stays true for the process lifetime.
//! False positives are possible and bounded by the bit/hash configuration.
//!
//! The filter is advisory only. The persistent store remains authoritative
//! and is always consulted before a key is treated as truly unused.
//!
//! Probe indexes come from double hashing over two independently seeded
//! hashes, which keeps the false-positive rate close to the theoretical
//! optimum for k probes. Bits are only ever set, never cleared, so add and
//! query are plain atomic operations and the filter needs no external lock.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};

/// Seeds for the two independent hashes.
const SEED_A: u64 = 0x9e37_79b9_7f4a_7c15;
const SEED_B: u64 = 0x517c_c1b7_2722_0a95;

/// Lock-free bloom-style membership filter over string keys.
pub struct MembershipFilter {
    words: Vec<AtomicU64>,
    bits: u64,
    hashes: u32,
}

impl MembershipFilter {
    /// Creates a filter with `bits` bit positions and `hashes` probes per key.
    ///
    /// `bits` is rounded up to a multiple of 64. A `hashes` of zero is
    /// clamped to one probe.
    pub fn new(bits: usize, hashes: u32) -> Self {
        let bits = bits.max(64);
        let words = bits.div_ceil(64);
        Self {
            words: (0..words).map(|_| AtomicU64::new(0)).collect(),
            bits: (words * 64) as u64,
            hashes: hashes.max(1),
        }
    }

    /// Records `key` as seen. Idempotent.
    pub fn add(&self, key: &str) {
        for index in self.probes(key) {
            let (word, mask) = Self::position(index);
            self.words[word].fetch_or(mask, Ordering::Relaxed);
        }
    }

    /// Returns `false` only when `key` was definitely never added.
    pub fn might_contain(&self, key: &str) -> bool {
        self.probes(key).all(|index| {
            let (word, mask) = Self::position(index);
            self.words[word].load(Ordering::Relaxed) & mask != 0
        })
    }

    /// Total bit capacity after rounding.
    pub fn bit_capacity(&self) -> usize {
        self.bits as usize
    }

    fn position(index: u64) -> (usize, u64) {
        ((index / 64) as usize, 1u64 << (index % 64))
    }

    /// Double hashing: probe i at `h1 + i * h2` over the bit space.
    fn probes(&self, key: &str) -> impl Iterator<Item = u64> + '_ {
        let (h1, h2) = hash_pair(key);
        // forcing h2 odd avoids degenerate probe cycles
        let h2 = h2 | 1;
        (0..self.hashes as u64).map(move |i| h1.wrapping_add(i.wrapping_mul(h2)) % self.bits)
    }
}

fn hash_pair(key: &str) -> (u64, u64) {
    let mut a = DefaultHasher::new();
    SEED_A.hash(&mut a);
    key.hash(&mut a);

    let mut b = DefaultHasher::new();
    SEED_B.hash(&mut b);
    key.hash(&mut b);

    (a.finish(), b.finish())
}
