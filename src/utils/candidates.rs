//! Random key candidate production.
//!
//! Candidates carry no uniqueness guarantee at this stage; the pool's refill
//! pass filters them through the membership filter and the authoritative
//! store check before they become Valid keys.

use rand::Rng;

/// Character set for generated keys: digits plus upper/lower ASCII letters.
const CHARSET: &[u8; 62] = b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Produces fixed-length random alphanumeric key candidates.
///
/// Each call draws from the calling thread's own RNG (`rand::rng()`), so
/// concurrent workers never contend on a shared random source.
#[derive(Debug, Clone)]
pub struct RandomCandidateGenerator {
    key_length: usize,
}

impl RandomCandidateGenerator {
    /// Creates a generator producing keys of exactly `key_length` characters.
    pub fn new(key_length: usize) -> Self {
        Self { key_length }
    }

    /// Generates one candidate.
    pub fn generate_one(&self) -> String {
        let mut rng = rand::rng();
        (0..self.key_length)
            .map(|_| CHARSET[rng.random_range(0..CHARSET.len())] as char)
            .collect()
    }

    /// Generates `count` independent candidates.
    pub fn generate(&self, count: usize) -> Vec<String> {
        (0..count).map(|_| self.generate_one()).collect()
    }

    /// Configured candidate length.
    pub fn key_length(&self) -> usize {
        self.key_length
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generate_one_has_configured_length() {
        let generator = RandomCandidateGenerator::new(6);
        assert_eq!(generator.generate_one().len(), 6);

        let generator = RandomCandidateGenerator::new(12);
        assert_eq!(generator.generate_one().len(), 12);
    }

    #[test]
    fn test_generate_returns_exact_count() {
        let generator = RandomCandidateGenerator::new(6);
        assert_eq!(generator.generate(0).len(), 0);
        assert_eq!(generator.generate(1).len(), 1);
        assert_eq!(generator.generate(500).len(), 500);
    }

    #[test]
    fn test_candidates_are_alphanumeric() {
        let generator = RandomCandidateGenerator::new(8);
        for key in generator.generate(200) {
            assert!(key.chars().all(|c| c.is_ascii_alphanumeric()), "{:?}", key);
        }
    }

    #[test]
    fn test_candidates_are_mostly_unique() {
        let generator = RandomCandidateGenerator::new(6);
        let keys: HashSet<String> = generator.generate(1000).into_iter().collect();
        // 1000 draws from a 62^6 space; a collision here is ~1e-5
        assert_eq!(keys.len(), 1000);
    }

    #[test]
    fn test_all_charset_positions_reachable() {
        let generator = RandomCandidateGenerator::new(1);
        let seen: HashSet<char> = generator
            .generate(5000)
            .into_iter()
            .flat_map(|k| k.chars().collect::<Vec<_>>())
            .collect();
        // 5000 single-char draws over 62 symbols should hit nearly all of them
        assert!(seen.len() > 55, "only {} distinct symbols seen", seen.len());
    }
}
