//! Building blocks for code and key generation.
//!
//! - [`base62`] - fixed-alphabet integer encoding for segment codes
//! - [`candidates`] - random fixed-length key candidate production
//! - [`membership_filter`] - probabilistic set for cheap "definitely unused" checks

pub mod base62;
pub mod candidates;
pub mod membership_filter;

pub use candidates::RandomCandidateGenerator;
pub use membership_filter::MembershipFilter;
