//! Caching for ledgit.
//!
//! Ledger reads are full scans and content retrieval is slow, so the engine
//! keeps two independent caches with opposite freshness profiles:
//!
//! - [`ImmutableCache`] -- content bodies and tree manifests, keyed by
//!   content id. Content never changes once stored, so entries never expire.
//!   An in-process map sits in front of an optional on-disk tier
//!   ([`DiskTier`]) that survives across sessions.
//! - [`TtlCache`] -- query results over mutable state (repository list,
//!   commit log, branch list). Entries expire after a short TTL, checked on
//!   every read, and the oldest entry is evicted at capacity.

pub mod disk;
pub mod error;
pub mod immutable;
pub mod ttl;

pub use disk::DiskTier;
pub use error::{CacheError, CacheResult};
pub use immutable::{CacheStats, CachedBlob, ImmutableCache};
pub use ttl::TtlCache;
