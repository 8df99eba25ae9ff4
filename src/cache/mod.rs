//! Cache Module
//!
//! The in-memory engine: entries with TTL and validation data, LRU tracking,
//! batched eviction and per-namespace statistics.

mod entry;
pub mod eviction;
mod lru;
mod stats;
mod store;


// Re-export public types
pub use entry::{
    current_timestamp_ms, estimate_size, CacheEntry, DependencyMarker, Validation,
};
pub use lru::LruTracker;
pub use stats::NamespaceStats;
pub use store::CacheStore;
