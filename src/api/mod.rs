//! API Module
//!
//! The in-process surface of the cache: a shared handle with get, put,
//! invalidate, clear, stats and persistence, plus memoization helpers.

mod handle;
mod memoize;

pub use handle::{OutputCache, OutputCacheBuilder};
