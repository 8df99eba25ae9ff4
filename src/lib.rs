//! Call Cache - An in-process result cache for expensive calls
//!
//! Memoizes model prompts, agent runs and tool invocations per namespace,
//! with TTL expiry, pluggable validity strategies, batched LRU eviction,
//! cost accounting and optional on-disk persistence.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod keys;
pub mod models;
pub mod persistence;
pub mod tasks;
pub mod validity;

pub use api::{OutputCache, OutputCacheBuilder};
pub use config::{CacheConfig, NamespaceConfig, StrategyKind};
pub use error::{CacheError, Result};
pub use models::{CallInputs, PutOptions, PutOutcome, StatsReport, SweepReport};
pub use tasks::{spawn_sweeper, SweeperHandle};
pub use validity::ValidityStrategy;
