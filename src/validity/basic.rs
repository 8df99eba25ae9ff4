//! Strategies that need no freshness data: expiry alone decides, and they
//! differ only in how keys are canonicalized.

use crate::cache::CacheEntry;
use crate::config::StrategyKind;
use crate::keys;
use crate::models::CallInputs;

use super::ValidityStrategy;

/// Expiry only; exact keys.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeBasedStrategy;

impl ValidityStrategy for TimeBasedStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::TimeBased
    }
}

/// Hits only on byte-identical inputs.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactMatchStrategy;

impl ValidityStrategy for ExactMatchStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::ExactMatch
    }
}

/// Hits on inputs that differ only in embedded timestamps and identifiers.
#[derive(Debug, Clone, Copy, Default)]
pub struct SemanticMatchStrategy;

impl ValidityStrategy for SemanticMatchStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::SemanticMatch
    }

    fn key_material(&self, inputs: &CallInputs) -> String {
        keys::semantic_material(inputs)
    }
}

/// Keys include a digest of the caller context.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextAwareStrategy;

impl ValidityStrategy for ContextAwareStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::ContextAware
    }

    fn key_material(&self, inputs: &CallInputs) -> String {
        keys::context_material(inputs)
    }
}

/// For calls with side effects or true non-determinism: nothing is stored.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverCacheStrategy;

impl ValidityStrategy for NeverCacheStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::NeverCache
    }

    fn is_cacheable(&self) -> bool {
        false
    }

    fn is_fresh(&self, _entry: &CacheEntry) -> bool {
        false
    }
}
