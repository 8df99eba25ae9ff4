//! Validity Strategies
//!
//! A strategy decides, beyond plain expiry, whether a stored entry may still
//! be served. It also chooses how call inputs are canonicalized before they
//! are digested into a key, and what freshness data is captured at write
//! time.

mod basic;
mod files;
mod revision;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::cache::{CacheEntry, Validation};
use crate::config::{CacheConfig, NamespaceConfig, StrategyKind};
use crate::error::Result;
use crate::keys;
use crate::models::CallInputs;

pub use basic::{
    ContextAwareStrategy, ExactMatchStrategy, NeverCacheStrategy, SemanticMatchStrategy,
    TimeBasedStrategy,
};
pub use files::{content_digest, modification_marker, ContentHashStrategy, FileDependencyStrategy};
pub use revision::{GitRevisionSource, RepositoryRevisionStrategy, RevisionSource};

// == Validity Strategy ==
/// Freshness capability attached to a namespace.
///
/// `is_fresh` is only consulted after the TTL check passes. Implementations
/// must swallow their own I/O failures and answer `false`.
pub trait ValidityStrategy: Send + Sync + fmt::Debug {
    /// The configuration tag this strategy implements.
    fn kind(&self) -> StrategyKind;

    /// Canonical form of the inputs that gets digested into the key.
    fn key_material(&self, inputs: &CallInputs) -> String {
        keys::exact_material(inputs)
    }

    /// Whether results may be stored at all.
    fn is_cacheable(&self) -> bool {
        true
    }

    /// Captures freshness data for `dependencies` at write time.
    fn capture(&self, _dependencies: &[String]) -> Result<Validation> {
        Ok(Validation::None)
    }

    /// Whether `entry` may still be served.
    fn is_fresh(&self, _entry: &CacheEntry) -> bool {
        true
    }
}

/// Builds the stock strategy for a namespace profile.
pub fn build_strategy(config: &NamespaceConfig) -> Arc<dyn ValidityStrategy> {
    match config.strategy {
        StrategyKind::TimeBased => Arc::new(TimeBasedStrategy),
        StrategyKind::ExactMatch => Arc::new(ExactMatchStrategy),
        StrategyKind::SemanticMatch => Arc::new(SemanticMatchStrategy),
        StrategyKind::ContextAware => Arc::new(ContextAwareStrategy),
        StrategyKind::FileDependency => Arc::new(FileDependencyStrategy),
        StrategyKind::ContentHash => Arc::new(ContentHashStrategy),
        StrategyKind::RepositoryRevision => {
            let repository = config.repository.clone().unwrap_or_else(|| ".".into());
            Arc::new(RepositoryRevisionStrategy::new(GitRevisionSource::new(
                repository,
            )))
        }
        StrategyKind::NeverCache => Arc::new(NeverCacheStrategy),
    }
}

// == Strategy Registry ==
/// Namespace -> strategy lookup, built once from configuration.
#[derive(Debug, Clone)]
pub struct StrategyRegistry {
    by_namespace: HashMap<String, Arc<dyn ValidityStrategy>>,
    fallback: Arc<dyn ValidityStrategy>,
}

impl StrategyRegistry {
    /// Creates a registry holding the stock strategy of every configured
    /// namespace plus the default profile's strategy as fallback.
    pub fn from_config(config: &CacheConfig) -> Self {
        let by_namespace = config
            .namespaces
            .iter()
            .map(|(name, ns)| (name.clone(), build_strategy(ns)))
            .collect();

        Self {
            by_namespace,
            fallback: build_strategy(&config.default_namespace),
        }
    }

    /// Replaces the strategy used for one namespace.
    pub fn register(&mut self, namespace: impl Into<String>, strategy: Arc<dyn ValidityStrategy>) {
        self.by_namespace.insert(namespace.into(), strategy);
    }

    /// Returns the strategy for a namespace, or the fallback.
    pub fn resolve(&self, namespace: &str) -> Arc<dyn ValidityStrategy> {
        self.by_namespace
            .get(namespace)
            .cloned()
            .unwrap_or_else(|| self.fallback.clone())
    }
}
