//! Cache Handle
//!
//! The shared, cloneable entry point. Every operation takes the store lock
//! once, so lookups, freshness checks, eviction and insertion are atomic
//! with respect to each other. Disk I/O for persistence happens outside it.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::cache::CacheStore;
use crate::config::CacheConfig;
use crate::error::Result;
use crate::models::{validate_namespace, CallInputs, PutOptions, PutOutcome, StatsReport, SweepReport};
use crate::persistence::PersistenceLayer;
use crate::validity::{StrategyRegistry, ValidityStrategy};

/// Shared handle to one cache.
///
/// Cloning is cheap; clones see the same entries and statistics.
#[derive(Debug, Clone)]
pub struct OutputCache {
    store: Arc<Mutex<CacheStore>>,
    persistence: Option<Arc<PersistenceLayer>>,
    persistent_namespaces: Arc<Vec<String>>,
}

/// Builds an [`OutputCache`] with custom validity strategies.
#[derive(Debug)]
pub struct OutputCacheBuilder {
    config: CacheConfig,
    strategies: StrategyRegistry,
}

impl OutputCacheBuilder {
    /// Replaces the strategy of one namespace.
    pub fn with_strategy(
        mut self,
        namespace: impl Into<String>,
        strategy: Arc<dyn ValidityStrategy>,
    ) -> Self {
        self.strategies.register(namespace, strategy);
        self
    }

    /// Builds an empty cache.
    pub fn build(self) -> OutputCache {
        let persistence = self
            .config
            .persistence_dir
            .clone()
            .map(|dir| Arc::new(PersistenceLayer::new(dir)));
        let persistent_namespaces = Arc::new(self.config.persistent_namespaces());

        OutputCache {
            store: Arc::new(Mutex::new(CacheStore::with_strategies(
                self.config,
                self.strategies,
            ))),
            persistence,
            persistent_namespaces,
        }
    }

    /// Builds the cache and reloads persisted namespaces.
    pub fn open(self) -> OutputCache {
        let cache = self.build();
        cache.restore();
        cache
    }
}

impl OutputCache {
    // == Constructors ==
    /// Creates an empty cache from configuration.
    pub fn new(config: CacheConfig) -> Self {
        Self::builder(config).build()
    }

    /// Creates a cache and reloads whatever persistent namespaces were saved.
    pub fn open(config: CacheConfig) -> Self {
        Self::builder(config).open()
    }

    pub fn builder(config: CacheConfig) -> OutputCacheBuilder {
        let strategies = StrategyRegistry::from_config(&config);
        OutputCacheBuilder { config, strategies }
    }

    /// Configuration snapshot.
    pub fn config(&self) -> CacheConfig {
        self.store.lock().config().clone()
    }

    /// Interval the background sweeper should run at.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.store.lock().config().sweep_interval_secs)
    }

    // == Get ==
    /// Looks up the cached result of a call.
    ///
    /// # Errors
    /// Only an invalid namespace identifier is an error; every other
    /// failure (expired, stale, unreadable dependency) is a miss.
    pub fn get(&self, namespace: &str, inputs: &CallInputs) -> Result<Option<Value>> {
        validate_namespace(namespace)?;
        let mut store = self.store.lock();
        let key = store.derive_key(namespace, inputs);
        Ok(store.get(namespace, &key))
    }

    /// Looks up a cached result and decodes it into `T`.
    ///
    /// A stored value that no longer decodes is reported as absent. The
    /// lookup itself already succeeded, so statistics still count it as a
    /// hit (with any work-unit savings) and the entry stays stored.
    pub fn get_as<T: DeserializeOwned>(
        &self,
        namespace: &str,
        inputs: &CallInputs,
    ) -> Result<Option<T>> {
        let Some(value) = self.get(namespace, inputs)? else {
            return Ok(None);
        };
        match serde_json::from_value(value) {
            Ok(decoded) => Ok(Some(decoded)),
            Err(e) => {
                debug!("Cached value in '{}' does not decode: {}", namespace, e);
                Ok(None)
            }
        }
    }

    // == Put ==
    /// Stores the result of a call.
    ///
    /// A rejected write is not an error: the outcome says why the value was
    /// not kept and the caller proceeds uncached.
    pub fn put(
        &self,
        namespace: &str,
        inputs: &CallInputs,
        value: Value,
        options: PutOptions,
    ) -> Result<PutOutcome> {
        validate_namespace(namespace)?;
        let mut store = self.store.lock();
        let key = store.derive_key(namespace, inputs);
        Ok(store.put(namespace, key, value, options))
    }

    // == Invalidate ==
    /// Drops every entry that declared `resource` as a dependency.
    pub fn invalidate(&self, resource: &str) -> usize {
        self.store.lock().invalidate(resource)
    }

    // == Clear ==
    /// Drops every entry of one namespace, or of all of them.
    pub fn clear(&self, namespace: Option<&str>) -> usize {
        let removed = self.store.lock().clear(namespace);
        info!(
            "Cleared {} entries from {}",
            removed,
            namespace.unwrap_or("all namespaces")
        );
        removed
    }

    // == Stats ==
    /// Statistics for one namespace, or aggregated over all of them.
    pub fn stats(&self, namespace: Option<&str>) -> StatsReport {
        self.store.lock().stats(namespace)
    }

    /// Number of live entries across namespaces.
    pub fn len(&self) -> usize {
        self.store.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.lock().is_empty()
    }

    // == Sweep ==
    /// Removes expired and stale entries across namespaces.
    pub fn sweep(&self) -> SweepReport {
        let report = self.store.lock().sweep();
        if report.total() > 0 {
            info!(
                "Sweep removed {} expired and {} invalid entries",
                report.expired, report.invalid
            );
        } else {
            debug!("Sweep found nothing to remove");
        }
        report
    }

    // == Persistence ==
    /// Writes every persistent namespace to disk. Returns the number of
    /// namespaces written; failures are logged and skipped.
    pub fn flush(&self) -> usize {
        let Some(persistence) = &self.persistence else {
            return 0;
        };

        let mut written = 0;
        for namespace in self.persistent_namespaces.iter() {
            let entries = self.store.lock().snapshot(namespace);
            match persistence.save(namespace, entries) {
                Ok(()) => written += 1,
                Err(e) => warn!("Failed to persist '{}': {}", namespace, e),
            }
        }
        written
    }

    /// Reloads every persistent namespace from disk. Returns the number of
    /// entries restored; unreadable records are logged and skipped.
    pub fn restore(&self) -> usize {
        let Some(persistence) = &self.persistence else {
            return 0;
        };

        let mut restored = 0;
        for namespace in self.persistent_namespaces.iter() {
            match persistence.load(namespace) {
                Ok(Some(entries)) => {
                    let count = self.store.lock().restore(entries);
                    debug!("Restored {} entries into '{}'", count, namespace);
                    restored += count;
                }
                Ok(None) => {}
                Err(e) => warn!("Discarding persisted '{}': {}", namespace, e),
            }
        }

        if restored > 0 {
            info!("Restored {} cached entries from disk", restored);
        }
        restored
    }
}
