//! Cache Store Module
//!
//! The entry map, its access order and per-namespace accounting. Every method
//! takes `&mut self`; the shared handle serializes callers with one lock, so
//! each operation (lookup, freshness check, eviction, insertion) is atomic.

use std::collections::{BTreeSet, HashMap};

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::cache::eviction::{self, EvictionScope};
use crate::cache::{
    current_timestamp_ms, estimate_size, CacheEntry, LruTracker, NamespaceStats,
};
use crate::config::{CacheConfig, NamespaceConfig};
use crate::error::{CacheError, Result};
use crate::models::{CallInputs, PutOptions, PutOutcome, StatsReport, SweepReport};
use crate::validity::StrategyRegistry;

/// Live entry and byte totals of one namespace
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct NamespaceUsage {
    entries: usize,
    bytes: u64,
}

/// Outcome of looking a key up, before any mutation
enum Lookup {
    Absent,
    Expired,
    Invalid,
    Fresh,
}

// == Cache Store ==
/// Bounded in-memory store with LRU eviction, TTL expiry and validity checks.
#[derive(Debug)]
pub struct CacheStore {
    /// Key -> entry
    entries: HashMap<String, CacheEntry>,
    /// Access order over every key
    lru: LruTracker,
    /// Live totals per namespace
    usage: HashMap<String, NamespaceUsage>,
    /// Counters per namespace
    stats: HashMap<String, NamespaceStats>,
    /// Sum of `size_bytes` over all entries
    total_bytes: u64,
    config: CacheConfig,
    strategies: StrategyRegistry,
}

impl CacheStore {
    // == Constructor ==
    /// Creates a store using the stock strategy of every configured namespace.
    pub fn new(config: CacheConfig) -> Self {
        let strategies = StrategyRegistry::from_config(&config);
        Self::with_strategies(config, strategies)
    }

    /// Creates a store with an explicit strategy registry.
    pub fn with_strategies(config: CacheConfig, strategies: StrategyRegistry) -> Self {
        Self {
            entries: HashMap::new(),
            lru: LruTracker::new(),
            usage: HashMap::new(),
            stats: HashMap::new(),
            total_bytes: 0,
            config,
            strategies,
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    // == Derive Key ==
    /// Derives the cache key of a call using the namespace's strategy.
    pub fn derive_key(&self, namespace: &str, inputs: &CallInputs) -> String {
        let strategy = self.strategies.resolve(namespace);
        crate::keys::derive_key(namespace, &strategy.key_material(inputs))
    }

    // == Get ==
    /// Returns the stored value if present, unexpired and fresh.
    ///
    /// Expired or stale entries are removed on the spot and count as misses.
    pub fn get(&mut self, namespace: &str, key: &str) -> Option<Value> {
        let strategy = self.strategies.resolve(namespace);
        let now = current_timestamp_ms();

        let lookup = match self.entries.get(key) {
            None => Lookup::Absent,
            Some(entry) if entry.namespace != namespace || !strategy.is_cacheable() => {
                Lookup::Absent
            }
            Some(entry) if entry.is_expired_at(now) => Lookup::Expired,
            Some(entry) if !strategy.is_fresh(entry) => Lookup::Invalid,
            Some(_) => Lookup::Fresh,
        };

        match lookup {
            Lookup::Absent => {
                self.stats_mut(namespace).record_miss();
                debug!("Cache miss in '{}'", namespace);
                None
            }
            Lookup::Expired => {
                self.remove_entry(key);
                let stats = self.stats_mut(namespace);
                stats.record_expiration();
                stats.record_miss();
                debug!("Cache miss in '{}': entry expired", namespace);
                None
            }
            Lookup::Invalid => {
                self.remove_entry(key);
                let stats = self.stats_mut(namespace);
                stats.record_validation_failure();
                stats.record_miss();
                debug!("Cache miss in '{}': entry no longer valid", namespace);
                None
            }
            Lookup::Fresh => {
                let cost_per_unit = self.config.namespace(namespace).cost_per_unit;
                let entry = self.entries.get_mut(key)?;
                entry.touch(now);
                let value = entry.value.clone();
                let work_units = entry.work_units;

                self.lru.touch(key);
                let stats = self.stats_mut(namespace);
                stats.record_hit();
                if let (Some(cost), Some(units)) = (cost_per_unit, work_units) {
                    stats.record_savings(units, cost);
                }
                debug!("Cache hit in '{}'", namespace);
                Some(value)
            }
        }
    }

    // == Put ==
    /// Stores a value, evicting as needed to stay within budget.
    ///
    /// Freshness data for the declared dependencies is captured now. Writes
    /// to never-cache namespaces, entries larger than their budget, and
    /// entries whose dependencies cannot be read are rejected.
    pub fn put(
        &mut self,
        namespace: &str,
        key: String,
        value: Value,
        options: PutOptions,
    ) -> PutOutcome {
        let strategy = self.strategies.resolve(namespace);
        if !strategy.is_cacheable() {
            return self.reject(namespace, CacheError::NeverCache(namespace.to_string()));
        }

        let ns_config = self.config.namespace(namespace).clone();
        let size = estimate_size(&value);
        let budget = if ns_config.max_entries == 0 {
            0
        } else {
            ns_config.max_bytes.min(self.config.max_total_bytes)
        };
        if size > budget || ns_config.max_entries == 0 {
            return self.reject(namespace, CacheError::Capacity { size, budget });
        }

        let validation = match strategy.capture(&options.dependencies) {
            Ok(validation) => validation,
            Err(e) => {
                warn!("Not caching result in '{}': {}", namespace, e);
                return self.reject(namespace, e);
            }
        };

        let entry = CacheEntry::new(key, namespace, value, ns_config.ttl_seconds)
            .with_validation(validation)
            .with_dependencies(options.dependencies)
            .with_work_units(options.work_units)
            .with_metadata(options.metadata);

        match self.insert(entry, &ns_config) {
            Ok(()) => PutOutcome::Stored,
            Err(e) => self.reject(namespace, e),
        }
    }

    // == Invalidate ==
    /// Removes every entry that declared `resource` as a dependency.
    pub fn invalidate(&mut self, resource: &str) -> usize {
        let keys: Vec<String> = self
            .entries
            .values()
            .filter(|entry| entry.depends_on(resource))
            .map(|entry| entry.key.clone())
            .collect();

        let mut removed = 0;
        for key in keys {
            if let Some(entry) = self.remove_entry(&key) {
                self.stats_mut(&entry.namespace).record_invalidation();
                removed += 1;
            }
        }

        if removed > 0 {
            info!("Invalidated {} entries depending on '{}'", removed, resource);
        }
        removed
    }

    // == Clear ==
    /// Removes every entry of one namespace, or of all namespaces.
    pub fn clear(&mut self, namespace: Option<&str>) -> usize {
        match namespace {
            Some(namespace) => {
                let keys: Vec<String> = self
                    .entries
                    .values()
                    .filter(|entry| entry.namespace == namespace)
                    .map(|entry| entry.key.clone())
                    .collect();
                let mut removed = 0;
                for key in keys {
                    if self.remove_entry(&key).is_some() {
                        removed += 1;
                    }
                }
                removed
            }
            None => {
                let removed = self.entries.len();
                self.entries.clear();
                self.lru.clear();
                self.usage.clear();
                self.total_bytes = 0;
                removed
            }
        }
    }

    // == Sweep ==
    /// Removes every expired or no-longer-valid entry.
    pub fn sweep(&mut self) -> SweepReport {
        let now = current_timestamp_ms();
        let mut expired = Vec::new();
        let mut invalid = Vec::new();

        for (key, entry) in &self.entries {
            if entry.is_expired_at(now) {
                expired.push(key.clone());
            } else if !self.strategies.resolve(&entry.namespace).is_fresh(entry) {
                invalid.push(key.clone());
            }
        }

        let mut report = SweepReport::default();
        for key in expired {
            if let Some(entry) = self.remove_entry(&key) {
                self.stats_mut(&entry.namespace).record_expiration();
                report.expired += 1;
            }
        }
        for key in invalid {
            if let Some(entry) = self.remove_entry(&key) {
                self.stats_mut(&entry.namespace).record_validation_failure();
                report.invalid += 1;
            }
        }
        report
    }

    // == Snapshot ==
    /// Clones the unexpired entries of a namespace, least recently used first.
    pub fn snapshot(&self, namespace: &str) -> Vec<CacheEntry> {
        let now = current_timestamp_ms();
        self.lru
            .oldest_first()
            .filter_map(|key| self.entries.get(key))
            .filter(|entry| entry.namespace == namespace && !entry.is_expired_at(now))
            .cloned()
            .collect()
    }

    // == Restore ==
    /// Re-inserts previously persisted entries, keeping their original
    /// timestamps and validation data. Expired, oversized and never-cache
    /// entries are skipped. Returns the number restored.
    pub fn restore(&mut self, mut entries: Vec<CacheEntry>) -> usize {
        let now = current_timestamp_ms();
        entries.sort_by_key(|entry| entry.last_accessed);

        let mut restored = 0;
        for mut entry in entries {
            if entry.is_expired_at(now) {
                continue;
            }
            if !self.strategies.resolve(&entry.namespace).is_cacheable() {
                continue;
            }
            entry.size_bytes = estimate_size(&entry.value);
            let ns_config = self.config.namespace(&entry.namespace).clone();
            match self.insert(entry, &ns_config) {
                Ok(()) => restored += 1,
                Err(e) => debug!("Skipping persisted entry: {}", e),
            }
        }
        restored
    }

    // == Stats ==
    /// Builds a report for one namespace, or for every namespace seen.
    pub fn stats(&self, namespace: Option<&str>) -> StatsReport {
        let names: BTreeSet<String> = match namespace {
            Some(namespace) => BTreeSet::from([namespace.to_string()]),
            None => self
                .stats
                .keys()
                .chain(self.usage.keys())
                .cloned()
                .collect(),
        };

        let rows = names
            .into_iter()
            .map(|name| {
                let stats = self.stats.get(&name).cloned().unwrap_or_default();
                let usage = self.usage.get(&name).copied().unwrap_or_default();
                (name, stats, usage.entries, usage.bytes)
            })
            .collect();
        StatsReport::from_namespaces(rows)
    }

    // == Length ==
    /// Returns the current number of entries in the store.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of `size_bytes` over all stored entries.
    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    /// Sum of `size_bytes` over one namespace's entries.
    pub fn namespace_bytes(&self, namespace: &str) -> u64 {
        self.usage.get(namespace).map_or(0, |usage| usage.bytes)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    // == Internals ==
    fn stats_mut(&mut self, namespace: &str) -> &mut NamespaceStats {
        self.stats.entry(namespace.to_string()).or_default()
    }

    fn usage_of(&self, namespace: &str) -> NamespaceUsage {
        self.usage.get(namespace).copied().unwrap_or_default()
    }

    fn reject(&mut self, namespace: &str, reason: CacheError) -> PutOutcome {
        self.stats_mut(namespace).record_rejected();
        debug!("Rejected write to '{}': {}", namespace, reason);
        PutOutcome::Rejected(reason)
    }

    /// Inserts an entry after making room for it. An existing entry under the
    /// same key is replaced; if the insert is then refused, the replaced
    /// entry counts as evicted.
    fn insert(&mut self, entry: CacheEntry, ns_config: &NamespaceConfig) -> Result<()> {
        let replaced = self.remove_entry(&entry.key);

        let size = entry.size_bytes;
        self.make_room(&entry.namespace, size, ns_config);

        let usage = self.usage_of(&entry.namespace);
        let namespace_room = if usage.entries < ns_config.max_entries {
            ns_config.max_bytes.saturating_sub(usage.bytes)
        } else {
            0
        };
        let room = namespace_room.min(self.config.max_total_bytes.saturating_sub(self.total_bytes));
        if size > room || usage.entries >= ns_config.max_entries {
            if let Some(old) = replaced {
                self.stats_mut(&old.namespace).record_eviction();
            }
            return Err(CacheError::Capacity { size, budget: room });
        }

        let usage = self.usage.entry(entry.namespace.clone()).or_default();
        usage.entries += 1;
        usage.bytes += size;
        self.total_bytes += size;
        self.lru.touch(&entry.key);
        self.entries.insert(entry.key.clone(), entry);
        Ok(())
    }

    /// Evicts until an entry of `size` bytes fits the namespace's entry cap,
    /// the namespace's byte budget and the aggregate byte budget.
    fn make_room(&mut self, namespace: &str, size: u64, ns_config: &NamespaceConfig) {
        let usage = self.usage_of(namespace);
        if usage.entries >= ns_config.max_entries {
            let excess = usage.entries + 1 - ns_config.max_entries;
            let victims = eviction::select_victims(
                self.lru.oldest_first(),
                &self.entries,
                EvictionScope::Namespace(namespace),
                0,
                excess,
            );
            self.evict(victims);
        }

        let usage = self.usage_of(namespace);
        if usage.bytes + size > ns_config.max_bytes {
            let victims = eviction::select_victims(
                self.lru.oldest_first(),
                &self.entries,
                EvictionScope::Namespace(namespace),
                eviction::batch_target(size, usage.bytes),
                0,
            );
            self.evict(victims);
        }

        if self.total_bytes + size > self.config.max_total_bytes {
            let victims = eviction::select_victims(
                self.lru.oldest_first(),
                &self.entries,
                EvictionScope::Global,
                eviction::batch_target(size, self.total_bytes),
                0,
            );
            self.evict(victims);
        }
    }

    fn evict(&mut self, victims: Vec<String>) {
        let count = victims.len();
        for key in victims {
            if let Some(entry) = self.remove_entry(&key) {
                self.stats_mut(&entry.namespace).record_eviction();
            }
        }
        if count > 0 {
            debug!("Evicted {} entries", count);
        }
    }

    /// Removes an entry and releases its accounting. The only path by which
    /// an entry's bytes are released.
    fn remove_entry(&mut self, key: &str) -> Option<CacheEntry> {
        let entry = self.entries.remove(key)?;
        self.lru.remove(key);
        self.total_bytes = self.total_bytes.saturating_sub(entry.size_bytes);

        if let Some(usage) = self.usage.get_mut(&entry.namespace) {
            usage.entries = usage.entries.saturating_sub(1);
            usage.bytes = usage.bytes.saturating_sub(entry.size_bytes);
            if usage.entries == 0 {
                self.usage.remove(&entry.namespace);
            }
        }
        Some(entry)
    }
}
