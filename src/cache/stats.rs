//! Cache Statistics Module
//!
//! Per-namespace counters for hits, misses, removals and cost savings.

use serde::{Deserialize, Serialize};

// == Namespace Stats ==
/// Counters for one namespace. Live entry and byte totals are tracked by the
/// store and joined in when a report is built.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NamespaceStats {
    /// Reads that returned a value
    pub hits: u64,
    /// Reads that returned nothing
    pub misses: u64,
    /// Entries removed to make room
    pub evictions: u64,
    /// Entries removed by a dependency change signal
    pub invalidations: u64,
    /// Entries removed because their TTL elapsed
    pub expirations: u64,
    /// Entries removed because their validity strategy said stale
    pub validation_failures: u64,
    /// Writes refused
    pub rejected: u64,
    /// Work units not recomputed thanks to hits
    pub work_units_saved: u64,
    /// Cost of the work units saved
    pub cost_saved: f64,
}

impl NamespaceStats {
    // == Constructor ==
    /// Creates a new NamespaceStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Returns hits / (hits + misses), or 0.0 if no reads have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    pub fn record_invalidation(&mut self) {
        self.invalidations += 1;
    }

    pub fn record_expiration(&mut self) {
        self.expirations += 1;
    }

    pub fn record_validation_failure(&mut self) {
        self.validation_failures += 1;
    }

    pub fn record_rejected(&mut self) {
        self.rejected += 1;
    }

    // == Record Savings ==
    /// Accrues the savings of a hit on an entry that recorded `work_units`.
    pub fn record_savings(&mut self, work_units: u64, cost_per_unit: f64) {
        self.work_units_saved += work_units;
        self.cost_saved += work_units as f64 * cost_per_unit;
    }

    // == Merge ==
    /// Adds another namespace's counters into this one.
    pub fn merge(&mut self, other: &NamespaceStats) {
        self.hits += other.hits;
        self.misses += other.misses;
        self.evictions += other.evictions;
        self.invalidations += other.invalidations;
        self.expirations += other.expirations;
        self.validation_failures += other.validation_failures;
        self.rejected += other.rejected;
        self.work_units_saved += other.work_units_saved;
        self.cost_saved += other.cost_saved;
    }
}
