//! Response types for the cache API
//!
//! Write outcomes, sweep summaries and the statistics report.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::cache::NamespaceStats;
use crate::error::CacheError;

/// Result of a write.
#[derive(Debug)]
pub enum PutOutcome {
    /// The entry is stored
    Stored,
    /// The entry was refused; the caller should treat the result as uncached
    Rejected(CacheError),
}

impl PutOutcome {
    pub fn is_stored(&self) -> bool {
        matches!(self, PutOutcome::Stored)
    }

    /// Returns the rejection reason, if any.
    pub fn rejection(&self) -> Option<&CacheError> {
        match self {
            PutOutcome::Stored => None,
            PutOutcome::Rejected(reason) => Some(reason),
        }
    }
}

/// Entries removed by one sweeper pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Entries whose TTL elapsed
    pub expired: usize,
    /// Entries their validity strategy reported stale
    pub invalid: usize,
}

impl SweepReport {
    pub fn total(&self) -> usize {
        self.expired + self.invalid
    }
}

/// Statistics for one namespace.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NamespaceReport {
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub evictions: u64,
    pub invalidations: u64,
    pub expirations: u64,
    pub validation_failures: u64,
    pub rejected: u64,
    pub entries_count: usize,
    pub bytes_used: u64,
    pub cost_saved: f64,
    pub work_units_saved: u64,
}

impl NamespaceReport {
    /// Joins counters with the live entry and byte totals.
    pub fn new(stats: &NamespaceStats, entries_count: usize, bytes_used: u64) -> Self {
        Self {
            hits: stats.hits,
            misses: stats.misses,
            hit_rate: stats.hit_rate(),
            evictions: stats.evictions,
            invalidations: stats.invalidations,
            expirations: stats.expirations,
            validation_failures: stats.validation_failures,
            rejected: stats.rejected,
            entries_count,
            bytes_used,
            cost_saved: stats.cost_saved,
            work_units_saved: stats.work_units_saved,
        }
    }
}

/// Aggregate statistics over a set of namespaces, with the per-namespace
/// distribution.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatsReport {
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub evictions: u64,
    pub invalidations: u64,
    pub expirations: u64,
    pub validation_failures: u64,
    pub rejected: u64,
    pub entries_count: usize,
    pub bytes_used: u64,
    pub cost_saved: f64,
    pub work_units_saved: u64,
    /// Per-namespace breakdown
    pub namespaces: BTreeMap<String, NamespaceReport>,
}

impl StatsReport {
    /// Builds the aggregate from per-namespace rows.
    pub fn from_namespaces(rows: Vec<(String, NamespaceStats, usize, u64)>) -> Self {
        let mut total = NamespaceStats::new();
        let mut report = StatsReport::default();

        for (name, stats, entries, bytes) in rows {
            total.merge(&stats);
            report.entries_count += entries;
            report.bytes_used += bytes;
            report
                .namespaces
                .insert(name, NamespaceReport::new(&stats, entries, bytes));
        }

        report.hits = total.hits;
        report.misses = total.misses;
        report.hit_rate = total.hit_rate();
        report.evictions = total.evictions;
        report.invalidations = total.invalidations;
        report.expirations = total.expirations;
        report.validation_failures = total.validation_failures;
        report.rejected = total.rejected;
        report.cost_saved = total.cost_saved;
        report.work_units_saved = total.work_units_saved;
        report
    }
}
