//! Eviction Manager
//!
//! Chooses least-recently-used victims in batches so sustained memory
//! pressure does not evict one entry per insert.

use std::collections::HashMap;

use crate::cache::CacheEntry;

/// Share of current usage freed by one eviction batch (1/5 = 20%)
pub const EVICTION_BATCH_DIVISOR: u64 = 5;

// == Eviction Scope ==
/// Which entries compete for eviction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionScope<'a> {
    /// Only entries of one namespace (its own cap is binding)
    Namespace(&'a str),
    /// Every entry (the aggregate budget is binding)
    Global,
}

impl EvictionScope<'_> {
    fn admits(&self, entry: &CacheEntry) -> bool {
        match self {
            EvictionScope::Namespace(namespace) => entry.namespace == *namespace,
            EvictionScope::Global => true,
        }
    }
}

// == Batch Target ==
/// Bytes to free before inserting `requested` bytes into a scope currently
/// holding `current_usage`: the larger of the request and 20% of usage.
pub fn batch_target(requested: u64, current_usage: u64) -> u64 {
    requested.max(current_usage / EVICTION_BATCH_DIVISOR)
}

// == Select Victims ==
/// Walks keys from least to most recently used and picks entries in `scope`
/// until at least `min_bytes` are freed and `min_count` entries are chosen,
/// or candidates run out.
pub fn select_victims<'a>(
    oldest_first: impl Iterator<Item = &'a str>,
    entries: &HashMap<String, CacheEntry>,
    scope: EvictionScope<'_>,
    min_bytes: u64,
    min_count: usize,
) -> Vec<String> {
    let mut victims = Vec::new();
    let mut freed = 0u64;

    for key in oldest_first {
        if freed >= min_bytes && victims.len() >= min_count {
            break;
        }
        let Some(entry) = entries.get(key) else {
            continue;
        };
        if !scope.admits(entry) {
            continue;
        }
        freed += entry.size_bytes;
        victims.push(key.to_string());
    }

    victims
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entries(spec: &[(&str, &str, u64)]) -> HashMap<String, CacheEntry> {
        spec.iter()
            .map(|(key, namespace, size)| {
                let mut entry = CacheEntry::new(*key, *namespace, json!(null), 60);
                entry.size_bytes = *size;
                (key.to_string(), entry)
            })
            .collect()
    }

    #[test]
    fn test_batch_target() {
        assert_eq!(batch_target(100, 1000), 200);
        assert_eq!(batch_target(300, 1000), 300);
        assert_eq!(batch_target(10, 0), 10);
    }

    #[test]
    fn test_select_victims_frees_target_bytes() {
        let map = entries(&[("a", "ns", 100), ("b", "ns", 100), ("c", "ns", 100)]);
        let order = ["a", "b", "c"];

        let victims = select_victims(order.into_iter(), &map, EvictionScope::Global, 150, 0);
        assert_eq!(victims, vec!["a", "b"]);
    }

    #[test]
    fn test_select_victims_respects_namespace_scope() {
        let map = entries(&[("a", "x", 50), ("b", "y", 50), ("c", "x", 50)]);
        let order = ["a", "b", "c"];

        let victims = select_victims(
            order.into_iter(),
            &map,
            EvictionScope::Namespace("x"),
            100,
            0,
        );
        assert_eq!(victims, vec!["a", "c"]);
    }

    #[test]
    fn test_select_victims_by_count() {
        let map = entries(&[("a", "ns", 0), ("b", "ns", 0)]);
        let victims = select_victims(["a", "b"].into_iter(), &map, EvictionScope::Global, 0, 1);
        assert_eq!(victims, vec!["a"]);
    }

    #[test]
    fn test_select_victims_runs_out() {
        let map = entries(&[("a", "ns", 10)]);
        let victims = select_victims(["a", "gone"].into_iter(), &map, EvictionScope::Global, 500, 0);
        assert_eq!(victims, vec!["a"]);
    }

    #[test]
    fn test_nothing_needed_selects_nothing() {
        let map = entries(&[("a", "ns", 10)]);
        let victims = select_victims(["a"].into_iter(), &map, EvictionScope::Global, 0, 0);
        assert!(victims.is_empty());
    }
}
