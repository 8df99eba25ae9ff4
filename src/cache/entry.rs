//! Cache Entry Module
//!
//! Defines a stored call result together with its expiry and validation data.

use std::collections::HashMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// == Validation Metadata ==
/// Freshness marker captured for one dependency at write time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyMarker {
    /// Dependency resource identifier (a file path for file strategies)
    pub resource: String,
    /// Modification marker or content digest
    pub marker: String,
}

impl DependencyMarker {
    pub fn new(resource: impl Into<String>, marker: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            marker: marker.into(),
        }
    }
}

/// Strategy-specific data needed to decide whether an entry is still usable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Validation {
    /// Time-based, exact, semantic and context-aware entries
    #[default]
    None,
    /// Modification markers per dependency file
    Modified { markers: Vec<DependencyMarker> },
    /// Content digests per dependency file
    ContentDigest { markers: Vec<DependencyMarker> },
    /// Repository revision at write time
    Revision { revision: String },
}

// == Cache Entry ==
/// A stored call result. Owned exclusively by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Derived cache key
    pub key: String,
    /// Namespace the entry was written under
    pub namespace: String,
    /// The opaque stored value
    pub value: Value,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: u64,
    /// Time-to-live in seconds, fixed at creation
    pub ttl_seconds: u64,
    /// Last successful read (Unix milliseconds)
    pub last_accessed: u64,
    /// Number of successful reads
    pub access_count: u64,
    /// Approximate serialized size of the value
    pub size_bytes: u64,
    /// Strategy-specific freshness data
    #[serde(default)]
    pub validation: Validation,
    /// Declared dependency resources, used for invalidation
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Work units the original computation cost
    #[serde(default)]
    pub work_units: Option<u64>,
    /// Arbitrary caller metadata
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new entry stamped with the current time.
    pub fn new(
        key: impl Into<String>,
        namespace: impl Into<String>,
        value: Value,
        ttl_seconds: u64,
    ) -> Self {
        let now = current_timestamp_ms();
        let size_bytes = estimate_size(&value);

        Self {
            key: key.into(),
            namespace: namespace.into(),
            value,
            created_at: now,
            ttl_seconds,
            last_accessed: now,
            access_count: 0,
            size_bytes,
            validation: Validation::None,
            dependencies: Vec::new(),
            work_units: None,
            metadata: HashMap::new(),
        }
    }

    pub fn with_validation(mut self, validation: Validation) -> Self {
        self.validation = validation;
        self
    }

    pub fn with_dependencies(mut self, dependencies: Vec<String>) -> Self {
        self.dependencies = dependencies;
        self
    }

    pub fn with_work_units(mut self, work_units: Option<u64>) -> Self {
        self.work_units = work_units;
        self
    }

    pub fn with_metadata(mut self, metadata: HashMap<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }

    // == Is Expired ==
    /// Checks whether the entry's time-to-live has elapsed at `now` (ms).
    ///
    /// An entry is expired once its age is strictly greater than its TTL.
    pub fn is_expired_at(&self, now: u64) -> bool {
        now.saturating_sub(self.created_at) > self.ttl_seconds.saturating_mul(1000)
    }

    /// Checks whether the entry has expired as of now.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(current_timestamp_ms())
    }

    // == Time To Live ==
    /// Returns remaining TTL in milliseconds, `0` once expired.
    pub fn ttl_remaining_ms(&self) -> u64 {
        let expires = self
            .created_at
            .saturating_add(self.ttl_seconds.saturating_mul(1000));
        expires.saturating_sub(current_timestamp_ms())
    }

    /// Whether the entry declared `resource` as a dependency.
    pub fn depends_on(&self, resource: &str) -> bool {
        self.dependencies.iter().any(|d| d == resource)
    }

    // == Touch ==
    /// Records a successful read.
    pub fn touch(&mut self, now: u64) {
        self.last_accessed = now;
        self.access_count += 1;
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    Utc::now().timestamp_millis().max(0) as u64
}

/// Approximate stored size of a value: the length of its JSON encoding.
pub fn estimate_size(value: &Value) -> u64 {
    serde_json::to_vec(value)
        .map(|bytes| bytes.len() as u64)
        .unwrap_or(0)
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::thread::sleep;
    use std::time::Duration;

    #[test]
    fn test_entry_creation() {
        let entry = CacheEntry::new("k", "docs", json!("SUMMARY"), 60);

        assert_eq!(entry.value, json!("SUMMARY"));
        assert_eq!(entry.size_bytes, 9);
        assert_eq!(entry.access_count, 0);
        assert_eq!(entry.created_at, entry.last_accessed);
        assert_eq!(entry.validation, Validation::None);
        assert!(!entry.is_expired());
    }

    #[test]
    fn test_entry_expiration() {
        let entry = CacheEntry::new("k", "docs", json!("v"), 1);

        assert!(!entry.is_expired());
        sleep(Duration::from_millis(1100));
        assert!(entry.is_expired());
        assert_eq!(entry.ttl_remaining_ms(), 0);
    }

    #[test]
    fn test_expiration_boundary_condition() {
        let mut entry = CacheEntry::new("k", "docs", json!("v"), 1);
        entry.created_at = 10_000;

        assert!(!entry.is_expired_at(11_000), "age equal to ttl is still live");
        assert!(entry.is_expired_at(11_001));
    }

    #[test]
    fn test_zero_ttl_expires_after_any_age() {
        let mut entry = CacheEntry::new("k", "docs", json!("v"), 0);
        entry.created_at = 500;

        assert!(!entry.is_expired_at(500));
        assert!(entry.is_expired_at(501));
    }

    #[test]
    fn test_ttl_remaining_ms() {
        let entry = CacheEntry::new("k", "docs", json!("v"), 10);

        let remaining = entry.ttl_remaining_ms();
        assert!(remaining <= 10_000);
        assert!(remaining >= 9_000);
    }

    #[test]
    fn test_touch_updates_access() {
        let mut entry = CacheEntry::new("k", "docs", json!("v"), 10);
        entry.touch(entry.created_at + 5);
        entry.touch(entry.created_at + 9);

        assert_eq!(entry.access_count, 2);
        assert_eq!(entry.last_accessed, entry.created_at + 9);
    }

    #[test]
    fn test_depends_on() {
        let entry = CacheEntry::new("k", "docs", json!("v"), 10)
            .with_dependencies(vec!["config.yaml".to_string()]);

        assert!(entry.depends_on("config.yaml"));
        assert!(!entry.depends_on("other.yaml"));
    }

    #[test]
    fn test_validation_serialization_tag() {
        let validation = Validation::Revision {
            revision: "abc123".to_string(),
        };
        let json = serde_json::to_value(&validation).unwrap();
        assert_eq!(json["kind"], "revision");
        assert_eq!(json["revision"], "abc123");
    }
}
