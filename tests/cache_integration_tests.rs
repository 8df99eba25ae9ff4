//! Integration Tests for the Cache Handle
//!
//! Drives the public API end to end: validity strategies, byte budgets,
//! invalidation, persistence, memoization and the background sweeper.

use std::fs;
use std::sync::Arc;
use std::thread::sleep;
use std::time::Duration;

use call_cache::validity::{RepositoryRevisionStrategy, RevisionSource};
use call_cache::{
    spawn_sweeper, CacheConfig, CacheError, CallInputs, NamespaceConfig, OutputCache,
    PutOptions, PutOutcome, StrategyKind,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tempfile::TempDir;

// == Helper Functions ==

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn cache_with(namespace: &str, config: NamespaceConfig) -> OutputCache {
    init_tracing();
    OutputCache::new(CacheConfig::default().with_namespace(namespace, config))
}

/// A JSON string value whose encoding is exactly `size` bytes
fn sized(size: usize) -> Value {
    json!("x".repeat(size - 2))
}

// == Validity Strategies ==

#[test]
fn test_content_hash_detects_modified_dependency() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("file.txt");
    fs::write(&file, "v1").unwrap();
    let file = file.to_string_lossy().into_owned();

    let cache = cache_with(
        "docs",
        NamespaceConfig::new(StrategyKind::ContentHash).with_ttl(3600),
    );
    let inputs = CallInputs::new(["summarize", file.as_str()]);

    let outcome = cache
        .put(
            "docs",
            &inputs,
            json!("SUMMARY"),
            PutOptions::new().depends_on([file.clone()]),
        )
        .unwrap();
    assert!(outcome.is_stored());
    assert_eq!(cache.get("docs", &inputs).unwrap(), Some(json!("SUMMARY")));

    fs::write(&file, "v2").unwrap();

    assert_eq!(cache.get("docs", &inputs).unwrap(), None);
    let stats = cache.stats(Some("docs"));
    assert_eq!(stats.validation_failures, 1);
    assert_eq!(stats.entries_count, 0);
}

#[test]
fn test_exact_match_expires_after_ttl() {
    let cache = cache_with(
        "reviews",
        NamespaceConfig::new(StrategyKind::ExactMatch).with_ttl(1),
    );
    let inputs = CallInputs::new(["review", "diff-1"]);

    cache
        .put("reviews", &inputs, json!("LGTM"), PutOptions::default())
        .unwrap();
    assert_eq!(cache.get("reviews", &inputs).unwrap(), Some(json!("LGTM")));

    sleep(Duration::from_secs(2));

    assert_eq!(cache.get("reviews", &inputs).unwrap(), None);
    assert_eq!(cache.stats(Some("reviews")).expirations, 1);
}

#[test]
fn test_semantic_match_ignores_ids_and_timestamps() {
    let cache = cache_with("specs", NamespaceConfig::new(StrategyKind::SemanticMatch));

    cache
        .put(
            "specs",
            &CallInputs::new(["Create spec for TASK-123-001 at 2025-01-01T10:00:00"]),
            json!("RESULT"),
            PutOptions::default(),
        )
        .unwrap();

    let hit = cache
        .get(
            "specs",
            &CallInputs::new(["Create spec for TASK-456-002 at 2025-01-02T15:30:00"]),
        )
        .unwrap();
    assert_eq!(hit, Some(json!("RESULT")));

    let miss = cache
        .get("specs", &CallInputs::new(["Delete spec for TASK-456-002"]))
        .unwrap();
    assert_eq!(miss, None);
}

#[test]
fn test_context_aware_separates_contexts() {
    let cache = cache_with("agents", NamespaceConfig::new(StrategyKind::ContextAware));
    let base = CallInputs::new(["plan the release"]);
    let staging = base.clone().with_context("env", "staging");
    let production = base.clone().with_context("env", "production");

    cache
        .put("agents", &staging, json!("plan A"), PutOptions::default())
        .unwrap();

    assert_eq!(cache.get("agents", &staging).unwrap(), Some(json!("plan A")));
    assert_eq!(cache.get("agents", &production).unwrap(), None);
    assert_eq!(cache.get("agents", &base).unwrap(), None);
}

#[derive(Debug, Clone)]
struct SharedRevision(Arc<Mutex<String>>);

impl RevisionSource for SharedRevision {
    fn current_revision(&self) -> call_cache::Result<String> {
        Ok(self.0.lock().clone())
    }
}

#[test]
fn test_custom_revision_source() {
    init_tracing();
    let head = SharedRevision(Arc::new(Mutex::new("abc123".to_string())));
    let cache = OutputCache::builder(CacheConfig::default())
        .with_strategy("git", Arc::new(RepositoryRevisionStrategy::new(head.clone())))
        .build();
    let inputs = CallInputs::new(["git log"]);

    cache
        .put("git", &inputs, json!("history"), PutOptions::default())
        .unwrap();
    assert!(cache.get("git", &inputs).unwrap().is_some());

    *head.0.lock() = "def456".to_string();
    assert_eq!(cache.get("git", &inputs).unwrap(), None);
}

#[test]
fn test_never_cache_rejects_writes() {
    let cache = cache_with("shell", NamespaceConfig::new(StrategyKind::NeverCache));
    let inputs = CallInputs::new(["date"]);

    let outcome = cache
        .put("shell", &inputs, json!("Mon"), PutOptions::default())
        .unwrap();

    assert!(matches!(outcome, PutOutcome::Rejected(CacheError::NeverCache(_))));
    assert_eq!(cache.get("shell", &inputs).unwrap(), None);
    assert_eq!(cache.stats(Some("shell")).misses, 1);
}

// == Capacity ==

#[test]
fn test_namespace_byte_budget_evicts_oldest() {
    let cache = cache_with("docs", NamespaceConfig::default().with_max_bytes(1000));

    for i in 0..20 {
        cache
            .put(
                "docs",
                &CallInputs::new([format!("call {}", i)]),
                sized(100),
                PutOptions::default(),
            )
            .unwrap();
        assert!(cache.stats(Some("docs")).bytes_used <= 1000);
    }

    for i in 0..20 {
        let value = cache
            .get("docs", &CallInputs::new([format!("call {}", i)]))
            .unwrap();
        assert_eq!(value.is_some(), i >= 10, "entry {} survival", i);
    }
    assert_eq!(cache.stats(Some("docs")).evictions, 10);
}

#[test]
fn test_oversized_value_is_rejected() {
    let cache = cache_with("docs", NamespaceConfig::default().with_max_bytes(64));
    let outcome = cache
        .put("docs", &CallInputs::new(["big"]), sized(65), PutOptions::default())
        .unwrap();

    assert!(matches!(
        outcome.rejection(),
        Some(CacheError::Capacity { size: 65, budget: 64 })
    ));
    assert_eq!(cache.stats(Some("docs")).rejected, 1);
}

// == Invalidation ==

#[test]
fn test_invalidate_removes_only_dependents() {
    init_tracing();
    let cache = OutputCache::new(CacheConfig::default());

    for i in 0..3 {
        cache
            .put(
                "agents",
                &CallInputs::new([format!("with config {}", i)]),
                json!(i),
                PutOptions::new().depends_on(["config.yaml"]),
            )
            .unwrap();
    }
    for i in 0..2 {
        cache
            .put(
                "agents",
                &CallInputs::new([format!("without config {}", i)]),
                json!(i),
                PutOptions::new().depends_on(["other.yaml"]),
            )
            .unwrap();
    }

    let removed_count = cache.invalidate("config.yaml");

    assert_eq!(removed_count, 3);
    assert_eq!(cache.len(), 2);
    assert_eq!(cache.stats(Some("agents")).invalidations, 3);
}

#[test]
fn test_clear_namespace() {
    init_tracing();
    let cache = OutputCache::new(CacheConfig::default());
    let inputs = CallInputs::new(["q"]);
    cache.put("a", &inputs, json!(1), PutOptions::default()).unwrap();
    cache.put("b", &inputs, json!(2), PutOptions::default()).unwrap();

    assert_eq!(cache.clear(Some("a")), 1);
    assert_eq!(cache.get("a", &inputs).unwrap(), None);
    assert_eq!(cache.get("b", &inputs).unwrap(), Some(json!(2)));
    assert_eq!(cache.clear(None), 1);
    assert!(cache.is_empty());
}

// == Statistics ==

#[test]
fn test_cost_savings_accumulate_on_hits() {
    let cache = cache_with("llm", NamespaceConfig::default().with_cost_per_unit(0.002));
    let inputs = CallInputs::new(["explain lifetimes"]);

    cache
        .put(
            "llm",
            &inputs,
            json!("answer"),
            PutOptions::new().with_work_units(1500).with_metadata("model", "large"),
        )
        .unwrap();
    for _ in 0..4 {
        cache.get("llm", &inputs).unwrap();
    }

    let stats = cache.stats(None);
    assert_eq!(stats.hits, 4);
    assert_eq!(stats.work_units_saved, 6000);
    assert!((stats.cost_saved - 12.0).abs() < 1e-9);
    assert!((stats.namespaces["llm"].hit_rate - 1.0).abs() < 1e-9);
}

#[test]
fn test_invalid_namespace() {
    init_tracing();
    let cache = OutputCache::new(CacheConfig::default());
    let long = "n".repeat(129);

    for namespace in ["", "has space", "slash/name", long.as_str()] {
        assert!(matches!(
            cache.get(namespace, &CallInputs::new(["q"])),
            Err(CacheError::InvalidNamespace(_))
        ));
    }
    assert!(cache.stats(None).namespaces.is_empty());
}

// == Persistence ==

#[test]
fn test_persistence_round_trip() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let config = CacheConfig::default()
        .with_persistence_dir(dir.path())
        .with_namespace(
            "agent:reviewer",
            NamespaceConfig::new(StrategyKind::ExactMatch).persistent(),
        );
    let inputs = CallInputs::new(["review", "patch"]);

    let cache = OutputCache::new(config.clone());
    cache
        .put(
            "agent:reviewer",
            &inputs,
            json!({"verdict": "approve"}),
            PutOptions::default(),
        )
        .unwrap();
    assert_eq!(cache.flush(), 1);
    assert!(dir.path().join("agent%3Areviewer.cache.gz").exists());

    let reopened = OutputCache::open(config);
    assert_eq!(
        reopened.get("agent:reviewer", &inputs).unwrap(),
        Some(json!({"verdict": "approve"}))
    );
}

#[test]
fn test_corrupt_record_is_discarded() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("docs.cache.gz"), b"garbage").unwrap();
    let config = CacheConfig::default()
        .with_persistence_dir(dir.path())
        .with_namespace("docs", NamespaceConfig::default().persistent());

    let cache = OutputCache::open(config);

    assert!(cache.is_empty());
}

// == Memoization ==

#[test]
fn test_memoized_computation() {
    init_tracing();
    let cache = OutputCache::new(CacheConfig::default());
    let inputs = CallInputs::new(["tokenize", "lib.rs"]);
    let mut runs = 0;

    for _ in 0..3 {
        let tokens: Result<Vec<String>, std::io::Error> =
            cache.get_or_compute("tools", &inputs, PutOptions::default(), || {
                runs += 1;
                Ok(vec!["fn".to_string(), "main".to_string()])
            });
        assert_eq!(tokens.unwrap().len(), 2);
    }

    assert_eq!(runs, 1);
}

// == Sweeper ==

#[tokio::test]
async fn test_sweeper_lifecycle() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let config = CacheConfig::default()
        .with_persistence_dir(dir.path())
        .with_namespace("short", NamespaceConfig::default().with_ttl(1))
        .with_namespace("docs", NamespaceConfig::default().persistent());
    let cache = OutputCache::new(config.clone());
    let inputs = CallInputs::new(["q"]);
    cache.put("short", &inputs, json!(1), PutOptions::default()).unwrap();
    cache.put("docs", &inputs, json!(2), PutOptions::default()).unwrap();

    let sweeper = spawn_sweeper(cache.clone(), Duration::from_millis(200));
    tokio::time::sleep(Duration::from_millis(2500)).await;
    sweeper.stop().await;

    assert_eq!(cache.len(), 1);
    assert_eq!(cache.stats(Some("short")).expirations, 1);
    assert_eq!(OutputCache::open(config).len(), 1);
}
