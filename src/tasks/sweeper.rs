//! Sweeper Task
//!
//! Background task that periodically removes expired and stale entries and
//! writes persistent namespaces to disk. Stopping it runs one final flush.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::OutputCache;

/// Shortest interval the sweeper accepts
const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(10);

/// Handle to a running sweeper.
#[derive(Debug)]
pub struct SweeperHandle {
    shutdown: CancellationToken,
    handle: JoinHandle<()>,
}

impl SweeperHandle {
    /// Token that stops the sweeper when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Stops the sweeper and waits for its final flush.
    pub async fn stop(self) {
        self.shutdown.cancel();
        if let Err(e) = self.handle.await {
            warn!("Cache sweeper ended abnormally: {}", e);
        }
    }
}

/// Spawns a background task that sweeps `cache` every `interval`.
///
/// Each cycle removes expired and no-longer-valid entries, then flushes
/// persistent namespaces. Store work runs on the blocking pool since it may
/// touch the filesystem.
///
/// # Example
/// ```ignore
/// let cache = OutputCache::new(CacheConfig::from_env());
/// let sweeper = spawn_sweeper(cache.clone(), cache.sweep_interval());
/// // Later, during shutdown:
/// sweeper.stop().await;
/// ```
pub fn spawn_sweeper(cache: OutputCache, interval: Duration) -> SweeperHandle {
    let interval = interval.max(MIN_SWEEP_INTERVAL);
    let shutdown = CancellationToken::new();
    let token = shutdown.clone();

    let handle = tokio::spawn(async move {
        info!("Starting cache sweeper with interval of {:?}", interval);

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => run_cycle(&cache).await,
            }
        }

        flush(&cache).await;
        info!("Cache sweeper stopped");
    });

    SweeperHandle { shutdown, handle }
}

async fn run_cycle(cache: &OutputCache) {
    let sweeping = cache.clone();
    match tokio::task::spawn_blocking(move || sweeping.sweep()).await {
        Ok(report) => debug!("Sweep cycle removed {} entries", report.total()),
        Err(e) => warn!("Sweep cycle failed: {}", e),
    }
    flush(cache).await;
}

async fn flush(cache: &OutputCache) {
    let flushing = cache.clone();
    match tokio::task::spawn_blocking(move || flushing.flush()).await {
        Ok(written) if written > 0 => debug!("Flushed {} namespaces", written),
        Ok(_) => {}
        Err(e) => warn!("Flush failed: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CacheConfig, NamespaceConfig, StrategyKind};
    use crate::models::{CallInputs, PutOptions};
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_sweeper_removes_expired_entries() {
        let config = CacheConfig::default()
            .with_namespace("fast", NamespaceConfig::new(StrategyKind::TimeBased).with_ttl(1));
        let cache = OutputCache::new(config);
        cache
            .put("fast", &CallInputs::new(["q"]), json!("a"), PutOptions::default())
            .unwrap();

        let sweeper = spawn_sweeper(cache.clone(), Duration::from_millis(200));
        tokio::time::sleep(Duration::from_millis(2500)).await;

        assert!(cache.is_empty(), "expired entry should have been swept");
        assert_eq!(cache.stats(Some("fast")).expirations, 1);
        sweeper.stop().await;
    }

    #[tokio::test]
    async fn test_sweeper_preserves_valid_entries() {
        let cache = OutputCache::new(CacheConfig::default());
        let inputs = CallInputs::new(["q"]);
        cache
            .put("slow", &inputs, json!("a"), PutOptions::default())
            .unwrap();

        let sweeper = spawn_sweeper(cache.clone(), Duration::from_millis(100));
        tokio::time::sleep(Duration::from_millis(500)).await;

        assert_eq!(cache.get("slow", &inputs).unwrap(), Some(json!("a")));
        sweeper.stop().await;
    }

    #[tokio::test]
    async fn test_stop_flushes_persistent_namespaces() {
        let dir = TempDir::new().unwrap();
        let config = CacheConfig::default()
            .with_persistence_dir(dir.path())
            .with_namespace("docs", NamespaceConfig::default().persistent());
        let cache = OutputCache::new(config.clone());
        cache
            .put("docs", &CallInputs::new(["q"]), json!("a"), PutOptions::default())
            .unwrap();

        let sweeper = spawn_sweeper(cache, Duration::from_secs(3600));
        let token = sweeper.shutdown_token();
        sweeper.stop().await;

        assert!(token.is_cancelled());
        let reopened = OutputCache::open(config);
        assert_eq!(reopened.len(), 1);
    }

    #[tokio::test]
    async fn test_zero_interval_is_clamped() {
        let cache = OutputCache::new(CacheConfig::default());
        let sweeper = spawn_sweeper(cache, Duration::ZERO);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!sweeper.is_finished());
        sweeper.stop().await;
    }
}
