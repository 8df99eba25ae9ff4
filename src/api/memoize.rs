//! Memoization helpers
//!
//! Wrap a computation so its result is served from the cache when a fresh
//! entry exists and stored after it runs otherwise. Cache problems never
//! fail the computation: they are logged and the call proceeds uncached.

use std::future::Future;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::models::{CallInputs, PutOptions};

use super::OutputCache;

impl OutputCache {
    /// Returns the cached result of `inputs` in `namespace`, or runs
    /// `compute`, caches its `Ok` value and returns it.
    ///
    /// Errors from `compute` are returned untouched and never cached.
    pub fn get_or_compute<T, E, F>(
        &self,
        namespace: &str,
        inputs: &CallInputs,
        options: PutOptions,
        compute: F,
    ) -> std::result::Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> std::result::Result<T, E>,
    {
        if let Some(cached) = self.lookup(namespace, inputs) {
            return Ok(cached);
        }
        let value = compute()?;
        self.store_computed(namespace, inputs, &value, options);
        Ok(value)
    }

    /// Async form of [`OutputCache::get_or_compute`]. The store lock is
    /// never held while `compute` runs.
    pub async fn get_or_compute_async<T, E, F, Fut>(
        &self,
        namespace: &str,
        inputs: &CallInputs,
        options: PutOptions,
        compute: F,
    ) -> std::result::Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        if let Some(cached) = self.lookup(namespace, inputs) {
            return Ok(cached);
        }
        let value = compute().await?;
        self.store_computed(namespace, inputs, &value, options);
        Ok(value)
    }

    fn lookup<T: DeserializeOwned>(&self, namespace: &str, inputs: &CallInputs) -> Option<T> {
        match self.get_as(namespace, inputs) {
            Ok(cached) => cached,
            Err(e) => {
                warn!("Bypassing cache: {}", e);
                None
            }
        }
    }

    fn store_computed<T: Serialize>(
        &self,
        namespace: &str,
        inputs: &CallInputs,
        value: &T,
        options: PutOptions,
    ) {
        let value = match serde_json::to_value(value) {
            Ok(value) => value,
            Err(e) => {
                warn!("Result for '{}' is not serializable: {}", namespace, e);
                return;
            }
        };
        match self.put(namespace, inputs, value, options) {
            Ok(outcome) => {
                if let Some(reason) = outcome.rejection() {
                    debug!("Result for '{}' not cached: {}", namespace, reason);
                }
            }
            Err(e) => warn!("Bypassing cache: {}", e),
        }
    }
}
