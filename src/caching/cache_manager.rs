//! # Cache Manager
//!
//! The soft-failure adapter every other part of the system talks to. It wraps a raw
//! [`CacheStore`] and guarantees that no cache problem ever reaches a caller:
//!
//! | operation              | backend unavailable | backend error / timeout |
//! |------------------------|---------------------|-------------------------|
//! | `get`                  | `None`              | `None` (miss)           |
//! | `set_with_ttl`         | `true` (no-op)      | `false`                 |
//! | `delete_keys_matching` | `0`                 | keys deleted so far     |
//!
//! Every backend call is bounded by the configured operation timeout.

use super::middleware::CacheOutcome;
use super::stores::CacheStore;
use super::{CacheError, CacheResult};
use crate::observability::metrics::{
    CACHE_BACKEND_AVAILABLE, CACHE_BYPASS_TOTAL, CACHE_ERRORS_TOTAL, CACHE_HITS_TOTAL,
    CACHE_INVALIDATED_KEYS_TOTAL, CACHE_MISSES_TOTAL, CACHE_STORES_TOTAL,
};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Snapshot of cache activity since startup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStats {
    /// Backend name (`redis`, `memory`, `null`)
    pub backend: String,

    /// Whether the backend connection is live right now
    pub available: bool,

    /// Requests answered from the cache
    pub hits: u64,

    /// Requests that ran the handler after a lookup
    pub misses: u64,

    /// Requests that skipped the cache entirely
    pub bypasses: u64,

    /// hits / (hits + misses)
    pub hit_ratio: f64,

    /// Successful writes
    pub stores: u64,

    /// Invalidation patterns processed
    pub invalidations: u64,

    /// Keys removed by invalidation
    pub invalidated_keys: u64,

    /// Backend errors swallowed
    pub errors: u64,

    /// Statistics collection start time
    pub start_time: DateTime<Utc>,
}

/// Availability-gated, error-swallowing adapter over a cache store
pub struct CacheManager {
    store: Arc<dyn CacheStore>,
    operation_timeout: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
    bypasses: AtomicU64,
    stores: AtomicU64,
    invalidations: AtomicU64,
    invalidated_keys: AtomicU64,
    errors: AtomicU64,
    start_time: DateTime<Utc>,
}

impl CacheManager {
    /// Create a new cache manager
    pub fn new(store: Arc<dyn CacheStore>, operation_timeout: Duration) -> Self {
        Self {
            store,
            operation_timeout,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            bypasses: AtomicU64::new(0),
            stores: AtomicU64::new(0),
            invalidations: AtomicU64::new(0),
            invalidated_keys: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            start_time: Utc::now(),
        }
    }

    /// Whether cache operations will reach the backend
    pub fn is_available(&self) -> bool {
        let available = self.store.is_available();
        metrics::gauge!(CACHE_BACKEND_AVAILABLE).set(if available { 1.0 } else { 0.0 });
        available
    }

    /// Backend name
    pub fn backend(&self) -> &'static str {
        self.store.name()
    }

    /// Look up a payload. Unavailability and failures read as a miss.
    pub async fn get(&self, key: &str) -> Option<Vec<u8>> {
        if !self.is_available() {
            return None;
        }

        self.guarded("get", self.store.get(key)).await.ok().flatten()
    }

    /// Store a payload with a TTL.
    ///
    /// Returns `true` when stored, or when the backend is unavailable and the write was
    /// skipped. A zero TTL is rejected since it would either persist forever or expire at once.
    pub async fn set_with_ttl(&self, key: &str, payload: &[u8], ttl: Duration) -> bool {
        if !self.is_available() {
            debug!(key = %key, "Cache unavailable, skipping store");
            return true;
        }

        if ttl.as_secs() == 0 {
            warn!(key = %key, ttl = ?ttl, "Refusing to cache with a sub-second TTL");
            return false;
        }

        match self.guarded("set", self.store.set(key, payload, ttl)).await {
            Ok(()) => {
                self.stores.fetch_add(1, Ordering::Relaxed);
                metrics::counter!(CACHE_STORES_TOTAL).increment(1);
                debug!(key = %key, ttl_seconds = ttl.as_secs(), "Cached response");
                true
            }
            Err(_) => false,
        }
    }

    /// Delete every key matching a Redis-style glob.
    ///
    /// Individual delete failures do not stop the batch. Returns the number of keys actually
    /// removed.
    pub async fn delete_keys_matching(&self, pattern: &str) -> usize {
        if !self.is_available() {
            debug!(pattern = %pattern, "Cache unavailable, skipping invalidation");
            return 0;
        }

        self.invalidations.fetch_add(1, Ordering::Relaxed);

        let keys = match self.guarded("scan", self.store.keys_matching(pattern)).await {
            Ok(keys) => keys,
            Err(_) => return 0,
        };

        let results = join_all(
            keys.iter()
                .map(|key| self.guarded("delete", self.store.delete(key))),
        )
        .await;

        let removed = results
            .into_iter()
            .filter(|result| matches!(result, Ok(true)))
            .count();

        self.invalidated_keys
            .fetch_add(removed as u64, Ordering::Relaxed);
        metrics::counter!(CACHE_INVALIDATED_KEYS_TOTAL).increment(removed as u64);
        debug!(pattern = %pattern, matched = keys.len(), removed, "Deleted cache keys");
        removed
    }

    /// Count a read-through outcome
    pub fn record(&self, outcome: CacheOutcome) {
        match outcome {
            CacheOutcome::Hit => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                metrics::counter!(CACHE_HITS_TOTAL).increment(1);
            }
            CacheOutcome::Miss => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                metrics::counter!(CACHE_MISSES_TOTAL).increment(1);
            }
            CacheOutcome::Bypass => {
                self.bypasses.fetch_add(1, Ordering::Relaxed);
                metrics::counter!(CACHE_BYPASS_TOTAL).increment(1);
            }
        }
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let lookups = hits + misses;

        CacheStats {
            backend: self.backend().to_string(),
            available: self.is_available(),
            hits,
            misses,
            bypasses: self.bypasses.load(Ordering::Relaxed),
            hit_ratio: if lookups > 0 {
                hits as f64 / lookups as f64
            } else {
                0.0
            },
            stores: self.stores.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
            invalidated_keys: self.invalidated_keys.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            start_time: self.start_time,
        }
    }

    async fn guarded<T, F>(&self, op: &'static str, operation: F) -> CacheResult<T>
    where
        F: Future<Output = CacheResult<T>>,
    {
        let result = match timeout(self.operation_timeout, operation).await {
            Ok(result) => result,
            Err(_) => Err(CacheError::Timeout),
        };

        if let Err(e) = &result {
            self.errors.fetch_add(1, Ordering::Relaxed);
            metrics::counter!(CACHE_ERRORS_TOTAL, "op" => op).increment(1);
            warn!(op, kind = e.kind(), error = %e, "Cache operation failed");
        }
        result
    }
}
