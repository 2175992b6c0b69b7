//! # Cache Stores Module
//!
//! Backend implementations behind the [`CacheStore`] trait: Redis for production, an
//! in-memory map for local runs and tests, and a null store used when caching is switched
//! off. Stores are allowed to fail; the soft-failure policy lives in
//! [`crate::caching::CacheManager`].

pub mod memory;
pub mod null;
pub mod redis_store;

pub use memory::InMemoryCache;
pub use null::NullCache;
pub use redis_store::RedisCache;

use super::CacheResult;
use crate::core::config::{CacheBackendKind, CacheConfig};
use async_trait::async_trait;
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Stored form of a captured handler response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// HTTP status of the captured response (always 2xx)
    pub status: u16,

    /// JSON body of the captured response
    pub payload: Value,

    /// TTL the entry was stored with
    pub ttl_seconds: u64,

    /// When the entry was captured
    pub stored_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Create a new entry stamped with the current time
    pub fn new(status: StatusCode, payload: Value, ttl: Duration) -> Self {
        Self {
            status: status.as_u16(),
            payload,
            ttl_seconds: ttl.as_secs(),
            stored_at: Utc::now(),
        }
    }

    /// Serialize to the bytes written to the backend
    pub fn encode(&self) -> CacheResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Parse bytes read from the backend
    pub fn decode(bytes: &[u8]) -> CacheResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Stored status, falling back to 200 if the number is not a valid status code
    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status).unwrap_or(StatusCode::OK)
    }
}

/// Trait for cache store implementations
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Backend name for logs and stats
    fn name(&self) -> &'static str;

    /// Whether the backend connection is currently live
    fn is_available(&self) -> bool;

    /// Get a value from the cache
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>>;

    /// Set a value in the cache with TTL
    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> CacheResult<()>;

    /// Delete a value from the cache, returning whether it existed
    async fn delete(&self, key: &str) -> CacheResult<bool>;

    /// Enumerate keys matching a Redis-style glob pattern
    async fn keys_matching(&self, pattern: &str) -> CacheResult<Vec<String>>;
}

/// Build the backend selected by configuration.
///
/// A Redis backend that cannot connect yet is still returned: it starts unavailable and its
/// supervisor keeps reconnecting in the background. Disabling the cache yields a
/// [`NullCache`].
pub async fn build_store(config: &CacheConfig) -> CacheResult<Arc<dyn CacheStore>> {
    if !config.enabled {
        info!("Response caching disabled");
        return Ok(Arc::new(NullCache));
    }

    match config.backend {
        CacheBackendKind::Redis => {
            let redis = RedisCache::new(config.redis.clone())?;
            redis.connect().await;
            redis.spawn_supervisor();
            Ok(redis)
        }
        CacheBackendKind::Memory => {
            let memory = Arc::new(InMemoryCache::new());
            memory.spawn_cleanup(config.memory_cleanup_interval);
            info!("Using in-memory cache backend");
            Ok(memory)
        }
        CacheBackendKind::None => {
            info!("Cache backend set to none");
            Ok(Arc::new(NullCache))
        }
    }
}
