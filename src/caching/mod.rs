//! # Caching System Module
//!
//! A read-through (cache-aside) layer that sits in front of the product resource handlers.
//!
//! ## Architecture
//! 1. **Key Generator**: turns `{method, path, query}` into a namespaced cache key and builds
//!    the glob patterns used for invalidation
//! 2. **Cache Stores**: raw backends (Redis, in-memory, null) behind the [`CacheStore`] trait
//! 3. **Cache Manager**: soft-failure adapter over a store. It gates every call on backend
//!    availability, bounds it with a timeout and swallows errors
//! 4. **Read-Through Middleware**: decorator around a [`ResourceHandler`] that serves hits and
//!    captures successful misses
//! 5. **Invalidation**: pattern deletes triggered by writes after they commit
//! 6. **Admin Interface**: `/cache/stats` and manual invalidation
//!
//! ## Usage Example
//! ```rust,ignore
//! let store = stores::build_store(&config.cache).await?;
//! let cache = Arc::new(CacheManager::new(store, config.cache.operation_timeout));
//! let keys = Arc::new(KeyGenerator::new("api", KeyGenerationStrategy::Verbatim));
//!
//! let cached = ReadThrough::new(handler, cache.clone(), keys.clone(), CachePolicy::default());
//! let (outcome, response) = cached.execute(request).await;
//! ```

pub mod admin;
pub mod cache_manager;
pub mod invalidation;
pub mod key_generator;
pub mod middleware;
pub mod stores;

pub use admin::{CacheAdminRouter, CacheAdminState};
pub use cache_manager::{CacheManager, CacheStats};
pub use invalidation::{InvalidationEvent, InvalidationManager, InvalidationScope};
pub use key_generator::{CacheKey, KeyGenerationStrategy, KeyGenerator};
pub use middleware::{CacheOutcome, CachePolicy, ReadThrough, ResourceHandler};
pub use stores::{CacheEntry, CacheStore, InMemoryCache, NullCache, RedisCache};

use crate::core::error::AppError;

/// Cache operation result
pub type CacheResult<T> = Result<T, CacheError>;

/// Cache-specific error types.
///
/// None of these reach an API caller: [`CacheManager`] logs them and degrades to a miss or a
/// no-op.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Cache store error: {message}")]
    Store { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Invalid cache pattern: {message}")]
    Pattern { message: String },

    #[error("Cache operation timeout")]
    Timeout,

    #[error("Cache not available")]
    Unavailable,
}

impl CacheError {
    /// Short label used for the `op` dimension of error metrics and logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Store { .. } => "store",
            Self::Serialization(_) => "serialization",
            Self::Redis(_) => "redis",
            Self::Pattern { .. } => "pattern",
            Self::Timeout => "timeout",
            Self::Unavailable => "unavailable",
        }
    }
}

impl From<CacheError> for AppError {
    fn from(err: CacheError) -> Self {
        AppError::config(format!("Cache error: {}", err))
    }
}
