//! # Cache Invalidation Module
//!
//! Pattern-based invalidation run by writes after they commit. A create invalidates the
//! whole collection; an update or delete invalidates the item and then the collection, since
//! list and category responses embed the item too.
//!
//! Invalidation is best effort. Failures are logged by the cache manager and never turn a
//! successful write into an error. Each processed pattern is broadcast as an
//! [`InvalidationEvent`].

use super::{CacheManager, KeyGenerator};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info};

/// A completed invalidation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvalidationEvent {
    /// Glob pattern that was applied
    pub pattern: String,

    /// Number of keys removed
    pub removed: usize,

    /// When the invalidation finished
    pub at: DateTime<Utc>,
}

/// What a write touched
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidationScope {
    /// Every cached read under a collection path (`/products`)
    Collection { collection: String },

    /// One cached resource (`/products/<id>`)
    Resource { collection: String, id: String },
}

/// Cache invalidation manager
pub struct InvalidationManager {
    cache: Arc<CacheManager>,
    keys: Arc<KeyGenerator>,
    events: broadcast::Sender<InvalidationEvent>,
}

impl InvalidationManager {
    /// Create a new invalidation manager
    pub fn new(cache: Arc<CacheManager>, keys: Arc<KeyGenerator>) -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            cache,
            keys,
            events,
        }
    }

    /// Key generator the patterns are built with
    pub fn keys(&self) -> &KeyGenerator {
        &self.keys
    }

    /// Subscribe to invalidation events
    pub fn subscribe(&self) -> broadcast::Receiver<InvalidationEvent> {
        self.events.subscribe()
    }

    /// Delete every cache entry matching `pattern`, returning how many were removed
    pub async fn invalidate(&self, pattern: &str) -> usize {
        let removed = self.cache.delete_keys_matching(pattern).await;

        if removed > 0 {
            info!(pattern = %pattern, removed, "Invalidated cache entries");
        } else {
            debug!(pattern = %pattern, "No cache entries to invalidate");
        }

        // No subscribers is the normal case
        let _ = self.events.send(InvalidationEvent {
            pattern: pattern.to_string(),
            removed,
            at: Utc::now(),
        });

        removed
    }

    /// Pattern for a scope
    pub fn pattern_for(&self, scope: &InvalidationScope) -> String {
        match scope {
            InvalidationScope::Collection { collection } => {
                self.keys.collection_pattern(collection)
            }
            InvalidationScope::Resource { collection, id } => {
                self.keys.resource_pattern(collection, id)
            }
        }
    }

    /// Invalidate a list of scopes in order
    pub async fn invalidate_scopes(&self, scopes: &[InvalidationScope]) -> usize {
        let mut removed = 0;
        for scope in scopes {
            removed += self.invalidate(&self.pattern_for(scope)).await;
        }
        removed
    }

    /// A resource was created in `collection`
    pub async fn on_created(&self, collection: &str) -> usize {
        self.invalidate_scopes(&[InvalidationScope::Collection {
            collection: collection.to_string(),
        }])
        .await
    }

    /// Resource `id` in `collection` was updated
    pub async fn on_updated(&self, collection: &str, id: &str) -> usize {
        self.invalidate_scopes(&item_and_collection(collection, id))
            .await
    }

    /// Resource `id` in `collection` was deleted
    pub async fn on_deleted(&self, collection: &str, id: &str) -> usize {
        self.invalidate_scopes(&item_and_collection(collection, id))
            .await
    }
}

fn item_and_collection(collection: &str, id: &str) -> [InvalidationScope; 2] {
    [
        InvalidationScope::Resource {
            collection: collection.to_string(),
            id: id.to_string(),
        },
        InvalidationScope::Collection {
            collection: collection.to_string(),
        },
    ]
}
