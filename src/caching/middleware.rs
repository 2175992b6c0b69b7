//! # Read-Through Middleware
//!
//! [`ReadThrough`] decorates a [`ResourceHandler`]. For an eligible request it looks the key
//! up first; a hit is answered from the cache without touching the handler, a miss runs the
//! handler and stores a 2xx result in the background. When the backend is unavailable the
//! decorator is transparent.

use super::stores::CacheEntry;
use super::{CacheKey, CacheManager, KeyGenerator};
use crate::core::types::{HandlerResponse, ResourceRequest};
use async_trait::async_trait;
use axum::http::{HeaderValue, Method};
use axum::response::Response;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Response header carrying the [`CacheOutcome`]
pub const CACHE_STATUS_HEADER: &str = "x-cache";

/// Anything that turns a resource request into a logical response
#[async_trait]
pub trait ResourceHandler: Send + Sync {
    async fn handle(&self, request: ResourceRequest) -> HandlerResponse;
}

#[async_trait]
impl<H> ResourceHandler for Arc<H>
where
    H: ResourceHandler + ?Sized,
{
    async fn handle(&self, request: ResourceRequest) -> HandlerResponse {
        (**self).handle(request).await
    }
}

/// Cache policy for one wrapped route
#[derive(Debug, Clone)]
pub struct CachePolicy {
    /// Enable caching for this policy
    pub enabled: bool,

    /// TTL of entries stored by this route
    pub ttl: Duration,

    /// HTTP methods eligible for caching
    pub cacheable_methods: Vec<Method>,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl: Duration::from_secs(300),
            cacheable_methods: vec![Method::GET],
        }
    }
}

impl CachePolicy {
    /// Default policy with a specific TTL
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            ..Self::default()
        }
    }

    /// Policy that never touches the cache
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}

/// How a request was served
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    /// Answered from the cache
    Hit,
    /// Looked up, not found, handler ran
    Miss,
    /// Cache skipped entirely
    Bypass,
}

impl CacheOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hit => "HIT",
            Self::Miss => "MISS",
            Self::Bypass => "BYPASS",
        }
    }
}

impl fmt::Display for CacheOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-through decorator around a resource handler
pub struct ReadThrough<H> {
    inner: H,
    cache: Arc<CacheManager>,
    keys: Arc<KeyGenerator>,
    policy: CachePolicy,
}

impl<H: ResourceHandler> ReadThrough<H> {
    /// Wrap a handler. The TTL is fixed here for every entry this route stores.
    pub fn new(
        inner: H,
        cache: Arc<CacheManager>,
        keys: Arc<KeyGenerator>,
        policy: CachePolicy,
    ) -> Self {
        Self {
            inner,
            cache,
            keys,
            policy,
        }
    }

    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }

    /// Serve a request, reporting how it was served
    pub async fn execute(&self, request: ResourceRequest) -> (CacheOutcome, HandlerResponse) {
        if !self.is_eligible(&request) || !self.cache.is_available() {
            self.cache.record(CacheOutcome::Bypass);
            debug!(request_id = %request.id, path = %request.path(), "Cache bypass");
            return (CacheOutcome::Bypass, self.inner.handle(request).await);
        }

        let key = self.keys.key_for(&request);

        if let Some(bytes) = self.cache.get(key.as_str()).await {
            match CacheEntry::decode(&bytes) {
                Ok(entry) if entry.status_code().is_success() => {
                    self.cache.record(CacheOutcome::Hit);
                    debug!(request_id = %request.id, key = %key, "Cache hit");
                    return (
                        CacheOutcome::Hit,
                        HandlerResponse::new(entry.status_code(), entry.payload),
                    );
                }
                Ok(entry) => {
                    warn!(key = %key, status = entry.status, "Ignoring cached non-success response");
                }
                Err(e) => {
                    warn!(key = %key, error = %e, "Ignoring unreadable cache entry");
                }
            }
        }

        self.cache.record(CacheOutcome::Miss);
        debug!(request_id = %request.id, key = %key, "Cache miss");

        let response = self.inner.handle(request).await;
        if response.is_success() {
            self.capture(key, &response);
        }

        (CacheOutcome::Miss, response)
    }

    /// Serve a request as an HTTP response carrying the `X-Cache` header
    pub async fn respond(&self, request: ResourceRequest) -> Response {
        let (outcome, response) = self.execute(request).await;
        response.into_response_with(&[(
            CACHE_STATUS_HEADER,
            HeaderValue::from_static(outcome.as_str()),
        )])
    }

    fn is_eligible(&self, request: &ResourceRequest) -> bool {
        self.policy.enabled && self.policy.cacheable_methods.contains(&request.method)
    }

    /// Store a successful result without holding up the response
    fn capture(&self, key: CacheKey, response: &HandlerResponse) {
        let entry = CacheEntry::new(response.status, response.body.clone(), self.policy.ttl);
        let bytes = match entry.encode() {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to serialize response for caching");
                return;
            }
        };

        let cache = self.cache.clone();
        let ttl = self.policy.ttl;
        tokio::spawn(async move {
            if !cache.set_with_ttl(key.as_str(), &bytes, ttl).await {
                debug!(key = %key, "Response not cached");
            }
        });
    }
}

#[async_trait]
impl<H: ResourceHandler> ResourceHandler for ReadThrough<H> {
    async fn handle(&self, request: ResourceRequest) -> HandlerResponse {
        self.execute(request).await.1
    }
}
