//! # Read-Through Cache Integration Tests
//!
//! Exercises the caching layer through its public API: the read-through decorator over a
//! counting handler, write-triggered invalidation, soft failure when the backend misbehaves,
//! and (ignored by default) the same flow against a live Redis.

use async_trait::async_trait;
use axum::http::{Method, StatusCode, Uri};
use product_cache_api::caching::{
    CacheError, CacheManager, CacheOutcome, CachePolicy, CacheResult, CacheStore,
    InMemoryCache, InvalidationManager, KeyGenerationStrategy, KeyGenerator, ReadThrough,
    RedisCache, ResourceHandler,
};
use product_cache_api::core::config::RedisConfig;
use product_cache_api::{HandlerResponse, ResourceRequest};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Echoes the request path and counts invocations
#[derive(Default)]
struct CountingHandler {
    calls: AtomicUsize,
}

impl CountingHandler {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ResourceHandler for CountingHandler {
    async fn handle(&self, request: ResourceRequest) -> HandlerResponse {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if request.path().ends_with("/missing") {
            return HandlerResponse::message(StatusCode::NOT_FOUND, "Product not found");
        }
        HandlerResponse::ok(json!({ "path": request.path(), "call": n }))
    }
}

/// Claims to be available but every operation fails
struct FlakyStore;

#[async_trait]
impl CacheStore for FlakyStore {
    fn name(&self) -> &'static str {
        "flaky"
    }

    fn is_available(&self) -> bool {
        true
    }

    async fn get(&self, _key: &str) -> CacheResult<Option<Vec<u8>>> {
        Err(CacheError::Timeout)
    }

    async fn set(&self, _key: &str, _value: &[u8], _ttl: Duration) -> CacheResult<()> {
        Err(CacheError::Timeout)
    }

    async fn delete(&self, _key: &str) -> CacheResult<bool> {
        Err(CacheError::Timeout)
    }

    async fn keys_matching(&self, _pattern: &str) -> CacheResult<Vec<String>> {
        Err(CacheError::Timeout)
    }
}

struct Harness {
    handler: Arc<CountingHandler>,
    cache: Arc<CacheManager>,
    invalidation: InvalidationManager,
    route: ReadThrough<Arc<CountingHandler>>,
}

fn harness(store: Arc<dyn CacheStore>, strategy: KeyGenerationStrategy) -> Harness {
    let handler = Arc::new(CountingHandler::default());
    let cache = Arc::new(CacheManager::new(store, Duration::from_millis(500)));
    let keys = Arc::new(KeyGenerator::new("api", strategy));
    let invalidation = InvalidationManager::new(cache.clone(), keys.clone());
    let route = ReadThrough::new(
        handler.clone(),
        cache.clone(),
        keys,
        CachePolicy::with_ttl(Duration::from_secs(300)),
    );
    Harness {
        handler,
        cache,
        invalidation,
        route,
    }
}

fn get(uri: &'static str) -> ResourceRequest {
    ResourceRequest::new(Method::GET, Uri::from_static(uri))
}

/// Repeat a read until it is served from the cache, tolerating the background store
async fn until_hit(route: &ReadThrough<Arc<CountingHandler>>, uri: &'static str) -> HandlerResponse {
    for _ in 0..200 {
        let (outcome, response) = route.execute(get(uri)).await;
        if outcome == CacheOutcome::Hit {
            return response;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("{} was never served from cache", uri);
}

#[tokio::test]
async fn test_hit_skips_handler() {
    let h = harness(Arc::new(InMemoryCache::new()), KeyGenerationStrategy::Verbatim);

    let (outcome, first) = h.route.execute(get("/products")).await;
    assert_eq!(outcome, CacheOutcome::Miss);

    let cached = until_hit(&h.route, "/products").await;
    assert_eq!(cached, first);

    let calls = h.handler.calls();
    for _ in 0..5 {
        let (outcome, response) = h.route.execute(get("/products")).await;
        assert_eq!(outcome, CacheOutcome::Hit);
        assert_eq!(response.body["call"], 1);
    }
    assert_eq!(h.handler.calls(), calls);
}

#[tokio::test]
async fn test_unavailable_backend_matches_no_cache() {
    let memory = Arc::new(InMemoryCache::new());
    memory.set_available(false);
    let h = harness(memory, KeyGenerationStrategy::Verbatim);
    let direct = CountingHandler::default();

    for _ in 0..3 {
        let (outcome, cached) = h.route.execute(get("/products/7")).await;
        let plain = direct.handle(get("/products/7")).await;
        assert_eq!(outcome, CacheOutcome::Bypass);
        assert_eq!(cached, plain);
    }
    assert_eq!(h.handler.calls(), 3);
    assert_eq!(h.cache.stats().bypasses, 3);
}

#[tokio::test]
async fn test_failing_backend_is_transparent() {
    let h = harness(Arc::new(FlakyStore), KeyGenerationStrategy::Verbatim);

    for expected_call in 1..=3 {
        let (outcome, response) = h.route.execute(get("/products")).await;
        assert_eq!(outcome, CacheOutcome::Miss);
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body["call"], expected_call);
    }

    assert_eq!(h.invalidation.on_created("/products").await, 0);
    assert!(h.cache.stats().errors >= 4);
}

#[tokio::test]
async fn test_invalidation_after_write_forces_miss() {
    let h = harness(Arc::new(InMemoryCache::new()), KeyGenerationStrategy::Verbatim);

    h.route.execute(get("/products/7")).await;
    h.route.execute(get("/products")).await;
    h.route.execute(get("/products?category=tools")).await;
    until_hit(&h.route, "/products/7").await;
    until_hit(&h.route, "/products").await;
    until_hit(&h.route, "/products?category=tools").await;

    let removed = h.invalidation.on_updated("/products", "7").await;
    assert_eq!(removed, 3);

    for uri in ["/products/7", "/products", "/products?category=tools"] {
        let (outcome, _) = h.route.execute(get(uri)).await;
        assert_eq!(outcome, CacheOutcome::Miss, "{} should miss after invalidation", uri);
    }
}

#[tokio::test]
async fn test_errors_are_not_cached() {
    let memory = Arc::new(InMemoryCache::new());
    let h = harness(memory.clone(), KeyGenerationStrategy::Verbatim);

    for _ in 0..3 {
        let (outcome, response) = h.route.execute(get("/products/missing")).await;
        assert_eq!(outcome, CacheOutcome::Miss);
        assert_eq!(response.status, StatusCode::NOT_FOUND);
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(h.handler.calls(), 3);
    assert!(memory.is_empty());
}

#[tokio::test]
async fn test_sorted_query_shares_entries() {
    let h = harness(Arc::new(InMemoryCache::new()), KeyGenerationStrategy::SortedQuery);

    h.route.execute(get("/products?category=tools&maxPrice=10")).await;
    until_hit(&h.route, "/products?maxPrice=10&category=tools").await;
    assert_eq!(h.handler.calls(), 1);
}

#[tokio::test]
async fn test_concurrent_misses_each_run_handler() {
    let h = Arc::new(harness(
        Arc::new(InMemoryCache::new()),
        KeyGenerationStrategy::Verbatim,
    ));

    let tasks: Vec<_> = (0..4)
        .map(|_| {
            let h = h.clone();
            tokio::spawn(async move { h.route.execute(get("/products")).await })
        })
        .collect();

    let mut served = 0;
    for task in tasks {
        let (_, response) = task.await.unwrap();
        assert_eq!(response.status, StatusCode::OK);
        served += 1;
    }
    assert_eq!(served, 4);
    assert!(h.handler.calls() >= 1 && h.handler.calls() <= 4);

    until_hit(&h.route, "/products").await;
}

#[tokio::test]
#[ignore] // Requires a Redis server at REDIS_URL
async fn test_read_through_against_redis() {
    let config = RedisConfig {
        url: std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string()),
        ..Default::default()
    };
    let redis = RedisCache::new(config).unwrap();
    assert!(redis.connect().await);

    let handler = Arc::new(CountingHandler::default());
    let cache = Arc::new(CacheManager::new(redis, Duration::from_secs(1)));
    let keys = Arc::new(KeyGenerator::new(
        "product-cache-it",
        KeyGenerationStrategy::Verbatim,
    ));
    let invalidation = InvalidationManager::new(cache.clone(), keys.clone());
    let route = ReadThrough::new(handler.clone(), cache, keys, CachePolicy::default());

    invalidation.invalidate("product-cache-it:*").await;

    let (outcome, _) = route.execute(get("/products")).await;
    assert_eq!(outcome, CacheOutcome::Miss);
    until_hit(&route, "/products").await;
    assert_eq!(handler.calls(), 1);

    assert_eq!(invalidation.on_created("/products").await, 1);
    let (outcome, _) = route.execute(get("/products")).await;
    assert_eq!(outcome, CacheOutcome::Miss);

    invalidation.invalidate("product-cache-it:*").await;
}
