//! # Metrics
//!
//! Cache metric names, the Prometheus recorder and the exposition route. Metrics are
//! recorded with the `metrics` facade macros at the call sites; without an installed
//! recorder they are no-ops.

use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::core::error::{AppError, AppResult};

pub const CACHE_HITS_TOTAL: &str = "cache_hits_total";
pub const CACHE_MISSES_TOTAL: &str = "cache_misses_total";
pub const CACHE_BYPASS_TOTAL: &str = "cache_bypass_total";
pub const CACHE_STORES_TOTAL: &str = "cache_stores_total";
pub const CACHE_INVALIDATED_KEYS_TOTAL: &str = "cache_invalidated_keys_total";
pub const CACHE_ERRORS_TOTAL: &str = "cache_errors_total";
pub const CACHE_BACKEND_AVAILABLE: &str = "cache_backend_available";

/// Install the global Prometheus recorder and register metric descriptions
pub fn install_recorder() -> AppResult<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| AppError::config(format!("Failed to install metrics recorder: {}", e)))?;

    describe_metrics();
    Ok(handle)
}

fn describe_metrics() {
    describe_counter!(CACHE_HITS_TOTAL, "Reads answered from the cache");
    describe_counter!(CACHE_MISSES_TOTAL, "Reads that looked up the cache and ran the handler");
    describe_counter!(CACHE_BYPASS_TOTAL, "Reads that skipped the cache");
    describe_counter!(CACHE_STORES_TOTAL, "Responses written to the cache");
    describe_counter!(CACHE_INVALIDATED_KEYS_TOTAL, "Cache keys removed by invalidation");
    describe_counter!(CACHE_ERRORS_TOTAL, "Cache backend failures, by operation");
    describe_gauge!(CACHE_BACKEND_AVAILABLE, "1 when the cache backend is reachable");
}

/// Router serving the Prometheus text format at `path`
pub fn metrics_router(handle: PrometheusHandle, path: &str) -> Router {
    Router::new().route(path, get(move || std::future::ready(handle.render())))
}
