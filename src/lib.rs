//! # Product Cache API - Core Library Crate
//!
//! A product resource API with a Redis read-through cache in front of its document store.
//! Reads are answered from the cache when possible; writes invalidate the affected entries
//! after they commit. When Redis is unreachable the cache steps aside and every request goes
//! straight to the store.
//!
//! ## Module Layout
//! - `core`: configuration, error taxonomy and the request/response types shared by all layers
//! - `caching`: key derivation, cache backends, the soft-failure cache manager, the
//!   read-through decorator and write-triggered invalidation
//! - `products`: product model, validation, repository and handlers
//! - `gateway`: axum routing and the HTTP server
//! - `observability`: tracing subscriber setup and Prometheus metrics

/// Configuration, errors and shared request/response types
pub mod core;

/// Read-through response cache and invalidation
pub mod caching;

/// The product resource
pub mod products;

/// HTTP routing and server
pub mod gateway;

/// Logging and metrics
pub mod observability;

pub use crate::core::config::AppConfig;
pub use crate::core::error::{AppError, AppResult};
pub use crate::core::types::{HandlerResponse, ResourceRequest};
pub use gateway::{build_router, AppServer, AppState};
