//! # Observability Module
//!
//! Structured logging setup and cache metrics.

pub mod logging;
pub mod metrics;
