//! # Structured Logging
//!
//! Installs the global `tracing` subscriber. `RUST_LOG` takes precedence over the configured
//! level; output is JSON or human-readable text.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::core::config::LoggingConfig;
use crate::core::error::{AppError, AppResult};

/// Filter used when neither `RUST_LOG` nor the configured level parses
const FALLBACK_FILTER: &str = "info";

/// Build the env filter from `RUST_LOG` or the configured level
pub fn env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directives(&config.level)))
        .unwrap_or_else(|_| EnvFilter::new(FALLBACK_FILTER))
}

/// Crate and HTTP trace output at the configured level
fn default_directives(level: &str) -> String {
    format!("product_cache_api={level},tower_http={level},{level}")
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init(config: &LoggingConfig) -> AppResult<()> {
    let filter = env_filter(config);

    let result = if config.format.eq_ignore_ascii_case("json") {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_target(true).with_current_span(true))
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .try_init()
    };

    result.map_err(|e| AppError::config(format!("Failed to initialize logging: {}", e)))
}
