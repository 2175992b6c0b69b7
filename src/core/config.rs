//! # Configuration Module
//!
//! Configuration structures and loading for the product API and its cache layer.
//!
//! ## Key Features
//! - YAML configuration parsing with serde
//! - Human readable durations (`"15m"`, `"5s"`) via `humantime_serde`
//! - Environment variable overrides, including the conventional `PORT` and `REDIS_URL`
//! - Validation that reports every problem at once

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

use crate::caching::KeyGenerationStrategy;
use crate::core::error::{AppError, AppResult};

/// Default location of the configuration file
pub const DEFAULT_CONFIG_PATH: &str = "config/app.yaml";

/// Main application configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Server configuration (bind address, port, environment)
    pub server: ServerConfig,

    /// Read-through cache configuration
    pub cache: CacheConfig,

    /// Observability settings (logging, metrics)
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// Load configuration from the path in `APP_CONFIG_PATH`, or [`DEFAULT_CONFIG_PATH`].
    ///
    /// A missing file is not an error: defaults are used and environment overrides still
    /// apply.
    pub async fn load() -> AppResult<Self> {
        let path = std::env::var("APP_CONFIG_PATH")
            .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            Self::load_from_file(&path).await
        } else {
            let mut config = Self::default();
            config.apply_env_overrides()?;
            config.validate()?;
            Ok(config)
        }
    }

    /// Load configuration from a YAML file
    pub async fn load_from_file<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| AppError::config(format!("Failed to read config file: {}", e)))?;

        let mut config = Self::from_yaml(&content)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a YAML string without overrides or validation
    pub fn from_yaml(content: &str) -> AppResult<Self> {
        serde_yaml::from_str(content)
            .map_err(|e| AppError::config(format!("Failed to parse config: {}", e)))
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) -> AppResult<()> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable source.
    ///
    /// Recognised variables: `PORT`, `APP_SERVER_PORT`, `APP_SERVER_BIND_ADDRESS`,
    /// `APP_ENV` / `NODE_ENV`, `REDIS_URL`, `APP_CACHE_ENABLED`, `APP_CACHE_BACKEND`,
    /// `APP_CACHE_OPERATION_TIMEOUT`, `APP_LOG_LEVEL`, `APP_LOG_FORMAT`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> AppResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        for name in ["PORT", "APP_SERVER_PORT"] {
            if let Some(port) = lookup(name) {
                self.server.port = port
                    .parse()
                    .map_err(|e| AppError::config(format!("Invalid {}: {}", name, e)))?;
            }
        }

        if let Some(addr) = lookup("APP_SERVER_BIND_ADDRESS") {
            self.server.bind_address = addr;
        }

        if let Some(env) = lookup("APP_ENV").or_else(|| lookup("NODE_ENV")) {
            self.server.environment = env.parse()?;
        }

        if let Some(url) = lookup("REDIS_URL") {
            self.cache.redis.url = url;
        }

        if let Some(enabled) = lookup("APP_CACHE_ENABLED") {
            self.cache.enabled = enabled
                .parse()
                .map_err(|e| AppError::config(format!("Invalid APP_CACHE_ENABLED: {}", e)))?;
        }

        if let Some(backend) = lookup("APP_CACHE_BACKEND") {
            self.cache.backend = backend.parse()?;
        }

        if let Some(timeout) = lookup("APP_CACHE_OPERATION_TIMEOUT") {
            self.cache.operation_timeout = humantime::parse_duration(&timeout).map_err(|e| {
                AppError::config(format!("Invalid APP_CACHE_OPERATION_TIMEOUT: {}", e))
            })?;
        }

        if let Some(level) = lookup("APP_LOG_LEVEL") {
            self.observability.logging.level = level;
        }

        if let Some(format) = lookup("APP_LOG_FORMAT") {
            self.observability.logging.format = format;
        }

        Ok(())
    }

    /// Validate the configuration, collecting all problems into one error
    pub fn validate(&self) -> AppResult<()> {
        let mut errors = Vec::new();

        if self.server.bind_address.is_empty() {
            errors.push("bind_address cannot be empty".to_string());
        }

        if self.cache.key_namespace.is_empty() {
            errors.push("cache.key_namespace cannot be empty".to_string());
        }

        if self.cache.key_namespace.contains(['*', '?', '[', ']', '\\']) {
            errors.push(format!(
                "cache.key_namespace must not contain glob characters: {}",
                self.cache.key_namespace
            ));
        }

        if self.cache.operation_timeout.is_zero() {
            errors.push("cache.operation_timeout must be greater than 0".to_string());
        }

        for (route, ttl) in self.cache.routes.named() {
            if ttl.as_secs() == 0 {
                errors.push(format!(
                    "cache.routes.{} TTL must be at least one second",
                    route
                ));
            }
        }

        if self.cache.backend == CacheBackendKind::Redis {
            match Url::parse(&self.cache.redis.url) {
                Ok(url) if matches!(url.scheme(), "redis" | "rediss" | "unix" | "redis+unix") => {}
                Ok(url) => errors.push(format!("Unsupported Redis URL scheme: {}", url.scheme())),
                Err(e) => errors.push(format!("Invalid Redis URL: {}", e)),
            }

            if self.cache.redis.scan_count == 0 {
                errors.push("cache.redis.scan_count must be greater than 0".to_string());
            }
        }

        match self.observability.logging.format.to_lowercase().as_str() {
            "json" | "text" => {}
            _ => errors.push(format!(
                "Invalid log format: {}",
                self.observability.logging.format
            )),
        }

        if !self.observability.metrics.endpoint_path.starts_with('/') {
            errors.push("observability.metrics.endpoint_path must start with '/'".to_string());
        }

        if !errors.is_empty() {
            return Err(AppError::config(format!(
                "Configuration validation failed:\n{}",
                errors.join("\n")
            )));
        }

        Ok(())
    }
}

/// Deployment environment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Test,
    Production,
}

impl Environment {
    /// Whether error details may be exposed to API callers
    pub fn exposes_error_details(&self) -> bool {
        !matches!(self, Self::Production)
    }
}

impl std::str::FromStr for Environment {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "test" => Ok(Self::Test),
            "production" | "prod" => Ok(Self::Production),
            other => Err(AppError::config(format!("Unknown environment: {}", other))),
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server bind address
    pub bind_address: String,

    /// HTTP port
    pub port: u16,

    /// Deployment environment
    pub environment: Environment,

    /// Allow cross-origin requests from any origin
    pub cors_enabled: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 3000,
            environment: Environment::Development,
            cors_enabled: true,
        }
    }
}

/// Which cache backend to run against
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackendKind {
    #[default]
    Redis,
    Memory,
    None,
}

impl std::str::FromStr for CacheBackendKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "redis" => Ok(Self::Redis),
            "memory" => Ok(Self::Memory),
            "none" | "off" => Ok(Self::None),
            other => Err(AppError::config(format!("Unknown cache backend: {}", other))),
        }
    }
}

/// Read-through cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Master switch; when false every request bypasses the cache
    pub enabled: bool,

    /// Backend selection
    pub backend: CacheBackendKind,

    /// Prefix of every cache key (`<namespace>:<path>`)
    pub key_namespace: String,

    /// How query strings participate in cache keys
    pub key_strategy: KeyGenerationStrategy,

    /// Upper bound for a single backend call
    #[serde(with = "humantime_serde")]
    pub operation_timeout: Duration,

    /// Redis connection settings
    pub redis: RedisConfig,

    /// Per-route TTLs
    pub routes: RouteTtlConfig,

    /// Sweep interval for the in-memory backend
    #[serde(with = "humantime_serde")]
    pub memory_cleanup_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backend: CacheBackendKind::Redis,
            key_namespace: "api".to_string(),
            key_strategy: KeyGenerationStrategy::Verbatim,
            operation_timeout: Duration::from_secs(1),
            redis: RedisConfig::default(),
            routes: RouteTtlConfig::default(),
            memory_cleanup_interval: Duration::from_secs(60),
        }
    }
}

/// Redis connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    /// Redis connection URL
    pub url: String,

    /// Timeout for establishing a connection
    #[serde(with = "humantime_serde")]
    pub connection_timeout: Duration,

    /// How often the supervisor checks the connection and retries when it is down
    #[serde(with = "humantime_serde")]
    pub reconnect_interval: Duration,

    /// `COUNT` hint for `SCAN` during pattern invalidation
    pub scan_count: u32,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            connection_timeout: Duration::from_secs(5),
            reconnect_interval: Duration::from_secs(2),
            scan_count: 100,
        }
    }
}

/// TTLs of the cached product routes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteTtlConfig {
    /// `GET /products`
    #[serde(with = "humantime_serde")]
    pub list: Duration,

    /// `GET /products/category/:category`
    #[serde(with = "humantime_serde")]
    pub by_category: Duration,

    /// `GET /products/:id`
    #[serde(with = "humantime_serde")]
    pub by_id: Duration,
}

impl RouteTtlConfig {
    fn named(&self) -> [(&'static str, Duration); 3] {
        [
            ("list", self.list),
            ("by_category", self.by_category),
            ("by_id", self.by_id),
        ]
    }
}

impl Default for RouteTtlConfig {
    fn default() -> Self {
        Self {
            list: Duration::from_secs(15 * 60),
            by_category: Duration::from_secs(10 * 60),
            by_id: Duration::from_secs(5 * 60),
        }
    }
}

/// Observability configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Logging configuration
    pub logging: LoggingConfig,

    /// Metrics configuration
    pub metrics: MetricsConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,

    /// Log format (json, text)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

/// Metrics configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Install the Prometheus recorder and expose the endpoint
    pub enabled: bool,

    /// Metrics endpoint path
    pub endpoint_path: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint_path: "/metrics".to_string(),
        }
    }
}
