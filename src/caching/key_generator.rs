//! # Cache Key Generator
//!
//! Derives cache keys from `{method, path, query}` and builds the glob patterns used to
//! invalidate them. Keys look like `api:/products?category=tools`. Headers and auth context
//! never take part, so identical requests from different callers share an entry.

use crate::core::types::ResourceRequest;
use axum::http::Method;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How the query string participates in the key
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyGenerationStrategy {
    /// Query string used exactly as received; `?a=1&b=2` and `?b=2&a=1` are distinct entries
    #[default]
    Verbatim,

    /// Query pairs sorted by name then value, so parameter order does not matter
    SortedQuery,
}

/// A derived cache key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Namespaced key and pattern builder
#[derive(Debug, Clone)]
pub struct KeyGenerator {
    namespace: String,
    strategy: KeyGenerationStrategy,
}

impl Default for KeyGenerator {
    fn default() -> Self {
        Self::new("api", KeyGenerationStrategy::Verbatim)
    }
}

impl KeyGenerator {
    /// Create a new key generator
    pub fn new(namespace: impl Into<String>, strategy: KeyGenerationStrategy) -> Self {
        Self {
            namespace: namespace.into(),
            strategy,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn strategy(&self) -> KeyGenerationStrategy {
        self.strategy
    }

    /// Whether `pattern` can only match keys inside this namespace
    pub fn owns_pattern(&self, pattern: &str) -> bool {
        pattern
            .strip_prefix(self.namespace.as_str())
            .is_some_and(|rest| rest.starts_with(':'))
    }

    /// Derive the key for a request.
    ///
    /// GET keys are `<ns>:<path>[?query]`. Any other method is prefixed with its name
    /// (`<ns>:POST /products`) so it can never collide with, or be matched as, a GET entry.
    pub fn derive_key(&self, method: &Method, path: &str, query: Option<&str>) -> CacheKey {
        let mut key = String::with_capacity(self.namespace.len() + path.len() + 16);
        key.push_str(&self.namespace);
        key.push(':');

        if method != Method::GET {
            key.push_str(method.as_str());
            key.push(' ');
        }
        key.push_str(path);

        if let Some(query) = query.filter(|q| !q.is_empty()) {
            key.push('?');
            match self.strategy {
                KeyGenerationStrategy::Verbatim => key.push_str(query),
                KeyGenerationStrategy::SortedQuery => key.push_str(&sorted_query(query)),
            }
        }

        CacheKey(key)
    }

    /// Derive the key for a resource request
    pub fn key_for(&self, request: &ResourceRequest) -> CacheKey {
        self.derive_key(&request.method, request.path(), request.query())
    }

    /// Pattern matching every cached read under a collection path, with or without a query
    /// or sub-path: `<ns>:/products*`
    pub fn collection_pattern(&self, collection_path: &str) -> String {
        format!("{}:{}*", self.namespace, escape_glob(collection_path))
    }

    /// Pattern matching exactly one cached resource: `<ns>:/products/<id>`
    pub fn resource_pattern(&self, collection_path: &str, id: &str) -> String {
        format!(
            "{}:{}/{}",
            self.namespace,
            escape_glob(collection_path.trim_end_matches('/')),
            escape_glob(id)
        )
    }
}

/// Escape Redis glob metacharacters so the text only matches itself
pub fn escape_glob(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn sorted_query(query: &str) -> String {
    let mut pairs: Vec<(&str, &str)> = query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| pair.split_once('=').unwrap_or((pair, "")))
        .collect();
    pairs.sort_unstable();

    pairs
        .iter()
        .map(|(name, value)| {
            if value.is_empty() {
                name.to_string()
            } else {
                format!("{}={}", name, value)
            }
        })
        .collect::<Vec<_>>()
        .join("&")
}
