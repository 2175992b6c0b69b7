//! # Core Types Module
//!
//! The request and response shapes exchanged between the HTTP layer, the read-through
//! interceptor and the resource handlers. Handlers return a logical [`HandlerResponse`]
//! (status + JSON body) instead of writing to a transport object, which lets the caching
//! layer inspect and store the result directly.

use axum::http::{HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;

use uuid::Uuid;

/// A request addressed to a resource handler
#[derive(Debug, Clone)]
pub struct ResourceRequest {
    /// Unique identifier for this request (for tracing and logging)
    pub id: String,

    /// HTTP method
    pub method: Method,

    /// Request URI including path and query string
    pub uri: Uri,

    /// Parameters captured from the route pattern (e.g. `id`, `category`)
    pub path_params: HashMap<String, String>,

    /// Parsed JSON body, for write requests
    pub body: Option<Value>,
}

impl ResourceRequest {
    /// Create a new request with a generated ID
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            method,
            uri,
            path_params: HashMap::new(),
            body: None,
        }
    }

    /// Attach a captured path parameter
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.path_params.insert(name.into(), value.into());
        self
    }

    /// Attach a JSON body
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Get the request path without query parameters
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// Get the raw query string
    pub fn query(&self) -> Option<&str> {
        self.uri.query()
    }

    /// Get a captured path parameter
    pub fn param(&self, name: &str) -> Option<&str> {
        self.path_params.get(name).map(String::as_str)
    }

    /// Decode the query string into name/value pairs; the last occurrence of a name wins
    pub fn query_params(&self) -> HashMap<String, String> {
        self.query()
            .map(|query| {
                url::form_urlencoded::parse(query.as_bytes())
                    .into_owned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Logical result of a resource handler
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerResponse {
    /// HTTP status code
    pub status: StatusCode,

    /// JSON response body
    pub body: Value,
}

impl HandlerResponse {
    /// Create a new response
    pub fn new(status: StatusCode, body: Value) -> Self {
        Self { status, body }
    }

    /// 200 with the given body
    pub fn ok(body: Value) -> Self {
        Self::new(StatusCode::OK, body)
    }

    /// 201 with the given body
    pub fn created(body: Value) -> Self {
        Self::new(StatusCode::CREATED, body)
    }

    /// Serialize any value into a JSON response
    pub fn json<T: Serialize>(status: StatusCode, data: &T) -> Result<Self, serde_json::Error> {
        Ok(Self::new(status, serde_json::to_value(data)?))
    }

    /// `{ "message": ... }` body with the given status
    pub fn message(status: StatusCode, message: impl Into<String>) -> Self {
        Self::new(status, json!({ "message": message.into() }))
    }

    /// Whether the status is in the 200..=299 range
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Convert into an HTTP response, adding extra headers
    pub fn into_response_with(self, headers: &[(&'static str, HeaderValue)]) -> Response {
        let mut response = (self.status, Json(self.body)).into_response();
        for (name, value) in headers {
            response.headers_mut().insert(*name, value.clone());
        }
        response
    }
}

impl IntoResponse for HandlerResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get(uri: &'static str) -> ResourceRequest {
        ResourceRequest::new(Method::GET, Uri::from_static(uri))
    }

    #[test]
    fn test_resource_request_parts() {
        let request = get("/products?category=tools&inStock=true")
            .with_param("id", "abc");

        assert_eq!(request.method, Method::GET);
        assert_eq!(request.path(), "/products");
        assert_eq!(request.query(), Some("category=tools&inStock=true"));
        assert_eq!(request.param("id"), Some("abc"));
        assert!(!request.id.is_empty());

        let params = request.query_params();
        assert_eq!(params.get("category").map(String::as_str), Some("tools"));
        assert_eq!(params.get("inStock").map(String::as_str), Some("true"));
    }

    #[test]
    fn test_query_params_are_decoded() {
        let request = get("/products?category=garden%20tools");
        assert_eq!(
            request.query_params().get("category").map(String::as_str),
            Some("garden tools")
        );
    }

    #[test]
    fn test_handler_response_success_range() {
        assert!(HandlerResponse::ok(json!([])).is_success());
        assert!(HandlerResponse::created(json!({})).is_success());
        assert!(!HandlerResponse::message(StatusCode::NOT_FOUND, "Product not found").is_success());
    }

    #[test]
    fn test_extra_headers_applied() {
        let response = HandlerResponse::ok(json!([]))
            .into_response_with(&[("x-cache", HeaderValue::from_static("HIT"))]);
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get("x-cache").unwrap(), "HIT");
    }
}
