//! # Error Handling Module
//!
//! Application-level errors for the product API. Each variant maps to an HTTP status code
//! and a JSON body of the shape the API has always returned:
//!
//! ```json
//! { "status": "fail", "message": "Validation Error", "errors": ["Product name is required"] }
//! ```
//!
//! Cache failures never show up here. The caching layer swallows its own errors (see
//! [`crate::caching::CacheError`]) so the only caller-visible errors are the ones raised by
//! resource handlers and by process bootstrap.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use thiserror::Error;

use crate::core::types::HandlerResponse;

/// Main result type used throughout the application
pub type AppResult<T> = Result<T, AppError>;

/// Application error taxonomy
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AppError {
    /// Configuration-related errors (invalid config, unreadable files, etc.)
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Request body or query failed validation
    #[error("Validation Error")]
    Validation { errors: Vec<String> },

    /// A path identifier could not be parsed
    #[error("Invalid {resource} ID format")]
    InvalidIdentifier { resource: String },

    /// The addressed resource does not exist
    #[error("{resource} not found")]
    NotFound { resource: String },

    /// Unexpected failure; `message` is safe to show, `detail` is not
    #[error("{message}")]
    Internal {
        message: String,
        detail: Option<String>,
    },

    /// I/O errors (file operations, socket binding, etc.)
    #[error("I/O error: {message}")]
    Io { message: String },

    /// YAML parsing errors for configuration files
    #[error("YAML error: {message}")]
    Yaml { message: String },
}

impl AppError {
    /// Create a configuration error with a custom message
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a validation error from a list of messages
    pub fn validation<I, S>(errors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Validation {
            errors: errors.into_iter().map(Into::into).collect(),
        }
    }

    /// Create an invalid identifier error for the named resource
    pub fn invalid_id<S: Into<String>>(resource: S) -> Self {
        Self::InvalidIdentifier {
            resource: resource.into(),
        }
    }

    /// Create a not found error for the named resource
    pub fn not_found<S: Into<String>>(resource: S) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Create an internal error with a public message and a private detail
    pub fn internal<S: Into<String>>(message: S, detail: impl ToString) -> Self {
        Self::Internal {
            message: message.into(),
            detail: Some(detail.to_string()),
        }
    }

    /// Get the appropriate HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::InvalidIdentifier { .. } => StatusCode::BAD_REQUEST,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Configuration { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Io { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Yaml { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// `"fail"` for client errors, `"error"` for server errors
    pub fn status_label(&self) -> &'static str {
        if self.status_code().is_client_error() {
            "fail"
        } else {
            "error"
        }
    }

    /// Build the JSON body for this error.
    ///
    /// `expose_details` adds the private `detail` of internal errors; it is switched off in
    /// production.
    pub fn to_body(&self, expose_details: bool) -> Value {
        let mut body = json!({
            "status": self.status_label(),
            "message": self.to_string(),
        });

        match self {
            Self::Validation { errors } => {
                body["errors"] = json!(errors);
            }
            Self::Internal {
                detail: Some(detail),
                ..
            } if expose_details => {
                body["error"] = json!(detail);
            }
            _ => {}
        }

        body
    }

    /// Convert into the logical handler result consumed by the caching layer
    pub fn to_handler_response(&self, expose_details: bool) -> HandlerResponse {
        HandlerResponse::new(self.status_code(), self.to_body(expose_details))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: err.to_string(),
        }
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Yaml {
            message: err.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self.to_body(false))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(
            AppError::validation(["Product name is required"]).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::not_found("Product").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::invalid_id("product").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::internal("Failed to fetch products", "boom").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_messages_match_api_contract() {
        assert_eq!(AppError::not_found("Product").to_string(), "Product not found");
        assert_eq!(
            AppError::invalid_id("product").to_string(),
            "Invalid product ID format"
        );
    }

    #[test]
    fn test_validation_body_lists_errors() {
        let body = AppError::validation(["a", "b"]).to_body(false);
        assert_eq!(body["status"], "fail");
        assert_eq!(body["message"], "Validation Error");
        assert_eq!(body["errors"], json!(["a", "b"]));
    }

    #[test]
    fn test_internal_detail_hidden_unless_exposed() {
        let err = AppError::internal("Failed to delete product", "disk on fire");

        let hidden = err.to_body(false);
        assert_eq!(hidden["status"], "error");
        assert!(hidden.get("error").is_none());

        let exposed = err.to_body(true);
        assert_eq!(exposed["error"], "disk on fire");
    }
}
