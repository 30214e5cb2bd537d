//! Standardized error handling for the log aggregator
//! Provides the service error type and the JSON error envelope returned to clients

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use tracing::{error, info};

/// Error envelope returned by every failing endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Error types surfaced above the adapter boundary
///
/// Upstream feed failures never appear here: adapters absorb them into a
/// degraded outcome. What remains are client mistakes and genuine faults.
#[derive(Debug, thiserror::Error)]
pub enum SiemError {
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    #[error("Method not allowed: {method}")]
    MethodNotAllowed { method: String },

    #[error("Internal server error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },
}

impl SiemError {
    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
            source: None,
        }
    }

    /// Create a configuration error with source
    pub fn configuration_with_source<S: Into<String>>(message: S, source: anyhow::Error) -> Self {
        Self::Configuration {
            message: message.into(),
            source: Some(source),
        }
    }

    /// Create a method-not-allowed error
    pub fn method_not_allowed<S: Into<String>>(method: S) -> Self {
        Self::MethodNotAllowed {
            method: method.into(),
        }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Create an internal error with source
    pub fn internal_with_source<S: Into<String>>(message: S, source: anyhow::Error) -> Self {
        Self::Internal {
            message: message.into(),
            source: Some(source),
        }
    }

    /// Get the error code used in logs
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Configuration { .. } => "CONFIG_ERROR",
            Self::MethodNotAllowed { .. } => "METHOD_NOT_ALLOWED",
            Self::Internal { .. } => "INTERNAL_ERROR",
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Configuration { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Diagnostic text including the source chain, for development mode
    pub fn detailed_message(&self) -> String {
        let source = match self {
            Self::Configuration { source, .. } | Self::Internal { source, .. } => source.as_ref(),
            Self::MethodNotAllowed { .. } => None,
        };
        match source {
            Some(src) => format!("{}: {:#}", self, src),
            None => self.to_string(),
        }
    }

    /// Convert to ErrorResponse for API responses
    ///
    /// Server-side faults only carry diagnostic text when `expose_details`
    /// is set.
    pub fn to_error_response(&self, expose_details: bool) -> ErrorResponse {
        match self {
            Self::MethodNotAllowed { .. } => ErrorResponse {
                error: "Method not allowed".to_string(),
                message: None,
            },
            Self::Configuration { .. } | Self::Internal { .. } => ErrorResponse {
                error: "Failed to fetch logs".to_string(),
                message: Some(if expose_details {
                    self.detailed_message()
                } else {
                    "Internal server error".to_string()
                }),
            },
        }
    }
}

/// Result type alias for aggregator operations
pub type SiemResult<T> = std::result::Result<T, SiemError>;

/// A `SiemError` bound to the disclosure policy of the running environment
#[derive(Debug)]
pub struct ApiError {
    pub error: SiemError,
    pub expose_details: bool,
}

impl ApiError {
    pub fn new(error: SiemError, expose_details: bool) -> Self {
        Self {
            error,
            expose_details,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.error.status_code();
        let body = self.error.to_error_response(self.expose_details);

        match &self.error {
            SiemError::Internal { .. } | SiemError::Configuration { .. } => {
                error!(code = self.error.error_code(), "{}", self.error.detailed_message());
            }
            _ => {
                info!(code = self.error.error_code(), "Client error: {}", self.error);
            }
        }

        (status, Json(body)).into_response()
    }
}

/// Trait for adding context to errors
pub trait ErrorContext<T> {
    fn with_context<F>(self, f: F) -> SiemResult<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: Into<anyhow::Error>,
{
    fn with_context<F>(self, f: F) -> SiemResult<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| SiemError::internal_with_source(f(), e.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_siem_error_creation() {
        let internal = SiemError::internal("serialization failed");
        assert_eq!(internal.error_code(), "INTERNAL_ERROR");
        assert_eq!(internal.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        let method = SiemError::method_not_allowed("POST");
        assert_eq!(method.error_code(), "METHOD_NOT_ALLOWED");
        assert_eq!(method.status_code(), StatusCode::METHOD_NOT_ALLOWED);

        let config = SiemError::configuration("no TLS backend");
        assert_eq!(config.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_internal_error_hides_details_in_production() {
        let error = SiemError::internal_with_source(
            "Failed to serialize response",
            anyhow::anyhow!("key must be a string"),
        );

        let production = error.to_error_response(false);
        assert_eq!(production.error, "Failed to fetch logs");
        assert_eq!(production.message.as_deref(), Some("Internal server error"));

        let development = error.to_error_response(true);
        let message = development.message.unwrap();
        assert!(message.contains("Failed to serialize response"));
        assert!(message.contains("key must be a string"));
    }

    #[test]
    fn test_method_not_allowed_envelope_has_no_message() {
        let response = SiemError::method_not_allowed("DELETE").to_error_response(true);
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json, serde_json::json!({ "error": "Method not allowed" }));
    }

    #[test]
    fn test_error_context_wraps_source() {
        let result: Result<(), std::io::Error> =
            Err(std::io::Error::new(std::io::ErrorKind::Other, "boom"));
        let err = result.with_context(|| "writing body".to_string()).unwrap_err();
        assert!(matches!(err, SiemError::Internal { source: Some(_), .. }));
        assert!(err.detailed_message().contains("boom"));
    }
}
