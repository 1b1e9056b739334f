//! Error types for illust-proxy
//!
//! This module provides the error taxonomy of the proxy pipeline:
//! - Typed terminal failures (missing credential, metadata not found, exhausted fallback)
//! - HTTP status code mapping for the edge handler
//! - The `{success, error, message}` JSON envelope returned on every non-2xx response

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for illust-proxy operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for illust-proxy
///
/// Lower layers report soft failures as [`AttemptOutcome`](crate::types::AttemptOutcome)
/// values; only terminal conditions of the whole pipeline become an `Error`.
#[derive(Debug, Error)]
pub enum Error {
    /// No upstream cookie credential is available for this request
    #[error("missing upstream cookie credential")]
    AuthMissing,

    /// The illustration id is not a numeric string
    #[error("invalid illustration id '{0}'")]
    InvalidIllustId(String),

    /// The metadata endpoint failed or returned no usable tier
    #[error("no page info found for illustration {id}")]
    MetadataNotFound {
        /// The illustration id that was looked up
        id: String,
    },

    /// Every (tier, strategy) combination failed
    #[error("all {attempts} download attempts failed for illustration {id}")]
    AllStrategiesExhausted {
        /// The illustration id that was proxied
        id: String,
        /// Number of attempts made
        attempts: usize,
        /// How many of those attempts hit a challenge page or rate limit
        blocked: usize,
    },

    /// The request was cancelled before an attempt succeeded
    #[error("request cancelled")]
    Cancelled,

    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "strategies")
        key: Option<String>,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),
}

impl Error {
    /// Create a configuration error for a specific key
    pub fn config(key: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }
}

/// API error response envelope
///
/// Returned by every endpoint on a non-2xx response.
///
/// # Example JSON Response
///
/// ```json
/// {
///   "success": false,
///   "error": "missing upstream cookie credential",
///   "message": "set the X-Upstream-Cookie header or configure PIXIV_COOKIE"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// Always `false`
    pub success: bool,

    /// What went wrong
    pub error: String,

    /// Human-readable hint for the caller
    pub message: String,
}

impl ApiError {
    /// Create a new API error envelope
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            message: message.into(),
        }
    }

    /// Create a "route not found" error
    pub fn route_not_found(path: &str) -> Self {
        Self::new(
            "route not found",
            format!(
                "path {} does not exist, see /api/info for the available endpoints",
                path
            ),
        )
    }

    /// Create an "internal server error"
    pub fn internal(error: impl Into<String>) -> Self {
        Self::new(error, "internal server error")
    }
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            Error::AuthMissing => 401,

            Error::InvalidIllustId(_) => 400,
            Error::Config { .. } => 400,

            Error::MetadataNotFound { .. } => 404,
            Error::AllStrategiesExhausted { .. } => 404,

            Error::Cancelled => 503,

            Error::Io(_) => 500,
            Error::Network(_) => 500,
            Error::Serialization(_) => 500,
            Error::ApiServerError(_) => 500,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::AuthMissing => "auth_missing",
            Error::InvalidIllustId(_) => "invalid_illust_id",
            Error::MetadataNotFound { .. } => "metadata_not_found",
            Error::AllStrategiesExhausted { .. } => "all_strategies_exhausted",
            Error::Cancelled => "cancelled",
            Error::Config { .. } => "config_error",
            Error::Io(_) => "io_error",
            Error::Network(_) => "network_error",
            Error::Serialization(_) => "serialization_error",
            Error::ApiServerError(_) => "api_server_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let message = match &error {
            Error::AuthMissing => {
                "set the X-Upstream-Cookie header or configure PIXIV_COOKIE".to_string()
            }
            Error::InvalidIllustId(_) => "illustration ids are numeric strings".to_string(),
            Error::MetadataNotFound { id } | Error::AllStrategiesExhausted { id, .. } => {
                format!("unable to proxy illustration {}", id)
            }
            Error::Cancelled => "the request was cancelled before completing".to_string(),
            Error::Config { key: Some(key), .. } => format!("check configuration key '{}'", key),
            _ => "internal server error".to_string(),
        };

        ApiError::new(error.to_string(), message)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    /// Returns (Error, expected_status_code, expected_error_code) for every
    /// reachable match arm in ToHttpStatus.
    fn all_error_variants() -> Vec<(Error, u16, &'static str)> {
        vec![
            (Error::AuthMissing, 401, "auth_missing"),
            (
                Error::InvalidIllustId("abc".into()),
                400,
                "invalid_illust_id",
            ),
            (
                Error::MetadataNotFound { id: "1".into() },
                404,
                "metadata_not_found",
            ),
            (
                Error::AllStrategiesExhausted {
                    id: "1".into(),
                    attempts: 4,
                    blocked: 1,
                },
                404,
                "all_strategies_exhausted",
            ),
            (Error::Cancelled, 503, "cancelled"),
            (
                Error::config("strategies", "must not be empty"),
                400,
                "config_error",
            ),
            (
                Error::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone")),
                500,
                "io_error",
            ),
            (
                Error::ApiServerError("bind failed".into()),
                500,
                "api_server_error",
            ),
        ]
    }

    #[test]
    fn test_status_and_error_codes() {
        for (error, status, code) in all_error_variants() {
            assert_eq!(error.status_code(), status, "status for {:?}", error);
            assert_eq!(error.error_code(), code, "code for {:?}", error);
        }
    }

    #[test]
    fn test_auth_missing_envelope_names_credential() {
        let api_error: ApiError = Error::AuthMissing.into();
        assert!(!api_error.success);
        assert!(api_error.error.contains("cookie"));
        assert!(api_error.message.contains("X-Upstream-Cookie"));
    }

    #[test]
    fn test_not_found_envelope_names_illustration() {
        let api_error: ApiError = Error::MetadataNotFound {
            id: "12345".into(),
        }
        .into();
        assert!(api_error.message.contains("12345"));

        let api_error: ApiError = Error::AllStrategiesExhausted {
            id: "777".into(),
            attempts: 8,
            blocked: 2,
        }
        .into();
        assert!(api_error.error.contains('8'));
        assert!(api_error.message.contains("777"));
    }

    #[test]
    fn test_envelope_serializes_three_fields() {
        let json = serde_json::to_value(ApiError::route_not_found("/nope")).unwrap();
        let object = json.as_object().unwrap();
        assert_eq!(object.len(), 3);
        assert_eq!(json["success"], false);
        assert!(json["message"].as_str().unwrap().contains("/nope"));
    }
}
