//! Error types for Inlet
//!
//! This module defines the error hierarchy for the entire crate.
//! All public APIs return `Result<T, Error>` where Error is defined here.

use serde_json::Value;
use thiserror::Error;

/// The main error type for Inlet
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Missing required config field: {field}")]
    MissingConfigField { field: String },

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // Authentication Errors
    // ============================================================================
    #[error("Authentication failed: {message}")]
    Auth { message: String },

    #[error("Token refresh failed: {message}")]
    TokenRefresh { message: String },

    // ============================================================================
    // HTTP Errors
    // ============================================================================
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Throttled by provider, cooled down {cooldown_secs}s and still rejected")]
    Throttled { cooldown_secs: u64 },

    #[error("Provider returned HTTP {status}: {details}")]
    Provider { status: u16, details: Value },

    // ============================================================================
    // State Errors
    // ============================================================================
    #[error("State error: {message}")]
    State { message: String },
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a missing field error
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingConfigField {
            field: field.into(),
        }
    }

    /// Create an auth error
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    /// Create a provider error from a status code and error payload
    pub fn provider(status: u16, details: Value) -> Self {
        Self::Provider { status, details }
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Http(_) | Error::Throttled { .. } => true,
            Error::Provider { status, .. } => is_retryable_status(*status),
            _ => false,
        }
    }

    /// Check if this error means the credentials were rejected
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Error::Auth { .. } | Error::TokenRefresh { .. })
    }
}

/// Check if an HTTP status code is retryable
fn is_retryable_status(status: u16) -> bool {
    matches!(status, 500 | 502 | 503 | 504)
}

/// Result type alias for Inlet
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_display() {
        let err = Error::config("test message");
        assert_eq!(err.to_string(), "Configuration error: test message");

        let err = Error::missing_field("api_key");
        assert_eq!(err.to_string(), "Missing required config field: api_key");

        let err = Error::provider(404, json!([{"code": "NOT_FOUND"}]));
        assert_eq!(
            err.to_string(),
            "Provider returned HTTP 404: [{\"code\":\"NOT_FOUND\"}]"
        );
    }

    #[test]
    fn test_is_retryable() {
        assert!(Error::Throttled { cooldown_secs: 301 }.is_retryable());
        assert!(Error::provider(500, Value::Null).is_retryable());
        assert!(Error::provider(503, Value::Null).is_retryable());

        assert!(!Error::provider(400, Value::Null).is_retryable());
        assert!(!Error::provider(404, Value::Null).is_retryable());
        assert!(!Error::config("test").is_retryable());
    }

    #[test]
    fn test_is_auth_failure() {
        assert!(Error::auth("bad key").is_auth_failure());
        assert!(Error::TokenRefresh {
            message: "denied".into()
        }
        .is_auth_failure());
        assert!(!Error::config("x").is_auth_failure());
    }

}
