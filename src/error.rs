//! Error types for the e-play scraper
//!
//! This module defines the error hierarchy for the entire crate.
//! All public APIs return `Result<T, Error>` where Error is defined here.
//! Run-level outcomes (partial results plus a cause) live in
//! [`crate::engine::FailureCause`]; [`Error::failure_cause`] bridges the two.

use crate::engine::FailureCause;
use thiserror::Error;

/// The main error type for the scraper
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid config value for '{field}': {message}")]
    InvalidConfigValue { field: String, message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // Session Errors
    // ============================================================================
    #[error("Session error: {message}")]
    Session { message: String },

    #[error("No cf_clearance token available")]
    MissingClearance,

    #[error("Token refresh timed out after {timeout_secs}s")]
    RefreshTimeout { timeout_secs: u64 },

    #[error("Refresh command failed: {message}")]
    Process { message: String },

    // ============================================================================
    // HTTP Errors
    // ============================================================================
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Access denied by challenge gate (HTTP {status})")]
    AccessDenied { status: u16 },

    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ============================================================================
    // Data Processing Errors
    // ============================================================================
    #[error("Failed to decode response: {message}")]
    Decode { message: String },

    // ============================================================================
    // Output Errors
    // ============================================================================
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Output error: {message}")]
    Output { message: String },

    #[error("Google Sheets error: {message}")]
    Sheets { message: String },

    #[error("JWT generation failed: {message}")]
    JwtGeneration { message: String },

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an invalid config value error
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfigValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a session error
    pub fn session(message: impl Into<String>) -> Self {
        Self::Session {
            message: message.into(),
        }
    }

    /// Create a process error
    pub fn process(message: impl Into<String>) -> Self {
        Self::Process {
            message: message.into(),
        }
    }

    /// Create an HTTP status error
    pub fn http_status(status: u16, body: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            body: body.into(),
        }
    }

    /// Create a decode error
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Create an output error
    pub fn output(message: impl Into<String>) -> Self {
        Self::Output {
            message: message.into(),
        }
    }

    /// Create a Google Sheets error
    pub fn sheets(message: impl Into<String>) -> Self {
        Self::Sheets {
            message: message.into(),
        }
    }

    /// Classify a page-fetch error for the pagination engine.
    ///
    /// Access-denied responses mean the session tokens went stale; every other
    /// fetch error (transport, unexpected status, unparseable body) is transient.
    pub fn failure_cause(&self) -> FailureCause {
        match self {
            Error::AccessDenied { .. } => FailureCause::AuthExpired,
            Error::MissingClearance | Error::RefreshTimeout { .. } | Error::Process { .. } => {
                FailureCause::ProviderFailure
            }
            _ => FailureCause::Transient,
        }
    }
}

/// Result type alias for the scraper
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", message.into(), inner))
        })
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", f(), inner))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::config("test message");
        assert_eq!(err.to_string(), "Configuration error: test message");

        let err = Error::invalid_value("page_size", "must be positive");
        assert_eq!(
            err.to_string(),
            "Invalid config value for 'page_size': must be positive"
        );

        let err = Error::http_status(404, "Not found");
        assert_eq!(err.to_string(), "HTTP 404: Not found");

        let err = Error::AccessDenied { status: 403 };
        assert_eq!(
            err.to_string(),
            "Access denied by challenge gate (HTTP 403)"
        );
    }

    #[test]
    fn test_failure_cause() {
        assert_eq!(
            Error::AccessDenied { status: 403 }.failure_cause(),
            FailureCause::AuthExpired
        );
        assert_eq!(
            Error::http_status(500, "").failure_cause(),
            FailureCause::Transient
        );
        assert_eq!(
            Error::http_status(404, "").failure_cause(),
            FailureCause::Transient
        );
        assert_eq!(
            Error::http_status(400, "").failure_cause(),
            FailureCause::Transient
        );
        assert_eq!(
            Error::Timeout { timeout_ms: 1000 }.failure_cause(),
            FailureCause::Transient
        );
        assert_eq!(
            Error::decode("bad body").failure_cause(),
            FailureCause::Transient
        );
        assert_eq!(
            Error::MissingClearance.failure_cause(),
            FailureCause::ProviderFailure
        );
    }

    #[test]
    fn test_result_context() {
        let result: Result<()> = Err(Error::config("inner"));
        let with_context = result.context("outer");
        assert!(with_context
            .unwrap_err()
            .to_string()
            .contains("outer: Configuration error: inner"));
    }
}
