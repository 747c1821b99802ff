// src/error.rs

//! Unified error handling for the earthquake poller.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for poller operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Reasons a well-formed payload is skipped. None of these are anomalies.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Payload timestamp lies outside the freshness window
    #[error("stale payload: {age_secs}s old, window is 0..={window_secs}s")]
    Stale { age_secs: i64, window_secs: i64 },

    /// No area or point reaches the configured scale
    #[error("below threshold: max scale {max_scale} < {threshold}")]
    BelowThreshold { max_scale: i32, threshold: i32 },

    /// A field the canonical model cannot do without is absent
    #[error("required field missing: {0}")]
    RequiredFieldMissing(String),

    /// The JMA listing holds no entry of the wanted report type
    #[error("no matching report in feed listing")]
    NoReport,

    /// The upstream report retracts an earlier warning
    #[error("report was cancelled upstream")]
    Cancelled,

    /// Feed returned an entry with an unrelated report code
    #[error("unexpected report code {0}")]
    UnexpectedCode(i64),
}

/// Failures of the file-backed deduplication store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The sibling lock file could not be acquired in time
    #[error("timed out after {waited_secs}s waiting for lock {path:?}")]
    LockTimeout { path: PathBuf, waited_secs: u64 },

    /// On-disk content is not what the store wrote
    #[error("malformed log file {path:?}: {message}")]
    Format { path: PathBuf, message: String },

    /// I/O failure while reading or writing the log
    #[error("log file I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed (network, timeout)
    #[error("HTTP error: {0}")]
    Fetch(#[from] reqwest::Error),

    /// HTTP request completed with a non-success status
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// Upstream payload could not be decoded
    #[error("Malformed payload from {context}: {message}")]
    Parse { context: String, message: String },

    /// Payload skipped on purpose
    #[error("Skipped: {0}")]
    Validation(#[from] ValidationError),

    /// Deduplication store failure
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Board rejected the post or thread state could not be determined
    #[error("Post error: {0}")]
    Post(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl AppError {
    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create a malformed payload error with context.
    pub fn parse(context: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Parse {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Create a post error.
    pub fn post(message: impl Into<String>) -> Self {
        Self::Post(message.into())
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a missing-field validation error.
    pub fn missing(field: impl Into<String>) -> Self {
        Self::Validation(ValidationError::RequiredFieldMissing(field.into()))
    }

    /// Expected, non-fatal skip outcomes.
    pub fn is_expected_skip(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Errors that point at misconfiguration or a board outage.
    pub fn is_operator_visible(&self) -> bool {
        matches!(self, Self::Store(_) | Self::Post(_) | Self::Config(_) | Self::Selector { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        let stale = AppError::from(ValidationError::Stale {
            age_secs: 31,
            window_secs: 30,
        });
        assert!(stale.is_expected_skip());
        assert!(!stale.is_operator_visible());

        let lock = AppError::from(StoreError::LockTimeout {
            path: PathBuf::from("/tmp/x.lock"),
            waited_secs: 30,
        });
        assert!(!lock.is_expected_skip());
        assert!(lock.is_operator_visible());

        let parse = AppError::parse("p2p", "bad json");
        assert!(!parse.is_expected_skip());
        assert!(!parse.is_operator_visible());
    }

    #[test]
    fn test_missing_field_message() {
        let err = AppError::missing("earthquake.time");
        assert_eq!(
            err.to_string(),
            "Skipped: required field missing: earthquake.time"
        );
    }
}
