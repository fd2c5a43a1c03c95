//! Errors of the shared building blocks
//!
//! [`CommonError`] is produced by the codec, the cipher and the rate limiter.
//! Higher layers convert it into `BiteBaseError` at their boundary.
//!
//! [`ErrorClassification`] lets the generic retry executor decide without
//! knowing the concrete error type:
//!
//! ```rust
//! use std::time::Duration;
//!
//! use bitebase_common::error::{CommonError, ErrorClassification};
//!
//! let err = CommonError::rate_limited("login:alice", 5, Duration::from_secs(900), None);
//! assert!(err.is_retryable());
//! assert!(!err.is_critical());
//! ```

use std::fmt;
use std::time::Duration;

use thiserror::Error;

pub type CommonResult<T> = Result<T, CommonError>;

/// Failure of a shared building block
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommonError {
    /// Malformed hex, base64 or delimited payloads
    #[error("Encoding error: {message}")]
    Encoding { message: String },

    /// Bad key material or a failed seal/open
    #[error("Crypto error: {message}")]
    Crypto { message: String },

    #[error("Rate limit exceeded for '{key}': {limit} attempts per {window:?}")]
    RateLimitExceeded { key: String, limit: u32, window: Duration, retry_after: Option<Duration> },

    #[error("Validation error for field '{field}': {message}")]
    Validation { field: String, message: String },
}

impl CommonError {
    /// Malformed input for a codec.
    pub fn encoding<S: Into<String>>(message: S) -> Self {
        Self::Encoding { message: message.into() }
    }

    /// Cipher failure.
    pub fn crypto<S: Into<String>>(message: S) -> Self {
        Self::Crypto { message: message.into() }
    }

    /// Rejected hit, with an optional retry hint.
    pub fn rate_limited<K: Into<String>>(
        key: K,
        limit: u32,
        window: Duration,
        retry_after: Option<Duration>,
    ) -> Self {
        Self::RateLimitExceeded { key: key.into(), limit, window, retry_after }
    }

    /// Invalid value for `field`.
    pub fn validation<F: Into<String>, M: Into<String>>(field: F, message: M) -> Self {
        Self::Validation { field: field.into(), message: message.into() }
    }

    /// Variant name for structured log fields.
    pub fn error_type_name(&self) -> &'static str {
        match self {
            Self::Encoding { .. } => "encoding",
            Self::Crypto { .. } => "crypto",
            Self::RateLimitExceeded { .. } => "rate_limit_exceeded",
            Self::Validation { .. } => "validation",
        }
    }
}

/// Retry and alerting traits of an error.
pub trait ErrorClassification {
    /// Transient failures that may succeed when attempted again.
    fn is_retryable(&self) -> bool;

    fn severity(&self) -> ErrorSeverity;

    /// Needs immediate attention.
    fn is_critical(&self) -> bool;

    /// Earliest sensible retry, when the error knows it.
    fn retry_after(&self) -> Option<Duration>;
}

impl ErrorClassification for CommonError {
    fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimitExceeded { .. })
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::RateLimitExceeded { .. } => ErrorSeverity::Warning,
            Self::Encoding { .. } | Self::Validation { .. } => ErrorSeverity::Error,
            Self::Crypto { .. } => ErrorSeverity::Critical,
        }
    }

    // A failed open is usually a tampered or foreign payload, not an outage.
    fn is_critical(&self) -> bool {
        false
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimitExceeded { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Info => "INFO",
            Self::Warning => "WARN",
            Self::Error => "ERROR",
            Self::Critical => "CRITICAL",
        })
    }
}

impl From<hex::FromHexError> for CommonError {
    fn from(err: hex::FromHexError) -> Self {
        Self::encoding(format!("invalid hex: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Validates `ErrorClassification` for every variant.
    ///
    /// Assertions:
    /// - Only rate limits are retryable.
    /// - Crypto failures rank highest without being critical.
    #[test]
    fn test_classification() {
        let limited = CommonError::rate_limited("register:1.2.3.4", 3, Duration::from_secs(3600), None);
        assert!(limited.is_retryable());
        assert_eq!(limited.severity(), ErrorSeverity::Warning);

        assert!(!CommonError::validation("email", "malformed").is_retryable());
        assert!(!CommonError::encoding("odd length").is_retryable());

        let crypto = CommonError::crypto("tag mismatch");
        assert_eq!(crypto.severity(), ErrorSeverity::Critical);
        assert!(!crypto.is_critical());
        assert!(ErrorSeverity::Critical > ErrorSeverity::Warning);
    }

    #[test]
    fn test_retry_after_only_for_rate_limits() {
        let delay = Duration::from_secs(42);
        let err = CommonError::rate_limited("login", 5, Duration::from_secs(900), Some(delay));
        assert_eq!(err.retry_after(), Some(delay));
        assert_eq!(CommonError::crypto("x").retry_after(), None);
    }

    #[test]
    fn test_display_and_hex_conversion() {
        let err = CommonError::rate_limited("login:bob", 5, Duration::from_secs(900), None);
        assert_eq!(err.to_string(), "Rate limit exceeded for 'login:bob': 5 attempts per 900s");
        assert_eq!(err.error_type_name(), "rate_limit_exceeded");

        let err: CommonError = hex::decode("zz").unwrap_err().into();
        assert!(matches!(err, CommonError::Encoding { .. }));
    }
}
