//! Pure classification rules of the error taxonomy
//!
//! Everything here is a deterministic function of its inputs (plus the
//! timestamp handed in), so the handler, retry engine and tests share one
//! definition of retryability, user messages, codes and monitoring levels.

use std::error::Error;

use bitebase_domain::{ErrorCategory, ErrorSeverity};

/// Message fragments that mark an error as transient regardless of category.
const TRANSIENT_PATTERNS: [&str; 4] = ["timeout", "timed out", "econnreset", "connection reset"];

/// Fallback message for errors whose `Display` output is empty.
pub const UNKNOWN_ERROR_MESSAGE: &str = "Unknown error occurred";

/// Decide whether an error may succeed on a later attempt.
///
/// Network and external-service failures are always retryable; anything else
/// only when its message contains a known transient pattern
/// (case-insensitive).
pub fn is_retryable(message: &str, category: ErrorCategory) -> bool {
    if matches!(category, ErrorCategory::Network | ErrorCategory::ExternalService) {
        return true;
    }
    let lowered = message.to_lowercase();
    TRANSIENT_PATTERNS.iter().any(|pattern| lowered.contains(pattern))
}

/// User-facing message for a category, never exposing internal detail.
pub fn user_message(category: ErrorCategory, severity: ErrorSeverity) -> &'static str {
    match category {
        ErrorCategory::Network => {
            "We're having trouble connecting to our servers. Please check your internet connection and try again."
        }
        ErrorCategory::Authentication => "There was an issue with your login. Please sign in again.",
        ErrorCategory::Validation => "Please check your input and try again.",
        ErrorCategory::ExternalService => {
            "One of our services is temporarily unavailable. We're working to fix this."
        }
        _ if severity == ErrorSeverity::Critical => {
            "We're experiencing technical difficulties. Our team has been notified and is working on a fix."
        }
        _ => "Something went wrong. Please try again in a moment.",
    }
}

/// Correlation code `{CATEGORY}_{SEVERITY}_{last six digits of epoch ms}`.
///
/// The category's underscore is removed, e.g. `BUSINESSLOGIC_MEDIUM_123456`.
pub fn error_code(category: ErrorCategory, severity: ErrorSeverity, epoch_millis: u64) -> String {
    let category_code = category.as_str().to_uppercase().replace('_', "");
    let severity_code = severity.as_str().to_uppercase();
    format!("{category_code}_{severity_code}_{:06}", epoch_millis % 1_000_000)
}

/// Monitoring level a severity is reported at.
pub fn monitoring_level(severity: ErrorSeverity) -> &'static str {
    match severity {
        ErrorSeverity::Critical | ErrorSeverity::High => "error",
        ErrorSeverity::Medium => "warning",
        ErrorSeverity::Low => "info",
    }
}

/// Render the `source()` chain below `error`, one cause per line.
pub fn render_source_chain(error: &(dyn Error + 'static)) -> Option<String> {
    let mut lines = Vec::new();
    let mut current = error.source();
    while let Some(cause) = current {
        lines.push(format!("caused by: {cause}"));
        current = cause.source();
    }
    (!lines.is_empty()).then(|| lines.join("\n"))
}
