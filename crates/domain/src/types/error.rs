//! Error taxonomy types
//!
//! Every caught failure is described by an [`ErrorCategory`] and an
//! [`ErrorSeverity`], carries an [`ErrorContext`] captured when it was
//! handled, and is materialised as an immutable [`ErrorRecord`].

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::impl_domain_enum_conversions;

/// Failure domain of an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Api,
    Database,
    Authentication,
    Validation,
    Network,
    #[default]
    BusinessLogic,
    ExternalService,
    UserInput,
}

impl_domain_enum_conversions!(ErrorCategory {
    Api => "api",
    Database => "database",
    Authentication => "authentication",
    Validation => "validation",
    Network => "network",
    BusinessLogic => "business_logic",
    ExternalService => "external_service",
    UserInput => "user_input",
});

/// How serious an error is for the user and for operations.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ErrorSeverity {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl_domain_enum_conversions!(ErrorSeverity {
    Low => "low",
    Medium => "medium",
    High => "high",
    Critical => "critical",
});

/// Errors that know which taxonomy category they belong to.
///
/// The retry engine uses this to decide retryability without the caller
/// restating the category at every call site.
pub trait CategorizedError {
    fn category(&self) -> ErrorCategory;
}

/// Ambient request/session state attached to an error when it is handled.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// Filled with the handling time when left empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub additional_data: BTreeMap<String, Value>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn with_ip(mut self, ip: impl Into<String>) -> Self {
        self.ip = Some(ip.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Attach an arbitrary key/value pair; later writes to the same key win.
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.additional_data.insert(key.into(), value.into());
        self
    }

    /// Merge `other` into `self`, keeping existing fields when `other` leaves
    /// them empty.
    pub fn merge(mut self, other: Self) -> Self {
        self.user_id = other.user_id.or(self.user_id);
        self.session_id = other.session_id.or(self.session_id);
        self.request_id = other.request_id.or(self.request_id);
        self.user_agent = other.user_agent.or(self.user_agent);
        self.ip = other.ip.or(self.ip);
        self.url = other.url.or(self.url);
        self.method = other.method.or(self.method);
        self.timestamp = other.timestamp.or(self.timestamp);
        self.additional_data.extend(other.additional_data);
        self
    }
}

/// Classified, user-safe description of a caught error.
///
/// Records are produced by the error handler and forwarded to monitoring.
/// A record also implements [`std::error::Error`], so callers that must halt
/// can propagate it with `?`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub id: String,
    pub message: String,
    pub code: String,
    pub category: ErrorCategory,
    pub severity: ErrorSeverity,
    pub context: ErrorContext,
    /// Rendered `source()` chain of the original error, outermost first.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    pub is_retryable: bool,
    pub user_message: String,
}

impl ErrorRecord {
    pub fn is_critical(&self) -> bool {
        self.severity == ErrorSeverity::Critical
    }
}

impl fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ErrorRecord {}

impl CategorizedError for ErrorRecord {
    fn category(&self) -> ErrorCategory {
        self.category
    }
}
