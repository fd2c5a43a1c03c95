//! Error types used throughout the service layer

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::error::{CategorizedError, ErrorCategory};

/// Main error type for BiteBase
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum BiteBaseError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Security error: {0}")]
    Security(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("External service error: {0}")]
    External(String),

    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl BiteBaseError {
    /// Stable label suitable for logging fields and metrics tags.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::Cache(_) => "cache",
            Self::Database(_) => "database",
            Self::Network(_) => "network",
            Self::Auth(_) => "auth",
            Self::Security(_) => "security",
            Self::NotFound(_) => "not_found",
            Self::InvalidInput(_) => "invalid_input",
            Self::RateLimited(_) => "rate_limited",
            Self::Serialization(_) => "serialization",
            Self::External(_) => "external",
            Self::Cancelled(_) => "cancelled",
            Self::Internal(_) => "internal",
        }
    }
}

impl CategorizedError for BiteBaseError {
    fn category(&self) -> ErrorCategory {
        match self {
            Self::Database(_) => ErrorCategory::Database,
            Self::Network(_) => ErrorCategory::Network,
            Self::Auth(_) | Self::Security(_) => ErrorCategory::Authentication,
            Self::InvalidInput(_) => ErrorCategory::Validation,
            Self::NotFound(_) | Self::RateLimited(_) => ErrorCategory::Api,
            Self::Cache(_) | Self::External(_) => ErrorCategory::ExternalService,
            Self::Config(_) | Self::Serialization(_) | Self::Cancelled(_) | Self::Internal(_) => {
                ErrorCategory::BusinessLogic
            }
        }
    }
}

impl From<serde_json::Error> for BiteBaseError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type alias for BiteBase operations
pub type Result<T> = std::result::Result<T, BiteBaseError>;
