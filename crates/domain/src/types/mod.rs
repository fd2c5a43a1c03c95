//! Domain types and models

pub mod analytics;
pub mod error;
pub mod performance;

pub use analytics::{AnalyticsEvent, UserLocation, UserProperties};
pub use error::{CategorizedError, ErrorCategory, ErrorContext, ErrorRecord, ErrorSeverity};
pub use performance::PerformanceSnapshot;
