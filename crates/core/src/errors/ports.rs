//! Port interfaces for error monitoring
//!
//! Adapters for Sentry-style services and on-call channels implement these
//! traits; the error handler only sees the trait objects.

use async_trait::async_trait;
use bitebase_domain::{ErrorRecord, Result};

/// Destination for every handled error
#[async_trait]
pub trait MonitoringSink: Send + Sync {
    /// Short name used in log fields
    fn name(&self) -> &str;

    /// Report one error record
    async fn capture(&self, record: &ErrorRecord) -> Result<()>;
}

/// Out-of-band notification for critical errors
#[async_trait]
pub trait CriticalAlertNotifier: Send + Sync {
    fn name(&self) -> &str;

    /// Notify the on-call channel about a critical record
    async fn notify(&self, record: &ErrorRecord) -> Result<()>;
}
