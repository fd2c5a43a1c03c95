//! Port interface for product analytics backends

use async_trait::async_trait;
use bitebase_domain::{AnalyticsEvent, Result, UserProperties};

/// Product analytics backend (Mixpanel, GA4, ...)
#[async_trait]
pub trait AnalyticsClient: Send + Sync {
    /// Short name used in log fields
    fn name(&self) -> &str;

    /// Record an already enriched event
    async fn track(&self, event: &AnalyticsEvent) -> Result<()>;

    /// Attach profile attributes to a user
    async fn identify(&self, user: &UserProperties) -> Result<()>;
}
