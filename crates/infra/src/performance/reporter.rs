//! Periodic performance snapshot reporter
//!
//! Flushes the collector every interval until cancelled, then flushes once
//! more so nothing recorded before shutdown is lost.

use std::sync::Arc;
use std::time::Duration;

use bitebase_core::PerformanceCollector;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Flushes the collector on a fixed interval.
#[derive(Debug, Clone)]
pub struct PerformanceReporter {
    collector: Arc<PerformanceCollector>,
    interval: Duration,
}

impl PerformanceReporter {
    /// Reporter flushing `collector` every `interval`.
    pub fn new(collector: Arc<PerformanceCollector>, interval: Duration) -> Self {
        Self { collector, interval: interval.max(Duration::from_millis(1)) }
    }

    /// Run on a tokio task until `token` is cancelled.
    pub fn spawn(self, token: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(token).await })
    }

    /// Flush every interval, then once more on cancellation.
    pub async fn run(&self, token: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        info!(interval_secs = self.interval.as_secs_f64(), "performance reporter started");
        loop {
            tokio::select! {
                () = token.cancelled() => break,
                _ = ticker.tick() => {
                    if let Some(snapshot) = self.collector.flush().await {
                        debug!(?snapshot, "performance snapshot reported");
                    }
                }
            }
        }

        let flushed = self.collector.flush().await.is_some();
        info!(final_flush = flushed, "performance reporter stopped");
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for performance::reporter.
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use bitebase_core::{AnalyticsClient, AnalyticsService, PerformanceEvent};
    use bitebase_domain::{AnalyticsEvent, Result, UserProperties};

    use super::*;

    #[derive(Default)]
    struct CountingClient(AtomicUsize);

    #[async_trait]
    impl AnalyticsClient for CountingClient {
        fn name(&self) -> &str {
            "counting"
        }

        async fn track(&self, event: &AnalyticsEvent) -> Result<()> {
            assert_eq!(event.name, "performance_metrics");
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn identify(&self, _user: &UserProperties) -> Result<()> {
            Ok(())
        }
    }

    fn collector_with(client: Arc<CountingClient>) -> Arc<PerformanceCollector> {
        let analytics = Arc::new(AnalyticsService::new(true).with_client(client));
        Arc::new(PerformanceCollector::new().with_analytics(analytics))
    }

    /// Validates the reporter loop under paused time.
    ///
    /// Assertions:
    /// - Confirms a tick with recorded metrics emits one event.
    /// - Ensures an empty interval emits nothing.
    /// - Confirms cancellation performs the final flush.
    #[tokio::test(start_paused = true)]
    async fn test_flushes_on_interval_and_cancel() {
        let client = Arc::new(CountingClient::default());
        let collector = collector_with(client.clone());
        let token = CancellationToken::new();
        let handle = PerformanceReporter::new(collector.clone(), Duration::from_secs(30)).spawn(token.clone());

        collector.record(PerformanceEvent::Render { duration: 12.0 });
        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(client.0.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(client.0.load(Ordering::SeqCst), 1);

        collector.record(PerformanceEvent::Render { duration: 8.0 });
        token.cancel();
        handle.await.unwrap();
        assert_eq!(client.0.load(Ordering::SeqCst), 2);
        assert!(collector.get_performance_metrics().is_none());
    }
}
