//! Integration tests wiring the core services together through their ports
//!
//! Mirrors how the composition root assembles the layer: one error handler
//! shared by the retry engine, with analytics and monitoring behind
//! in-memory adapters.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bitebase_core::{
    AnalyticsClient, AnalyticsService, CacheOptions, CacheService, CriticalAlertNotifier,
    ErrorHandler, MonitoringSink, PerformanceCollector, PerformanceEvent, RetryEngine,
    RetryFailure, RetryOptions,
};
use bitebase_domain::{
    AnalyticsEvent, BiteBaseError, ErrorCategory, ErrorContext, ErrorRecord, ErrorSeverity, Result,
    UserProperties,
};
use parking_lot::Mutex;
use serde_json::Value;

#[derive(Default)]
struct Recorder {
    records: Mutex<Vec<ErrorRecord>>,
    alerts: Mutex<Vec<String>>,
    events: Mutex<Vec<AnalyticsEvent>>,
}

struct Sink(Arc<Recorder>);
struct Notifier(Arc<Recorder>);
struct Client(Arc<Recorder>);

#[async_trait]
impl MonitoringSink for Sink {
    fn name(&self) -> &str {
        "test-sink"
    }

    async fn capture(&self, record: &ErrorRecord) -> Result<()> {
        self.0.records.lock().push(record.clone());
        Ok(())
    }
}

#[async_trait]
impl CriticalAlertNotifier for Notifier {
    fn name(&self) -> &str {
        "test-notifier"
    }

    async fn notify(&self, record: &ErrorRecord) -> Result<()> {
        self.0.alerts.lock().push(record.code.clone());
        Ok(())
    }
}

#[async_trait]
impl AnalyticsClient for Client {
    fn name(&self) -> &str {
        "test-client"
    }

    async fn track(&self, event: &AnalyticsEvent) -> Result<()> {
        self.0.events.lock().push(event.clone());
        Ok(())
    }

    async fn identify(&self, _user: &UserProperties) -> Result<()> {
        Ok(())
    }
}

fn wired() -> (Arc<ErrorHandler>, Arc<AnalyticsService>, Arc<Recorder>) {
    let recorder = Arc::new(Recorder::default());
    let analytics = Arc::new(AnalyticsService::new(true).with_client(Arc::new(Client(recorder.clone()))));
    let handler = Arc::new(
        ErrorHandler::builder()
            .with_sink(Arc::new(Sink(recorder.clone())))
            .with_notifier(Arc::new(Notifier(recorder.clone())))
            .with_analytics(analytics.clone())
            .build(),
    );
    (handler, analytics, recorder)
}

/// Verifies that every failed attempt reaches monitoring with its attempt
/// number while the caller gets the original error back.
///
/// # Test Steps
/// 1. Retry an always-failing network operation three times
/// 2. Drain the handler
/// 3. Verify three records with attempts 1..=3 and three analytics events
#[tokio::test(start_paused = true)]
async fn test_retry_attempts_are_reported() {
    let (handler, _analytics, recorder) = wired();
    let engine = RetryEngine::new(handler.clone());
    let calls = Arc::new(AtomicU32::new(0));

    let counter = calls.clone();
    let result: std::result::Result<(), _> = engine
        .retry_operation(
            move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(BiteBaseError::Network("ECONNRESET".into()))
                }
            },
            &RetryOptions::default(),
        )
        .await;
    handler.shutdown().await;

    assert!(matches!(result, Err(RetryFailure::Failed(BiteBaseError::Network(_)))));
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    let records = recorder.records.lock();
    let attempts: Vec<Value> =
        records.iter().map(|r| r.context.additional_data["attempt"].clone()).collect();
    assert_eq!(attempts, vec![Value::from(1), Value::from(2), Value::from(3)]);
    assert!(records.iter().all(|r| r.context.additional_data["maxRetries"] == 3));

    let events = recorder.events.lock();
    assert_eq!(events.len(), 3);
    assert!(events.iter().all(|e| e.name == "error_occurred"));
}

#[tokio::test]
async fn test_critical_error_record_shape_and_alert() {
    let (handler, _analytics, recorder) = wired();

    let record = handler.handle_error(
        &BiteBaseError::Network("connect 10.0.4.12:6379 refused".into()),
        ErrorCategory::Network,
        ErrorSeverity::Critical,
        ErrorContext::new().with_url("/dashboard"),
    );
    handler.shutdown().await;

    assert_eq!(record.category, ErrorCategory::Network);
    assert!(!record.id.is_empty());
    assert!(record.user_message.contains("internet connection"));
    assert!(!record.user_message.contains("10.0.4.12"));
    assert_eq!(*recorder.alerts.lock(), vec![record.code.clone()]);
    assert_eq!(recorder.events.lock()[0].properties["error_page"], "/dashboard");
}

/// Verifies fallback chaining records the primary failure once.
#[tokio::test]
async fn test_fallback_marks_record() {
    let (handler, _analytics, recorder) = wired();
    let engine = RetryEngine::new(handler.clone());

    let value = engine
        .with_fallback(
            || async { Err(BiteBaseError::External("places api 503".into())) },
            || async { Ok::<_, BiteBaseError>(vec!["cached"]) },
            None,
        )
        .await;
    handler.shutdown().await;

    assert_eq!(value, Ok(vec!["cached"]));
    let records = recorder.records.lock();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].category, ErrorCategory::ExternalService);
    assert_eq!(records[0].context.additional_data["fallbackUsed"], true);
}

#[tokio::test]
async fn test_performance_flush_reaches_analytics() -> anyhow::Result<()> {
    let (_handler, analytics, recorder) = wired();
    let collector = PerformanceCollector::new().with_analytics(analytics);

    assert!(collector.get_performance_metrics().is_none());
    collector.record(PerformanceEvent::LargestContentfulPaint { render_time: 0.0, load_time: 1900.0 });
    collector.record_api_call("/api/restaurants", Duration::from_millis(80), Some(200)).await;

    let snapshot = collector.flush().await.ok_or_else(|| anyhow::anyhow!("nothing flushed"))?;
    assert_eq!(snapshot.largest_contentful_paint, Some(1900.0));
    assert!(collector.get_performance_metrics().is_none());

    let events = recorder.events.lock();
    assert_eq!(events.len(), 2);
    assert_eq!(events[1].properties["largest_contentful_paint"], 1900.0);
    Ok(())
}

#[tokio::test]
async fn test_cache_survives_overlapping_invalidations() {
    let cache = CacheService::in_memory();
    cache.cache("restaurant:1", &"Som Tam House", CacheOptions::new().tags(["restaurants", "bkk"])).await;
    cache.cache("restaurant:2", &"Khao Soi Corner", CacheOptions::new().tag("restaurants")).await;
    cache.cache("market:bkk", &42, CacheOptions::new().tag("bkk")).await;

    assert_eq!(cache.invalidate_cache(["bkk"]).await.len(), 2);
    assert_eq!(cache.invalidate_cache(["bkk"]).await.len(), 0);
    assert_eq!(cache.get_cache::<String>("restaurant:2").await.as_deref(), Some("Khao Soi Corner"));
    assert_eq!(cache.stats().await.invalidations, 2);
}
