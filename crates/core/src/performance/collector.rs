//! Rolling performance snapshot
//!
//! Runtime timing events are folded into one current
//! [`PerformanceSnapshot`]. [`PerformanceCollector::flush`] hands the
//! snapshot to analytics and starts a new one.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bitebase_domain::constants::{LARGE_RESOURCE_THRESHOLD_BYTES, SLOW_RESOURCE_THRESHOLD_MS};
use bitebase_domain::{PerformanceConfig, PerformanceSnapshot};
use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::{debug, error, warn};

use crate::analytics::AnalyticsService;

/// Paint entry name that carries first contentful paint.
pub const FIRST_CONTENTFUL_PAINT: &str = "first-contentful-paint";

/// Runtime performance measurement. Times are milliseconds.
#[derive(Debug, Clone, PartialEq)]
pub enum PerformanceEvent {
    LargestContentfulPaint { render_time: f64, load_time: f64 },
    FirstInput { start_time: f64, processing_start: f64 },
    /// Shifts right after user input do not count towards CLS.
    LayoutShift { value: f64, had_recent_input: bool },
    Paint { name: String, start_time: f64 },
    Navigation { load_time: f64, time_to_interactive: f64 },
    Resource { name: String, duration: f64, transfer_size: u64 },
    Render { duration: f64 },
}

/// Thresholds above which resource loads are reported as warnings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResourceThresholds {
    /// Load duration in milliseconds
    pub slow_ms: f64,
    /// Transfer size in bytes
    pub large_bytes: u64,
}

impl Default for ResourceThresholds {
    fn default() -> Self {
        Self { slow_ms: SLOW_RESOURCE_THRESHOLD_MS, large_bytes: LARGE_RESOURCE_THRESHOLD_BYTES }
    }
}

/// Folds runtime timings into one snapshot and flushes it to analytics.
pub struct PerformanceCollector {
    current: Mutex<PerformanceSnapshot>,
    analytics: Option<Arc<AnalyticsService>>,
    thresholds: ResourceThresholds,
}

impl std::fmt::Debug for PerformanceCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PerformanceCollector")
            .field("pending", &!self.current.lock().is_empty())
            .field("analytics", &self.analytics.is_some())
            .field("thresholds", &self.thresholds)
            .finish()
    }
}

impl Default for PerformanceCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl PerformanceCollector {
    /// Collector with default thresholds and no analytics.
    pub fn new() -> Self {
        Self {
            current: Mutex::new(PerformanceSnapshot::default()),
            analytics: None,
            thresholds: ResourceThresholds::default(),
        }
    }

    /// Collector using the configured resource thresholds.
    pub fn from_config(config: &PerformanceConfig) -> Self {
        Self::new().with_thresholds(ResourceThresholds {
            slow_ms: config.slow_resource_ms,
            large_bytes: config.large_resource_bytes,
        })
    }

    /// Send flushed snapshots and API call timings to `analytics`.
    pub fn with_analytics(mut self, analytics: Arc<AnalyticsService>) -> Self {
        self.analytics = Some(analytics);
        self
    }

    /// Replace the resource warning thresholds.
    pub fn with_thresholds(mut self, thresholds: ResourceThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Fold one runtime event into the current snapshot.
    pub fn record(&self, event: PerformanceEvent) {
        match event {
            PerformanceEvent::LargestContentfulPaint { render_time, load_time } => {
                let value = if render_time > 0.0 { render_time } else { load_time };
                self.current.lock().largest_contentful_paint = Some(value);
            }
            PerformanceEvent::FirstInput { start_time, processing_start } => {
                self.current.lock().first_input_delay = Some(processing_start - start_time);
            }
            PerformanceEvent::LayoutShift { value, had_recent_input } => {
                if had_recent_input {
                    return;
                }
                let mut current = self.current.lock();
                let total = current.cumulative_layout_shift.unwrap_or(0.0) + value;
                current.cumulative_layout_shift = Some(total);
            }
            PerformanceEvent::Paint { name, start_time } => {
                if name == FIRST_CONTENTFUL_PAINT {
                    self.current.lock().first_contentful_paint = Some(start_time);
                }
            }
            PerformanceEvent::Navigation { load_time, time_to_interactive } => {
                let mut current = self.current.lock();
                current.page_load_time = Some(load_time);
                current.time_to_interactive = Some(time_to_interactive);
            }
            PerformanceEvent::Resource { name, duration, transfer_size } => {
                self.analyze_resource(&name, duration, transfer_size);
            }
            PerformanceEvent::Render { duration } => {
                self.current.lock().render_time = Some(duration);
            }
        }
    }

    /// Record an outbound API call.
    ///
    /// Only calls that produced a status update `api_response_time`; every
    /// call is reported to analytics.
    pub async fn record_api_call(&self, url: &str, duration: Duration, status: Option<u16>) {
        let millis = duration.as_secs_f64() * 1000.0;
        if status.is_some() {
            self.current.lock().api_response_time = Some(millis);
        }
        debug!(url, duration_ms = millis, status, "api_call_timed");

        if let Some(analytics) = &self.analytics {
            let timing = PerformanceSnapshot {
                page_load_time: Some(0.0),
                api_response_time: Some(millis),
                render_time: Some(0.0),
                ..PerformanceSnapshot::default()
            };
            analytics.track_performance(&timing).await;
        }
    }

    /// Await `load` and record its duration as render time on success.
    pub async fn time_load<F, T, E>(&self, load: F) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let started = Instant::now();
        match load.await {
            Ok(value) => {
                let millis = started.elapsed().as_secs_f64() * 1000.0;
                self.record(PerformanceEvent::Render { duration: millis });
                Ok(value)
            }
            Err(err) => {
                error!(error = %err, "failed to load module");
                Err(err)
            }
        }
    }

    /// Copy of the current snapshot, `None` before any metric.
    pub fn get_performance_metrics(&self) -> Option<PerformanceSnapshot> {
        let current = self.current.lock();
        (!current.is_empty()).then(|| current.clone())
    }

    /// Reset the snapshot and report it to analytics.
    ///
    /// Returns the flushed snapshot; an empty snapshot is neither reported
    /// nor returned.
    pub async fn flush(&self) -> Option<PerformanceSnapshot> {
        let snapshot = std::mem::take(&mut *self.current.lock());
        if snapshot.is_empty() {
            return None;
        }

        if let Some(analytics) = &self.analytics {
            analytics.track_performance(&snapshot).await;
        }
        debug!(metrics = snapshot.to_properties().len(), "performance_flushed");
        Some(snapshot)
    }

    fn analyze_resource(&self, name: &str, duration: f64, transfer_size: u64) {
        if duration > self.thresholds.slow_ms {
            warn!(resource = name, duration_ms = duration, "slow resource detected");
        }
        if transfer_size > self.thresholds.large_bytes {
            #[allow(clippy::cast_precision_loss)] // rendered with two decimals
            let megabytes = transfer_size as f64 / 1024.0 / 1024.0;
            warn!(resource = name, size_mb = %format!("{megabytes:.2}"), "large resource detected");
        }
    }
}
