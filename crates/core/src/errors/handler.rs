//! Error handler: classification, logging and monitoring dispatch
//!
//! [`ErrorHandler::handle_error`] is synchronous and never fails. It builds
//! the [`ErrorRecord`], logs it at a level derived from its severity, and
//! queues it for a background worker that forwards it to every monitoring
//! sink, tracks it as an analytics event, and for critical records notifies
//! the alert channels. When the queue is full the record is dropped with a
//! warning so callers are never blocked by slow sinks.

use std::error::Error;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bitebase_domain::constants::{ERROR_DISPATCH_QUEUE_CAPACITY, MONITORING_SINK_TIMEOUT_MS};
use bitebase_domain::{CategorizedError, ErrorCategory, ErrorContext, ErrorRecord, ErrorSeverity};
use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::classification::{
    error_code, is_retryable, monitoring_level, render_source_chain, user_message,
    UNKNOWN_ERROR_MESSAGE,
};
use super::ports::{CriticalAlertNotifier, MonitoringSink};
use crate::analytics::AnalyticsService;
use crate::utils::{epoch_millis, ids};

/// Builder for [`ErrorHandler`]
pub struct ErrorHandlerBuilder {
    sinks: Vec<Arc<dyn MonitoringSink>>,
    notifiers: Vec<Arc<dyn CriticalAlertNotifier>>,
    analytics: Option<Arc<AnalyticsService>>,
    queue_capacity: usize,
    sink_timeout: Duration,
}

impl Default for ErrorHandlerBuilder {
    fn default() -> Self {
        Self {
            sinks: Vec::new(),
            notifiers: Vec::new(),
            analytics: None,
            queue_capacity: ERROR_DISPATCH_QUEUE_CAPACITY,
            sink_timeout: Duration::from_millis(MONITORING_SINK_TIMEOUT_MS),
        }
    }
}

impl ErrorHandlerBuilder {
    /// Forward reports to `sink` as well.
    pub fn with_sink(mut self, sink: Arc<dyn MonitoringSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Alert `notifier` about critical errors.
    pub fn with_notifier(mut self, notifier: Arc<dyn CriticalAlertNotifier>) -> Self {
        self.notifiers.push(notifier);
        self
    }

    /// Track every record as an `error_occurred` analytics event.
    pub fn with_analytics(mut self, analytics: Arc<AnalyticsService>) -> Self {
        self.analytics = Some(analytics);
        self
    }

    /// Bound of the dispatch queue; full queues drop reports.
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    /// Upper bound on each sink or notifier call.
    pub fn sink_timeout(mut self, timeout: Duration) -> Self {
        self.sink_timeout = timeout;
        self
    }

    /// Build the handler, spawning the dispatch worker on the current tokio
    /// runtime when there is anything to dispatch to.
    pub fn build(self) -> ErrorHandler {
        let dispatcher = Dispatcher {
            sinks: self.sinks,
            notifiers: self.notifiers,
            analytics: self.analytics,
            sink_timeout: self.sink_timeout,
        };

        if dispatcher.is_empty() {
            return ErrorHandler::without_dispatch();
        }

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("no tokio runtime available; error monitoring dispatch disabled");
            return ErrorHandler::without_dispatch();
        };

        let (tx, rx) = mpsc::channel(self.queue_capacity);
        let worker = runtime.spawn(dispatcher.run(rx));

        ErrorHandler {
            sender: Mutex::new(Some(tx)),
            worker: Mutex::new(Some(worker)),
            dropped: AtomicU64::new(0),
        }
    }
}

/// Central error taxonomy service
pub struct ErrorHandler {
    sender: Mutex<Option<mpsc::Sender<ErrorRecord>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    dropped: AtomicU64,
}

impl std::fmt::Debug for ErrorHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorHandler")
            .field("dispatching", &self.sender.lock().is_some())
            .field("dropped", &self.dropped_records())
            .finish()
    }
}

impl ErrorHandler {
    /// Start configuring a handler.
    pub fn builder() -> ErrorHandlerBuilder {
        ErrorHandlerBuilder::default()
    }

    /// Handler that logs records but forwards them nowhere.
    pub fn without_dispatch() -> Self {
        Self { sender: Mutex::new(None), worker: Mutex::new(None), dropped: AtomicU64::new(0) }
    }

    /// Classify, log and dispatch `error`, returning the resulting record.
    ///
    /// An error that already is an [`ErrorRecord`] is returned unchanged
    /// (and still logged and dispatched).
    pub fn handle_error<E>(
        &self,
        error: &E,
        category: ErrorCategory,
        severity: ErrorSeverity,
        context: ErrorContext,
    ) -> ErrorRecord
    where
        E: Error + 'static,
    {
        self.handle_dyn_error(error, category, severity, context)
    }

    /// [`ErrorHandler::handle_error`] for trait objects.
    pub fn handle_dyn_error(
        &self,
        error: &(dyn Error + 'static),
        category: ErrorCategory,
        severity: ErrorSeverity,
        context: ErrorContext,
    ) -> ErrorRecord {
        let record = match error.downcast_ref::<ErrorRecord>() {
            Some(existing) => existing.clone(),
            None => build_record(error, category, severity, context),
        };

        log_record(&record);
        self.dispatch(record.clone());
        record
    }

    /// Handle an error using the category it reports itself.
    pub fn handle_categorized<E>(
        &self,
        error: &E,
        severity: ErrorSeverity,
        context: ErrorContext,
    ) -> ErrorRecord
    where
        E: Error + CategorizedError + 'static,
    {
        self.handle_error(error, error.category(), severity, context)
    }

    /// Handle an error with the default `business_logic` / `medium`
    /// classification and an empty context.
    pub fn report<E>(&self, error: &E) -> ErrorRecord
    where
        E: Error + 'static,
    {
        self.handle_error(error, ErrorCategory::default(), ErrorSeverity::default(), ErrorContext::new())
    }

    /// Number of records dropped because the dispatch queue was full.
    pub fn dropped_records(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Stop accepting records and wait until queued ones are dispatched.
    pub async fn shutdown(&self) {
        drop(self.sender.lock().take());
        let worker = self.worker.lock().take();
        if let Some(worker) = worker {
            if let Err(err) = worker.await {
                error!(error = %err, "error dispatch worker terminated abnormally");
            }
        }
    }

    fn dispatch(&self, record: ErrorRecord) {
        let sender = self.sender.lock();
        let Some(tx) = sender.as_ref() else {
            return;
        };

        match tx.try_send(record) {
            Ok(()) => {}
            Err(TrySendError::Full(record)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(error_id = %record.id, "error dispatch queue full; record dropped");
            }
            Err(TrySendError::Closed(record)) => {
                debug!(error_id = %record.id, "error dispatch worker stopped; record not forwarded");
            }
        }
    }
}

fn build_record(
    error: &(dyn Error + 'static),
    category: ErrorCategory,
    severity: ErrorSeverity,
    mut context: ErrorContext,
) -> ErrorRecord {
    let now = epoch_millis();
    if context.timestamp.is_none() {
        context.timestamp = Some(Utc::now());
    }

    let message = match error.to_string() {
        message if message.is_empty() => UNKNOWN_ERROR_MESSAGE.to_string(),
        message => message,
    };

    ErrorRecord {
        id: ids::error_id(now),
        code: error_code(category, severity, now),
        is_retryable: is_retryable(&message, category),
        user_message: user_message(category, severity).to_string(),
        stack: render_source_chain(error),
        message,
        category,
        severity,
        context,
    }
}

fn log_record(record: &ErrorRecord) {
    let category = record.category.as_str();
    let severity = record.severity.as_str();
    match record.severity {
        ErrorSeverity::Critical | ErrorSeverity::High => error!(
            error_id = %record.id,
            code = %record.code,
            category,
            severity,
            retryable = record.is_retryable,
            error_message = %record.message,
            "error_handled"
        ),
        ErrorSeverity::Medium => warn!(
            error_id = %record.id,
            code = %record.code,
            category,
            severity,
            retryable = record.is_retryable,
            error_message = %record.message,
            "error_handled"
        ),
        ErrorSeverity::Low => info!(
            error_id = %record.id,
            code = %record.code,
            category,
            severity,
            error_message = %record.message,
            "error_handled"
        ),
    }
}

/// Background side of the handler; owns the adapters.
struct Dispatcher {
    sinks: Vec<Arc<dyn MonitoringSink>>,
    notifiers: Vec<Arc<dyn CriticalAlertNotifier>>,
    analytics: Option<Arc<AnalyticsService>>,
    sink_timeout: Duration,
}

impl Dispatcher {
    fn is_empty(&self) -> bool {
        self.sinks.is_empty() && self.notifiers.is_empty() && self.analytics.is_none()
    }

    async fn run(self, mut rx: mpsc::Receiver<ErrorRecord>) {
        while let Some(record) = rx.recv().await {
            self.dispatch(&record).await;
        }
        debug!("error dispatch worker drained");
    }

    async fn dispatch(&self, record: &ErrorRecord) {
        let level = monitoring_level(record.severity);

        for sink in &self.sinks {
            match tokio::time::timeout(self.sink_timeout, sink.capture(record)).await {
                Ok(Ok(())) => debug!(sink = sink.name(), error_id = %record.id, level, "error_forwarded"),
                Ok(Err(err)) => {
                    warn!(sink = sink.name(), error = %err, "failed to send error to monitoring");
                }
                Err(_) => warn!(sink = sink.name(), "monitoring sink timed out"),
            }
        }

        if let Some(analytics) = &self.analytics {
            analytics.track_error(record).await;
        }

        if record.is_critical() {
            for notifier in &self.notifiers {
                match tokio::time::timeout(self.sink_timeout, notifier.notify(record)).await {
                    Ok(Ok(())) => info!(notifier = notifier.name(), error_id = %record.id, "critical_alert_sent"),
                    Ok(Err(err)) => {
                        error!(notifier = notifier.name(), error = %err, "failed to handle critical error");
                    }
                    Err(_) => error!(notifier = notifier.name(), "critical alert notifier timed out"),
                }
            }
        }
    }
}
