//! Retry and fallback engine on top of the error taxonomy
//!
//! Every failed attempt is classified through the [`ErrorHandler`]; the
//! resulting record's `is_retryable` flag gates the next attempt, so a
//! validation failure stops after one call while network failures back off
//! and retry.

use std::error::Error;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bitebase_common::resilience::{
    BackoffStrategy, Jitter, RetryConfig, RetryDecision, RetryError, RetryExecutor, RetryPolicy,
};
use bitebase_domain::constants::{
    DEFAULT_BACKOFF_MULTIPLIER, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY_MS,
};
use bitebase_domain::{BiteBaseError, CategorizedError, ErrorCategory, ErrorContext, ErrorSeverity};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::errors::ErrorHandler;

/// Failure of a retried operation
#[derive(Debug, Error)]
pub enum RetryFailure<E> {
    /// The last attempt's error, unchanged
    #[error(transparent)]
    Failed(E),

    /// The cancellation token fired during an attempt or a backoff sleep
    #[error("operation cancelled after {attempts} attempts")]
    Cancelled { attempts: u32 },

    /// The retry options could not be turned into a valid schedule
    #[error("invalid retry options: {0}")]
    InvalidOptions(String),
}

impl<E> RetryFailure<E> {
    /// Whether the token stopped the operation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// The operation's error, `None` when cancelled.
    pub fn into_failed(self) -> Option<E> {
        match self {
            Self::Failed(error) => Some(error),
            Self::Cancelled { .. } | Self::InvalidOptions(_) => None,
        }
    }
}

impl From<RetryFailure<BiteBaseError>> for BiteBaseError {
    fn from(failure: RetryFailure<BiteBaseError>) -> Self {
        match failure {
            RetryFailure::Failed(error) => error,
            RetryFailure::Cancelled { attempts } => {
                BiteBaseError::Cancelled(format!("retry cancelled after {attempts} attempts"))
            }
            RetryFailure::InvalidOptions(message) => BiteBaseError::Config(message),
        }
    }
}

/// Options of a single `retry_operation` call.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryOptions {
    /// Total attempts, including the first one
    pub max_retries: u32,
    /// Delay before the second attempt
    pub delay: Duration,
    /// Factor applied to the delay after each failure
    pub backoff_multiplier: f64,
    /// Upper bound on a single backoff delay
    pub max_delay: Option<Duration>,
    /// Randomisation on top of each delay
    pub jitter: Jitter,
    /// Overrides the category the error reports itself
    pub category: Option<ErrorCategory>,
    /// Severity reported for the final failure
    pub severity: ErrorSeverity,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            max_delay: None,
            jitter: Jitter::None,
            category: None,
            severity: ErrorSeverity::Medium,
        }
    }
}

impl RetryOptions {
    /// Options with the given attempts and schedule.
    pub fn new(max_retries: u32, delay: Duration, backoff_multiplier: f64) -> Self {
        Self { max_retries, delay, backoff_multiplier, ..Self::default() }
    }

    /// Report failures under `category`.
    pub fn with_category(mut self, category: ErrorCategory) -> Self {
        self.category = Some(category);
        self
    }

    /// Report the final failure with `severity`.
    pub fn with_severity(mut self, severity: ErrorSeverity) -> Self {
        self.severity = severity;
        self
    }

    /// Cap each backoff delay.
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = Some(max_delay);
        self
    }

    /// Randomise delays.
    pub fn with_jitter(mut self, jitter: Jitter) -> Self {
        self.jitter = jitter;
        self
    }

    fn to_config(&self) -> RetryConfig {
        let base = if self.backoff_multiplier.is_finite() && self.backoff_multiplier > 0.0 {
            self.backoff_multiplier
        } else {
            DEFAULT_BACKOFF_MULTIPLIER
        };

        RetryConfig {
            max_attempts: self.max_retries.max(1),
            backoff: BackoffStrategy::Exponential {
                initial_delay: self.delay,
                base,
                max_delay: self.max_delay.unwrap_or(Duration::MAX),
            },
            jitter: self.jitter,
            max_total_time: None,
        }
    }
}

/// Classifies each failed attempt through the error handler.
struct TaxonomyPolicy<'a> {
    handler: &'a ErrorHandler,
    options: &'a RetryOptions,
}

impl<E> RetryPolicy<E> for TaxonomyPolicy<'_>
where
    E: Error + CategorizedError + 'static,
{
    fn should_retry(&self, error: &E, attempt: u32) -> RetryDecision {
        let category = self.options.category.unwrap_or_else(|| error.category());
        let context = ErrorContext::new()
            .with_data("attempt", attempt)
            .with_data("maxRetries", self.options.max_retries.max(1));
        let record = self.handler.handle_error(error, category, self.options.severity, context);

        if record.is_retryable {
            RetryDecision::Retry
        } else {
            RetryDecision::Stop
        }
    }
}

/// Retry/fallback engine
#[derive(Debug, Clone)]
pub struct RetryEngine {
    handler: Arc<ErrorHandler>,
}

impl RetryEngine {
    /// Engine reporting exhausted operations to `handler`.
    pub fn new(handler: Arc<ErrorHandler>) -> Self {
        Self { handler }
    }

    /// Handler that receives final failures.
    pub fn handler(&self) -> &Arc<ErrorHandler> {
        &self.handler
    }

    /// Run `operation` until it succeeds, its error is classified as not
    /// retryable, or `options.max_retries` attempts have failed.
    ///
    /// The delay before attempt `n + 1` is
    /// `delay * backoff_multiplier^(n - 1)`.
    pub async fn retry_operation<F, Fut, T, E>(
        &self,
        operation: F,
        options: &RetryOptions,
    ) -> Result<T, RetryFailure<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Error + CategorizedError + 'static,
    {
        let executor = self.executor(options);
        executor.execute(operation).await.map_err(into_failure)
    }

    /// [`RetryEngine::retry_operation`] that stops as soon as `token` fires,
    /// interrupting the in-flight attempt or the backoff sleep.
    pub async fn retry_operation_with_cancellation<F, Fut, T, E>(
        &self,
        token: &CancellationToken,
        operation: F,
        options: &RetryOptions,
    ) -> Result<T, RetryFailure<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Error + CategorizedError + 'static,
    {
        let executor = self.executor(options);
        executor.execute_with_cancellation(token, operation).await.map_err(into_failure)
    }

    /// Run `primary`; on failure record the error with `fallbackUsed = true`
    /// and return whatever `fallback` produces.
    pub async fn with_fallback<P, PFut, F, FFut, T, E>(
        &self,
        primary: P,
        fallback: F,
        category: Option<ErrorCategory>,
    ) -> Result<T, E>
    where
        P: FnOnce() -> PFut,
        PFut: Future<Output = Result<T, E>>,
        F: FnOnce() -> FFut,
        FFut: Future<Output = Result<T, E>>,
        E: Error + 'static,
    {
        match primary().await {
            Ok(value) => Ok(value),
            Err(error) => {
                self.handler.handle_error(
                    &error,
                    category.unwrap_or(ErrorCategory::ExternalService),
                    ErrorSeverity::Medium,
                    ErrorContext::new().with_data("fallbackUsed", true),
                );
                debug!("primary operation failed; using fallback");
                fallback().await
            }
        }
    }

    fn executor<'a>(&'a self, options: &'a RetryOptions) -> RetryExecutor<TaxonomyPolicy<'a>> {
        RetryExecutor::new(options.to_config(), TaxonomyPolicy { handler: &self.handler, options })
    }
}

fn into_failure<E>(error: RetryError<E>) -> RetryFailure<E> {
    match error {
        RetryError::Exhausted { source, .. }
        | RetryError::NonRetryable { source, .. }
        | RetryError::TimeoutExceeded { source, .. } => RetryFailure::Failed(source),
        RetryError::Cancelled { attempts } => RetryFailure::Cancelled { attempts },
        RetryError::InvalidConfiguration { message } => RetryFailure::InvalidOptions(message),
    }
}
