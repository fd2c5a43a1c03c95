//! Generic retry executor with backoff, jitter and cancellation
//!
//! [`RetryExecutor`] repeats an async operation until it succeeds or one of
//! these stops it: the [`RetryPolicy`] answers [`RetryDecision::Stop`], the
//! attempt budget runs out, the next sleep would overrun `max_total_time`, or
//! a [`CancellationToken`] fires. Except for cancellation, every
//! [`RetryError`] carries the operation's last error untouched.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use rand::Rng;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::error::ErrorClassification;

#[derive(Debug, Error)]
pub enum RetryError<E> {
    #[error("gave up after {attempts} attempts: {source}")]
    Exhausted { attempts: u32, source: E },

    /// The policy refused another attempt
    #[error("not retried after attempt {attempts}: {source}")]
    NonRetryable { attempts: u32, source: E },

    /// The next backoff would overrun `max_total_time`
    #[error("retry budget of {elapsed:?} spent: {source}")]
    TimeoutExceeded { elapsed: Duration, attempts: u32, source: E },

    #[error("cancelled after {attempts} attempts")]
    Cancelled { attempts: u32 },

    #[error("invalid retry configuration: {message}")]
    InvalidConfiguration { message: String },
}

impl<E> RetryError<E> {
    /// Attempts started before giving up.
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Exhausted { attempts, .. }
            | Self::NonRetryable { attempts, .. }
            | Self::TimeoutExceeded { attempts, .. }
            | Self::Cancelled { attempts } => *attempts,
            Self::InvalidConfiguration { .. } => 0,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    pub fn source_error(&self) -> Option<&E> {
        match self {
            Self::Exhausted { source, .. }
            | Self::NonRetryable { source, .. }
            | Self::TimeoutExceeded { source, .. } => Some(source),
            Self::Cancelled { .. } | Self::InvalidConfiguration { .. } => None,
        }
    }

    pub fn into_source(self) -> Option<E> {
        match self {
            Self::Exhausted { source, .. }
            | Self::NonRetryable { source, .. }
            | Self::TimeoutExceeded { source, .. } => Some(source),
            Self::Cancelled { .. } | Self::InvalidConfiguration { .. } => None,
        }
    }
}

pub type RetryResult<T, E> = Result<T, RetryError<E>>;

/// Decides after each failure whether another attempt follows.
///
/// Consulted after every failed attempt including the last, so an
/// implementation can also observe failures. Plain functions and closures
/// `Fn(&E, u32) -> RetryDecision` are policies.
pub trait RetryPolicy<E> {
    /// `attempt` is the 1-based number of the attempt that just failed.
    fn should_retry(&self, error: &E, attempt: u32) -> RetryDecision;
}

impl<E, F> RetryPolicy<E> for F
where
    F: Fn(&E, u32) -> RetryDecision,
{
    fn should_retry(&self, error: &E, attempt: u32) -> RetryDecision {
        self(error, attempt)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Sleep for the configured backoff first
    Retry,
    /// Sleep for exactly this long first
    RetryAfter(Duration),
    Stop,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BackoffStrategy {
    Fixed(Duration),
    /// `initial_delay * base^retry`, never above `max_delay`
    Exponential { initial_delay: Duration, base: f64, max_delay: Duration },
}

impl BackoffStrategy {
    /// Delay before retry number `retry`, counted from 0. The sleep after
    /// the n-th failed attempt therefore uses `retry = n - 1`.
    pub fn calculate_delay(&self, retry: u32) -> Duration {
        match self {
            Self::Fixed(delay) => *delay,
            Self::Exponential { initial_delay, base, max_delay } => {
                let exponent = i32::try_from(retry).unwrap_or(i32::MAX);
                let cap = u64::try_from(max_delay.as_millis()).unwrap_or(u64::MAX);
                // Millisecond delays stay far below 2^52; the product is
                // clamped into [0, cap] before converting back.
                #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let millis = (initial_delay.as_millis() as f64 * base.powi(exponent)).clamp(0.0, cap as f64) as u64;
                Duration::from_millis(millis)
            }
        }
    }
}

/// Randomisation applied on top of the backoff delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Jitter {
    #[default]
    None,
    /// Uniform in `[0, delay]`
    Full,
    /// Uniform in `[delay / 2, delay]`
    Equal,
}

impl Jitter {
    pub fn apply(&self, delay: Duration) -> Duration {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        match self {
            Self::None => delay,
            Self::Full => Duration::from_millis(uniform_up_to(millis)),
            Self::Equal => {
                let floor = millis / 2;
                Duration::from_millis(floor + uniform_up_to(millis - floor))
            }
        }
    }
}

fn uniform_up_to(max: u64) -> u64 {
    if max == 0 {
        return 0;
    }
    rand::thread_rng().gen_range(0..=max)
}

/// Attempt limit, backoff schedule and time budget
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Including the first attempt
    pub max_attempts: u32,
    pub backoff: BackoffStrategy,
    pub jitter: Jitter,
    /// Wall-clock budget across attempts and sleeps
    pub max_total_time: Option<Duration>,
}

/// Three attempts, 1s then 2s apart.
impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: BackoffStrategy::Exponential {
                initial_delay: Duration::from_millis(1000),
                base: 2.0,
                max_delay: Duration::from_secs(30),
            },
            jitter: Jitter::None,
            max_total_time: None,
        }
    }
}

impl RetryConfig {
    /// Start from [`RetryConfig::default`].
    pub fn builder() -> RetryConfigBuilder {
        RetryConfigBuilder::default()
    }

    /// # Errors
    /// [`RetryError::InvalidConfiguration`] for zero attempts or a
    /// non-positive exponential base.
    pub fn validate(&self) -> Result<(), RetryError<()>> {
        let invalid = |message: &str| Err(RetryError::InvalidConfiguration { message: message.into() });
        if self.max_attempts == 0 {
            return invalid("max_attempts must be at least 1");
        }
        match &self.backoff {
            BackoffStrategy::Exponential { base, .. } if !base.is_finite() || *base <= 0.0 => {
                invalid("exponential base must be finite and positive")
            }
            _ => Ok(()),
        }
    }
}

/// Builder for [`RetryConfig`], validated on [`build`](Self::build)
#[derive(Debug, Default)]
pub struct RetryConfigBuilder {
    config: RetryConfig,
}

impl RetryConfigBuilder {
    /// Total attempts including the first.
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.config.max_attempts = attempts;
        self
    }

    /// Sleep `delay` between attempts.
    pub fn fixed_backoff(mut self, delay: Duration) -> Self {
        self.config.backoff = BackoffStrategy::Fixed(delay);
        self
    }

    /// Sleep `initial_delay * base^retry`, capped at `max_delay`.
    pub fn exponential_backoff(mut self, initial_delay: Duration, base: f64, max_delay: Duration) -> Self {
        self.config.backoff = BackoffStrategy::Exponential { initial_delay, base, max_delay };
        self
    }

    /// Randomise each delay.
    pub fn jitter(mut self, jitter: Jitter) -> Self {
        self.config.jitter = jitter;
        self
    }

    /// Stop before a sleep would overrun `budget`.
    pub fn max_total_time(mut self, budget: Duration) -> Self {
        self.config.max_total_time = Some(budget);
        self
    }

    /// # Errors
    /// [`RetryError::InvalidConfiguration`] when validation fails.
    pub fn build(self) -> Result<RetryConfig, RetryError<()>> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Runs an operation under a [`RetryConfig`] and a [`RetryPolicy`]
#[derive(Debug, Clone)]
pub struct RetryExecutor<P> {
    config: RetryConfig,
    policy: P,
}

impl<P> RetryExecutor<P> {
    /// Executor for `config` deciding with `policy`.
    pub fn new(config: RetryConfig, policy: P) -> Self {
        Self { config, policy }
    }

    /// Executor with the default schedule.
    pub fn with_policy(policy: P) -> Self {
        Self::new(RetryConfig::default(), policy)
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    pub async fn execute<F, Fut, T, E>(&self, operation: F) -> RetryResult<T, E>
    where
        P: RetryPolicy<E>,
        E: fmt::Debug,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.run(operation, None).await
    }

    /// Like [`execute`](Self::execute), but `token` aborts an in-flight
    /// attempt or a backoff sleep with [`RetryError::Cancelled`].
    pub async fn execute_with_cancellation<F, Fut, T, E>(
        &self,
        token: &CancellationToken,
        operation: F,
    ) -> RetryResult<T, E>
    where
        P: RetryPolicy<E>,
        E: fmt::Debug,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.run(operation, Some(token)).await
    }

    #[instrument(skip_all, fields(max_attempts = self.config.max_attempts))]
    async fn run<F, Fut, T, E>(&self, mut operation: F, token: Option<&CancellationToken>) -> RetryResult<T, E>
    where
        P: RetryPolicy<E>,
        E: fmt::Debug,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let max_attempts = self.config.max_attempts.max(1);
        let started = Instant::now();
        let mut attempt: u32 = 0;

        loop {
            if token.is_some_and(CancellationToken::is_cancelled) {
                return Err(RetryError::Cancelled { attempts: attempt });
            }
            attempt += 1;

            let outcome = match token {
                Some(token) => tokio::select! {
                    biased;
                    () = token.cancelled() => {
                        debug!(attempt, "cancelled mid-attempt");
                        return Err(RetryError::Cancelled { attempts: attempt });
                    }
                    outcome = operation() => outcome,
                },
                None => operation().await,
            };

            let error = match outcome {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(attempt, "succeeded after retrying");
                    }
                    return Ok(value);
                }
                Err(error) => error,
            };

            let delay = match self.policy.should_retry(&error, attempt) {
                RetryDecision::Stop => {
                    debug!(attempt, ?error, "policy stopped retrying");
                    return Err(RetryError::NonRetryable { attempts: attempt, source: error });
                }
                _ if attempt >= max_attempts => {
                    warn!(attempts = attempt, ?error, "retry attempts exhausted");
                    return Err(RetryError::Exhausted { attempts: attempt, source: error });
                }
                RetryDecision::RetryAfter(hint) => hint,
                RetryDecision::Retry => self.config.jitter.apply(self.config.backoff.calculate_delay(attempt - 1)),
            };

            if let Some(budget) = self.config.max_total_time {
                let elapsed = started.elapsed();
                if elapsed.saturating_add(delay) > budget {
                    warn!(attempts = attempt, ?elapsed, ?budget, "retry budget spent");
                    return Err(RetryError::TimeoutExceeded { elapsed, attempts: attempt, source: error });
                }
            }

            debug!(attempt, ?delay, "backing off");
            match token {
                Some(token) => tokio::select! {
                    biased;
                    () = token.cancelled() => {
                        debug!(attempt, "cancelled during backoff");
                        return Err(RetryError::Cancelled { attempts: attempt });
                    }
                    () = tokio::time::sleep(delay) => {}
                },
                None => tokio::time::sleep(delay).await,
            }
        }
    }
}

pub mod policies {
    use super::{ErrorClassification, RetryDecision, RetryPolicy};

    /// Retries errors that classify themselves as retryable, sleeping for
    /// their `retry_after` hint when they give one.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct ClassifiedRetry;

    impl<E: ErrorClassification> RetryPolicy<E> for ClassifiedRetry {
        fn should_retry(&self, error: &E, _attempt: u32) -> RetryDecision {
            if !error.is_retryable() {
                return RetryDecision::Stop;
            }
            error.retry_after().map_or(RetryDecision::Retry, RetryDecision::RetryAfter)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use super::policies::ClassifiedRetry;
    use super::*;
    use crate::error::CommonError;

    fn always<E>(_: &E, _: u32) -> RetryDecision {
        RetryDecision::Retry
    }

    fn never<E>(_: &E, _: u32) -> RetryDecision {
        RetryDecision::Stop
    }

    fn fast_config(max_attempts: u32) -> RetryConfig {
        RetryConfig::builder().max_attempts(max_attempts).fixed_backoff(Duration::from_millis(1)).build().unwrap()
    }

    /// Validates `BackoffStrategy::Exponential` for the default multiplier.
    ///
    /// Assertions:
    /// - Confirms delays double from the initial delay.
    /// - Ensures the delay is capped at `max_delay`.
    #[test]
    fn test_exponential_backoff_doubles_then_caps() {
        let strategy = BackoffStrategy::Exponential {
            initial_delay: Duration::from_millis(1000),
            base: 2.0,
            max_delay: Duration::from_secs(10),
        };

        let delays: Vec<_> = (0..3).map(|retry| strategy.calculate_delay(retry)).collect();
        assert_eq!(delays, [1000, 2000, 4000].map(Duration::from_millis));
        assert_eq!(strategy.calculate_delay(20), Duration::from_secs(10));
    }

    #[test]
    fn test_extreme_backoff_saturates_at_cap() {
        let strategy = BackoffStrategy::Exponential {
            initial_delay: Duration::from_secs(u64::MAX / 1000),
            base: 10.0,
            max_delay: Duration::MAX,
        };
        assert_eq!(strategy.calculate_delay(u32::MAX), Duration::from_millis(u64::MAX));

        let equal = Jitter::Equal.apply(Duration::MAX);
        assert!(equal >= Duration::from_millis(u64::MAX / 2));
    }

    #[test]
    fn test_jitter_stays_in_range() {
        let delay = Duration::from_millis(1000);
        assert_eq!(Jitter::None.apply(delay), delay);
        assert_eq!(Jitter::Full.apply(Duration::ZERO), Duration::ZERO);

        for _ in 0..50 {
            assert!(Jitter::Full.apply(delay) <= delay);
            let equal = Jitter::Equal.apply(delay);
            assert!(equal >= Duration::from_millis(500) && equal <= delay);
        }
    }

    #[test]
    fn test_invalid_configs_rejected() {
        assert!(RetryConfig::builder().max_attempts(0).build().is_err());
        assert!(RetryConfig::builder()
            .exponential_backoff(Duration::from_millis(1), f64::NAN, Duration::from_secs(1))
            .build()
            .is_err());
        assert!(RetryConfig::default().validate().is_ok());
    }

    #[tokio::test]
    async fn test_exhausted_carries_last_error() {
        let executor = RetryExecutor::new(fast_config(3), always::<String>);
        let calls = Arc::new(AtomicU32::new(0));

        let counter = calls.clone();
        let result: RetryResult<(), String> = executor
            .execute(|| {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                async move { Err(format!("failure {n}")) }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(
            matches!(&result, Err(RetryError::Exhausted { attempts: 3, source }) if source == "failure 3"),
            "got {result:?}"
        );
    }

    #[tokio::test]
    async fn test_stop_decision_short_circuits() {
        let executor = RetryExecutor::new(fast_config(5), never::<&str>);
        let calls = AtomicU32::new(0);

        let result: RetryResult<(), &str> = executor
            .execute(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err("invalid") }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(RetryError::NonRetryable { attempts: 1, source: "invalid" })));
    }

    /// Validates that a closure policy sees the final failure too.
    #[tokio::test]
    async fn test_policy_observes_every_failure() {
        let seen = AtomicU32::new(0);
        let policy = |_: &&str, attempt: u32| {
            seen.store(attempt, Ordering::SeqCst);
            RetryDecision::Retry
        };
        let executor = RetryExecutor::new(fast_config(4), policy);

        let _ = executor.execute(|| async { Err::<(), _>("down") }).await;

        assert_eq!(seen.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_recovers_on_third_attempt() {
        let executor = RetryExecutor::new(fast_config(3), always::<&str>);
        let calls = AtomicU32::new(0);

        let result: RetryResult<u32, &str> = executor
            .execute(|| {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    if n < 3 {
                        Err("flaky")
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 3);
    }

    /// Validates the default schedule against paused time: 1s then 2s.
    #[tokio::test(start_paused = true)]
    async fn test_default_schedule_elapses_three_seconds() {
        let executor = RetryExecutor::with_policy(always::<&str>);
        let start = Instant::now();

        let result: RetryResult<(), &str> = executor.execute(|| async { Err("timeout") }).await;

        assert!(matches!(result, Err(RetryError::Exhausted { attempts: 3, .. })));
        assert_eq!(start.elapsed(), Duration::from_millis(3000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_during_backoff() {
        let executor = RetryExecutor::with_policy(always::<&str>);
        let token = CancellationToken::new();
        let calls = AtomicU32::new(0);

        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            canceller.cancel();
        });

        let result: RetryResult<(), &str> = executor
            .execute_with_cancellation(&token, || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err("network down") }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let err = result.unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(err.attempts(), 1);
        assert!(err.source_error().is_none());
    }

    #[tokio::test]
    async fn test_cancelled_token_prevents_first_attempt() {
        let executor = RetryExecutor::new(fast_config(3), always::<&str>);
        let token = CancellationToken::new();
        token.cancel();

        let result: RetryResult<(), &str> = executor.execute_with_cancellation(&token, || async { Ok(()) }).await;

        assert!(matches!(result, Err(RetryError::Cancelled { attempts: 0 })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_time_budget_stops_before_sleeping() {
        let config = RetryConfig::builder()
            .max_attempts(10)
            .fixed_backoff(Duration::from_secs(2))
            .max_total_time(Duration::from_secs(3))
            .build()
            .unwrap();
        let executor = RetryExecutor::new(config, always::<&str>);

        let result: RetryResult<(), &str> = executor.execute(|| async { Err("slow") }).await;

        assert!(
            matches!(result, Err(RetryError::TimeoutExceeded { attempts: 2, source: "slow", .. })),
            "got {result:?}"
        );
    }

    #[tokio::test]
    async fn test_classified_policy_stops_on_validation() {
        let executor = RetryExecutor::new(fast_config(3), ClassifiedRetry);
        let calls = AtomicU32::new(0);

        let result: RetryResult<(), CommonError> = executor
            .execute(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(CommonError::validation("email", "malformed")) }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(RetryError::NonRetryable { .. })));
    }
}
