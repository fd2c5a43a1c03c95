//! Keyed fixed-window rate limiting
//!
//! Each key owns one window. The first hit (or the first hit after the window
//! has elapsed) opens a window with a count of one; further hits increment the
//! count until it reaches the limit, after which hits are rejected until the
//! window resets. Rejected hits do not extend the window.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, warn};

use super::{Clock, SystemClock};
use crate::error::{CommonError, CommonResult};

/// Outcome of an accepted hit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    /// Hits still allowed in the current window
    pub remaining: u32,
    /// Time until the current window resets
    pub reset_after: Duration,
}

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    opened_at: Instant,
    length: Duration,
}

impl Window {
    /// Time left before the window resets; `None` once it has elapsed.
    ///
    /// Computed from elapsed time so arbitrarily long windows never overflow
    /// the clock.
    fn remaining(&self, now: Instant) -> Option<Duration> {
        let left = self.length.saturating_sub(now.saturating_duration_since(self.opened_at));
        (!left.is_zero()).then_some(left)
    }
}

/// Fixed-window rate limiter keyed by arbitrary strings
///
/// The limit and window are supplied per call so one limiter can serve
/// several presets (login, registration, API keys).
#[derive(Debug)]
pub struct FixedWindowRateLimiter<C: Clock = SystemClock> {
    windows: Mutex<HashMap<String, Window>>,
    clock: C,
}

impl FixedWindowRateLimiter<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for FixedWindowRateLimiter<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> FixedWindowRateLimiter<C> {
    /// Create a limiter reading time from `clock`
    pub fn with_clock(clock: C) -> Self {
        Self { windows: Mutex::new(HashMap::new()), clock }
    }

    /// Register a hit for `key`.
    ///
    /// # Errors
    ///
    /// Returns [`CommonError::RateLimitExceeded`] when the key already used
    /// `max_attempts` hits in the current window, or
    /// [`CommonError::Validation`] when `max_attempts` is zero or `window` is
    /// empty.
    pub fn check(
        &self,
        key: &str,
        max_attempts: u32,
        window: Duration,
    ) -> CommonResult<RateLimitDecision> {
        if max_attempts == 0 {
            return Err(CommonError::validation("max_attempts", "must be greater than 0"));
        }
        if window.is_zero() {
            return Err(CommonError::validation("window", "must be greater than zero"));
        }

        let now = self.clock.now();
        let mut windows = self.windows.lock();

        if let Some(current) = windows.get_mut(key) {
            if let Some(reset_after) = current.remaining(now) {
                if current.count >= max_attempts {
                    warn!(key, limit = max_attempts, "rate limit exceeded");
                    return Err(CommonError::rate_limited(
                        key,
                        max_attempts,
                        window,
                        Some(reset_after),
                    ));
                }
                current.count += 1;
                return Ok(RateLimitDecision { remaining: max_attempts - current.count, reset_after });
            }
        }

        debug!(key, "opening rate limit window");
        windows.insert(key.to_string(), Window { count: 1, opened_at: now, length: window });
        Ok(RateLimitDecision { remaining: max_attempts - 1, reset_after: window })
    }

    /// Forget the window for `key`, e.g. after a successful login
    pub fn reset(&self, key: &str) {
        self.windows.lock().remove(key);
    }

    /// Drop every window that has already elapsed, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut windows = self.windows.lock();
        let before = windows.len();
        windows.retain(|_, window| window.remaining(now).is_some());
        before - windows.len()
    }

    /// Number of keys currently tracked
    pub fn tracked_keys(&self) -> usize {
        self.windows.lock().len()
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for resilience::rate_limiter.
    use super::*;
    use crate::error::ErrorClassification;
    use crate::resilience::MockClock;

    const WINDOW: Duration = Duration::from_secs(900);

    /// Validates `FixedWindowRateLimiter::check` behavior for the login
    /// preset limits.
    ///
    /// Assertions:
    /// - Confirms five hits are accepted with a shrinking `remaining`.
    /// - Ensures the sixth hit is rejected with a `retry_after` hint.
    #[test]
    fn test_allows_limit_then_rejects() {
        let limiter = FixedWindowRateLimiter::with_clock(MockClock::new());

        for expected_remaining in (0..5).rev() {
            let decision = limiter.check("login:alice", 5, WINDOW).unwrap();
            assert_eq!(decision.remaining, expected_remaining);
        }

        match limiter.check("login:alice", 5, WINDOW) {
            Err(CommonError::RateLimitExceeded { limit, retry_after, .. }) => {
                assert_eq!(limit, 5);
                assert_eq!(retry_after, Some(WINDOW));
            }
            other => panic!("expected rate limit error, got {other:?}"),
        }
    }

    #[test]
    fn test_window_reopens_after_expiry() {
        let clock = MockClock::new();
        let limiter = FixedWindowRateLimiter::with_clock(clock.clone());

        limiter.check("register:10.0.0.1", 1, WINDOW).unwrap();
        assert!(limiter.check("register:10.0.0.1", 1, WINDOW).is_err());

        clock.advance(WINDOW);

        let decision = limiter.check("register:10.0.0.1", 1, WINDOW).unwrap();
        assert_eq!(decision.remaining, 0);
        assert_eq!(decision.reset_after, WINDOW);
    }

    #[test]
    fn test_rejected_hits_do_not_extend_window() {
        let clock = MockClock::new();
        let limiter = FixedWindowRateLimiter::with_clock(clock.clone());

        limiter.check("k", 1, WINDOW).unwrap();
        clock.advance_secs(600);
        let err = limiter.check("k", 1, WINDOW).unwrap_err();
        assert_eq!(err.retry_after(), Some(Duration::from_secs(300)));
    }

    #[test]
    fn test_unbounded_window_does_not_overflow() {
        let clock = MockClock::new();
        let limiter = FixedWindowRateLimiter::with_clock(clock.clone());
        let forever = Duration::from_secs(u64::MAX);

        let decision = limiter.check("api_key:k1", 1, forever).unwrap();
        assert_eq!(decision.reset_after, forever);

        clock.advance_secs(365 * 24 * 3600);
        let err = limiter.check("api_key:k1", 1, forever).unwrap_err();
        assert!(err.retry_after().is_some_and(|left| left < forever));
        assert_eq!(limiter.purge_expired(), 0);
    }

    #[test]
    fn test_keys_are_independent() {
        let limiter = FixedWindowRateLimiter::with_clock(MockClock::new());

        limiter.check("a", 1, WINDOW).unwrap();
        assert!(limiter.check("a", 1, WINDOW).is_err());
        assert!(limiter.check("b", 1, WINDOW).is_ok());
        assert_eq!(limiter.tracked_keys(), 2);

        limiter.reset("a");
        assert!(limiter.check("a", 1, WINDOW).is_ok());
    }

    #[test]
    fn test_purge_expired_and_validation() {
        let clock = MockClock::new();
        let limiter = FixedWindowRateLimiter::with_clock(clock.clone());

        limiter.check("short", 3, Duration::from_secs(1)).unwrap();
        limiter.check("long", 3, WINDOW).unwrap();
        clock.advance_secs(2);

        assert_eq!(limiter.purge_expired(), 1);
        assert_eq!(limiter.tracked_keys(), 1);
        assert!(matches!(
            limiter.check("x", 0, WINDOW),
            Err(CommonError::Validation { .. })
        ));
    }
}
