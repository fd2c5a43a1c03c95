//! Resilience patterns for fault tolerance and error handling
//!
//! This module provides **generic, reusable** resilience patterns:
//! - **Retry Logic**: configurable backoff and jitter, policy-driven stop
//!   decisions and cooperative cancellation
//! - **Rate Limiting**: keyed fixed windows for brute-force protection
//! - **Clock**: time abstraction shared by the limiter and the cache
//!
//! The implementations are generic over the error type and know nothing
//! about the BiteBase error taxonomy; `bitebase-core` layers that on top.

pub mod clock;
pub mod rate_limiter;
pub mod retry;

pub use clock::{Clock, MockClock, SystemClock};
pub use rate_limiter::{FixedWindowRateLimiter, RateLimitDecision};
pub use retry::{
    policies, BackoffStrategy, Jitter, RetryConfig, RetryConfigBuilder, RetryDecision, RetryError,
    RetryExecutor, RetryPolicy, RetryResult,
};
