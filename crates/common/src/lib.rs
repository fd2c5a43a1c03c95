//! Modular common utilities shared across BiteBase crates.
//!
//! Nothing in this crate knows about restaurants, analytics vendors or the
//! error taxonomy; it provides the generic building blocks the service layer
//! is assembled from.
//!
//! # Feature Tiers
//!
//! Enable cargo features to opt into the tiers you need:
//! - `foundation`: errors and error classification
//! - `runtime`: async infrastructure (cache, resilience, crypto, compression)
//! - `observability`: optional tracing (implied by `runtime`)

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

// Foundation tier
// -----------------------------------------------------------------
#[cfg(feature = "foundation")]
pub mod error;

// Runtime tier
// --------------------------------------------------------------------
#[cfg(feature = "runtime")]
pub mod cache;
#[cfg(feature = "runtime")]
pub mod compression;
#[cfg(feature = "runtime")]
pub mod crypto;
#[cfg(feature = "runtime")]
pub mod resilience;

// Re-export commonly used types and traits for convenience
// ------------------------
#[cfg(feature = "runtime")]
pub use cache::{CacheConfig, CacheStats, EvictionPolicy, TaggedCache};
#[cfg(feature = "runtime")]
pub use compression::{CompressionAlgorithm, CompressionService};
#[cfg(feature = "runtime")]
pub use crypto::{CipherService, SealedPayload};
#[cfg(feature = "foundation")]
pub use error::{CommonError, CommonResult, ErrorClassification, ErrorSeverity};
#[cfg(feature = "runtime")]
pub use resilience::{
    BackoffStrategy, Clock, FixedWindowRateLimiter, Jitter, MockClock, RateLimitDecision,
    RetryConfig, RetryConfigBuilder, RetryDecision, RetryError, RetryExecutor, RetryPolicy,
    RetryResult, SystemClock,
};
