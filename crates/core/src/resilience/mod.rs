//! Retry and graceful degradation

pub mod engine;

pub use engine::{RetryEngine, RetryFailure, RetryOptions};
