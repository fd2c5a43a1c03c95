//! # BiteBase Domain
//!
//! Business domain types and models for the BiteBase service layer.
//!
//! This crate contains:
//! - The error taxonomy (categories, severities, context, records)
//! - Domain error types and Result definitions
//! - Analytics and performance data types
//! - Configuration structures
//!
//! ## Architecture
//! - No dependencies on other BiteBase crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
