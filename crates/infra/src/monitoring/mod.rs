//! Error monitoring and critical alert adapters

pub mod sentry;
pub mod webhook;

pub use sentry::{SentryDsn, SentrySink};
pub use webhook::WebhookNotifier;
