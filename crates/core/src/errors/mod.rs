//! Error taxonomy service
//!
//! Turns raw errors into classified [`ErrorRecord`](bitebase_domain::ErrorRecord)s
//! and forwards them to monitoring, analytics and critical alert channels.

pub mod classification;
pub mod handler;
pub mod ports;

pub use handler::{ErrorHandler, ErrorHandlerBuilder};
pub use ports::{CriticalAlertNotifier, MonitoringSink};
