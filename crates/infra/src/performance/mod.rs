//! Background performance reporting

pub mod reporter;

pub use reporter::PerformanceReporter;
