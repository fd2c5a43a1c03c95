//! Performance collection and asset optimization

pub mod collector;
pub mod image;

pub use collector::{PerformanceCollector, PerformanceEvent, ResourceThresholds};
pub use image::{optimize_image_url, ImageFormat, ImageOptions};
