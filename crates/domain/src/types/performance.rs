//! Rolling performance snapshot
//!
//! Timing fields are milliseconds; `cumulative_layout_shift` is unitless.
//! A field stays `None` until the first matching measurement arrives.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_load_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_contentful_paint: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub largest_contentful_paint: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_input_delay: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cumulative_layout_shift: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_to_interactive: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_response_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub render_time: Option<f64>,
}

impl PerformanceSnapshot {
    /// `true` when no metric has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.page_load_time.is_none()
            && self.first_contentful_paint.is_none()
            && self.largest_contentful_paint.is_none()
            && self.first_input_delay.is_none()
            && self.cumulative_layout_shift.is_none()
            && self.time_to_interactive.is_none()
            && self.api_response_time.is_none()
            && self.render_time.is_none()
    }

    /// Flatten the recorded fields into an analytics property map.
    pub fn to_properties(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}
