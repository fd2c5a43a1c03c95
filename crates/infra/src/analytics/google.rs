//! GA4 Measurement Protocol client
//!
//! `POST {api}/mp/collect?measurement_id=..&api_secret=..`. The endpoint
//! accepts anything and answers 2xx, so only transport and status failures
//! are reported.

use async_trait::async_trait;
use bitebase_core::AnalyticsClient;
use bitebase_domain::{AnalyticsEvent, Result, UserProperties};
use reqwest::Method;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::http::HttpClient;

/// GA4 limits event and parameter names to 40 characters.
const MAX_NAME_LEN: usize = 40;
const MAX_PARAM_VALUE_LEN: usize = 100;
/// GA4 event sent to carry user properties.
const IDENTIFY_EVENT: &str = "login";

/// Sends events to the GA4 Measurement Protocol.
pub struct GoogleAnalyticsClient {
    http: HttpClient,
    endpoint: String,
    measurement_id: String,
    api_secret: String,
}

impl std::fmt::Debug for GoogleAnalyticsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleAnalyticsClient")
            .field("endpoint", &self.endpoint)
            .field("measurement_id", &self.measurement_id)
            .finish_non_exhaustive()
    }
}

impl GoogleAnalyticsClient {
    /// Client for one measurement id.
    pub fn new(
        http: HttpClient,
        api_url: &str,
        measurement_id: impl Into<String>,
        api_secret: impl Into<String>,
    ) -> Self {
        Self {
            http,
            endpoint: format!("{}/mp/collect", api_url.trim_end_matches('/')),
            measurement_id: measurement_id.into(),
            api_secret: api_secret.into(),
        }
    }

    async fn collect(&self, body: Value) -> Result<()> {
        let request = self
            .http
            .request(Method::POST, &self.endpoint)
            .query(&[("measurement_id", &self.measurement_id), ("api_secret", &self.api_secret)])
            .json(&body);

        self.http.send_checked(request).await?;
        debug!(measurement_id = %self.measurement_id, "ga4 payload sent");
        Ok(())
    }
}

/// Replace characters GA4 rejects in names and cap the length.
fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .take(MAX_NAME_LEN)
        .collect()
}

/// GA4 parameters must be scalars; everything else is sent as JSON text.
fn to_params(properties: &Map<String, Value>) -> Map<String, Value> {
    properties
        .iter()
        .filter(|(_, value)| !value.is_null())
        .map(|(key, value)| {
            let value = match value {
                Value::String(text) => Value::from(text.chars().take(MAX_PARAM_VALUE_LEN).collect::<String>()),
                Value::Number(_) | Value::Bool(_) => value.clone(),
                other => Value::from(other.to_string().chars().take(MAX_PARAM_VALUE_LEN).collect::<String>()),
            };
            (sanitize_name(key), value)
        })
        .collect()
}

fn event_body(event: &AnalyticsEvent) -> Value {
    let client_id = event.session_id.as_deref().or(event.user_id.as_deref()).unwrap_or("anonymous");
    let mut body = json!({
        "client_id": client_id,
        "timestamp_micros": event.timestamp.timestamp_micros(),
        "events": [{
            "name": sanitize_name(&event.name),
            "params": to_params(&event.properties),
        }],
    });
    if let Some(user_id) = &event.user_id {
        body["user_id"] = Value::from(user_id.as_str());
    }
    body
}

fn identify_body(user: &UserProperties) -> Value {
    let mut properties = Map::new();
    if let Some(plan) = &user.plan {
        properties.insert("plan".into(), json!({ "value": plan }));
    }
    if let Some(count) = user.restaurant_count {
        properties.insert("restaurant_count".into(), json!({ "value": count }));
    }
    if let Some(country) = user.location.as_ref().and_then(|location| location.country.as_ref()) {
        properties.insert("country".into(), json!({ "value": country }));
    }

    json!({
        "client_id": user.user_id,
        "user_id": user.user_id,
        "user_properties": properties,
        "events": [{ "name": IDENTIFY_EVENT, "params": {} }],
    })
}

#[async_trait]
impl AnalyticsClient for GoogleAnalyticsClient {
    fn name(&self) -> &str {
        "google_analytics"
    }

    async fn track(&self, event: &AnalyticsEvent) -> Result<()> {
        self.collect(event_body(event)).await
    }

    async fn identify(&self, user: &UserProperties) -> Result<()> {
        self.collect(identify_body(user)).await
    }
}
