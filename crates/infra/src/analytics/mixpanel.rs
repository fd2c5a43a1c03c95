//! Mixpanel ingestion API client
//!
//! Events go to `POST {api}/track` and profile updates to
//! `POST {api}/engage`, both as JSON arrays. Mixpanel answers `1` for an
//! accepted batch and `0` otherwise.

use async_trait::async_trait;
use bitebase_core::AnalyticsClient;
use bitebase_domain::{AnalyticsEvent, BiteBaseError, Result, UserProperties};
use reqwest::Method;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::errors::to_domain;
use crate::http::HttpClient;

/// Sends events and profiles to Mixpanel.
pub struct MixpanelClient {
    http: HttpClient,
    api_url: String,
    token: String,
}

impl std::fmt::Debug for MixpanelClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MixpanelClient")
            .field("api_url", &self.api_url)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

impl MixpanelClient {
    /// Client for one project token.
    pub fn new(http: HttpClient, api_url: impl Into<String>, token: impl Into<String>) -> Self {
        let api_url = api_url.into().trim_end_matches('/').to_string();
        Self { http, api_url, token: token.into() }
    }

    async fn post(&self, path: &str, body: Value) -> Result<()> {
        let url = format!("{}{path}", self.api_url);
        let request = self
            .http
            .request(Method::POST, &url)
            .header("Accept", "text/plain")
            .json(&body);

        let response = self.http.send_checked(request).await?;
        let text = response.text().await.map_err(to_domain)?;
        if text.trim() != "1" {
            return Err(BiteBaseError::External(format!("mixpanel rejected payload on {path}")));
        }

        debug!(path, "mixpanel payload accepted");
        Ok(())
    }
}

/// Properties for a `/track` entry.
fn event_properties(token: &str, event: &AnalyticsEvent) -> Map<String, Value> {
    let mut properties = event.properties.clone();
    properties.insert("token".into(), Value::from(token));
    properties.insert("time".into(), Value::from(event.timestamp.timestamp_millis()));
    let distinct_id = event.user_id.as_deref().or(event.session_id.as_deref());
    if let Some(distinct_id) = distinct_id {
        properties.insert("distinct_id".into(), Value::from(distinct_id));
    }
    properties
}

/// `$set` operations for an `/engage` entry.
fn profile_updates(user: &UserProperties) -> Map<String, Value> {
    let mut set = Map::new();
    if let Some(email) = &user.email {
        set.insert("$email".into(), Value::from(email.as_str()));
    }
    if let Some(name) = &user.name {
        set.insert("$name".into(), Value::from(name.as_str()));
    }
    if let Some(plan) = &user.plan {
        set.insert("plan".into(), Value::from(plan.as_str()));
    }
    if let Some(signup) = user.signup_date {
        set.insert("signup_date".into(), Value::from(signup.to_rfc3339()));
    }
    if let Some(active) = user.last_active_date {
        set.insert("last_active_date".into(), Value::from(active.to_rfc3339()));
    }
    if let Some(count) = user.restaurant_count {
        set.insert("restaurant_count".into(), Value::from(count));
    }
    if let Some(location) = &user.location {
        if let Ok(value) = serde_json::to_value(location) {
            set.insert("location".into(), value);
        }
    }
    set
}

#[async_trait]
impl AnalyticsClient for MixpanelClient {
    fn name(&self) -> &str {
        "mixpanel"
    }

    async fn track(&self, event: &AnalyticsEvent) -> Result<()> {
        let body = json!([{
            "event": event.name,
            "properties": event_properties(&self.token, event),
        }]);
        self.post("/track", body).await
    }

    async fn identify(&self, user: &UserProperties) -> Result<()> {
        let body = json!([{
            "$token": self.token,
            "$distinct_id": user.user_id,
            "$set": profile_updates(user),
        }]);
        self.post("/engage", body).await
    }
}
