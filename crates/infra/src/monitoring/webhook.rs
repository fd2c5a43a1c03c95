//! Slack-compatible webhook for critical alerts

use async_trait::async_trait;
use bitebase_core::CriticalAlertNotifier;
use bitebase_domain::{ErrorRecord, Result};
use reqwest::Method;
use serde_json::json;
use tracing::debug;

use crate::http::HttpClient;

/// Posts critical alerts to a Slack-compatible webhook.
pub struct WebhookNotifier {
    http: HttpClient,
    url: String,
    environment: String,
}

impl std::fmt::Debug for WebhookNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookNotifier").field("environment", &self.environment).finish_non_exhaustive()
    }
}

impl WebhookNotifier {
    /// Notifier posting to `url`.
    pub fn new(http: HttpClient, url: impl Into<String>, environment: impl Into<String>) -> Self {
        Self { http, url: url.into(), environment: environment.into() }
    }
}

fn alert_text(record: &ErrorRecord, environment: &str) -> String {
    let mut text = format!(
        ":rotating_light: Critical error in {environment}\n*{}* `{}`\n{}",
        record.category, record.code, record.message
    );
    if let Some(url) = &record.context.url {
        text.push_str(&format!("\nPage: {url}"));
    }
    if let Some(user_id) = &record.context.user_id {
        text.push_str(&format!("\nUser: {user_id}"));
    }
    text
}

#[async_trait]
impl CriticalAlertNotifier for WebhookNotifier {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn notify(&self, record: &ErrorRecord) -> Result<()> {
        let body = json!({ "text": alert_text(record, &self.environment) });
        let request = self.http.request(Method::POST, &self.url).json(&body);

        self.http.send_checked(request).await?;
        debug!(error_id = %record.id, "critical alert delivered");
        Ok(())
    }
}
