//! Analytics service - event enrichment and fan-out to clients

use std::sync::Arc;

use bitebase_domain::constants::{
    EVENT_AI_INTERACTION, EVENT_ERROR_OCCURRED, EVENT_FUNNEL_STEP, EVENT_MARKET_ANALYSIS,
    EVENT_PAGE_VIEW, EVENT_PERFORMANCE_METRICS, EVENT_RESTAURANT_SETUP, EVENT_SUBSCRIPTION,
};
use bitebase_domain::{AnalyticsEvent, Config, ErrorRecord, PerformanceSnapshot, UserProperties};
use futures::future::join_all;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::events::{AiInteraction, MarketAnalysis, RestaurantSetup, SubscriptionChange};
use super::ports::AnalyticsClient;
use crate::utils::{epoch_millis, ids};

/// Page reported for errors whose context carries no URL.
const UNKNOWN_PAGE: &str = "unknown";

/// Product analytics service
///
/// Tracking never fails: when analytics is disabled every call is a no-op,
/// and client failures are logged and swallowed.
pub struct AnalyticsService {
    enabled: bool,
    session_id: String,
    user_id: RwLock<Option<String>>,
    clients: Vec<Arc<dyn AnalyticsClient>>,
    default_properties: Map<String, Value>,
}

impl std::fmt::Debug for AnalyticsService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalyticsService")
            .field("enabled", &self.enabled)
            .field("session_id", &self.session_id)
            .field("clients", &self.clients.iter().map(|c| c.name()).collect::<Vec<_>>())
            .finish()
    }
}

impl AnalyticsService {
    /// Create a service with a fresh session id and no clients.
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            session_id: ids::session_id(epoch_millis()),
            user_id: RwLock::new(None),
            clients: Vec::new(),
            default_properties: Map::new(),
        }
    }

    /// Service honoring `features.analytics` and tagging events with the
    /// deployment environment.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.features.analytics)
            .with_default_property("environment", config.environment.clone())
    }

    /// Fan events out to `client` as well.
    pub fn with_client(mut self, client: Arc<dyn AnalyticsClient>) -> Self {
        self.clients.push(client);
        self
    }

    /// Property added to every event that does not set it itself.
    pub fn with_default_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.default_properties.insert(key.into(), value.into());
        self
    }

    /// Whether tracking calls reach the clients.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Session id attached to every event.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// User id set by the last `identify` call.
    pub fn user_id(&self) -> Option<String> {
        self.user_id.read().clone()
    }

    /// Number of attached clients.
    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// Enrich `event` and forward it to every client.
    pub async fn track(&self, event: AnalyticsEvent) {
        if !self.enabled {
            return;
        }

        let event = self.enrich(event);
        debug!(event = %event.name, clients = self.clients.len(), "analytics_event");

        let results = join_all(self.clients.iter().map(|client| client.track(&event))).await;
        for (client, result) in self.clients.iter().zip(results) {
            if let Err(err) = result {
                warn!(client = client.name(), event = %event.name, error = %err, "failed to track analytics event");
            }
        }
    }

    /// Remember the user for subsequent events and forward the profile.
    pub async fn identify(&self, user: UserProperties) {
        if !self.enabled {
            return;
        }

        *self.user_id.write() = Some(user.user_id.clone());

        let results = join_all(self.clients.iter().map(|client| client.identify(&user))).await;
        for (client, result) in self.clients.iter().zip(results) {
            if let Err(err) = result {
                warn!(client = client.name(), error = %err, "failed to identify user");
            }
        }
    }

    /// Track a page view.
    pub async fn track_page_view(&self, page: &str, title: Option<&str>) {
        let event = AnalyticsEvent::new(EVENT_PAGE_VIEW)
            .with_property("page", page)
            .with_optional_property("title", title);
        self.track(event).await;
    }

    /// Track a step of restaurant onboarding.
    pub async fn track_restaurant_setup(&self, setup: &RestaurantSetup) {
        let event = AnalyticsEvent::new(EVENT_RESTAURANT_SETUP)
            .with_property("restaurant_name", setup.name.as_str())
            .with_property("cuisine_type", setup.cuisine.as_str())
            .with_property("latitude", setup.latitude)
            .with_property("longitude", setup.longitude)
            .with_property("setup_step", setup.setup_step.as_str());
        self.track(event).await;
    }

    /// Track a finished market analysis.
    pub async fn track_market_analysis(&self, analysis: &MarketAnalysis) {
        let event = AnalyticsEvent::new(EVENT_MARKET_ANALYSIS)
            .with_property("latitude", analysis.latitude)
            .with_property("longitude", analysis.longitude)
            .with_property("search_radius", analysis.radius)
            .with_property("competitor_count", analysis.competitor_count)
            .with_property("opportunity_score", analysis.opportunity_score);
        self.track(event).await;
    }

    /// Track an assistant exchange.
    pub async fn track_ai_interaction(&self, interaction: &AiInteraction) {
        let event = AnalyticsEvent::new(EVENT_AI_INTERACTION)
            .with_property("interaction_type", interaction.kind.as_str())
            .with_property("query_length", interaction.query.chars().count())
            .with_property("response_time_ms", interaction.response_time_ms)
            .with_optional_property("user_satisfaction", interaction.satisfaction);
        self.track(event).await;
    }

    /// Track a plan change.
    pub async fn track_subscription(&self, change: &SubscriptionChange) {
        let event = AnalyticsEvent::new(EVENT_SUBSCRIPTION)
            .with_property("plan_name", change.plan.as_str())
            .with_property("action", change.action.as_str())
            .with_optional_property("amount", change.amount);
        self.track(event).await;
    }

    /// Conversion funnel step; `properties` may override `step`.
    pub async fn track_funnel_step(&self, step: &str, properties: Map<String, Value>) {
        let mut event = AnalyticsEvent::new(EVENT_FUNNEL_STEP).with_property("step", step);
        event.properties.extend(properties);
        self.track(event).await;
    }

    /// Track a handled error as `error_occurred`.
    pub async fn track_error(&self, record: &ErrorRecord) {
        let page = record.context.url.as_deref().unwrap_or(UNKNOWN_PAGE);
        let mut event = AnalyticsEvent::new(EVENT_ERROR_OCCURRED)
            .with_property("error_message", record.message.as_str())
            .with_property("error_category", record.category.as_str())
            .with_property("error_severity", record.severity.as_str())
            .with_property("error_page", page);
        if let Some(user_id) = &record.context.user_id {
            event = event.with_user_id(user_id.as_str());
        }
        self.track(event).await;
    }

    /// Track the recorded fields of a performance snapshot.
    pub async fn track_performance(&self, snapshot: &PerformanceSnapshot) {
        let mut event = AnalyticsEvent::new(EVENT_PERFORMANCE_METRICS);
        event.properties = snapshot.to_properties();
        self.track(event).await;
    }

    fn enrich(&self, mut event: AnalyticsEvent) -> AnalyticsEvent {
        event.session_id = Some(self.session_id.clone());
        if let Some(user_id) = self.user_id.read().clone() {
            event.user_id = Some(user_id);
        }
        for (key, value) in &self.default_properties {
            event.properties.entry(key.clone()).or_insert_with(|| value.clone());
        }
        event
    }
}
