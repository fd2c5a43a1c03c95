//! Composition root
//!
//! Builds every service from a [`Config`] with explicit dependencies and owns
//! the background tasks. Integrations whose credentials are absent are not
//! constructed; an unreachable Redis disables the external cache tier.

use std::sync::Arc;
use std::time::Duration;

use bitebase_core::{
    AnalyticsClient, AnalyticsService, CacheService, CacheStore, ErrorHandler, PerformanceCollector,
    RetryEngine, SecurityService,
};
use bitebase_domain::{Config, Result};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::analytics::{GoogleAnalyticsClient, MixpanelClient};
use crate::cache::redis_store::{redact_url, RedisCacheStore};
use crate::http::HttpClient;
use crate::monitoring::{SentrySink, WebhookNotifier};
use crate::performance::PerformanceReporter;

const REDIS_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const INTEGRATION_TIMEOUT: Duration = Duration::from_secs(5);
const MAINTENANCE_INTERVAL: Duration = Duration::from_secs(60);
const USER_AGENT: &str = concat!("bitebase/", env!("CARGO_PKG_VERSION"));

/// Every service of the layer, wired from one [`Config`].
pub struct AppServices {
    config: Config,
    /// Classifies, records and forwards errors
    pub error_handler: Arc<ErrorHandler>,
    /// Retries reporting through `error_handler`
    pub retry: RetryEngine,
    /// Two-tier cache
    pub cache: Arc<CacheService>,
    /// Event fan-out to the analytics clients
    pub analytics: Arc<AnalyticsService>,
    /// Runtime timing snapshot
    pub performance: Arc<PerformanceCollector>,
    /// Rate limits and field encryption
    pub security: Arc<SecurityService>,
    /// Client for application API calls; every attempt is timed.
    pub http: HttpClient,
    shutdown: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl std::fmt::Debug for AppServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppServices")
            .field("environment", &self.config.environment)
            .field("cache", &self.cache)
            .field("analytics", &self.analytics)
            .field("background_tasks", &self.tasks.lock().len())
            .finish_non_exhaustive()
    }
}

impl AppServices {
    /// Build all services. Must run inside a tokio runtime.
    ///
    /// # Errors
    /// Returns `BiteBaseError::Config` for an invalid encryption key or
    /// Sentry DSN, or when an HTTP client cannot be built.
    pub async fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;

        // Vendor calls are best-effort: one attempt, short timeout.
        let integration_http = HttpClient::builder()
            .timeout(INTEGRATION_TIMEOUT)
            .max_attempts(1)
            .user_agent(USER_AGENT)
            .build()?;

        let analytics = Arc::new(build_analytics(config, &integration_http));

        let mut handler = ErrorHandler::builder().with_analytics(analytics.clone());
        if let Some(dsn) = &config.monitoring.sentry_dsn {
            let sink = SentrySink::from_dsn(integration_http.clone(), dsn, config.environment.clone())?;
            handler = handler.with_sink(Arc::new(sink));
        }
        if let Some(url) = &config.monitoring.alert_webhook_url {
            let notifier = WebhookNotifier::new(integration_http.clone(), url.clone(), config.environment.clone());
            handler = handler.with_notifier(Arc::new(notifier));
        }
        let error_handler = Arc::new(handler.build());

        let mut cache = CacheService::from_config(&config.cache);
        if let Some(store) = connect_store(config).await {
            cache = cache.with_store(store);
        }

        let performance = Arc::new(
            PerformanceCollector::from_config(&config.performance).with_analytics(analytics.clone()),
        );
        let http = HttpClient::builder().user_agent(USER_AGENT).collector(performance.clone()).build()?;

        let security = Arc::new(SecurityService::from_config(&config.security)?);

        info!(
            environment = %config.environment,
            analytics_clients = analytics.client_count(),
            external_cache = cache.has_store(),
            encryption = security.has_encryption(),
            "services initialized"
        );

        Ok(Self {
            config: config.clone(),
            retry: RetryEngine::new(error_handler.clone()),
            error_handler,
            cache: Arc::new(cache),
            analytics,
            performance,
            security,
            http,
            shutdown: CancellationToken::new(),
            tasks: Mutex::new(Vec::new()),
        })
    }

    /// Configuration the services were built from.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Spawn the performance reporter and the expiry sweeper. Calling this
    /// again while tasks are running does nothing.
    pub fn start_background_tasks(&self) {
        let mut tasks = self.tasks.lock();
        if !tasks.is_empty() || self.shutdown.is_cancelled() {
            return;
        }

        if self.config.performance.enabled {
            let reporter =
                PerformanceReporter::new(self.performance.clone(), self.config.performance.flush_interval());
            tasks.push(reporter.spawn(self.shutdown.child_token()));
        }

        tasks.push(tokio::spawn(sweep_expired(
            self.cache.clone(),
            self.security.clone(),
            self.shutdown.child_token(),
        )));
        debug!(tasks = tasks.len(), "background tasks started");
    }

    /// Stop background tasks, flush pending metrics and drain the error
    /// dispatch queue.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        let tasks: Vec<_> = self.tasks.lock().drain(..).collect();
        for task in tasks {
            if let Err(err) = task.await {
                warn!(error = %err, "background task terminated abnormally");
            }
        }

        self.performance.flush().await;
        self.error_handler.shutdown().await;
        info!("services shut down");
    }
}

fn build_analytics(config: &Config, http: &HttpClient) -> AnalyticsService {
    let mut analytics = AnalyticsService::from_config(config);
    if !config.features.analytics {
        return analytics;
    }

    let monitoring = &config.monitoring;
    let mut clients: Vec<Arc<dyn AnalyticsClient>> = Vec::new();
    if let Some(token) = &monitoring.mixpanel_token {
        clients.push(Arc::new(MixpanelClient::new(http.clone(), &monitoring.mixpanel_api_url, token)));
    }
    match (&monitoring.ga_measurement_id, &monitoring.ga_api_secret) {
        (Some(id), Some(secret)) => clients.push(Arc::new(GoogleAnalyticsClient::new(
            http.clone(),
            &monitoring.ga_api_url,
            id,
            secret,
        ))),
        (None, None) => {}
        _ => warn!("google analytics needs both a measurement id and an api secret; disabled"),
    }

    for client in clients {
        analytics = analytics.with_client(client);
    }
    analytics
}

async fn connect_store(config: &Config) -> Option<Arc<dyn CacheStore>> {
    let url = config.cache.redis_url.as_deref()?;

    match tokio::time::timeout(REDIS_CONNECT_TIMEOUT, RedisCacheStore::connect(url)).await {
        Ok(Ok(store)) => {
            info!(url = %redact_url(url), "external cache tier enabled");
            Some(Arc::new(store))
        }
        Ok(Err(err)) => {
            warn!(url = %redact_url(url), error = %err, "redis unavailable; external cache tier disabled");
            None
        }
        Err(_) => {
            warn!(url = %redact_url(url), "redis connection timed out; external cache tier disabled");
            None
        }
    }
}

async fn sweep_expired(cache: Arc<CacheService>, security: Arc<SecurityService>, token: CancellationToken) {
    let mut ticker = tokio::time::interval(MAINTENANCE_INTERVAL);
    ticker.tick().await;

    loop {
        tokio::select! {
            () = token.cancelled() => break,
            _ = ticker.tick() => {
                let entries = cache.purge_expired().await;
                let windows = security.purge_rate_limits();
                if entries + windows > 0 {
                    debug!(entries, windows, "expired entries swept");
                }
            }
        }
    }
}
