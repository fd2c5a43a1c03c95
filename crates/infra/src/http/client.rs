use std::sync::Arc;
use std::time::Duration;

use bitebase_core::PerformanceCollector;
use bitebase_domain::{BiteBaseError, Result};
use reqwest::{Client as ReqwestClient, Method, Request, RequestBuilder, Response};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::errors::to_domain;

/// Upper bound on the backoff exponent (base * 2^8).
const MAX_BACKOFF_SHIFT: u32 = 8;

/// Instrumented HTTP client.
///
/// Every attempt is timed. With a [`PerformanceCollector`] attached the
/// duration is recorded as an API call together with the response status, or
/// without one when the request never produced a response. 5xx responses and
/// transient transport failures are retried up to `max_attempts`.
#[derive(Clone)]
pub struct HttpClient {
    inner: ReqwestClient,
    max_attempts: u32,
    base_backoff: Duration,
    collector: Option<Arc<PerformanceCollector>>,
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("max_attempts", &self.max_attempts)
            .field("base_backoff", &self.base_backoff)
            .field("timed", &self.collector.is_some())
            .finish()
    }
}

enum Outcome {
    Done(Result<Response>),
    Retry,
}

impl HttpClient {
    /// Start configuring a client.
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    /// Start a request; send it with [`send`](Self::send).
    pub fn request<U: reqwest::IntoUrl>(&self, method: Method, url: U) -> RequestBuilder {
        self.inner.request(method, url)
    }

    /// Execute `builder`, retrying 5xx responses and transient failures.
    ///
    /// Non-5xx responses are returned whatever their status; use
    /// [`send_checked`](Self::send_checked) to turn 4xx into errors.
    ///
    /// # Errors
    /// `BiteBaseError::Internal` when the body cannot be cloned for a retry,
    /// otherwise the mapped transport error of the last attempt.
    pub async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        let mut attempt = 1;
        loop {
            let request = builder
                .try_clone()
                .ok_or_else(|| BiteBaseError::Internal("streaming request bodies cannot be retried".into()))?
                .build()
                .map_err(to_domain)?;

            let last = attempt >= self.max_attempts;
            match self.attempt(request, attempt, last).await {
                Outcome::Done(result) => return result,
                Outcome::Retry => {
                    tokio::time::sleep(self.backoff(attempt)).await;
                    attempt += 1;
                }
            }
        }
    }

    /// [`send`](Self::send), then fail on any non-2xx status.
    pub async fn send_checked(&self, builder: RequestBuilder) -> Result<Response> {
        self.send(builder).await?.error_for_status().map_err(to_domain)
    }

    async fn attempt(&self, request: Request, attempt: u32, last: bool) -> Outcome {
        let method = request.method().clone();
        let url = request.url().to_string();
        debug!(attempt, %method, %url, "http request");

        let started = Instant::now();
        let outcome = self.inner.execute(request).await;
        let elapsed = started.elapsed();

        match outcome {
            Ok(response) => {
                let status = response.status();
                self.record(&url, elapsed, Some(status.as_u16())).await;
                if status.is_server_error() && !last {
                    warn!(attempt, %method, %url, %status, "server error; retrying");
                    return Outcome::Retry;
                }
                debug!(attempt, %status, ?elapsed, "http response");
                Outcome::Done(Ok(response))
            }
            Err(err) => {
                self.record(&url, elapsed, None).await;
                if is_transient(&err) && !last {
                    warn!(attempt, %method, %url, error = %err, "transport failure; retrying");
                    return Outcome::Retry;
                }
                Outcome::Done(Err(to_domain(err)))
            }
        }
    }

    async fn record(&self, url: &str, elapsed: Duration, status: Option<u16>) {
        if let Some(collector) = &self.collector {
            collector.record_api_call(url, elapsed, status).await;
        }
    }

    /// `base_backoff * 2^(attempt-1)`, capped.
    fn backoff(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(MAX_BACKOFF_SHIFT);
        self.base_backoff.saturating_mul(1 << shift)
    }
}

fn is_transient(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}

/// Builder for [`HttpClient`]
pub struct HttpClientBuilder {
    timeout: Duration,
    max_attempts: u32,
    base_backoff: Duration,
    user_agent: Option<String>,
    collector: Option<Arc<PerformanceCollector>>,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_attempts: 3,
            base_backoff: Duration::from_millis(200),
            user_agent: None,
            collector: None,
        }
    }
}

impl HttpClientBuilder {
    /// Per-attempt timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Total attempts including the first; at least 1.
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Delay before the first retry; doubles per attempt.
    pub fn base_backoff(mut self, backoff: Duration) -> Self {
        self.base_backoff = backoff;
        self
    }

    /// `User-Agent` header of every request.
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Time every attempt into `collector`.
    pub fn collector(mut self, collector: Arc<PerformanceCollector>) -> Self {
        self.collector = Some(collector);
        self
    }

    /// # Errors
    /// `BiteBaseError::Config` when the TLS backend cannot be initialised.
    pub fn build(self) -> Result<HttpClient> {
        let mut builder = ReqwestClient::builder().timeout(self.timeout).no_proxy();
        if let Some(agent) = self.user_agent {
            builder = builder.user_agent(agent);
        }

        Ok(HttpClient {
            inner: builder.build().map_err(to_domain)?,
            max_attempts: self.max_attempts,
            base_backoff: self.base_backoff,
            collector: self.collector,
        })
    }
}
