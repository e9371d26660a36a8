//! REST client for the Gamma and CLOB `/markets` endpoints
//!
//! # Behavior
//! - Every attempt (retries included) first waits on the throttle
//! - A shutdown flag observed after that wait aborts before sending
//! - Timeouts, connection failures, 429 and 5xx are retried with backoff
//! - Any other 4xx is returned immediately
//! - Exhausted retries surface as `FetchError::RetriesExhausted`

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::{debug, warn};

use super::throttle::Throttle;
use crate::error::FetchError;

/// Default pause between consecutive requests
pub const DEFAULT_REQUEST_DELAY: Duration = Duration::from_millis(250);

/// Client tunables
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Per-request timeout
    pub timeout: Duration,
    /// Retries after the first attempt
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    /// Minimum spacing between request starts (zero disables)
    pub request_delay: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(10),
            request_delay: DEFAULT_REQUEST_DELAY,
        }
    }
}

impl ClientConfig {
    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn with_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_backoff = initial;
        self.max_backoff = max;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Exponential backoff for a zero-based retry number, capped at `max_backoff`
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry);
        std::cmp::min(self.initial_backoff.saturating_mul(factor), self.max_backoff)
    }
}

/// A successful response
#[derive(Clone, Debug)]
pub struct FetchResponse {
    pub status: u16,
    pub body: Value,
}

/// Throttled, retrying GET client. One instance per fetch run.
pub struct MarketsClient {
    client: Client,
    config: ClientConfig,
    throttle: Throttle,
}

impl MarketsClient {
    pub fn new() -> Result<Self, FetchError> {
        Self::with_config(ClientConfig::default())
    }

    pub fn with_config(config: ClientConfig) -> Result<Self, FetchError> {
        let client = Client::builder().timeout(config.timeout).build().map_err(FetchError::Client)?;
        let throttle = Throttle::new(config.request_delay);

        Ok(Self { client, config, throttle })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// GET `endpoint?params`, retrying transient failures
    pub async fn fetch(
        &self,
        endpoint: &str,
        params: &[(String, String)],
    ) -> Result<FetchResponse, FetchError> {
        self.fetch_unless(endpoint, params, &AtomicBool::new(false)).await
    }

    /// Like [`fetch`](Self::fetch), but returns `FetchError::Interrupted`
    /// instead of sending once `shutdown` is set
    pub async fn fetch_unless(
        &self,
        endpoint: &str,
        params: &[(String, String)],
        shutdown: &AtomicBool,
    ) -> Result<FetchResponse, FetchError> {
        let mut retry = 0;

        loop {
            self.throttle.wait().await;
            if shutdown.load(Ordering::Relaxed) {
                return Err(FetchError::Interrupted);
            }

            match self.fetch_once(endpoint, params).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_transient() && retry < self.config.max_retries => {
                    let delay = self.config.backoff(retry);
                    warn!(
                        "Request failed ({}), attempt {}/{}, retrying in {:?}",
                        e,
                        retry + 1,
                        self.config.max_retries + 1,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    retry += 1;
                }
                Err(e) if e.is_transient() => {
                    return Err(FetchError::RetriesExhausted { attempts: retry + 1, last: Box::new(e) });
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn fetch_once(
        &self,
        endpoint: &str,
        params: &[(String, String)],
    ) -> Result<FetchResponse, FetchError> {
        debug!("GET {} {:?}", endpoint, params);

        let response = self
            .client
            .get(endpoint)
            .query(params)
            .send()
            .await
            .map_err(classify_send_error)?;

        let status = response.status();
        if is_retryable_status(status) {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Transient { status: Some(status.as_u16()), message: body });
        }
        if !status.is_success() {
            let url = response.url().to_string();
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status { status: status.as_u16(), url, body });
        }

        let url = response.url().to_string();
        let text = response.text().await.map_err(|e| FetchError::Transient {
            status: Some(status.as_u16()),
            message: format!("Failed to read body: {}", e),
        })?;
        let body: Value = serde_json::from_str(&text)
            .map_err(|e| FetchError::Decode { url, message: e.to_string() })?;

        Ok(FetchResponse { status: status.as_u16(), body })
    }
}

fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn classify_send_error(e: reqwest::Error) -> FetchError {
    if e.is_timeout() || e.is_connect() || e.is_request() {
        FetchError::Transient { status: None, message: e.to_string() }
    } else {
        FetchError::Client(e)
    }
}
