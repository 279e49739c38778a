//! Retrying HTTP transport for gateway drivers.
//!
//! Gateway APIs fail transiently: 5xx responses, dropped connections,
//! timeouts. The transport retries those with bounded exponential backoff;
//! every other failure surfaces immediately so callers see real errors
//! (auth rejections, validation failures) on the first attempt.

use std::collections::HashMap;
use std::time::Duration;

use reqwest::Client;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::error::AdapterError;
use crate::payload::parse_payload;

/// HTTP status codes that warrant a retry (transient server issues).
const RETRY_STATUSES: [u16; 4] = [500, 502, 503, 504];

// =============================================================================
// Retry Policy
// =============================================================================

/// Retry configuration for gateway requests.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first (default: 3)
    pub max_attempts: u32,
    /// Backoff before the first retry (default: 2s)
    pub initial_backoff: Duration,
    /// Backoff ceiling (default: 10s)
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_secs(2),
            max_backoff: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Backoff before retry number `retry` (1-based).
    ///
    /// Doubles per retry, capped at `max_backoff`: 2s, 4s, 8s, 10s, 10s...
    pub fn backoff_delay(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(16);
        let delay = self.initial_backoff.saturating_mul(1u32 << exponent);
        delay.min(self.max_backoff)
    }
}

// =============================================================================
// Gateway Response
// =============================================================================

/// A successful gateway response.
#[derive(Debug, Clone)]
pub struct GatewayResponse {
    /// HTTP status code (always a success status)
    pub status: u16,
    /// Response headers, lowercase keys
    pub headers: HashMap<String, String>,
    /// Raw response body
    pub body: Vec<u8>,
}

impl GatewayResponse {
    /// Decode the body per its content type (JSON or form-encoded).
    pub fn json(&self) -> Result<serde_json::Value, AdapterError> {
        parse_payload(&self.headers, &self.body)
    }
}

// =============================================================================
// HTTP Transport
// =============================================================================

/// Shared HTTP client for gateway drivers.
pub struct HttpTransport {
    client: Client,
    request_timeout: Duration,
    policy: RetryPolicy,
}

impl HttpTransport {
    /// Create a transport with the default retry policy.
    pub fn new(request_timeout: Duration) -> Self {
        Self::with_policy(request_timeout, RetryPolicy::default())
    }

    /// Create a transport with a custom retry policy.
    pub fn with_policy(request_timeout: Duration, policy: RetryPolicy) -> Self {
        Self {
            client: Client::new(),
            request_timeout,
            policy,
        }
    }

    /// Whether an HTTP status belongs to the transient retry list.
    pub fn is_retryable_status(status: u16) -> bool {
        RETRY_STATUSES.contains(&status)
    }

    /// Send a GET request.
    pub async fn get(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
    ) -> Result<GatewayResponse, AdapterError> {
        self.send_with_retry(|| self.apply_headers(self.client.get(url), headers))
            .await
    }

    /// Send a POST request with a JSON body.
    pub async fn post_json(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
        body: &serde_json::Value,
    ) -> Result<GatewayResponse, AdapterError> {
        self.send_with_retry(|| self.apply_headers(self.client.post(url), headers).json(body))
            .await
    }

    /// Send a POST request with a form-encoded body.
    pub async fn post_form(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
        form: &HashMap<String, String>,
    ) -> Result<GatewayResponse, AdapterError> {
        self.send_with_retry(|| self.apply_headers(self.client.post(url), headers).form(form))
            .await
    }

    fn apply_headers(
        &self,
        mut builder: reqwest::RequestBuilder,
        headers: &HashMap<String, String>,
    ) -> reqwest::RequestBuilder {
        for (name, value) in headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder
    }

    async fn send_with_retry<F>(&self, build: F) -> Result<GatewayResponse, AdapterError>
    where
        F: Fn() -> reqwest::RequestBuilder,
    {
        let mut last_error = AdapterError::Request("no request attempted".to_string());

        for attempt in 1..=self.policy.max_attempts {
            if attempt > 1 {
                let delay = self.policy.backoff_delay(attempt - 1);
                debug!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Retrying gateway request"
                );
                tokio::time::sleep(delay).await;
            }

            let sent = timeout(self.request_timeout, build().send()).await;
            let response = match sent {
                Err(_) => {
                    warn!(attempt, "Gateway request timed out");
                    last_error = AdapterError::Timeout;
                    continue;
                }
                Ok(Err(error)) => {
                    warn!(attempt, error = %error, "Gateway request failed");
                    last_error = AdapterError::Request(error.to_string());
                    continue;
                }
                Ok(Ok(response)) => response,
            };

            let status = response.status().as_u16();
            let headers: HashMap<String, String> = response
                .headers()
                .iter()
                .map(|(name, value)| {
                    (
                        name.as_str().to_lowercase(),
                        value.to_str().unwrap_or_default().to_string(),
                    )
                })
                .collect();
            let body = response
                .bytes()
                .await
                .map_err(|error| AdapterError::Parse(error.to_string()))?
                .to_vec();

            if (200..300).contains(&status) {
                return Ok(GatewayResponse {
                    status,
                    headers,
                    body,
                });
            }

            let message = String::from_utf8_lossy(&body).chars().take(500).collect();
            let error = AdapterError::Gateway {
                code: status,
                message,
            };

            if Self::is_retryable_status(status) {
                warn!(attempt, status, "Transient gateway status, will retry");
                last_error = error;
                continue;
            }

            // Non-retryable status: surface immediately
            return Err(error);
        }

        Err(last_error)
    }
}

// =============================================================================
// Tests
// =============================================================================
