//! Service configuration.
//!
//! Loads configuration from environment variables with sensible defaults.

use std::env;
use std::time::Duration;

use payrail_domain::Environment;

use crate::error::{ServiceError, ServiceResult};

// =============================================================================
// Configuration
// =============================================================================

/// Redirect/webhook endpoint paths appended to the base URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointsConfig {
    /// Payer landed here after approving (capture trigger)
    pub success: String,
    /// Payer landed here after abandoning
    pub cancel: String,
    /// Gateways deliver webhooks here
    pub webhook: String,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            success: "/success".to_string(),
            cancel: "/cancel".to_string(),
            webhook: "/notify".to_string(),
        }
    }
}

/// Service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Gateway environment (sandbox, production)
    pub environment: Environment,

    /// Public base URL payers are redirected back to
    pub base_url: String,

    /// Public base URL gateways deliver webhooks to
    pub webhook_base_url: String,

    /// Endpoint paths under the base URLs
    pub endpoints: EndpointsConfig,

    /// Total time before a silent order is reconciled
    pub order_timeout: Duration,

    /// Reconciliation cadence forwarded to watchers
    pub reconcile_interval: Duration,

    /// Per-request timeout for gateway HTTP calls
    pub http_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> ServiceResult<Self> {
        // Load .env file if present (ignore errors)
        let _ = dotenvy::dotenv();

        let environment = env::var("PAYRAIL_ENV")
            .unwrap_or_else(|_| "sandbox".to_string())
            .parse::<Environment>()
            .map_err(|err| ServiceError::Config(err.to_string()))?;

        let base_url =
            env::var("PAYRAIL_BASE_URL").unwrap_or_else(|_| "http://localhost:5000".to_string());
        let webhook_base_url =
            env::var("PAYRAIL_WEBHOOK_BASE_URL").unwrap_or_else(|_| base_url.clone());

        let endpoints = EndpointsConfig {
            success: env::var("PAYRAIL_SUCCESS_PATH").unwrap_or_else(|_| "/success".to_string()),
            cancel: env::var("PAYRAIL_CANCEL_PATH").unwrap_or_else(|_| "/cancel".to_string()),
            webhook: env::var("PAYRAIL_WEBHOOK_PATH").unwrap_or_else(|_| "/notify".to_string()),
        };

        Ok(Self {
            environment,
            base_url,
            webhook_base_url,
            endpoints,
            order_timeout: Self::load_secs_env("PAYRAIL_ORDER_TIMEOUT_SECS", 15 * 60)?,
            reconcile_interval: Self::load_secs_env("PAYRAIL_RECONCILE_INTERVAL_SECS", 10)?,
            http_timeout: Self::load_secs_env("PAYRAIL_HTTP_TIMEOUT_SECS", 10)?,
        })
    }

    /// Create test configuration.
    pub fn test() -> Self {
        Self {
            environment: Environment::Sandbox,
            base_url: "http://localhost:0".to_string(),
            webhook_base_url: "http://localhost:0".to_string(),
            endpoints: EndpointsConfig::default(),
            order_timeout: Duration::from_secs(600),
            reconcile_interval: Duration::from_secs(1),
            http_timeout: Duration::from_secs(1),
        }
    }

    /// Full webhook callback URL handed to gateways.
    pub fn webhook_url(&self) -> String {
        format!("{}{}", self.webhook_base_url, self.endpoints.webhook)
    }

    fn load_secs_env(key: &str, default_secs: u64) -> ServiceResult<Duration> {
        match env::var(key) {
            Ok(value) => value
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| ServiceError::Config(format!("Invalid {} value: {}", key, value))),
            Err(_) => Ok(Duration::from_secs(default_secs)),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: Environment::Sandbox,
            base_url: "http://localhost:5000".to_string(),
            webhook_base_url: "http://localhost:5000".to_string(),
            endpoints: EndpointsConfig::default(),
            order_timeout: Duration::from_secs(15 * 60),
            reconcile_interval: Duration::from_secs(10),
            http_timeout: Duration::from_secs(10),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
