//! Gateway configuration types
//!
//! Consumed by adapter constructions: environment selection and the
//! per-gateway base URL + named endpoint map.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::value_objects::DomainError;

// =============================================================================
// Environment
// =============================================================================

/// Deployment environment a gateway driver talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Gateway sandbox/test endpoints
    Sandbox,
    /// Live gateway endpoints
    Production,
}

impl FromStr for Environment {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sandbox" => Ok(Self::Sandbox),
            "production" | "prod" => Ok(Self::Production),
            other => Err(DomainError::InvalidEnvironment(format!(
                "{}. Expected: sandbox, production",
                other
            ))),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sandbox => write!(f, "sandbox"),
            Self::Production => write!(f, "production"),
        }
    }
}

// =============================================================================
// Gateway Config
// =============================================================================

/// A gateway's base URL and its named endpoint paths
///
/// Endpoint names are business actions (e.g., "create_order"), mapped to
/// gateway-specific paths. Drivers look actions up instead of hardcoding
/// URLs so sandbox and production differ only in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Base URL (e.g., https://api.gateway.example)
    pub base_url: String,
    /// Business action -> endpoint path
    #[serde(default)]
    pub endpoints: HashMap<String, String>,
}

impl GatewayConfig {
    /// Create a config with an empty endpoint map
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            endpoints: HashMap::new(),
        }
    }

    /// Add a named endpoint path
    pub fn with_endpoint(mut self, action: &str, path: &str) -> Self {
        self.endpoints.insert(action.to_string(), path.to_string());
        self
    }

    /// Construct the full URL for a business action
    ///
    /// Unknown actions resolve to the bare base URL.
    pub fn endpoint_url(&self, action: &str) -> String {
        let path = self.endpoints.get(action).map(String::as_str).unwrap_or("");
        if path.is_empty() {
            return self.base_url.trim_end_matches('/').to_string();
        }
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

// =============================================================================
// Tests
// =============================================================================
