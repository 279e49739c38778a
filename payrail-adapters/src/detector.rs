//! Header-based adapter detection.
//!
//! Inbound webhooks arrive on a shared endpoint; before any order lookup
//! the caller needs to know WHICH gateway sent them. The detector holds
//! per-adapter predicates evaluated over normalized headers, in
//! registration order. It is a pure routing helper and an explicitly
//! constructed instance: no process-global registry.

use std::collections::HashMap;

use crate::ports::WebhookHeaders;

/// Predicate over lowercase-normalized headers.
pub type DetectRule = Box<dyn Fn(&WebhookHeaders) -> bool + Send + Sync>;

/// Detects the source payment adapter of an inbound HTTP request.
pub struct AdapterDetector {
    rules: Vec<(String, DetectRule)>,
}

impl AdapterDetector {
    /// Create an empty detector.
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Create a detector preloaded with the known gateways' user-agent
    /// conventions.
    pub fn with_default_rules() -> Self {
        let mut detector = Self::new();
        detector.register("stripe", |h| user_agent_contains(h, "stripe"));
        detector.register("paypal", |h| user_agent_contains(h, "paypal"));
        detector.register("alipay", |h| user_agent_contains(h, "mozilla"));
        detector.register("coinbase", |h| user_agent_contains(h, "weipay"));
        detector
    }

    /// Register a detection rule for an adapter.
    ///
    /// Rules receive headers with lowercase keys and are evaluated in
    /// registration order; the first match wins.
    pub fn register<F>(&mut self, adapter_name: &str, rule: F)
    where
        F: Fn(&WebhookHeaders) -> bool + Send + Sync + 'static,
    {
        self.rules.push((adapter_name.to_string(), Box::new(rule)));
    }

    /// Detect the adapter an inbound request came from.
    ///
    /// Returns `None` when no rule matches or headers are empty.
    pub fn detect(&self, headers: &WebhookHeaders) -> Option<&str> {
        if headers.is_empty() {
            return None;
        }

        let normalized: WebhookHeaders = headers
            .iter()
            .map(|(name, value)| (name.to_lowercase(), value.clone()))
            .collect();

        self.rules
            .iter()
            .find(|(_, rule)| rule(&normalized))
            .map(|(name, _)| name.as_str())
    }
}

impl Default for AdapterDetector {
    fn default() -> Self {
        Self::with_default_rules()
    }
}

fn user_agent_contains(headers: &WebhookHeaders, needle: &str) -> bool {
    headers
        .get("user-agent")
        .is_some_and(|value| value.to_lowercase().contains(needle))
}

// =============================================================================
// Tests
// =============================================================================
