//! Stub gateway implementation for testing.
//!
//! Simulates a payment gateway without network calls: scripted capture and
//! poll statuses, a shared-secret webhook check, and call counters so tests
//! can assert how often the engine reached for the gateway.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use serde_json::json;

use payrail_domain::{GatewayConfig, OrderRequest, OrderSnapshot, OrderStatus};

use crate::error::AdapterError;
use crate::payload::parse_payload;
use crate::ports::{GatewayDriver, WebhookHeaders};

/// Header carrying the stub webhook signature.
pub const STUB_SIGNATURE_HEADER: &str = "x-stub-signature";

/// Stub gateway for testing.
///
/// Orders are "created" instantly with a fake checkout link. Webhooks are
/// JSON bodies `{"order_id": ..., "status": ...}` authenticated by comparing
/// the `x-stub-signature` header against the configured secret.
pub struct StubGateway {
    /// Gateway endpoints used to build checkout links
    gateway: GatewayConfig,
    /// Currencies this stub accepts
    supported_currencies: Vec<String>,
    /// Shared secret for webhook verification (None = accept all)
    webhook_secret: Option<String>,
    /// Status returned by capture_order
    capture_status: RwLock<OrderStatus>,
    /// Status returned by fetch_order_status
    fetch_status: RwLock<OrderStatus>,
    /// Whether the next call should fail
    fail_next: RwLock<bool>,
    /// Whether init() should fail
    fail_init: RwLock<bool>,
    /// Counters per driver method
    calls: RwLock<HashMap<&'static str, u64>>,
}

impl StubGateway {
    /// Create a stub accepting USD, EUR and CNY with no webhook secret.
    pub fn new() -> Self {
        Self {
            gateway: GatewayConfig::new("https://stub.payrail.test")
                .with_endpoint("checkout", "/checkout"),
            supported_currencies: vec![
                "USD".to_string(),
                "EUR".to_string(),
                "CNY".to_string(),
            ],
            webhook_secret: None,
            capture_status: RwLock::new(OrderStatus::Captured),
            fetch_status: RwLock::new(OrderStatus::Created),
            fail_next: RwLock::new(false),
            fail_init: RwLock::new(false),
            calls: RwLock::new(HashMap::new()),
        }
    }

    /// Restrict the accepted currencies.
    pub fn with_currencies(mut self, currencies: &[&str]) -> Self {
        self.supported_currencies = currencies.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Require webhook signatures to match a shared secret.
    pub fn with_webhook_secret(mut self, secret: &str) -> Self {
        self.webhook_secret = Some(secret.to_string());
        self
    }

    /// Script the status capture_order advances to.
    pub fn set_capture_status(&self, status: OrderStatus) {
        *self.capture_status.write().unwrap() = status;
    }

    /// Script the status fetch_order_status reports.
    pub fn set_fetch_status(&self, status: OrderStatus) {
        *self.fetch_status.write().unwrap() = status;
    }

    /// Configure the next driver call to fail.
    pub fn set_fail_next(&self, fail: bool) {
        *self.fail_next.write().unwrap() = fail;
    }

    /// Configure init() to fail.
    pub fn set_fail_init(&self, fail: bool) {
        *self.fail_init.write().unwrap() = fail;
    }

    /// How many times a driver method was called.
    pub fn call_count(&self, method: &str) -> u64 {
        self.calls.read().unwrap().get(method).copied().unwrap_or(0)
    }

    fn record_call(&self, method: &'static str) {
        *self.calls.write().unwrap().entry(method).or_insert(0) += 1;
    }

    /// Check if we should fail the next operation.
    fn should_fail(&self) -> bool {
        let mut fail_next = self.fail_next.write().unwrap();
        let fail = *fail_next;
        *fail_next = false; // Reset after check
        fail
    }

    fn status_from_payload(payload: &serde_json::Value) -> Option<OrderStatus> {
        serde_json::from_value(payload.get("status")?.clone()).ok()
    }
}

impl Default for StubGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GatewayDriver for StubGateway {
    fn supports_capture(&self) -> bool {
        true
    }

    async fn init(&self) -> Result<(), AdapterError> {
        self.record_call("init");
        if *self.fail_init.read().unwrap() {
            return Err(AdapterError::Credential(
                "simulated credential rejection".to_string(),
            ));
        }
        Ok(())
    }

    async fn create_order(&self, order: &OrderRequest) -> Result<OrderSnapshot, AdapterError> {
        self.record_call("create_order");

        if self.should_fail() {
            return Err(AdapterError::Gateway {
                code: 500,
                message: "simulated gateway failure".to_string(),
            });
        }

        let supported: Vec<&str> = self.supported_currencies.iter().map(String::as_str).collect();
        if !order.currency.is_supported_by(&supported) {
            return Err(AdapterError::UnsupportedCurrency {
                currency: order.currency.as_str().to_string(),
                supported: self.supported_currencies.clone(),
            });
        }

        let payment_link = format!(
            "{}?order_id={}",
            self.gateway.endpoint_url("checkout"),
            order.order_id
        );

        Ok(OrderSnapshot::new(order.order_id.clone())
            .with_status(OrderStatus::Created)
            .with_payment_link(payment_link)
            .with_created_at(order.created_at.clone())
            .with_raw_response(json!({
                "id": format!("STUB-{}", order.order_id),
                "status": "CREATED",
                "amount": order.amount.to_string(),
                "currency": order.currency.as_str(),
            })))
    }

    async fn capture_order(&self, snapshot: &OrderSnapshot) -> Result<OrderSnapshot, AdapterError> {
        self.record_call("capture_order");

        if self.should_fail() {
            return Err(AdapterError::Gateway {
                code: 500,
                message: "simulated capture failure".to_string(),
            });
        }

        Ok(snapshot.with_status(*self.capture_status.read().unwrap()))
    }

    async fn verify_webhook(
        &self,
        headers: &WebhookHeaders,
        body: &[u8],
        snapshot: &OrderSnapshot,
    ) -> Result<OrderSnapshot, AdapterError> {
        self.record_call("verify_webhook");

        let payload = parse_payload(headers, body)
            .map_err(|error| AdapterError::Webhook(error.to_string()))?;

        // Signature mismatch is inconclusive, not an error: the status
        // stays unchanged so nothing downstream advances.
        if let Some(secret) = &self.webhook_secret {
            let presented = headers
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(STUB_SIGNATURE_HEADER))
                .map(|(_, value)| value.as_str());
            if presented != Some(secret.as_str()) {
                tracing::warn!(order_id = %snapshot.order_id, "Stub webhook signature mismatch");
                return Ok(snapshot.clone());
            }
        }

        if payload.get("order_id").and_then(|v| v.as_str()) != Some(snapshot.order_id.as_str()) {
            return Ok(snapshot.clone());
        }

        match Self::status_from_payload(&payload) {
            Some(status) => Ok(snapshot.with_status(status).with_raw_response(payload)),
            None => Ok(snapshot.clone()),
        }
    }

    async fn fetch_order_status(
        &self,
        snapshot: &OrderSnapshot,
    ) -> Result<OrderSnapshot, AdapterError> {
        self.record_call("fetch_order_status");

        if self.should_fail() {
            return Err(AdapterError::Gateway {
                code: 500,
                message: "simulated status fetch failure".to_string(),
            });
        }

        Ok(snapshot.with_status(*self.fetch_status.read().unwrap()))
    }

    fn extract_order_id(
        &self,
        headers: &WebhookHeaders,
        body: &[u8],
    ) -> Result<String, AdapterError> {
        let payload = parse_payload(headers, body)
            .map_err(|error| AdapterError::Webhook(error.to_string()))?;

        payload
            .get("order_id")
            .and_then(|value| value.as_str())
            .map(str::to_string)
            .ok_or_else(|| AdapterError::Webhook("webhook payload has no order_id".to_string()))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use payrail_domain::{Amount, Currency};
    use rust_decimal_macros::dec;

    fn request(order_id: &str, currency: &str) -> OrderRequest {
        OrderRequest::new(
            order_id,
            Amount::new(dec!(12.50)).unwrap(),
            Currency::new(currency).unwrap(),
            "2025-06-01 12:00:00",
        )
    }

    fn json_headers() -> WebhookHeaders {
        let mut headers = HashMap::new();
        headers.insert("content-type".to_string(), "application/json".to_string());
        headers
    }

    #[tokio::test]
    async fn test_create_order_returns_created_snapshot() {
        let stub = StubGateway::new();

        let snapshot = stub.create_order(&request("order_1", "USD")).await.unwrap();

        assert_eq!(snapshot.order_id, "order_1");
        assert_eq!(snapshot.status, OrderStatus::Created);
        assert!(snapshot.payment_link.contains("order_id=order_1"));
        assert_eq!(stub.call_count("create_order"), 1);
    }

    #[tokio::test]
    async fn test_create_order_rejects_unsupported_currency() {
        let stub = StubGateway::new().with_currencies(&["CNY"]);

        let result = stub.create_order(&request("order_1", "USD")).await;

        assert!(matches!(
            result,
            Err(AdapterError::UnsupportedCurrency { .. })
        ));
    }

    #[tokio::test]
    async fn test_simulated_failure_resets() {
        let stub = StubGateway::new();
        stub.set_fail_next(true);

        assert!(stub.create_order(&request("order_1", "USD")).await.is_err());
        assert!(stub.create_order(&request("order_1", "USD")).await.is_ok());
    }

    #[tokio::test]
    async fn test_capture_uses_scripted_status() {
        let stub = StubGateway::new();
        stub.set_capture_status(OrderStatus::Paid);

        let created = stub.create_order(&request("order_1", "USD")).await.unwrap();
        let captured = stub.capture_order(&created).await.unwrap();

        assert_eq!(captured.status, OrderStatus::Paid);
    }

    #[tokio::test]
    async fn test_webhook_maps_status() {
        let stub = StubGateway::new();
        let created = stub.create_order(&request("order_1", "USD")).await.unwrap();

        let body = br#"{"order_id": "order_1", "status": "PAID"}"#;
        let verified = stub
            .verify_webhook(&json_headers(), body, &created)
            .await
            .unwrap();

        assert_eq!(verified.status, OrderStatus::Paid);
    }

    #[tokio::test]
    async fn test_webhook_signature_mismatch_keeps_status() {
        let stub = StubGateway::new().with_webhook_secret("s3cret");
        let created = stub.create_order(&request("order_1", "USD")).await.unwrap();

        let mut headers = json_headers();
        headers.insert(STUB_SIGNATURE_HEADER.to_string(), "wrong".to_string());
        let body = br#"{"order_id": "order_1", "status": "PAID"}"#;

        let verified = stub.verify_webhook(&headers, body, &created).await.unwrap();

        // Status unchanged: verification failed, nothing fabricated
        assert_eq!(verified.status, OrderStatus::Created);
    }

    #[tokio::test]
    async fn test_webhook_for_other_order_keeps_status() {
        let stub = StubGateway::new();
        let created = stub.create_order(&request("order_1", "USD")).await.unwrap();

        let body = br#"{"order_id": "order_2", "status": "PAID"}"#;
        let verified = stub
            .verify_webhook(&json_headers(), body, &created)
            .await
            .unwrap();

        assert_eq!(verified.status, OrderStatus::Created);
    }

    #[tokio::test]
    async fn test_fetch_order_status_scripted() {
        let stub = StubGateway::new();
        stub.set_fetch_status(OrderStatus::Paid);

        let created = stub.create_order(&request("order_1", "USD")).await.unwrap();
        let fetched = stub.fetch_order_status(&created).await.unwrap();

        assert_eq!(fetched.status, OrderStatus::Paid);
        assert_eq!(stub.call_count("fetch_order_status"), 1);
    }

    #[test]
    fn test_extract_order_id() {
        let stub = StubGateway::new();

        let body = br#"{"order_id": "order_7", "status": "PAID"}"#;
        let order_id = stub.extract_order_id(&json_headers(), body).unwrap();
        assert_eq!(order_id, "order_7");

        let missing = stub.extract_order_id(&json_headers(), br#"{"status": "PAID"}"#);
        assert!(matches!(missing, Err(AdapterError::Webhook(_))));
    }

    #[tokio::test]
    async fn test_failing_init() {
        let stub = StubGateway::new();
        stub.set_fail_init(true);

        assert!(matches!(stub.init().await, Err(AdapterError::Credential(_))));
    }
}
