//! The service facade.
//!
//! `PayrailService` exposes the inbound operations callers use: create an
//! order, capture it, verify an inbound webhook, confirm a status by
//! polling. Each operation resolves the order's driver, skips finished
//! orders, invokes the matching driver method, and funnels the result
//! through the engine's `apply_snapshot` path.

use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{debug, info};

use payrail_adapters::{AdapterDetector, AdapterError, GatewayDriver, WebhookHeaders};
use payrail_domain::{Amount, Currency, OrderRequest, OrderSnapshot, ReturnUrls};
use payrail_engine::{
    AdapterManager, AdapterSettings, DriverFactory, EventBus, OrderEngine,
};

use crate::config::Config;
use crate::error::{ServiceError, ServiceResult};

/// Facade over the order lifecycle engine.
pub struct PayrailService {
    engine: Arc<OrderEngine>,
    detector: AdapterDetector,
    config: Config,
}

impl PayrailService {
    /// Build the service: construct and initialize every configured
    /// adapter, then assemble the engine around them.
    ///
    /// Adapter construction is fail-fast; a single failing factory or
    /// init step aborts the whole service.
    pub async fn create(
        config: Config,
        factories: Vec<(String, DriverFactory)>,
        event_bus: Option<Arc<EventBus>>,
    ) -> ServiceResult<Self> {
        let settings = AdapterSettings {
            environment: config.environment,
            webhook_url: Some(config.webhook_url()),
            http_timeout: config.http_timeout,
        };

        let manager = AdapterManager::create(&settings, factories).await?;
        let engine = OrderEngine::new(
            manager,
            event_bus,
            config.order_timeout,
            config.reconcile_interval,
        );

        info!(environment = %config.environment, "Order engine ready");

        Ok(Self {
            engine,
            detector: AdapterDetector::with_default_rules(),
            config,
        })
    }

    /// Replace the webhook detector (e.g., to add rules for custom
    /// gateways).
    pub fn with_detector(mut self, detector: AdapterDetector) -> Self {
        self.detector = detector;
        self
    }

    /// The underlying engine, for read accessors and event wiring.
    pub fn engine(&self) -> &Arc<OrderEngine> {
        &self.engine
    }

    /// Create an order through a named adapter.
    ///
    /// Builds the gateway request: validated amount/currency, a creation
    /// timestamp, and the payer redirect URLs derived from the configured
    /// base URL.
    pub async fn create_order(
        &self,
        adapter: &str,
        order_id: &str,
        amount: Decimal,
        currency: &str,
        description: &str,
        metadata: Option<serde_json::Map<String, serde_json::Value>>,
    ) -> ServiceResult<OrderSnapshot> {
        let endpoints = &self.config.endpoints;
        let request = OrderRequest {
            order_id: order_id.to_string(),
            amount: Amount::new(amount)?,
            currency: Currency::new(currency)?,
            created_at: Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            return_urls: ReturnUrls {
                return_url: format!(
                    "{}{}?order_id={}",
                    self.config.base_url, endpoints.success, order_id
                ),
                cancel_url: format!(
                    "{}{}?order_id={}",
                    self.config.base_url, endpoints.cancel, order_id
                ),
            },
            description: description.to_string(),
            metadata: metadata.unwrap_or_default(),
        };

        Ok(self.engine.create_order(adapter, request).await?)
    }

    /// Capture an order (payer returned from the hosted checkout).
    ///
    /// Returns `None` when the order already reached a terminal outcome.
    pub async fn capture_order(&self, order_id: &str) -> ServiceResult<Option<OrderSnapshot>> {
        let snapshot = self
            .with_order(order_id, |driver, snapshot| async move {
                driver.capture_order(&snapshot).await
            })
            .await?;

        if let Some(snapshot) = &snapshot {
            debug!(order_id, status = %snapshot.status, "Capture processed");
        }
        Ok(snapshot)
    }

    /// Verify an inbound webhook for a known order and apply its outcome.
    ///
    /// Returns `None` when the order already reached a terminal outcome.
    pub async fn verify_webhook(
        &self,
        order_id: &str,
        headers: &WebhookHeaders,
        body: &[u8],
    ) -> ServiceResult<Option<OrderSnapshot>> {
        let headers = headers.clone();
        let body = body.to_vec();

        let snapshot = self
            .with_order(order_id, move |driver, snapshot| async move {
                driver.verify_webhook(&headers, &body, &snapshot).await
            })
            .await?;

        if let Some(snapshot) = &snapshot {
            debug!(order_id, status = %snapshot.status, "Webhook processed");
        }
        Ok(snapshot)
    }

    /// Actively poll the gateway for an order's current status.
    ///
    /// Returns `None` when the order already reached a terminal outcome.
    pub async fn confirm_order_status(
        &self,
        order_id: &str,
    ) -> ServiceResult<Option<OrderSnapshot>> {
        let snapshot = self
            .with_order(order_id, |driver, snapshot| async move {
                driver.fetch_order_status(&snapshot).await
            })
            .await?;

        if let Some(snapshot) = &snapshot {
            debug!(order_id, status = %snapshot.status, "Status confirmed");
        }
        Ok(snapshot)
    }

    /// Route an inbound webhook to its order id before any context lookup.
    ///
    /// Detection is header-based (registration order), extraction is the
    /// matched driver's pure `extract_order_id`.
    pub fn extract_order_id_from_request(
        &self,
        headers: &WebhookHeaders,
        body: &[u8],
    ) -> ServiceResult<String> {
        let adapter = self
            .detector
            .detect(headers)
            .ok_or(ServiceError::UnroutableWebhook)?;

        let driver = self.engine.manager().get(adapter)?;
        Ok(driver.extract_order_id(headers, body)?)
    }

    /// Run a driver action against an order and funnel the result through
    /// the engine.
    ///
    /// Skips (returns `None`) when the order is already terminal: there is
    /// nothing left to advance, and the gateway should not be bothered.
    async fn with_order<F, Fut>(
        &self,
        order_id: &str,
        action: F,
    ) -> ServiceResult<Option<OrderSnapshot>>
    where
        F: FnOnce(Arc<dyn GatewayDriver>, OrderSnapshot) -> Fut,
        Fut: Future<Output = Result<OrderSnapshot, AdapterError>>,
    {
        let driver = self.engine.order_driver(order_id).await?;
        let snapshot = self.engine.order_snapshot(order_id).await?;

        if snapshot.status.is_terminal() {
            debug!(order_id, status = %snapshot.status, "Order already finished");
            return Ok(None);
        }

        let fresh = action(driver, snapshot).await?;
        self.engine.apply_snapshot(fresh.clone()).await?;
        Ok(Some(fresh))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use payrail_adapters::StubGateway;
    use payrail_domain::OrderStatus;
    use payrail_engine::shared_driver_factory;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    async fn stub_service(stub: Arc<StubGateway>) -> PayrailService {
        let factories = vec![("stub".to_string(), shared_driver_factory(stub))];
        PayrailService::create(Config::test(), factories, None)
            .await
            .unwrap()
    }

    fn json_headers() -> WebhookHeaders {
        let mut headers = HashMap::new();
        headers.insert("content-type".to_string(), "application/json".to_string());
        headers
    }

    #[tokio::test]
    async fn test_create_order_builds_redirect_urls() {
        let service = stub_service(Arc::new(StubGateway::new())).await;

        let snapshot = service
            .create_order("stub", "order_1", dec!(25.00), "usd", "Sticker pack", None)
            .await
            .unwrap();

        assert_eq!(snapshot.status, OrderStatus::Created);
        assert_eq!(
            service.engine().order_status("order_1").await.unwrap(),
            OrderStatus::Created
        );
    }

    #[tokio::test]
    async fn test_create_order_rejects_bad_amount() {
        let service = stub_service(Arc::new(StubGateway::new())).await;

        let result = service
            .create_order("stub", "order_1", dec!(0), "USD", "Sticker pack", None)
            .await;

        assert!(matches!(result, Err(ServiceError::Domain(_))));
    }

    #[tokio::test]
    async fn test_capture_order_advances_status() {
        let stub = Arc::new(StubGateway::new());
        stub.set_capture_status(OrderStatus::Paid);
        let service = stub_service(Arc::clone(&stub)).await;

        service
            .create_order("stub", "order_1", dec!(25.00), "USD", "Sticker pack", None)
            .await
            .unwrap();

        let captured = service.capture_order("order_1").await.unwrap().unwrap();

        assert_eq!(captured.status, OrderStatus::Paid);
        assert_eq!(
            service.engine().order_status("order_1").await.unwrap(),
            OrderStatus::Paid
        );
    }

    #[tokio::test]
    async fn test_finished_order_skips_gateway() {
        let stub = Arc::new(StubGateway::new());
        stub.set_capture_status(OrderStatus::Paid);
        let service = stub_service(Arc::clone(&stub)).await;

        service
            .create_order("stub", "order_1", dec!(25.00), "USD", "Sticker pack", None)
            .await
            .unwrap();
        service.capture_order("order_1").await.unwrap();

        // Second capture skips: no driver call, no state change
        let skipped = service.capture_order("order_1").await.unwrap();
        assert!(skipped.is_none());
        assert_eq!(stub.call_count("capture_order"), 1);
    }

    #[tokio::test]
    async fn test_capture_unknown_order_errors() {
        let service = stub_service(Arc::new(StubGateway::new())).await;

        let result = service.capture_order("ghost").await;
        assert!(matches!(
            result,
            Err(ServiceError::Engine(payrail_engine::EngineError::UnknownOrder(_)))
        ));
    }

    #[tokio::test]
    async fn test_webhook_round_trip() {
        let service = stub_service(Arc::new(StubGateway::new())).await;

        service
            .create_order("stub", "order_1", dec!(25.00), "USD", "Sticker pack", None)
            .await
            .unwrap();

        let body = br#"{"order_id": "order_1", "status": "PAID"}"#;
        let verified = service
            .verify_webhook("order_1", &json_headers(), body)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(verified.status, OrderStatus::Paid);
    }

    #[tokio::test]
    async fn test_confirm_order_status_polls_gateway() {
        let stub = Arc::new(StubGateway::new());
        stub.set_fetch_status(OrderStatus::Failed);
        let service = stub_service(Arc::clone(&stub)).await;

        service
            .create_order("stub", "order_1", dec!(25.00), "USD", "Sticker pack", None)
            .await
            .unwrap();

        let confirmed = service.confirm_order_status("order_1").await.unwrap().unwrap();

        assert_eq!(confirmed.status, OrderStatus::Failed);
        assert_eq!(stub.call_count("fetch_order_status"), 1);
    }

    #[tokio::test]
    async fn test_webhook_routing_with_custom_detector() {
        let stub = Arc::new(StubGateway::new());
        let mut detector = AdapterDetector::new();
        detector.register("stub", |headers| headers.contains_key("x-stub-signature"));

        let service = stub_service(stub).await.with_detector(detector);

        let mut headers = json_headers();
        headers.insert("x-stub-signature".to_string(), "sig".to_string());
        let body = br#"{"order_id": "order_9", "status": "PAID"}"#;

        let order_id = service
            .extract_order_id_from_request(&headers, body)
            .unwrap();
        assert_eq!(order_id, "order_9");

        // Unroutable without the stub header
        let result = service.extract_order_id_from_request(&json_headers(), body);
        assert!(matches!(result, Err(ServiceError::UnroutableWebhook)));
    }
}
