//! Gateway port definition.
//!
//! The port defines the capability contract for payment gateway services.
//! Adapters implement it for specific gateways (stub, Alipay, PayPal, etc.).

use async_trait::async_trait;
use std::collections::HashMap;

use payrail_domain::{OrderRequest, OrderSnapshot};

use crate::error::AdapterError;

/// HTTP headers of an inbound webhook, as a plain name -> value map.
///
/// Lookups are adapter-specific; `AdapterDetector` normalizes keys to
/// lowercase before matching.
pub type WebhookHeaders = HashMap<String, String>;

/// Port for payment gateway operations.
///
/// Implementations:
/// - `StubGateway` - For testing (scripted statuses, no network)
/// - External gateway crates (Alipay, PayPal, ...) out of tree
///
/// Drivers never mutate snapshots: every method that advances an order
/// returns a NEW snapshot derived from its input.
#[async_trait]
pub trait GatewayDriver: Send + Sync {
    /// Whether this gateway needs an explicit capture step.
    ///
    /// Auto-capturing gateways return `false` and treat `capture_order`
    /// as a pass-through.
    fn supports_capture(&self) -> bool {
        false
    }

    /// One-time setup (e.g., obtaining an access token, validating a
    /// webhook registration). Must complete before any other method is
    /// called; a failure here aborts adapter manager construction.
    async fn init(&self) -> Result<(), AdapterError> {
        Ok(())
    }

    /// Construct and issue the gateway-specific order request.
    ///
    /// # Returns
    ///
    /// A snapshot with status `Created` and the hosted payment link.
    ///
    /// # Errors
    ///
    /// Credential/config errors for invalid configuration,
    /// `UnsupportedCurrency` when the gateway rejects the currency.
    async fn create_order(&self, order: &OrderRequest) -> Result<OrderSnapshot, AdapterError>;

    /// Advance a created order toward `Captured`/`Paid` per gateway
    /// semantics. Auto-capture gateways simply re-stamp the status.
    async fn capture_order(&self, snapshot: &OrderSnapshot) -> Result<OrderSnapshot, AdapterError>;

    /// Validate an inbound notification's authenticity and map it to a new
    /// status.
    ///
    /// Returns a snapshot with the UNCHANGED input status when verification
    /// fails or the event is not yet conclusive; never fabricates success.
    async fn verify_webhook(
        &self,
        headers: &WebhookHeaders,
        body: &[u8],
        snapshot: &OrderSnapshot,
    ) -> Result<OrderSnapshot, AdapterError>;

    /// Actively poll the gateway and map its status vocabulary to
    /// `OrderStatus`. Business-negative outcomes come back as `Failed`
    /// snapshots, not errors.
    async fn fetch_order_status(
        &self,
        snapshot: &OrderSnapshot,
    ) -> Result<OrderSnapshot, AdapterError>;

    /// Extract the order id that an inbound webhook refers to.
    ///
    /// Pure and side-effect free: used to route the webhook to the correct
    /// order before any context lookup.
    fn extract_order_id(
        &self,
        headers: &WebhookHeaders,
        body: &[u8],
    ) -> Result<String, AdapterError>;
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use payrail_domain::OrderStatus;

    /// Minimal driver exercising the trait defaults.
    struct PassthroughDriver;

    #[async_trait]
    impl GatewayDriver for PassthroughDriver {
        async fn create_order(
            &self,
            order: &OrderRequest,
        ) -> Result<OrderSnapshot, AdapterError> {
            Ok(OrderSnapshot::new(order.order_id.clone()).with_status(OrderStatus::Created))
        }

        async fn capture_order(
            &self,
            snapshot: &OrderSnapshot,
        ) -> Result<OrderSnapshot, AdapterError> {
            Ok(snapshot.with_status(OrderStatus::Captured))
        }

        async fn verify_webhook(
            &self,
            _headers: &WebhookHeaders,
            _body: &[u8],
            snapshot: &OrderSnapshot,
        ) -> Result<OrderSnapshot, AdapterError> {
            Ok(snapshot.clone())
        }

        async fn fetch_order_status(
            &self,
            snapshot: &OrderSnapshot,
        ) -> Result<OrderSnapshot, AdapterError> {
            Ok(snapshot.clone())
        }

        fn extract_order_id(
            &self,
            _headers: &WebhookHeaders,
            _body: &[u8],
        ) -> Result<String, AdapterError> {
            Ok("order_1".to_string())
        }
    }

    #[tokio::test]
    async fn test_trait_defaults() {
        let driver = PassthroughDriver;

        assert!(!driver.supports_capture());
        assert!(driver.init().await.is_ok());
    }

    #[tokio::test]
    async fn test_driver_is_object_safe() {
        let driver: std::sync::Arc<dyn GatewayDriver> = std::sync::Arc::new(PassthroughDriver);
        let request = OrderRequest::new(
            "order_1",
            payrail_domain::Amount::new(rust_decimal_macros::dec!(1)).unwrap(),
            payrail_domain::Currency::new("USD").unwrap(),
            "2025-06-01 12:00:00",
        );

        let snapshot = driver.create_order(&request).await.unwrap();
        assert_eq!(snapshot.status, OrderStatus::Created);
    }
}
