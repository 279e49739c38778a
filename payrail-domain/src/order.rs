//! Order data model
//!
//! An order is represented by a chain of immutable snapshots. Every state
//! change produces a new `OrderSnapshot` via copy-with-changes; nothing is
//! mutated in place, and `order_id` never changes across the chain.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::value_objects::{Amount, Currency, DomainError};

// =============================================================================
// Order Status
// =============================================================================

/// Lifecycle status of a payment order
///
/// Terminal statuses (`Paid`, `Failed`, `Cancel`) accept no further
/// transitions. `Refunded` is reachable but not terminal in the current
/// scope, and `Cancel` is terminal without a dedicated domain event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Freshly constructed, nothing sent to a gateway yet
    New,
    /// Gateway accepted the order and issued a payment link
    Created,
    /// Capture step acknowledged by the gateway
    Captured,
    /// Authentic webhook received, outcome not yet conclusive
    Webhooked,
    /// Payment completed (terminal)
    Paid,
    /// Gateway reported a negative outcome (terminal)
    Failed,
    /// Order closed/voided before payment (terminal)
    Cancel,
    /// Payment returned to the payer
    Refunded,
}

impl OrderStatus {
    /// Whether this status accepts no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Paid | Self::Failed | Self::Cancel)
    }

    /// Get the wire-format status name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::Created => "CREATED",
            Self::Captured => "CAPTURED",
            Self::Webhooked => "WEBHOOKED",
            Self::Paid => "PAID",
            Self::Failed => "FAILED",
            Self::Cancel => "CANCEL",
            Self::Refunded => "REFUNDED",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Order Snapshot
// =============================================================================

/// Immutable point-in-time view of an order
///
/// Produced by gateway drivers and replaced wholesale on every state change.
/// `created_at` keeps the gateway-supplied timestamp format verbatim;
/// `raw_response` carries the opaque gateway payload when one exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSnapshot {
    /// Unique order identifier, assigned at creation, never reassigned
    pub order_id: String,
    /// Current lifecycle status
    pub status: OrderStatus,
    /// Checkout URL the payer is redirected to
    #[serde(default)]
    pub payment_link: String,
    /// Gateway request signature, when the gateway uses one
    #[serde(default)]
    pub signature: String,
    /// Creation timestamp in the gateway-supplied format
    #[serde(default)]
    pub created_at: String,
    /// Opaque gateway payload backing this snapshot
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<serde_json::Value>,
}

impl OrderSnapshot {
    /// Create a fresh snapshot in the `New` status
    pub fn new(order_id: impl Into<String>) -> Self {
        Self {
            order_id: order_id.into(),
            status: OrderStatus::New,
            payment_link: String::new(),
            signature: String::new(),
            created_at: String::new(),
            raw_response: None,
        }
    }

    /// Copy this snapshot with a different status
    pub fn with_status(&self, status: OrderStatus) -> Self {
        Self {
            status,
            ..self.clone()
        }
    }

    /// Copy this snapshot with a payment link
    pub fn with_payment_link(&self, payment_link: impl Into<String>) -> Self {
        Self {
            payment_link: payment_link.into(),
            ..self.clone()
        }
    }

    /// Copy this snapshot with a gateway signature
    pub fn with_signature(&self, signature: impl Into<String>) -> Self {
        Self {
            signature: signature.into(),
            ..self.clone()
        }
    }

    /// Copy this snapshot with a creation timestamp
    pub fn with_created_at(&self, created_at: impl Into<String>) -> Self {
        Self {
            created_at: created_at.into(),
            ..self.clone()
        }
    }

    /// Copy this snapshot with a raw gateway payload
    pub fn with_raw_response(&self, raw_response: serde_json::Value) -> Self {
        Self {
            raw_response: Some(raw_response),
            ..self.clone()
        }
    }
}

// =============================================================================
// Order Request
// =============================================================================

/// Redirect targets handed to the gateway at order creation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnUrls {
    /// Where the payer lands after approving the payment
    #[serde(default)]
    pub return_url: String,
    /// Where the payer lands after abandoning the payment
    #[serde(default)]
    pub cancel_url: String,
}

/// Input for creating an order through a gateway driver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    /// Caller-assigned unique order identifier
    pub order_id: String,
    /// Order amount
    pub amount: Amount,
    /// Order currency
    pub currency: Currency,
    /// Creation timestamp, formatted for the gateway
    pub created_at: String,
    /// Redirect targets for the hosted checkout
    pub return_urls: ReturnUrls,
    /// Human-readable order description
    pub description: String,
    /// Free-form metadata forwarded to the gateway
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl OrderRequest {
    /// Create an order request with the required fields
    pub fn new(
        order_id: impl Into<String>,
        amount: Amount,
        currency: Currency,
        created_at: impl Into<String>,
    ) -> Self {
        Self {
            order_id: order_id.into(),
            amount,
            currency,
            created_at: created_at.into(),
            return_urls: ReturnUrls::default(),
            description: "Test order".to_string(),
            metadata: serde_json::Map::new(),
        }
    }
}

// =============================================================================
// Order Id Generation
// =============================================================================

/// Create a globally unique, time-ordered order id
///
/// # Examples
/// ```
/// # use payrail_domain::order::new_order_id;
/// let order_id = new_order_id("order").unwrap();
/// assert!(order_id.starts_with("order_"));
/// ```
///
/// # Errors
/// Returns `DomainError::InvalidOrderId` if the prefix is empty
pub fn new_order_id(prefix: &str) -> Result<String, DomainError> {
    if prefix.is_empty() {
        return Err(DomainError::InvalidOrderId(
            "prefix must not be empty".to_string(),
        ));
    }
    Ok(format!("{}_{}", prefix, Uuid::now_v7().simple()))
}

// =============================================================================
// Tests
// =============================================================================
