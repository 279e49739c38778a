//! Domain Events for Payrail
//!
//! Events record a completed order state transition and are published for
//! external side effects (notifications, fulfillment). They are created
//! exactly once per order, at the moment its status first becomes `Paid`
//! or `Failed`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::order::OrderSnapshot;

/// Subscription key for the event bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderEventKind {
    /// An order reached `Paid`
    Paid,
    /// An order reached `Failed`
    Failed,
}

/// Domain events for the order lifecycle
///
/// Each event carries the triggering snapshot and an occurrence timestamp.
/// Events are edge-triggered: repeated snapshots with the same terminal
/// status never re-fire them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderEvent {
    /// Order payment completed
    OrderPaid {
        /// Order identifier
        order_id: String,
        /// Snapshot that triggered the event
        snapshot: OrderSnapshot,
        /// When the transition was observed
        occurred_at: DateTime<Utc>,
    },

    /// Order reached a negative outcome
    OrderFailed {
        /// Order identifier
        order_id: String,
        /// Snapshot that triggered the event
        snapshot: OrderSnapshot,
        /// When the transition was observed
        occurred_at: DateTime<Utc>,
    },
}

impl OrderEvent {
    /// Create a paid event from the triggering snapshot
    pub fn paid(snapshot: OrderSnapshot) -> Self {
        Self::OrderPaid {
            order_id: snapshot.order_id.clone(),
            snapshot,
            occurred_at: Utc::now(),
        }
    }

    /// Create a failed event from the triggering snapshot
    pub fn failed(snapshot: OrderSnapshot) -> Self {
        Self::OrderFailed {
            order_id: snapshot.order_id.clone(),
            snapshot,
            occurred_at: Utc::now(),
        }
    }

    /// Get the order id from any event
    pub fn order_id(&self) -> &str {
        match self {
            Self::OrderPaid { order_id, .. } | Self::OrderFailed { order_id, .. } => order_id,
        }
    }

    /// Get the triggering snapshot from any event
    pub fn snapshot(&self) -> &OrderSnapshot {
        match self {
            Self::OrderPaid { snapshot, .. } | Self::OrderFailed { snapshot, .. } => snapshot,
        }
    }

    /// Get the timestamp from any event
    pub fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            Self::OrderPaid { occurred_at, .. } | Self::OrderFailed { occurred_at, .. } => {
                *occurred_at
            }
        }
    }

    /// Get the subscription key this event dispatches under
    pub fn kind(&self) -> OrderEventKind {
        match self {
            Self::OrderPaid { .. } => OrderEventKind::Paid,
            Self::OrderFailed { .. } => OrderEventKind::Failed,
        }
    }

    /// Get the event type name
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::OrderPaid { .. } => "order_paid",
            Self::OrderFailed { .. } => "order_failed",
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
