//! Per-order state holder.
//!
//! An `OrderContext` owns exactly one order's current snapshot plus the
//! driver that created the order. Its lock is the single serialization
//! point for that order: webhook delivery, explicit capture and timeout
//! reconciliation all race here, and whichever snapshot wins the race
//! becomes current.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info};

use payrail_adapters::GatewayDriver;
use payrail_domain::{OrderEvent, OrderSnapshot, OrderStatus};

use crate::event_bus::EventBus;

/// Concurrency-safe holder of one order's state.
///
/// Created once per order at creation time and kept for the engine's
/// lifetime. Once the held snapshot reaches a terminal status, no update
/// can change it again.
pub struct OrderContext {
    /// Driver that created the order (lifetimes are coupled)
    driver: Arc<dyn GatewayDriver>,
    /// Latest committed snapshot
    snapshot: RwLock<OrderSnapshot>,
    /// Bus for paid/failed events (None = no side effects)
    event_bus: Option<Arc<EventBus>>,
}

impl OrderContext {
    /// Create a context from the creation snapshot.
    pub fn new(
        driver: Arc<dyn GatewayDriver>,
        snapshot: OrderSnapshot,
        event_bus: Option<Arc<EventBus>>,
    ) -> Self {
        Self {
            driver,
            snapshot: RwLock::new(snapshot),
            event_bus,
        }
    }

    /// The driver assigned to this order.
    pub fn driver(&self) -> Arc<dyn GatewayDriver> {
        Arc::clone(&self.driver)
    }

    /// Latest committed snapshot (may be superseded immediately).
    pub async fn snapshot(&self) -> OrderSnapshot {
        self.snapshot.read().await.clone()
    }

    /// Latest committed status.
    pub async fn status(&self) -> OrderStatus {
        self.snapshot.read().await.status
    }

    /// Replace the held snapshot, guarding terminal states.
    ///
    /// Returns `false` without mutating anything when the current status is
    /// already terminal; the losing writer's snapshot is discarded. Returns
    /// `true` after committing the replacement.
    ///
    /// On the FIRST transition into `Paid` or `Failed` the matching event
    /// is published - strictly after the lock is released, so handlers may
    /// re-enter the engine without deadlocking on this order.
    pub async fn update_snapshot(&self, new_snapshot: OrderSnapshot) -> bool {
        let old_status = {
            let mut guard = self.snapshot.write().await;
            let old_status = guard.status;

            if old_status.is_terminal() {
                debug!(
                    order_id = %guard.order_id,
                    status = %old_status,
                    "Snapshot update rejected: order already finished"
                );
                return false;
            }

            *guard = new_snapshot.clone();
            old_status
        };

        // EVENT PUBLISH OUT OF LOCK
        if let Some(bus) = &self.event_bus {
            if old_status != OrderStatus::Paid && new_snapshot.status == OrderStatus::Paid {
                info!(order_id = %new_snapshot.order_id, "Order paid, publishing event");
                bus.publish(OrderEvent::paid(new_snapshot.clone())).await;
            }

            if old_status != OrderStatus::Failed && new_snapshot.status == OrderStatus::Failed {
                info!(order_id = %new_snapshot.order_id, "Order failed, publishing event");
                bus.publish(OrderEvent::failed(new_snapshot)).await;
            }
        }

        true
    }
}

// =============================================================================
// Tests
// =============================================================================
