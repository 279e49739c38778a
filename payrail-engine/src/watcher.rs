//! Per-order timeout watcher.
//!
//! Gateways notify asynchronously, and notifications get delayed or lost.
//! Each order therefore gets exactly one background watcher that races an
//! explicit stop signal against the order timeout. If the deadline elapses
//! first, the watcher performs a single reconciliation pass: poll the
//! gateway for the order's true status and feed the result back through
//! the engine's normal snapshot path, so the terminal-state and event
//! invariants still apply.

use std::sync::Weak;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::engine::OrderEngine;
use crate::error::EngineResult;

/// Background reconciliation timer, one per active order.
///
/// The watcher holds only a weak engine handle: if the engine is gone by
/// the time the deadline fires, the watcher exits silently.
pub struct TimeoutWatcher {
    order_id: String,
    stop: CancellationToken,
    task: JoinHandle<()>,
}

impl TimeoutWatcher {
    /// Arm a watcher for an order.
    ///
    /// `interval` is the reconciliation cadence reserved for periodic
    /// re-checks; the current watcher fires once, at `timeout`.
    pub(crate) fn start(
        order_id: String,
        engine: Weak<OrderEngine>,
        timeout: Duration,
        interval: Duration,
    ) -> Self {
        let stop = CancellationToken::new();
        let token = stop.clone();
        let id = order_id.clone();

        let task = tokio::spawn(async move {
            debug!(
                order_id = %id,
                timeout_ms = timeout.as_millis() as u64,
                interval_ms = interval.as_millis() as u64,
                "Timeout watcher armed"
            );

            tokio::select! {
                _ = token.cancelled() => {
                    debug!(order_id = %id, "Timeout watcher stopped before deadline");
                    return;
                }
                _ = tokio::time::sleep(timeout) => {}
            }

            let Some(engine) = engine.upgrade() else {
                return;
            };

            info!(order_id = %id, "Order reached timeout, verifying with gateway");
            if let Err(err) = Self::reconcile(&engine, &id).await {
                error!(order_id = %id, error = %err, "Timeout reconciliation failed");
            }
        });

        Self {
            order_id,
            stop,
            task,
        }
    }

    /// One reconciliation pass: fetch the gateway's view of the order and
    /// apply it through the engine funnel. No retry, no re-arm.
    async fn reconcile(engine: &std::sync::Arc<OrderEngine>, order_id: &str) -> EngineResult<()> {
        let driver = engine.order_driver(order_id).await?;
        let snapshot = engine.order_snapshot(order_id).await?;

        let fresh = driver.fetch_order_status(&snapshot).await?;
        engine.apply_snapshot(fresh).await?;

        debug!(order_id, "Timeout watcher reconciliation applied");
        Ok(())
    }

    /// Signal the watcher to stop.
    ///
    /// Safe to call repeatedly and after the deadline fired. A
    /// reconciliation pass already in flight is allowed to complete; its
    /// late snapshot is harmless because `apply_snapshot` re-checks
    /// terminality.
    pub fn stop(&self) {
        debug!(order_id = %self.order_id, "Stopping timeout watcher");
        self.stop.cancel();
    }

    /// Whether the watcher task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

// =============================================================================
// Tests
// =============================================================================
