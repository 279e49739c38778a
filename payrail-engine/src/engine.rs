//! The order engine.
//!
//! The engine is the orchestrator: it creates orders (driver + context +
//! watcher), funnels every externally observed snapshot through
//! `apply_snapshot`, and tears watchers down once an order reaches a
//! terminal outcome. It owns the order -> context and order -> watcher
//! maps; the only mutable shared state per order is its context, whose
//! lock is the sole serialization point.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use payrail_adapters::GatewayDriver;
use payrail_domain::{OrderRequest, OrderSnapshot, OrderStatus};

use crate::context::OrderContext;
use crate::error::{EngineError, EngineResult};
use crate::event_bus::EventBus;
use crate::manager::AdapterManager;
use crate::watcher::TimeoutWatcher;

/// Orchestrates payment orders across gateway adapters.
///
/// Contexts are never evicted within the engine's lifetime; watchers are
/// removed as soon as they are stopped.
pub struct OrderEngine {
    /// Initialized gateway drivers by adapter name
    manager: AdapterManager,
    /// Bus handed to every order context (None = no event publication)
    event_bus: Option<Arc<EventBus>>,
    /// order_id -> context, grows for the engine's lifetime
    orders: RwLock<HashMap<String, Arc<OrderContext>>>,
    /// order_id -> watcher, removed once stopped
    watchers: Mutex<HashMap<String, TimeoutWatcher>>,
    /// Total time before a silent order is reconciled
    order_timeout: Duration,
    /// Reconciliation cadence forwarded to watchers
    reconcile_interval: Duration,
    /// Handle given to watchers so they never keep the engine alive
    weak_self: Weak<OrderEngine>,
}

impl OrderEngine {
    /// Create an engine over an initialized adapter manager.
    pub fn new(
        manager: AdapterManager,
        event_bus: Option<Arc<EventBus>>,
        order_timeout: Duration,
        reconcile_interval: Duration,
    ) -> Arc<Self> {
        Arc::new_cyclic(|weak_self| Self {
            manager,
            event_bus,
            orders: RwLock::new(HashMap::new()),
            watchers: Mutex::new(HashMap::new()),
            order_timeout,
            reconcile_interval,
            weak_self: weak_self.clone(),
        })
    }

    /// The adapter manager this engine resolves drivers from.
    pub fn manager(&self) -> &AdapterManager {
        &self.manager
    }

    /// Create an order through a named adapter.
    ///
    /// The only construction site for a context/watcher pair. Fails with
    /// `DuplicateOrder` when the id already has a context - the existing
    /// order is left untouched.
    pub async fn create_order(
        &self,
        adapter: &str,
        request: OrderRequest,
    ) -> EngineResult<OrderSnapshot> {
        {
            let orders = self.orders.read().await;
            if orders.contains_key(&request.order_id) {
                return Err(EngineError::DuplicateOrder(request.order_id.clone()));
            }
        }

        let driver = self.manager.get(adapter)?;
        let snapshot = driver.create_order(&request).await?;

        let order_id = request.order_id;
        let context = Arc::new(OrderContext::new(
            driver,
            snapshot.clone(),
            self.event_bus.clone(),
        ));

        {
            let mut orders = self.orders.write().await;
            match orders.entry(order_id.clone()) {
                // A concurrent creation won the race while we talked to
                // the gateway; its context stays untouched.
                Entry::Occupied(_) => {
                    return Err(EngineError::DuplicateOrder(order_id));
                }
                Entry::Vacant(vacant) => {
                    vacant.insert(context);
                }
            }
        }

        let watcher = TimeoutWatcher::start(
            order_id.clone(),
            self.weak_self.clone(),
            self.order_timeout,
            self.reconcile_interval,
        );
        self.watchers.lock().await.insert(order_id.clone(), watcher);

        info!(order_id = %order_id, adapter, status = %snapshot.status, "Order created");
        Ok(snapshot)
    }

    /// Apply an externally observed snapshot.
    ///
    /// The single funnel for every downstream state change - webhook,
    /// explicit capture, poll, or watcher reconciliation. Returns `true`
    /// when the snapshot was committed; `false` is the explicit "no-op
    /// because already terminal" signal.
    ///
    /// # Errors
    ///
    /// `UnknownOrder` when no context exists for the snapshot's order id;
    /// no state changes in that case.
    pub async fn apply_snapshot(&self, snapshot: OrderSnapshot) -> EngineResult<bool> {
        let context = self.context(&snapshot.order_id).await?;

        let order_id = snapshot.order_id.clone();
        let status = snapshot.status;

        let applied = context.update_snapshot(snapshot).await;
        if applied {
            info!(order_id = %order_id, status = %status, "Order status advanced");

            if status.is_terminal() {
                let watcher = self.watchers.lock().await.remove(&order_id);
                if let Some(watcher) = watcher {
                    watcher.stop();
                }
            }
        } else {
            debug!(order_id = %order_id, "Snapshot not applied: order already finished");
        }

        Ok(applied)
    }

    /// Current status of an order.
    pub async fn order_status(&self, order_id: &str) -> EngineResult<OrderStatus> {
        Ok(self.context(order_id).await?.status().await)
    }

    /// Latest committed snapshot of an order.
    ///
    /// The caller may observe a snapshot that is about to be superseded;
    /// reads never block a concurrent writer beyond the brief lock hold.
    pub async fn order_snapshot(&self, order_id: &str) -> EngineResult<OrderSnapshot> {
        Ok(self.context(order_id).await?.snapshot().await)
    }

    /// Driver assigned to an order at creation.
    pub async fn order_driver(&self, order_id: &str) -> EngineResult<Arc<dyn GatewayDriver>> {
        Ok(self.context(order_id).await?.driver())
    }

    /// Ids of all orders this engine created.
    pub async fn list_orders(&self) -> Vec<String> {
        self.orders.read().await.keys().cloned().collect()
    }

    /// Number of watchers still armed (stopped watchers are discarded).
    pub async fn watcher_count(&self) -> usize {
        self.watchers.lock().await.len()
    }

    async fn context(&self, order_id: &str) -> EngineResult<Arc<OrderContext>> {
        self.orders
            .read()
            .await
            .get(order_id)
            .cloned()
            .ok_or_else(|| EngineError::UnknownOrder(order_id.to_string()))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use payrail_adapters::{AdapterError, StubGateway};
    use payrail_domain::{Amount, Currency, OrderEvent, OrderEventKind};
    use rust_decimal_macros::dec;
    use tokio::sync::mpsc;

    use crate::manager::{shared_driver_factory, AdapterManager, AdapterSettings};

    async fn build_engine(
        stub: Arc<StubGateway>,
        event_bus: Option<Arc<EventBus>>,
        order_timeout: Duration,
    ) -> Arc<OrderEngine> {
        let factories = vec![("stub".to_string(), shared_driver_factory(stub))];
        let manager = AdapterManager::create(&AdapterSettings::default(), factories)
            .await
            .unwrap();
        OrderEngine::new(manager, event_bus, order_timeout, Duration::from_secs(10))
    }

    fn request(order_id: &str) -> OrderRequest {
        OrderRequest::new(
            order_id,
            Amount::new(dec!(25.00)).unwrap(),
            Currency::new("USD").unwrap(),
            "2025-06-01 12:00:00",
        )
    }

    fn snapshot(order_id: &str, status: OrderStatus) -> OrderSnapshot {
        OrderSnapshot::new(order_id).with_status(status)
    }

    async fn subscribe_events(bus: &EventBus) -> mpsc::Receiver<(String, &'static str)> {
        let (tx, rx) = mpsc::channel(8);
        let paid_tx = tx.clone();
        bus.subscribe(OrderEventKind::Paid, move |event: OrderEvent| {
            let tx = paid_tx.clone();
            async move {
                tx.send((event.order_id().to_string(), "paid")).await?;
                Ok(())
            }
        })
        .await;
        bus.subscribe(OrderEventKind::Failed, move |event: OrderEvent| {
            let tx = tx.clone();
            async move {
                tx.send((event.order_id().to_string(), "failed")).await?;
                Ok(())
            }
        })
        .await;
        rx
    }

    #[tokio::test]
    async fn test_create_order_registers_context_and_watcher() {
        let stub = Arc::new(StubGateway::new());
        let engine = build_engine(stub, None, Duration::from_secs(600)).await;

        let created = engine.create_order("stub", request("order_1")).await.unwrap();

        assert_eq!(created.status, OrderStatus::Created);
        assert_eq!(engine.order_status("order_1").await.unwrap(), OrderStatus::Created);
        assert_eq!(engine.list_orders().await, vec!["order_1".to_string()]);
        assert_eq!(engine.watcher_count().await, 1);
    }

    #[tokio::test]
    async fn test_duplicate_create_fails_without_touching_existing() {
        let stub = Arc::new(StubGateway::new());
        let engine = build_engine(stub, None, Duration::from_secs(600)).await;

        engine.create_order("stub", request("order_1")).await.unwrap();
        engine
            .apply_snapshot(snapshot("order_1", OrderStatus::Captured))
            .await
            .unwrap();

        let result = engine.create_order("stub", request("order_1")).await;

        assert!(matches!(result, Err(EngineError::DuplicateOrder(id)) if id == "order_1"));
        // Existing context untouched
        assert_eq!(
            engine.order_status("order_1").await.unwrap(),
            OrderStatus::Captured
        );
    }

    #[tokio::test]
    async fn test_create_order_unknown_adapter() {
        let stub = Arc::new(StubGateway::new());
        let engine = build_engine(stub, None, Duration::from_secs(600)).await;

        let result = engine.create_order("alipay", request("order_1")).await;
        assert!(matches!(result, Err(EngineError::AdapterNotRegistered(_))));
        assert!(engine.list_orders().await.is_empty());
    }

    #[tokio::test]
    async fn test_create_order_adapter_failure_registers_nothing() {
        let stub = Arc::new(StubGateway::new());
        let engine = build_engine(Arc::clone(&stub), None, Duration::from_secs(600)).await;
        stub.set_fail_next(true);

        let result = engine.create_order("stub", request("order_1")).await;

        assert!(matches!(
            result,
            Err(EngineError::Adapter(AdapterError::Gateway { .. }))
        ));
        assert!(engine.list_orders().await.is_empty());
        assert_eq!(engine.watcher_count().await, 0);
    }

    #[tokio::test]
    async fn test_apply_snapshot_unknown_order() {
        let stub = Arc::new(StubGateway::new());
        let engine = build_engine(stub, None, Duration::from_secs(600)).await;

        let result = engine
            .apply_snapshot(snapshot("ghost", OrderStatus::Paid))
            .await;

        assert!(matches!(result, Err(EngineError::UnknownOrder(id)) if id == "ghost"));
    }

    #[tokio::test]
    async fn test_terminal_snapshot_stops_watcher() {
        let stub = Arc::new(StubGateway::new());
        let engine = build_engine(stub, None, Duration::from_secs(600)).await;
        engine.create_order("stub", request("order_1")).await.unwrap();
        assert_eq!(engine.watcher_count().await, 1);

        let applied = engine
            .apply_snapshot(snapshot("order_1", OrderStatus::Paid))
            .await
            .unwrap();

        assert!(applied);
        assert_eq!(engine.watcher_count().await, 0);
    }

    #[tokio::test]
    async fn test_paid_then_failed_is_rejected_with_single_event() {
        let bus = Arc::new(EventBus::new());
        let mut events = subscribe_events(&bus).await;
        let stub = Arc::new(StubGateway::new());
        let engine = build_engine(stub, Some(bus), Duration::from_secs(600)).await;

        engine.create_order("stub", request("order_1")).await.unwrap();

        let paid = engine
            .apply_snapshot(snapshot("order_1", OrderStatus::Paid))
            .await
            .unwrap();
        assert!(paid);
        assert_eq!(engine.order_status("order_1").await.unwrap(), OrderStatus::Paid);
        assert_eq!(events.recv().await.unwrap(), ("order_1".to_string(), "paid"));

        // Late FAILED loses against the terminal state: not applied, no event
        let failed = engine
            .apply_snapshot(snapshot("order_1", OrderStatus::Failed))
            .await
            .unwrap();
        assert!(!failed);
        assert_eq!(engine.order_status("order_1").await.unwrap(), OrderStatus::Paid);
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_timeout_reconciliation_without_explicit_apply() {
        let stub = Arc::new(StubGateway::new());
        stub.set_fetch_status(OrderStatus::Paid);
        let engine = build_engine(Arc::clone(&stub), None, Duration::from_millis(40)).await;

        engine.create_order("stub", request("order_1")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(250)).await;

        // The watcher polled the gateway once and the result flowed
        // through the normal snapshot path
        assert_eq!(
            engine.order_status("order_1").await.unwrap(),
            OrderStatus::Paid
        );
        assert_eq!(stub.call_count("fetch_order_status"), 1);
        assert_eq!(engine.watcher_count().await, 0);
    }

    #[tokio::test]
    async fn test_orders_progress_independently() {
        let stub = Arc::new(StubGateway::new());
        let engine = build_engine(stub, None, Duration::from_secs(600)).await;

        engine.create_order("stub", request("order_1")).await.unwrap();
        engine.create_order("stub", request("order_2")).await.unwrap();

        engine
            .apply_snapshot(snapshot("order_1", OrderStatus::Paid))
            .await
            .unwrap();

        assert_eq!(engine.order_status("order_1").await.unwrap(), OrderStatus::Paid);
        assert_eq!(engine.order_status("order_2").await.unwrap(), OrderStatus::Created);

        let mut ids = engine.list_orders().await;
        ids.sort();
        assert_eq!(ids, vec!["order_1".to_string(), "order_2".to_string()]);
    }

    #[tokio::test]
    async fn test_order_driver_is_creation_driver() {
        let stub = Arc::new(StubGateway::new());
        let engine = build_engine(Arc::clone(&stub), None, Duration::from_secs(600)).await;
        engine.create_order("stub", request("order_1")).await.unwrap();

        let driver = engine.order_driver("order_1").await.unwrap();
        let polled = driver
            .fetch_order_status(&engine.order_snapshot("order_1").await.unwrap())
            .await
            .unwrap();

        // Resolved driver is the stub that created the order
        assert_eq!(polled.order_id, "order_1");
        assert_eq!(stub.call_count("create_order"), 1);
        assert_eq!(stub.call_count("fetch_order_status"), 1);
    }
}
