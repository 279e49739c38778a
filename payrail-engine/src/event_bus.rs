//! Event bus for order lifecycle notifications.
//!
//! Decouples state transitions from their side effects: the context
//! publishes `OrderEvent`s, subscribers (fulfillment, notifications, ...)
//! react without ever blocking the publisher.
//!
//! Dispatch contract:
//! - one spawned task per handler invocation
//! - a failing handler is logged and never stops sibling handlers
//! - delivery is best-effort; handlers must be idempotent

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, error};

use payrail_domain::{OrderEvent, OrderEventKind};

/// Boxed future returned by event handlers.
pub type HandlerFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>;

/// An order event subscriber.
///
/// Implemented for free by any `Fn(OrderEvent) -> impl Future` closure, so
/// subscribing reads naturally:
///
/// ```rust,ignore
/// bus.subscribe(OrderEventKind::Paid, |event: OrderEvent| async move {
///     notify_fulfillment(event.order_id()).await
/// }).await;
/// ```
pub trait EventHandler: Send + Sync {
    /// Handle one event occurrence.
    fn call(&self, event: OrderEvent) -> HandlerFuture;
}

impl<F, Fut> EventHandler for F
where
    F: Fn(OrderEvent) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    fn call(&self, event: OrderEvent) -> HandlerFuture {
        Box::pin(self(event))
    }
}

/// Typed publish/subscribe bus for order events.
///
/// Handlers for one kind keep insertion order in the registry, but dispatch
/// is concurrent: effects may interleave in any order.
pub struct EventBus {
    subscribers: RwLock<HashMap<OrderEventKind, Vec<Arc<dyn EventHandler>>>>,
}

impl EventBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
        }
    }

    /// Register a handler for an event kind.
    ///
    /// There is no deregistration; the handler lives as long as the bus.
    pub async fn subscribe<H>(&self, kind: OrderEventKind, handler: H)
    where
        H: EventHandler + 'static,
    {
        let mut subscribers = self.subscribers.write().await;
        subscribers.entry(kind).or_default().push(Arc::new(handler));
        debug!(?kind, "Event handler subscribed");
    }

    /// Publish an event to all matching handlers.
    ///
    /// Each handler runs in its own task behind an error boundary; nothing
    /// propagates back to the publisher. Returns the number of handlers
    /// scheduled.
    pub async fn publish(&self, event: OrderEvent) -> usize {
        let handlers = {
            let subscribers = self.subscribers.read().await;
            subscribers.get(&event.kind()).cloned().unwrap_or_default()
        };

        for handler in &handlers {
            let handler = Arc::clone(handler);
            let event = event.clone();
            tokio::spawn(async move {
                if let Err(err) = handler.call(event.clone()).await {
                    error!(
                        order_id = %event.order_id(),
                        event_type = event.event_type(),
                        error = %err,
                        "Event handler failed"
                    );
                }
            });
        }

        handlers.len()
    }

    /// Number of handlers registered for a kind.
    pub async fn handler_count(&self, kind: OrderEventKind) -> usize {
        self.subscribers
            .read()
            .await
            .get(&kind)
            .map_or(0, Vec::len)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================
