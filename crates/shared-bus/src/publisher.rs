//! # Event Publisher
//!
//! In-memory stand-in for the transport that delivers ledger events.

use crate::events::{EventKind, LedgerEvent};
use crate::subscriber::{EventHandler, HandlerRegistry, LedgerEventSource, SubscriptionId};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, trace};

/// Trait for publishing events to the bus.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish an event to the bus.
    ///
    /// # Returns
    ///
    /// The number of handlers that received the event.
    async fn publish(&self, event: LedgerEvent) -> usize;

    /// Get the total number of events published.
    fn events_published(&self) -> u64;
}

/// In-memory implementation of the ledger event feed.
///
/// Handlers run on the publishing task. Publishes are serialized through an
/// async mutex, so concurrent publishers are delivered in the order they
/// acquired it and each event is fully dispatched before the next.
pub struct InMemoryEventBus {
    registry: HandlerRegistry,

    /// Serializes dispatch.
    delivery: tokio::sync::Mutex<()>,

    /// Total events published.
    events_published: AtomicU64,

    /// Events published with no handler for their kind.
    events_dropped: AtomicU64,
}

impl InMemoryEventBus {
    #[must_use]
    pub fn new() -> Self {
        Self {
            registry: HandlerRegistry::new(),
            delivery: tokio::sync::Mutex::new(()),
            events_published: AtomicU64::new(0),
            events_dropped: AtomicU64::new(0),
        }
    }

    /// Number of handlers registered for `kind`.
    #[must_use]
    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.registry.count(kind)
    }

    /// Number of handlers across all kinds.
    #[must_use]
    pub fn total_subscribers(&self) -> usize {
        self.registry.total()
    }

    /// Events dropped for lack of a handler.
    #[must_use]
    pub fn events_dropped(&self) -> u64 {
        self.events_dropped.load(Ordering::Relaxed)
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl LedgerEventSource for InMemoryEventBus {
    fn subscribe(&self, kind: EventKind, handler: EventHandler) -> SubscriptionId {
        self.registry.add(kind, handler)
    }

    fn unsubscribe(&self, kind: EventKind, id: SubscriptionId) -> bool {
        self.registry.remove(kind, id)
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: LedgerEvent) -> usize {
        let _delivery = self.delivery.lock().await;
        let kind = event.kind();

        // Always increment counter (event was attempted)
        self.events_published.fetch_add(1, Ordering::Relaxed);

        let handlers = self.registry.snapshot(kind);
        if handlers.is_empty() {
            self.events_dropped.fetch_add(1, Ordering::Relaxed);
            trace!(kind = %kind, "Event dropped (no handlers)");
            return 0;
        }

        for handler in &handlers {
            handler(&event);
        }
        debug!(kind = %kind, receivers = handlers.len(), "Event published");
        handlers.len()
    }

    fn events_published(&self) -> u64 {
        self.events_published.load(Ordering::Relaxed)
    }
}
