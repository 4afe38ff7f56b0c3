//! # Event Subscriber
//!
//! The subscription side: the [`LedgerEventSource`] port and the handler
//! registry both the bus and the event bridge store their handlers in.

use crate::events::{EventKind, LedgerEvent};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Callback invoked for every delivered event of a subscribed kind.
pub type EventHandler = Arc<dyn Fn(&LedgerEvent) + Send + Sync>;

/// Handle returned by `subscribe`, required to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Anything that delivers decoded ledger events per kind.
pub trait LedgerEventSource: Send + Sync {
    /// Register `handler` for events of `kind`.
    fn subscribe(&self, kind: EventKind, handler: EventHandler) -> SubscriptionId;

    /// Remove one handler. Returns `false` if it was not registered.
    fn unsubscribe(&self, kind: EventKind, id: SubscriptionId) -> bool;
}

/// Handlers grouped by event kind, in registration order.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: RwLock<HashMap<EventKind, Vec<(SubscriptionId, EventHandler)>>>,
    next_id: AtomicU64,
}

impl HandlerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a handler and return its id.
    pub fn add(&self, kind: EventKind, handler: EventHandler) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers
            .write()
            .entry(kind)
            .or_default()
            .push((id, handler));
        debug!(kind = %kind, subscription = %id, "Handler registered");
        id
    }

    /// Remove a handler, leaving every other handler of the kind in place.
    pub fn remove(&self, kind: EventKind, id: SubscriptionId) -> bool {
        let mut handlers = self.handlers.write();
        let Some(list) = handlers.get_mut(&kind) else {
            return false;
        };
        let before = list.len();
        list.retain(|(existing, _)| *existing != id);
        let removed = list.len() != before;
        if list.is_empty() {
            handlers.remove(&kind);
        }
        if removed {
            debug!(kind = %kind, subscription = %id, "Handler removed");
        }
        removed
    }

    /// Snapshot of the handlers for `kind`.
    ///
    /// Callers invoke the snapshot outside the lock, so a handler may itself
    /// register or remove handlers.
    #[must_use]
    pub fn snapshot(&self, kind: EventKind) -> Vec<EventHandler> {
        self.handlers
            .read()
            .get(&kind)
            .map(|list| list.iter().map(|(_, h)| Arc::clone(h)).collect())
            .unwrap_or_default()
    }

    /// Number of handlers registered for `kind`.
    #[must_use]
    pub fn count(&self, kind: EventKind) -> usize {
        self.handlers.read().get(&kind).map_or(0, Vec::len)
    }

    /// Number of handlers across all kinds.
    #[must_use]
    pub fn total(&self) -> usize {
        self.handlers.read().values().map(Vec::len).sum()
    }

    /// Drop every handler.
    pub fn clear(&self) {
        self.handlers.write().clear();
    }
}
