//! The bridge itself.

use crate::error::{BridgeError, BridgeResult};
use crate::invalidate::CacheInvalidator;
use parking_lot::{Mutex, RwLock};
use shared_bus::{
    EventHandler, EventKind, HandlerRegistry, LedgerEvent, LedgerEventSource, SubscriptionId,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

/// Handle returned by [`EventBridge::on`].
pub type ListenerId = SubscriptionId;

/// Called once per bridged event with the number of invalidated entries.
pub type BridgeObserver = Arc<dyn Fn(&LedgerEvent, usize) + Send + Sync>;

/// State reachable from upstream handlers.
struct Dispatch {
    listeners: HandlerRegistry,
    invalidators: RwLock<Vec<Arc<dyn CacheInvalidator>>>,
    observer: RwLock<Option<BridgeObserver>>,
    events_bridged: AtomicU64,
    invalidations: AtomicU64,
}

impl Dispatch {
    fn deliver(&self, event: &LedgerEvent) {
        let mut invalidated = 0;
        if let Some(entity) = event.entity() {
            let invalidators: Vec<_> = self
                .invalidators
                .read()
                .iter()
                .filter(|inv| inv.entity_kind() == entity.kind)
                .cloned()
                .collect();
            for invalidator in invalidators {
                if invalidator.invalidate(&entity.id) {
                    invalidated += 1;
                }
            }
            if invalidated > 0 {
                self.invalidations
                    .fetch_add(invalidated as u64, Ordering::Relaxed);
                trace!(entity = %entity, invalidated, "Cache entries invalidated");
            }
        }

        let kind = event.kind();
        let listeners = self.listeners.snapshot(kind);
        self.events_bridged.fetch_add(1, Ordering::Relaxed);
        let observer = self.observer.read().clone();
        if let Some(observer) = observer {
            observer(event, invalidated);
        }
        for listener in &listeners {
            listener(event);
        }
        debug!(kind = %kind, listeners = listeners.len(), invalidated, "Event bridged");
    }
}

#[derive(Default)]
struct Upstream {
    /// One upstream subscription per kind.
    subscriptions: HashMap<EventKind, SubscriptionId>,
    /// Kinds kept subscribed for invalidation even without listeners.
    pinned: HashSet<EventKind>,
}

/// Fans upstream ledger events out to listeners, invalidating caches first.
pub struct EventBridge {
    upstream: Arc<dyn LedgerEventSource>,
    dispatch: Arc<Dispatch>,
    state: Mutex<Upstream>,
}

impl EventBridge {
    pub fn new(upstream: Arc<dyn LedgerEventSource>) -> Self {
        Self {
            upstream,
            dispatch: Arc::new(Dispatch {
                listeners: HandlerRegistry::new(),
                invalidators: RwLock::new(Vec::new()),
                observer: RwLock::new(None),
                events_bridged: AtomicU64::new(0),
                invalidations: AtomicU64::new(0),
            }),
            state: Mutex::new(Upstream::default()),
        }
    }

    /// Install a hook notified of every bridged event.
    pub fn set_observer(&self, observer: BridgeObserver) {
        *self.dispatch.observer.write() = Some(observer);
    }

    /// Register a listener for `kind`.
    pub fn on(&self, kind: EventKind, listener: EventHandler) -> ListenerId {
        let mut state = self.state.lock();
        let id = self.dispatch.listeners.add(kind, listener);
        self.ensure_upstream(&mut state, kind);
        id
    }

    /// Remove one listener. Other listeners of `kind` are unaffected.
    ///
    /// # Errors
    ///
    /// `BridgeError::UnknownListener` if `id` is not registered for `kind`.
    pub fn off(&self, kind: EventKind, id: ListenerId) -> BridgeResult<()> {
        let mut state = self.state.lock();
        if !self.dispatch.listeners.remove(kind, id) {
            return Err(BridgeError::UnknownListener { kind, id });
        }
        if self.dispatch.listeners.count(kind) == 0 && !state.pinned.contains(&kind) {
            self.release_upstream(&mut state, kind);
        }
        Ok(())
    }

    /// Register a cache to invalidate whenever an event names one of its
    /// entities. Subscribes upstream to every event kind of that entity.
    pub fn add_invalidator(&self, invalidator: Arc<dyn CacheInvalidator>) {
        let entity_kind = invalidator.entity_kind();
        self.dispatch.invalidators.write().push(invalidator);

        let mut state = self.state.lock();
        for kind in EventKind::for_entity(entity_kind) {
            state.pinned.insert(*kind);
            self.ensure_upstream(&mut state, *kind);
        }
        debug!(entity = %entity_kind.label(), "Cache invalidator registered");
    }

    /// Release every upstream subscription and drop all listeners and
    /// invalidators.
    pub fn shutdown(&self) {
        let mut state = self.state.lock();
        let kinds: Vec<_> = state.subscriptions.keys().copied().collect();
        for kind in kinds {
            self.release_upstream(&mut state, kind);
        }
        state.pinned.clear();
        self.dispatch.listeners.clear();
        self.dispatch.invalidators.write().clear();
    }

    /// Number of listeners for `kind`.
    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.dispatch.listeners.count(kind)
    }

    /// Whether the bridge holds an upstream subscription for `kind`.
    pub fn is_subscribed_upstream(&self, kind: EventKind) -> bool {
        self.state.lock().subscriptions.contains_key(&kind)
    }

    /// Events received from upstream since construction.
    pub fn events_bridged(&self) -> u64 {
        self.dispatch.events_bridged.load(Ordering::Relaxed)
    }

    /// Cache entries invalidated since construction.
    pub fn invalidations(&self) -> u64 {
        self.dispatch.invalidations.load(Ordering::Relaxed)
    }

    fn ensure_upstream(&self, state: &mut Upstream, kind: EventKind) {
        if state.subscriptions.contains_key(&kind) {
            return;
        }
        let dispatch = Arc::clone(&self.dispatch);
        let handler: EventHandler = Arc::new(move |event: &LedgerEvent| dispatch.deliver(event));
        let id = self.upstream.subscribe(kind, handler);
        state.subscriptions.insert(kind, id);
        debug!(kind = %kind, subscription = %id, "Subscribed upstream");
    }

    fn release_upstream(&self, state: &mut Upstream, kind: EventKind) {
        if let Some(id) = state.subscriptions.remove(&kind) {
            self.upstream.unsubscribe(kind, id);
            debug!(kind = %kind, subscription = %id, "Released upstream subscription");
        }
    }
}

impl Drop for EventBridge {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl LedgerEventSource for EventBridge {
    fn subscribe(&self, kind: EventKind, handler: EventHandler) -> SubscriptionId {
        self.on(kind, handler)
    }

    fn unsubscribe(&self, kind: EventKind, id: SubscriptionId) -> bool {
        self.off(kind, id).is_ok()
    }
}
