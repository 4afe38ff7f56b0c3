//! In-flight request coalescing in front of an [`EntityCache`].
//!
//! While a fetch for an id is running, later callers for the same id join it
//! instead of issuing their own. The first caller to observe the result
//! clears the in-flight marker and, on success, stores the value.

use crate::cache::EntityCache;
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

type SharedFetch<V, E> = Shared<BoxFuture<'static, Result<V, E>>>;

/// Where a [`CoalescingLoader`] result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadSource {
    /// Fresh entry in the cache.
    Cached,
    /// This caller started the fetch.
    Fetched,
    /// This caller joined a fetch another caller started.
    Joined,
}

impl LoadSource {
    /// Lookup result label for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            LoadSource::Cached => "hit",
            LoadSource::Fetched => "miss",
            LoadSource::Joined => "joined",
        }
    }
}

struct InFlight<V, E> {
    fetch: SharedFetch<V, E>,
    token: u64,
}

/// Read-through loader with per-id fetch de-duplication.
pub struct CoalescingLoader<K, V, E> {
    cache: Arc<EntityCache<K, V>>,
    in_flight: Mutex<HashMap<K, InFlight<V, E>>>,
    next_token: AtomicU64,
    fetches_started: AtomicU64,
    fetches_joined: AtomicU64,
}

impl<K, V, E> CoalescingLoader<K, V, E>
where
    K: Eq + Hash + Clone + Send + Sync,
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    pub fn new(cache: Arc<EntityCache<K, V>>) -> Self {
        Self {
            cache,
            in_flight: Mutex::new(HashMap::new()),
            next_token: AtomicU64::new(0),
            fetches_started: AtomicU64::new(0),
            fetches_joined: AtomicU64::new(0),
        }
    }

    /// The cache this loader fills.
    pub fn cache(&self) -> &Arc<EntityCache<K, V>> {
        &self.cache
    }

    /// Fresh cached value, or the result of a (possibly shared) fetch.
    ///
    /// `fetch` is only invoked when no fetch for `id` is running.
    ///
    /// # Errors
    ///
    /// The fetch error, delivered to every caller that joined it.
    pub async fn get_or_load<F, Fut>(&self, id: K, fetch: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        self.load(id, fetch).await.1
    }

    /// [`get_or_load`](Self::get_or_load), also reporting whether the result
    /// was cached, fetched by this caller or joined.
    pub async fn load<F, Fut>(&self, id: K, fetch: F) -> (LoadSource, Result<V, E>)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        if let Some(value) = self.cache.get(&id) {
            return (LoadSource::Cached, Ok(value));
        }

        let (shared, token, source) = {
            let mut in_flight = self.in_flight.lock();
            match in_flight.get(&id) {
                Some(running) => {
                    self.fetches_joined.fetch_add(1, Ordering::Relaxed);
                    debug!("Joining in-flight fetch");
                    (running.fetch.clone(), running.token, LoadSource::Joined)
                }
                None => {
                    let token = self.next_token.fetch_add(1, Ordering::Relaxed);
                    let shared = fetch().boxed().shared();
                    in_flight.insert(
                        id.clone(),
                        InFlight {
                            fetch: shared.clone(),
                            token,
                        },
                    );
                    self.fetches_started.fetch_add(1, Ordering::Relaxed);
                    (shared, token, LoadSource::Fetched)
                }
            }
        };

        let result = shared.await;

        let mut in_flight = self.in_flight.lock();
        if in_flight.get(&id).is_some_and(|running| running.token == token) {
            in_flight.remove(&id);
            if let Ok(value) = &result {
                self.cache.set(id, value.clone());
            }
        }
        (source, result)
    }

    /// Drop the cached value for `id` and detach any running fetch, whose
    /// result will then not be cached.
    pub fn invalidate(&self, id: &K) -> bool {
        let detached = self.in_flight.lock().remove(id).is_some();
        let deleted = self.cache.delete(id);
        detached || deleted
    }

    /// Drop every cached value and detach every running fetch.
    pub fn clear(&self) {
        self.in_flight.lock().clear();
        self.cache.clear();
    }

    /// Number of ids with a fetch currently running.
    pub fn in_flight(&self) -> usize {
        self.in_flight.lock().len()
    }

    /// Underlying fetches started since construction.
    pub fn fetches_started(&self) -> u64 {
        self.fetches_started.load(Ordering::Relaxed)
    }

    /// Callers that joined an existing fetch instead of starting one.
    pub fn fetches_joined(&self) -> u64 {
        self.fetches_joined.load(Ordering::Relaxed)
    }
}
