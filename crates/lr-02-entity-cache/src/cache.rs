//! The TTL cache itself.

use crate::config::CacheConfig;
use crate::error::{CacheError, CacheResult};
use lru::LruCache;
use parking_lot::Mutex;
use shared_types::{SystemTimeSource, TimeSource, Timestamp};
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::trace;

/// A cached value and when it was stored.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry<V> {
    pub value: V,
    pub stored_at: Timestamp,
}

/// Counters since construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Entries dropped on access because they outlived the TTL.
    pub expirations: u64,
    /// Entries dropped to make room for a new id.
    pub evictions: u64,
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    expirations: AtomicU64,
    evictions: AtomicU64,
}

/// Size-bounded cache whose entries expire `ttl` after they were stored.
///
/// Expiry is evaluated only when an entry is accessed. Entries are ordered
/// by when they were stored: writes go through `put` and reads only `peek`,
/// so the LRU tail is always the least-recently-stored id.
pub struct EntityCache<K, V> {
    config: CacheConfig,
    entries: Mutex<LruCache<K, CacheEntry<V>>>,
    clock: Arc<dyn TimeSource>,
    counters: Counters,
}

impl<K, V> EntityCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Create a cache on the wall clock.
    ///
    /// # Errors
    ///
    /// Rejects a zero `max_size` or `ttl`.
    pub fn new(config: CacheConfig) -> CacheResult<Self> {
        Self::with_clock(config, Arc::new(SystemTimeSource))
    }

    /// Create a cache on an injected clock.
    ///
    /// # Errors
    ///
    /// Rejects a zero `max_size` or `ttl`.
    pub fn with_clock(config: CacheConfig, clock: Arc<dyn TimeSource>) -> CacheResult<Self> {
        config.validate()?;
        let cap = NonZeroUsize::new(config.max_size).ok_or_else(|| CacheError::InvalidConfig {
            reason: "max_size must be greater than 0".to_string(),
        })?;
        Ok(Self {
            entries: Mutex::new(LruCache::new(cap)),
            config,
            clock,
            counters: Counters::default(),
        })
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Fresh value for `id`, dropping the entry if it has expired.
    pub fn get(&self, id: &K) -> Option<V> {
        let now = self.clock.now();
        let mut entries = self.entries.lock();
        let value = self.fresh(&mut entries, id, now).map(|e| e.value.clone());
        if value.is_some() {
            self.counters.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.counters.misses.fetch_add(1, Ordering::Relaxed);
        }
        value
    }

    /// Same freshness rule as [`get`](Self::get), without cloning the value.
    pub fn has(&self, id: &K) -> bool {
        let now = self.clock.now();
        let mut entries = self.entries.lock();
        self.fresh(&mut entries, id, now).is_some()
    }

    /// Store `value`, evicting the oldest entry if `id` is new and the
    /// cache is full.
    pub fn set(&self, id: K, value: V) {
        let now = self.clock.now();
        let mut entries = self.entries.lock();

        let full = entries.len() >= entries.cap().get();
        if full && !entries.contains(&id) && entries.pop_lru().is_some() {
            self.counters.evictions.fetch_add(1, Ordering::Relaxed);
            trace!("Evicted oldest cache entry");
        }

        entries.put(
            id,
            CacheEntry {
                value,
                stored_at: now,
            },
        );
    }

    /// Remove `id` regardless of freshness. Returns whether it was present.
    pub fn delete(&self, id: &K) -> bool {
        self.entries.lock().pop(id).is_some()
    }

    /// Remove every entry.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Entries currently held, fresh or not yet found stale.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// When `id` was stored, if it is held at all.
    pub fn stored_at(&self, id: &K) -> Option<Timestamp> {
        self.entries.lock().peek(id).map(|e| e.stored_at)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            expirations: self.counters.expirations.load(Ordering::Relaxed),
            evictions: self.counters.evictions.load(Ordering::Relaxed),
        }
    }

    fn fresh<'a>(
        &self,
        entries: &'a mut LruCache<K, CacheEntry<V>>,
        id: &K,
        now: Timestamp,
    ) -> Option<&'a CacheEntry<V>> {
        let stored_at = entries.peek(id)?.stored_at;
        if now.saturating_sub(stored_at) < self.config.ttl_ms() {
            return entries.peek(id);
        }
        entries.pop(id);
        self.counters.expirations.fetch_add(1, Ordering::Relaxed);
        None
    }
}
