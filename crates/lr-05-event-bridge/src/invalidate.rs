//! Cache invalidation targets.

use lr_02_entity_cache::{CoalescingLoader, EntityCache};
use shared_types::{EntityId, EntityKind};
use std::hash::Hash;
use std::sync::Arc;

/// Something that drops cached state for entities of one kind.
pub trait CacheInvalidator: Send + Sync {
    /// Kind of entity this invalidator covers.
    fn entity_kind(&self) -> EntityKind;

    /// Drop everything cached for `id`. Returns whether anything was removed.
    fn invalidate(&self, id: &EntityId) -> bool;
}

/// A keyed store that can forget one key.
pub trait InvalidationTarget<K>: Send + Sync {
    fn invalidate_key(&self, key: &K) -> bool;
}

impl<K, V> InvalidationTarget<K> for EntityCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    fn invalidate_key(&self, key: &K) -> bool {
        self.delete(key)
    }
}

impl<K, V, E> InvalidationTarget<K> for CoalescingLoader<K, V, E>
where
    K: Eq + Hash + Clone + Send + Sync,
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    fn invalidate_key(&self, key: &K) -> bool {
        self.invalidate(key)
    }
}

type KeyFn<K> = Arc<dyn Fn(&EntityId) -> Option<K> + Send + Sync>;

/// Maps entity ids of one kind onto the key type of a cache.
pub struct KeyedInvalidator<K> {
    kind: EntityKind,
    target: Arc<dyn InvalidationTarget<K>>,
    key_fn: KeyFn<K>,
}

impl<K: 'static> KeyedInvalidator<K> {
    /// `key_fn` returns `None` for ids that cannot belong to the cache.
    pub fn new<F>(kind: EntityKind, target: Arc<dyn InvalidationTarget<K>>, key_fn: F) -> Self
    where
        F: Fn(&EntityId) -> Option<K> + Send + Sync + 'static,
    {
        Self {
            kind,
            target,
            key_fn: Arc::new(key_fn),
        }
    }
}

impl KeyedInvalidator<EntityId> {
    /// For caches keyed directly by [`EntityId`].
    pub fn by_id(kind: EntityKind, target: Arc<dyn InvalidationTarget<EntityId>>) -> Self {
        Self::new(kind, target, |id| Some(id.clone()))
    }
}

impl<K: 'static> CacheInvalidator for KeyedInvalidator<K> {
    fn entity_kind(&self) -> EntityKind {
        self.kind
    }

    fn invalidate(&self, id: &EntityId) -> bool {
        match (self.key_fn)(id) {
            Some(key) => self.target.invalidate_key(&key),
            None => false,
        }
    }
}
