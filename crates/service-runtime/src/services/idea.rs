//! Idea registration and royalty distribution.

use crate::contracts::idea;
use crate::services::core::{require_non_empty, Confirmed, GuardedEntityService, LedgerEntity};
use crate::services::error::{ServiceError, ServiceResult};
use crate::services::records::IdeaRecord;
use lr_01_retry::RetryPolicy;
use lr_02_entity_cache::{CacheConfig, CacheError};
use lr_03_entity_state::EntityState;
use lr_04_metric_rewards::{calculate_reward, WeightedMetricSet};
use lr_05_event_bridge::KeyedInvalidator;
use shared_types::{EntityId, EntityKind, LedgerGateway, LedgerRead, TimeSource};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Lifecycle states of an idea.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdeaState {
    Registered,
    Registering,
    Distributing,
    Updating,
}

impl fmt::Display for IdeaState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IdeaState::Registered => "registered",
            IdeaState::Registering => "registering",
            IdeaState::Distributing => "distributing",
            IdeaState::Updating => "updating",
        };
        f.write_str(name)
    }
}

impl EntityState for IdeaState {
    const BASELINE: Self = IdeaState::Registered;
}

impl LedgerEntity for IdeaRecord {
    const KIND: EntityKind = EntityKind::Idea;

    fn read_call(id: &EntityId) -> LedgerRead {
        idea::get(id.as_str())
    }
}

/// Guarded access to the idea registry.
pub struct IdeaService {
    core: GuardedEntityService<IdeaState, IdeaRecord>,
}

impl IdeaService {
    /// # Errors
    ///
    /// `CacheError::InvalidConfig` for a zero cache size or ttl.
    pub fn new(
        gateway: Arc<dyn LedgerGateway>,
        policy: RetryPolicy,
        cache: CacheConfig,
        clock: Arc<dyn TimeSource>,
    ) -> Result<Self, CacheError> {
        Ok(Self {
            core: GuardedEntityService::new(gateway, policy, cache, clock)?,
        })
    }

    pub fn core(&self) -> &GuardedEntityService<IdeaState, IdeaRecord> {
        &self.core
    }

    pub fn invalidator(&self) -> KeyedInvalidator<EntityId> {
        self.core.invalidator()
    }

    pub async fn idea(&self, id: u64) -> ServiceResult<IdeaRecord> {
        self.core.read(&EntityId::from(id)).await
    }

    pub fn state(&self, id: u64) -> Option<IdeaState> {
        self.core.state(&EntityId::from(id))
    }

    pub async fn register_idea(
        &self,
        id: u64,
        creator: &str,
        title: &str,
    ) -> ServiceResult<Confirmed<IdeaRecord>> {
        require_non_empty("creator", creator)?;
        require_non_empty("title", title)?;
        let key = EntityId::from(id);
        self.core
            .register(
                &key,
                IdeaState::Registering,
                idea::register(key.as_str(), creator, title),
            )
            .await
    }

    pub async fn update_idea(&self, id: u64, title: &str) -> ServiceResult<Confirmed<IdeaRecord>> {
        require_non_empty("title", title)?;
        let key = EntityId::from(id);
        self.core
            .mutate(&key, IdeaState::Updating, idea::update(key.as_str(), title))
            .await
    }

    /// Pay `id` its share of `royalty_pool`, scored over the idea's metrics.
    ///
    /// The amount is `calculate_reward(metrics, royalty_pool, allocation_bps)`.
    ///
    /// # Errors
    ///
    /// `InvalidParameter` when the computed amount is zero; no transaction
    /// is sent in that case.
    pub async fn distribute_royalties(
        &self,
        id: u64,
        metrics: &WeightedMetricSet,
        royalty_pool: u128,
        allocation_bps: f64,
    ) -> ServiceResult<Confirmed<IdeaRecord>> {
        let amount = calculate_reward(metrics, royalty_pool, allocation_bps);
        debug!(idea_id = id, amount, "Computed royalty amount");
        if amount == 0 {
            return Err(ServiceError::InvalidParameter(format!(
                "royalty amount for idea {id} is zero"
            )));
        }
        let key = EntityId::from(id);
        self.core
            .mutate(
                &key,
                IdeaState::Distributing,
                idea::distribute_royalties(key.as_str(), amount),
            )
            .await
    }

    pub fn cleanup(&self) {
        self.core.cleanup();
    }
}
