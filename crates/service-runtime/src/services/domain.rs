//! # Domain Service
//!
//! Registration, metadata updates, target mapping and contributions for
//! knowledge domains. Domains are addressed by name.
//!
//! ```text
//!              register_domain            update_domain / map_domain / contribute
//! (unknown) ───────────────→ Registering ──→ Registered ──→ Updating | Mapping | Contributing
//!     ↑           failed          │               ↑                       │
//!     └───────────────────────────┘               └───────── released ────┘
//! ```

use crate::contracts::domain;
use crate::services::core::{require_non_empty, Confirmed, GuardedEntityService, LedgerEntity};
use crate::services::error::{ServiceError, ServiceResult};
use crate::services::records::DomainRecord;
use lr_01_retry::RetryPolicy;
use lr_02_entity_cache::{CacheConfig, CacheError};
use lr_03_entity_state::EntityState;
use lr_05_event_bridge::KeyedInvalidator;
use shared_types::{EntityId, EntityKind, LedgerGateway, LedgerRead, TimeSource};
use std::fmt;
use std::sync::Arc;

/// Lifecycle states of a domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DomainState {
    Registered,
    Registering,
    Updating,
    Mapping,
    Contributing,
}

impl fmt::Display for DomainState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DomainState::Registered => "registered",
            DomainState::Registering => "registering",
            DomainState::Updating => "updating",
            DomainState::Mapping => "mapping",
            DomainState::Contributing => "contributing",
        };
        f.write_str(name)
    }
}

impl EntityState for DomainState {
    const BASELINE: Self = DomainState::Registered;
}

impl LedgerEntity for DomainRecord {
    const KIND: EntityKind = EntityKind::Domain;

    fn read_call(id: &EntityId) -> LedgerRead {
        domain::get(id.as_str())
    }
}

/// Guarded access to the domain registry.
pub struct DomainService {
    core: GuardedEntityService<DomainState, DomainRecord>,
}

impl DomainService {
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

    pub fn core(&self) -> &GuardedEntityService<DomainState, DomainRecord> {
        &self.core
    }

    pub fn invalidator(&self) -> KeyedInvalidator<EntityId> {
        self.core.invalidator()
    }

    /// Current record of `name`.
    pub async fn domain(&self, name: &str) -> ServiceResult<DomainRecord> {
        require_non_empty("name", name)?;
        self.core.read(&EntityId::from(name)).await
    }

    pub fn state(&self, name: &str) -> Option<DomainState> {
        self.core.state(&EntityId::from(name))
    }

    pub async fn register_domain(
        &self,
        name: &str,
        owner: &str,
        metadata: &str,
    ) -> ServiceResult<Confirmed<DomainRecord>> {
        require_non_empty("name", name)?;
        require_non_empty("owner", owner)?;
        self.core
            .register(
                &EntityId::from(name),
                DomainState::Registering,
                domain::register(name, owner, metadata),
            )
            .await
    }

    pub async fn update_domain(
        &self,
        name: &str,
        metadata: &str,
    ) -> ServiceResult<Confirmed<DomainRecord>> {
        require_non_empty("name", name)?;
        self.core
            .mutate(
                &EntityId::from(name),
                DomainState::Updating,
                domain::update(name, metadata),
            )
            .await
    }

    /// Point `name` at `target` (an address or resource locator).
    pub async fn map_domain(&self, name: &str, target: &str) -> ServiceResult<Confirmed<DomainRecord>> {
        require_non_empty("name", name)?;
        require_non_empty("target", target)?;
        self.core
            .mutate(
                &EntityId::from(name),
                DomainState::Mapping,
                domain::map(name, target),
            )
            .await
    }

    pub async fn contribute(
        &self,
        name: &str,
        contributor: &str,
        amount: u128,
    ) -> ServiceResult<Confirmed<DomainRecord>> {
        require_non_empty("name", name)?;
        require_non_empty("contributor", contributor)?;
        if amount == 0 {
            return Err(ServiceError::InvalidParameter(
                "contribution amount must be positive".into(),
            ));
        }
        self.core
            .mutate(
                &EntityId::from(name),
                DomainState::Contributing,
                domain::contribute(name, contributor, amount),
            )
            .await
    }

    pub fn cleanup(&self) {
        self.core.cleanup();
    }
}
