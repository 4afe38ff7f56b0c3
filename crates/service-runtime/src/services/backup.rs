//! Backup requests: submitted by a requester, then completed by a storage
//! provider or cancelled.

use crate::contracts::backup;
use crate::services::core::{require_non_empty, Confirmed, GuardedEntityService, LedgerEntity};
use crate::services::error::ServiceResult;
use crate::services::records::BackupRequestRecord;
use lr_01_retry::RetryPolicy;
use lr_02_entity_cache::{CacheConfig, CacheError};
use lr_03_entity_state::EntityState;
use lr_05_event_bridge::KeyedInvalidator;
use shared_types::{EntityId, EntityKind, LedgerGateway, LedgerRead, TimeSource};
use std::fmt;
use std::sync::Arc;

/// Local lifecycle of a backup request.
///
/// `Requested` is the idle state; the others mark a transaction in flight.
/// Whether the request is pending, completed or cancelled on the ledger is
/// carried by [`BackupRequestRecord::status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackupState {
    Requested,
    Submitting,
    Completing,
    Cancelling,
}

impl fmt::Display for BackupState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BackupState::Requested => "requested",
            BackupState::Submitting => "submitting",
            BackupState::Completing => "completing",
            BackupState::Cancelling => "cancelling",
        };
        f.write_str(name)
    }
}

impl EntityState for BackupState {
    const BASELINE: Self = BackupState::Requested;
}

impl LedgerEntity for BackupRequestRecord {
    const KIND: EntityKind = EntityKind::BackupRequest;

    fn read_call(id: &EntityId) -> LedgerRead {
        backup::get(id.as_str())
    }
}

/// Guarded access to the backup registry.
pub struct BackupService {
    core: GuardedEntityService<BackupState, BackupRequestRecord>,
}

impl BackupService {
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

    pub fn core(&self) -> &GuardedEntityService<BackupState, BackupRequestRecord> {
        &self.core
    }

    pub fn invalidator(&self) -> KeyedInvalidator<EntityId> {
        self.core.invalidator()
    }

    pub async fn backup(&self, id: &str) -> ServiceResult<BackupRequestRecord> {
        require_non_empty("request id", id)?;
        self.core.read(&EntityId::from(id)).await
    }

    pub fn state(&self, id: &str) -> Option<BackupState> {
        self.core.state(&EntityId::from(id))
    }

    pub async fn request_backup(
        &self,
        id: &str,
        requester: &str,
        data_hash: &str,
    ) -> ServiceResult<Confirmed<BackupRequestRecord>> {
        require_non_empty("request id", id)?;
        require_non_empty("requester", requester)?;
        require_non_empty("data hash", data_hash)?;
        self.core
            .register(
                &EntityId::from(id),
                BackupState::Submitting,
                backup::request(id, requester, data_hash),
            )
            .await
    }

    pub async fn complete_backup(
        &self,
        id: &str,
        provider: &str,
    ) -> ServiceResult<Confirmed<BackupRequestRecord>> {
        require_non_empty("request id", id)?;
        require_non_empty("provider", provider)?;
        self.core
            .mutate(
                &EntityId::from(id),
                BackupState::Completing,
                backup::complete(id, provider),
            )
            .await
    }

    pub async fn cancel_backup(&self, id: &str) -> ServiceResult<Confirmed<BackupRequestRecord>> {
        require_non_empty("request id", id)?;
        self.core
            .mutate(&EntityId::from(id), BackupState::Cancelling, backup::cancel(id))
            .await
    }

    pub fn cleanup(&self) {
        self.core.cleanup();
    }
}
