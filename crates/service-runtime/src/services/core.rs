//! # Guarded Entity Service
//!
//! The one service core every entity adapter is built on.
//!
//! ```text
//! read(id):      cache ──hit──→ value
//!                  └─miss─→ retry(ledger.read) ─→ decode ─→ cache ─→ value
//!
//! mutate(id):    state guard ──busy──→ Err(Busy)
//!                  └─→ retry(submit + wait) ─→ invalidate(id) ─→ read(id)
//!                                                   └─ fails ─→ Err(RefreshFailed { receipt })
//!                guard dropped ─→ baseline
//! ```

use crate::services::error::{ServiceError, ServiceResult};
use lr_01_retry::{RetryContext, RetryExecutor, RetryPolicy};
use lr_02_entity_cache::{CacheConfig, CacheError, CoalescingLoader, EntityCache};
use lr_03_entity_state::{EntityState, EntityStateMachine, StateError};
use lr_05_event_bridge::KeyedInvalidator;
use lr_telemetry::{
    log_entity_event, BUSY_REJECTIONS, CACHE_LOOKUPS, RETRIES_EXHAUSTED, RETRY_ATTEMPTS,
    SERVICE_ERRORS,
};
use serde::de::DeserializeOwned;
use shared_types::{
    EntityId, EntityKind, LedgerError, LedgerGateway, LedgerMutation, LedgerRead, TimeSource,
    TxReceipt,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::warn;

/// A record type readable from the ledger by entity id.
pub trait LedgerEntity: Clone + Send + Sync + DeserializeOwned + 'static {
    const KIND: EntityKind;

    /// The read call returning this entity.
    fn read_call(id: &EntityId) -> LedgerRead;
}

/// A confirmed write and the entity state read back after it.
#[derive(Debug, Clone, PartialEq)]
pub struct Confirmed<V> {
    pub receipt: TxReceipt,
    pub value: V,
}

/// Cache, retry and per-entity exclusion around one entity kind.
pub struct GuardedEntityService<S, V>
where
    S: EntityState,
    V: LedgerEntity,
{
    gateway: Arc<dyn LedgerGateway>,
    retry: RetryExecutor,
    states: EntityStateMachine<EntityId, S>,
    loader: Arc<CoalescingLoader<EntityId, V, ServiceError>>,
    errors: AtomicU64,
}

impl<S, V> GuardedEntityService<S, V>
where
    S: EntityState,
    V: LedgerEntity,
{
    /// # Errors
    ///
    /// `CacheError::InvalidConfig` for a zero cache size or ttl.
    pub fn new(
        gateway: Arc<dyn LedgerGateway>,
        policy: RetryPolicy,
        cache: CacheConfig,
        clock: Arc<dyn TimeSource>,
    ) -> Result<Self, CacheError> {
        let label = V::KIND.label();
        let retry = RetryExecutor::new(policy).with_observer(Arc::new(move |_ctx: &RetryContext| {
            RETRY_ATTEMPTS.with_label_values(&[label]).inc();
        }));
        let cache = EntityCache::with_clock(cache, clock)?;
        Ok(Self {
            gateway,
            retry,
            states: EntityStateMachine::new(label),
            loader: Arc::new(CoalescingLoader::new(Arc::new(cache))),
            errors: AtomicU64::new(0),
        })
    }

    pub fn kind(&self) -> EntityKind {
        V::KIND
    }

    pub fn states(&self) -> &EntityStateMachine<EntityId, S> {
        &self.states
    }

    pub fn loader(&self) -> &Arc<CoalescingLoader<EntityId, V, ServiceError>> {
        &self.loader
    }

    /// Invalidator dropping this service's cached records.
    pub fn invalidator(&self) -> KeyedInvalidator<EntityId> {
        KeyedInvalidator::by_id(V::KIND, self.loader.clone())
    }

    /// Start tracking an entity known to exist on the ledger.
    pub fn track(&self, id: EntityId) -> bool {
        self.states.register(id)
    }

    pub fn state(&self, id: &EntityId) -> Option<S> {
        self.states.state(id)
    }

    /// Failed operations reported since construction, one per caller error.
    pub fn errors_recorded(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    /// Current record, from cache when fresh.
    ///
    /// A successful read also starts tracking the entity.
    ///
    /// # Errors
    ///
    /// The ledger failure (after retries) or a decode failure, shared by
    /// every concurrent caller for `id`.
    pub async fn read(&self, id: &EntityId) -> ServiceResult<V> {
        self.load(id).await.map_err(|e| {
            self.record_error(&e);
            e
        })
    }

    async fn load(&self, id: &EntityId) -> ServiceResult<V> {
        let gateway = Arc::clone(&self.gateway);
        let retry = self.retry.clone();
        let key = id.clone();
        let (source, result) = self
            .loader
            .load(id.clone(), || fetch_record::<V>(gateway, retry, key))
            .await;
        CACHE_LOOKUPS
            .with_label_values(&[V::KIND.label(), source.label()])
            .inc();

        let value = result?;
        self.states.register(id.clone());
        Ok(value)
    }

    /// Run `mutation` against an existing entity held in `busy`.
    ///
    /// # Errors
    ///
    /// - `State` if the entity is busy or unknown (no remote call made)
    /// - `RetryExhausted` / `Ledger` if the write failed
    /// - `RefreshFailed` if the write landed but the read-back failed
    pub async fn mutate(
        &self,
        id: &EntityId,
        busy: S,
        mutation: LedgerMutation,
    ) -> ServiceResult<Confirmed<V>> {
        let _guard = self
            .states
            .try_begin(id.clone(), busy)
            .map_err(|e| self.reject(e))?;
        let receipt = self.submit(mutation).await?;
        self.refresh(id, receipt).await
    }

    /// Run a mutation that creates `id`.
    ///
    /// The id is reserved in `busy` for the duration and forgotten again if
    /// the write fails.
    ///
    /// # Errors
    ///
    /// Same as [`GuardedEntityService::mutate`], with `AlreadyRegistered`
    /// for a known id.
    pub async fn register(
        &self,
        id: &EntityId,
        busy: S,
        mutation: LedgerMutation,
    ) -> ServiceResult<Confirmed<V>> {
        let mut guard = self
            .states
            .try_begin_registration(id.clone(), busy)
            .map_err(|e| self.reject(e))?;
        let receipt = self.submit(mutation).await?;
        guard.commit();
        self.refresh(id, receipt).await
    }

    /// Submit a mutation under the retry policy and wait for finality.
    ///
    /// # Errors
    ///
    /// `RetryExhausted` after the last transient failure, `Ledger` for a
    /// non-retryable one.
    pub async fn submit(&self, mutation: LedgerMutation) -> ServiceResult<TxReceipt> {
        let gateway = &self.gateway;
        match self
            .retry
            .execute(|| gateway.submit_and_wait(mutation.clone()))
            .await
        {
            Ok(outcome) => Ok(outcome.value),
            Err(e) => {
                let err = ServiceError::from(e);
                self.record_error(&err);
                Err(err)
            }
        }
    }

    /// Drop every cached record and forget every tracked entity.
    pub fn cleanup(&self) {
        self.loader.clear();
        self.states.clear();
    }

    async fn refresh(&self, id: &EntityId, receipt: TxReceipt) -> ServiceResult<Confirmed<V>> {
        self.loader.invalidate(id);
        match self.load(id).await {
            Ok(value) => {
                log_entity_event!(
                    info,
                    V::KIND.label(),
                    id,
                    "Write confirmed",
                    block_height = receipt.block_height
                );
                Ok(Confirmed { receipt, value })
            }
            Err(source) => {
                warn!(
                    entity = V::KIND.label(),
                    entity_id = %id,
                    tx_id = %receipt.tx_id,
                    error = %source,
                    "Write confirmed but refresh failed"
                );
                let err = ServiceError::RefreshFailed {
                    receipt,
                    source: Box::new(source),
                };
                self.record_error(&err);
                Err(err)
            }
        }
    }

    fn reject(&self, err: StateError) -> ServiceError {
        if err.is_busy() {
            BUSY_REJECTIONS.with_label_values(&[V::KIND.label()]).inc();
        }
        let err = ServiceError::from(err);
        self.record_error(&err);
        err
    }

    fn record_error(&self, err: &ServiceError) {
        self.errors.fetch_add(1, Ordering::Relaxed);
        let label = V::KIND.label();
        SERVICE_ERRORS.with_label_values(&[label, err.label()]).inc();
        if matches!(err, ServiceError::RetryExhausted { .. }) {
            RETRIES_EXHAUSTED.with_label_values(&[label]).inc();
        }
    }
}

async fn fetch_record<V: LedgerEntity>(
    gateway: Arc<dyn LedgerGateway>,
    retry: RetryExecutor,
    id: EntityId,
) -> ServiceResult<V> {
    let call = V::read_call(&id);
    let outcome = retry.execute(|| gateway.read(call.clone())).await?;
    serde_json::from_value(outcome.value)
        .map_err(|e| ServiceError::Ledger(LedgerError::decode(V::KIND.label(), e)))
}

/// Reject blank string parameters before any remote call.
pub(crate) fn require_non_empty(field: &str, value: &str) -> ServiceResult<()> {
    if value.trim().is_empty() {
        return Err(ServiceError::InvalidParameter(format!(
            "{field} must not be empty"
        )));
    }
    Ok(())
}
