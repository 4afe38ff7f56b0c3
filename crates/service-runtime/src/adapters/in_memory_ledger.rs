//! # In-Memory Ledger
//!
//! A [`LedgerGateway`] over process memory, implementing the contracts in
//! [`crate::contracts`]. Confirmed writes publish the matching
//! [`LedgerEvent`]. Failures can be injected per operation for tests and
//! demos.

use crate::contracts::{backup, domain, idea, rewards};
use crate::services::records::{BackupRequestRecord, BackupStatus, DomainRecord, IdeaRecord};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use shared_bus::{EventPublisher, LedgerEvent};
use shared_types::{
    EntityId, LedgerError, LedgerGateway, LedgerMutation, LedgerRead, LedgerResult,
    PendingTransaction, TxReceipt,
};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};
use uuid::Uuid;

/// Point at which an injected failure is raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LedgerOperation {
    /// `read`
    Read,
    /// `submit`, before the transaction is accepted
    Submit,
    /// `wait`, after acceptance and before the write applies
    Confirm,
}

#[derive(Default)]
struct Contracts {
    domains: BTreeMap<String, DomainRecord>,
    ideas: BTreeMap<String, IdeaRecord>,
    backups: BTreeMap<String, BackupRequestRecord>,
    metrics: HashMap<String, f64>,
    reward_pool: u128,
    distributed_epochs: BTreeMap<u64, u128>,
}

struct Inner {
    contracts: Mutex<Contracts>,
    failures: Mutex<HashMap<LedgerOperation, VecDeque<LedgerError>>>,
    events: Mutex<Option<Arc<dyn EventPublisher>>>,
    confirmation_delay: Mutex<Duration>,
    read_delay: Mutex<Duration>,
    block_height: AtomicU64,
    reads: AtomicU64,
    submits: AtomicU64,
}

impl Inner {
    fn take_failure(&self, op: LedgerOperation) -> Option<LedgerError> {
        self.failures.lock().get_mut(&op).and_then(VecDeque::pop_front)
    }

    fn publisher(&self) -> Option<Arc<dyn EventPublisher>> {
        self.events.lock().clone()
    }
}

/// Ledger held entirely in memory.
#[derive(Clone)]
pub struct InMemoryLedger {
    inner: Arc<Inner>,
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                contracts: Mutex::new(Contracts::default()),
                failures: Mutex::new(HashMap::new()),
                events: Mutex::new(None),
                confirmation_delay: Mutex::new(Duration::ZERO),
                read_delay: Mutex::new(Duration::ZERO),
                block_height: AtomicU64::new(0),
                reads: AtomicU64::new(0),
                submits: AtomicU64::new(0),
            }),
        }
    }

    /// Publish confirmed writes to `publisher`.
    pub fn publish_to(&self, publisher: Arc<dyn EventPublisher>) {
        *self.inner.events.lock() = Some(publisher);
    }

    /// Time `wait()` takes before a transaction is final.
    pub fn set_confirmation_delay(&self, delay: Duration) {
        *self.inner.confirmation_delay.lock() = delay;
    }

    /// Time every `read()` takes before answering.
    pub fn set_read_delay(&self, delay: Duration) {
        *self.inner.read_delay.lock() = delay;
    }

    /// Queue `error` to be raised by the next call of `op`.
    pub fn inject(&self, op: LedgerOperation, error: LedgerError) {
        self.inner
            .failures
            .lock()
            .entry(op)
            .or_default()
            .push_back(error);
    }

    /// Drop every queued failure.
    pub fn clear_failures(&self) {
        self.inner.failures.lock().clear();
    }

    pub fn set_metric(&self, name: &str, value: f64) {
        self.inner
            .contracts
            .lock()
            .metrics
            .insert(name.to_string(), value);
    }

    pub fn fund_reward_pool(&self, amount: u128) {
        let mut contracts = self.inner.contracts.lock();
        contracts.reward_pool = contracts.reward_pool.saturating_add(amount);
    }

    pub fn reward_pool(&self) -> u128 {
        self.inner.contracts.lock().reward_pool
    }

    /// Insert a domain directly, without a transaction or event.
    pub fn seed_domain(&self, name: &str, owner: &str) {
        self.inner.contracts.lock().domains.insert(
            name.to_string(),
            DomainRecord {
                name: name.to_string(),
                owner: owner.to_string(),
                metadata: String::new(),
                mapped_target: None,
                total_contributions: 0,
            },
        );
    }

    /// Publish an event as if another party's transaction had produced it.
    pub async fn emit(&self, event: LedgerEvent) -> usize {
        match self.inner.publisher() {
            Some(publisher) => publisher.publish(event).await,
            None => 0,
        }
    }

    /// Read calls received, including failed ones.
    pub fn reads(&self) -> u64 {
        self.inner.reads.load(Ordering::Relaxed)
    }

    /// Submit calls received, including failed ones.
    pub fn submits(&self) -> u64 {
        self.inner.submits.load(Ordering::Relaxed)
    }

    pub fn block_height(&self) -> u64 {
        self.inner.block_height.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl LedgerGateway for InMemoryLedger {
    async fn read(&self, call: LedgerRead) -> LedgerResult<Value> {
        self.inner.reads.fetch_add(1, Ordering::Relaxed);
        let delay = *self.inner.read_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if let Some(error) = self.inner.take_failure(LedgerOperation::Read) {
            trace!(method = %call.method, error = %error, "Injected read failure");
            return Err(error);
        }
        let contracts = self.inner.contracts.lock();
        read_contract(&contracts, &call)
    }

    async fn submit(&self, mutation: LedgerMutation) -> LedgerResult<Box<dyn PendingTransaction>> {
        self.inner.submits.fetch_add(1, Ordering::Relaxed);
        if let Some(error) = self.inner.take_failure(LedgerOperation::Submit) {
            trace!(method = %mutation.method, error = %error, "Injected submit failure");
            return Err(error);
        }
        let tx_id = Uuid::new_v4();
        debug!(tx_id = %tx_id, contract = %mutation.contract, method = %mutation.method, "Transaction submitted");
        Ok(Box::new(InMemoryPending {
            inner: Arc::clone(&self.inner),
            tx_id,
            mutation,
        }))
    }
}

struct InMemoryPending {
    inner: Arc<Inner>,
    tx_id: Uuid,
    mutation: LedgerMutation,
}

#[async_trait]
impl PendingTransaction for InMemoryPending {
    fn tx_id(&self) -> Uuid {
        self.tx_id
    }

    async fn wait(self: Box<Self>) -> LedgerResult<TxReceipt> {
        let delay = *self.inner.confirmation_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if let Some(error) = self.inner.take_failure(LedgerOperation::Confirm) {
            return Err(error);
        }

        let event = {
            let mut contracts = self.inner.contracts.lock();
            apply_mutation(&mut contracts, &self.mutation)?
        };
        let block_height = self.inner.block_height.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(tx_id = %self.tx_id, block_height, "Transaction confirmed");

        if let Some(publisher) = self.inner.publisher() {
            publisher.publish(event).await;
        }
        Ok(TxReceipt {
            tx_id: self.tx_id,
            block_height,
        })
    }
}

fn args<T: DeserializeOwned>(value: &Value) -> LedgerResult<T> {
    serde_json::from_value(value.clone()).map_err(|e| LedgerError::Validation(e.to_string()))
}

fn unknown_call(contract: &str, method: &str) -> LedgerError {
    LedgerError::Reverted {
        reason: format!("unknown call {contract}.{method}"),
    }
}

fn not_found(what: &str, id: &str) -> LedgerError {
    LedgerError::Reverted {
        reason: format!("{what} {id} not found"),
    }
}

#[derive(Deserialize)]
struct ByName {
    name: String,
}

#[derive(Deserialize)]
struct ById {
    id: String,
}

fn read_contract(contracts: &Contracts, call: &LedgerRead) -> LedgerResult<Value> {
    let value = match (call.contract.as_str(), call.method.as_str()) {
        (domain::CONTRACT, domain::GET) => {
            let ByName { name } = args(&call.args)?;
            let record = contracts
                .domains
                .get(&name)
                .ok_or_else(|| not_found("domain", &name))?;
            serde_json::to_value(record)?
        }
        (idea::CONTRACT, idea::GET) => {
            let ById { id } = args(&call.args)?;
            let record = contracts.ideas.get(&id).ok_or_else(|| not_found("idea", &id))?;
            serde_json::to_value(record)?
        }
        (backup::CONTRACT, backup::GET) => {
            let ById { id } = args(&call.args)?;
            let record = contracts
                .backups
                .get(&id)
                .ok_or_else(|| not_found("backup request", &id))?;
            serde_json::to_value(record)?
        }
        (rewards::CONTRACT, rewards::METRIC) => {
            let ByName { name } = args(&call.args)?;
            let value = contracts
                .metrics
                .get(&name)
                .ok_or_else(|| not_found("metric", &name))?;
            serde_json::to_value(value)?
        }
        (contract, method) => return Err(unknown_call(contract, method)),
    };
    Ok(value)
}

fn parse_amount(text: &str) -> LedgerResult<u128> {
    text.parse()
        .map_err(|_| LedgerError::Validation(format!("bad amount {text:?}")))
}

fn apply_mutation(contracts: &mut Contracts, mutation: &LedgerMutation) -> LedgerResult<LedgerEvent> {
    match mutation.contract.as_str() {
        domain::CONTRACT => apply_domain(contracts, mutation),
        idea::CONTRACT => apply_idea(contracts, mutation),
        backup::CONTRACT => apply_backup(contracts, mutation),
        rewards::CONTRACT => apply_rewards(contracts, mutation),
        other => Err(unknown_call(other, &mutation.method)),
    }
}

fn apply_domain(contracts: &mut Contracts, mutation: &LedgerMutation) -> LedgerResult<LedgerEvent> {
    #[derive(Deserialize)]
    struct Register {
        name: String,
        owner: String,
        #[serde(default)]
        metadata: String,
    }
    #[derive(Deserialize)]
    struct Update {
        name: String,
        metadata: String,
    }
    #[derive(Deserialize)]
    struct Map {
        name: String,
        target: String,
    }
    #[derive(Deserialize)]
    struct Contribute {
        name: String,
        contributor: String,
        amount: String,
    }

    match mutation.method.as_str() {
        domain::REGISTER => {
            let Register { name, owner, metadata } = args(&mutation.args)?;
            if contracts.domains.contains_key(&name) {
                return Err(LedgerError::Reverted {
                    reason: format!("domain {name} already registered"),
                });
            }
            contracts.domains.insert(
                name.clone(),
                DomainRecord {
                    name: name.clone(),
                    owner: owner.clone(),
                    metadata,
                    mapped_target: None,
                    total_contributions: 0,
                },
            );
            Ok(LedgerEvent::DomainRegistered {
                domain: EntityId::new(name),
                owner,
            })
        }
        domain::UPDATE => {
            let Update { name, metadata } = args(&mutation.args)?;
            let record = contracts
                .domains
                .get_mut(&name)
                .ok_or_else(|| not_found("domain", &name))?;
            record.metadata = metadata;
            Ok(LedgerEvent::DomainUpdated {
                domain: EntityId::new(name),
            })
        }
        domain::MAP => {
            let Map { name, target } = args(&mutation.args)?;
            let record = contracts
                .domains
                .get_mut(&name)
                .ok_or_else(|| not_found("domain", &name))?;
            record.mapped_target = Some(target.clone());
            Ok(LedgerEvent::DomainMapped {
                domain: EntityId::new(name),
                target,
            })
        }
        domain::CONTRIBUTE => {
            let Contribute {
                name,
                contributor,
                amount,
            } = args(&mutation.args)?;
            let amount = parse_amount(&amount)?;
            let record = contracts
                .domains
                .get_mut(&name)
                .ok_or_else(|| not_found("domain", &name))?;
            record.total_contributions = record.total_contributions.saturating_add(amount);
            Ok(LedgerEvent::ContributionRecorded {
                domain: EntityId::new(name),
                contributor,
                amount,
            })
        }
        other => Err(unknown_call(domain::CONTRACT, other)),
    }
}

fn apply_idea(contracts: &mut Contracts, mutation: &LedgerMutation) -> LedgerResult<LedgerEvent> {
    #[derive(Deserialize)]
    struct Register {
        id: String,
        creator: String,
        title: String,
    }
    #[derive(Deserialize)]
    struct Update {
        id: String,
        title: String,
    }
    #[derive(Deserialize)]
    struct Royalties {
        id: String,
        amount: String,
    }

    match mutation.method.as_str() {
        idea::REGISTER => {
            let Register { id, creator, title } = args(&mutation.args)?;
            if contracts.ideas.contains_key(&id) {
                return Err(LedgerError::Reverted {
                    reason: format!("idea {id} already registered"),
                });
            }
            contracts.ideas.insert(
                id.clone(),
                IdeaRecord {
                    id: id.clone(),
                    creator: creator.clone(),
                    title,
                    total_royalties: 0,
                },
            );
            Ok(LedgerEvent::IdeaRegistered {
                idea_id: EntityId::new(id),
                creator,
            })
        }
        idea::UPDATE => {
            let Update { id, title } = args(&mutation.args)?;
            let record = contracts.ideas.get_mut(&id).ok_or_else(|| not_found("idea", &id))?;
            record.title = title;
            Ok(LedgerEvent::IdeaUpdated {
                idea_id: EntityId::new(id),
            })
        }
        idea::DISTRIBUTE_ROYALTIES => {
            let Royalties { id, amount } = args(&mutation.args)?;
            let amount = parse_amount(&amount)?;
            let record = contracts.ideas.get_mut(&id).ok_or_else(|| not_found("idea", &id))?;
            record.total_royalties = record.total_royalties.saturating_add(amount);
            Ok(LedgerEvent::RoyaltiesDistributed {
                idea_id: EntityId::new(id),
                amount,
            })
        }
        other => Err(unknown_call(idea::CONTRACT, other)),
    }
}

fn apply_backup(contracts: &mut Contracts, mutation: &LedgerMutation) -> LedgerResult<LedgerEvent> {
    #[derive(Deserialize)]
    struct Request {
        id: String,
        requester: String,
        data_hash: String,
    }
    #[derive(Deserialize)]
    struct Complete {
        id: String,
        provider: String,
    }

    fn pending<'a>(
        contracts: &'a mut Contracts,
        id: &str,
    ) -> LedgerResult<&'a mut BackupRequestRecord> {
        let record = contracts
            .backups
            .get_mut(id)
            .ok_or_else(|| not_found("backup request", id))?;
        if record.status != BackupStatus::Pending {
            return Err(LedgerError::Reverted {
                reason: format!("backup request {id} is not pending"),
            });
        }
        Ok(record)
    }

    match mutation.method.as_str() {
        backup::REQUEST => {
            let Request {
                id,
                requester,
                data_hash,
            } = args(&mutation.args)?;
            if contracts.backups.contains_key(&id) {
                return Err(LedgerError::Reverted {
                    reason: format!("backup request {id} already exists"),
                });
            }
            contracts.backups.insert(
                id.clone(),
                BackupRequestRecord {
                    id: id.clone(),
                    requester: requester.clone(),
                    data_hash,
                    status: BackupStatus::Pending,
                    provider: None,
                },
            );
            Ok(LedgerEvent::BackupRequested {
                request_id: EntityId::new(id),
                requester,
            })
        }
        backup::COMPLETE => {
            let Complete { id, provider } = args(&mutation.args)?;
            let record = pending(contracts, &id)?;
            record.status = BackupStatus::Completed;
            record.provider = Some(provider.clone());
            Ok(LedgerEvent::BackupCompleted {
                request_id: EntityId::new(id),
                provider,
            })
        }
        backup::CANCEL => {
            let ById { id } = args(&mutation.args)?;
            pending(contracts, &id)?.status = BackupStatus::Cancelled;
            Ok(LedgerEvent::BackupCancelled {
                request_id: EntityId::new(id),
            })
        }
        other => Err(unknown_call(backup::CONTRACT, other)),
    }
}

fn apply_rewards(contracts: &mut Contracts, mutation: &LedgerMutation) -> LedgerResult<LedgerEvent> {
    #[derive(Deserialize)]
    struct Distribute {
        epoch: u64,
        amount: String,
    }

    match mutation.method.as_str() {
        rewards::DISTRIBUTE => {
            let Distribute { epoch, amount } = args(&mutation.args)?;
            let amount = parse_amount(&amount)?;
            if contracts.distributed_epochs.contains_key(&epoch) {
                return Err(LedgerError::Reverted {
                    reason: format!("epoch {epoch} already distributed"),
                });
            }
            if amount > contracts.reward_pool {
                return Err(LedgerError::Insufficient {
                    resource: "reward pool".to_string(),
                    required: amount,
                    available: contracts.reward_pool,
                });
            }
            contracts.reward_pool -= amount;
            contracts.distributed_epochs.insert(epoch, amount);
            Ok(LedgerEvent::RewardsDistributed { epoch, amount })
        }
        other => Err(unknown_call(rewards::CONTRACT, other)),
    }
}
