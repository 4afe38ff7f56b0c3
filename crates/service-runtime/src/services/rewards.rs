//! # Node Reward Service
//!
//! Computes the node reward from weighted ledger metrics and submits one
//! distribution per epoch.
//!
//! ```text
//! distribute_rewards(epoch)
//!   pool guard ──busy──→ Err(Busy)
//!     └─→ collect metrics (cached for the distribution interval)
//!           └─→ calculate_reward ──0──→ Err(InvalidParameter)
//!                 └─→ retry(submit + wait) ─→ clear metric cache
//! ```

use crate::adapters::LedgerMetricsProvider;
use crate::contracts::rewards;
use crate::services::error::{ServiceError, ServiceResult};
use lr_01_retry::{RetryContext, RetryExecutor, RetryPolicy};
use lr_03_entity_state::{EntityState, EntityStateMachine};
use lr_04_metric_rewards::{
    calculate_reward, MetricRewardCalculator, MetricsProvider, RewardConfig, RewardError,
};
use lr_05_event_bridge::CacheInvalidator;
use lr_telemetry::{
    BUSY_REJECTIONS, RETRIES_EXHAUSTED, RETRY_ATTEMPTS, REWARDS_DISTRIBUTED,
    REWARD_AMOUNT_DISTRIBUTED, SERVICE_ERRORS,
};
use shared_bus::events::REWARD_POOL_ID;
use shared_types::{EntityId, EntityKind, LedgerGateway, TimeSource, TxReceipt};
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

const LABEL: &str = "node_rewards";

/// Local state of the reward pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RewardState {
    Idle,
    Distributing,
}

impl fmt::Display for RewardState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RewardState::Idle => f.write_str("idle"),
            RewardState::Distributing => f.write_str("distributing"),
        }
    }
}

impl EntityState for RewardState {
    const BASELINE: Self = RewardState::Idle;
}

/// A confirmed distribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewardDistribution {
    pub epoch: u64,
    pub amount: u128,
    pub receipt: TxReceipt,
}

pub struct NodeRewardService {
    gateway: Arc<dyn LedgerGateway>,
    retry: RetryExecutor,
    calculator: Arc<MetricRewardCalculator>,
    states: EntityStateMachine<EntityId, RewardState>,
    pool: EntityId,
}

impl NodeRewardService {
    /// Service reading metrics from the ledger's reward contract.
    ///
    /// # Errors
    ///
    /// `ServiceError::Reward` if `config` does not validate.
    pub fn new(
        gateway: Arc<dyn LedgerGateway>,
        policy: RetryPolicy,
        config: RewardConfig,
        clock: Arc<dyn TimeSource>,
    ) -> ServiceResult<Self> {
        let retry = RetryExecutor::new(policy).with_observer(Arc::new(|_ctx: &RetryContext| {
            RETRY_ATTEMPTS.with_label_values(&[LABEL]).inc();
        }));
        let provider = Arc::new(LedgerMetricsProvider::new(
            Arc::clone(&gateway),
            retry.clone(),
        ));
        Self::with_provider(gateway, retry, provider, config, clock)
    }

    /// Service over an arbitrary metrics source.
    ///
    /// # Errors
    ///
    /// `ServiceError::Reward` if `config` does not validate.
    pub fn with_provider(
        gateway: Arc<dyn LedgerGateway>,
        retry: RetryExecutor,
        provider: Arc<dyn MetricsProvider>,
        config: RewardConfig,
        clock: Arc<dyn TimeSource>,
    ) -> ServiceResult<Self> {
        let calculator = MetricRewardCalculator::with_clock(config, provider, clock)?;
        let pool = EntityId::from(REWARD_POOL_ID);
        let states = EntityStateMachine::new(LABEL);
        states.register(pool.clone());
        Ok(Self {
            gateway,
            retry,
            calculator: Arc::new(calculator),
            states,
            pool,
        })
    }

    pub fn calculator(&self) -> &Arc<MetricRewardCalculator> {
        &self.calculator
    }

    pub fn state(&self) -> Option<RewardState> {
        self.states.state(&self.pool)
    }

    /// Invalidator clearing cached metrics when any node distributes.
    pub fn invalidator(&self) -> RewardPoolInvalidator {
        RewardPoolInvalidator {
            calculator: Arc::clone(&self.calculator),
        }
    }

    /// Reward the next distribution would pay. Zero if a metric is unavailable.
    pub async fn preview_reward(&self) -> u128 {
        self.calculator.compute_reward().await
    }

    /// Compute and submit the reward for `epoch`.
    ///
    /// # Errors
    ///
    /// - `State` when a distribution is already in flight
    /// - `Reward` when a metric cannot be fetched
    /// - `InvalidParameter` when the computed reward is zero
    /// - `RetryExhausted` / `Ledger` when the submission fails
    pub async fn distribute_rewards(&self, epoch: u64) -> ServiceResult<RewardDistribution> {
        let _guard = self
            .states
            .try_begin(self.pool.clone(), RewardState::Distributing)
            .map_err(|e| {
                if e.is_busy() {
                    BUSY_REJECTIONS.with_label_values(&[LABEL]).inc();
                }
                self.record_error(ServiceError::from(e))
            })?;

        let metrics = self
            .calculator
            .collect_metrics()
            .await
            .map_err(|e| self.record_error(e.into()))?;
        let config = self.calculator.config();
        let amount = calculate_reward(&metrics, config.total_supply, config.allocation_bps);
        if amount == 0 {
            warn!(epoch, "Computed reward is zero, nothing distributed");
            return Err(self.record_error(ServiceError::InvalidParameter(format!(
                "reward for epoch {epoch} is zero"
            ))));
        }

        let gateway = &self.gateway;
        let receipt = self
            .retry
            .execute(|| gateway.submit_and_wait(rewards::distribute(epoch, amount)))
            .await
            .map_err(|e| self.record_error(e.into()))?
            .into_value();

        self.calculator.mark_distributed();
        REWARDS_DISTRIBUTED.inc();
        REWARD_AMOUNT_DISTRIBUTED.inc_by(u64::try_from(amount).unwrap_or(u64::MAX));
        info!(epoch, amount, block_height = receipt.block_height, "Rewards distributed");

        Ok(RewardDistribution {
            epoch,
            amount,
            receipt,
        })
    }

    /// Clear cached metrics and reset the pool to idle.
    pub fn cleanup(&self) {
        self.calculator.mark_distributed();
        self.states.clear();
        self.states.register(self.pool.clone());
    }

    fn record_error(&self, err: ServiceError) -> ServiceError {
        SERVICE_ERRORS.with_label_values(&[LABEL, err.label()]).inc();
        let exhausted = match &err {
            ServiceError::RetryExhausted { .. } => true,
            ServiceError::Reward(RewardError::MetricUnavailable { source, .. }) => {
                source.is_exhausted()
            }
            _ => false,
        };
        if exhausted {
            RETRIES_EXHAUSTED.with_label_values(&[LABEL]).inc();
        }
        err
    }
}

/// Drops cached metrics on every reward distribution event.
pub struct RewardPoolInvalidator {
    calculator: Arc<MetricRewardCalculator>,
}

impl CacheInvalidator for RewardPoolInvalidator {
    fn entity_kind(&self) -> EntityKind {
        EntityKind::NodeRewards
    }

    fn invalidate(&self, _id: &EntityId) -> bool {
        let cached = self.calculator.cached_metrics() > 0;
        self.calculator.mark_distributed();
        cached
    }
}
