//! Node metrics read from the reward contract.

use crate::contracts::rewards;
use async_trait::async_trait;
use lr_01_retry::{RetryError, RetryExecutor};
use lr_04_metric_rewards::{MetricFetchResult, MetricsProvider};
use shared_types::{LedgerError, LedgerGateway};
use std::sync::Arc;
use tracing::debug;

/// [`MetricsProvider`] backed by `node_rewards.metric` reads.
pub struct LedgerMetricsProvider {
    gateway: Arc<dyn LedgerGateway>,
    retry: RetryExecutor,
}

impl LedgerMetricsProvider {
    pub fn new(gateway: Arc<dyn LedgerGateway>, retry: RetryExecutor) -> Self {
        Self { gateway, retry }
    }
}

#[async_trait]
impl MetricsProvider for LedgerMetricsProvider {
    async fn fetch_metric(&self, name: &str) -> MetricFetchResult {
        let call = rewards::metric(name);
        let gateway = &self.gateway;
        let outcome = self.retry.execute(|| gateway.read(call.clone())).await?;
        let attempts = outcome.attempts;
        let value = outcome.into_value();
        debug!(metric = name, %value, attempts, "Metric fetched");
        value.as_f64().ok_or_else(|| RetryError::Aborted {
            attempts,
            source: LedgerError::decode(name, format!("expected a number, got {value}")),
        })
    }
}
