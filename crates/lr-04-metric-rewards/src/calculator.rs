//! Reward calculation over cached, provider-backed metrics.

use crate::calculate::calculate_reward;
use crate::config::RewardConfig;
use crate::error::{RewardError, RewardResult};
use crate::metric::WeightedMetricSet;
use crate::provider::MetricsProvider;
use lr_01_retry::RetryError;
use lr_02_entity_cache::{CacheConfig, CoalescingLoader, EntityCache};
use shared_types::{LedgerError, SystemTimeSource, TimeSource};
use std::sync::Arc;
use tracing::{debug, warn};

/// Computes the node reward for the current distribution interval.
pub struct MetricRewardCalculator {
    config: RewardConfig,
    provider: Arc<dyn MetricsProvider>,
    metrics: CoalescingLoader<String, f64, RetryError<LedgerError>>,
}

impl MetricRewardCalculator {
    /// # Errors
    ///
    /// `RewardError::InvalidConfig` if the configuration does not validate.
    pub fn new(config: RewardConfig, provider: Arc<dyn MetricsProvider>) -> RewardResult<Self> {
        Self::with_clock(config, provider, Arc::new(SystemTimeSource))
    }

    /// # Errors
    ///
    /// Same as [`MetricRewardCalculator::new`].
    pub fn with_clock(
        config: RewardConfig,
        provider: Arc<dyn MetricsProvider>,
        clock: Arc<dyn TimeSource>,
    ) -> RewardResult<Self> {
        config.validate()?;
        let cache_config =
            CacheConfig::new(config.weights.len().max(1), config.distribution_interval());
        let cache = EntityCache::with_clock(cache_config, clock).map_err(|e| {
            RewardError::InvalidConfig {
                reason: e.to_string(),
            }
        })?;
        Ok(Self {
            config,
            provider,
            metrics: CoalescingLoader::new(Arc::new(cache)),
        })
    }

    pub fn config(&self) -> &RewardConfig {
        &self.config
    }

    /// Current value of every weighted metric, from cache where fresh.
    ///
    /// # Errors
    ///
    /// `RewardError::MetricUnavailable` for the first metric whose fetch failed.
    pub async fn collect_metrics(&self) -> RewardResult<WeightedMetricSet> {
        let mut set = WeightedMetricSet::new();
        for (name, weight) in &self.config.weights {
            let provider = Arc::clone(&self.provider);
            let key = name.clone();
            let value = self
                .metrics
                .get_or_load(name.clone(), move || async move {
                    provider.fetch_metric(&key).await
                })
                .await
                .map_err(|source| RewardError::MetricUnavailable {
                    metric: name.clone(),
                    source,
                })?;
            set.insert(name.clone(), value, *weight);
        }
        Ok(set)
    }

    /// Reward for this interval. Zero when any metric is unavailable.
    pub async fn compute_reward(&self) -> u128 {
        match self.collect_metrics().await {
            Ok(set) => {
                let reward =
                    calculate_reward(&set, self.config.total_supply, self.config.allocation_bps);
                debug!(reward, "Computed node reward");
                reward
            }
            Err(e) => {
                warn!(error = %e, "Metric fetch failed, reward is zero");
                0
            }
        }
    }

    /// Forget cached metrics after a successful distribution.
    pub fn mark_distributed(&self) {
        self.metrics.clear();
        debug!("Metric cache cleared after distribution");
    }

    /// Number of metrics currently cached.
    pub fn cached_metrics(&self) -> usize {
        self.metrics.cache().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use crate::provider::MetricFetchResult;
    use shared_types::MockTimeSource;
    use std::collections::HashMap;

    #[derive(Default)]
    struct StubProvider {
        values: Mutex<HashMap<String, f64>>,
        failing: Mutex<Option<String>>,
        calls: Mutex<Vec<String>>,
    }

    impl StubProvider {
        fn scenario() -> Self {
            let provider = Self::default();
            {
                let mut values = provider.values.lock();
                values.insert("uptime".into(), 100.0);
                values.insert("users".into(), 1_000_000.0);
                values.insert("governance".into(), 100.0);
            }
            provider
        }

        fn calls(&self) -> usize {
            self.calls.lock().len()
        }
    }

    #[async_trait]
    impl MetricsProvider for StubProvider {
        async fn fetch_metric(&self, name: &str) -> MetricFetchResult {
            self.calls.lock().push(name.to_string());
            if self.failing.lock().as_deref() == Some(name) {
                return Err(RetryError::Exhausted {
                    attempts: 2,
                    total_delay: std::time::Duration::from_millis(10),
                    source: LedgerError::Network("metrics endpoint down".into()),
                });
            }
            Ok(self.values.lock().get(name).copied().unwrap_or(0.0))
        }
    }

    fn calculator(
        provider: Arc<StubProvider>,
        allocation_bps: f64,
    ) -> (MetricRewardCalculator, Arc<MockTimeSource>) {
        let clock = Arc::new(MockTimeSource::new(0));
        let config = RewardConfig {
            distribution_interval_ms: 60_000,
            allocation_bps,
            ..RewardConfig::default()
        };
        let calc = MetricRewardCalculator::with_clock(config, provider, clock.clone()).unwrap();
        (calc, clock)
    }

    #[tokio::test]
    async fn test_concrete_scenario() {
        let provider = Arc::new(StubProvider::scenario());
        let (calc, _) = calculator(provider, 7.407407407);
        let reward = calc.compute_reward().await;
        assert!(reward <= 1_000_000);
    }

    #[tokio::test]
    async fn test_metrics_cached_for_interval() {
        let provider = Arc::new(StubProvider::scenario());
        let (calc, clock) = calculator(provider.clone(), 1.0);

        let first = calc.compute_reward().await;
        clock.advance(59_999);
        let second = calc.compute_reward().await;
        assert_eq!(first, second);
        assert_eq!(provider.calls(), 3);
        assert_eq!(calc.cached_metrics(), 3);

        clock.advance(1);
        calc.compute_reward().await;
        assert_eq!(provider.calls(), 6);
    }

    #[tokio::test]
    async fn test_mark_distributed_forgets_metrics() {
        let provider = Arc::new(StubProvider::scenario());
        let (calc, _) = calculator(provider.clone(), 1.0);

        calc.compute_reward().await;
        calc.mark_distributed();
        assert_eq!(calc.cached_metrics(), 0);
        calc.compute_reward().await;
        assert_eq!(provider.calls(), 6);
    }

    #[tokio::test]
    async fn test_fetch_failure_yields_zero() {
        let provider = Arc::new(StubProvider::scenario());
        *provider.failing.lock() = Some("users".into());
        let (calc, _) = calculator(provider.clone(), 1.0);

        assert_eq!(calc.compute_reward().await, 0);
        let err = calc.collect_metrics().await.unwrap_err();
        assert!(matches!(err, RewardError::MetricUnavailable { ref metric, .. } if metric == "users"));
        assert_eq!(err.attempts(), Some(2));
    }

    #[tokio::test]
    async fn test_negative_metric_yields_zero() {
        let provider = Arc::new(StubProvider::scenario());
        provider.values.lock().insert("uptime".into(), -5.0);
        let (calc, _) = calculator(provider, 100.0);
        assert_eq!(calc.compute_reward().await, 0);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = RewardConfig {
            distribution_interval_ms: 0,
            ..RewardConfig::default()
        };
        assert!(MetricRewardCalculator::new(config, Arc::new(StubProvider::default())).is_err());
    }
}
