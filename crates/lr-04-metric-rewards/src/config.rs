//! Reward parameters.

use crate::error::{RewardError, RewardResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Weights applied to the node metrics when none are configured.
pub const DEFAULT_WEIGHTS: [(&str, f64); 3] = [("uptime", 0.6), ("users", 0.4), ("governance", 1.0)];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardConfig {
    /// Metric name → weight. The names are also the provider keys.
    pub weights: BTreeMap<String, f64>,
    /// Lifetime of a cached metric value, in milliseconds.
    pub distribution_interval_ms: u64,
    /// Supply the allocation is taken from.
    pub total_supply: u128,
    /// Share of the supply, in basis points (hundredths of a percent).
    pub allocation_bps: f64,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            weights: DEFAULT_WEIGHTS
                .iter()
                .map(|(name, weight)| ((*name).to_string(), *weight))
                .collect(),
            distribution_interval_ms: 24 * 60 * 60 * 1000,
            total_supply: 1_000_000,
            allocation_bps: 100.0,
        }
    }
}

impl RewardConfig {
    pub fn distribution_interval(&self) -> Duration {
        Duration::from_millis(self.distribution_interval_ms)
    }

    /// # Errors
    ///
    /// `RewardError::InvalidConfig` for an empty or non-positive weight set,
    /// a zero interval, or a negative allocation.
    pub fn validate(&self) -> RewardResult<()> {
        let invalid = |reason: &str| {
            Err(RewardError::InvalidConfig {
                reason: reason.to_string(),
            })
        };
        if self.weights.is_empty() {
            return invalid("at least one metric weight is required");
        }
        if self.weights.values().any(|w| !w.is_finite() || *w < 0.0) {
            return invalid("weights must be finite and non-negative");
        }
        if self.weights.values().sum::<f64>() <= 0.0 {
            return invalid("weights must not all be zero");
        }
        if self.distribution_interval_ms == 0 {
            return invalid("distribution interval must be greater than 0");
        }
        if !self.allocation_bps.is_finite() || self.allocation_bps < 0.0 {
            return invalid("allocation must be finite and non-negative");
        }
        Ok(())
    }
}
