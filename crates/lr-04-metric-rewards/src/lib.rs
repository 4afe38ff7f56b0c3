//! # lr-04-metric-rewards
//!
//! Proportional reward and royalty amounts from weighted metrics.
//!
//! ## Formula
//!
//! ```text
//! score  = Σ(value_i * weight_i) / Σ(weight_i)
//! reward = floor(total_supply * score * allocation / 10_000)     allocation in basis points
//! reward = min(reward, total_supply)
//! ```
//!
//! Any failed metric fetch, a zero weight sum, a zero supply, or a negative
//! or non-finite input yields a reward of zero.
//!
//! ## Caching
//!
//! [`MetricRewardCalculator`] caches each metric for one distribution
//! interval and forgets them all once a distribution succeeds.

pub mod calculate;
pub mod calculator;
pub mod config;
pub mod error;
pub mod metric;
pub mod provider;

pub use calculate::{calculate_reward, weighted_score};
pub use calculator::MetricRewardCalculator;
pub use config::{RewardConfig, DEFAULT_WEIGHTS};
pub use error::{RewardError, RewardResult};
pub use metric::{WeightedMetric, WeightedMetricSet};
pub use provider::{MetricFetchResult, MetricsProvider};
