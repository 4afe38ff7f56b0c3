//! Error types for reward calculation

use lr_01_retry::RetryError;
use shared_types::LedgerError;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum RewardError {
    #[error("Invalid reward configuration: {reason}")]
    InvalidConfig { reason: String },

    /// A metric could not be fetched from its provider. `source` keeps the
    /// attempt count when the provider gave up after retrying.
    #[error("Metric {metric} unavailable: {source}")]
    MetricUnavailable {
        metric: String,
        #[source]
        source: RetryError<LedgerError>,
    },
}

impl RewardError {
    /// Calls made for the failed metric, if a fetch failed at all.
    pub fn attempts(&self) -> Option<u32> {
        match self {
            RewardError::MetricUnavailable { source, .. } => Some(source.attempts()),
            RewardError::InvalidConfig { .. } => None,
        }
    }
}

/// Result type for reward operations
pub type RewardResult<T> = Result<T, RewardError>;
