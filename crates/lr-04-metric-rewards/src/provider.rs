//! Outbound port for raw metric values.

use async_trait::async_trait;
use lr_01_retry::RetryError;
use shared_types::LedgerError;

/// Outcome of one metric fetch. Failures report how many calls were made.
pub type MetricFetchResult = Result<f64, RetryError<LedgerError>>;

/// Source of the current value of a named metric (uptime, user count,
/// governance participation, idea usage...).
#[async_trait]
pub trait MetricsProvider: Send + Sync {
    async fn fetch_metric(&self, name: &str) -> MetricFetchResult;
}
