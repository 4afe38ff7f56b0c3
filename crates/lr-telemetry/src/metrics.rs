//! Prometheus metrics for the resilience layer.
//!
//! All metrics follow the naming convention: `lr_<component>_<metric>_<unit>`

use lazy_static::lazy_static;
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // RETRY
    // =========================================================================

    /// Retries scheduled after a transient failure
    pub static ref RETRY_ATTEMPTS: IntCounterVec = IntCounterVec::new(
        Opts::new("lr_retry_attempts_total", "Retries scheduled after a transient failure"),
        &["entity"]
    ).expect("metric creation failed");

    /// Operations that failed on every attempt
    pub static ref RETRIES_EXHAUSTED: IntCounterVec = IntCounterVec::new(
        Opts::new("lr_retry_exhausted_total", "Operations that failed on every attempt"),
        &["entity"]
    ).expect("metric creation failed");

    // =========================================================================
    // CACHE
    // =========================================================================

    /// Cache lookups by outcome
    pub static ref CACHE_LOOKUPS: IntCounterVec = IntCounterVec::new(
        Opts::new("lr_cache_lookups_total", "Entity cache lookups"),
        &["entity", "result"]  // result: hit/miss/joined
    ).expect("metric creation failed");

    /// Entries dropped because a ledger event made them stale
    pub static ref CACHE_INVALIDATIONS: IntCounter = IntCounter::new(
        "lr_cache_invalidations_total",
        "Cache entries invalidated by ledger events"
    ).expect("metric creation failed");

    // =========================================================================
    // ENTITY STATE
    // =========================================================================

    /// Mutations rejected because the entity was busy
    pub static ref BUSY_REJECTIONS: IntCounterVec = IntCounterVec::new(
        Opts::new("lr_state_busy_rejections_total", "Mutations rejected on a busy entity"),
        &["entity"]
    ).expect("metric creation failed");

    // =========================================================================
    // EVENTS
    // =========================================================================

    /// Ledger events delivered through the bridge
    pub static ref EVENTS_BRIDGED: IntCounterVec = IntCounterVec::new(
        Opts::new("lr_events_bridged_total", "Ledger events delivered through the bridge"),
        &["event_kind"]
    ).expect("metric creation failed");

    // =========================================================================
    // REWARDS
    // =========================================================================

    /// Successful reward distributions
    pub static ref REWARDS_DISTRIBUTED: IntCounter = IntCounter::new(
        "lr_rewards_distributions_total",
        "Successful node reward distributions"
    ).expect("metric creation failed");

    /// Sum of distributed reward amounts
    pub static ref REWARD_AMOUNT_DISTRIBUTED: IntCounter = IntCounter::new(
        "lr_rewards_amount_total",
        "Total reward amount distributed"
    ).expect("metric creation failed");

    // =========================================================================
    // ERRORS
    // =========================================================================

    /// Service errors by entity and type
    pub static ref SERVICE_ERRORS: IntCounterVec = IntCounterVec::new(
        Opts::new("lr_service_errors_total", "Errors by entity service and type"),
        &["entity", "error_type"]
    ).expect("metric creation failed");
}

/// Access to the registered metrics.
#[derive(Debug, Clone, Copy)]
pub struct MetricsHandle {
    _private: (),
}

impl MetricsHandle {
    /// Render every registered metric in the Prometheus text format.
    ///
    /// # Errors
    ///
    /// Encoding failures.
    pub fn gather(&self) -> Result<String, TelemetryError> {
        encode_metrics()
    }
}

/// Register all metrics with the global registry. Safe to call repeatedly.
///
/// # Errors
///
/// Any registration failure other than "already registered".
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        // Retry
        Box::new(RETRY_ATTEMPTS.clone()),
        Box::new(RETRIES_EXHAUSTED.clone()),
        // Cache
        Box::new(CACHE_LOOKUPS.clone()),
        Box::new(CACHE_INVALIDATIONS.clone()),
        // State
        Box::new(BUSY_REJECTIONS.clone()),
        // Events
        Box::new(EVENTS_BRIDGED.clone()),
        // Rewards
        Box::new(REWARDS_DISTRIBUTED.clone()),
        Box::new(REWARD_AMOUNT_DISTRIBUTED.clone()),
        // Errors
        Box::new(SERVICE_ERRORS.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }

    Ok(MetricsHandle { _private: () })
}

/// Encode all metrics as Prometheus text format.
///
/// # Errors
///
/// Encoding failures.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_twice() {
        assert!(register_metrics().is_ok());
        assert!(register_metrics().is_ok());
    }

    #[test]
    fn test_gather_includes_counters() {
        let handle = register_metrics().unwrap();
        RETRY_ATTEMPTS.with_label_values(&["domain"]).inc();
        CACHE_INVALIDATIONS.inc();

        let text = handle.gather().unwrap();
        assert!(text.contains("lr_retry_attempts_total"));
        assert!(text.contains("lr_cache_invalidations_total"));
    }
}
