//! # Ledger Resilience Telemetry
//!
//! Log output and Prometheus counters for the resilience layer.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use lr_telemetry::{init_telemetry, TelemetryConfig};
//!
//! let _guard = init_telemetry(TelemetryConfig::from_env())?;
//! // ...
//! let text = _guard.metrics().gather()?;
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `LR_LOG_LEVEL` / `RUST_LOG` | `info` | Log level filter |
//! | `LR_JSON_LOGS` | `false` | JSON log lines instead of human-readable |
//! | `LR_SERVICE_NAME` | `ledger-resilience` | Service name attached to startup logs |
//! | `LR_CONSOLE_OUTPUT` | `true` | Write logs to stdout at all |

mod config;
mod logging;
mod metrics;

pub use config::TelemetryConfig;
pub use logging::init_logging;
pub use metrics::{
    encode_metrics, register_metrics, MetricsHandle, BUSY_REJECTIONS, CACHE_INVALIDATIONS,
    CACHE_LOOKUPS, EVENTS_BRIDGED, RETRIES_EXHAUSTED, RETRY_ATTEMPTS, REWARDS_DISTRIBUTED,
    REWARD_AMOUNT_DISTRIBUTED, SERVICE_ERRORS,
};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize log subscriber: {0}")]
    LoggingInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Register metrics and install the log subscriber.
///
/// Hold the returned guard for the lifetime of the process.
///
/// # Errors
///
/// Fails if a global subscriber is already installed or a metric cannot be
/// registered.
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    // Metrics first, they do not depend on the subscriber
    let metrics = register_metrics()?;
    init_logging(&config)?;

    tracing::info!(
        service = %config.service_name,
        json_logs = config.json_logs,
        "Telemetry initialized"
    );

    Ok(TelemetryGuard { metrics })
}

/// Keeps telemetry active.
pub struct TelemetryGuard {
    metrics: MetricsHandle,
}

impl TelemetryGuard {
    pub fn metrics(&self) -> &MetricsHandle {
        &self.metrics
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!("Shutting down telemetry...");
    }
}

/// Entity-scoped structured event.
///
/// ```rust,ignore
/// log_entity_event!(info, "domain", domain_id, "Domain updated", attempts = 2);
/// ```
#[macro_export]
macro_rules! log_entity_event {
    ($level:ident, $entity:expr, $id:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            entity = $entity,
            entity_id = %$id,
            $($($field)*,)?
            $msg
        )
    };
}

/// Increment a counter, optionally labelled.
#[macro_export]
macro_rules! metric_inc {
    ($metric:expr) => {
        $metric.inc()
    };
    ($metric:expr, $labels:expr) => {
        $metric.with_label_values($labels).inc()
    };
}
