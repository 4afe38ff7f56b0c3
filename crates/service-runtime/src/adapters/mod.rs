//! Adapters connecting the services to concrete ledger backends.

pub mod in_memory_ledger;
pub mod ledger_metrics;

pub use in_memory_ledger::{InMemoryLedger, LedgerOperation};
pub use ledger_metrics::LedgerMetricsProvider;
