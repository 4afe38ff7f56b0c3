//! Shared builders for integration tests.

use service_runtime::adapters::InMemoryLedger;
use service_runtime::{RuntimeConfig, ServiceContainer};
use shared_types::MockTimeSource;
use std::sync::Arc;

/// A container over a fresh in-memory ledger, driven by a manual clock.
pub struct Harness {
    pub container: ServiceContainer,
    pub ledger: Arc<InMemoryLedger>,
    pub clock: Arc<MockTimeSource>,
}

/// Fast backoff so paused-time tests stay short.
pub fn test_config() -> RuntimeConfig {
    let mut config = RuntimeConfig::default();
    config.retry.initial_delay_ms = 10;
    config.retry.max_delay_ms = 100;
    config
}

pub fn harness() -> Harness {
    harness_with(test_config())
}

/// # Panics
///
/// If `config` does not validate.
pub fn harness_with(config: RuntimeConfig) -> Harness {
    let clock = Arc::new(MockTimeSource::new(1_000));
    let (container, ledger) = ServiceContainer::in_memory_with_clock(config, clock.clone())
        .expect("test configuration is valid");
    Harness {
        container,
        ledger,
        clock,
    }
}

/// Seed the reward contract with metrics and a funded pool.
pub fn seed_rewards(ledger: &InMemoryLedger, uptime: f64, users: f64, governance: f64) {
    ledger.set_metric("uptime", uptime);
    ledger.set_metric("users", users);
    ledger.set_metric("governance", governance);
    ledger.fund_reward_pool(1_000_000);
}
