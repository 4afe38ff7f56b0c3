//! # Ledger Resilience Runtime
//!
//! Demonstration binary: builds the service container over the in-memory
//! ledger, runs a short flow through every service and waits for Ctrl+C.
//!
//! ## Startup Sequence
//!
//! 1. Initialize telemetry (`LR_LOG_LEVEL`, `LR_JSON_LOGS`, ...)
//! 2. Load `RuntimeConfig` from `LR_*` variables and validate it
//! 3. Build the container (services, event bridge, routing)
//! 4. Run the demo flow
//! 5. Wait for Ctrl+C, then shut down

use std::sync::Arc;

use anyhow::{Context, Result};
use lr_04_metric_rewards::WeightedMetricSet;
use lr_telemetry::{init_telemetry, TelemetryConfig};
use service_runtime::adapters::{InMemoryLedger, LedgerOperation};
use service_runtime::{RuntimeConfig, ServiceContainer};
use shared_types::LedgerError;
use tracing::{info, warn};

async fn run_demo(container: &ServiceContainer, ledger: &Arc<InMemoryLedger>) -> Result<()> {
    ledger.set_metric("uptime", 0.99);
    ledger.set_metric("users", 0.42);
    ledger.set_metric("governance", 0.75);
    ledger.fund_reward_pool(container.config.rewards.total_supply);

    let domains = &container.domains;
    domains
        .register_domain("physics", "alice", "Natural sciences")
        .await
        .context("domain registration failed")?;

    // One transient failure, absorbed by the retry executor.
    ledger.inject(
        LedgerOperation::Submit,
        LedgerError::Network("connection reset".into()),
    );
    let mapped = domains
        .map_domain("physics", "ipfs://physics")
        .await
        .context("domain mapping failed")?;
    info!(
        mapped_to = ?mapped.value.mapped_target,
        block_height = mapped.receipt.block_height,
        "Domain mapped"
    );

    let ideas = &container.ideas;
    ideas
        .register_idea(1, "carol", "Room-temperature superconductor")
        .await
        .context("idea registration failed")?;
    let metrics = WeightedMetricSet::new()
        .with("citations", 0.8, 1.0)
        .with("adoption", 0.3, 2.0);
    let royalties = ideas
        .distribute_royalties(1, &metrics, 50_000, 2_500.0)
        .await
        .context("royalty distribution failed")?;
    info!(total = royalties.value.total_royalties, "Royalties distributed");

    let backups = &container.backups;
    backups
        .request_backup("req-1", "dave", "9f86d081884c7d65")
        .await
        .context("backup request failed")?;
    backups
        .complete_backup("req-1", "storage-node-7")
        .await
        .context("backup completion failed")?;

    let preview = container.rewards.preview_reward().await;
    info!(preview, "Node reward preview");
    match container.rewards.distribute_rewards(1).await {
        Ok(distribution) => info!(
            epoch = distribution.epoch,
            amount = distribution.amount,
            "Node rewards distributed"
        ),
        Err(e) => warn!(error = %e, "Node reward distribution failed"),
    }

    info!(
        events_bridged = container.bridge.events_bridged(),
        invalidations = container.bridge.invalidations(),
        "Demo flow complete"
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let telemetry = init_telemetry(TelemetryConfig::from_env())
        .context("failed to initialize telemetry")?;

    let config = RuntimeConfig::from_env().context("invalid runtime configuration")?;
    let (container, ledger) =
        ServiceContainer::in_memory(config).context("failed to build service container")?;

    run_demo(&container, &ledger).await?;

    match telemetry.metrics().gather() {
        Ok(text) => info!(bytes = text.len(), "Metrics snapshot rendered"),
        Err(e) => warn!(error = %e, "Metrics snapshot failed"),
    }

    info!("Runtime is idle. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    container.shutdown();
    Ok(())
}
