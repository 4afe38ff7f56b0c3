//! # Service Container
//!
//! Holds every guarded entity service and the event bridge feeding them.
//!
//! ## Construction Order
//!
//! ```text
//! 1. Validate RuntimeConfig
//! 2. EventBridge over the upstream event source
//! 3. Domain, Idea, Backup services (one cache + state map each)
//! 4. Node reward service (metric cache)
//! 5. Event routing: invalidators, observer, tracking listeners
//! ```
//!
//! Nothing here is global: the gateway, event source and clock are passed
//! in, so tests build as many independent containers as they need.

use crate::adapters::InMemoryLedger;
use crate::container::config::{ConfigError, RuntimeConfig};
use crate::services::{BackupService, DomainService, IdeaService, NodeRewardService, ServiceError};
use crate::wiring::EventRouting;
use lr_02_entity_cache::CacheError;
use lr_05_event_bridge::EventBridge;
use parking_lot::Mutex;
use shared_bus::{InMemoryEventBus, LedgerEventSource};
use shared_types::{EntityKind, LedgerGateway, SystemTimeSource, TimeSource};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, instrument};

/// Container construction failures.
#[derive(Debug, Error)]
pub enum ContainerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Cache construction failed: {0}")]
    Cache(#[from] CacheError),

    #[error("Service construction failed: {0}")]
    Service(#[from] ServiceError),
}

/// The composition root.
pub struct ServiceContainer {
    pub domains: Arc<DomainService>,
    pub ideas: Arc<IdeaService>,
    pub backups: Arc<BackupService>,
    pub rewards: Arc<NodeRewardService>,

    /// Fan-out of ledger events; also a [`LedgerEventSource`] for callers.
    pub bridge: Arc<EventBridge>,

    /// Configuration (immutable after construction).
    pub config: RuntimeConfig,

    routing: Mutex<EventRouting>,
}

impl ServiceContainer {
    /// # Errors
    ///
    /// `ContainerError::Config` if `config` does not validate.
    #[instrument(name = "container_init", skip_all)]
    pub fn new(
        config: RuntimeConfig,
        gateway: Arc<dyn LedgerGateway>,
        events: Arc<dyn LedgerEventSource>,
        clock: Arc<dyn TimeSource>,
    ) -> Result<Self, ContainerError> {
        config.validate()?;
        let policy = config.retry.policy();

        let bridge = Arc::new(EventBridge::new(events));

        let domains = Arc::new(DomainService::new(
            Arc::clone(&gateway),
            policy.clone(),
            config.cache.for_kind(EntityKind::Domain).cache_config(),
            Arc::clone(&clock),
        )?);
        let ideas = Arc::new(IdeaService::new(
            Arc::clone(&gateway),
            policy.clone(),
            config.cache.for_kind(EntityKind::Idea).cache_config(),
            Arc::clone(&clock),
        )?);
        let backups = Arc::new(BackupService::new(
            Arc::clone(&gateway),
            policy.clone(),
            config.cache.for_kind(EntityKind::BackupRequest).cache_config(),
            Arc::clone(&clock),
        )?);
        let rewards = Arc::new(NodeRewardService::new(
            gateway,
            policy,
            config.rewards.clone(),
            clock,
        )?);

        let routing = EventRouting::install(&bridge, &domains, &ideas, &backups, &rewards);
        info!(
            max_attempts = config.retry.max_attempts,
            distribution_interval_ms = config.rewards.distribution_interval_ms,
            "Service container initialized"
        );

        Ok(Self {
            domains,
            ideas,
            backups,
            rewards,
            bridge,
            config,
            routing: Mutex::new(routing),
        })
    }

    /// Container over a fresh in-memory ledger publishing to an in-memory bus.
    ///
    /// # Errors
    ///
    /// Same as [`ServiceContainer::new`].
    pub fn in_memory(
        config: RuntimeConfig,
    ) -> Result<(Self, Arc<InMemoryLedger>), ContainerError> {
        Self::in_memory_with_clock(config, Arc::new(SystemTimeSource))
    }

    /// [`ServiceContainer::in_memory`] with an explicit clock.
    ///
    /// # Errors
    ///
    /// Same as [`ServiceContainer::new`].
    pub fn in_memory_with_clock(
        config: RuntimeConfig,
        clock: Arc<dyn TimeSource>,
    ) -> Result<(Self, Arc<InMemoryLedger>), ContainerError> {
        let bus = Arc::new(InMemoryEventBus::new());
        let ledger = Arc::new(InMemoryLedger::new());
        ledger.publish_to(bus.clone());
        let container = Self::new(config, ledger.clone(), bus, clock)?;
        Ok((container, ledger))
    }

    /// Drop every cache and state map.
    pub fn cleanup(&self) {
        self.domains.cleanup();
        self.ideas.cleanup();
        self.backups.cleanup();
        self.rewards.cleanup();
        info!("Service caches and state cleared");
    }

    /// Detach from the event stream and clear all state.
    pub fn shutdown(&self) {
        self.routing.lock().uninstall(&self.bridge);
        self.bridge.shutdown();
        self.cleanup();
        info!("Service container shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_bus::{EventKind, LedgerEvent};
    use shared_types::{EntityId, MockTimeSource};

    fn container() -> (ServiceContainer, Arc<InMemoryLedger>) {
        ServiceContainer::in_memory_with_clock(
            RuntimeConfig::default(),
            Arc::new(MockTimeSource::new(0)),
        )
        .unwrap()
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = RuntimeConfig::default();
        config.cache.ideas.ttl_ms = 0;
        let err = ServiceContainer::in_memory(config).err().unwrap();
        assert!(matches!(err, ContainerError::Config(ConfigError::Cache { .. })));
    }

    #[tokio::test]
    async fn test_invalidators_pin_upstream_kinds() {
        let (container, _) = container();
        assert!(container.bridge.is_subscribed_upstream(EventKind::DomainUpdated));
        assert!(container.bridge.is_subscribed_upstream(EventKind::BackupCancelled));
        assert!(container.bridge.is_subscribed_upstream(EventKind::RewardsDistributed));
    }

    #[tokio::test]
    async fn test_external_registration_is_tracked() {
        let (container, ledger) = container();
        ledger
            .emit(LedgerEvent::DomainRegistered {
                domain: EntityId::from("physics"),
                owner: "alice".into(),
            })
            .await;
        assert!(container.domains.state("physics").is_some());
    }

    #[tokio::test]
    async fn test_shutdown_detaches_and_clears() {
        let (container, _) = container();
        container.domains.core().track(EntityId::from("physics"));

        container.shutdown();
        assert!(!container.bridge.is_subscribed_upstream(EventKind::DomainRegistered));
        assert!(container.domains.core().states().is_empty());
    }
}
