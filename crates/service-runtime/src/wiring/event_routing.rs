//! Invalidators, metrics observer and tracking listeners on the bridge.

use crate::services::{BackupService, DomainService, IdeaService, NodeRewardService};
use lr_05_event_bridge::{EventBridge, ListenerId};
use lr_telemetry::{metric_inc, CACHE_INVALIDATIONS, EVENTS_BRIDGED};
use shared_bus::{EventKind, LedgerEvent};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Listeners installed on a bridge, removable as a group.
pub struct EventRouting {
    listeners: Vec<(EventKind, ListenerId)>,
}

impl EventRouting {
    /// Register every service's invalidator and the routing listeners.
    pub fn install(
        bridge: &EventBridge,
        domains: &Arc<DomainService>,
        ideas: &Arc<IdeaService>,
        backups: &Arc<BackupService>,
        rewards: &Arc<NodeRewardService>,
    ) -> Self {
        bridge.add_invalidator(Arc::new(domains.invalidator()));
        bridge.add_invalidator(Arc::new(ideas.invalidator()));
        bridge.add_invalidator(Arc::new(backups.invalidator()));
        bridge.add_invalidator(Arc::new(rewards.invalidator()));

        bridge.set_observer(Arc::new(|event: &LedgerEvent, invalidated: usize| {
            let kind = event.kind().to_string();
            metric_inc!(EVENTS_BRIDGED, &[kind.as_str()]);
            CACHE_INVALIDATIONS.inc_by(invalidated as u64);
        }));

        let mut listeners = Vec::new();

        let service = Arc::clone(domains);
        listeners.push((
            EventKind::DomainRegistered,
            bridge.on(
                EventKind::DomainRegistered,
                Arc::new(move |event: &LedgerEvent| {
                    if let LedgerEvent::DomainRegistered { domain, owner } = event {
                        if service.core().track(domain.clone()) {
                            debug!(domain = %domain, owner = %owner, "Tracking domain");
                        }
                    }
                }),
            ),
        ));

        let service = Arc::clone(ideas);
        listeners.push((
            EventKind::IdeaRegistered,
            bridge.on(
                EventKind::IdeaRegistered,
                Arc::new(move |event: &LedgerEvent| {
                    if let LedgerEvent::IdeaRegistered { idea_id, creator } = event {
                        if service.core().track(idea_id.clone()) {
                            debug!(idea_id = %idea_id, creator = %creator, "Tracking idea");
                        }
                    }
                }),
            ),
        ));

        let service = Arc::clone(backups);
        listeners.push((
            EventKind::BackupRequested,
            bridge.on(
                EventKind::BackupRequested,
                Arc::new(move |event: &LedgerEvent| {
                    if let LedgerEvent::BackupRequested {
                        request_id,
                        requester,
                    } = event
                    {
                        if service.core().track(request_id.clone()) {
                            debug!(request_id = %request_id, requester = %requester, "Tracking backup request");
                        }
                    }
                }),
            ),
        ));

        // Governance changes can move any metric.
        let service = Arc::clone(rewards);
        listeners.push((
            EventKind::ParameterChanged,
            bridge.on(
                EventKind::ParameterChanged,
                Arc::new(move |event: &LedgerEvent| {
                    if let LedgerEvent::ParameterChanged { parameter } = event {
                        service.calculator().mark_distributed();
                        debug!(parameter = %parameter, "Metric cache dropped after parameter change");
                    }
                }),
            ),
        ));

        info!(listeners = listeners.len(), "Event routing installed");
        Self { listeners }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Remove the routing listeners. Invalidators stay registered until the
    /// bridge shuts down.
    pub fn uninstall(&mut self, bridge: &EventBridge) {
        for (kind, id) in self.listeners.drain(..) {
            if let Err(e) = bridge.off(kind, id) {
                warn!(error = %e, "Routing listener already removed");
            }
        }
    }
}
