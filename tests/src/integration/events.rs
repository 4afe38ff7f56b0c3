//! # Event Bridge Integration
//!
//! Ledger events flowing through the container's bridge: caches are
//! invalidated before any listener runs, and the bridge itself is usable as
//! an event source.

#[cfg(test)]
mod tests {
    use crate::integration::fixtures::{harness, seed_rewards};
    use parking_lot::Mutex;
    use shared_bus::{EventKind, LedgerEvent, LedgerEventSource};
    use shared_types::EntityId;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_listener_sees_invalidated_cache() {
        let h = harness();
        h.ledger.seed_domain("physics", "alice");
        h.container.domains.domain("physics").await.unwrap();

        let cache = h.container.domains.core().loader().cache().clone();
        let observed = Arc::new(Mutex::new(Vec::new()));
        let sink = observed.clone();
        h.container.bridge.on(
            EventKind::DomainUpdated,
            Arc::new(move |event: &LedgerEvent| {
                if let LedgerEvent::DomainUpdated { domain } = event {
                    sink.lock().push(cache.has(domain));
                }
            }),
        );

        h.ledger
            .emit(LedgerEvent::DomainUpdated {
                domain: EntityId::from("physics"),
            })
            .await;

        assert_eq!(*observed.lock(), vec![false]);
        assert_eq!(h.container.bridge.invalidations(), 1);
    }

    #[tokio::test]
    async fn test_external_write_is_visible_on_next_read() {
        let h = harness();
        h.ledger.seed_domain("physics", "alice");
        let before = h.container.domains.domain("physics").await.unwrap();
        assert_eq!(before.metadata, "");

        // Another party updates the ledger directly, then the event arrives.
        h.ledger.seed_domain("physics", "mallory");
        h.ledger
            .emit(LedgerEvent::DomainUpdated {
                domain: EntityId::from("physics"),
            })
            .await;

        let after = h.container.domains.domain("physics").await.unwrap();
        assert_eq!(after.owner, "mallory");
        assert_eq!(h.ledger.reads(), 2);
    }

    #[tokio::test]
    async fn test_unrelated_kind_keeps_cache() {
        let h = harness();
        h.ledger.seed_domain("physics", "alice");
        h.container.domains.domain("physics").await.unwrap();

        h.ledger
            .emit(LedgerEvent::IdeaUpdated {
                idea_id: EntityId::from("physics"),
            })
            .await;

        assert!(h
            .container
            .domains
            .core()
            .loader()
            .cache()
            .has(&EntityId::from("physics")));
    }

    #[tokio::test]
    async fn test_off_leaves_other_listeners() {
        let h = harness();
        let hits = Arc::new(Mutex::new(Vec::new()));

        let first = hits.clone();
        let a = h.container.bridge.on(
            EventKind::BackupCancelled,
            Arc::new(move |_event: &LedgerEvent| first.lock().push("a")),
        );
        let second = hits.clone();
        h.container.bridge.on(
            EventKind::BackupCancelled,
            Arc::new(move |_event: &LedgerEvent| second.lock().push("b")),
        );
        h.container.bridge.off(EventKind::BackupCancelled, a).unwrap();

        h.ledger
            .emit(LedgerEvent::BackupCancelled {
                request_id: EntityId::from("req-1"),
            })
            .await;
        assert_eq!(*hits.lock(), vec!["b"]);
    }

    #[tokio::test]
    async fn test_bridge_is_an_event_source() {
        let h = harness();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let source: Arc<dyn LedgerEventSource> = h.container.bridge.clone();
        let id = source.subscribe(
            EventKind::IdeaRegistered,
            Arc::new(move |event: &LedgerEvent| sink.lock().push(event.clone())),
        );

        h.container.ideas.register_idea(5, "carol", "Fusion").await.unwrap();
        assert_eq!(seen.lock().len(), 1);

        assert!(source.unsubscribe(EventKind::IdeaRegistered, id));
        h.container.ideas.register_idea(6, "carol", "Fission").await.unwrap();
        assert_eq!(seen.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_parameter_change_drops_metric_cache() {
        let h = harness();
        seed_rewards(&h.ledger, 0.5, 0.5, 0.5);
        h.container.rewards.preview_reward().await;
        assert_eq!(h.container.rewards.calculator().cached_metrics(), 3);

        h.ledger
            .emit(LedgerEvent::ParameterChanged {
                parameter: "allocation".into(),
            })
            .await;
        assert_eq!(h.container.rewards.calculator().cached_metrics(), 0);
    }

    #[tokio::test]
    async fn test_foreign_distribution_drops_metric_cache() {
        let h = harness();
        seed_rewards(&h.ledger, 0.5, 0.5, 0.5);
        h.container.rewards.preview_reward().await;

        h.ledger
            .emit(LedgerEvent::RewardsDistributed {
                epoch: 1,
                amount: 10,
            })
            .await;
        assert_eq!(h.container.rewards.calculator().cached_metrics(), 0);
        assert_eq!(h.container.bridge.invalidations(), 1);
    }
}
