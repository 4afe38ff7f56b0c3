//! # Entity Lifecycle Flows
//!
//! Each flow runs through the container: guarded service, retry executor,
//! in-memory ledger, event bridge and back into the caches.

#[cfg(test)]
mod tests {
    use crate::integration::fixtures::{harness, harness_with, seed_rewards, test_config};
    use lr_03_entity_state::StateError;
    use lr_04_metric_rewards::WeightedMetricSet;
    use service_runtime::adapters::LedgerOperation;
    use service_runtime::services::{BackupStatus, DomainState, ServiceError};
    use shared_types::{EntityId, LedgerError};

    // =========================================================================
    // DOMAINS
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_domain_lifecycle_through_container() {
        let h = harness();
        let domains = &h.container.domains;

        domains.register_domain("physics", "alice", "v1").await.unwrap();
        domains.update_domain("physics", "v2").await.unwrap();
        domains.map_domain("physics", "ipfs://physics").await.unwrap();
        domains.contribute("physics", "bob", 40).await.unwrap();
        let confirmed = domains.contribute("physics", "erin", 2).await.unwrap();

        assert_eq!(confirmed.value.total_contributions, 42);
        assert_eq!(confirmed.value.metadata, "v2");
        assert_eq!(domains.state("physics"), Some(DomainState::Registered));
        // Every confirmed write was bridged back as an event.
        assert_eq!(h.container.bridge.events_bridged(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_exhaustion_reports_attempts() {
        let h = harness();
        h.ledger.seed_domain("physics", "alice");
        h.container.domains.domain("physics").await.unwrap();
        for _ in 0..3 {
            h.ledger
                .inject(LedgerOperation::Submit, LedgerError::Network("down".into()));
        }

        let err = h
            .container
            .domains
            .update_domain("physics", "v2")
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Retry exhausted after 3 attempts: Network error: down"
        );
        assert_eq!(h.ledger.submits(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_user_declined_is_not_retried() {
        let h = harness();
        h.ledger.inject(LedgerOperation::Submit, LedgerError::UserDeclined);

        let err = h
            .container
            .ideas
            .register_idea(3, "carol", "Fusion")
            .await
            .unwrap_err();
        assert_eq!(err, ServiceError::Ledger(LedgerError::UserDeclined));
        assert_eq!(h.ledger.submits(), 1);
        assert_eq!(h.container.ideas.state(3), None);
    }

    // =========================================================================
    // REFRESH FAILURE
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_write_then_failing_refresh() {
        let h = harness();
        h.ledger.seed_domain("physics", "alice");
        h.container.domains.domain("physics").await.unwrap();
        h.ledger.inject(
            LedgerOperation::Read,
            LedgerError::Decode("truncated payload".into()),
        );

        let err = h
            .container
            .domains
            .update_domain("physics", "v2")
            .await
            .unwrap_err();

        let ServiceError::RefreshFailed { receipt, source } = &err else {
            panic!("expected RefreshFailed, got {err:?}");
        };
        assert_eq!(receipt.block_height, 1);
        assert_eq!(
            **source,
            ServiceError::Ledger(LedgerError::Decode("truncated payload".into()))
        );
        assert_eq!(
            h.container.domains.state("physics"),
            Some(DomainState::Registered)
        );
        // Nothing stale is left behind: the next read reaches the ledger.
        let record = h.container.domains.domain("physics").await.unwrap();
        assert_eq!(record.metadata, "v2");
    }

    // =========================================================================
    // IDEAS AND BACKUPS
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_royalties_accumulate() {
        let h = harness();
        let ideas = &h.container.ideas;
        ideas.register_idea(11, "carol", "Fusion").await.unwrap();

        let metrics = WeightedMetricSet::new().with("citations", 1.0, 1.0);
        ideas
            .distribute_royalties(11, &metrics, 1_000, 1_000.0)
            .await
            .unwrap();
        let second = ideas
            .distribute_royalties(11, &metrics, 1_000, 500.0)
            .await
            .unwrap();
        assert_eq!(second.value.total_royalties, 150);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backup_cancel_flow() {
        let h = harness();
        let backups = &h.container.backups;
        backups.request_backup("req-9", "dave", "abcd").await.unwrap();

        let cancelled = backups.cancel_backup("req-9").await.unwrap();
        assert_eq!(cancelled.value.status, BackupStatus::Cancelled);

        let err = backups.complete_backup("req-9", "node-1").await.unwrap_err();
        assert!(matches!(err, ServiceError::Ledger(LedgerError::Reverted { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_backup_is_not_registered() {
        let h = harness();
        let err = h
            .container
            .backups
            .complete_backup("req-404", "node-1")
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ServiceError::State(StateError::NotRegistered {
                id: "req-404".into()
            })
        );
        assert_eq!(h.ledger.submits(), 0);
    }

    // =========================================================================
    // NODE REWARDS
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_reward_distribution_flow() {
        let mut config = test_config();
        config.rewards.allocation_bps = 1_000.0;
        let h = harness_with(config);
        seed_rewards(&h.ledger, 1.0, 1.0, 1.0);

        // score 1.0, 10% of 1_000_000
        assert_eq!(h.container.rewards.preview_reward().await, 100_000);
        let distribution = h.container.rewards.distribute_rewards(7).await.unwrap();
        assert_eq!(distribution.amount, 100_000);
        assert_eq!(h.ledger.reward_pool(), 900_000);

        // The same epoch cannot be paid twice.
        let err = h.container.rewards.distribute_rewards(7).await.unwrap_err();
        assert!(matches!(err, ServiceError::Ledger(LedgerError::Reverted { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_metrics_refetched_after_interval() {
        let h = harness();
        seed_rewards(&h.ledger, 1.0, 1.0, 1.0);

        h.container.rewards.preview_reward().await;
        h.container.rewards.preview_reward().await;
        assert_eq!(h.ledger.reads(), 3);

        let interval = h.container.config.rewards.distribution_interval_ms;
        h.clock.advance(interval);
        h.container.rewards.preview_reward().await;
        assert_eq!(h.ledger.reads(), 6);
    }

    // =========================================================================
    // CLEANUP
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_forgets_everything() {
        let h = harness();
        h.container.domains.register_domain("physics", "alice", "").await.unwrap();
        h.container.ideas.register_idea(1, "carol", "Fusion").await.unwrap();

        h.container.cleanup();

        assert!(h.container.domains.core().loader().cache().is_empty());
        assert!(h.container.domains.core().states().is_empty());
        assert!(h.container.ideas.core().states().is_empty());
        assert!(h
            .container
            .domains
            .core()
            .state(&EntityId::from("physics"))
            .is_none());
    }
}
