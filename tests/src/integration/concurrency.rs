//! # Concurrency
//!
//! Per-entity mutual exclusion and in-flight read coalescing, observed on
//! paused tokio time with an artificially slow ledger.

#[cfg(test)]
mod tests {
    use crate::integration::fixtures::{harness, Harness};
    use service_runtime::adapters::LedgerOperation;
    use service_runtime::services::DomainState;
    use shared_types::LedgerError;
    use std::time::Duration;
    use tokio::time::{timeout, Instant};

    const CONFIRMATION: Duration = Duration::from_millis(500);

    async fn known_domain(name: &str) -> Harness {
        let h = harness();
        h.ledger.seed_domain(name, "alice");
        h.container.domains.domain(name).await.unwrap();
        h
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_mutation_on_busy_entity_fails_fast() {
        let h = known_domain("physics").await;
        h.ledger.set_confirmation_delay(CONFIRMATION);
        let domains = &h.container.domains;

        let started = Instant::now();
        let (first, second) = tokio::join!(domains.update_domain("physics", "v2"), async {
            let result = domains.map_domain("physics", "ipfs://x").await;
            (result, started.elapsed())
        });

        let (second, rejected_after) = second;
        let err = second.unwrap_err();
        assert!(err.is_busy());
        assert_eq!(
            err.to_string(),
            "Entity physics is busy, currently in state updating"
        );
        assert_eq!(rejected_after, Duration::ZERO);
        assert_eq!(first.unwrap().value.metadata, "v2");
        assert_eq!(h.ledger.submits(), 1);

        // Released: a third mutation goes through.
        let third = domains.map_domain("physics", "ipfs://x").await.unwrap();
        assert_eq!(third.value.mapped_target.as_deref(), Some("ipfs://x"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_guard_released_after_failed_mutation() {
        let h = known_domain("physics").await;
        h.ledger.set_confirmation_delay(CONFIRMATION);
        h.ledger.inject(
            LedgerOperation::Confirm,
            LedgerError::Reverted {
                reason: "paused".into(),
            },
        );
        let domains = &h.container.domains;

        let (first, second) = tokio::join!(
            domains.update_domain("physics", "v2"),
            domains.update_domain("physics", "v3")
        );
        assert!(first.is_err() && !first.as_ref().unwrap_err().is_busy());
        assert!(second.unwrap_err().is_busy());

        let third = domains.update_domain("physics", "v3").await.unwrap();
        assert_eq!(third.value.metadata, "v3");
    }

    #[tokio::test(start_paused = true)]
    async fn test_distinct_entities_do_not_block_each_other() {
        let h = harness();
        h.ledger.seed_domain("physics", "alice");
        h.ledger.seed_domain("biology", "bob");
        let domains = &h.container.domains;
        domains.domain("physics").await.unwrap();
        domains.domain("biology").await.unwrap();
        h.ledger.set_confirmation_delay(CONFIRMATION);

        let started = Instant::now();
        let (a, b) = tokio::join!(
            domains.update_domain("physics", "p"),
            domains.update_domain("biology", "b")
        );
        assert!(a.is_ok() && b.is_ok());
        assert_eq!(started.elapsed(), CONFIRMATION);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_mutation_releases_guard() {
        let h = known_domain("physics").await;
        h.ledger.set_confirmation_delay(CONFIRMATION);
        let domains = &h.container.domains;

        let abandoned = timeout(
            Duration::from_millis(10),
            domains.update_domain("physics", "v2"),
        )
        .await;
        assert!(abandoned.is_err());
        assert_eq!(domains.state("physics"), Some(DomainState::Registered));

        h.ledger.set_confirmation_delay(Duration::ZERO);
        domains.update_domain("physics", "v3").await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_reads_share_one_fetch() {
        let h = harness();
        h.ledger.seed_domain("physics", "alice");
        h.ledger.set_read_delay(Duration::from_millis(50));
        let domains = &h.container.domains;

        let (a, b, c) = tokio::join!(
            domains.domain("physics"),
            domains.domain("physics"),
            domains.domain("physics")
        );
        assert_eq!(a.unwrap(), b.unwrap());
        assert!(c.is_ok());
        assert_eq!(h.ledger.reads(), 1);
        assert_eq!(domains.core().loader().fetches_joined(), 2);
        assert_eq!(domains.core().loader().in_flight(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_coalesced_failure_reaches_every_caller() {
        let h = harness();
        h.ledger.seed_domain("physics", "alice");
        h.ledger.set_read_delay(Duration::from_millis(50));
        h.ledger.inject(
            LedgerOperation::Read,
            LedgerError::Reverted {
                reason: "halted".into(),
            },
        );
        let domains = &h.container.domains;

        let (a, b) = tokio::join!(domains.domain("physics"), domains.domain("physics"));
        assert_eq!(a.unwrap_err(), b.unwrap_err());
        assert_eq!(h.ledger.reads(), 1);
        assert!(domains.core().loader().cache().is_empty());

        // Nothing was cached; the next read fetches again and succeeds.
        domains.domain("physics").await.unwrap();
        assert_eq!(h.ledger.reads(), 2);
    }
}
