//! The retry loop.

use crate::classify::Retryable;
use crate::error::RetryError;
use crate::policy::RetryPolicy;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// State of one retry sequence. Lives only for a single `execute` call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetryContext {
    /// Attempt number that just failed (1-based).
    pub attempt: u32,
    /// Message of the most recent failure.
    pub last_error: Option<String>,
    /// Backoff slept so far, including the delay about to be taken.
    pub total_delay: Duration,
}

/// Callback invoked before every backoff sleep.
pub type RetryObserver = Arc<dyn Fn(&RetryContext) + Send + Sync>;

/// Successful result of a retried operation.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryOutcome<T> {
    pub value: T,
    /// Calls made, including the successful one.
    pub attempts: u32,
    /// Backoff slept before success.
    pub total_delay: Duration,
}

impl<T> RetryOutcome<T> {
    pub fn into_value(self) -> T {
        self.value
    }
}

/// Runs fallible async operations under a [`RetryPolicy`].
#[derive(Clone, Default)]
pub struct RetryExecutor {
    policy: RetryPolicy,
    observer: Option<RetryObserver>,
}

impl RetryExecutor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            observer: None,
        }
    }

    /// Attach a callback notified of every retry.
    #[must_use]
    pub fn with_observer(mut self, observer: RetryObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run `operation` with the executor's policy and the error's own
    /// [`Retryable`] classification.
    ///
    /// # Errors
    ///
    /// - `RetryError::Aborted` on the first non-retryable error
    /// - `RetryError::Exhausted` once every attempt failed
    pub async fn execute<T, E, F, Fut>(&self, operation: F) -> Result<RetryOutcome<T>, RetryError<E>>
    where
        E: Retryable + Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.execute_with(&self.policy, |e: &E| e.is_retryable(), operation)
            .await
    }

    /// Run `operation` with an explicit policy and classifier.
    ///
    /// # Errors
    ///
    /// Same as [`RetryExecutor::execute`].
    pub async fn execute_with<T, E, F, Fut, P>(
        &self,
        policy: &RetryPolicy,
        should_retry: P,
        mut operation: F,
    ) -> Result<RetryOutcome<T>, RetryError<E>>
    where
        E: Display,
        P: Fn(&E) -> bool,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let max_attempts = policy.effective_attempts();
        let mut ctx = RetryContext::default();

        loop {
            let attempt = ctx.attempt + 1;
            let error = match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(attempt, "Operation succeeded after retry");
                    }
                    return Ok(RetryOutcome {
                        value,
                        attempts: attempt,
                        total_delay: ctx.total_delay,
                    });
                }
                Err(error) => error,
            };

            if !should_retry(&error) {
                debug!(attempt, error = %error, "Non-retryable error, aborting");
                return Err(RetryError::Aborted {
                    attempts: attempt,
                    source: error,
                });
            }

            if attempt >= max_attempts {
                warn!(
                    attempts = attempt,
                    total_delay_ms = ctx.total_delay.as_millis() as u64,
                    error = %error,
                    "Retry attempts exhausted"
                );
                return Err(RetryError::Exhausted {
                    attempts: attempt,
                    total_delay: ctx.total_delay,
                    source: error,
                });
            }

            let delay = policy.delay_for(attempt);
            ctx.attempt = attempt;
            ctx.last_error = Some(error.to_string());
            ctx.total_delay += delay;

            debug!(
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Retrying after transient error"
            );
            if let Some(observer) = &self.observer {
                observer(&ctx);
            }

            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::RetryPolicy;
    use shared_types::LedgerError;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    fn counting_failure(
        calls: &AtomicU32,
        error: LedgerError,
    ) -> impl std::future::Future<Output = Result<u32, LedgerError>> {
        calls.fetch_add(1, Ordering::SeqCst);
        std::future::ready(Err(error))
    }

    #[tokio::test(start_paused = true)]
    async fn test_always_failing_uses_every_attempt() {
        let executor = RetryExecutor::new(RetryPolicy::default());
        let calls = AtomicU32::new(0);
        let start = Instant::now();

        let result = executor
            .execute(|| counting_failure(&calls, LedgerError::Network("down".into())))
            .await;

        let err = result.unwrap_err();
        assert!(err.is_exhausted());
        assert_eq!(err.attempts(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 1000ms + 2000ms of virtual time
        assert_eq!(start.elapsed(), Duration::from_millis(3000));
        assert_eq!(
            err.to_string(),
            "Retry exhausted after 3 attempts: Network error: down"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_elapsed_matches_capped_schedule() {
        let policy = RetryPolicy::default().with_max_attempts(6);
        let executor = RetryExecutor::new(policy.clone());
        let calls = AtomicU32::new(0);
        let start = Instant::now();

        let err = executor
            .execute(|| counting_failure(&calls, LedgerError::NonceConflict("nonce".into())))
            .await
            .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 6);
        // 1 + 2 + 4 + 8 + 10 (capped)
        assert_eq!(policy.total_backoff(), Duration::from_millis(25_000));
        assert_eq!(start.elapsed(), policy.total_backoff());
        match err {
            RetryError::Exhausted { total_delay, .. } => {
                assert_eq!(total_delay, Duration::from_millis(25_000))
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_called_once() {
        let executor = RetryExecutor::new(RetryPolicy::default().with_max_attempts(10));
        let calls = AtomicU32::new(0);
        let start = Instant::now();

        let err = executor
            .execute(|| counting_failure(&calls, LedgerError::UserDeclined))
            .await
            .unwrap_err();

        assert!(!err.is_exhausted());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(err.into_last_error(), LedgerError::UserDeclined);
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_classifier_never_retries() {
        let executor = RetryExecutor::default();
        let policy = RetryPolicy::default().with_max_attempts(7);
        let calls = AtomicU32::new(0);

        let err = executor
            .execute_with(
                &policy,
                |_: &LedgerError| false,
                || counting_failure(&calls, LedgerError::Network("down".into())),
            )
            .await
            .unwrap_err();

        assert_eq!(err.attempts(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_classifier_retries_rejections() {
        let executor = RetryExecutor::default();
        let policy = RetryPolicy::default().with_max_attempts(3);
        let calls = AtomicU32::new(0);
        let reverted = || LedgerError::Reverted {
            reason: "stale nonce".into(),
        };

        let err = executor
            .execute_with(
                &policy,
                |e: &LedgerError| matches!(e, LedgerError::Reverted { .. }),
                || counting_failure(&calls, reverted()),
            )
            .await
            .unwrap_err();

        assert!(err.is_exhausted());
        assert_eq!(err.attempts(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_attempt_policy() {
        let executor = RetryExecutor::new(RetryPolicy::no_retry());
        let calls = AtomicU32::new(0);

        let err = executor
            .execute(|| counting_failure(&calls, LedgerError::Network("down".into())))
            .await
            .unwrap_err();

        assert!(err.is_exhausted());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_transient_failures() {
        let executor = RetryExecutor::new(RetryPolicy::default());
        let calls = AtomicU32::new(0);

        let outcome = executor
            .execute(|| {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    if n < 3 {
                        Err(LedgerError::Network("flaky".into()))
                    } else {
                        Ok(n * 10)
                    }
                }
            })
            .await
            .unwrap();

        assert_eq!(outcome.value, 30);
        assert_eq!(outcome.attempts, 3);
        assert_eq!(outcome.total_delay, Duration::from_millis(3000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_observer_sees_each_retry() {
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);
        let executor = RetryExecutor::new(RetryPolicy::default())
            .with_observer(Arc::new(move |ctx: &RetryContext| {
                log.lock().unwrap().push(ctx.clone())
            }));

        let _ = executor
            .execute(|| std::future::ready(Err::<(), _>(LedgerError::Network("x".into()))))
            .await;

        let contexts = seen.lock().unwrap().clone();
        assert_eq!(contexts.len(), 2);
        assert_eq!(contexts[0].attempt, 1);
        assert_eq!(contexts[0].total_delay, Duration::from_millis(1000));
        assert_eq!(contexts[1].attempt, 2);
        assert_eq!(contexts[1].total_delay, Duration::from_millis(3000));
        assert_eq!(contexts[1].last_error.as_deref(), Some("Network error: x"));
    }
}
