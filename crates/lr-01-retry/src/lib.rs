//! # lr-01-retry
//!
//! Retry executor shielding callers from transient ledger failures.
//!
//! ## Overview
//!
//! - **Bounded**: at most `max_attempts` calls per operation
//! - **Classified**: validation and user-declined errors fail on the first
//!   attempt; transient errors (network, nonce) are retried
//! - **Exponential backoff**: `min(initial * factor^(attempt-1), max_delay)`
//!   between attempts, suspending only the retrying task
//!
//! ## Attempt Timeline (defaults)
//!
//! ```text
//! attempt 1 ──fail──→ sleep 1s ──→ attempt 2 ──fail──→ sleep 2s ──→ attempt 3 ──fail──→ Exhausted
//!     │                                │                                │
//!     └── non-retryable ──→ Aborted    └── ok ──→ RetryOutcome          └── ok ──→ RetryOutcome
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use lr_01_retry::{RetryExecutor, RetryPolicy};
//!
//! let executor = RetryExecutor::new(RetryPolicy::default());
//! let outcome = executor.execute(|| gateway.read(call.clone())).await?;
//! println!("{} after {} attempts", outcome.value, outcome.attempts);
//! ```

pub mod classify;
pub mod error;
pub mod executor;
pub mod policy;

pub use classify::Retryable;
pub use error::{PolicyError, RetryError};
pub use executor::{RetryContext, RetryExecutor, RetryObserver, RetryOutcome};
pub use policy::RetryPolicy;
