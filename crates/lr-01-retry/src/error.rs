//! Error types for the retry executor

use std::time::Duration;
use thiserror::Error;

/// Terminal failure of a retried operation.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RetryError<E> {
    /// Every permitted attempt failed with a retryable error.
    #[error("Retry exhausted after {attempts} attempts: {source}")]
    Exhausted {
        attempts: u32,
        total_delay: Duration,
        #[source]
        source: E,
    },

    /// The classifier refused to retry; `source` is the error as raised.
    #[error("{source}")]
    Aborted {
        attempts: u32,
        #[source]
        source: E,
    },
}

impl<E> RetryError<E> {
    /// Number of calls made before giving up.
    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::Exhausted { attempts, .. } | RetryError::Aborted { attempts, .. } => {
                *attempts
            }
        }
    }

    /// Whether the failure came from running out of attempts.
    pub fn is_exhausted(&self) -> bool {
        matches!(self, RetryError::Exhausted { .. })
    }

    /// The last underlying error.
    pub fn last_error(&self) -> &E {
        match self {
            RetryError::Exhausted { source, .. } | RetryError::Aborted { source, .. } => source,
        }
    }

    /// Consume and return the last underlying error.
    pub fn into_last_error(self) -> E {
        match self {
            RetryError::Exhausted { source, .. } | RetryError::Aborted { source, .. } => source,
        }
    }
}

/// Invalid retry policy parameters.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PolicyError {
    #[error("max_attempts must be at least 1")]
    ZeroAttempts,

    #[error("backoff_factor must be a finite value >= 1.0, got {0}")]
    InvalidBackoffFactor(f64),

    #[error("max_delay ({max:?}) is shorter than initial_delay ({initial:?})")]
    DelayOrder { initial: Duration, max: Duration },
}
