//! Error surface of the guarded entity services.

use lr_01_retry::RetryError;
use lr_03_entity_state::StateError;
use lr_04_metric_rewards::RewardError;
use shared_types::{LedgerError, TxReceipt};
use thiserror::Error;

/// Errors raised by entity services.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ServiceError {
    /// Rejected before any remote call.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Entity busy or not registered; rejected before any remote call.
    #[error(transparent)]
    State(#[from] StateError),

    /// A transient failure persisted through every attempt.
    #[error("Retry exhausted after {attempts} attempts: {source}")]
    RetryExhausted {
        attempts: u32,
        #[source]
        source: LedgerError,
    },

    /// A non-retryable ledger failure, propagated as-is.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// The write is final but re-reading the entity afterwards failed.
    #[error("Transaction {} confirmed but refresh failed: {source}", .receipt.tx_id)]
    RefreshFailed {
        receipt: TxReceipt,
        #[source]
        source: Box<ServiceError>,
    },

    #[error(transparent)]
    Reward(#[from] RewardError),
}

impl ServiceError {
    /// Short label used as the `error_type` metric dimension.
    pub fn label(&self) -> &'static str {
        match self {
            ServiceError::InvalidParameter(_) => "invalid_parameter",
            ServiceError::State(StateError::Busy { .. }) => "busy",
            ServiceError::State(StateError::NotRegistered { .. }) => "not_registered",
            ServiceError::State(_) => "state",
            ServiceError::RetryExhausted { .. } => "retry_exhausted",
            ServiceError::Ledger(_) => "ledger",
            ServiceError::RefreshFailed { .. } => "refresh_failed",
            ServiceError::Reward(_) => "reward",
        }
    }

    pub fn is_busy(&self) -> bool {
        matches!(self, ServiceError::State(e) if e.is_busy())
    }

    /// Receipt of a write that landed despite the error.
    pub fn confirmed_receipt(&self) -> Option<&TxReceipt> {
        match self {
            ServiceError::RefreshFailed { receipt, .. } => Some(receipt),
            _ => None,
        }
    }
}

impl From<RetryError<LedgerError>> for ServiceError {
    fn from(err: RetryError<LedgerError>) -> Self {
        match err {
            RetryError::Exhausted {
                attempts, source, ..
            } => ServiceError::RetryExhausted { attempts, source },
            RetryError::Aborted { source, .. } => ServiceError::Ledger(source),
        }
    }
}

/// Result type for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;
