//! # Error Types
//!
//! The ledger error taxonomy. Every error a ledger adapter raises is one of
//! these variants, and every variant belongs to exactly one [`ErrorClass`].

use thiserror::Error;

/// Errors raised by the remote ledger or by the gateway in front of it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LedgerError {
    /// Transport failure (connection reset, timeout, unavailable node).
    #[error("Network error: {0}")]
    Network(String),

    /// The submitting account's nonce raced another transaction.
    #[error("Nonce conflict: {0}")]
    NonceConflict(String),

    /// The signer refused to approve the request.
    #[error("User declined the request")]
    UserDeclined,

    /// Input rejected before reaching the contract.
    #[error("Invalid parameter: {0}")]
    Validation(String),

    /// The contract reverted the transaction.
    #[error("Transaction reverted: {reason}")]
    Reverted { reason: String },

    /// Not enough balance or voting power for the call.
    #[error("Insufficient {resource}: need {required}, have {available}")]
    Insufficient {
        resource: String,
        required: u128,
        available: u128,
    },

    /// The ledger answered with a payload that does not decode.
    #[error("Malformed ledger response: {0}")]
    Decode(String),

    /// Anything the gateway could not classify more precisely.
    #[error("Ledger call failed: {0}")]
    Other(String),
}

/// Coarse classification driving retry decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Worth retrying: the same call may succeed later.
    Transient,
    /// Malformed input; retrying cannot help.
    Validation,
    /// The user said no; retrying would nag.
    UserDeclined,
    /// The ledger refused the call on its merits.
    RemoteRejection,
}

impl LedgerError {
    /// Classify this error.
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self {
            LedgerError::Network(_) | LedgerError::NonceConflict(_) | LedgerError::Other(_) => {
                ErrorClass::Transient
            }
            LedgerError::UserDeclined => ErrorClass::UserDeclined,
            LedgerError::Validation(_) => ErrorClass::Validation,
            LedgerError::Reverted { .. }
            | LedgerError::Insufficient { .. }
            | LedgerError::Decode(_) => ErrorClass::RemoteRejection,
        }
    }

    /// Whether the default retry classifier retries this error.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        self.class() == ErrorClass::Transient
    }

    /// Shorthand for a decode failure with context.
    pub fn decode(context: &str, err: impl std::fmt::Display) -> Self {
        LedgerError::Decode(format!("{context}: {err}"))
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        LedgerError::Decode(err.to_string())
    }
}

/// Result alias for ledger calls.
pub type LedgerResult<T> = Result<T, LedgerError>;
