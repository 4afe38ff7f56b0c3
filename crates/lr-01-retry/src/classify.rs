//! Error classification for retry decisions.

use shared_types::LedgerError;

/// Errors that know whether retrying them can help.
pub trait Retryable {
    /// `true` if the same call may succeed on a later attempt.
    fn is_retryable(&self) -> bool;
}

/// Default classification: only transient ledger errors are retried.
///
/// User-declined and validation errors fail immediately, and so do
/// contract rejections, which would be refused again.
impl Retryable for LedgerError {
    fn is_retryable(&self) -> bool {
        self.is_transient()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ledger_error_classification() {
        assert!(LedgerError::Network("timeout".into()).is_retryable());
        assert!(LedgerError::NonceConflict("replacement underpriced".into()).is_retryable());
        assert!(!LedgerError::UserDeclined.is_retryable());
        assert!(!LedgerError::Validation("empty name".into()).is_retryable());
        assert!(!LedgerError::Reverted {
            reason: "domain taken".into()
        }
        .is_retryable());
    }
}
