//! Error types for the event bridge

use shared_bus::{EventKind, SubscriptionId};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BridgeError {
    /// `off` was called with an id not registered for the kind.
    #[error("No listener {id} registered for {kind}")]
    UnknownListener { kind: EventKind, id: SubscriptionId },
}

/// Result type for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;
