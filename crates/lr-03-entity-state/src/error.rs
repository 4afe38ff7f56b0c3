//! Error types for the entity state machine

use thiserror::Error;

/// State-conflict errors, raised before any remote call is made.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StateError {
    /// Another mutating operation on the entity is in flight.
    #[error("Entity {id} is busy, currently in state {state}")]
    Busy { id: String, state: String },

    /// No state recorded for the entity.
    #[error("Entity {id} is not registered")]
    NotRegistered { id: String },

    /// A registration raced an existing entity.
    #[error("Entity {id} is already registered")]
    AlreadyRegistered { id: String },

    /// The entity is idle but not in the state the caller requires.
    #[error("Entity {id} is in state {actual}, expected {expected}")]
    UnexpectedState {
        id: String,
        expected: String,
        actual: String,
    },

    /// The caller asked to enter the baseline as if it were a busy state.
    #[error("State {state} is not a busy state")]
    NotABusyState { state: String },
}

impl StateError {
    /// Whether this is the "entity busy" conflict.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        matches!(self, StateError::Busy { .. })
    }
}

/// Result type for state machine operations
pub type StateResult<T> = Result<T, StateError>;
