//! The shape every entity state enum follows.

use std::fmt::{Debug, Display};
use std::hash::Hash;

/// One baseline (idle) state plus any number of busy states.
///
/// # Example
///
/// ```rust
/// use lr_03_entity_state::EntityState;
///
/// #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// enum IdeaState {
///     Registered,
///     Distributing,
///     Updating,
/// }
///
/// impl std::fmt::Display for IdeaState {
///     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
///         std::fmt::Debug::fmt(self, f)
///     }
/// }
///
/// impl EntityState for IdeaState {
///     const BASELINE: Self = IdeaState::Registered;
/// }
///
/// assert!(IdeaState::Distributing.is_busy());
/// assert!(!IdeaState::Registered.is_busy());
/// ```
pub trait EntityState: Copy + Eq + Hash + Debug + Display + Send + Sync + 'static {
    /// The idle state between mutating operations.
    const BASELINE: Self;

    /// Any state other than the baseline marks an operation in flight.
    fn is_busy(&self) -> bool {
        *self != Self::BASELINE
    }
}
