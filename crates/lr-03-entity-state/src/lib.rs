//! # lr-03-entity-state
//!
//! Per-entity state machine serializing mutating operations.
//!
//! ## Overview
//!
//! Each entity category defines one baseline state and N busy states. A
//! mutating operation enters a busy state, runs, and returns the entity to
//! its baseline whether it succeeded or not.
//!
//! ```text
//!            try_begin(id, Updating)           guard dropped
//! [Registered] ───────────────────→ [Updating] ─────────────→ [Registered]
//!      │                                 │
//!      │                                 └── try_begin(id, Mapping) ──→ Err(Busy { state: Updating })
//!      │
//!  (absent) ── try_begin(id, _) ──→ Err(NotRegistered)
//! ```
//!
//! ## Guarantees
//!
//! - Busy states are mutually exclusive per id; unrelated ids never contend
//! - A rejected operation fails immediately, it never queues
//! - Release is tied to [`StateGuard`]'s `Drop`, so an error, an early
//!   return, or a dropped future all restore the baseline
//!
//! Exclusion is advisory and process-local, not a distributed lock.

pub mod error;
pub mod machine;
pub mod state;

pub use error::{StateError, StateResult};
pub use machine::{EntityStateMachine, StateGuard};
pub use state::EntityState;
