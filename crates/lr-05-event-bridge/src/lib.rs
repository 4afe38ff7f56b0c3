//! # lr-05-event-bridge
//!
//! Bridges upstream ledger events to in-process listeners.
//!
//! ## Delivery
//!
//! ```text
//! upstream source ──event──→ EventBridge
//!                              │ 1. invalidate cache entries for event.entity()
//!                              │ 2. fan out to listeners of event.kind(), in registration order
//!                              ↓
//!                         listeners (on / off)
//! ```
//!
//! Invalidation always completes before the first listener runs, so a
//! listener that re-reads the entity observes a cache miss.
//!
//! The bridge subscribes upstream once per event kind: when the first
//! listener of that kind arrives, or when an invalidator for the kind's
//! entity is registered. It implements [`LedgerEventSource`] itself, so
//! bridges can be stacked.
//!
//! [`LedgerEventSource`]: shared_bus::LedgerEventSource

pub mod bridge;
pub mod error;
pub mod invalidate;

pub use bridge::{BridgeObserver, EventBridge, ListenerId};
pub use error::{BridgeError, BridgeResult};
pub use invalidate::{CacheInvalidator, InvalidationTarget, KeyedInvalidator};
