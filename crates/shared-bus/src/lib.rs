//! # Shared Bus - Ledger Event Delivery
//!
//! Transport-level delivery of decoded ledger events, as consumed by the
//! event bridge.
//!
//! ```text
//! ┌──────────────┐   publish()   ┌────────────────┐  handler(&event)  ┌──────────────┐
//! │ Ledger feed  │ ────────────→ │ InMemoryEventBus│ ────────────────→ │ EventBridge  │
//! └──────────────┘               └────────────────┘                   └──────────────┘
//! ```
//!
//! ## Delivery Guarantees
//!
//! - At-most-once: an event published with no handler registered is dropped
//! - Arrival order: publishes are serialized, one event fully dispatched
//!   before the next begins
//! - Typed: handlers register per [`EventKind`], never by string name

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod events;
pub mod publisher;
pub mod subscriber;

// Re-export main types
pub use events::{EventKind, LedgerEvent};
pub use publisher::{EventPublisher, InMemoryEventBus};
pub use subscriber::{EventHandler, HandlerRegistry, LedgerEventSource, SubscriptionId};
