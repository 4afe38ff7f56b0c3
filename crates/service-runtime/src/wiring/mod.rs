//! # Event Wiring
//!
//! Connects the entity services to the ledger event stream.
//!
//! ```text
//! Ledger ──event──→ EventBridge ──┬─→ invalidate(domain | idea | backup | pool cache)
//!                                 ├─→ observer: lr_events_bridged_total, lr_cache_invalidations_total
//!                                 └─→ listeners: track newly registered entities
//! ```
//!
//! Invalidation always completes before any listener runs, so a listener
//! reading the entity sees the post-event state.

pub mod event_routing;

pub use event_routing::EventRouting;
