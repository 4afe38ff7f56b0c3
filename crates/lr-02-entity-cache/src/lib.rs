//! # lr-02-entity-cache
//!
//! Time-to-live cache for locally observed ledger entity state.
//!
//! ## Overview
//!
//! - **Lazy expiry**: freshness is checked on access; there is no sweep task,
//!   so a manual clock fully controls expiry in tests
//! - **Bounded**: inserting a new id into a full cache evicts the entry with
//!   the oldest `stored_at`
//! - **Coalescing**: [`CoalescingLoader`] collapses concurrent misses for one
//!   id into a single underlying fetch
//!
//! ```text
//! get_or_load(id)
//!     │
//!     ├── fresh entry ─────────────────────────→ value
//!     ├── fetch already running for id ─ join ─→ shared result
//!     └── miss ─ start fetch ─ ok ─ set(id) ───→ value
//!                            └─ err ───────────→ error (nothing cached)
//! ```

pub mod cache;
pub mod coalesce;
pub mod config;
pub mod error;

pub use cache::{CacheEntry, CacheStats, EntityCache};
pub use coalesce::{CoalescingLoader, LoadSource};
pub use config::CacheConfig;
pub use error::{CacheError, CacheResult};
