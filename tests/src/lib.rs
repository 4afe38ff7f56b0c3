//! # Ledger Resilience Test Suite
//!
//! Integration tests running the service container end to end over the
//! in-memory ledger and event bus.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── fixtures.rs     # Container builders, manual clock
//!     ├── flows.rs        # Entity lifecycles through the container
//!     ├── concurrency.rs  # Busy rejection, coalescing, scoped release
//!     └── events.rs       # Invalidation ordering, bridge composition
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p lr-tests
//! cargo test -p lr-tests integration::concurrency
//! ```

#![allow(dead_code)]

pub mod integration;
