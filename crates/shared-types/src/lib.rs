//! # Shared Types Crate
//!
//! Types every component of the ledger resilience layer agrees on.
//!
//! ## Contents
//!
//! - **Entities**: `EntityId`, `EntityKind`, `EntityRef`
//! - **Errors**: the `LedgerError` taxonomy and its retry classification
//! - **Time**: `Timestamp` and the `TimeSource` port (manual clock for tests)
//! - **Ledger**: the consumed "read value / submit mutation" gateway ports
//!
//! The remote ledger itself is an external collaborator. Nothing in this
//! crate talks to it; the traits here are the seam adapters plug into.

pub mod entities;
pub mod errors;
pub mod ledger;
pub mod time;

pub use entities::*;
pub use errors::*;
pub use ledger::{LedgerGateway, LedgerMutation, LedgerRead, PendingTransaction, TxReceipt};
pub use time::{SystemTimeSource, TimeSource, Timestamp};

#[cfg(any(test, feature = "test-util"))]
pub use time::MockTimeSource;
