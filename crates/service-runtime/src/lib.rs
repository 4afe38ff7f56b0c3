//! # Service Runtime Library
//!
//! Composition root of the ledger resilience layer: the guarded entity
//! services, the adapters they run on and the wiring to the ledger event
//! stream. The `main.rs` binary drives it against the in-memory ledger.
//!
//! ## Layout
//!
//! - `adapters/` - ledger gateway and metrics provider implementations
//! - `container/` - configuration and the service container
//! - `contracts` - contract names and call builders
//! - `services/` - guarded entity services per entity kind
//! - `wiring/` - event bridge invalidators and listeners
//!
//! ## Request Flow
//!
//! ```text
//! caller ──→ DomainService::update_domain(name, metadata)
//!              │ validate parameters
//!              │ EntityStateMachine::try_begin(name, Updating) ──busy──→ Err
//!              │ RetryExecutor(submit + wait) ──→ LedgerGateway
//!              │                                    └─ DomainUpdated ─→ EventBridge ─→ invalidate
//!              │ CoalescingLoader::invalidate + read
//!              └─ guard released
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod container;
pub mod contracts;
pub mod services;
pub mod wiring;

pub use container::{ContainerError, RuntimeConfig, ServiceContainer};
pub use services::{Confirmed, ServiceError, ServiceResult};
