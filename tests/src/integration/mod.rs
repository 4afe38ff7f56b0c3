//! Cross-component flows through the service container.

pub mod concurrency;
pub mod events;
pub mod fixtures;
pub mod flows;
