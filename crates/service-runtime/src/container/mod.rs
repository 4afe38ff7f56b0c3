//! # Service Container
//!
//! Central container holding every guarded entity service, built with
//! explicit constructor injection.

pub mod config;
pub mod services;

pub use config::{CacheLimits, CacheSettings, ConfigError, RetrySettings, RewardSettings, RuntimeConfig};
pub use services::{ContainerError, ServiceContainer};
