//! Error types for the entity cache

use thiserror::Error;

/// Cache construction errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    /// `max_size` or `ttl` out of range.
    #[error("Invalid cache configuration: {reason}")]
    InvalidConfig { reason: String },
}

/// Result type for cache operations
pub type CacheResult<T> = Result<T, CacheError>;
