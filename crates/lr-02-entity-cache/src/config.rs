//! Cache sizing and lifetime.

use crate::error::{CacheError, CacheResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Constructor parameters for an [`EntityCache`](crate::EntityCache).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of entries held at once. Must be > 0.
    pub max_size: usize,
    /// Maximum age at which an entry is still served. Must be at least 1ms.
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size: 100,
            ttl: Duration::from_secs(60),
        }
    }
}

impl CacheConfig {
    pub fn new(max_size: usize, ttl: Duration) -> Self {
        Self { max_size, ttl }
    }

    /// # Errors
    ///
    /// `CacheError::InvalidConfig` if `max_size` is zero or `ttl` is below
    /// the millisecond resolution of timestamps.
    pub fn validate(&self) -> CacheResult<()> {
        if self.max_size == 0 {
            return Err(CacheError::InvalidConfig {
                reason: "max_size must be greater than 0".to_string(),
            });
        }
        if self.ttl < Duration::from_millis(1) {
            return Err(CacheError::InvalidConfig {
                reason: "ttl must be at least 1ms".to_string(),
            });
        }
        Ok(())
    }

    /// TTL in milliseconds, the unit timestamps are kept in.
    #[must_use]
    pub fn ttl_ms(&self) -> u64 {
        u64::try_from(self.ttl.as_millis()).unwrap_or(u64::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate() {
        assert!(CacheConfig::default().validate().is_ok());
        assert!(CacheConfig::new(0, Duration::from_secs(1)).validate().is_err());
        assert!(CacheConfig::new(1, Duration::ZERO).validate().is_err());
    }

    #[test]
    fn test_validate_rejects_sub_millisecond_ttl() {
        let config = CacheConfig::new(1, Duration::from_micros(999));
        assert_eq!(config.ttl_ms(), 0);
        assert!(matches!(
            config.validate(),
            Err(CacheError::InvalidConfig { .. })
        ));
        assert!(CacheConfig::new(1, Duration::from_millis(1)).validate().is_ok());
    }

    #[test]
    fn test_ttl_ms() {
        assert_eq!(CacheConfig::new(1, Duration::from_secs(60)).ttl_ms(), 60_000);
        assert_eq!(CacheConfig::new(1, Duration::MAX).ttl_ms(), u64::MAX);
    }
}
