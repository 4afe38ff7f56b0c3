//! # Runtime Configuration
//!
//! Retry, cache and reward parameters for every guarded entity service.
//!
//! All values have defaults; `from_env` overrides them from `LR_*`
//! variables, and the whole structure also loads from JSON.

use lr_01_retry::{PolicyError, RetryPolicy};
use lr_02_entity_cache::{CacheConfig, CacheError};
use lr_04_metric_rewards::{RewardConfig, RewardError};
use serde::{Deserialize, Serialize};
use shared_types::EntityKind;
use std::env;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Node reward parameters.
pub type RewardSettings = RewardConfig;

/// Complete runtime configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Retry behaviour for every ledger call.
    pub retry: RetrySettings,
    /// Cache bounds per entity kind.
    pub cache: CacheSettings,
    /// Node reward calculation.
    pub rewards: RewardSettings,
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid retry settings: {0}")]
    Retry(#[from] PolicyError),

    #[error("Invalid {kind} cache settings: {source}")]
    Cache {
        kind: &'static str,
        #[source]
        source: CacheError,
    },

    #[error("Invalid reward settings: {0}")]
    Rewards(#[from] RewardError),

    #[error("Invalid value {value:?} for {var}")]
    Env { var: &'static str, value: String },

    #[error("Malformed configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

impl RuntimeConfig {
    /// Defaults overridden by environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `LR_RETRY_MAX_ATTEMPTS`, `LR_RETRY_INITIAL_DELAY_MS`, `LR_RETRY_MAX_DELAY_MS`
    /// - `LR_CACHE_TTL_MS`, `LR_CACHE_MAX_SIZE` (applied to every entity kind)
    /// - `LR_DISTRIBUTION_INTERVAL_MS`, `LR_TOTAL_SUPPLY`, `LR_ALLOCATION_BPS`
    ///
    /// # Errors
    ///
    /// `ConfigError::Env` for a value that does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_overrides(|var| env::var(var).ok())
    }

    /// Parse a JSON document, missing fields taking their defaults.
    ///
    /// # Errors
    ///
    /// `ConfigError::Parse` for malformed JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Apply overrides from `lookup`, which maps a variable name to its value.
    ///
    /// # Errors
    ///
    /// `ConfigError::Env` for a value that does not parse.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        if let Some(v) = parse_var(&lookup, "LR_RETRY_MAX_ATTEMPTS")? {
            self.retry.max_attempts = v;
        }
        if let Some(v) = parse_var(&lookup, "LR_RETRY_INITIAL_DELAY_MS")? {
            self.retry.initial_delay_ms = v;
        }
        if let Some(v) = parse_var(&lookup, "LR_RETRY_MAX_DELAY_MS")? {
            self.retry.max_delay_ms = v;
        }
        if let Some(v) = parse_var(&lookup, "LR_CACHE_TTL_MS")? {
            self.cache.for_each_mut(|limits| limits.ttl_ms = v);
        }
        if let Some(v) = parse_var(&lookup, "LR_CACHE_MAX_SIZE")? {
            self.cache.for_each_mut(|limits| limits.max_size = v);
        }
        if let Some(v) = parse_var(&lookup, "LR_DISTRIBUTION_INTERVAL_MS")? {
            self.rewards.distribution_interval_ms = v;
        }
        if let Some(v) = parse_var(&lookup, "LR_TOTAL_SUPPLY")? {
            self.rewards.total_supply = v;
        }
        if let Some(v) = parse_var(&lookup, "LR_ALLOCATION_BPS")? {
            self.rewards.allocation_bps = v;
        }
        Ok(self)
    }

    /// # Errors
    ///
    /// The first invalid section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.retry.policy().validate()?;
        for kind in [EntityKind::Domain, EntityKind::Idea, EntityKind::BackupRequest] {
            self.cache
                .for_kind(kind)
                .cache_config()
                .validate()
                .map_err(|source| ConfigError::Cache {
                    kind: kind.label(),
                    source,
                })?;
        }
        self.rewards.validate()?;
        Ok(())
    }
}

fn parse_var<T, F>(lookup: &F, var: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&'static str) -> Option<String>,
{
    match lookup(var) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Env { var, value }),
    }
}

/// Retry parameters, in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_factor: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 1000,
            max_delay_ms: 10_000,
            backoff_factor: 2.0,
        }
    }
}

impl RetrySettings {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::default()
            .with_max_attempts(self.max_attempts)
            .with_initial_delay(Duration::from_millis(self.initial_delay_ms))
            .with_max_delay(Duration::from_millis(self.max_delay_ms))
            .with_backoff_factor(self.backoff_factor)
    }
}

/// Size and lifetime of one entity cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheLimits {
    pub max_size: usize,
    pub ttl_ms: u64,
}

impl Default for CacheLimits {
    fn default() -> Self {
        Self {
            max_size: 100,
            ttl_ms: 60_000,
        }
    }
}

impl CacheLimits {
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig::new(self.max_size, Duration::from_millis(self.ttl_ms))
    }
}

/// Cache limits per entity kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub domains: CacheLimits,
    pub ideas: CacheLimits,
    pub backups: CacheLimits,
}

impl CacheSettings {
    /// Limits for `kind`. Node rewards have no entity cache and share the
    /// domain limits.
    pub fn for_kind(&self, kind: EntityKind) -> CacheLimits {
        match kind {
            EntityKind::Domain | EntityKind::NodeRewards => self.domains,
            EntityKind::Idea => self.ideas,
            EntityKind::BackupRequest => self.backups,
        }
    }

    fn for_each_mut(&mut self, mut apply: impl FnMut(&mut CacheLimits)) {
        apply(&mut self.domains);
        apply(&mut self.ideas);
        apply(&mut self.backups);
    }
}
