//! Reference cache configuration.
//!
//! Defaults match production behavior: a 24-hour TTL, 1,000-row pages, and
//! a one-minute pause before retrying a failed refresh. Override via
//! environment variables or explicit construction.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default snapshot time-to-live.
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);
/// Default store page size.
pub const DEFAULT_PAGE_SIZE: usize = 1_000;
/// Default ceiling on pages per bulk load.
pub const DEFAULT_MAX_PAGES: usize = 10_000;
/// Default pause after a failed refresh before the store is asked again.
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_secs(60);

/// Tuning for [`ReferenceCache`](crate::ReferenceCache).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Age after which a snapshot is refreshed on the next read.
    #[serde(with = "duration_secs")]
    pub ttl: Duration,
    /// Rows requested per store page.
    pub page_size: usize,
    /// Safety bound on pages per bulk load.
    pub max_pages: usize,
    /// While a stale snapshot is being served after a failed refresh, the
    /// store is not asked again until this much time has passed (unless the
    /// dataset is invalidated).
    #[serde(with = "duration_secs")]
    pub retry_backoff: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            page_size: DEFAULT_PAGE_SIZE,
            max_pages: DEFAULT_MAX_PAGES,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
        }
    }
}

impl CacheConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `LABELCHECK_CACHE_TTL_SECS` (default: 86400)
    /// - `LABELCHECK_PAGE_SIZE` (default: 1000, must be > 0)
    /// - `LABELCHECK_MAX_PAGES` (default: 10000, must be > 0)
    /// - `LABELCHECK_RETRY_BACKOFF_SECS` (default: 60)
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let config = Self {
            ttl: env_parse("LABELCHECK_CACHE_TTL_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.ttl),
            page_size: env_parse("LABELCHECK_PAGE_SIZE")?.unwrap_or(defaults.page_size),
            max_pages: env_parse("LABELCHECK_MAX_PAGES")?.unwrap_or(defaults.max_pages),
            retry_backoff: env_parse("LABELCHECK_RETRY_BACKOFF_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.retry_backoff),
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject values the pagination loop cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.page_size == 0 {
            return Err(ConfigError::OutOfRange {
                key: "page_size".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.max_pages == 0 {
            return Err(ConfigError::OutOfRange {
                key: "max_pages".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

/// Read and parse an optional environment variable.
pub fn env_parse<T: std::str::FromStr>(var: &str) -> Result<Option<T>, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                key: var.to_string(),
                value: raw,
            }),
        Err(_) => Ok(None),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },
    #[error("{key} {reason}")]
    OutOfRange { key: String, reason: String },
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
