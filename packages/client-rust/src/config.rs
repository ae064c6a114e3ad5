use std::time::Duration;

use cachelock_core::lock::{DEFAULT_CACHE_KEY_PREFIX, DEFAULT_LOCK_EXPIRATION};
use cachelock_core::LockProtocol;
use serde::Deserialize;

/// Client-level configuration for the write path.
///
/// Every field has a default, so a partial JSON document is enough to
/// override one setting.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Prefix of every cache slot this client writes.
    pub cache_key_prefix: String,
    /// Lifetime of a lock item whose writer never removes it, in seconds.
    pub lock_expiration_secs: u64,
    /// Upper bound on keys per store call. `None` uses the store's own limit;
    /// a value can only lower it.
    pub max_batch_size: Option<usize>,
    /// Deadline applied to every write, in milliseconds. `None` = no deadline
    /// beyond the caller's context.
    pub write_timeout_ms: Option<u64>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            cache_key_prefix: DEFAULT_CACHE_KEY_PREFIX.to_string(),
            lock_expiration_secs: DEFAULT_LOCK_EXPIRATION.as_secs(),
            max_batch_size: None,
            write_timeout_ms: None,
        }
    }
}

/// Rejected configuration values.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("max_batch_size must be positive")]
    ZeroBatchSize,
    #[error("cache_key_prefix must not be empty")]
    EmptyPrefix,
    #[error("invalid config document: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ClientConfig {
    /// Parses a JSON document and validates it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the document is malformed or a value is out of range.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns [`ConfigError`] for a zero batch size or an empty prefix.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_batch_size == Some(0) {
            return Err(ConfigError::ZeroBatchSize);
        }
        if self.cache_key_prefix.is_empty() {
            return Err(ConfigError::EmptyPrefix);
        }
        Ok(())
    }

    /// Lock protocol described by this config.
    #[must_use]
    pub fn lock_protocol(&self) -> LockProtocol {
        LockProtocol::new(
            self.cache_key_prefix.clone(),
            Duration::from_secs(self.lock_expiration_secs),
        )
    }

    /// Keys per store call given the store's own limit.
    #[must_use]
    pub fn effective_batch_size(&self, store_limit: usize) -> usize {
        self.max_batch_size
            .map_or(store_limit, |max| max.min(store_limit))
            .max(1)
    }

    #[must_use]
    pub fn write_timeout(&self) -> Option<Duration> {
        self.write_timeout_ms.map(Duration::from_millis)
    }
}
