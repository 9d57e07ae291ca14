//! Cache configuration

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::CacheKey;
use crate::query::DataSourceQuery;

/// Function deriving a cache key from a query.
pub type CacheKeyFn = Arc<dyn Fn(&DataSourceQuery) -> String + Send + Sync>;

/// Configuration for response caching.
///
/// Caching is opt-in: the default config is disabled.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use datatable_lib::cache::CacheConfig;
///
/// let config = CacheConfig::enabled()
///     .with_ttl(Duration::from_secs(30))
///     .with_key_fn(|query| format!("{:?}", query.pagination));
/// assert!(config.enabled);
/// ```
#[derive(Clone)]
pub struct CacheConfig {
    /// Whether responses are cached at all.
    pub enabled: bool,

    /// How long a cached response stays valid.
    ///
    /// Default: 60 seconds
    pub ttl: Duration,

    /// Custom key derivation. When unset, the canonical query hash is used.
    pub key_fn: Option<CacheKeyFn>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            ttl: Duration::from_millis(60_000),
            key_fn: None,
        }
    }
}

impl CacheConfig {
    /// Creates an enabled config with the default TTL.
    pub fn enabled() -> Self {
        Self {
            enabled: true,
            ..Default::default()
        }
    }

    /// Creates a disabled config.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Sets the TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Sets a custom key function.
    pub fn with_key_fn<F>(mut self, key_fn: F) -> Self
    where
        F: Fn(&DataSourceQuery) -> String + Send + Sync + 'static,
    {
        self.key_fn = Some(Arc::new(key_fn));
        self
    }

    /// Computes the cache key for a query under this config.
    pub fn key_for(&self, query: &DataSourceQuery) -> CacheKey {
        match &self.key_fn {
            Some(key_fn) => CacheKey::new(key_fn(query)),
            None => CacheKey::from_query(query),
        }
    }
}

impl fmt::Debug for CacheConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheConfig")
            .field("enabled", &self.enabled)
            .field("ttl", &self.ttl)
            .field("key_fn", &self.key_fn.as_ref().map(|_| "<fn>"))
            .finish()
    }
}
