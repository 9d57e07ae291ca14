//! Response caching
//!
//! Provides [`CacheKey`], [`CacheEntry`] and the in-memory
//! [`ResponseCache`] used by [`BaseDataSource`](crate::source::BaseDataSource)
//! to avoid re-fetching identical queries within a TTL.

mod config;
mod key;
mod memory;

pub use config::*;
pub use key::*;
pub use memory::*;

use std::time::Duration;

use chrono::DateTime;
use chrono::Utc;
use tokio::time::Instant;

use crate::response::DataSourceResponse;

/// A cached response together with when it was stored.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    /// The cached response.
    pub data: DataSourceResponse<T>,
    /// Monotonic store time, used for expiry.
    pub stored_at: Instant,
    /// Wall-clock store time, reported to callers.
    pub cached_at: DateTime<Utc>,
    /// Lifetime of this entry.
    pub ttl: Duration,
}

impl<T> CacheEntry<T> {
    /// Creates an entry stored now.
    pub fn new(data: DataSourceResponse<T>, ttl: Duration) -> Self {
        Self {
            data,
            stored_at: Instant::now(),
            cached_at: Utc::now(),
            ttl,
        }
    }

    /// Wall-clock time at which the entry expires, saturating at the
    /// latest representable instant.
    pub fn expires_at(&self) -> DateTime<Utc> {
        chrono::Duration::from_std(self.ttl)
            .ok()
            .and_then(|ttl| self.cached_at.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Returns `true` once `now - stored_at` has reached the TTL.
    pub fn is_expired(&self) -> bool {
        self.stored_at.elapsed() >= self.ttl
    }
}
