//! In-memory response cache backed by DashMap

use std::time::Duration;

use dashmap::DashMap;
use log::trace;

use super::CacheEntry;
use super::CacheKey;
use crate::response::DataSourceResponse;

/// An in-memory TTL cache of responses.
///
/// Concurrent cold misses for the same key are not deduplicated: both
/// callers fetch and the last insert wins.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use datatable_lib::cache::{CacheKey, ResponseCache};
/// use datatable_lib::DataSourceResponse;
///
/// let cache = ResponseCache::new(Duration::from_secs(60));
/// let key = CacheKey::new("all");
/// cache.insert(key.clone(), DataSourceResponse::new(vec![1, 2, 3], 3));
/// assert_eq!(cache.get(&key).unwrap().data.total, 3);
/// ```
#[derive(Debug)]
pub struct ResponseCache<T> {
    store: DashMap<CacheKey, CacheEntry<T>>,
    ttl: Duration,
}

impl<T: Clone> ResponseCache<T> {
    /// Creates an empty cache whose entries live for `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            store: DashMap::new(),
            ttl,
        }
    }

    /// Returns the entry for `key` if present and not expired.
    ///
    /// Expired entries are removed on access.
    pub fn get(&self, key: &CacheKey) -> Option<CacheEntry<T>> {
        let entry = self.store.get(key)?;

        if entry.is_expired() {
            drop(entry);
            self.store.remove(key);
            trace!("cache entry {} expired", key);
            None
        } else {
            Some(entry.value().clone())
        }
    }

    /// Stores a response under `key`, replacing any previous entry.
    pub fn insert(&self, key: CacheKey, response: DataSourceResponse<T>) -> CacheEntry<T> {
        let entry = CacheEntry::new(response, self.ttl);
        self.store.insert(key, entry.clone());
        entry
    }

    /// Removes one entry.
    pub fn invalidate(&self, key: &CacheKey) {
        self.store.remove(key);
    }

    /// Removes every entry.
    pub fn clear(&self) {
        self.store.clear();
    }

    /// Removes all expired entries, returning how many were dropped.
    pub fn gc(&self) -> usize {
        let mut removed = 0;
        self.store.retain(|_, entry| {
            if entry.is_expired() {
                removed += 1;
                false
            } else {
                true
            }
        });
        removed
    }

    /// Returns the number of entries (including expired ones).
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Returns `true` if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Configured TTL.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}
