//! In-process TTL cache bounded by LRU eviction.

use super::{CacheResult, PreferenceCache, PreferenceCacheKey};
use crate::config::Settings;
use log::warn;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

// Clamp for TTLs that would overflow `Instant`.
const MAX_TTL: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

#[derive(Debug, Clone, Copy)]
struct CacheEntry {
    value: bool,
    expires_at: Instant,
}

/// Thread-safe cache shared by every engine instance of one process.
///
/// `get` refreshes recency, so all access goes through one mutex.
pub struct InMemoryPreferenceCache {
    entries: Mutex<LruCache<PreferenceCacheKey, CacheEntry>>,
}

impl InMemoryPreferenceCache {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.cache_capacity_non_zero())
    }

    /// Number of stored entries, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.lock("len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.lock("clear").clear();
    }

    fn lock(&self, op: &'static str) -> MutexGuard<'_, LruCache<PreferenceCacheKey, CacheEntry>> {
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!(
                    "event=cache_lock module=cache status=poisoned_recovered op={op}"
                );
                poisoned.into_inner()
            }
        }
    }
}

impl PreferenceCache for InMemoryPreferenceCache {
    fn get(&self, key: &PreferenceCacheKey) -> CacheResult<Option<bool>> {
        let mut entries = self.lock("get");
        let Some(entry) = entries.get(key).copied() else {
            return Ok(None);
        };

        if entry.expires_at <= Instant::now() {
            entries.pop(key);
            return Ok(None);
        }

        Ok(Some(entry.value))
    }

    fn set(&self, key: &PreferenceCacheKey, value: bool, ttl: Duration) -> CacheResult<()> {
        let now = Instant::now();
        let expires_at = now.checked_add(ttl.min(MAX_TTL)).unwrap_or(now);
        self.lock("set")
            .put(key.clone(), CacheEntry { value, expires_at });
        Ok(())
    }

    fn delete(&self, key: &PreferenceCacheKey) -> CacheResult<()> {
        self.lock("delete").pop(key);
        Ok(())
    }
}
