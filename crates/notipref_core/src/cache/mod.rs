//! Read-through cache contract for resolved preferences.
//!
//! # Responsibility
//! - Define the key/value contract the engine uses for cache-aside reads.
//! - Provide an in-process implementation for single-node deployments.
//!
//! # Invariants
//! - The cache holds no authoritative state; every entry is derivable from
//!   the preference store plus the catalog.
//! - Entries expire after the TTL given at `set` time even if an
//!   invalidation is missed.

mod memory;

pub use memory::InMemoryPreferenceCache;

use crate::model::preference::UserId;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Duration;

const CACHE_KEY_PREFIX: &str = "notification_prefs";

pub type CacheResult<T> = Result<T, CacheError>;

/// Failure reported by a cache backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheError {
    pub op: &'static str,
    pub message: String,
}

impl CacheError {
    pub fn new(op: &'static str, message: impl Into<String>) -> Self {
        Self {
            op,
            message: message.into(),
        }
    }
}

impl Display for CacheError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "cache {} failed: {}", self.op, self.message)
    }
}

impl Error for CacheError {}

/// Cache key for one `(user, notification_type, channel)` tuple.
///
/// Structured rather than a joined string, so keys whose parts contain the
/// separator never collide. `Display` renders the flat form for backends
/// that need string keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PreferenceCacheKey {
    pub user_id: UserId,
    pub notification_type: String,
    pub channel: String,
}

impl PreferenceCacheKey {
    pub fn new(user_id: &UserId, notification_type: &str, channel: &str) -> Self {
        Self {
            user_id: user_id.clone(),
            notification_type: notification_type.to_string(),
            channel: channel.to_string(),
        }
    }
}

impl Display for PreferenceCacheKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{CACHE_KEY_PREFIX}.{}.{}.{}",
            self.user_id, self.notification_type, self.channel
        )
    }
}

/// TTL key/value cache of resolved booleans.
pub trait PreferenceCache: Send + Sync {
    fn get(&self, key: &PreferenceCacheKey) -> CacheResult<Option<bool>>;
    fn set(&self, key: &PreferenceCacheKey, value: bool, ttl: Duration) -> CacheResult<()>;
    fn delete(&self, key: &PreferenceCacheKey) -> CacheResult<()>;
}

impl<C: PreferenceCache + ?Sized> PreferenceCache for Arc<C> {
    fn get(&self, key: &PreferenceCacheKey) -> CacheResult<Option<bool>> {
        (**self).get(key)
    }

    fn set(&self, key: &PreferenceCacheKey, value: bool, ttl: Duration) -> CacheResult<()> {
        (**self).set(key, value, ttl)
    }

    fn delete(&self, key: &PreferenceCacheKey) -> CacheResult<()> {
        (**self).delete(key)
    }
}
