//! Preference resolution and mutation engine.
//!
//! # Responsibility
//! - Resolve the effective preference for one tuple (cache-aside, default
//!   cascade, forced channels).
//! - Validate and persist single and bulk preference changes.
//! - Build the grouped preference table for presentation layers.
//!
//! # Invariants
//! - Forced channels always resolve enabled and are never written.
//! - Cache invalidation and change events happen only after the store commit.
//! - Read paths never fail on unknown notification types or channels.

pub mod events;
mod mutation;
mod resolution;
pub mod table;
pub mod user_scope;

use crate::cache::{CacheError, PreferenceCache};
use crate::config::provider::CatalogProvider;
use crate::config::Settings;
use crate::model::catalog::Catalog;
use crate::repo::preference_repo::{PreferenceRepository, RepoError};
use events::{ChangeNotifier, PreferenceSubscriber};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Duration;

pub type PreferenceResult<T> = Result<T, PreferenceError>;

/// Why a channel was rejected by write validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelRejection {
    NotRegistered,
    Disabled,
}

/// Errors from preference engine operations.
#[derive(Debug)]
pub enum PreferenceError {
    /// Notification type is not declared in the catalog.
    InvalidNotificationType(String),
    /// Channel is not declared, or is disabled, in the catalog.
    InvalidChannel {
        channel: String,
        reason: ChannelRejection,
    },
    /// Channel is forced for the notification type and cannot be set.
    ForcedChannel {
        notification_type: String,
        channel: String,
    },
    /// Preference store failure.
    Store(RepoError),
    /// Cache backend failure.
    Cache(CacheError),
}

impl Display for PreferenceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidNotificationType(notification_type) => write!(
                f,
                "notification type `{notification_type}` is not registered in the catalog"
            ),
            Self::InvalidChannel {
                channel,
                reason: ChannelRejection::NotRegistered,
            } => write!(f, "channel `{channel}` is not registered in the catalog"),
            Self::InvalidChannel {
                channel,
                reason: ChannelRejection::Disabled,
            } => write!(f, "channel `{channel}` is disabled in the catalog"),
            Self::ForcedChannel {
                notification_type,
                channel,
            } => write!(
                f,
                "channel `{channel}` is forced for `{notification_type}` and cannot be changed"
            ),
            Self::Store(err) => write!(f, "{err}"),
            Self::Cache(err) => write!(f, "{err}"),
        }
    }
}

impl Error for PreferenceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            Self::Cache(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for PreferenceError {
    fn from(value: RepoError) -> Self {
        Self::Store(value)
    }
}

impl From<CacheError> for PreferenceError {
    fn from(value: CacheError) -> Self {
        Self::Cache(value)
    }
}

/// Preference engine over a repository, a shared cache and a catalog source.
///
/// Cheap to build per connection: the cache and catalog provider are shared
/// handles, the repository is usually a borrowed connection wrapper.
pub struct PreferenceService<R: PreferenceRepository> {
    repo: R,
    cache: Arc<dyn PreferenceCache>,
    catalog: Arc<dyn CatalogProvider>,
    notifier: ChangeNotifier,
    cache_ttl: Duration,
}

impl<R: PreferenceRepository> PreferenceService<R> {
    /// Creates a service with default [`Settings`].
    pub fn new(
        repo: R,
        cache: Arc<dyn PreferenceCache>,
        catalog: Arc<dyn CatalogProvider>,
    ) -> Self {
        Self {
            repo,
            cache,
            catalog,
            notifier: ChangeNotifier::default(),
            cache_ttl: Settings::default().cache_ttl(),
        }
    }

    pub fn with_settings(mut self, settings: &Settings) -> Self {
        self.cache_ttl = settings.cache_ttl();
        self
    }

    /// Replaces the change notifier, e.g. to share subscribers across
    /// per-connection services.
    pub fn with_notifier(mut self, notifier: ChangeNotifier) -> Self {
        self.notifier = notifier;
        self
    }

    /// Registers a subscriber for post-commit change events.
    pub fn subscribe(&mut self, subscriber: Arc<dyn PreferenceSubscriber>) {
        self.notifier.subscribe(subscriber);
    }

    /// Current catalog snapshot.
    pub fn catalog(&self) -> Arc<Catalog> {
        self.catalog.current()
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }
}
