//! Core preference resolution and mutation engine for notipref.
//! This crate is the single source of truth for forced-channel, default
//! cascade and cache-coherence invariants.

pub mod cache;
pub mod config;
pub mod db;
pub mod dispatch;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use cache::{
    CacheError, CacheResult, InMemoryPreferenceCache, PreferenceCache, PreferenceCacheKey,
};
pub use config::provider::{CatalogProvider, StaticCatalog, SwappableCatalog};
pub use config::{load_config_file, load_config_str, ConfigDocument, ConfigError, Settings};
pub use dispatch::{DispatchFilter, FilterMode};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::catalog::{
    Catalog, CatalogValidationError, ChannelConfig, DefaultPreference, GroupConfig,
    NotificationConfig, DEFAULT_ORDER, UNGROUPED,
};
pub use model::preference::{PreferenceEntry, PreferenceRecord, UpsertOutcome, UserId};
pub use repo::preference_repo::{
    PreferenceRepository, RepoError, RepoResult, SqlitePreferenceRepository,
};
pub use service::events::{ChangeNotifier, PreferenceChanged, PreferenceSubscriber};
pub use service::table::{ChannelPreferenceView, GroupView, NotificationView};
pub use service::user_scope::UserPreferences;
pub use service::{ChannelRejection, PreferenceError, PreferenceResult, PreferenceService};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
