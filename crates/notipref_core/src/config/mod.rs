//! Catalog document loading and engine settings.
//!
//! # Responsibility
//! - Parse the JSON configuration document (catalog plus optional `settings`).
//! - Validate the catalog before it reaches the engine.
//!
//! # Invariants
//! - A document that fails `Catalog::validate()` is never returned.
//! - Missing `settings` fall back to [`Settings::default`].

pub mod provider;

use crate::model::catalog::{Catalog, CatalogValidationError};
use log::{error, info};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_CACHE_TTL_SECS: u64 = 24 * 60 * 60;
const DEFAULT_CACHE_CAPACITY: usize = 10_000;

/// Engine tuning knobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Upper bound on cache staleness if an invalidation is ever missed.
    pub cache_ttl_secs: u64,
    /// Maximum number of cached `(user, type, channel)` entries.
    pub cache_capacity: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl Settings {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Capacity as required by the LRU backend; zero is treated as one.
    pub fn cache_capacity_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.cache_capacity).unwrap_or(NonZeroUsize::MIN)
    }
}

/// Top-level configuration document.
///
/// Catalog keys (`channels`, `notifications`, `groups`,
/// `default_preference`) sit at the document root next to `settings`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigDocument {
    #[serde(flatten)]
    pub catalog: Catalog,
    #[serde(default)]
    pub settings: Settings,
}

/// Configuration loading errors.
#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse(serde_json::Error),
    Invalid(CatalogValidationError),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "malformed config document: {err}"),
            Self::Invalid(err) => write!(f, "invalid catalog: {err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Invalid(err) => Some(err),
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

impl From<CatalogValidationError> for ConfigError {
    fn from(value: CatalogValidationError) -> Self {
        Self::Invalid(value)
    }
}

/// Parses and validates a configuration document from JSON text.
pub fn load_config_str(json: &str) -> Result<ConfigDocument, ConfigError> {
    let document: ConfigDocument = serde_json::from_str(json)?;
    document.catalog.validate()?;
    Ok(document)
}

/// Reads, parses and validates a configuration document from disk.
pub fn load_config_file(path: impl AsRef<Path>) -> Result<ConfigDocument, ConfigError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    match load_config_str(&text) {
        Ok(document) => {
            info!(
                "event=config_load module=config status=ok path={} channels={} notifications={} groups={}",
                path.display(),
                document.catalog.channels.len(),
                document.catalog.notifications.len(),
                document.catalog.groups.len()
            );
            Ok(document)
        }
        Err(err) => {
            error!(
                "event=config_load module=config status=error path={} error={err}",
                path.display()
            );
            Err(err)
        }
    }
}
