//! Per-user preference records.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Opaque identity of the user a preference belongs to.
///
/// Authentication lives outside this crate; numeric ids are stored in their
/// decimal form so `UserId::from(42)` and `UserId::from("42")` are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for UserId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<i64> for UserId {
    fn from(value: i64) -> Self {
        Self(value.to_string())
    }
}

impl From<u64> for UserId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

/// Explicit preference persisted for one `(user, notification_type, channel)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferenceRecord {
    /// Store-assigned row id.
    pub id: i64,
    pub user_id: UserId,
    pub notification_type: String,
    pub channel: String,
    pub enabled: bool,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    /// Unix epoch milliseconds. Bumped on every upsert.
    pub updated_at: i64,
}

/// Flat projection returned by `PreferenceService::get_preferences_for_user`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferenceEntry {
    pub notification_type: String,
    pub channel: String,
    pub enabled: bool,
}

impl From<&PreferenceRecord> for PreferenceEntry {
    fn from(record: &PreferenceRecord) -> Self {
        Self {
            notification_type: record.notification_type.clone(),
            channel: record.channel.clone(),
            enabled: record.enabled,
        }
    }
}

/// Result of one upsert: the stored row and whether it was newly inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertOutcome {
    pub record: PreferenceRecord,
    pub was_created: bool,
}
