//! Notification catalog declaration, validation and default cascade.
//!
//! # Responsibility
//! - Declare channels, notification types and groups as plain data.
//! - Compute the default preference for a `(notification_type, channel)`
//!   pair when no explicit record exists.
//!
//! # Invariants
//! - Default precedence: notification `default_channels`, then notification
//!   `default_preference`, then the declared group's `default_preference`,
//!   then the catalog-wide `default_preference`.
//! - A notification without a declared group belongs to [`UNGROUPED`] for
//!   listing and bulk writes, but skips the group level of the cascade.
//! - Unknown notification types resolve through the catalog-wide default.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Group key assigned to notifications that do not declare one.
pub const UNGROUPED: &str = "ungrouped";
/// Sort position for groups and notifications without an explicit `order`.
pub const DEFAULT_ORDER: i64 = 999;

/// Policy applied when no explicit preference exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultPreference {
    /// Channel is enabled until the user turns it off.
    #[default]
    OptIn,
    /// Channel is disabled until the user turns it on.
    OptOut,
}

impl DefaultPreference {
    pub fn is_enabled(self) -> bool {
        self == Self::OptIn
    }
}

/// Delivery channel declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub label: String,
    /// Disabled channels are hidden from tables, bulk writes and validation.
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

impl ChannelConfig {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            enabled: true,
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

fn enabled_by_default() -> bool {
    true
}

/// Notification type declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    /// Channels that are always enabled and never user controllable.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub force_channels: Vec<String>,
    /// When set, exactly these channels are enabled by default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_channels: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_preference: Option<DefaultPreference>,
}

impl NotificationConfig {
    pub fn in_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_order(mut self, order: i64) -> Self {
        self.order = Some(order);
        self
    }

    pub fn forcing<I, S>(mut self, channels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.force_channels = channels.into_iter().map(Into::into).collect();
        self
    }

    pub fn defaulting_to<I, S>(mut self, channels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.default_channels = Some(channels.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_default_preference(mut self, preference: DefaultPreference) -> Self {
        self.default_preference = Some(preference);
        self
    }

    /// Declared group, or [`UNGROUPED`].
    pub fn effective_group(&self) -> &str {
        self.group.as_deref().unwrap_or(UNGROUPED)
    }

    pub fn effective_order(&self) -> i64 {
        self.order.unwrap_or(DEFAULT_ORDER)
    }

    pub fn forces(&self, channel: &str) -> bool {
        self.force_channels.iter().any(|forced| forced == channel)
    }
}

/// Notification group declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    /// Inherited by member notifications without their own default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_preference: Option<DefaultPreference>,
}

impl GroupConfig {
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_order(mut self, order: i64) -> Self {
        self.order = Some(order);
        self
    }

    pub fn with_default_preference(mut self, preference: DefaultPreference) -> Self {
        self.default_preference = Some(preference);
        self
    }

    pub fn effective_order(&self) -> i64 {
        self.order.unwrap_or(DEFAULT_ORDER)
    }
}

/// Read-only catalog of channels, notification types and groups.
///
/// Maps are key-ordered, so every iteration over the catalog is
/// deterministic regardless of declaration order in the source document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Catalog {
    pub channels: BTreeMap<String, ChannelConfig>,
    pub notifications: BTreeMap<String, NotificationConfig>,
    pub groups: BTreeMap<String, GroupConfig>,
    /// Catalog-wide fallback; opt-in unless configured otherwise.
    pub default_preference: DefaultPreference,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_channel(mut self, key: impl Into<String>, channel: ChannelConfig) -> Self {
        self.channels.insert(key.into(), channel);
        self
    }

    pub fn with_notification(
        mut self,
        key: impl Into<String>,
        notification: NotificationConfig,
    ) -> Self {
        self.notifications.insert(key.into(), notification);
        self
    }

    pub fn with_group(mut self, key: impl Into<String>, group: GroupConfig) -> Self {
        self.groups.insert(key.into(), group);
        self
    }

    pub fn with_default_preference(mut self, preference: DefaultPreference) -> Self {
        self.default_preference = preference;
        self
    }

    pub fn notification(&self, notification_type: &str) -> Option<&NotificationConfig> {
        self.notifications.get(notification_type)
    }

    pub fn channel(&self, channel: &str) -> Option<&ChannelConfig> {
        self.channels.get(channel)
    }

    /// Channels not disabled in the catalog, in key order.
    pub fn enabled_channels(&self) -> impl Iterator<Item = (&String, &ChannelConfig)> {
        self.channels.iter().filter(|(_, channel)| channel.enabled)
    }

    /// Notifications whose effective group is `group_key`, in key order.
    pub fn notifications_in_group<'a>(
        &'a self,
        group_key: &'a str,
    ) -> impl Iterator<Item = (&'a String, &'a NotificationConfig)> + 'a {
        self.notifications
            .iter()
            .filter(move |(_, notification)| notification.effective_group() == group_key)
    }

    /// Whether `channel` is forced on for `notification_type`.
    ///
    /// Unknown notification types force nothing.
    pub fn is_forced(&self, notification_type: &str, channel: &str) -> bool {
        self.notification(notification_type)
            .is_some_and(|notification| notification.forces(channel))
    }

    /// Computes the default preference when no explicit record exists.
    pub fn default_for(&self, notification_type: &str, channel: &str) -> bool {
        let Some(notification) = self.notification(notification_type) else {
            return self.default_preference.is_enabled();
        };

        if let Some(default_channels) = &notification.default_channels {
            return default_channels.iter().any(|candidate| candidate == channel);
        }

        if let Some(preference) = notification.default_preference {
            return preference.is_enabled();
        }

        // A notification without `group` skips this level, even when a group
        // keyed `UNGROUPED` is declared.
        let group_preference = notification
            .group
            .as_deref()
            .and_then(|group_key| self.groups.get(group_key))
            .and_then(|group| group.default_preference);
        if let Some(preference) = group_preference {
            return preference.is_enabled();
        }

        self.default_preference.is_enabled()
    }

    /// Validates declaration-level catalog invariants.
    ///
    /// Groups referenced by notifications need not be declared; an
    /// undeclared group simply has no label or default of its own.
    pub fn validate(&self) -> Result<(), CatalogValidationError> {
        if self.channels.keys().any(|key| key.trim().is_empty()) {
            return Err(CatalogValidationError::BlankChannelKey);
        }
        if self.groups.keys().any(|key| key.trim().is_empty()) {
            return Err(CatalogValidationError::BlankGroupKey);
        }

        for (notification_type, notification) in &self.notifications {
            if notification_type.trim().is_empty() {
                return Err(CatalogValidationError::BlankNotificationKey);
            }
            if notification
                .group
                .as_deref()
                .is_some_and(|group| group.trim().is_empty())
            {
                return Err(CatalogValidationError::BlankGroupKey);
            }

            for channel in &notification.force_channels {
                if !self.channels.contains_key(channel) {
                    return Err(CatalogValidationError::UnknownForcedChannel {
                        notification_type: notification_type.clone(),
                        channel: channel.clone(),
                    });
                }
            }

            for channel in notification.default_channels.iter().flatten() {
                if !self.channels.contains_key(channel) {
                    return Err(CatalogValidationError::UnknownDefaultChannel {
                        notification_type: notification_type.clone(),
                        channel: channel.clone(),
                    });
                }
            }
        }

        Ok(())
    }
}

/// Declaration-level catalog errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogValidationError {
    BlankChannelKey,
    BlankNotificationKey,
    BlankGroupKey,
    UnknownForcedChannel {
        notification_type: String,
        channel: String,
    },
    UnknownDefaultChannel {
        notification_type: String,
        channel: String,
    },
}

impl Display for CatalogValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankChannelKey => write!(f, "channel key must not be blank"),
            Self::BlankNotificationKey => write!(f, "notification type key must not be blank"),
            Self::BlankGroupKey => write!(f, "group key must not be blank"),
            Self::UnknownForcedChannel {
                notification_type,
                channel,
            } => write!(
                f,
                "notification `{notification_type}` forces undeclared channel `{channel}`"
            ),
            Self::UnknownDefaultChannel {
                notification_type,
                channel,
            } => write!(
                f,
                "notification `{notification_type}` defaults to undeclared channel `{channel}`"
            ),
        }
    }
}

impl Error for CatalogValidationError {}
