//! Grouped preference table for presentation layers.
//!
//! # Invariants
//! - Groups sort by `order` (default 999), then key; notifications likewise
//!   within their group.
//! - Only catalog-enabled channels appear.
//! - User records are fetched once per table, never per cell.

use super::{PreferenceResult, PreferenceService};
use crate::model::catalog::{Catalog, NotificationConfig, DEFAULT_ORDER};
use crate::model::preference::UserId;
use crate::repo::preference_repo::PreferenceRepository;
use log::debug;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Effective state of one channel cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChannelPreferenceView {
    pub enabled: bool,
    pub forced: bool,
}

/// One notification row with its channel cells keyed by channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationView {
    #[serde(rename = "type")]
    pub notification_type: String,
    pub label: String,
    pub description: Option<String>,
    pub channels: BTreeMap<String, ChannelPreferenceView>,
}

/// One group section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupView {
    pub group: String,
    pub label: String,
    pub description: Option<String>,
    pub notifications: Vec<NotificationView>,
}

impl<R: PreferenceRepository> PreferenceService<R> {
    /// Builds the full preference table for one user.
    ///
    /// Cell values bypass the cache: they come from one batch read of the
    /// user's records plus the catalog, with the same precedence as
    /// `is_channel_enabled`.
    pub fn get_preferences_table(&self, user_id: &UserId) -> PreferenceResult<Vec<GroupView>> {
        let catalog = self.catalog.current();
        let explicit: HashMap<(String, String), bool> = self
            .repo
            .list_preferences(user_id)?
            .into_iter()
            .map(|record| ((record.notification_type, record.channel), record.enabled))
            .collect();

        let table = build_table(&catalog, &explicit);
        debug!(
            "event=preference_table module=service status=ok user_id={user_id} groups={} records={}",
            table.len(),
            explicit.len()
        );
        Ok(table)
    }
}

fn build_table(catalog: &Catalog, explicit: &HashMap<(String, String), bool>) -> Vec<GroupView> {
    let mut grouped: BTreeMap<&str, Vec<(&String, &NotificationConfig)>> = BTreeMap::new();
    for (notification_type, notification) in &catalog.notifications {
        grouped
            .entry(notification.effective_group())
            .or_default()
            .push((notification_type, notification));
    }

    let mut groups: Vec<_> = grouped.into_iter().collect();
    groups.sort_by_key(|(group_key, _)| (group_order(catalog, group_key), *group_key));

    groups
        .into_iter()
        .map(|(group_key, mut members)| {
            members.sort_by_key(|(notification_type, notification)| {
                (notification.effective_order(), *notification_type)
            });

            let group = catalog.groups.get(group_key);
            GroupView {
                group: group_key.to_string(),
                label: group
                    .and_then(|group| group.label.clone())
                    .unwrap_or_else(|| capitalize(group_key)),
                description: group.and_then(|group| group.description.clone()),
                notifications: members
                    .into_iter()
                    .map(|(notification_type, notification)| {
                        notification_view(catalog, explicit, notification_type, notification)
                    })
                    .collect(),
            }
        })
        .collect()
}

fn notification_view(
    catalog: &Catalog,
    explicit: &HashMap<(String, String), bool>,
    notification_type: &str,
    notification: &NotificationConfig,
) -> NotificationView {
    let channels = catalog
        .enabled_channels()
        .map(|(channel, _)| {
            let forced = notification.forces(channel);
            let enabled = forced
                || explicit
                    .get(&(notification_type.to_string(), channel.clone()))
                    .copied()
                    .unwrap_or_else(|| catalog.default_for(notification_type, channel));
            (channel.clone(), ChannelPreferenceView { enabled, forced })
        })
        .collect();

    NotificationView {
        notification_type: notification_type.to_string(),
        label: notification
            .label
            .clone()
            .unwrap_or_else(|| short_type_name(notification_type).to_string()),
        description: notification.description.clone(),
        channels,
    }
}

fn group_order(catalog: &Catalog, group_key: &str) -> i64 {
    catalog
        .groups
        .get(group_key)
        .map_or(DEFAULT_ORDER, |group| group.effective_order())
}

/// Last path segment of a type key, e.g. `InvoicePaid` for
/// `App\Notifications\InvoicePaid` or `billing::InvoicePaid`.
fn short_type_name(notification_type: &str) -> &str {
    notification_type
        .rsplit(['\\', '/', ':'])
        .find(|segment| !segment.is_empty())
        .unwrap_or(notification_type)
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
