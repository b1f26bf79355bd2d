//! Write path: validated single writes, atomic bulk writes, invalidation.
//!
//! Every write runs inside `PreferenceRepository::run_atomically`. Cache keys
//! are invalidated and events published only after that call returns `Ok`,
//! so a rolled back bulk write leaves the cache untouched.

use super::events::PreferenceChanged;
use super::{ChannelRejection, PreferenceError, PreferenceResult, PreferenceService};
use crate::cache::PreferenceCacheKey;
use crate::model::catalog::{Catalog, NotificationConfig};
use crate::model::preference::{PreferenceRecord, UpsertOutcome, UserId};
use crate::repo::preference_repo::PreferenceRepository;
use log::{error, info, warn};
use std::time::Instant;

impl<R: PreferenceRepository> PreferenceService<R> {
    /// Sets one explicit preference.
    ///
    /// # Errors
    /// - `InvalidNotificationType` / `InvalidChannel` for keys absent from the
    ///   catalog, or a channel disabled in the catalog.
    /// - `ForcedChannel` when the channel is forced for the notification type.
    /// - `Store` when the upsert fails; nothing is persisted.
    pub fn set_preference(
        &self,
        user_id: &UserId,
        notification_type: &str,
        channel: &str,
        enabled: bool,
    ) -> PreferenceResult<PreferenceRecord> {
        let catalog = self.catalog.current();
        validate_notification_type(&catalog, notification_type)?;
        validate_channel(&catalog, channel)?;
        if catalog.is_forced(notification_type, channel) {
            return Err(PreferenceError::ForcedChannel {
                notification_type: notification_type.to_string(),
                channel: channel.to_string(),
            });
        }

        let outcome = self
            .repo
            .run_atomically(|repo| -> PreferenceResult<UpsertOutcome> {
                Ok(repo.upsert_preference(user_id, notification_type, channel, enabled)?)
            })?;

        info!(
            "event=preference_set module=service status=ok user_id={user_id} notification_type={notification_type} channel={channel} created={}",
            outcome.was_created
        );

        let record = outcome.record.clone();
        self.after_commit(user_id, &[outcome])?;
        Ok(record)
    }

    /// Sets `channel` for every notification in `group_key`, skipping
    /// notifications that force it. Returns the number of records written.
    ///
    /// Notifications without a declared group belong to `"ungrouped"`.
    pub fn set_group_preference(
        &self,
        user_id: &UserId,
        group_key: &str,
        channel: &str,
        enabled: bool,
    ) -> PreferenceResult<usize> {
        let catalog = self.catalog.current();
        validate_channel(&catalog, channel)?;

        let targets = catalog
            .notifications_in_group(group_key)
            .filter(|(_, notification)| !notification.forces(channel))
            .map(|(notification_type, _)| (notification_type.clone(), channel.to_string()))
            .collect();

        self.write_bulk("group", user_id, targets, enabled)
    }

    /// Sets `channel` for every registered notification type, skipping
    /// notifications that force it. Returns the number of records written.
    pub fn set_channel_preference(
        &self,
        user_id: &UserId,
        channel: &str,
        enabled: bool,
    ) -> PreferenceResult<usize> {
        let catalog = self.catalog.current();
        validate_channel(&catalog, channel)?;

        let targets = catalog
            .notifications
            .iter()
            .filter(|(_, notification)| !notification.forces(channel))
            .map(|(notification_type, _)| (notification_type.clone(), channel.to_string()))
            .collect();

        self.write_bulk("channel", user_id, targets, enabled)
    }

    /// Sets every enabled, non-forced channel of one notification type.
    /// Returns the number of records written.
    pub fn set_notification_preference(
        &self,
        user_id: &UserId,
        notification_type: &str,
        enabled: bool,
    ) -> PreferenceResult<usize> {
        let catalog = self.catalog.current();
        let notification = validate_notification_type(&catalog, notification_type)?;

        let targets = catalog
            .enabled_channels()
            .filter(|(channel, _)| !notification.forces(channel))
            .map(|(channel, _)| (notification_type.to_string(), channel.clone()))
            .collect();

        self.write_bulk("notification", user_id, targets, enabled)
    }

    /// Drops every cached entry of the user for all catalog pairs.
    ///
    /// Used after imports or other writes that bypass this service.
    pub fn clear_user_cache(&self, user_id: &UserId) -> PreferenceResult<()> {
        let catalog = self.catalog.current();
        for notification_type in catalog.notifications.keys() {
            for channel in catalog.channels.keys() {
                self.cache
                    .delete(&PreferenceCacheKey::new(user_id, notification_type, channel))?;
            }
        }

        info!(
            "event=preference_cache_clear module=service status=ok user_id={user_id} keys={}",
            catalog.notifications.len() * catalog.channels.len()
        );
        Ok(())
    }

    fn write_bulk(
        &self,
        scope: &'static str,
        user_id: &UserId,
        targets: Vec<(String, String)>,
        enabled: bool,
    ) -> PreferenceResult<usize> {
        let started_at = Instant::now();

        let written = self.repo.run_atomically(|repo| -> PreferenceResult<Vec<UpsertOutcome>> {
            let mut outcomes = Vec::with_capacity(targets.len());
            for (notification_type, channel) in &targets {
                outcomes.push(repo.upsert_preference(
                    user_id,
                    notification_type,
                    channel,
                    enabled,
                )?);
            }
            Ok(outcomes)
        });

        let outcomes = match written {
            Ok(outcomes) => outcomes,
            Err(err) => {
                error!(
                    "event=preference_bulk_set module=service status=error scope={scope} user_id={user_id} duration_ms={} error={err}",
                    started_at.elapsed().as_millis()
                );
                return Err(err);
            }
        };

        info!(
            "event=preference_bulk_set module=service status=ok scope={scope} user_id={user_id} written={} duration_ms={}",
            outcomes.len(),
            started_at.elapsed().as_millis()
        );

        let count = outcomes.len();
        self.after_commit(user_id, &outcomes)?;
        Ok(count)
    }

    /// Invalidates then notifies for committed writes.
    ///
    /// Events are published even when an invalidation fails, since the write
    /// itself is durable; the first cache error is returned afterwards.
    fn after_commit(&self, user_id: &UserId, outcomes: &[UpsertOutcome]) -> PreferenceResult<()> {
        let mut first_error = None;
        for outcome in outcomes {
            let key = PreferenceCacheKey::new(
                user_id,
                &outcome.record.notification_type,
                &outcome.record.channel,
            );
            if let Err(err) = self.cache.delete(&key) {
                warn!(
                    "event=preference_invalidate module=service status=error key={key} error={err}"
                );
                first_error.get_or_insert(err);
            }
        }

        for outcome in outcomes {
            self.notifier.publish(&PreferenceChanged {
                record: outcome.record.clone(),
                user_id: user_id.clone(),
                was_created: outcome.was_created,
            });
        }

        match first_error {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }
}

fn validate_notification_type<'c>(
    catalog: &'c Catalog,
    notification_type: &str,
) -> PreferenceResult<&'c NotificationConfig> {
    catalog
        .notification(notification_type)
        .ok_or_else(|| PreferenceError::InvalidNotificationType(notification_type.to_string()))
}

fn validate_channel(catalog: &Catalog, channel: &str) -> PreferenceResult<()> {
    match catalog.channel(channel) {
        None => Err(PreferenceError::InvalidChannel {
            channel: channel.to_string(),
            reason: ChannelRejection::NotRegistered,
        }),
        Some(config) if !config.enabled => Err(PreferenceError::InvalidChannel {
            channel: channel.to_string(),
            reason: ChannelRejection::Disabled,
        }),
        Some(_) => Ok(()),
    }
}
