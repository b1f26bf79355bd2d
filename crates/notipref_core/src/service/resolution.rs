//! Read path: effective preference for one tuple and channel filtering.

use super::{PreferenceResult, PreferenceService};
use crate::cache::PreferenceCacheKey;
use crate::model::catalog::Catalog;
use crate::model::preference::{PreferenceEntry, UserId};
use crate::repo::preference_repo::PreferenceRepository;
use log::debug;

impl<R: PreferenceRepository> PreferenceService<R> {
    /// Returns whether `channel` is enabled for `notification_type` and user.
    ///
    /// Unknown notification types and channels are not errors; they resolve
    /// through the catalog-wide default. Only store and cache failures are
    /// returned as errors.
    pub fn is_channel_enabled(
        &self,
        user_id: &UserId,
        notification_type: &str,
        channel: &str,
    ) -> PreferenceResult<bool> {
        let catalog = self.catalog.current();
        self.resolve(&catalog, user_id, notification_type, channel)
    }

    /// Returns the subset of `channels` that should be used for delivery.
    ///
    /// Forced channels pass without touching the store. Input order is kept
    /// and duplicates are not removed.
    pub fn filter_channels<S: AsRef<str>>(
        &self,
        user_id: &UserId,
        notification_type: &str,
        channels: &[S],
    ) -> PreferenceResult<Vec<String>> {
        let catalog = self.catalog.current();
        let mut allowed = Vec::with_capacity(channels.len());

        for channel in channels {
            let channel: &str = channel.as_ref();
            if self.resolve(&catalog, user_id, notification_type, channel)? {
                allowed.push(channel.to_string());
            }
        }

        debug!(
            "event=preference_filter module=service status=ok user_id={user_id} notification_type={notification_type} requested={} allowed={}",
            channels.len(),
            allowed.len()
        );
        Ok(allowed)
    }

    /// Returns every explicit record of the user.
    pub fn get_preferences_for_user(
        &self,
        user_id: &UserId,
    ) -> PreferenceResult<Vec<PreferenceEntry>> {
        let records = self.repo.list_preferences(user_id)?;
        Ok(records.iter().map(PreferenceEntry::from).collect())
    }

    pub(super) fn resolve(
        &self,
        catalog: &Catalog,
        user_id: &UserId,
        notification_type: &str,
        channel: &str,
    ) -> PreferenceResult<bool> {
        if catalog.is_forced(notification_type, channel) {
            return Ok(true);
        }

        let key = PreferenceCacheKey::new(user_id, notification_type, channel);
        if let Some(enabled) = self.cache.get(&key)? {
            debug!("event=preference_resolve module=service status=hit key={key}");
            return Ok(enabled);
        }

        let enabled = match self
            .repo
            .find_preference(user_id, notification_type, channel)?
        {
            Some(record) => record.enabled,
            None => catalog.default_for(notification_type, channel),
        };

        self.cache.set(&key, enabled, self.cache_ttl)?;
        debug!(
            "event=preference_resolve module=service status=miss key={key} enabled={enabled}"
        );
        Ok(enabled)
    }
}
