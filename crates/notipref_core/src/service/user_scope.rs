//! Preference operations bound to one user.

use super::table::GroupView;
use super::{PreferenceResult, PreferenceService};
use crate::model::preference::{PreferenceEntry, PreferenceRecord, UserId};
use crate::repo::preference_repo::PreferenceRepository;

/// Borrowed view of a [`PreferenceService`] for a single user.
pub struct UserPreferences<'svc, R: PreferenceRepository> {
    service: &'svc PreferenceService<R>,
    user_id: UserId,
}

impl<R: PreferenceRepository> PreferenceService<R> {
    pub fn for_user(&self, user_id: impl Into<UserId>) -> UserPreferences<'_, R> {
        UserPreferences {
            service: self,
            user_id: user_id.into(),
        }
    }
}

impl<R: PreferenceRepository> UserPreferences<'_, R> {
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn is_channel_enabled(
        &self,
        notification_type: &str,
        channel: &str,
    ) -> PreferenceResult<bool> {
        self.service
            .is_channel_enabled(&self.user_id, notification_type, channel)
    }

    pub fn set(
        &self,
        notification_type: &str,
        channel: &str,
        enabled: bool,
    ) -> PreferenceResult<PreferenceRecord> {
        self.service
            .set_preference(&self.user_id, notification_type, channel, enabled)
    }

    pub fn preferences(&self) -> PreferenceResult<Vec<PreferenceEntry>> {
        self.service.get_preferences_for_user(&self.user_id)
    }

    pub fn table(&self) -> PreferenceResult<Vec<GroupView>> {
        self.service.get_preferences_table(&self.user_id)
    }

    pub fn set_group_channel(
        &self,
        group_key: &str,
        channel: &str,
        enabled: bool,
    ) -> PreferenceResult<usize> {
        self.service
            .set_group_preference(&self.user_id, group_key, channel, enabled)
    }

    pub fn set_channel_for_all(&self, channel: &str, enabled: bool) -> PreferenceResult<usize> {
        self.service
            .set_channel_preference(&self.user_id, channel, enabled)
    }

    pub fn set_all_channels_for_notification(
        &self,
        notification_type: &str,
        enabled: bool,
    ) -> PreferenceResult<usize> {
        self.service
            .set_notification_preference(&self.user_id, notification_type, enabled)
    }
}
