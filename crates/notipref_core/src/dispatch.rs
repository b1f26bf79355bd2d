//! Send-time channel gate for outbound notification dispatch.
//!
//! # Responsibility
//! - Decide per `(user, notification_type, channel)` send attempt whether the
//!   dispatcher should deliver.
//! - Let notification types opt out of automatic filtering when they filter
//!   their own channel list via `PreferenceService::filter_channels`.
//!
//! # Invariants
//! - Filter modes are fixed at registration; lookups never inspect the
//!   notification itself.
//! - Types absent from the catalog and forced channels always pass.

use crate::model::preference::UserId;
use crate::repo::preference_repo::PreferenceRepository;
use crate::service::{PreferenceResult, PreferenceService};
use log::debug;
use std::collections::HashMap;

/// How the dispatch filter treats one notification type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FilterMode {
    /// Every send attempt is checked against the user's preferences.
    #[default]
    Automatic,
    /// The notification already filtered its channels; pass everything.
    SelfManaged,
}

/// Preference gate consulted by the dispatcher before each delivery.
pub struct DispatchFilter<'svc, R: PreferenceRepository> {
    service: &'svc PreferenceService<R>,
    modes: HashMap<String, FilterMode>,
}

impl<'svc, R: PreferenceRepository> DispatchFilter<'svc, R> {
    pub fn new(service: &'svc PreferenceService<R>) -> Self {
        Self {
            service,
            modes: HashMap::new(),
        }
    }

    /// Records the filter mode of one notification type, replacing any
    /// earlier registration.
    pub fn register(
        &mut self,
        notification_type: impl Into<String>,
        mode: FilterMode,
    ) -> &mut Self {
        self.modes.insert(notification_type.into(), mode);
        self
    }

    /// Mode for `notification_type`; unregistered types are automatic.
    pub fn mode(&self, notification_type: &str) -> FilterMode {
        self.modes
            .get(notification_type)
            .copied()
            .unwrap_or_default()
    }

    /// Whether one delivery attempt should go out.
    pub fn should_send(
        &self,
        user_id: &UserId,
        notification_type: &str,
        channel: &str,
    ) -> PreferenceResult<bool> {
        if self.mode(notification_type) == FilterMode::SelfManaged {
            return Ok(true);
        }

        let catalog = self.service.catalog();
        let Some(notification) = catalog.notification(notification_type) else {
            debug!(
                "event=dispatch_filter module=dispatch status=pass reason=unmanaged notification_type={notification_type}"
            );
            return Ok(true);
        };
        if notification.forces(channel) {
            return Ok(true);
        }

        self.service
            .is_channel_enabled(user_id, notification_type, channel)
    }
}
