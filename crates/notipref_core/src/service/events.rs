//! Post-commit preference change notification.
//!
//! Events are published only after the store transaction has committed and
//! the affected cache keys were invalidated; a rolled back write publishes
//! nothing.

use crate::model::preference::{PreferenceRecord, UserId};
use log::warn;
use std::sync::mpsc::Sender;
use std::sync::Arc;

/// One successful single-tuple write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreferenceChanged {
    pub record: PreferenceRecord,
    pub user_id: UserId,
    /// `true` when the write inserted the record rather than updating it.
    pub was_created: bool,
}

/// Receiver of preference change events.
pub trait PreferenceSubscriber: Send + Sync {
    fn preference_changed(&self, event: &PreferenceChanged);
}

impl PreferenceSubscriber for Sender<PreferenceChanged> {
    fn preference_changed(&self, event: &PreferenceChanged) {
        if self.send(event.clone()).is_err() {
            warn!(
                "event=preference_notify module=service status=dropped reason=receiver_closed user_id={}",
                event.user_id
            );
        }
    }
}

/// Fan-out list of subscribers.
#[derive(Clone, Default)]
pub struct ChangeNotifier {
    subscribers: Vec<Arc<dyn PreferenceSubscriber>>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, subscriber: Arc<dyn PreferenceSubscriber>) {
        self.subscribers.push(subscriber);
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// Delivers `event` to every subscriber in registration order.
    pub fn publish(&self, event: &PreferenceChanged) {
        for subscriber in &self.subscribers {
            subscriber.preference_changed(event);
        }
    }
}
