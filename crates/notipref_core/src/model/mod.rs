//! Domain model for notification delivery preferences.
//!
//! # Responsibility
//! - Describe the read-only notification catalog (channels, notification
//!   types, groups) and its default cascade.
//! - Describe persisted per-user preference records.
//!
//! # Invariants
//! - A preference record is identified by `(user_id, notification_type, channel)`.
//! - Absence of a record means "use the computed default", never "disabled".

pub mod catalog;
pub mod preference;
