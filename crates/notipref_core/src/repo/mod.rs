//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the preference store contract used by the engine.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Upserts are last-writer-wins per `(user_id, notification_type, channel)`.
//! - `run_atomically` either commits every write made by its closure or none.

pub mod preference_repo;
