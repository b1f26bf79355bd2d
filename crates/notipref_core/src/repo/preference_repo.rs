//! Preference repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide lookup, batch listing and upsert over `notification_preferences`.
//! - Provide the transaction boundary used by bulk mutations.
//!
//! # Invariants
//! - Read paths reject invalid persisted state instead of masking it.
//! - A failed closure inside `run_atomically` leaves no persisted effect.

use crate::db::DbError;
use crate::model::preference::{PreferenceRecord, UpsertOutcome, UserId};
use log::{error, warn};
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};

const PREFERENCE_COLUMNS: &str =
    "id, user_id, notification_type, channel, enabled, created_at, updated_at";
const PREFERENCES_TABLE: &str = "notification_preferences";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for preference persistence and queries.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    InvalidData(String),
    MissingRequiredTable(&'static str),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => {
                write!(f, "invalid persisted preference data: {message}")
            }
            Self::MissingRequiredTable(table) => {
                write!(f, "required table `{table}` is missing; run migrations first")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::InvalidData(_) | Self::MissingRequiredTable(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Keyed store of explicit per-user preferences.
pub trait PreferenceRepository {
    /// Returns the explicit record for one tuple, if any.
    fn find_preference(
        &self,
        user_id: &UserId,
        notification_type: &str,
        channel: &str,
    ) -> RepoResult<Option<PreferenceRecord>>;

    /// Returns every explicit record of one user in a single query.
    fn list_preferences(&self, user_id: &UserId) -> RepoResult<Vec<PreferenceRecord>>;

    /// Inserts or updates one tuple and reports whether it was inserted.
    fn upsert_preference(
        &self,
        user_id: &UserId,
        notification_type: &str,
        channel: &str,
        enabled: bool,
    ) -> RepoResult<UpsertOutcome>;

    /// Runs `work` as one transaction: commit on `Ok`, rollback on `Err`.
    ///
    /// Transactions do not nest; `work` must not call `run_atomically`.
    fn run_atomically<T, E, F>(&self, work: F) -> Result<T, E>
    where
        Self: Sized,
        F: FnOnce(&Self) -> Result<T, E>,
        E: From<RepoError>;
}

/// SQLite-backed preference repository over a migrated connection.
pub struct SqlitePreferenceRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePreferenceRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        if !table_exists(conn, PREFERENCES_TABLE)? {
            return Err(RepoError::MissingRequiredTable(PREFERENCES_TABLE));
        }
        Ok(Self { conn })
    }
}

impl PreferenceRepository for SqlitePreferenceRepository<'_> {
    fn find_preference(
        &self,
        user_id: &UserId,
        notification_type: &str,
        channel: &str,
    ) -> RepoResult<Option<PreferenceRecord>> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "SELECT {PREFERENCE_COLUMNS}
             FROM {PREFERENCES_TABLE}
             WHERE user_id = ?1
               AND notification_type = ?2
               AND channel = ?3;"
        ))?;

        let mut rows = stmt.query(params![user_id.as_str(), notification_type, channel])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_preference_row(row)?));
        }

        Ok(None)
    }

    fn list_preferences(&self, user_id: &UserId) -> RepoResult<Vec<PreferenceRecord>> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "SELECT {PREFERENCE_COLUMNS}
             FROM {PREFERENCES_TABLE}
             WHERE user_id = ?1
             ORDER BY notification_type ASC, channel ASC;"
        ))?;

        let mut rows = stmt.query([user_id.as_str()])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(parse_preference_row(row)?);
        }

        Ok(records)
    }

    fn upsert_preference(
        &self,
        user_id: &UserId,
        notification_type: &str,
        channel: &str,
        enabled: bool,
    ) -> RepoResult<UpsertOutcome> {
        let was_created = self
            .find_preference(user_id, notification_type, channel)?
            .is_none();

        let mut stmt = self.conn.prepare_cached(&format!(
            "INSERT INTO {PREFERENCES_TABLE} (user_id, notification_type, channel, enabled)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (user_id, notification_type, channel) DO UPDATE SET
                enabled = excluded.enabled,
                updated_at = (strftime('%s', 'now') * 1000)
             RETURNING {PREFERENCE_COLUMNS};"
        ))?;

        let mut rows = stmt.query(params![
            user_id.as_str(),
            notification_type,
            channel,
            bool_to_int(enabled),
        ])?;
        let record = match rows.next()? {
            Some(row) => parse_preference_row(row)?,
            None => {
                return Err(RepoError::InvalidData(format!(
                    "upsert returned no row for `{user_id}`/`{notification_type}`/`{channel}`"
                )));
            }
        };

        Ok(UpsertOutcome {
            record,
            was_created,
        })
    }

    fn run_atomically<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&Self) -> Result<T, E>,
        E: From<RepoError>,
    {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)
            .map_err(RepoError::from)?;

        match work(self) {
            Ok(value) => {
                tx.commit().map_err(|err| {
                    error!("event=store_commit module=repo status=error error={err}");
                    RepoError::from(err)
                })?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback() {
                    warn!(
                        "event=store_rollback module=repo status=error error={rollback_err}"
                    );
                }
                Err(err)
            }
        }
    }
}

fn parse_preference_row(row: &Row<'_>) -> RepoResult<PreferenceRecord> {
    let enabled = match row.get::<_, i64>("enabled")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid enabled value `{other}` in {PREFERENCES_TABLE}.enabled"
            )));
        }
    };

    Ok(PreferenceRecord {
        id: row.get("id")?,
        user_id: UserId::new(row.get::<_, String>("user_id")?),
        notification_type: row.get("notification_type")?,
        channel: row.get("channel")?,
        enabled,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
