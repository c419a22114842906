use std::sync::{Arc, Mutex};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension};
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::init_db;
use crate::error::{ReminderError, Result};
use crate::types::{RecurringConfig, Reminder, ReminderKind};

/// Everything needed to create a reminder. The store assigns the id and the
/// bookkeeping timestamps.
#[derive(Debug, Clone)]
pub struct NewReminder {
    pub user_id: String,
    pub channel_id: String,
    pub guild_id: String,
    pub title: String,
    pub message: String,
    pub kind: ReminderKind,
    pub next_trigger_time: DateTime<Utc>,
    pub recurring: Option<RecurringConfig>,
}

const COLUMNS: &str = "id, user_id, channel_id, guild_id, title, message, kind, \
                       next_trigger_time, is_active, recurring, created_at, updated_at";

/// Durable owner of all reminder records.
///
/// The connection sits behind a `Mutex`, and `update` performs its
/// read-modify-write inside one transaction under that lock, so no two
/// mutations of the same record can interleave and neither a user edit nor a
/// scheduler advance can clobber the other. Every mutating call either
/// commits in full or leaves the database untouched.
pub struct ReminderStore {
    conn: Arc<Mutex<Connection>>,
}

impl ReminderStore {
    /// Wrap `conn`, initialising the schema if needed.
    pub fn new(conn: Connection) -> Result<Self> {
        init_db(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Persist a new reminder. Returns the fully populated record.
    pub fn create(&self, new: NewReminder) -> Result<Reminder> {
        if new.title.trim().is_empty() {
            return Err(ReminderError::Validation("title must not be empty".into()));
        }
        if new.message.trim().is_empty() {
            return Err(ReminderError::Validation("message must not be empty".into()));
        }
        match (new.kind, &new.recurring) {
            (ReminderKind::Recurring, None) => {
                return Err(ReminderError::Validation(
                    "recurring reminders require a recurrence config".into(),
                ));
            }
            (ReminderKind::Once, Some(_)) => {
                return Err(ReminderError::Validation(
                    "one-shot reminders cannot carry a recurrence config".into(),
                ));
            }
            _ => {}
        }

        let now = Utc::now();
        let reminder = Reminder {
            id: Uuid::new_v4().to_string(),
            user_id: new.user_id,
            channel_id: new.channel_id,
            guild_id: new.guild_id,
            title: new.title,
            message: new.message,
            kind: new.kind,
            next_trigger_time: new.next_trigger_time,
            is_active: true,
            recurring: new.recurring,
            created_at: now,
            updated_at: now,
        };
        let recurring_json = reminder
            .recurring
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO reminders
             (id, user_id, channel_id, guild_id, title, message, kind,
              next_trigger_time, is_active, recurring, created_at, updated_at)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,1,?9,?10,?10)",
            rusqlite::params![
                reminder.id,
                reminder.user_id,
                reminder.channel_id,
                reminder.guild_id,
                reminder.title,
                reminder.message,
                reminder.kind.to_string(),
                fmt_ts(reminder.next_trigger_time),
                recurring_json,
                fmt_ts(now),
            ],
        )?;

        info!(reminder_id = %reminder.id, user_id = %reminder.user_id, "reminder created");
        Ok(reminder)
    }

    /// Fetch one reminder by id.
    pub fn get(&self, id: &str) -> Result<Reminder> {
        let conn = self.conn.lock().unwrap();
        fetch(&conn, id)?.ok_or_else(|| ReminderError::NotFound { id: id.to_string() })
    }

    /// All reminders owned by `user_id`, in creation order.
    pub fn list_by_user(&self, user_id: &str) -> Result<Vec<Reminder>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {COLUMNS} FROM reminders WHERE user_id = ?1 ORDER BY created_at, id"
        ))?;
        collect_rows(&mut stmt, [user_id])
    }

    /// Active reminders whose trigger time has arrived, ordered by trigger
    /// time then id. Used exclusively by the scheduler's tick.
    pub fn list_due(&self, as_of: DateTime<Utc>) -> Result<Vec<Reminder>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {COLUMNS} FROM reminders
             WHERE is_active = 1 AND next_trigger_time <= ?1
             ORDER BY next_trigger_time, id"
        ))?;
        collect_rows(&mut stmt, [fmt_ts(as_of)])
    }

    /// Apply `mutate` to the stored record as one atomic step.
    ///
    /// The record is read, mutated, and written back inside a single
    /// transaction under the connection lock; if `mutate` or the write fails,
    /// nothing is committed. `updated_at` is refreshed on success.
    pub fn update<F>(&self, id: &str, mutate: F) -> Result<Reminder>
    where
        F: FnOnce(&mut Reminder) -> Result<()>,
    {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let mut reminder =
            fetch(&tx, id)?.ok_or_else(|| ReminderError::NotFound { id: id.to_string() })?;

        mutate(&mut reminder)?;
        reminder.updated_at = Utc::now();

        let recurring_json = reminder
            .recurring
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        tx.execute(
            "UPDATE reminders SET title = ?2, message = ?3, next_trigger_time = ?4,
                    is_active = ?5, recurring = ?6, updated_at = ?7
             WHERE id = ?1",
            rusqlite::params![
                reminder.id,
                reminder.title,
                reminder.message,
                fmt_ts(reminder.next_trigger_time),
                reminder.is_active,
                recurring_json,
                fmt_ts(reminder.updated_at),
            ],
        )?;
        tx.commit()?;
        Ok(reminder)
    }

    /// Delete a reminder. Returns whether a record existed.
    pub fn delete(&self, id: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let n = conn.execute("DELETE FROM reminders WHERE id = ?1", [id])?;
        if n > 0 {
            info!(reminder_id = %id, "reminder deleted");
        }
        Ok(n > 0)
    }
}

// --- row plumbing ----------------------------------------------------------

type RawRow = (
    String,         // id
    String,         // user_id
    String,         // channel_id
    String,         // guild_id
    String,         // title
    String,         // message
    String,         // kind
    String,         // next_trigger_time
    bool,           // is_active
    Option<String>, // recurring JSON
    String,         // created_at
    String,         // updated_at
);

fn read_raw(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
        row.get(8)?,
        row.get(9)?,
        row.get(10)?,
        row.get(11)?,
    ))
}

fn decode(raw: RawRow) -> Result<Reminder> {
    let (
        id,
        user_id,
        channel_id,
        guild_id,
        title,
        message,
        kind,
        next_trigger_time,
        is_active,
        recurring,
        created_at,
        updated_at,
    ) = raw;
    Ok(Reminder {
        kind: kind.parse().map_err(ReminderError::Validation)?,
        next_trigger_time: parse_ts(&next_trigger_time)?,
        recurring: recurring
            .as_deref()
            .map(serde_json::from_str)
            .transpose()?,
        created_at: parse_ts(&created_at)?,
        updated_at: parse_ts(&updated_at)?,
        id,
        user_id,
        channel_id,
        guild_id,
        title,
        message,
        is_active,
    })
}

fn fetch(conn: &Connection, id: &str) -> Result<Option<Reminder>> {
    let raw = conn
        .query_row(
            &format!("SELECT {COLUMNS} FROM reminders WHERE id = ?1"),
            [id],
            read_raw,
        )
        .optional()?;
    raw.map(decode).transpose()
}

fn collect_rows<P: rusqlite::Params>(
    stmt: &mut rusqlite::Statement<'_>,
    params: P,
) -> Result<Vec<Reminder>> {
    let reminders = stmt
        .query_map(params, read_raw)?
        .filter_map(|r| r.ok())
        .filter_map(|raw| match decode(raw) {
            Ok(reminder) => Some(reminder),
            Err(e) => {
                warn!("skipping undecodable reminder row: {e}");
                None
            }
        })
        .collect();
    Ok(reminders)
}

/// Fixed-width RFC3339 with milliseconds and a `Z` suffix, so lexicographic
/// comparison in SQL matches chronological order.
fn fmt_ts(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_ts(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| ReminderError::Validation(format!("bad stored timestamp {s:?}: {e}")))
}
