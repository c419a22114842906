use rusqlite::Connection;

use crate::error::Result;

/// Initialise the reminder schema in `conn`.
///
/// Creates the `reminders` table (idempotent) and an index covering the
/// scheduler's due scan so polling stays cheap with thousands of reminders.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS reminders (
            id                TEXT    NOT NULL PRIMARY KEY,
            user_id           TEXT    NOT NULL,
            channel_id        TEXT    NOT NULL,
            guild_id          TEXT    NOT NULL,
            title             TEXT    NOT NULL,
            message           TEXT    NOT NULL,
            kind              TEXT    NOT NULL,   -- 'once' | 'recurring'
            next_trigger_time TEXT    NOT NULL,   -- ISO-8601 UTC
            is_active         INTEGER NOT NULL DEFAULT 1,
            recurring         TEXT,               -- JSON-encoded RecurringConfig, NULL for one-shot
            created_at        TEXT    NOT NULL,
            updated_at        TEXT    NOT NULL
        ) STRICT;

        -- Due scan: WHERE is_active = 1 AND next_trigger_time <= ? ORDER BY next_trigger_time
        CREATE INDEX IF NOT EXISTS idx_reminders_due
            ON reminders (is_active, next_trigger_time);

        -- Per-user listing in creation order.
        CREATE INDEX IF NOT EXISTS idx_reminders_user
            ON reminders (user_id, created_at);
        ",
    )?;
    Ok(())
}
