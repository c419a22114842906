use thiserror::Error;

/// Errors that can occur within the reminder subsystem.
#[derive(Debug, Error)]
pub enum ReminderError {
    /// Underlying SQLite / rusqlite error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Caller mistake: bad time specification, malformed recurrence config,
    /// a day filter admitting no weekday. Never retried.
    #[error("Validation error: {0}")]
    Validation(String),

    /// No reminder with the given ID exists in the store.
    #[error("Reminder not found: {id}")]
    NotFound { id: String },

    /// A stored recurrence config could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ReminderError>;
