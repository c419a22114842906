use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::{ReminderError, Result};

/// Whether a reminder fires once or repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderKind {
    /// Fires exactly once, then is retired atomically with that firing.
    Once,
    /// Fires according to its [`RecurringConfig`] until a stop condition holds.
    Recurring,
}

impl std::fmt::Display for ReminderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ReminderKind::Once => "once",
            ReminderKind::Recurring => "recurring",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for ReminderKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "once" => Ok(ReminderKind::Once),
            "recurring" => Ok(ReminderKind::Recurring),
            other => Err(format!("unknown reminder kind: {other}")),
        }
    }
}

/// How often a recurring reminder repeats.
///
/// `Custom` carries its interval inline — a custom recurrence without a
/// magnitude is unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "interval", rename_all = "snake_case")]
pub enum Recurrence {
    /// Same time of day, one day later.
    Daily,
    /// Same time of day, seven days later.
    Weekly,
    /// Same day-of-month next month, clamped to the month's last day.
    Monthly,
    /// Fixed interval in minutes.
    Custom { minutes: u32 },
}

/// Restricts which weekdays a recurring reminder may fire on.
///
/// Day numbers follow the original command syntax: 0 = Sunday … 6 = Saturday.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayFilter {
    /// Never fire on Saturday or Sunday.
    #[serde(default)]
    pub skip_weekends: bool,
    /// If set, fire only on these days. `None` allows every day.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_days: Option<BTreeSet<u8>>,
}

impl DayFilter {
    /// Does this filter allow firing on `weekday`?
    pub fn admits(&self, weekday: Weekday) -> bool {
        let day = weekday.num_days_from_sunday() as u8;
        if self.skip_weekends && (day == 0 || day == 6) {
            return false;
        }
        match &self.allowed_days {
            Some(days) => days.contains(&day),
            None => true,
        }
    }

    /// Reject filters that could never fire.
    ///
    /// Checked at create/edit time so the scheduler never has to walk a
    /// filter that admits no weekday.
    pub fn validate(&self) -> Result<()> {
        if let Some(days) = &self.allowed_days {
            if let Some(bad) = days.iter().find(|d| **d > 6) {
                return Err(ReminderError::Validation(format!(
                    "invalid day number {bad} (use 0=Sunday … 6=Saturday)"
                )));
            }
            if days.is_empty() {
                return Err(ReminderError::Validation(
                    "allowed_days must name at least one day".into(),
                ));
            }
        }
        let all = [
            Weekday::Sun,
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
            Weekday::Sat,
        ];
        if !all.iter().any(|w| self.admits(*w)) {
            return Err(ReminderError::Validation(
                "day filter admits no weekday".into(),
            ));
        }
        Ok(())
    }
}

/// Recurrence settings and progress for a recurring reminder.
///
/// Stored as a JSON string in the `reminders.recurring` column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurringConfig {
    #[serde(flatten)]
    pub recurrence: Recurrence,
    /// Weekday constraint applied after every raw period step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day_filter: Option<DayFilter>,
    /// Last calendar date an occurrence may be scheduled on (inclusive).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    /// Upper bound on total firings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_occurrences: Option<u32>,
    /// Firings so far. Only the scheduler's advance increments this.
    #[serde(default)]
    pub current_count: u32,
}

/// A persisted reminder record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reminder {
    /// UUID v4 string — primary key, assigned at creation.
    pub id: String,
    /// Owner. Only used for listing; ownership checks live in the command layer.
    pub user_id: String,
    /// Delivery destination channel.
    pub channel_id: String,
    /// Guild the reminder was created in.
    pub guild_id: String,
    pub title: String,
    pub message: String,
    pub kind: ReminderKind,
    /// Single source of truth for "when does this fire next" (UTC).
    pub next_trigger_time: DateTime<Utc>,
    /// `false` means retired — never selected by the scheduler again.
    pub is_active: bool,
    /// Present iff `kind == Recurring`.
    pub recurring: Option<RecurringConfig>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Reminder {
    /// Message body handed to the notifier when this reminder fires.
    pub fn render_content(&self) -> String {
        format!("**{}**\n{}", self.title, self.message)
    }
}
