//! Pure recurrence arithmetic.
//!
//! Nothing here reads the wall clock: the reference instant is always an
//! explicit argument, so the creation path and the scheduler's advance both
//! get identical answers for identical inputs.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};

use crate::error::{ReminderError, Result};
use crate::types::{DayFilter, Recurrence, RecurringConfig};

/// Outcome of a recurrence step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextOccurrence {
    /// The next valid trigger instant.
    At(DateTime<Utc>),
    /// A stop condition holds — no further occurrence is permitted.
    /// Terminal signal, not an error.
    Exhausted,
}

/// Compute the next valid trigger time for `cfg`, stepping from `from`.
///
/// The raw period step is applied first, then the day filter, then the stop
/// conditions (`end_date`, `max_occurrences`). The result, when present, is
/// strictly greater than `from`.
pub fn compute_next(cfg: &RecurringConfig, from: DateTime<Utc>) -> Result<NextOccurrence> {
    if cfg.max_occurrences.is_some_and(|max| cfg.current_count >= max) {
        return Ok(NextOccurrence::Exhausted);
    }

    let raw = match cfg.recurrence {
        Recurrence::Daily => from + Duration::days(1),
        Recurrence::Weekly => from + Duration::days(7),
        Recurrence::Monthly => add_one_month(from),
        Recurrence::Custom { minutes } => from + Duration::minutes(i64::from(minutes)),
    };

    let candidate = match &cfg.day_filter {
        Some(filter) => align_to_filter(raw, filter)?,
        None => raw,
    };

    if cfg.end_date.is_some_and(|end| candidate.date_naive() > end) {
        return Ok(NextOccurrence::Exhausted);
    }

    Ok(NextOccurrence::At(candidate))
}

/// Advance `t` one day at a time until its weekday is admitted by `filter`.
///
/// Seven steps visit every weekday once, so a valid filter always terminates
/// within the loop; a filter admitting no weekday is a validation error
/// (callers reject such filters at create/edit time already).
pub fn align_to_filter(t: DateTime<Utc>, filter: &DayFilter) -> Result<DateTime<Utc>> {
    let mut candidate = t;
    for _ in 0..7 {
        if filter.admits(candidate.weekday()) {
            return Ok(candidate);
        }
        candidate += Duration::days(1);
    }
    Err(ReminderError::Validation(
        "day filter admits no weekday".into(),
    ))
}

/// Same day-of-month next month, clamped to the target month's last day.
/// Time of day is preserved.
fn add_one_month(from: DateTime<Utc>) -> DateTime<Utc> {
    let (year, month) = if from.month() == 12 {
        (from.year() + 1, 1)
    } else {
        (from.year(), from.month() + 1)
    };
    let day = from.day().min(days_in_month(year, month));
    match NaiveDate::from_ymd_opt(year, month, day) {
        Some(date) => date.and_time(from.time()).and_utc(),
        // Unreachable with a clamped day; fall back to a plain 31-day step.
        None => from + Duration::days(31),
    }
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .map(|first| (first - Duration::days(1)).day())
        .unwrap_or(28)
}
