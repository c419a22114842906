//! Time-specification parsing for reminder creation and edits.
//!
//! Accepted forms (all interpreted in UTC):
//!
//! | Form                  | Meaning                                    |
//! |-----------------------|--------------------------------------------|
//! | `14:30`               | Today at 14:30, or tomorrow if past        |
//! | `15m` / `2h` / `1d`   | Offset from now                            |
//! | `2024-07-15 14:30`    | Absolute (also `T` separator, RFC3339)     |
//! | `2024-07-15`          | Absolute, midnight                         |

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum TimeSpecError {
    /// The string matched none of the accepted forms.
    #[error("Unrecognised time specification: {0:?}")]
    Unrecognised(String),

    /// A relative offset of zero units ("0m") never produces a future time.
    #[error("Time offset must be positive")]
    ZeroOffset,

    /// An absolute specification resolved to a non-future instant.
    #[error("Time {0} is not in the future")]
    NotInFuture(DateTime<Utc>),
}

/// Resolve a user-supplied time specification against an explicit `now`.
///
/// Pure: the caller supplies the reference instant, so the same inputs always
/// produce the same output (or the same error).
pub fn parse_time_spec(spec: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>, TimeSpecError> {
    let spec = spec.trim();
    if spec.is_empty() {
        return Err(TimeSpecError::Unrecognised(spec.to_string()));
    }

    if let Some(result) = parse_relative(spec, now) {
        return result;
    }

    // Bare time of day rolls to tomorrow when today's slot has passed, so it
    // is always in the future.
    if let Ok(t) = NaiveTime::parse_from_str(spec, "%H:%M") {
        let candidate = now.date_naive().and_time(t).and_utc();
        return Ok(if candidate > now {
            candidate
        } else {
            candidate + Duration::days(1)
        });
    }

    for fmt in ["%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(spec, fmt) {
            return require_future(naive.and_utc(), now);
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(spec) {
        return require_future(dt.with_timezone(&Utc), now);
    }
    if let Ok(d) = NaiveDate::parse_from_str(spec, "%Y-%m-%d") {
        return require_future(d.and_time(NaiveTime::MIN).and_utc(), now);
    }

    Err(TimeSpecError::Unrecognised(spec.to_string()))
}

/// Parse `"<n>m" | "<n>h" | "<n>d"`. Returns `None` when the string is not a
/// relative offset at all (so absolute parsing can still be attempted).
fn parse_relative(
    spec: &str,
    now: DateTime<Utc>,
) -> Option<Result<DateTime<Utc>, TimeSpecError>> {
    if !spec.is_ascii() {
        return None;
    }
    let (digits, unit) = spec.split_at(spec.len().checked_sub(1)?);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let n: i64 = digits.parse().ok()?;
    let offset = match unit {
        "m" => Duration::minutes(n),
        "h" => Duration::hours(n),
        "d" => Duration::days(n),
        _ => return None,
    };
    if n == 0 {
        return Some(Err(TimeSpecError::ZeroOffset));
    }
    Some(Ok(now + offset))
}

fn require_future(
    candidate: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>, TimeSpecError> {
    if candidate > now {
        Ok(candidate)
    } else {
        Err(TimeSpecError::NotInFuture(candidate))
    }
}
