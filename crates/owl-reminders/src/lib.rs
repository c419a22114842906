//! `owl-reminders` — reminder domain model with SQLite persistence.
//!
//! # Overview
//!
//! Reminders live in a SQLite `reminders` table behind [`store::ReminderStore`],
//! the single shared mutable resource of the system. All mutation — user edits
//! through [`service::ReminderService`] and scheduler advances — goes through
//! the store's atomic `update`, so concurrent paths can never observe or
//! produce a half-applied record.
//!
//! Recurrence arithmetic is a pure function in [`recurrence`]; it is called
//! from the creation path (to seed the first trigger) and from the scheduler
//! (to advance past a firing), never from anywhere else.
//!
//! # Recurrence variants
//!
//! | Variant   | Behaviour                                             |
//! |-----------|-------------------------------------------------------|
//! | `Daily`   | Same time of day, +1 day                              |
//! | `Weekly`  | Same time of day, +7 days                             |
//! | `Monthly` | Same day-of-month next month, clamped to month end    |
//! | `Custom`  | Fixed interval in minutes                             |

pub mod db;
pub mod error;
pub mod recurrence;
pub mod service;
pub mod store;
pub mod types;

pub use error::{ReminderError, Result};
pub use service::{CreateReminder, ReminderService, UpdateReminder};
pub use store::{NewReminder, ReminderStore};
pub use types::{DayFilter, Recurrence, RecurringConfig, Reminder, ReminderKind};
