//! `owl-scheduler` — background engine that fires due reminders.
//!
//! # Overview
//!
//! [`engine::ReminderScheduler`] owns a repeating tick. Each tick scans the
//! store for due reminders, dispatches each through the injected [`Notifier`],
//! and advances or retires the record in one atomic store update. Ticks never
//! overlap, a failed dispatch leaves the record due for the next tick, and a
//! reminder that fell behind during downtime fires once and is re-seated on
//! its original slot cadence.
//!
//! The store and notifier are explicit constructor arguments, so the engine
//! runs unchanged against an in-memory store and a fake notifier in tests.

pub mod engine;
pub mod notifier;

pub use engine::{ReminderScheduler, SchedulerConfig};
pub use notifier::{Notifier, NotifyError};
