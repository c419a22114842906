use std::sync::Arc;

use chrono::Utc;
use owl_core::timespec::parse_time_spec;
use tracing::debug;

use crate::error::{ReminderError, Result};
use crate::recurrence::align_to_filter;
use crate::store::{NewReminder, ReminderStore};
use crate::types::{Recurrence, RecurringConfig, Reminder, ReminderKind};

/// Request payload for [`ReminderService::create_reminder`].
///
/// `time` is the raw user-supplied specification string; `recurring` must be
/// present iff `kind` is [`ReminderKind::Recurring`]. Any `current_count` the
/// caller supplies is ignored — new reminders always start at zero.
#[derive(Debug, Clone)]
pub struct CreateReminder {
    pub user_id: String,
    pub channel_id: String,
    pub guild_id: String,
    pub title: String,
    pub message: String,
    pub time: String,
    pub kind: ReminderKind,
    pub recurring: Option<RecurringConfig>,
}

/// Partial-update payload for [`ReminderService::update_reminder`].
/// `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct UpdateReminder {
    pub title: Option<String>,
    pub message: Option<String>,
    pub time: Option<String>,
    pub is_active: Option<bool>,
}

/// Facade the command layer calls. Validates input, resolves time
/// specifications, and hands fully-formed records to the store.
///
/// Never mutates a record directly: everything goes through the store's
/// atomic operations, and the firing bookkeeping (`current_count`) belongs to
/// the scheduler alone.
pub struct ReminderService {
    store: Arc<ReminderStore>,
}

impl ReminderService {
    pub fn new(store: Arc<ReminderStore>) -> Self {
        Self { store }
    }

    /// Create a reminder from raw command input.
    pub fn create_reminder(&self, data: CreateReminder) -> Result<Reminder> {
        let now = Utc::now();
        let mut next = parse_time_spec(&data.time, now)
            .map_err(|e| ReminderError::Validation(e.to_string()))?;

        let recurring = match (data.kind, data.recurring) {
            (ReminderKind::Recurring, Some(mut cfg)) => {
                cfg.current_count = 0;
                validate_recurring(&cfg)?;
                // The seed trigger must already satisfy the day filter
                // (invariant: every trigger time the record ever holds does).
                if let Some(filter) = &cfg.day_filter {
                    next = align_to_filter(next, filter)?;
                }
                if cfg.end_date.is_some_and(|end| next.date_naive() > end) {
                    return Err(ReminderError::Validation(
                        "first occurrence falls after the end date".into(),
                    ));
                }
                Some(cfg)
            }
            (ReminderKind::Recurring, None) => {
                return Err(ReminderError::Validation(
                    "recurring reminders require a recurrence interval".into(),
                ));
            }
            (ReminderKind::Once, Some(_)) => {
                return Err(ReminderError::Validation(
                    "one-shot reminders cannot carry a recurrence config".into(),
                ));
            }
            (ReminderKind::Once, None) => None,
        };

        debug!(user_id = %data.user_id, next = %next, "creating reminder");
        self.store.create(NewReminder {
            user_id: data.user_id,
            channel_id: data.channel_id,
            guild_id: data.guild_id,
            title: data.title,
            message: data.message,
            kind: data.kind,
            next_trigger_time: next,
            recurring,
        })
    }

    /// All reminders owned by `user_id`, in creation order.
    pub fn get_user_reminders(&self, user_id: &str) -> Result<Vec<Reminder>> {
        self.store.list_by_user(user_id)
    }

    /// Apply a partial edit. Owner-mutable fields only; firing bookkeeping
    /// is never touched here.
    pub fn update_reminder(&self, id: &str, fields: UpdateReminder) -> Result<Reminder> {
        let now = Utc::now();
        self.store.update(id, move |r| {
            if let Some(title) = fields.title {
                if title.trim().is_empty() {
                    return Err(ReminderError::Validation("title must not be empty".into()));
                }
                r.title = title;
            }
            if let Some(message) = fields.message {
                if message.trim().is_empty() {
                    return Err(ReminderError::Validation(
                        "message must not be empty".into(),
                    ));
                }
                r.message = message;
            }
            if let Some(spec) = fields.time {
                let mut next = parse_time_spec(&spec, now)
                    .map_err(|e| ReminderError::Validation(e.to_string()))?;
                if let Some(cfg) = r.recurring.as_ref() {
                    if let Some(filter) = cfg.day_filter.as_ref() {
                        next = align_to_filter(next, filter)?;
                    }
                    // Same bound as creation: no trigger may ever sit past
                    // the end date.
                    if cfg.end_date.is_some_and(|end| next.date_naive() > end) {
                        return Err(ReminderError::Validation(
                            "new time falls after the end date".into(),
                        ));
                    }
                }
                r.next_trigger_time = next;
            }
            if let Some(active) = fields.is_active {
                r.is_active = active;
            }
            Ok(())
        })
    }

    /// Delete a reminder. Returns whether it existed.
    pub fn delete_reminder(&self, id: &str) -> Result<bool> {
        self.store.delete(id)
    }
}

fn validate_recurring(cfg: &RecurringConfig) -> Result<()> {
    if let Recurrence::Custom { minutes } = cfg.recurrence {
        if minutes == 0 {
            return Err(ReminderError::Validation(
                "custom interval must be at least one minute".into(),
            ));
        }
    }
    if cfg.max_occurrences == Some(0) {
        return Err(ReminderError::Validation(
            "max_occurrences must be at least one".into(),
        ));
    }
    if let Some(filter) = &cfg.day_filter {
        filter.validate()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DayFilter;
    use chrono::{Datelike, Weekday};
    use rusqlite::Connection;

    fn service() -> (ReminderService, Arc<ReminderStore>) {
        let store = Arc::new(
            ReminderStore::new(Connection::open_in_memory().expect("open")).expect("init"),
        );
        (ReminderService::new(Arc::clone(&store)), store)
    }

    fn create_data() -> CreateReminder {
        CreateReminder {
            user_id: "u1".into(),
            channel_id: "c1".into(),
            guild_id: "g1".into(),
            title: "standup".into(),
            message: "daily standup in #dev".into(),
            time: "2999-01-15 09:00".into(),
            kind: ReminderKind::Once,
            recurring: None,
        }
    }

    fn recurring_cfg(recurrence: Recurrence) -> RecurringConfig {
        RecurringConfig {
            recurrence,
            day_filter: None,
            end_date: None,
            max_occurrences: None,
            current_count: 0,
        }
    }

    #[test]
    fn create_once_resolves_absolute_time() {
        let (service, _) = service();
        let reminder = service.create_reminder(create_data()).expect("create");
        assert_eq!(reminder.kind, ReminderKind::Once);
        assert_eq!(
            reminder.next_trigger_time.to_rfc3339(),
            "2999-01-15T09:00:00+00:00"
        );
    }

    #[test]
    fn create_with_bad_time_spec_is_validation_error() {
        let (service, _) = service();
        let mut data = create_data();
        data.time = "whenever".into();
        assert!(matches!(
            service.create_reminder(data),
            Err(ReminderError::Validation(_))
        ));
    }

    #[test]
    fn recurring_without_interval_is_rejected() {
        let (service, _) = service();
        let mut data = create_data();
        data.kind = ReminderKind::Recurring;
        assert!(matches!(
            service.create_reminder(data),
            Err(ReminderError::Validation(_))
        ));
    }

    #[test]
    fn custom_interval_of_zero_minutes_is_rejected() {
        let (service, _) = service();
        let mut data = create_data();
        data.kind = ReminderKind::Recurring;
        data.recurring = Some(recurring_cfg(Recurrence::Custom { minutes: 0 }));
        assert!(matches!(
            service.create_reminder(data),
            Err(ReminderError::Validation(_))
        ));
    }

    #[test]
    fn impossible_day_filter_is_rejected_at_creation() {
        let (service, _) = service();
        let mut data = create_data();
        data.kind = ReminderKind::Recurring;
        let mut cfg = recurring_cfg(Recurrence::Daily);
        cfg.day_filter = Some(DayFilter {
            skip_weekends: true,
            allowed_days: Some([0, 6].into()),
        });
        data.recurring = Some(cfg);
        assert!(matches!(
            service.create_reminder(data),
            Err(ReminderError::Validation(_))
        ));
    }

    #[test]
    fn zero_max_occurrences_is_rejected() {
        let (service, _) = service();
        let mut data = create_data();
        data.kind = ReminderKind::Recurring;
        let mut cfg = recurring_cfg(Recurrence::Daily);
        cfg.max_occurrences = Some(0);
        data.recurring = Some(cfg);
        assert!(matches!(
            service.create_reminder(data),
            Err(ReminderError::Validation(_))
        ));
    }

    #[test]
    fn seed_trigger_is_aligned_to_the_day_filter() {
        let (service, _) = service();
        let mut data = create_data();
        data.kind = ReminderKind::Recurring;
        let mut cfg = recurring_cfg(Recurrence::Weekly);
        // Mondays only (1 in the 0=Sunday numbering).
        cfg.day_filter = Some(DayFilter {
            skip_weekends: false,
            allowed_days: Some([1].into()),
        });
        data.recurring = Some(cfg);
        let reminder = service.create_reminder(data).expect("create");
        assert_eq!(reminder.next_trigger_time.weekday(), Weekday::Mon);
    }

    #[test]
    fn caller_supplied_count_is_reset_to_zero() {
        let (service, _) = service();
        let mut data = create_data();
        data.kind = ReminderKind::Recurring;
        let mut cfg = recurring_cfg(Recurrence::Daily);
        cfg.current_count = 9;
        data.recurring = Some(cfg);
        let reminder = service.create_reminder(data).expect("create");
        assert_eq!(
            reminder.recurring.expect("recurring config").current_count,
            0
        );
    }

    #[test]
    fn update_changes_only_given_fields() {
        let (service, _) = service();
        let created = service.create_reminder(create_data()).expect("create");
        let updated = service
            .update_reminder(
                &created.id,
                UpdateReminder {
                    title: Some("retro".into()),
                    ..Default::default()
                },
            )
            .expect("update");
        assert_eq!(updated.title, "retro");
        assert_eq!(updated.message, created.message);
        assert_eq!(updated.next_trigger_time, created.next_trigger_time);
    }

    #[test]
    fn update_never_touches_firing_count() {
        let (service, store) = service();
        let mut data = create_data();
        data.kind = ReminderKind::Recurring;
        data.recurring = Some(recurring_cfg(Recurrence::Daily));
        let created = service.create_reminder(data).expect("create");

        // Simulate prior firings recorded by the scheduler.
        store
            .update(&created.id, |r| {
                if let Some(cfg) = r.recurring.as_mut() {
                    cfg.current_count = 5;
                }
                Ok(())
            })
            .expect("seed count");

        let updated = service
            .update_reminder(
                &created.id,
                UpdateReminder {
                    title: Some("renamed".into()),
                    ..Default::default()
                },
            )
            .expect("update");
        assert_eq!(
            updated.recurring.expect("recurring config").current_count,
            5
        );
    }

    #[test]
    fn update_time_realigns_to_day_filter() {
        let (service, _) = service();
        let mut data = create_data();
        data.kind = ReminderKind::Recurring;
        let mut cfg = recurring_cfg(Recurrence::Daily);
        cfg.day_filter = Some(DayFilter {
            skip_weekends: false,
            allowed_days: Some([3].into()), // Wednesdays only
        });
        data.recurring = Some(cfg);
        let created = service.create_reminder(data).expect("create");

        let updated = service
            .update_reminder(
                &created.id,
                UpdateReminder {
                    time: Some("2999-06-01 10:00".into()),
                    ..Default::default()
                },
            )
            .expect("update");
        assert_eq!(updated.next_trigger_time.weekday(), Weekday::Wed);
    }

    #[test]
    fn update_time_cannot_pass_the_end_date() {
        let (service, _) = service();
        let mut data = create_data();
        data.kind = ReminderKind::Recurring;
        let mut cfg = recurring_cfg(Recurrence::Daily);
        cfg.end_date = chrono::NaiveDate::from_ymd_opt(2999, 1, 20);
        data.recurring = Some(cfg);
        let created = service.create_reminder(data).expect("create");

        // Within the bound: fine.
        let updated = service
            .update_reminder(
                &created.id,
                UpdateReminder {
                    time: Some("2999-01-18 09:00".into()),
                    ..Default::default()
                },
            )
            .expect("update within end date");
        assert_eq!(
            updated.next_trigger_time.to_rfc3339(),
            "2999-01-18T09:00:00+00:00"
        );

        // Past the bound: rejected, record untouched.
        assert!(matches!(
            service.update_reminder(
                &created.id,
                UpdateReminder {
                    time: Some("2999-02-01 09:00".into()),
                    ..Default::default()
                },
            ),
            Err(ReminderError::Validation(_))
        ));
        let after = service.get_user_reminders("u1").expect("list");
        assert_eq!(
            after[0].next_trigger_time.to_rfc3339(),
            "2999-01-18T09:00:00+00:00"
        );
    }

    #[test]
    fn update_missing_reminder_is_not_found() {
        let (service, _) = service();
        assert!(matches!(
            service.update_reminder("nope", UpdateReminder::default()),
            Err(ReminderError::NotFound { .. })
        ));
    }

    #[test]
    fn delete_reports_existence() {
        let (service, _) = service();
        let created = service.create_reminder(create_data()).expect("create");
        assert!(service.delete_reminder(&created.id).expect("delete"));
        assert!(!service.delete_reminder(&created.id).expect("delete again"));
    }
}
