use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use owl_reminders::recurrence::{compute_next, NextOccurrence};
use owl_reminders::store::ReminderStore;
use owl_reminders::types::ReminderKind;
use owl_reminders::Result;

use crate::notifier::{Notifier, NotifyError};

/// Tunables for the tick loop.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Time between due scans.
    pub tick_interval: Duration,
    /// Per-dispatch wait bound; exceeding it counts as a dispatch failure.
    pub dispatch_timeout: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(owl_core::config::DEFAULT_TICK_SECS),
            dispatch_timeout: Duration::from_secs(owl_core::config::DEFAULT_DISPATCH_TIMEOUT_SECS),
        }
    }
}

struct Running {
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Periodic due-scan-and-dispatch engine.
///
/// Lifecycle is `Stopped → Running → Stopped`: [`start`](Self::start) is a
/// no-op while running, [`stop`](Self::stop) is idempotent and cooperative —
/// an in-flight tick finishes, no new tick begins after `stop` returns.
pub struct ReminderScheduler {
    store: Arc<ReminderStore>,
    notifier: Arc<dyn Notifier>,
    config: SchedulerConfig,
    running: Mutex<Option<Running>>,
}

impl ReminderScheduler {
    pub fn new(
        store: Arc<ReminderStore>,
        notifier: Arc<dyn Notifier>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            store,
            notifier,
            config,
            running: Mutex::new(None),
        }
    }

    /// Begin ticking. Silently does nothing if already running.
    pub fn start(&self) {
        let mut running = self.running.lock().unwrap();
        if running.as_ref().is_some_and(|r| !r.handle.is_finished()) {
            debug!("scheduler already running; start ignored");
            return;
        }
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let store = Arc::clone(&self.store);
        let notifier = Arc::clone(&self.notifier);
        let config = self.config.clone();
        let handle = tokio::spawn(run_loop(store, notifier, config, shutdown_rx));
        *running = Some(Running {
            shutdown_tx,
            handle,
        });
        info!("reminder scheduler started");
    }

    /// Cancel future ticks and wait for the loop task to finish.
    ///
    /// Does not interrupt a tick already in progress; once this returns, no
    /// new tick will begin. Safe to call repeatedly.
    pub async fn stop(&self) {
        let running = self.running.lock().unwrap().take();
        let Some(running) = running else {
            return;
        };
        let _ = running.shutdown_tx.send(true);
        if let Err(e) = running.handle.await {
            error!("scheduler task join failed: {e}");
        }
        info!("reminder scheduler stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running
            .lock()
            .unwrap()
            .as_ref()
            .is_some_and(|r| !r.handle.is_finished())
    }
}

/// Tick loop. Each tick is awaited inline and the interval skips (never
/// queues) missed firings, so two ticks can never run concurrently.
async fn run_loop(
    store: Arc<ReminderStore>,
    notifier: Arc<dyn Notifier>,
    config: SchedulerConfig,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut interval = tokio::time::interval(config.tick_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            _ = interval.tick() => {
                run_tick(&store, notifier.as_ref(), config.dispatch_timeout, Utc::now()).await;
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    info!("reminder scheduler shutting down");
                    break;
                }
            }
        }
    }
}

/// One due-scan-and-dispatch cycle at reference time `now`.
///
/// Each due reminder is processed in isolation: a failed or timed-out
/// dispatch leaves that record untouched (it stays due and is retried next
/// tick) and never aborts the rest of the due set.
async fn run_tick(
    store: &ReminderStore,
    notifier: &dyn Notifier,
    dispatch_timeout: Duration,
    now: DateTime<Utc>,
) {
    let due = match store.list_due(now) {
        Ok(due) => due,
        Err(e) => {
            error!("due scan failed: {e}");
            return;
        }
    };

    for reminder in due {
        let content = reminder.render_content();
        let sent =
            tokio::time::timeout(dispatch_timeout, notifier.send(&reminder.channel_id, &content))
                .await;
        match sent {
            Ok(Ok(())) => {
                debug!(reminder_id = %reminder.id, channel_id = %reminder.channel_id, "reminder dispatched");
                if let Err(e) = advance_after_fire(store, &reminder.id, now) {
                    error!(reminder_id = %reminder.id, "post-fire advance failed: {e}");
                }
            }
            Ok(Err(e)) => {
                warn!(reminder_id = %reminder.id, error = %e, "dispatch failed; reminder stays due");
            }
            Err(_) => {
                let e = NotifyError::Timeout {
                    ms: dispatch_timeout.as_millis() as u64,
                };
                warn!(reminder_id = %reminder.id, error = %e, "dispatch timed out; reminder stays due");
            }
        }
    }
}

/// Record a successful firing: one atomic store update that bumps the count,
/// retires one-shot (and exhausted recurring) reminders, and re-seats
/// recurring ones on their next future slot.
///
/// The advance folds `compute_next` from the record's *original* trigger time
/// until the result passes `now`, so a reminder that fell days behind during
/// downtime fires once for the whole backlog and keeps its slot cadence.
fn advance_after_fire(store: &ReminderStore, id: &str, now: DateTime<Utc>) -> Result<()> {
    store.update(id, |r| {
        // An edit may have retired or rescheduled the reminder while the
        // dispatch was in flight; such records are left alone.
        if !r.is_active || r.next_trigger_time > now {
            debug!(reminder_id = %r.id, "reminder changed during dispatch; advance skipped");
            return Ok(());
        }
        match (r.kind, r.recurring.as_mut()) {
            (ReminderKind::Once, _) => {
                r.is_active = false;
            }
            (ReminderKind::Recurring, Some(cfg)) => {
                cfg.current_count += 1;
                let mut slot = r.next_trigger_time;
                loop {
                    match compute_next(cfg, slot)? {
                        NextOccurrence::Exhausted => {
                            r.is_active = false;
                            break;
                        }
                        NextOccurrence::At(t) if t > now => {
                            r.next_trigger_time = t;
                            break;
                        }
                        // Slot still in the past — skip it without re-firing.
                        NextOccurrence::At(t) => slot = t,
                    }
                }
            }
            (ReminderKind::Recurring, None) => {
                // Unrepresentable through the service; retire rather than
                // re-fire forever.
                warn!(reminder_id = %r.id, "recurring reminder without config; retiring");
                r.is_active = false;
            }
        }
        Ok(())
    })?;
    Ok(())
}
