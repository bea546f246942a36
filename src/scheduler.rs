//! # Reminder Scheduler
//!
//! Background task that sends each user the list of their plans for the day,
//! once per calendar day at a configured local time.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, error, info, warn};

use crate::bot::ui_builder::format_reminder;
use crate::errors::AssistantError;
use crate::models::PlanEntry;
use crate::storage::Storage;

/// Outbound channel for reminder messages
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, user_id: i64, text: &str) -> Result<(), AssistantError>;
}

/// Source of the current local wall-clock time
pub type Clock = Arc<dyn Fn() -> NaiveDateTime + Send + Sync>;

pub fn local_clock() -> Clock {
    Arc::new(|| Local::now().naive_local())
}

/// Outcome of one reminder run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReminderReport {
    pub recipients: usize,
    pub delivered: usize,
    pub failed: usize,
}

pub struct ReminderScheduler {
    storage: Arc<dyn Storage>,
    notifier: Arc<dyn Notifier>,
    fire_at: NaiveTime,
    period: Duration,
    language: &'static str,
    clock: Clock,
    last_run: Option<NaiveDate>,
    load_failure_logged: Option<NaiveDate>,
}

impl ReminderScheduler {
    pub fn new(
        storage: Arc<dyn Storage>,
        notifier: Arc<dyn Notifier>,
        fire_at: NaiveTime,
        period: Duration,
        language: &'static str,
    ) -> Self {
        Self {
            storage,
            notifier,
            fire_at,
            period,
            language,
            clock: local_clock(),
            last_run: None,
            load_failure_logged: None,
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn last_run(&self) -> Option<NaiveDate> {
        self.last_run
    }

    /// Whether the reminder for the day of `now` is still pending
    pub fn is_due(&self, now: NaiveDateTime) -> bool {
        now.time() >= self.fire_at && self.last_run != Some(now.date())
    }

    /// Mark today as handled when the fire time already passed at startup
    pub fn prime(&mut self) {
        let now = (self.clock)();
        if now.time() >= self.fire_at {
            debug!(date = %now.date(), "Reminder time already passed today, skipping until tomorrow");
            self.last_run = Some(now.date());
        }
    }

    /// Run one tick; returns the report when a reminder run happened
    pub async fn tick(&mut self) -> Option<ReminderReport> {
        let now = (self.clock)();
        if !self.is_due(now) {
            return None;
        }

        let today = now.date();
        match self.send_daily_reminders(today).await {
            Ok(report) => {
                self.last_run = Some(today);
                info!(
                    date = %today,
                    recipients = report.recipients,
                    delivered = report.delivered,
                    failed = report.failed,
                    "Daily reminders sent"
                );
                Some(report)
            }
            Err(e) => {
                // last_run stays unset so the next tick retries
                if self.note_load_failure(today) {
                    error!(date = %today, error = %e, "Failed to load plans for reminders");
                } else {
                    debug!(date = %today, error = %e, "Reminder load still failing, retrying next tick");
                }
                None
            }
        }
    }

    /// True for the first failed load of `today`
    fn note_load_failure(&mut self, today: NaiveDate) -> bool {
        if self.load_failure_logged == Some(today) {
            return false;
        }
        self.load_failure_logged = Some(today);
        true
    }

    /// Send every user with plans on `date` one message listing them
    pub async fn send_daily_reminders(&self, date: NaiveDate) -> Result<ReminderReport, AssistantError> {
        let plans = self.storage.plans_on(date).await?;

        let mut by_user: BTreeMap<i64, Vec<PlanEntry>> = BTreeMap::new();
        for plan in plans {
            by_user.entry(plan.user_id).or_default().push(plan);
        }

        let mut report = ReminderReport {
            recipients: by_user.len(),
            ..ReminderReport::default()
        };

        for (user_id, mut user_plans) in by_user {
            user_plans.sort_by(|a, b| a.time.cmp(&b.time));
            let text = format_reminder(&user_plans, self.language);

            match self.notifier.notify(user_id, &text).await {
                Ok(()) => {
                    debug!(user_id, plans = user_plans.len(), "Reminder delivered");
                    report.delivered += 1;
                }
                Err(e) => {
                    warn!(user_id, error = %e, "Failed to deliver reminder");
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    /// Start the tick loop on the runtime
    pub fn spawn(mut self) -> SchedulerHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            self.prime();
            info!(fire_at = %self.fire_at, tick_secs = self.period.as_secs(), "Reminder scheduler started");

            let mut interval = time::interval(self.period);
            interval.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        self.tick().await;
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }

            info!("Reminder scheduler stopped");
        });

        SchedulerHandle { shutdown_tx, task }
    }
}

/// Handle to a running scheduler task
pub struct SchedulerHandle {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Stop the loop and wait for the task to finish
    pub async fn shutdown(self) {
        // An Err means the task is already gone
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.task.await {
            error!(error = %e, "Reminder scheduler task panicked");
        }
    }
}
