// ABOUTME: Interval-driven job runner for document polling and the daily reminder run
// ABOUTME: Each job goes through the admin alerter; the loop stops on the shutdown future
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Shift Sync Contributors

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Timelike, Utc};
use serde_json::{json, Value};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::poll::SubmissionPoller;
use super::reminders::ReminderEngine;
use super::{BatchReport, LifecycleContext};
use crate::alerts::AdminAlerter;
use crate::config::ScheduleConfig;
use crate::database::ConversationStateStore;

/// How often the loop checks whether the reminder hour has arrived
const REMINDER_CHECK_INTERVAL: Duration = Duration::from_secs(60);

fn trigger_context(now: DateTime<Utc>) -> Value {
    json!({ "triggeredAt": now.to_rfc3339() })
}

/// Runs the poll and reminder jobs
#[derive(Clone)]
pub struct Scheduler {
    ctx: LifecycleContext,
    poller: SubmissionPoller,
    reminders: ReminderEngine,
    states: ConversationStateStore,
    alerter: AdminAlerter,
    config: ScheduleConfig,
}

impl Scheduler {
    /// Create a scheduler over shared lifecycle collaborators
    #[must_use]
    pub fn new(
        ctx: LifecycleContext,
        states: ConversationStateStore,
        alerter: AdminAlerter,
        config: ScheduleConfig,
    ) -> Self {
        Self {
            poller: SubmissionPoller::new(ctx.clone()),
            reminders: ReminderEngine::new(ctx.clone()),
            ctx,
            states,
            alerter,
            config,
        }
    }

    /// One poll pass; errors are alerted and yield `None`
    pub async fn run_poll(&self, now: DateTime<Utc>) -> Option<BatchReport> {
        let report = self
            .alerter
            .guard("poll_submissions", Some(&trigger_context(now)), self.poller.run(now))
            .await?;
        self.alerter.report_batch("poll_submissions", &report).await;
        Some(report)
    }

    /// One reminder run plus expired-state cleanup
    pub async fn run_reminders(&self, now: DateTime<Utc>) -> Option<BatchReport> {
        match self.states.purge_expired(now).await {
            Ok(0) => {}
            Ok(purged) => debug!(purged, "Purged expired conversation states"),
            Err(e) => warn!(error = %e, "Failed to purge expired conversation states"),
        }
        let report = self
            .alerter
            .guard("run_reminders", Some(&trigger_context(now)), self.reminders.run(now))
            .await?;
        self.alerter.report_batch("run_reminders", &report).await;
        Some(report)
    }

    /// Both jobs back to back, as a single manual trigger
    pub async fn run_at(&self, now: DateTime<Utc>) -> (Option<BatchReport>, Option<BatchReport>) {
        let poll = self.run_poll(now).await;
        let reminders = self.run_reminders(now).await;
        (poll, reminders)
    }

    /// Whether the reminder run is due: at or after the local reminder hour,
    /// and not yet run today
    #[must_use]
    pub fn reminder_due(&self, now: DateTime<Utc>, last_run: Option<NaiveDate>) -> bool {
        let local = now.with_timezone(&self.config.timezone);
        local.hour() >= self.config.reminder_hour
            && last_run != Some(self.ctx.local_date(now))
    }

    /// Run until `shutdown` resolves
    pub async fn run<S>(self, shutdown: S)
    where
        S: Future<Output = ()> + Send,
    {
        let mut poll_ticker = interval(self.config.poll_interval);
        poll_ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut reminder_ticker = interval(REMINDER_CHECK_INTERVAL);
        reminder_ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut last_reminder_run: Option<NaiveDate> = None;

        info!(
            poll_interval_secs = self.config.poll_interval.as_secs(),
            reminder_hour = self.config.reminder_hour,
            "Scheduler started"
        );

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                () = &mut shutdown => {
                    info!("Scheduler stopping");
                    break;
                }
                _ = poll_ticker.tick() => {
                    self.run_poll(Utc::now()).await;
                }
                _ = reminder_ticker.tick() => {
                    let now = Utc::now();
                    if self.reminder_due(now, last_reminder_run) {
                        last_reminder_run = Some(self.ctx.local_date(now));
                        self.run_reminders(now).await;
                    }
                }
            }
        }
    }
}
