// ABOUTME: Submission lifecycle engine: intake, polling, locking, reopening and reminders
// ABOUTME: Shared dependencies, local-calendar helpers, and the per-item batch report
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Shift Sync Contributors

//! Submission lifecycle
//!
//! Every batch here processes records one at a time and isolates failures:
//! an error on one record is logged, recorded in the [`BatchReport`], and the
//! batch moves on.

/// Form-driven document provisioning
pub mod intake;
/// Document lock and unlock
pub mod permissions;
/// Submit-flag polling and acknowledgement
pub mod poll;
/// Reminder cascade, month-start digest, initial request, daily reminder
pub mod reminders;
/// Admin reopen of a submitted record
pub mod reopen;
/// Interval-driven job runner
pub mod scheduler;

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::Serialize;
use tracing::warn;

use crate::database::ReminderRuleManager;
use crate::errors::AppError;
use crate::external::{ChatTransport, DocumentProvider};
use crate::ledger::SubmissionLedger;
use crate::models::MonthKey;
use crate::registry::TeacherRegistry;

/// Collaborators shared by every lifecycle service
#[derive(Clone)]
pub struct LifecycleContext {
    /// Roster
    pub registry: TeacherRegistry,
    /// Ledger
    pub ledger: SubmissionLedger,
    /// Reminder policy and send log
    pub reminder_rules: ReminderRuleManager,
    /// Outbound chat
    pub chat: Arc<dyn ChatTransport>,
    /// Teacher documents
    pub documents: Arc<dyn DocumentProvider>,
    /// Administrator chat identity
    pub admin_chat_user_id: Option<String>,
    /// Local calendar
    pub timezone: FixedOffset,
}

impl LifecycleContext {
    /// Local calendar date of an instant
    #[must_use]
    pub fn local_date(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.timezone).date_naive()
    }

    /// Local month of an instant
    #[must_use]
    pub fn current_month(&self, now: DateTime<Utc>) -> MonthKey {
        MonthKey::from_date(self.local_date(now))
    }

    /// Whether two instants fall on the same local day
    #[must_use]
    pub fn same_local_day(&self, a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
        self.local_date(a) == self.local_date(b)
    }
}

/// One failed item of a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemFailure {
    /// Record key or recipient
    pub item: String,
    /// Error text
    pub error: String,
}

/// Aggregate outcome of a batch job
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    /// Items that did work
    pub processed: usize,
    /// Items with nothing to do
    pub skipped: usize,
    /// Items that failed
    pub failures: Vec<ItemFailure>,
}

impl BatchReport {
    /// Record a failure and log it
    pub fn fail(&mut self, item: impl Into<String>, error: &AppError) {
        let item = item.into();
        warn!(item = %item, error = %error, "Batch item failed");
        self.failures.push(ItemFailure {
            item,
            error: error.to_string(),
        });
    }

    /// Fold another report into this one
    pub fn merge(&mut self, other: Self) {
        self.processed += other.processed;
        self.skipped += other.skipped;
        self.failures.extend(other.failures);
    }

    /// No item failed
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}
