// ABOUTME: Reminder cascade driven by the policy table, plus month-start digest and initial request
// ABOUTME: Every send is claimed in the reminder log first so each rule fires once per subject per day
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Shift Sync Contributors

//! Reminders
//!
//! Four independent duties run on the daily reminder tick:
//!
//! - month-start digest for the previous month (day 1 only)
//! - initial request for next month's submissions
//! - the per-rule cascade for the current and next month
//! - the daily unsubmitted reminder for the latest month in the ledger
//!
//! Gating lives in `reminder_log` (rule, subject, day); the daily reminder
//! additionally stamps `reminder_notified_at` on the record.

use std::collections::HashSet;
use std::fmt::Write;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::{BatchReport, LifecycleContext};
use crate::errors::AppResult;
use crate::external::push_logged;
use crate::ledger::EnsureOutcome;
use crate::messages;
use crate::models::{
    extract_last_name, MonthKey, ReminderAudience, ReminderRule, Submission, SubmissionPatch,
    SubmissionStatus, TemplateVars, INITIAL_REQUEST_RULE_ID,
};
use crate::names::normalize;

/// Reminder-log rule id of the month-start digest
pub const MONTH_START_RULE_ID: &str = "month_start_digest";

/// Reminder-log rule id of the missing-template admin notice
const TEMPLATE_MISSING_RULE_ID: &str = "template_missing";

/// An unsubmitted record as listed in reminders
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEntry {
    /// Ledger key
    pub key: String,
    /// Teacher name on the record
    pub name: String,
    /// Roster id on the record
    pub teacher_id: Option<String>,
    /// Document link, when one was provisioned
    pub url: Option<String>,
}

/// A month's records split by status
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionLists {
    /// Not yet submitted
    pub unapplied: Vec<PendingEntry>,
    /// Submitted teacher names
    pub applied: Vec<String>,
}

impl SubmissionLists {
    /// Split a month's records, dropping teachers on leave
    #[must_use]
    pub fn from_records(records: Vec<Submission>, on_leave: &HashSet<String>) -> Self {
        let mut lists = Self::default();
        for record in records {
            let name = record.teacher_name.trim().to_owned();
            if name.is_empty() || on_leave.contains(&normalize(&name)) {
                continue;
            }
            if record.status == SubmissionStatus::Submitted {
                lists.applied.push(name);
            } else {
                let url = record.document().map(ToOwned::to_owned);
                lists.unapplied.push(PendingEntry {
                    key: record.key,
                    name,
                    teacher_id: record.teacher_id,
                    url,
                });
            }
        }
        lists
    }

    fn with_document(&self) -> impl Iterator<Item = &PendingEntry> {
        self.unapplied.iter().filter(|e| e.url.is_some())
    }

    fn without_document(&self) -> impl Iterator<Item = &PendingEntry> {
        self.unapplied.iter().filter(|e| e.url.is_none())
    }
}

/// Write the numbered unsubmitted section, documented entries first
fn write_unapplied(text: &mut String, lists: &SubmissionLists, missing_label: &str) {
    text.push_str("【未提出者】\n");
    let ordered = lists
        .with_document()
        .map(|e| (e, "シート作成済み"))
        .chain(lists.without_document().map(|e| (e, missing_label)));
    for (index, (entry, label)) in ordered.enumerate() {
        let _ = writeln!(text, "{}. {}（{label}）", index + 1, entry.name);
    }
}

fn write_applied(text: &mut String, applied: &[String]) {
    text.push_str("【提出済み】\n");
    for (index, name) in applied.iter().enumerate() {
        let _ = writeln!(text, "{}. {name}", index + 1);
    }
}

/// `{submissionList}` body of a manager reminder
#[must_use]
pub fn format_submission_list(lists: &SubmissionLists, include_applied: bool) -> String {
    let mut text = String::new();
    if !lists.unapplied.is_empty() {
        write_unapplied(&mut text, lists, "シート未作成");
    }
    if include_applied && !lists.applied.is_empty() {
        if !text.is_empty() {
            text.push('\n');
        }
        write_applied(&mut text, &lists.applied);
    }
    if text.is_empty() {
        "（該当者なし）".to_owned()
    } else {
        text
    }
}

/// Admin digest sent on the first of the month for the month that just closed
#[must_use]
pub fn build_month_start_digest(month: MonthKey, lists: &SubmissionLists) -> String {
    let mut text = format!("【SHIFT SYNC - {month}】\n{month}のシフト提出期限です。\n\n");
    if !lists.unapplied.is_empty() {
        write_unapplied(&mut text, lists, "シート未作成・フォーム送信待ち");
        text.push('\n');
    }
    if !lists.applied.is_empty() {
        write_applied(&mut text, &lists.applied);
    }
    text.trim().to_owned()
}

/// What the initial request did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum InitialRequestOutcome {
    /// Not the configured day, or the rule is disabled
    NotDue,
    /// No template yet; the admin was asked to prepare one
    TemplateMissing {
        /// Target month
        month: MonthKey,
        /// Admin push delivered in this run
        notified: bool,
    },
    /// Already announced for this month
    AlreadyAnnounced {
        /// Target month
        month: MonthKey,
    },
    /// Teachers were asked to submit and records were created
    Announced {
        /// Target month
        month: MonthKey,
        /// Teachers who received the request
        notified: Vec<String>,
        /// Records newly created
        created: usize,
        /// Per-teacher failures
        report: BatchReport,
    },
}

/// Reminder engine
#[derive(Clone)]
pub struct ReminderEngine {
    ctx: LifecycleContext,
}

impl ReminderEngine {
    /// Create the engine
    #[must_use]
    pub const fn new(ctx: LifecycleContext) -> Self {
        Self { ctx }
    }

    /// Run every reminder duty for `now`
    ///
    /// # Errors
    ///
    /// Returns the first error that prevented a duty from starting; item
    /// failures are collected in the report
    pub async fn run(&self, now: DateTime<Utc>) -> AppResult<BatchReport> {
        let mut report = self.month_start_digest(now).await?;
        if let InitialRequestOutcome::Announced { report: r, .. } =
            self.initial_request(now, false).await?
        {
            report.merge(r);
        }
        report.merge(self.cascade(now).await?);
        report.merge(self.daily_unsubmitted(now).await?);
        info!(
            processed = report.processed,
            skipped = report.skipped,
            failed = report.failures.len(),
            "Reminder run finished"
        );
        Ok(report)
    }

    async fn on_leave_names(&self) -> AppResult<HashSet<String>> {
        Ok(self
            .ctx
            .registry
            .list_all()
            .await?
            .into_iter()
            .filter(|t| t.on_leave)
            .map(|t| normalize(&t.display_name))
            .collect())
    }

    async fn lists_for(&self, month: MonthKey) -> AppResult<SubmissionLists> {
        let records = self.ctx.ledger.list_by_month(month).await?;
        Ok(SubmissionLists::from_records(
            records,
            &self.on_leave_names().await?,
        ))
    }

    async fn chat_user_for(&self, entry: &PendingEntry) -> AppResult<Option<String>> {
        Ok(self
            .ctx
            .registry
            .find_for_record(entry.teacher_id.as_deref(), &entry.name)
            .await?
            .and_then(|t| t.chat_user_id))
    }

    async fn push_admin(&self, text: &str) -> bool {
        match self.ctx.admin_chat_user_id.as_deref() {
            Some(admin) => push_logged(self.ctx.chat.as_ref(), admin, text).await,
            None => {
                debug!("No admin identity configured; manager notice not sent");
                false
            }
        }
    }

    // ========================================================================
    // Month-start digest
    // ========================================================================

    /// On the first of the month, report the previous month to the admin
    /// and remind its unsubmitted teachers
    ///
    /// # Errors
    ///
    /// Returns an error if the ledger or reminder log cannot be read
    pub async fn month_start_digest(&self, now: DateTime<Utc>) -> AppResult<BatchReport> {
        let today = self.ctx.local_date(now);
        let mut report = BatchReport::default();
        if today.day() != 1 {
            return Ok(report);
        }

        let month = self.ctx.current_month(now).previous();
        let mut lists = self.lists_for(month).await?;
        let mut fresh = Vec::with_capacity(lists.unapplied.len());
        for entry in std::mem::take(&mut lists.unapplied) {
            if self
                .ctx
                .reminder_rules
                .was_claimed_on(MONTH_START_RULE_ID, &entry.key, today)
                .await?
            {
                report.skipped += 1;
            } else {
                fresh.push(entry);
            }
        }
        lists.unapplied = fresh;

        if lists.unapplied.is_empty() && lists.applied.is_empty() {
            return Ok(report);
        }
        let subject = month.to_string();
        let rules = &self.ctx.reminder_rules;
        if self.ctx.admin_chat_user_id.is_some()
            && rules
                .claim_daily(MONTH_START_RULE_ID, &subject, today, now)
                .await?
            && !self
                .push_admin(&build_month_start_digest(month, &lists))
                .await
        {
            rules
                .release_daily(MONTH_START_RULE_ID, &subject, today)
                .await?;
        }

        for entry in &lists.unapplied {
            let text = messages::unsubmitted_reminder(
                extract_last_name(&entry.name),
                month,
                entry.url.as_deref(),
            );
            self.remind_teacher(MONTH_START_RULE_ID, entry, &text, today, now, &mut report)
                .await;
        }
        Ok(report)
    }

    /// Claim, push, and release the claim if the push did not go out
    async fn remind_teacher(
        &self,
        rule_id: &str,
        entry: &PendingEntry,
        text: &str,
        today: NaiveDate,
        now: DateTime<Utc>,
        report: &mut BatchReport,
    ) {
        match self.try_remind_teacher(rule_id, entry, text, today, now).await {
            Ok(true) => report.processed += 1,
            Ok(false) => report.skipped += 1,
            Err(e) => report.fail(entry.key.clone(), &e),
        }
    }

    async fn try_remind_teacher(
        &self,
        rule_id: &str,
        entry: &PendingEntry,
        text: &str,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        let Some(chat) = self.chat_user_for(entry).await? else {
            return Ok(false);
        };
        let rules = &self.ctx.reminder_rules;
        if !rules.claim_daily(rule_id, &entry.key, today, now).await? {
            return Ok(false);
        }
        if push_logged(self.ctx.chat.as_ref(), &chat, text).await {
            Ok(true)
        } else {
            rules.release_daily(rule_id, &entry.key, today).await?;
            Ok(false)
        }
    }

    // ========================================================================
    // Initial request
    // ========================================================================

    /// Ask every active teacher to submit next month's shifts
    ///
    /// Runs on the initial-request rule's day unless `force` is set. A
    /// missing template notifies the admin once per day; a present template
    /// is announced once per month.
    ///
    /// # Errors
    ///
    /// Returns an error if the policy, roster, template lookup or reminder
    /// log cannot be read
    pub async fn initial_request(
        &self,
        now: DateTime<Utc>,
        force: bool,
    ) -> AppResult<InitialRequestOutcome> {
        let today = self.ctx.local_date(now);
        let month = self.ctx.current_month(now).next();

        let rule = self
            .ctx
            .reminder_rules
            .get(INITIAL_REQUEST_RULE_ID)
            .await?
            .filter(|r| r.enabled);
        let Some(rule) = rule else {
            return Ok(InitialRequestOutcome::NotDue);
        };
        if !force && !rule.fires_on(today, month) {
            return Ok(InitialRequestOutcome::NotDue);
        }

        if self.ctx.documents.find_template(month).await?.is_none() {
            let subject = month.to_string();
            let notified = self.ctx.admin_chat_user_id.is_some()
                && self
                    .ctx
                    .reminder_rules
                    .claim_daily(TEMPLATE_MISSING_RULE_ID, &subject, today, now)
                    .await?
                && self
                    .push_admin(&messages::template_missing_for_admin(month))
                    .await;
            warn!(month = %month, "No template for next month");
            return Ok(InitialRequestOutcome::TemplateMissing { month, notified });
        }

        if !self
            .ctx
            .reminder_rules
            .claim_once(INITIAL_REQUEST_RULE_ID, &month.to_string(), now)
            .await?
        {
            return Ok(InitialRequestOutcome::AlreadyAnnounced { month });
        }

        self.announce(&rule, month).await
    }

    async fn announce(&self, rule: &ReminderRule, month: MonthKey) -> AppResult<InitialRequestOutcome> {
        let mut report = BatchReport::default();
        let mut notified = Vec::new();
        let mut created = 0;

        for teacher in self.ctx.registry.list_active().await? {
            if let Some(chat) = teacher.chat_user_id.as_deref() {
                let text = rule.render(&TemplateVars {
                    name: Some(teacher.last_name()),
                    month_key: Some(month),
                    submission_list: None,
                });
                if push_logged(self.ctx.chat.as_ref(), chat, &text).await {
                    notified.push(teacher.display_name.clone());
                }
            }

            match self.ctx.ledger.ensure_created(month, &teacher).await {
                Ok(EnsureOutcome::Created) => {
                    created += 1;
                    report.processed += 1;
                }
                Ok(_) => report.skipped += 1,
                Err(e) => report.fail(teacher.id.clone(), &e),
            }
        }

        self.push_admin(&messages::initial_request_report(month, &notified))
            .await;
        info!(month = %month, notified = notified.len(), created, "Initial request sent");
        Ok(InitialRequestOutcome::Announced {
            month,
            notified,
            created,
            report,
        })
    }

    // ========================================================================
    // Cascade
    // ========================================================================

    /// Fire every enabled rule whose day is today, for the current and next month
    ///
    /// # Errors
    ///
    /// Returns an error if the policy or ledger cannot be read
    pub async fn cascade(&self, now: DateTime<Utc>) -> AppResult<BatchReport> {
        let today = self.ctx.local_date(now);
        let current = self.ctx.current_month(now);
        let rules = self.ctx.reminder_rules.list_enabled().await?;
        let mut report = BatchReport::default();

        for month in [current, current.next()] {
            let due: Vec<&ReminderRule> = rules
                .iter()
                .filter(|r| r.id != INITIAL_REQUEST_RULE_ID && r.fires_on(today, month))
                .collect();
            if due.is_empty() {
                continue;
            }
            let lists = self.lists_for(month).await?;
            for rule in due {
                debug!(rule = %rule.id, month = %month, "Reminder rule due");
                match rule.audience {
                    ReminderAudience::Manager => {
                        self.remind_manager(rule, month, &lists, today, now, &mut report)
                            .await;
                    }
                    ReminderAudience::Teacher => {
                        for entry in &lists.unapplied {
                            let text = teacher_reminder_text(rule, month, entry);
                            self.remind_teacher(&rule.id, entry, &text, today, now, &mut report)
                                .await;
                        }
                    }
                }
            }
        }
        Ok(report)
    }

    async fn remind_manager(
        &self,
        rule: &ReminderRule,
        month: MonthKey,
        lists: &SubmissionLists,
        today: NaiveDate,
        now: DateTime<Utc>,
        report: &mut BatchReport,
    ) {
        let deadline_day = rule.days_before_deadline == 0;
        let has_content =
            !lists.unapplied.is_empty() || (deadline_day && !lists.applied.is_empty());
        if !has_content || self.ctx.admin_chat_user_id.is_none() {
            report.skipped += 1;
            return;
        }

        let subject = month.to_string();
        let claimed = self
            .ctx
            .reminder_rules
            .claim_daily(&rule.id, &subject, today, now)
            .await;
        match claimed {
            Ok(false) => report.skipped += 1,
            Err(e) => report.fail(format!("{}:{subject}", rule.id), &e),
            Ok(true) => {
                let list = format_submission_list(lists, deadline_day);
                let text = rule.render(&TemplateVars {
                    name: None,
                    month_key: Some(month),
                    submission_list: Some(&list),
                });
                if self.push_admin(&text).await {
                    report.processed += 1;
                } else {
                    if let Err(e) = self
                        .ctx
                        .reminder_rules
                        .release_daily(&rule.id, &subject, today)
                        .await
                    {
                        report.fail(format!("{}:{subject}", rule.id), &e);
                    }
                    report.skipped += 1;
                }
            }
        }
    }

    // ========================================================================
    // Daily unsubmitted reminder
    // ========================================================================

    /// Remind each unsubmitted teacher of the latest month once per day
    ///
    /// # Errors
    ///
    /// Returns an error if the ledger cannot be read
    pub async fn daily_unsubmitted(&self, now: DateTime<Utc>) -> AppResult<BatchReport> {
        let mut report = BatchReport::default();
        let Some(month) = self.ctx.ledger.latest_month().await? else {
            return Ok(report);
        };
        let lists = self.lists_for(month).await?;
        for entry in lists.with_document() {
            match self.remind_unsubmitted(entry, month, now).await {
                Ok(true) => report.processed += 1,
                Ok(false) => report.skipped += 1,
                Err(e) => report.fail(entry.key.clone(), &e),
            }
        }
        Ok(report)
    }

    async fn remind_unsubmitted(
        &self,
        entry: &PendingEntry,
        month: MonthKey,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        let Some(record) = self.ctx.ledger.find_by_key(&entry.key).await? else {
            return Ok(false);
        };
        if record
            .reminder_notified_at
            .is_some_and(|at| self.ctx.same_local_day(at, now))
        {
            return Ok(false);
        }
        let Some(chat) = self.chat_user_for(entry).await? else {
            return Ok(false);
        };

        let text = messages::unsubmitted_reminder(
            extract_last_name(&entry.name),
            month,
            entry.url.as_deref(),
        );
        if !push_logged(self.ctx.chat.as_ref(), &chat, &text).await {
            return Ok(false);
        }
        self.ctx
            .ledger
            .update(
                &entry.key,
                SubmissionPatch {
                    reminder_notified_at: Some(Some(now)),
                    ..SubmissionPatch::default()
                },
            )
            .await?;
        Ok(true)
    }
}

/// Rule template for one teacher, with the document link appended when present
fn teacher_reminder_text(rule: &ReminderRule, month: MonthKey, entry: &PendingEntry) -> String {
    let mut text = rule.render(&TemplateVars {
        name: Some(extract_last_name(&entry.name)),
        month_key: Some(month),
        submission_list: None,
    });
    if let Some(url) = &entry.url {
        let _ = write!(text, "\nこちらから入力・提出（☑）をお願いします。\n{url}");
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, url: Option<&str>) -> PendingEntry {
        PendingEntry {
            key: format!("2026-03-{name}"),
            name: name.to_owned(),
            teacher_id: None,
            url: url.map(ToOwned::to_owned),
        }
    }

    fn lists() -> SubmissionLists {
        SubmissionLists {
            unapplied: vec![entry("佐藤花子", None), entry("山田太郎", Some("https://d/1"))],
            applied: vec!["鈴木一郎".to_owned()],
        }
    }

    #[test]
    fn submission_list_orders_documented_entries_first() {
        let text = format_submission_list(&lists(), false);
        assert_eq!(
            text,
            "【未提出者】\n1. 山田太郎（シート作成済み）\n2. 佐藤花子（シート未作成）\n"
        );
    }

    #[test]
    fn submission_list_includes_submitted_on_deadline_day() {
        let text = format_submission_list(&lists(), true);
        assert!(text.ends_with("\n【提出済み】\n1. 鈴木一郎\n"));
    }

    #[test]
    fn empty_submission_list_has_placeholder() {
        assert_eq!(
            format_submission_list(&SubmissionLists::default(), true),
            "（該当者なし）"
        );
    }

    #[test]
    fn month_start_digest_layout() {
        let month = MonthKey::new(2026, 2).unwrap();
        let text = build_month_start_digest(month, &lists());
        assert_eq!(
            text,
            "【SHIFT SYNC - 2026-02】\n2026-02のシフト提出期限です。\n\n【未提出者】\n1. 山田太郎（シート作成済み）\n2. 佐藤花子（シート未作成・フォーム送信待ち）\n\n【提出済み】\n1. 鈴木一郎"
        );
    }

    #[test]
    fn teacher_reminder_appends_link() {
        let rule = crate::models::default_reminder_rules()
            .into_iter()
            .find(|r| r.id == "reminder_1week_teacher")
            .unwrap();
        let month = MonthKey::new(2026, 3).unwrap();
        let text = teacher_reminder_text(&rule, month, &entry("山田 太郎", Some("https://d/1")));
        assert!(text.starts_with("【シフト未提出リマインド（2026-03）】\n山田先生"));
        assert!(text.ends_with("\nhttps://d/1"));
    }
}
