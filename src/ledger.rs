// ABOUTME: Submission ledger: one record per (teacher, month) with self-healing lookups
// ABOUTME: Key lookups fall back to (month, teacher id or name) so drifted keys still resolve
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Shift Sync Contributors

//! Submission ledger
//!
//! Keys are derived as `{month}-{teacherId}` but older rows may carry
//! `{month}-{normalizedName}` or a hand-edited variant. Every lookup that can
//! name the teacher therefore falls back from the key to a scan of the month,
//! and [`SubmissionLedger::repair_keys`] rewrites drifted keys in bulk.

use std::collections::BTreeSet;

use tracing::{debug, info};

use crate::database::{DecodedRows, SubmissionManager};
use crate::errors::{AppError, AppResult};
use crate::models::{
    submission_key, MonthKey, Submission, SubmissionPatch, SubmissionStatus, Teacher,
};
use crate::names::normalize;

/// What [`SubmissionLedger::ensure_created`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnsureOutcome {
    /// A new `created` record was appended
    Created,
    /// An existing record was found under a drifted key and re-keyed
    Rekeyed,
    /// A record already existed under the expected key
    Existing,
}

/// Typed access to the ledger table
#[derive(Clone)]
pub struct SubmissionLedger {
    submissions: SubmissionManager,
}

impl SubmissionLedger {
    /// Create a ledger over the submissions table
    #[must_use]
    pub const fn new(submissions: SubmissionManager) -> Self {
        Self { submissions }
    }

    /// Record by exact key
    ///
    /// # Errors
    ///
    /// Returns an error if the table cannot be read
    pub async fn find_by_key(&self, key: &str) -> AppResult<Option<Submission>> {
        self.submissions.get(key).await
    }

    /// Record for a month matched by teacher id, else by normalized name
    ///
    /// # Errors
    ///
    /// Returns an error if the table cannot be read
    pub async fn find_by_month_and_teacher(
        &self,
        month: MonthKey,
        teacher_id: Option<&str>,
        name: &str,
    ) -> AppResult<Option<Submission>> {
        let rows = self.submissions.list_by_month(month).await?;
        Ok(match_month_row(rows, teacher_id, name))
    }

    /// Key lookup with the month scan as fallback
    ///
    /// # Errors
    ///
    /// Returns an error if the table cannot be read
    pub async fn find(
        &self,
        key: &str,
        month: MonthKey,
        teacher_id: Option<&str>,
        name: &str,
    ) -> AppResult<Option<Submission>> {
        if let Some(found) = self.submissions.get(key).await? {
            return Ok(Some(found));
        }
        let fallback = self.find_by_month_and_teacher(month, teacher_id, name).await?;
        if let Some(found) = &fallback {
            debug!(expected = key, stored = %found.key, "Resolved submission by month scan");
        }
        Ok(fallback)
    }

    /// Append a new record
    ///
    /// # Errors
    ///
    /// Returns an error if the key is taken or the insert fails
    pub async fn append(&self, submission: &Submission) -> AppResult<()> {
        self.submissions.insert(submission).await
    }

    /// Apply a partial update to the record stored under `key`
    ///
    /// The patch may re-key the record. Returns the record as stored.
    ///
    /// # Errors
    ///
    /// Returns `ResourceNotFound` if no record has `key`, or a database error
    pub async fn update(&self, key: &str, patch: SubmissionPatch) -> AppResult<Submission> {
        let mut record = self
            .submissions
            .get(key)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Submission {key}")))?;
        if patch.is_empty() {
            return Ok(record);
        }
        record.apply(patch);
        self.submissions
            .replace(key, &record)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Submission {key}")))
    }

    /// Every record for a month
    ///
    /// # Errors
    ///
    /// Returns an error if the table cannot be read
    pub async fn list_by_month(&self, month: MonthKey) -> AppResult<Vec<Submission>> {
        self.submissions.list_by_month(month).await
    }

    /// Records the document poller still has work for, plus the keys of
    /// rows too malformed to decode
    ///
    /// # Errors
    ///
    /// Returns an error if the table cannot be read
    pub async fn list_pending_poll(&self) -> AppResult<DecodedRows> {
        self.submissions.list_pending_poll().await
    }

    /// Latest month present in the ledger
    ///
    /// # Errors
    ///
    /// Returns an error if the table cannot be read
    pub async fn latest_month(&self) -> AppResult<Option<MonthKey>> {
        self.submissions.latest_month().await
    }

    /// Distinct months with a `submitted` record for the named teacher, ascending
    ///
    /// # Errors
    ///
    /// Returns an error if the table cannot be read
    pub async fn submitted_months_for(&self, name: &str) -> AppResult<Vec<MonthKey>> {
        let key = normalize(name);
        let months: BTreeSet<MonthKey> = self
            .submissions
            .list_by_status(SubmissionStatus::Submitted)
            .await?
            .into_iter()
            .filter(|s| normalize(&s.teacher_name) == key)
            .map(|s| s.month_key)
            .collect();
        Ok(months.into_iter().collect())
    }

    /// `submitted` record for the named teacher, optionally restricted to a month
    ///
    /// # Errors
    ///
    /// Returns an error if the table cannot be read
    pub async fn find_submitted(
        &self,
        name: &str,
        month: Option<MonthKey>,
    ) -> AppResult<Option<Submission>> {
        let key = normalize(name);
        Ok(self
            .submissions
            .list_by_status(SubmissionStatus::Submitted)
            .await?
            .into_iter()
            .find(|s| normalize(&s.teacher_name) == key && month.is_none_or(|m| s.month_key == m)))
    }

    /// Status of any record for the named teacher, used to explain a miss
    ///
    /// # Errors
    ///
    /// Returns an error if the table cannot be read
    pub async fn status_for(
        &self,
        name: &str,
        month: Option<MonthKey>,
    ) -> AppResult<Option<SubmissionStatus>> {
        let key = normalize(name);
        Ok(self
            .submissions
            .list_all()
            .await?
            .into_iter()
            .rev()
            .find(|s| normalize(&s.teacher_name) == key && month.is_none_or(|m| s.month_key == m))
            .map(|s| s.status))
    }

    /// Make sure a `created` record exists for the teacher and month
    ///
    /// A record found under a drifted key is re-keyed rather than duplicated.
    /// Concurrent callers for the same pair can still both append; the
    /// primary key rejects the second insert.
    ///
    /// # Errors
    ///
    /// Returns an error if the table cannot be read or written
    pub async fn ensure_created(&self, month: MonthKey, teacher: &Teacher) -> AppResult<EnsureOutcome> {
        let name_key = normalize(&teacher.display_name);
        let key = submission_key(month, Some(&teacher.id), &name_key);

        if self.submissions.get(&key).await?.is_some() {
            return Ok(EnsureOutcome::Existing);
        }

        if let Some(existing) = self
            .find_by_month_and_teacher(month, Some(&teacher.id), &teacher.display_name)
            .await?
        {
            self.update(
                &existing.key,
                SubmissionPatch {
                    key: Some(key),
                    teacher_id: Some(Some(teacher.id.clone())),
                    ..SubmissionPatch::default()
                },
            )
            .await?;
            return Ok(EnsureOutcome::Rekeyed);
        }

        self.submissions
            .insert(&Submission::new(
                key,
                month,
                Some(teacher.id.clone()),
                teacher.display_name.clone(),
                SubmissionStatus::Created,
            ))
            .await?;
        Ok(EnsureOutcome::Created)
    }

    /// Rewrite every record whose name matches a roster teacher to the
    /// `{month}-{teacherId}` key; returns how many records changed
    ///
    /// # Errors
    ///
    /// Returns an error if the table cannot be read or a write fails
    pub async fn repair_keys(&self, roster: &[Teacher]) -> AppResult<usize> {
        let mut repaired = 0;
        for record in self.submissions.list_all().await? {
            let name_key = normalize(&record.teacher_name);
            let Some(teacher) = roster
                .iter()
                .find(|t| normalize(&t.display_name) == name_key)
            else {
                continue;
            };

            let expected = format!("{}-{}", record.month_key, teacher.id);
            if record.key == expected && record.teacher_id.as_deref() == Some(teacher.id.as_str()) {
                continue;
            }
            if record.key != expected && self.submissions.get(&expected).await?.is_some() {
                debug!(key = %record.key, expected, "Skipping key repair; target key already in use");
                continue;
            }

            self.update(
                &record.key,
                SubmissionPatch {
                    key: Some(expected),
                    teacher_id: Some(Some(teacher.id.clone())),
                    ..SubmissionPatch::default()
                },
            )
            .await?;
            repaired += 1;
        }
        info!(repaired, "Submission key repair finished");
        Ok(repaired)
    }
}

/// Pick a month's record by teacher id first, then by exact normalized name
fn match_month_row(
    rows: Vec<Submission>,
    teacher_id: Option<&str>,
    name: &str,
) -> Option<Submission> {
    let teacher_id = teacher_id.map(str::trim).filter(|id| !id.is_empty());
    let name_key = normalize(name);

    let by_id = teacher_id.and_then(|id| {
        rows.iter()
            .position(|r| r.teacher_id.as_deref().map(str::trim) == Some(id))
    });
    let by_name = || {
        (!name_key.is_empty())
            .then(|| rows.iter().position(|r| normalize(&r.teacher_name) == name_key))
            .flatten()
    };
    let index = by_id.or_else(by_name)?;
    rows.into_iter().nth(index)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(key: &str, teacher_id: Option<&str>, name: &str) -> Submission {
        let month = MonthKey::new(2026, 3).unwrap();
        Submission::new(
            key.to_owned(),
            month,
            teacher_id.map(ToOwned::to_owned),
            name.to_owned(),
            SubmissionStatus::Created,
        )
    }

    #[test]
    fn month_scan_prefers_teacher_id() {
        let rows = vec![
            row("2026-03-山田太郎", None, "山田太郎"),
            row("legacy", Some("T002"), "山田 太郎"),
        ];
        let found = match_month_row(rows, Some("T002"), "山田太郎").unwrap();
        assert_eq!(found.key, "legacy");
    }

    #[test]
    fn month_scan_falls_back_to_normalized_name() {
        let rows = vec![row("2026-03-x", None, "Ｓｕｚｕｋｉ　一郎")];
        let found = match_month_row(rows, Some("T009"), "Suzuki一郎").unwrap();
        assert_eq!(found.key, "2026-03-x");
    }

    #[test]
    fn month_scan_ignores_blank_name() {
        let rows = vec![row("2026-03-", None, "")];
        assert!(match_month_row(rows, None, "  ").is_none());
    }
}
