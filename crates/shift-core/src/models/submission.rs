// ABOUTME: Monthly submission record and its closed status enum
// ABOUTME: Defines key derivation and the partial-update patch applied by the ledger
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Shift Sync Contributors

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::MonthKey;
use crate::errors::{AppError, AppResult};

/// Lifecycle status of a submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    /// Requested; the teacher has not ticked the submit box yet
    Created,
    /// The document flag was observed true
    Submitted,
    /// The form named a teacher that is not on the roster
    TeacherNotFound,
    /// No template document exists for the month
    TemplateNotFound,
}

impl SubmissionStatus {
    /// Stored string form
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Submitted => "submitted",
            Self::TeacherNotFound => "teacher_not_found",
            Self::TemplateNotFound => "template_not_found",
        }
    }

    /// Parse a stored status; unknown values are rejected
    ///
    /// # Errors
    ///
    /// Returns a validation error for any value outside the closed set
    pub fn parse(value: &str) -> AppResult<Self> {
        match value.trim() {
            "created" => Ok(Self::Created),
            "submitted" => Ok(Self::Submitted),
            "teacher_not_found" => Ok(Self::TeacherNotFound),
            "template_not_found" => Ok(Self::TemplateNotFound),
            other => Err(AppError::validation(format!(
                "Unrecognized submission status: '{other}'"
            ))),
        }
    }

    /// Every status other than `submitted` counts as not yet applied
    #[must_use]
    pub const fn is_unapplied(self) -> bool {
        !matches!(self, Self::Submitted)
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubmissionStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Derive the ledger key for a (month, teacher) pair
///
/// The teacher id is preferred; rows for unresolved teachers fall back to the
/// normalized name key.
#[must_use]
pub fn submission_key(month: MonthKey, teacher_id: Option<&str>, name_key: &str) -> String {
    match teacher_id.map(str::trim).filter(|id| !id.is_empty()) {
        Some(id) => format!("{month}-{id}"),
        None => format!("{month}-{name_key}"),
    }
}

/// One teacher's submission for one month
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    /// Ledger key (`{month}-{teacherId}` or `{month}-{normalizedName}`)
    pub key: String,
    /// Submission period
    pub month_key: MonthKey,
    /// Roster id; absent when the teacher could not be resolved
    pub teacher_id: Option<String>,
    /// Teacher name as recorded
    pub teacher_name: String,
    /// Link to the teacher's document
    pub document_url: Option<String>,
    /// Lifecycle status
    pub status: SubmissionStatus,
    /// When the submit flag was observed
    pub submitted_at: Option<DateTime<Utc>>,
    /// When the document was locked
    pub locked_at: Option<DateTime<Utc>>,
    /// When the acknowledgement was pushed
    pub ack_notified_at: Option<DateTime<Utc>>,
    /// When the last daily reminder was pushed
    pub reminder_notified_at: Option<DateTime<Utc>>,
    /// Server-assigned creation time
    pub created_at: DateTime<Utc>,
    /// Server-assigned update time
    pub updated_at: DateTime<Utc>,
}

impl Submission {
    /// New `created` record with no document yet
    #[must_use]
    pub fn new(
        key: String,
        month_key: MonthKey,
        teacher_id: Option<String>,
        teacher_name: String,
        status: SubmissionStatus,
    ) -> Self {
        let now = Utc::now();
        Self {
            key,
            month_key,
            teacher_id,
            teacher_name,
            document_url: None,
            status,
            submitted_at: None,
            locked_at: None,
            ack_notified_at: None,
            reminder_notified_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Attach a document link
    #[must_use]
    pub fn with_document_url(mut self, url: impl Into<String>) -> Self {
        self.document_url = Some(url.into());
        self
    }

    /// Document link when present and non-blank
    #[must_use]
    pub fn document(&self) -> Option<&str> {
        self.document_url.as_deref().map(str::trim).filter(|u| !u.is_empty())
    }

    /// Submitted and already acknowledged: nothing left to do
    #[must_use]
    pub const fn is_settled(&self) -> bool {
        matches!(self.status, SubmissionStatus::Submitted) && self.ack_notified_at.is_some()
    }

    /// Apply a patch in place; fields absent from the patch are untouched
    pub fn apply(&mut self, patch: SubmissionPatch) {
        if let Some(key) = patch.key {
            self.key = key;
        }
        if let Some(teacher_id) = patch.teacher_id {
            self.teacher_id = teacher_id;
        }
        if let Some(name) = patch.teacher_name {
            self.teacher_name = name;
        }
        if let Some(url) = patch.document_url {
            self.document_url = url;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(at) = patch.submitted_at {
            self.submitted_at = at;
        }
        if let Some(at) = patch.locked_at {
            self.locked_at = at;
        }
        if let Some(at) = patch.ack_notified_at {
            self.ack_notified_at = at;
        }
        if let Some(at) = patch.reminder_notified_at {
            self.reminder_notified_at = at;
        }
    }
}

/// Partial update for a submission
///
/// Outer `None` leaves a field unchanged; `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionPatch {
    /// Re-keyed ledger key
    pub key: Option<String>,
    /// Roster id
    pub teacher_id: Option<Option<String>>,
    /// Teacher name
    pub teacher_name: Option<String>,
    /// Document link
    pub document_url: Option<Option<String>>,
    /// Lifecycle status
    pub status: Option<SubmissionStatus>,
    /// Submit timestamp
    pub submitted_at: Option<Option<DateTime<Utc>>>,
    /// Lock timestamp
    pub locked_at: Option<Option<DateTime<Utc>>>,
    /// Acknowledgement timestamp
    pub ack_notified_at: Option<Option<DateTime<Utc>>>,
    /// Daily reminder timestamp
    pub reminder_notified_at: Option<Option<DateTime<Utc>>>,
}

impl SubmissionPatch {
    /// Transition to `submitted` at the given time
    #[must_use]
    pub fn submitted(at: DateTime<Utc>) -> Self {
        Self {
            status: Some(SubmissionStatus::Submitted),
            submitted_at: Some(Some(at)),
            ..Self::default()
        }
    }

    /// Admin reopen: back to `created` with submit, lock and ack cleared together
    #[must_use]
    pub fn reopen() -> Self {
        Self {
            status: Some(SubmissionStatus::Created),
            submitted_at: Some(None),
            locked_at: Some(None),
            ack_notified_at: Some(None),
            ..Self::default()
        }
    }

    /// True when the patch changes nothing
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_text() {
        for status in [
            SubmissionStatus::Created,
            SubmissionStatus::Submitted,
            SubmissionStatus::TeacherNotFound,
            SubmissionStatus::TemplateNotFound,
        ] {
            assert_eq!(SubmissionStatus::parse(status.as_str()).unwrap(), status);
        }
        assert!(SubmissionStatus::parse("locked").is_err());
    }

    #[test]
    fn key_prefers_teacher_id() {
        let month = MonthKey::new(2026, 1).unwrap();
        assert_eq!(submission_key(month, Some("T003"), "山田太郎"), "2026-01-T003");
        assert_eq!(submission_key(month, Some("  "), "山田太郎"), "2026-01-山田太郎");
        assert_eq!(submission_key(month, None, "山田太郎"), "2026-01-山田太郎");
    }

    #[test]
    fn reopen_clears_timestamps_only() {
        let month = MonthKey::new(2026, 1).unwrap();
        let now = Utc::now();
        let mut record = Submission::new(
            "2026-01-T001".to_owned(),
            month,
            Some("T001".to_owned()),
            "山田 太郎".to_owned(),
            SubmissionStatus::Submitted,
        )
        .with_document_url("https://docs.google.com/spreadsheets/d/abc/edit");
        record.submitted_at = Some(now);
        record.locked_at = Some(now);
        record.ack_notified_at = Some(now);
        record.reminder_notified_at = Some(now);

        record.apply(SubmissionPatch::reopen());

        assert_eq!(record.status, SubmissionStatus::Created);
        assert!(record.submitted_at.is_none());
        assert!(record.locked_at.is_none());
        assert!(record.ack_notified_at.is_none());
        assert_eq!(record.reminder_notified_at, Some(now));
        assert!(record.document().is_some());
    }
}
