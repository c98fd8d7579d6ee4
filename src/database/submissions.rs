// ABOUTME: Database operations for the submission ledger
// ABOUTME: One row per (teacher, month) keyed by the derived submission key
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Shift Sync Contributors

use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::warn;

use super::{format_timestamp, parse_required_timestamp, parse_timestamp};
use crate::errors::{AppError, AppResult};
use crate::models::{MonthKey, Submission, SubmissionStatus};

const SELECT_COLUMNS: &str = r"
    SELECT key, month_key, teacher_id, teacher_name, document_url, status,
           submitted_at, locked_at, ack_notified_at, reminder_notified_at,
           created_at, updated_at
    FROM submissions";

/// Rows from one listing query, with malformed rows set aside by key
#[derive(Debug, Default)]
pub struct DecodedRows {
    /// Rows that decoded cleanly
    pub records: Vec<Submission>,
    /// Key and decode error of each malformed row
    pub rejected: Vec<(String, AppError)>,
}

// ============================================================================
// Submission Manager
// ============================================================================

/// Ledger table operations
#[derive(Clone)]
pub struct SubmissionManager {
    pool: SqlitePool,
}

impl SubmissionManager {
    /// Create a new ledger manager
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn map_row(row: &SqliteRow) -> AppResult<Submission> {
        let month_text: String = row.get("month_key");
        let status_text: String = row.get("status");
        let teacher_id: Option<String> = row.get("teacher_id");
        Ok(Submission {
            key: row.get("key"),
            month_key: MonthKey::parse(&month_text)?,
            teacher_id: teacher_id.filter(|v| !v.trim().is_empty()),
            teacher_name: row.get("teacher_name"),
            document_url: row.get("document_url"),
            status: SubmissionStatus::parse(&status_text)?,
            submitted_at: parse_timestamp("submissions.submitted_at", row.get("submitted_at"))?,
            locked_at: parse_timestamp("submissions.locked_at", row.get("locked_at"))?,
            ack_notified_at: parse_timestamp(
                "submissions.ack_notified_at",
                row.get("ack_notified_at"),
            )?,
            reminder_notified_at: parse_timestamp(
                "submissions.reminder_notified_at",
                row.get("reminder_notified_at"),
            )?,
            created_at: parse_required_timestamp("submissions.created_at", row.get("created_at"))?,
            updated_at: parse_required_timestamp("submissions.updated_at", row.get("updated_at"))?,
        })
    }

    /// Decode row by row; one malformed row never hides the others
    fn map_rows(rows: &[SqliteRow]) -> DecodedRows {
        let mut decoded = DecodedRows::default();
        for row in rows {
            match Self::map_row(row) {
                Ok(record) => decoded.records.push(record),
                Err(e) => {
                    let key: String = row.try_get("key").unwrap_or_default();
                    warn!(key = %key, error = %e, "Skipping malformed submission row");
                    decoded.rejected.push((key, e));
                }
            }
        }
        decoded
    }

    /// Row by ledger key
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or the row is malformed
    pub async fn get(&self, key: &str) -> AppResult<Option<Submission>> {
        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE key = $1"))
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to get submission: {e}")))?;
        row.as_ref().map(Self::map_row).transpose()
    }

    /// Every row for a month, oldest first
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails; malformed rows are skipped
    pub async fn list_by_month(&self, month: MonthKey) -> AppResult<Vec<Submission>> {
        let rows = sqlx::query(&format!(
            "{SELECT_COLUMNS} WHERE month_key = $1 ORDER BY created_at, key"
        ))
        .bind(month.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to list submissions by month: {e}")))?;
        Ok(Self::map_rows(&rows).records)
    }

    /// Every row, oldest first
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails; malformed rows are skipped
    pub async fn list_all(&self) -> AppResult<Vec<Submission>> {
        let rows = sqlx::query(&format!("{SELECT_COLUMNS} ORDER BY created_at, key"))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to list submissions: {e}")))?;
        Ok(Self::map_rows(&rows).records)
    }

    /// Rows in a given status, oldest first
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails; malformed rows are skipped
    pub async fn list_by_status(&self, status: SubmissionStatus) -> AppResult<Vec<Submission>> {
        let rows = sqlx::query(&format!(
            "{SELECT_COLUMNS} WHERE status = $1 ORDER BY month_key, created_at"
        ))
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to list submissions by status: {e}")))?;
        Ok(Self::map_rows(&rows).records)
    }

    /// Rows the poller still has work for: a document exists and the row is
    /// not both submitted and acknowledged
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails; malformed rows come back in
    /// [`DecodedRows::rejected`]
    pub async fn list_pending_poll(&self) -> AppResult<DecodedRows> {
        let rows = sqlx::query(&format!(
            r"{SELECT_COLUMNS}
            WHERE document_url IS NOT NULL AND TRIM(document_url) != ''
              AND NOT (status = 'submitted' AND ack_notified_at IS NOT NULL)
            ORDER BY created_at, key"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to list pending submissions: {e}")))?;
        Ok(Self::map_rows(&rows))
    }

    /// Latest month present in the ledger
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or the stored month is malformed
    pub async fn latest_month(&self) -> AppResult<Option<MonthKey>> {
        let row = sqlx::query("SELECT MAX(month_key) AS latest FROM submissions")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to get latest month: {e}")))?;
        let latest: Option<String> = row.get("latest");
        latest.as_deref().map(MonthKey::parse).transpose()
    }

    /// Insert a new row
    ///
    /// # Errors
    ///
    /// Returns an error if the key already exists or the insert fails
    pub async fn insert(&self, submission: &Submission) -> AppResult<()> {
        sqlx::query(
            r"
            INSERT INTO submissions (key, month_key, teacher_id, teacher_name, document_url, status,
                                     submitted_at, locked_at, ack_notified_at, reminder_notified_at,
                                     created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ",
        )
        .bind(&submission.key)
        .bind(submission.month_key.to_string())
        .bind(&submission.teacher_id)
        .bind(&submission.teacher_name)
        .bind(&submission.document_url)
        .bind(submission.status.as_str())
        .bind(format_timestamp(submission.submitted_at))
        .bind(format_timestamp(submission.locked_at))
        .bind(format_timestamp(submission.ack_notified_at))
        .bind(format_timestamp(submission.reminder_notified_at))
        .bind(submission.created_at.to_rfc3339())
        .bind(submission.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to insert submission: {e}")))?;
        Ok(())
    }

    /// Overwrite the row stored under `current_key` with `submission`
    ///
    /// `submission.key` may differ from `current_key` to re-key a drifted row.
    /// Returns the stored `updated_at`-refreshed record, or `None` when no row
    /// had `current_key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails
    pub async fn replace(
        &self,
        current_key: &str,
        submission: &Submission,
    ) -> AppResult<Option<Submission>> {
        let mut stored = submission.clone();
        stored.updated_at = Utc::now();

        let result = sqlx::query(
            r"
            UPDATE submissions
            SET key = $1, month_key = $2, teacher_id = $3, teacher_name = $4, document_url = $5,
                status = $6, submitted_at = $7, locked_at = $8, ack_notified_at = $9,
                reminder_notified_at = $10, updated_at = $11
            WHERE key = $12
            ",
        )
        .bind(&stored.key)
        .bind(stored.month_key.to_string())
        .bind(&stored.teacher_id)
        .bind(&stored.teacher_name)
        .bind(&stored.document_url)
        .bind(stored.status.as_str())
        .bind(format_timestamp(stored.submitted_at))
        .bind(format_timestamp(stored.locked_at))
        .bind(format_timestamp(stored.ack_notified_at))
        .bind(format_timestamp(stored.reminder_notified_at))
        .bind(stored.updated_at.to_rfc3339())
        .bind(current_key)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to update submission: {e}")))?;

        Ok((result.rows_affected() > 0).then_some(stored))
    }
}
