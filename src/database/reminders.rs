// ABOUTME: Reminder policy table plus the send log gating at-most-once notifications
// ABOUTME: Rules are read by the scheduler; the log is claimed before each send
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Shift Sync Contributors

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{Row, SqlitePool};

use crate::errors::{AppError, AppResult};
use crate::models::{default_reminder_rules, ReminderAudience, ReminderRule};

/// `sent_on` value for claims that may only ever succeed once
const ONCE: &str = "once";

/// Reminder policy and send-log operations
#[derive(Clone)]
pub struct ReminderRuleManager {
    pool: SqlitePool,
}

impl ReminderRuleManager {
    /// Create a new reminder manager
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Every rule in policy order
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a row carries an unknown audience
    pub async fn list(&self) -> AppResult<Vec<ReminderRule>> {
        let rows = sqlx::query(
            r"
            SELECT id, label, days_before_deadline, audience, template, enabled
            FROM reminder_rules
            ORDER BY position, id
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to list reminder rules: {e}")))?;

        rows.iter()
            .map(|r| {
                let audience: String = r.get("audience");
                Ok(ReminderRule {
                    id: r.get("id"),
                    label: r.get("label"),
                    days_before_deadline: r.get("days_before_deadline"),
                    audience: ReminderAudience::parse(&audience)?,
                    template: r.get("template"),
                    enabled: r.get::<i64, _>("enabled") != 0,
                })
            })
            .collect()
    }

    /// Enabled rules only
    ///
    /// # Errors
    ///
    /// Returns an error if the rules cannot be read
    pub async fn list_enabled(&self) -> AppResult<Vec<ReminderRule>> {
        Ok(self.list().await?.into_iter().filter(|r| r.enabled).collect())
    }

    /// Rule by id
    ///
    /// # Errors
    ///
    /// Returns an error if the rules cannot be read
    pub async fn get(&self, id: &str) -> AppResult<Option<ReminderRule>> {
        Ok(self.list().await?.into_iter().find(|r| r.id == id))
    }

    /// Insert or replace a rule at the given policy position
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails
    pub async fn upsert(&self, rule: &ReminderRule, position: i64) -> AppResult<()> {
        sqlx::query(
            r"
            INSERT INTO reminder_rules (id, label, days_before_deadline, audience, template, enabled, position)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT(id) DO UPDATE SET
                label = excluded.label,
                days_before_deadline = excluded.days_before_deadline,
                audience = excluded.audience,
                template = excluded.template,
                enabled = excluded.enabled,
                position = excluded.position
            ",
        )
        .bind(&rule.id)
        .bind(&rule.label)
        .bind(rule.days_before_deadline)
        .bind(rule.audience.as_str())
        .bind(&rule.template)
        .bind(i64::from(rule.enabled))
        .bind(position)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to upsert reminder rule: {e}")))?;
        Ok(())
    }

    /// Seed the default policy when the table is empty; returns rules written
    ///
    /// # Errors
    ///
    /// Returns an error if the count or an insert fails
    pub async fn seed_defaults(&self) -> AppResult<usize> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM reminder_rules")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to count reminder rules: {e}")))?;
        if row.get::<i64, _>("n") > 0 {
            return Ok(0);
        }
        self.reset_defaults().await
    }

    /// Overwrite the policy with the defaults; returns rules written
    ///
    /// # Errors
    ///
    /// Returns an error if any write fails
    pub async fn reset_defaults(&self) -> AppResult<usize> {
        let rules = default_reminder_rules();
        for (position, rule) in (0_i64..).zip(rules.iter()) {
            self.upsert(rule, position).await?;
        }
        Ok(rules.len())
    }

    /// Enable or disable a rule
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails
    pub async fn set_enabled(&self, id: &str, enabled: bool) -> AppResult<bool> {
        let result = sqlx::query("UPDATE reminder_rules SET enabled = $1 WHERE id = $2")
            .bind(i64::from(enabled))
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to update reminder rule: {e}")))?;
        Ok(result.rows_affected() > 0)
    }

    // ========================================================================
    // Send log
    // ========================================================================

    async fn claim(&self, rule_id: &str, subject: &str, sent_on: &str, at: DateTime<Utc>) -> AppResult<bool> {
        let result = sqlx::query(
            r"
            INSERT OR IGNORE INTO reminder_log (rule_id, subject, sent_on, sent_at)
            VALUES ($1, $2, $3, $4)
            ",
        )
        .bind(rule_id)
        .bind(subject)
        .bind(sent_on)
        .bind(at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to record reminder: {e}")))?;
        Ok(result.rows_affected() > 0)
    }

    /// Claim the right to send `rule_id` for `subject` on `day`
    ///
    /// Returns `false` when it was already claimed that day.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails
    pub async fn claim_daily(
        &self,
        rule_id: &str,
        subject: &str,
        day: NaiveDate,
        at: DateTime<Utc>,
    ) -> AppResult<bool> {
        self.claim(rule_id, subject, &day.to_string(), at).await
    }

    /// Claim a notification that may only ever go out once for `subject`
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails
    pub async fn claim_once(&self, rule_id: &str, subject: &str, at: DateTime<Utc>) -> AppResult<bool> {
        self.claim(rule_id, subject, ONCE, at).await
    }

    /// Whether a claim exists for `subject` on `day`
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn was_claimed_on(&self, rule_id: &str, subject: &str, day: NaiveDate) -> AppResult<bool> {
        let row = sqlx::query(
            r"
            SELECT COUNT(*) AS n FROM reminder_log WHERE rule_id = $1 AND subject = $2 AND sent_on = $3
            ",
        )
        .bind(rule_id)
        .bind(subject)
        .bind(day.to_string())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to read reminder log: {e}")))?;
        Ok(row.get::<i64, _>("n") > 0)
    }

    /// Release a claim so the notification can be retried
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails
    pub async fn release_daily(&self, rule_id: &str, subject: &str, day: NaiveDate) -> AppResult<()> {
        sqlx::query("DELETE FROM reminder_log WHERE rule_id = $1 AND subject = $2 AND sent_on = $3")
            .bind(rule_id)
            .bind(subject)
            .bind(day.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to release reminder claim: {e}")))?;
        Ok(())
    }
}
