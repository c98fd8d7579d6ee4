// ABOUTME: Database operations for the teacher roster
// ABOUTME: Row mapping plus conditional chat-identity writes that never overwrite silently
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Shift Sync Contributors

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use super::{format_timestamp, parse_required_timestamp, parse_timestamp};
use crate::errors::{AppError, AppResult};
use crate::models::Teacher;

const SELECT_COLUMNS: &str =
    "SELECT id, display_name, chat_user_id, chat_linked_at, email, on_leave, created_at FROM teachers";

// ============================================================================
// Teacher Manager
// ============================================================================

/// Roster table operations
#[derive(Clone)]
pub struct TeacherManager {
    pool: SqlitePool,
}

impl TeacherManager {
    /// Create a new roster manager
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn map_row(row: &SqliteRow) -> AppResult<Teacher> {
        let chat_user_id: Option<String> = row.get("chat_user_id");
        let email: Option<String> = row.get("email");
        Ok(Teacher {
            id: row.get("id"),
            display_name: row.get("display_name"),
            chat_user_id: chat_user_id.filter(|v| !v.trim().is_empty()),
            chat_linked_at: parse_timestamp("teachers.chat_linked_at", row.get("chat_linked_at"))?,
            email: email.filter(|v| !v.trim().is_empty()),
            on_leave: row.get::<i64, _>("on_leave") != 0,
            created_at: parse_required_timestamp("teachers.created_at", row.get("created_at"))?,
        })
    }

    /// Full roster in id order
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a row is malformed
    pub async fn list_all(&self) -> AppResult<Vec<Teacher>> {
        let rows = sqlx::query(&format!("{SELECT_COLUMNS} ORDER BY id"))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to list teachers: {e}")))?;
        rows.iter().map(Self::map_row).collect()
    }

    /// Teacher by roster id
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or the row is malformed
    pub async fn get(&self, id: &str) -> AppResult<Option<Teacher>> {
        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to get teacher: {e}")))?;
        row.as_ref().map(Self::map_row).transpose()
    }

    /// Teacher linked to a chat identity
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or the row is malformed
    pub async fn find_by_chat_user_id(&self, chat_user_id: &str) -> AppResult<Option<Teacher>> {
        let row = sqlx::query(&format!(
            "{SELECT_COLUMNS} WHERE chat_user_id = $1 ORDER BY id LIMIT 1"
        ))
        .bind(chat_user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to find teacher by chat user: {e}")))?;
        row.as_ref().map(Self::map_row).transpose()
    }

    /// All roster ids, used for sequential id assignment
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn list_ids(&self) -> AppResult<Vec<String>> {
        let rows = sqlx::query("SELECT id FROM teachers")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to list teacher ids: {e}")))?;
        Ok(rows.iter().map(|r| r.get("id")).collect())
    }

    /// Insert a new roster row
    ///
    /// # Errors
    ///
    /// Returns an error if the id already exists or the insert fails
    pub async fn insert(&self, teacher: &Teacher) -> AppResult<()> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            r"
            INSERT INTO teachers (id, display_name, chat_user_id, chat_linked_at, email, on_leave, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ",
        )
        .bind(&teacher.id)
        .bind(&teacher.display_name)
        .bind(&teacher.chat_user_id)
        .bind(format_timestamp(teacher.chat_linked_at))
        .bind(&teacher.email)
        .bind(i64::from(teacher.on_leave))
        .bind(teacher.created_at.to_rfc3339())
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to insert teacher: {e}")))?;
        Ok(())
    }

    /// Link a chat identity only if none is stored yet
    ///
    /// Returns `false` when the row already carries an identity (or does not
    /// exist); the caller re-reads to classify the conflict.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails
    pub async fn link_chat_user_if_unlinked(
        &self,
        id: &str,
        chat_user_id: &str,
        linked_at: DateTime<Utc>,
    ) -> AppResult<bool> {
        let at = linked_at.to_rfc3339();
        let result = sqlx::query(
            r"
            UPDATE teachers
            SET chat_user_id = $1, chat_linked_at = $2, updated_at = $2
            WHERE id = $3 AND (chat_user_id IS NULL OR TRIM(chat_user_id) = '')
            ",
        )
        .bind(chat_user_id)
        .bind(&at)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to link chat user: {e}")))?;
        Ok(result.rows_affected() > 0)
    }

    /// Replace the chat identity unconditionally
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails
    pub async fn replace_chat_user(
        &self,
        id: &str,
        chat_user_id: &str,
        linked_at: DateTime<Utc>,
    ) -> AppResult<bool> {
        let at = linked_at.to_rfc3339();
        let result = sqlx::query(
            r"
            UPDATE teachers
            SET chat_user_id = $1, chat_linked_at = $2, updated_at = $2
            WHERE id = $3
            ",
        )
        .bind(chat_user_id)
        .bind(&at)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to replace chat user: {e}")))?;
        Ok(result.rows_affected() > 0)
    }

    /// Store an email address
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails
    pub async fn update_email(&self, id: &str, email: &str) -> AppResult<bool> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            r"
            UPDATE teachers SET email = $1, updated_at = $2 WHERE id = $3
            ",
        )
        .bind(email)
        .bind(&now)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to update teacher email: {e}")))?;
        Ok(result.rows_affected() > 0)
    }

    /// Toggle the on-leave flag
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails
    pub async fn set_on_leave(&self, id: &str, on_leave: bool) -> AppResult<bool> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            r"
            UPDATE teachers SET on_leave = $1, updated_at = $2 WHERE id = $3
            ",
        )
        .bind(i64::from(on_leave))
        .bind(&now)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to update on-leave flag: {e}")))?;
        Ok(result.rows_affected() > 0)
    }
}
