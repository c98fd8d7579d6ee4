// ABOUTME: Typed column contract per table, checked against PRAGMA table_info
// ABOUTME: A missing required column fails fast as MissingRequiredColumn
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Shift Sync Contributors

use sqlx::{Row, SqlitePool};

use crate::errors::{db_error, AppError, AppResult};

/// Columns a table must expose for the code reading it
#[derive(Debug, Clone, Copy)]
pub struct TableContract {
    /// Table name
    pub table: &'static str,
    /// Required column names
    pub columns: &'static [&'static str],
}

/// Roster
pub const TEACHERS: TableContract = TableContract {
    table: "teachers",
    columns: &[
        "id",
        "display_name",
        "chat_user_id",
        "chat_linked_at",
        "email",
        "on_leave",
        "created_at",
        "updated_at",
    ],
};

/// Ledger
pub const SUBMISSIONS: TableContract = TableContract {
    table: "submissions",
    columns: &[
        "key",
        "month_key",
        "teacher_id",
        "teacher_name",
        "document_url",
        "status",
        "submitted_at",
        "locked_at",
        "ack_notified_at",
        "reminder_notified_at",
        "created_at",
        "updated_at",
    ],
};

/// Pending conversation turns
pub const CONVERSATION_STATES: TableContract = TableContract {
    table: "conversation_states",
    columns: &["chat_user_id", "topic", "payload", "created_at"],
};

/// Reminder policy
pub const REMINDER_RULES: TableContract = TableContract {
    table: "reminder_rules",
    columns: &[
        "id",
        "label",
        "days_before_deadline",
        "audience",
        "template",
        "enabled",
        "position",
    ],
};

/// Reminder send log
pub const REMINDER_LOG: TableContract = TableContract {
    table: "reminder_log",
    columns: &["rule_id", "subject", "sent_on", "sent_at"],
};

/// Every contract checked at startup
pub const CONTRACTS: &[TableContract] = &[
    TEACHERS,
    SUBMISSIONS,
    CONVERSATION_STATES,
    REMINDER_RULES,
    REMINDER_LOG,
];

impl TableContract {
    /// Columns currently present on the table
    ///
    /// # Errors
    ///
    /// Returns an error if the pragma query fails
    pub async fn present_columns(&self, pool: &SqlitePool) -> AppResult<Vec<String>> {
        // Table names come from the static contracts above, never from input
        let rows = sqlx::query(&format!("PRAGMA table_info({})", self.table))
            .fetch_all(pool)
            .await
            .map_err(|e| db_error(&format!("inspect table {}", self.table), &e))?;
        Ok(rows.iter().map(|r| r.get::<String, _>("name")).collect())
    }

    /// First required column absent from `present`
    #[must_use]
    pub fn first_missing(&self, present: &[String]) -> Option<&'static str> {
        self.columns
            .iter()
            .find(|col| !present.iter().any(|p| p == *col))
            .copied()
    }

    /// Fail with `MissingRequiredColumn` if any required column is absent
    ///
    /// # Errors
    ///
    /// Returns an error if the table lacks a column or cannot be inspected
    pub async fn verify(&self, pool: &SqlitePool) -> AppResult<()> {
        let present = self.present_columns(pool).await?;
        match self.first_missing(&present) {
            Some(column) => Err(AppError::missing_column(self.table, column)),
            None => Ok(()),
        }
    }
}
