// ABOUTME: SQLite connection management, embedded migrations, and schema verification
// ABOUTME: Hands out per-table managers that share one connection pool
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Shift Sync Contributors

/// Pending multi-turn conversation state with expiry
pub mod conversation_states;
/// Reminder policy table and the at-most-once send log
pub mod reminders;
/// Required-column contract for every table
pub mod schema;
/// Submission ledger rows
pub mod submissions;
/// Teacher roster rows
pub mod teachers;

pub use conversation_states::ConversationStateStore;
pub use reminders::ReminderRuleManager;
pub use submissions::{DecodedRows, SubmissionManager};
pub use teachers::TeacherManager;

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tracing::info;

use crate::errors::{AppError, AppResult};

/// Shared database handle
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connect, run migrations, verify the column contract, and seed reminder rules
    ///
    /// In-memory URLs are pinned to a single connection so every manager sees
    /// the same database.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The URL is malformed or the file cannot be created
    /// - A migration fails
    /// - A required column is missing
    pub async fn connect(database_url: &str) -> AppResult<Self> {
        let in_memory = database_url.contains(":memory:");
        let mut options = SqlitePoolOptions::new().max_connections(if in_memory { 1 } else { 5 });
        if in_memory {
            // Dropping the only connection would drop the database
            options = options.idle_timeout(None).max_lifetime(None);
        }
        let pool = options
            .connect(database_url)
            .await
            .map_err(|e| AppError::database(format!("Failed to connect to database: {e}")))?;

        let db = Self { pool };
        db.migrate().await?;
        db.verify_schema().await?;

        let seeded = db.reminder_rules().seed_defaults().await?;
        if seeded > 0 {
            info!(rules = seeded, "Seeded default reminder rules");
        }
        Ok(db)
    }

    /// Apply embedded migrations
    ///
    /// # Errors
    ///
    /// Returns an error if any migration fails
    pub async fn migrate(&self) -> AppResult<()> {
        info!("Running database migrations...");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Migration failed: {e}")))?;
        info!("Database migrations completed successfully");
        Ok(())
    }

    /// Check every table against its required-column contract
    ///
    /// # Errors
    ///
    /// Returns `MissingRequiredColumn` for the first absent column
    pub async fn verify_schema(&self) -> AppResult<()> {
        for contract in schema::CONTRACTS {
            contract.verify(&self.pool).await?;
        }
        Ok(())
    }

    /// Underlying connection pool
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Roster table
    #[must_use]
    pub fn teachers(&self) -> TeacherManager {
        TeacherManager::new(self.pool.clone())
    }

    /// Ledger table
    #[must_use]
    pub fn submissions(&self) -> SubmissionManager {
        SubmissionManager::new(self.pool.clone())
    }

    /// Reminder policy and send log
    #[must_use]
    pub fn reminder_rules(&self) -> ReminderRuleManager {
        ReminderRuleManager::new(self.pool.clone())
    }

    /// Conversation state with the given lifetime
    #[must_use]
    pub fn conversation_states(&self, ttl: chrono::Duration) -> ConversationStateStore {
        ConversationStateStore::new(self.pool.clone(), ttl)
    }
}

/// Parse an optional RFC 3339 column
///
/// # Errors
///
/// Returns a validation error for a malformed timestamp
pub(crate) fn parse_timestamp(
    column: &str,
    value: Option<String>,
) -> AppResult<Option<DateTime<Utc>>> {
    value
        .filter(|v| !v.trim().is_empty())
        .map(|v| {
            DateTime::parse_from_rfc3339(v.trim())
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| AppError::validation(format!("Invalid timestamp in {column}: {e}")))
        })
        .transpose()
}

/// Parse a required RFC 3339 column
///
/// # Errors
///
/// Returns a validation error for a missing or malformed timestamp
pub(crate) fn parse_required_timestamp(column: &str, value: String) -> AppResult<DateTime<Utc>> {
    parse_timestamp(column, Some(value))?
        .ok_or_else(|| AppError::validation(format!("Missing timestamp in {column}")))
}

/// Format an optional timestamp for storage
pub(crate) fn format_timestamp(value: Option<DateTime<Utc>>) -> Option<String> {
    value.map(|dt| dt.to_rfc3339())
}
