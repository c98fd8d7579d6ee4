// ABOUTME: Per-user, per-topic pending conversation state with a fixed lifetime
// ABOUTME: Expired entries read as absent and are deleted on access
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Shift Sync Contributors

use chrono::{DateTime, Duration, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::{debug, warn};

use super::parse_required_timestamp;
use crate::errors::{AppError, AppResult};
use crate::models::{ConversationState, ConversationTopic, TopicPayload};

/// Session store for multi-turn chat interactions
///
/// One row per `(chat_user_id, topic)`; writes are last-write-wins. A chat
/// user sends messages serially, so no locking is applied.
#[derive(Clone)]
pub struct ConversationStateStore {
    pool: SqlitePool,
    ttl: Duration,
}

impl ConversationStateStore {
    /// Create a store whose entries expire after `ttl`
    #[must_use]
    pub const fn new(pool: SqlitePool, ttl: Duration) -> Self {
        Self { pool, ttl }
    }

    /// Lifetime applied to entries
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Store a payload, replacing any state for the same user and topic
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails
    pub async fn put<P: TopicPayload>(
        &self,
        chat_user_id: &str,
        payload: &P,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        let body = serde_json::to_string(payload)?;
        sqlx::query(
            r"
            INSERT INTO conversation_states (chat_user_id, topic, payload, created_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT(chat_user_id, topic) DO UPDATE SET payload = excluded.payload, created_at = excluded.created_at
            ",
        )
        .bind(chat_user_id)
        .bind(P::TOPIC.as_str())
        .bind(body)
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to store conversation state: {e}")))?;
        Ok(())
    }

    fn map_row(row: &SqliteRow) -> AppResult<ConversationState> {
        let payload: String = row.get("payload");
        let topic_text: String = row.get("topic");
        Ok(ConversationState {
            chat_user_id: row.get("chat_user_id"),
            topic: ConversationTopic::parse(&topic_text)?,
            payload: serde_json::from_str(&payload)?,
            created_at: parse_required_timestamp(
                "conversation_states.created_at",
                row.get("created_at"),
            )?,
        })
    }

    /// Raw state row regardless of expiry
    ///
    /// A row that no longer decodes is deleted and reported as absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the query or the cleanup delete fails
    pub async fn load(
        &self,
        chat_user_id: &str,
        topic: ConversationTopic,
    ) -> AppResult<Option<ConversationState>> {
        let row = sqlx::query(
            r"
            SELECT chat_user_id, topic, payload, created_at
            FROM conversation_states
            WHERE chat_user_id = $1 AND topic = $2
            ",
        )
        .bind(chat_user_id)
        .bind(topic.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to load conversation state: {e}")))?;

        let Some(row) = row else {
            return Ok(None);
        };
        match Self::map_row(&row) {
            Ok(state) => Ok(Some(state)),
            Err(e) => {
                warn!(topic = %topic, error = %e, "Discarding malformed conversation state");
                self.delete(chat_user_id, topic).await?;
                Ok(None)
            }
        }
    }

    /// Live typed payload for the user, or `None`
    ///
    /// An expired entry is deleted and reported as absent. An entry whose
    /// payload no longer decodes is deleted as well so it cannot wedge the
    /// conversation.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or cleaned up
    pub async fn get<P: TopicPayload>(
        &self,
        chat_user_id: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<P>> {
        let Some(state) = self.load(chat_user_id, P::TOPIC).await? else {
            return Ok(None);
        };

        if state.is_expired(now, self.ttl) {
            debug!(topic = %P::TOPIC, "Conversation state expired");
            self.delete(chat_user_id, P::TOPIC).await?;
            return Ok(None);
        }

        match state.decode::<P>() {
            Ok(payload) => Ok(Some(payload)),
            Err(e) => {
                debug!(topic = %P::TOPIC, error = %e, "Discarding undecodable conversation state");
                self.delete(chat_user_id, P::TOPIC).await?;
                Ok(None)
            }
        }
    }

    /// Remove the state for a user and topic
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails
    pub async fn delete(&self, chat_user_id: &str, topic: ConversationTopic) -> AppResult<bool> {
        let result = sqlx::query(
            r"
            DELETE FROM conversation_states WHERE chat_user_id = $1 AND topic = $2
            ",
        )
        .bind(chat_user_id)
        .bind(topic.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to delete conversation state: {e}")))?;
        Ok(result.rows_affected() > 0)
    }

    /// Drop every entry older than the lifetime
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let cutoff = (now - self.ttl).to_rfc3339();
        let result = sqlx::query(
            r"
            DELETE FROM conversation_states WHERE created_at < $1
            ",
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to purge conversation states: {e}")))?;
        Ok(result.rows_affected())
    }
}
