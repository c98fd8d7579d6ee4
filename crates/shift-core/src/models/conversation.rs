// ABOUTME: Pending multi-turn conversation topics and their typed payloads
// ABOUTME: Each payload type is bound to exactly one topic through the TopicPayload trait
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Shift Sync Contributors

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::MonthKey;
use crate::errors::{AppError, AppResult};

/// Kind of pending interaction stored for a chat user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationTopic {
    /// Waiting for yes/no on replacing a registered email
    EmailConfirm,
    /// Waiting for the teacher to send a Gmail address
    EmailRequest,
    /// Waiting for the admin to pick a month to reopen
    MonthSelect,
}

impl ConversationTopic {
    /// Stored string form
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EmailConfirm => "email_confirm",
            Self::EmailRequest => "email_request",
            Self::MonthSelect => "month_select",
        }
    }

    /// Parse a stored topic
    ///
    /// # Errors
    ///
    /// Returns a validation error for unknown topics
    pub fn parse(value: &str) -> AppResult<Self> {
        match value {
            "email_confirm" => Ok(Self::EmailConfirm),
            "email_request" => Ok(Self::EmailRequest),
            "month_select" => Ok(Self::MonthSelect),
            other => Err(AppError::validation(format!(
                "Unrecognized conversation topic: '{other}'"
            ))),
        }
    }
}

impl fmt::Display for ConversationTopic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload type stored under a fixed topic
pub trait TopicPayload: Serialize + DeserializeOwned + Send + Sync {
    /// Topic this payload belongs to
    const TOPIC: ConversationTopic;
}

/// Teacher asked to replace their registered email
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailConfirmPayload {
    /// Roster id of the teacher being updated
    pub teacher_id: String,
    /// Display name at the time of the request
    pub name: String,
    /// Currently registered address
    pub old_email: String,
    /// Proposed replacement
    pub new_email: String,
}

impl TopicPayload for EmailConfirmPayload {
    const TOPIC: ConversationTopic = ConversationTopic::EmailConfirm;
}

/// Teacher registered without a usable Gmail address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailRequestPayload {
    /// Roster id of the teacher awaiting an email
    pub teacher_id: String,
    /// Display name at the time of the request
    pub name: String,
}

impl TopicPayload for EmailRequestPayload {
    const TOPIC: ConversationTopic = ConversationTopic::EmailRequest;
}

/// Admin reopen command that matched several submitted months
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthSelectPayload {
    /// Teacher name as typed in the command
    pub teacher_name: String,
    /// Menu of submitted months offered to the admin
    pub available_months: Vec<MonthKey>,
}

impl TopicPayload for MonthSelectPayload {
    const TOPIC: ConversationTopic = ConversationTopic::MonthSelect;
}

/// Stored conversation state row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    /// Chat user the state belongs to
    pub chat_user_id: String,
    /// Topic of the pending interaction
    pub topic: ConversationTopic,
    /// Topic-specific payload
    pub payload: serde_json::Value,
    /// When the state was written
    pub created_at: DateTime<Utc>,
}

impl ConversationState {
    /// Expired when strictly older than `ttl` at `now`
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.created_at > ttl
    }

    /// Decode the payload into its typed form
    ///
    /// # Errors
    ///
    /// Returns an error when the topic does not match or the payload is malformed
    pub fn decode<P: TopicPayload>(&self) -> AppResult<P> {
        if self.topic != P::TOPIC {
            return Err(AppError::validation(format!(
                "State topic {} does not match requested topic {}",
                self.topic,
                P::TOPIC
            )));
        }
        Ok(serde_json::from_value(self.payload.clone())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn expiry_is_strictly_after_ttl() {
        let created = Utc::now();
        let state = ConversationState {
            chat_user_id: "U1".to_owned(),
            topic: ConversationTopic::EmailRequest,
            payload: json!({"teacher_id": "T001", "name": "山田 太郎"}),
            created_at: created,
        };
        let ttl = Duration::hours(24);
        assert!(!state.is_expired(created + ttl, ttl));
        assert!(state.is_expired(created + ttl + Duration::seconds(1), ttl));
    }

    #[test]
    fn decode_checks_topic() {
        let state = ConversationState {
            chat_user_id: "U1".to_owned(),
            topic: ConversationTopic::EmailRequest,
            payload: json!({"teacher_id": "T001", "name": "山田 太郎"}),
            created_at: Utc::now(),
        };
        assert!(state.decode::<EmailRequestPayload>().is_ok());
        assert!(state.decode::<EmailConfirmPayload>().is_err());
    }
}
