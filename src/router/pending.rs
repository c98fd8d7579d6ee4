// ABOUTME: Router branches for replies to a pending email confirmation or email request
// ABOUTME: Valid answers consume the state; anything else re-prompts and keeps it
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Shift Sync Contributors

use chrono::{DateTime, Utc};
use tracing::info;

use super::ConversationRouter;
use crate::commands::{parse_confirmation, Confirmation};
use crate::contact::{extract_email, is_gmail, is_valid_email};
use crate::errors::AppResult;
use crate::messages;
use crate::models::{extract_last_name, ConversationTopic, EmailConfirmPayload, EmailRequestPayload};

impl ConversationRouter {
    pub(super) async fn handle_email_confirm(
        &self,
        user: &str,
        text: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<String>> {
        let Some(pending) = self.states.get::<EmailConfirmPayload>(user, now).await? else {
            return Ok(None);
        };

        let reply = match parse_confirmation(text) {
            Some(Confirmation::Yes) => {
                let reply = if self.ctx.registry.get(&pending.teacher_id).await?.is_some() {
                    self.ctx
                        .registry
                        .update_email(&pending.teacher_id, &pending.new_email)
                        .await?;
                    info!(teacher_id = %pending.teacher_id, "Email changed after confirmation");
                    messages::email_changed(&pending.new_email)
                } else {
                    messages::TEACHER_MISSING.to_owned()
                };
                self.states.delete(user, ConversationTopic::EmailConfirm).await?;
                reply
            }
            Some(Confirmation::No) => {
                self.states.delete(user, ConversationTopic::EmailConfirm).await?;
                messages::EMAIL_CHANGE_CANCELLED.to_owned()
            }
            None => messages::EMAIL_CHANGE_REPROMPT.to_owned(),
        };
        Ok(Some(reply))
    }

    pub(super) async fn handle_email_request(
        &self,
        user: &str,
        text: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<String>> {
        let Some(pending) = self.states.get::<EmailRequestPayload>(user, now).await? else {
            return Ok(None);
        };
        let last_name = extract_last_name(&pending.name);

        let Some(email) = extract_email(text).filter(|e| is_valid_email(e) && is_gmail(e)) else {
            return Ok(Some(messages::gmail_request(last_name)));
        };

        let reply = if self.ctx.registry.get(&pending.teacher_id).await?.is_some() {
            self.ctx
                .registry
                .update_email(&pending.teacher_id, &email)
                .await?;
            info!(teacher_id = %pending.teacher_id, "Email registered from request");
            messages::email_request_completed(&email, last_name)
        } else {
            messages::TEACHER_MISSING.to_owned()
        };
        self.states.delete(user, ConversationTopic::EmailRequest).await?;
        Ok(Some(reply))
    }
}
