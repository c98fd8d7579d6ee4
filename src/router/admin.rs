// ABOUTME: Admin branch of the router: reopen commands and replies to the month menu
// ABOUTME: A command naming several submitted months stores a month-select state and shows the menu
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Shift Sync Contributors

use chrono::{DateTime, Datelike, Utc};
use tracing::{info, warn};

use super::ConversationRouter;
use crate::commands::{parse_month_choice, parse_unlock_command, UnlockRequest};
use crate::errors::AppResult;
use crate::lifecycle::reopen::ReopenOutcome;
use crate::messages;
use crate::models::{ConversationTopic, MonthSelectPayload};

impl ConversationRouter {
    /// `None` when the text is neither a menu reply nor a command
    pub(super) async fn handle_admin(
        &self,
        user: &str,
        text: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<String>> {
        if let Some(pending) = self.states.get::<MonthSelectPayload>(user, now).await? {
            return Ok(Some(self.complete_month_choice(user, text, &pending).await?));
        }

        let year = self.ctx.local_date(now).year();
        let command = match parse_unlock_command(text, year) {
            None => return Ok(None),
            Some(UnlockRequest::InvalidMonth(month)) => {
                info!(month = %month, "Admin reopen command with an invalid month");
                return Ok(Some(messages::invalid_unlock_month(&month)));
            }
            Some(UnlockRequest::Command(command)) => command,
        };
        info!(month = ?command.month_key, "Admin reopen command");

        let outcome = self
            .reopen
            .reopen(&command.teacher_name, command.month_key)
            .await?;
        if let ReopenOutcome::NeedsMonthChoice { name, months } = &outcome {
            self.states
                .put(
                    user,
                    &MonthSelectPayload {
                        teacher_name: name.clone(),
                        available_months: months.clone(),
                    },
                    now,
                )
                .await?;
        }
        Ok(Some(outcome.reply_text()))
    }

    async fn complete_month_choice(
        &self,
        user: &str,
        text: &str,
        pending: &MonthSelectPayload,
    ) -> AppResult<String> {
        let Some(month) = parse_month_choice(text, &pending.available_months) else {
            return Ok(messages::invalid_month_choice(&pending.available_months));
        };

        let reply = match self.reopen.reopen(&pending.teacher_name, Some(month)).await {
            Ok(outcome) => outcome.reply_text(),
            Err(e) => {
                warn!(error = %e, "Reopen after month selection failed");
                messages::REOPEN_FAILED.to_owned()
            }
        };
        self.states
            .delete(user, ConversationTopic::MonthSelect)
            .await?;
        Ok(reply)
    }
}
