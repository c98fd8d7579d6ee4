// ABOUTME: Inbound chat message state machine choosing one handler per message
// ABOUTME: Priority order is admin commands, pending email confirm, pending email request, registration
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Shift Sync Contributors

//! Conversation router
//!
//! Each message is handled by the first branch that claims it. Multi-turn
//! flows persist their progress in the [`ConversationStateStore`] so the
//! next message from the same user sees it; nothing is held in memory
//! between messages.

/// Admin reopen commands and month selection
mod admin;
/// Pending email confirmation and email request replies
mod pending;
/// Name-based registration and contact updates
mod registration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, instrument};

use crate::config::ConversationConfig;
use crate::database::ConversationStateStore;
use crate::errors::AppResult;
use crate::external::reply_logged;
use crate::lifecycle::reopen::ReopenService;
use crate::lifecycle::LifecycleContext;

/// A text message received from the chat platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Sender's chat identity
    pub chat_user_id: String,
    /// Token for the one reply this message allows
    pub reply_token: String,
    /// Message text
    pub text: String,
}

/// Branch that handled a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    /// Admin command or month selection
    Admin,
    /// Reply to a pending email change confirmation
    EmailConfirm,
    /// Reply to a pending email request
    EmailRequest,
    /// Registration or contact update
    Registration,
    /// Ordinary chat from a registered teacher, or text that is not a name
    Ignored,
}

/// What the router decided for one message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handled {
    /// Branch taken
    pub route: Route,
    /// Reply to send, if any
    pub reply: Option<String>,
}

impl Handled {
    fn reply(route: Route, text: impl Into<String>) -> Self {
        Self {
            route,
            reply: Some(text.into()),
        }
    }

    const fn ignored() -> Self {
        Self {
            route: Route::Ignored,
            reply: None,
        }
    }
}

/// Inbound message state machine
#[derive(Clone)]
pub struct ConversationRouter {
    ctx: LifecycleContext,
    states: ConversationStateStore,
    reopen: ReopenService,
    config: ConversationConfig,
}

impl ConversationRouter {
    /// Create a router
    #[must_use]
    pub fn new(
        ctx: LifecycleContext,
        states: ConversationStateStore,
        config: ConversationConfig,
    ) -> Self {
        Self {
            reopen: ReopenService::new(ctx.clone()),
            ctx,
            states,
            config,
        }
    }

    fn is_admin(&self, chat_user_id: &str) -> bool {
        self.ctx
            .admin_chat_user_id
            .as_deref()
            .is_some_and(|admin| admin == chat_user_id)
    }

    /// Decide the reply for a message without sending it
    ///
    /// # Errors
    ///
    /// Returns an error if the roster, ledger or state store fails
    #[instrument(skip(self, message), fields(user = %message.chat_user_id))]
    pub async fn handle_at(&self, message: &InboundMessage, now: DateTime<Utc>) -> AppResult<Handled> {
        let user = message.chat_user_id.as_str();
        let text = message.text.trim();

        if self.is_admin(user) {
            if let Some(reply) = self.handle_admin(user, text, now).await? {
                return Ok(Handled::reply(Route::Admin, reply));
            }
            debug!("Admin text is not a command; continuing as a regular message");
        }

        if let Some(reply) = self.handle_email_confirm(user, text, now).await? {
            return Ok(Handled::reply(Route::EmailConfirm, reply));
        }

        if let Some(reply) = self.handle_email_request(user, text, now).await? {
            return Ok(Handled::reply(Route::EmailRequest, reply));
        }

        Ok(self
            .handle_registration(user, text, now)
            .await?
            .map_or_else(Handled::ignored, |reply| {
                Handled::reply(Route::Registration, reply)
            }))
    }

    /// Handle a message and send the reply
    ///
    /// # Errors
    ///
    /// Returns an error if handling fails; reply delivery failures are only logged
    pub async fn dispatch(&self, message: &InboundMessage, now: DateTime<Utc>) -> AppResult<Handled> {
        let handled = self.handle_at(message, now).await?;
        if let Some(reply) = &handled.reply {
            reply_logged(self.ctx.chat.as_ref(), &message.reply_token, reply).await;
        }
        debug!(route = ?handled.route, replied = handled.reply.is_some(), "Message handled");
        Ok(handled)
    }
}
