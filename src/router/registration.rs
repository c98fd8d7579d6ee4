// ABOUTME: Registration branch: resolve the name in a message and link, create or update the teacher
// ABOUTME: Never overwrites another identity unless the roster email matches and relinking is allowed
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Shift Sync Contributors

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::ConversationRouter;
use crate::commands::{strip_registration_prefix, REGISTRATION_PREFIX};
use crate::contact::{extract_email, extract_name_from_text, is_gmail, is_valid_email, looks_like_name, strip_emails};
use crate::errors::AppResult;
use crate::messages;
use crate::models::{EmailConfirmPayload, EmailRequestPayload, Teacher};
use crate::registry::LinkOutcome;

/// Minimum characters for a name to register
const MIN_NAME_CHARS: usize = 2;

/// What a registration message carries
struct Intent {
    has_prefix: bool,
    email: Option<String>,
    name: String,
}

impl Intent {
    fn parse(text: &str) -> Self {
        let (has_prefix, _) = strip_registration_prefix(text);
        let email = extract_email(text).filter(|e| is_valid_email(e));

        let strip_prefix = |s: String| -> String {
            if has_prefix {
                s.trim_start()
                    .strip_prefix(REGISTRATION_PREFIX)
                    .map_or_else(|| s.clone(), |rest| rest.trim().to_owned())
            } else {
                s
            }
        };

        let mut name = strip_prefix(extract_name_from_text(text));
        if name.is_empty() {
            name = strip_prefix(strip_emails(text));
        }
        Self {
            has_prefix,
            email,
            name,
        }
    }

    fn name_is_usable(&self) -> bool {
        self.name.chars().count() >= MIN_NAME_CHARS
    }
}

impl ConversationRouter {
    /// `None` means the message is ignored
    pub(super) async fn handle_registration(
        &self,
        user: &str,
        text: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<String>> {
        let intent = Intent::parse(text);

        if let Some(existing) = self.ctx.registry.find_by_chat_user_id(user).await? {
            if existing.is_fully_registered() && intent.email.is_none() && !intent.has_prefix {
                debug!("Registered teacher sent ordinary chat");
                return Ok(None);
            }
        }

        let lookup = if intent.name.is_empty() { text } else { intent.name.as_str() };
        let outcome = self.ctx.registry.link_by_name(lookup, user, now).await?;
        let reply = match outcome {
            LinkOutcome::NotFound => return self.register_new(user, &intent, now).await,
            LinkOutcome::Multiple(candidates) => messages::ambiguous_name(&candidates),
            LinkOutcome::AlreadyLinkedOther(teacher) => {
                self.linked_elsewhere(user, &teacher, intent.email.as_deref(), now)
                    .await?
            }
            LinkOutcome::AlreadyLinkedSame(teacher) => {
                self.already_linked(user, &teacher, intent.email.as_deref(), now)
                    .await?
            }
            LinkOutcome::Linked(teacher) => {
                self.newly_linked(user, &teacher, intent.email.as_deref(), now)
                    .await?
            }
        };
        Ok(Some(reply))
    }

    async fn register_new(
        &self,
        user: &str,
        intent: &Intent,
        now: DateTime<Utc>,
    ) -> AppResult<Option<String>> {
        if intent.email.is_some() || intent.has_prefix {
            if !intent.name_is_usable() {
                return Ok(Some(messages::NEED_NAME_AND_GMAIL.to_owned()));
            }
            let gmail = intent.email.as_deref().filter(|e| is_gmail(e));
            let teacher = self
                .ctx
                .registry
                .create(&intent.name, Some(user), gmail, now)
                .await?;
            info!(teacher_id = %teacher.id, "Registered new teacher");

            let mut reply = messages::registered(teacher.last_name());
            match gmail {
                Some(email) => reply.push_str(&messages::email_registered_suffix(email)),
                None => {
                    self.request_email(user, &teacher, now).await?;
                    reply.push_str(&messages::gmail_request_suffix());
                }
            }
            return Ok(Some(reply));
        }

        if intent.name_is_usable() && looks_like_name(&intent.name, &self.config.name_heuristics) {
            let teacher = self
                .ctx
                .registry
                .create(&intent.name, Some(user), None, now)
                .await?;
            info!(teacher_id = %teacher.id, "Registered new teacher from a bare name");
            self.request_email(user, &teacher, now).await?;
            return Ok(Some(messages::gmail_request(teacher.last_name())));
        }

        debug!("Text does not look like a name; ignoring");
        Ok(None)
    }

    async fn request_email(&self, user: &str, teacher: &Teacher, now: DateTime<Utc>) -> AppResult<()> {
        self.states
            .put(
                user,
                &EmailRequestPayload {
                    teacher_id: teacher.id.clone(),
                    name: teacher.display_name.clone(),
                },
                now,
            )
            .await
    }

    async fn confirm_change(
        &self,
        user: &str,
        teacher: &Teacher,
        current: &str,
        submitted: &str,
        now: DateTime<Utc>,
    ) -> AppResult<String> {
        self.states
            .put(
                user,
                &EmailConfirmPayload {
                    teacher_id: teacher.id.clone(),
                    name: teacher.display_name.clone(),
                    old_email: current.to_owned(),
                    new_email: submitted.to_owned(),
                },
                now,
            )
            .await?;
        Ok(messages::confirm_email_change(current, submitted))
    }

    /// Store a submitted email on a teacher that has none, asking again for non-Gmail
    async fn fill_missing_email(
        &self,
        user: &str,
        teacher: &Teacher,
        email: &str,
        now: DateTime<Utc>,
    ) -> AppResult<String> {
        let mut reply = messages::registered(teacher.last_name());
        if is_gmail(email) {
            self.ctx.registry.update_email(&teacher.id, email).await?;
            reply.push_str(&messages::email_registered_suffix(email));
        } else {
            self.request_email(user, teacher, now).await?;
            reply.push_str(&messages::gmail_request_suffix());
        }
        Ok(reply)
    }

    async fn linked_elsewhere(
        &self,
        user: &str,
        teacher: &Teacher,
        email: Option<&str>,
        now: DateTime<Utc>,
    ) -> AppResult<String> {
        let email_matches = email.is_some_and(|e| teacher.email.as_deref() == Some(e));
        if email_matches && self.config.allow_email_relink {
            let teacher = self.ctx.registry.relink(&teacher.id, user, now).await?;
            return Ok(messages::relinked(teacher.last_name()));
        }
        if email_matches {
            warn!(teacher_id = %teacher.id, "Email matched but relinking is disabled");
        }
        Ok(messages::linked_elsewhere(&teacher.display_name))
    }

    async fn already_linked(
        &self,
        user: &str,
        teacher: &Teacher,
        email: Option<&str>,
        now: DateTime<Utc>,
    ) -> AppResult<String> {
        match (email, teacher.email.as_deref()) {
            (Some(submitted), Some(current)) if submitted == current => {
                Ok(messages::already_registered(teacher.last_name()))
            }
            (Some(submitted), Some(current)) => {
                self.confirm_change(user, teacher, current, submitted, now)
                    .await
            }
            (Some(submitted), None) => self.fill_missing_email(user, teacher, submitted, now).await,
            (None, _) => Ok(messages::already_registered(teacher.last_name())),
        }
    }

    async fn newly_linked(
        &self,
        user: &str,
        teacher: &Teacher,
        email: Option<&str>,
        now: DateTime<Utc>,
    ) -> AppResult<String> {
        let last_name = teacher.last_name();
        match (email, teacher.email.as_deref()) {
            (Some(submitted), Some(current)) if submitted == current => {
                Ok(messages::already_registered(last_name))
            }
            (Some(submitted), Some(current)) => {
                let confirm = self
                    .confirm_change(user, teacher, current, submitted, now)
                    .await?;
                Ok(format!("{}\n\n{confirm}", messages::registered(last_name)))
            }
            (Some(submitted), None) => self.fill_missing_email(user, teacher, submitted, now).await,
            (None, Some(_)) => Ok(messages::registered(last_name)),
            (None, None) => {
                self.request_email(user, teacher, now).await?;
                Ok(format!(
                    "{}\n\n{}",
                    messages::registered(last_name),
                    messages::gmail_request(last_name)
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intent_strips_prefix_and_email() {
        let intent = Intent::parse("講師登録 山田太郎 taro@gmail.com");
        assert!(intent.has_prefix);
        assert_eq!(intent.email.as_deref(), Some("taro@gmail.com"));
        assert_eq!(intent.name, "山田太郎");
    }

    #[test]
    fn intent_without_name() {
        let intent = Intent::parse("taro@gmail.com");
        assert!(!intent.has_prefix);
        assert!(intent.name.is_empty());
        assert!(!intent.name_is_usable());
    }
}
