// ABOUTME: Teacher roster lookups, sequential id assignment, and chat identity linking
// ABOUTME: Enforces that a linked chat identity is never silently replaced
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Shift Sync Contributors

use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use tracing::{info, warn};

use crate::database::TeacherManager;
use crate::errors::{AppError, AppResult};
use crate::models::Teacher;
use crate::names::{normalize, NameMatcher, Resolution};

fn sequential_id_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^T(\d+)$").ok()).as_ref()
}

/// Next `T###` id after the highest numeric id in `ids`
#[must_use]
pub fn next_teacher_id<S: AsRef<str>>(ids: &[S]) -> String {
    let max = sequential_id_pattern().map_or(0, |re| {
        ids.iter()
            .filter_map(|id| re.captures(id.as_ref().trim()))
            .filter_map(|caps| caps.get(1)?.as_str().parse::<u32>().ok())
            .max()
            .unwrap_or(0)
    });
    format!("T{:03}", max + 1)
}

/// Result of a name lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameLookup {
    /// One teacher resolved
    Found(Teacher),
    /// Several candidates at the deciding match level
    Multiple(Vec<Teacher>),
    /// No candidate
    NotFound,
}

/// Result of linking a chat identity to a teacher
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkOutcome {
    /// Identity stored on a teacher that had none
    Linked(Teacher),
    /// Teacher already carries this identity
    AlreadyLinkedSame(Teacher),
    /// Teacher carries a different identity; nothing was written
    AlreadyLinkedOther(Teacher),
    /// Name matched several teachers
    Multiple(Vec<String>),
    /// Name or id matched nobody
    NotFound,
}

/// Roster access with matching and identity invariants
#[derive(Clone)]
pub struct TeacherRegistry {
    teachers: TeacherManager,
    matcher: NameMatcher,
}

impl TeacherRegistry {
    /// Create a registry over the roster table
    #[must_use]
    pub const fn new(teachers: TeacherManager, matcher: NameMatcher) -> Self {
        Self { teachers, matcher }
    }

    /// Whole roster snapshot
    ///
    /// # Errors
    ///
    /// Returns an error if the roster cannot be read
    pub async fn list_all(&self) -> AppResult<Vec<Teacher>> {
        self.teachers.list_all().await
    }

    /// Teachers not on leave
    ///
    /// # Errors
    ///
    /// Returns an error if the roster cannot be read
    pub async fn list_active(&self) -> AppResult<Vec<Teacher>> {
        Ok(self
            .teachers
            .list_all()
            .await?
            .into_iter()
            .filter(|t| !t.on_leave)
            .collect())
    }

    /// Teacher by roster id
    ///
    /// # Errors
    ///
    /// Returns an error if the roster cannot be read
    pub async fn get(&self, id: &str) -> AppResult<Option<Teacher>> {
        self.teachers.get(id).await
    }

    /// Resolve a free-text name against the live roster
    ///
    /// # Errors
    ///
    /// Returns an error if the roster cannot be read
    pub async fn find_by_name(&self, name: &str) -> AppResult<NameLookup> {
        let roster = self.teachers.list_all().await?;
        let key = normalize(name);
        Ok(match self.matcher.resolve(&key, &roster) {
            Resolution::Unique(t) => NameLookup::Found(t.clone()),
            Resolution::Multiple(ts) => NameLookup::Multiple(ts.into_iter().cloned().collect()),
            Resolution::NotFound => NameLookup::NotFound,
        })
    }

    /// Teacher linked to a chat identity
    ///
    /// # Errors
    ///
    /// Returns an error if the roster cannot be read
    pub async fn find_by_chat_user_id(&self, chat_user_id: &str) -> AppResult<Option<Teacher>> {
        if chat_user_id.trim().is_empty() {
            return Ok(None);
        }
        self.teachers.find_by_chat_user_id(chat_user_id).await
    }

    /// Teacher behind a ledger row: id match first, then exact name key
    /// when the row has no id or the roster row has none
    ///
    /// # Errors
    ///
    /// Returns an error if the roster cannot be read
    pub async fn find_for_record(
        &self,
        teacher_id: Option<&str>,
        name: &str,
    ) -> AppResult<Option<Teacher>> {
        let roster = self.teachers.list_all().await?;
        let name_key = normalize(name);
        let id = teacher_id.map(str::trim).filter(|id| !id.is_empty());

        if let Some(id) = id {
            if let Some(t) = roster.iter().find(|t| t.id == id) {
                return Ok(Some(t.clone()));
            }
        }
        if name_key.is_empty() {
            return Ok(None);
        }
        Ok(roster
            .into_iter()
            .find(|t| (id.is_none() || t.id.trim().is_empty()) && normalize(&t.display_name) == name_key))
    }

    /// Add a teacher with the next sequential id
    ///
    /// Ids come from scanning the roster for the highest `T###`; two
    /// concurrent creations can pick the same id, in which case the second
    /// insert fails on the primary key.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is blank or the insert fails
    pub async fn create(
        &self,
        name: &str,
        chat_user_id: Option<&str>,
        email: Option<&str>,
        now: DateTime<Utc>,
    ) -> AppResult<Teacher> {
        let display_name = name.trim();
        if display_name.is_empty() {
            return Err(AppError::invalid_input("Teacher name must not be empty"));
        }

        let ids = self.teachers.list_ids().await?;
        let chat_user_id = chat_user_id.map(str::trim).filter(|v| !v.is_empty());
        let teacher = Teacher {
            id: next_teacher_id(&ids),
            display_name: display_name.to_owned(),
            chat_user_id: chat_user_id.map(ToOwned::to_owned),
            chat_linked_at: chat_user_id.map(|_| now),
            email: email
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(ToOwned::to_owned),
            on_leave: false,
            created_at: now,
        };
        self.teachers.insert(&teacher).await?;
        info!(teacher_id = %teacher.id, "Created teacher");
        Ok(teacher)
    }

    /// Link a chat identity to a teacher by id
    ///
    /// Never overwrites an existing different identity.
    ///
    /// # Errors
    ///
    /// Returns an error if the roster cannot be read or written
    pub async fn link_chat_user(
        &self,
        teacher_id: &str,
        chat_user_id: &str,
        now: DateTime<Utc>,
    ) -> AppResult<LinkOutcome> {
        let Some(teacher) = self.teachers.get(teacher_id).await? else {
            return Ok(LinkOutcome::NotFound);
        };
        self.link_resolved(teacher, chat_user_id, now).await
    }

    /// Resolve a name, then link the chat identity to the single match
    ///
    /// # Errors
    ///
    /// Returns an error if the roster cannot be read or written
    pub async fn link_by_name(
        &self,
        name: &str,
        chat_user_id: &str,
        now: DateTime<Utc>,
    ) -> AppResult<LinkOutcome> {
        match self.find_by_name(name).await? {
            NameLookup::Found(teacher) => self.link_resolved(teacher, chat_user_id, now).await,
            NameLookup::Multiple(ts) => Ok(LinkOutcome::Multiple(
                ts.into_iter().map(|t| t.display_name).collect(),
            )),
            NameLookup::NotFound => Ok(LinkOutcome::NotFound),
        }
    }

    async fn link_resolved(
        &self,
        teacher: Teacher,
        chat_user_id: &str,
        now: DateTime<Utc>,
    ) -> AppResult<LinkOutcome> {
        match teacher.chat_user_id.as_deref() {
            Some(current) if current == chat_user_id => {
                return Ok(LinkOutcome::AlreadyLinkedSame(teacher));
            }
            Some(_) => return Ok(LinkOutcome::AlreadyLinkedOther(teacher)),
            None => {}
        }

        if self
            .teachers
            .link_chat_user_if_unlinked(&teacher.id, chat_user_id, now)
            .await?
        {
            info!(teacher_id = %teacher.id, "Linked chat user");
            return Ok(LinkOutcome::Linked(Teacher {
                chat_user_id: Some(chat_user_id.to_owned()),
                chat_linked_at: Some(now),
                ..teacher
            }));
        }

        // Someone linked between read and write
        match self.teachers.get(&teacher.id).await? {
            Some(t) if t.chat_user_id.as_deref() == Some(chat_user_id) => {
                Ok(LinkOutcome::AlreadyLinkedSame(t))
            }
            Some(t) => Ok(LinkOutcome::AlreadyLinkedOther(t)),
            None => Ok(LinkOutcome::NotFound),
        }
    }

    /// Move a teacher to a new chat identity
    ///
    /// Only for flows that verified ownership, such as a matching email.
    ///
    /// # Errors
    ///
    /// Returns an error if the teacher does not exist or the write fails
    pub async fn relink(
        &self,
        teacher_id: &str,
        chat_user_id: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Teacher> {
        let teacher = self
            .teachers
            .get(teacher_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Teacher {teacher_id}")))?;
        self.teachers
            .replace_chat_user(teacher_id, chat_user_id, now)
            .await?;
        warn!(teacher_id, "Chat identity replaced after email verification");
        Ok(Teacher {
            chat_user_id: Some(chat_user_id.to_owned()),
            chat_linked_at: Some(now),
            ..teacher
        })
    }

    /// Store a teacher's email
    ///
    /// # Errors
    ///
    /// Returns an error if the teacher does not exist or the write fails
    pub async fn update_email(&self, teacher_id: &str, email: &str) -> AppResult<()> {
        if self.teachers.update_email(teacher_id, email.trim()).await? {
            Ok(())
        } else {
            Err(AppError::not_found(format!("Teacher {teacher_id}")))
        }
    }

    /// Mark a teacher as on leave or back
    ///
    /// # Errors
    ///
    /// Returns an error if the teacher does not exist or the write fails
    pub async fn set_on_leave(&self, teacher_id: &str, on_leave: bool) -> AppResult<()> {
        if self.teachers.set_on_leave(teacher_id, on_leave).await? {
            Ok(())
        } else {
            Err(AppError::not_found(format!("Teacher {teacher_id}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_id_scans_numeric_ids() {
        assert_eq!(next_teacher_id::<&str>(&[]), "T001");
        assert_eq!(next_teacher_id(&["T001", "T027", "X999", "T3"]), "T028");
        assert_eq!(next_teacher_id(&["T999"]), "T1000");
    }
}
