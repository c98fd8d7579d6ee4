// ABOUTME: Teacher roster entry with chat identity and contact email
// ABOUTME: Includes the surname extraction used to address teachers in messages
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Shift Sync Contributors

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A teacher on the roster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Teacher {
    /// Sequential display identifier (`T001`, `T027`, ...)
    pub id: String,
    /// Full name as registered
    pub display_name: String,
    /// Linked chat identity, if any
    pub chat_user_id: Option<String>,
    /// When the chat identity was last linked
    pub chat_linked_at: Option<DateTime<Utc>>,
    /// Registered email address (must be a Gmail account to edit documents)
    pub email: Option<String>,
    /// Teachers on leave receive no requests or reminders
    pub on_leave: bool,
    /// Row creation time
    pub created_at: DateTime<Utc>,
}

impl Teacher {
    /// Surname used in salutations
    #[must_use]
    pub fn last_name(&self) -> &str {
        extract_last_name(&self.display_name)
    }

    /// Whether a chat identity is linked
    #[must_use]
    pub fn has_chat_user(&self) -> bool {
        self.chat_user_id.as_deref().is_some_and(|id| !id.is_empty())
    }

    /// Whether an email is registered
    #[must_use]
    pub fn has_email(&self) -> bool {
        self.email.as_deref().is_some_and(|e| !e.trim().is_empty())
    }

    /// Linked to chat and holding an email
    #[must_use]
    pub fn is_fully_registered(&self) -> bool {
        self.has_chat_user() && self.has_email()
    }
}

/// Part of a full name before the first half-width space, full-width space or tab
#[must_use]
pub fn extract_last_name(full_name: &str) -> &str {
    let name = full_name.trim();
    name.split([' ', '\u{3000}', '\t'])
        .next()
        .filter(|part| !part.is_empty())
        .unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_name_splits_on_any_space_kind() {
        assert_eq!(extract_last_name("森永 英敬"), "森永");
        assert_eq!(extract_last_name("森永\u{3000}英敬"), "森永");
        assert_eq!(extract_last_name("森永英敬"), "森永英敬");
        assert_eq!(extract_last_name("  山田\t太郎 "), "山田");
    }
}
