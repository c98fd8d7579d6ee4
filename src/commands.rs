// ABOUTME: Parsers for the short textual commands accepted over chat
// ABOUTME: Admin change-request commands, yes/no confirmations, and month replies
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Shift Sync Contributors

use std::sync::OnceLock;

use regex::Regex;

use crate::models::MonthKey;

/// Prefix marking an explicit registration message
pub const REGISTRATION_PREFIX: &str = "講師登録";

const CONFIRM_YES: &[&str] = &["はい", "yes", "y"];
const CONFIRM_NO: &[&str] = &["いいえ", "no", "n"];

fn month_first_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^(\d{1,2})月変更依頼\s+(.+)$").ok())
        .as_ref()
}

fn colon_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^変更依頼[：:]\s*(.+?)(?:\s+(\d{4}-\d{2}))?\s*$").ok())
        .as_ref()
}

fn spaced_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^変更依頼\s+(.+?)(?:\s+(\d{4}-\d{2}))?\s*$").ok())
        .as_ref()
}

fn bare_month_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^\d{4}-\d{2}$").ok())
        .as_ref()
}

/// Parsed admin change request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnlockCommand {
    /// Teacher name as typed
    pub teacher_name: String,
    /// Requested month; `None` lets the router pick or ask
    pub month_key: Option<MonthKey>,
}

/// An admin message read as a change request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnlockRequest {
    /// Well-formed command
    Command(UnlockCommand),
    /// Command shape naming a month that is not a real calendar month
    InvalidMonth(String),
}

/// Parse an admin change request
///
/// Accepted forms:
/// - `3月変更依頼 山田太郎` (month resolved against `current_year`)
/// - `変更依頼：山田太郎 2026-03` (full- or half-width colon, month optional)
/// - `変更依頼 山田太郎 2026-03` (month optional)
///
/// A name that is itself a `YYYY-MM` token is rejected. Any form naming a
/// month outside 1..=12 yields [`UnlockRequest::InvalidMonth`].
#[must_use]
pub fn parse_unlock_command(text: &str, current_year: i32) -> Option<UnlockRequest> {
    let trimmed = text.trim();

    if let Some(caps) = month_first_pattern()?.captures(trimmed) {
        let month_text = caps.get(1)?.as_str();
        let teacher_name = caps.get(2)?.as_str().trim().to_owned();
        let month_key = month_text
            .parse::<u32>()
            .ok()
            .and_then(|month| MonthKey::new(current_year, month).ok());
        return Some(month_key.map_or_else(
            || UnlockRequest::InvalidMonth(format!("{month_text}月")),
            |month| {
                UnlockRequest::Command(UnlockCommand {
                    teacher_name,
                    month_key: Some(month),
                })
            },
        ));
    }

    let caps = colon_pattern()?
        .captures(trimmed)
        .or_else(|| spaced_pattern().and_then(|re| re.captures(trimmed)))?;

    let teacher_name = caps.get(1)?.as_str().trim();
    if teacher_name.is_empty() || bare_month_pattern()?.is_match(teacher_name) {
        return None;
    }

    let month_key = match caps.get(2) {
        Some(m) => match MonthKey::parse(m.as_str()) {
            Ok(month) => Some(month),
            Err(_) => return Some(UnlockRequest::InvalidMonth(m.as_str().to_owned())),
        },
        None => None,
    };

    Some(UnlockRequest::Command(UnlockCommand {
        teacher_name: teacher_name.to_owned(),
        month_key,
    }))
}

/// Answer to a yes/no prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    /// Accept
    Yes,
    /// Decline
    No,
}

/// Interpret a reply to a yes/no prompt; `None` when it is neither
#[must_use]
pub fn parse_confirmation(text: &str) -> Option<Confirmation> {
    let normalized = text.trim().to_lowercase();
    if CONFIRM_YES.contains(&normalized.as_str()) {
        Some(Confirmation::Yes)
    } else if CONFIRM_NO.contains(&normalized.as_str()) {
        Some(Confirmation::No)
    } else {
        None
    }
}

/// Pick the offered month matching a menu reply
///
/// The reply may be the month itself (`2026-03`) or its menu number (`2`).
#[must_use]
pub fn parse_month_choice(text: &str, offered: &[MonthKey]) -> Option<MonthKey> {
    let reply = text.trim();
    if let Ok(month) = reply.parse::<MonthKey>() {
        return offered.contains(&month).then_some(month);
    }
    reply
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|index| offered.get(index).copied())
}

/// Split a leading registration prefix from the message
#[must_use]
pub fn strip_registration_prefix(text: &str) -> (bool, &str) {
    let trimmed = text.trim();
    trimmed
        .strip_prefix(REGISTRATION_PREFIX)
        .map_or((false, trimmed), |rest| (true, rest.trim_start()))
}
