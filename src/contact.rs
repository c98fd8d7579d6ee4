// ABOUTME: Email extraction and validation plus the "looks like a name" heuristic
// ABOUTME: Separates people stating their name from ordinary chat in free-text messages
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Shift Sync Contributors

//! Contact extraction from unstructured chat text
//!
//! The chat channel has no form: a teacher registers by sending something
//! like `講師登録 山田太郎（やまだたろう） taro@gmail.com よろしくお願いします`.
//! This module pulls the email out, strips salutations and reading
//! annotations to recover the name, and decides whether a bare message is a
//! name at all.

use std::sync::OnceLock;

use regex::Regex;

/// Conversational phrases that mark a message as chat rather than a name
pub const DEFAULT_CONVERSATIONAL_PHRASES: &[&str] = &[
    "承知しました",
    "了解しました",
    "わかりました",
    "お疲れさま",
    "お疲れ様",
    "ありがとう",
    "よろしく",
    "お願い",
    "お休み",
    "授業",
    "振替",
    "明日",
    "今日",
    "から",
    "また",
    "になります",
    "お願いいたします",
    "お願いします",
    "改善が必要",
    "必要",
];

/// Salutations and filler removed before extracting a name, longest first
const SALUTATIONS: &[&str] = &[
    "よろしくお願いいたします",
    "よろしくお願いします",
    "よろしく",
    "お願いします",
    "お願いいたします",
    "ありがとうございます",
    "ありがとう",
    "お世話になります",
    "お世話になっております",
    "初めまして",
    "はじめまして",
    "講師登録",
    "登録",
    "先生",
    "さん",
];

const EMAIL_PATTERN: &str = r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}";

fn email_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(EMAIL_PATTERN).ok()).as_ref()
}

fn anchored_email_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(&format!("^{EMAIL_PATTERN}$")).ok())
        .as_ref()
}

fn reading_annotation_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"[（(][^）)]*[）)]").ok())
        .as_ref()
}

fn symbols_only_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^[0-9\s\-_.,!?。、！？]+$").ok())
        .as_ref()
}

/// First local@domain.tld token in the text
#[must_use]
pub fn extract_email(text: &str) -> Option<String> {
    email_pattern()?
        .find(text)
        .map(|m| m.as_str().to_owned())
}

/// Whole-string email check
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    anchored_email_pattern().is_some_and(|re| re.is_match(email.trim()))
}

/// Gmail addresses are required for editing the shared documents
#[must_use]
pub fn is_gmail(email: &str) -> bool {
    email.trim().to_lowercase().ends_with("@gmail.com")
}

/// Remove every email token from the text
#[must_use]
pub fn strip_emails(text: &str) -> String {
    email_pattern().map_or_else(
        || text.to_owned(),
        |re| re.replace_all(text, "").trim().to_owned(),
    )
}

/// Recover a candidate name from a registration message
///
/// Emails, reading annotations in full- or half-width parentheses, and
/// salutations are removed. The first remaining line of two or more
/// characters is returned; otherwise the cleaned text. An empty string means
/// no name was found.
#[must_use]
pub fn extract_name_from_text(text: &str) -> String {
    let mut cleaned = strip_emails(text);
    if let Some(re) = reading_annotation_pattern() {
        cleaned = re.replace_all(&cleaned, "").trim().to_owned();
    }
    for salutation in SALUTATIONS {
        cleaned = cleaned.replace(salutation, "").trim().to_owned();
    }
    if symbols_only_pattern().is_some_and(|re| re.is_match(&cleaned)) {
        cleaned.clear();
    }

    for line in cleaned.split(['\n', '\r']) {
        let line = line.trim();
        if line.chars().count() >= 2 && !is_valid_email(line) {
            return line.to_owned();
        }
    }
    cleaned
}

/// Tunable inputs of [`looks_like_name`]
#[derive(Debug, Clone)]
pub struct NameHeuristics {
    /// Phrases whose presence marks the text as conversation
    pub conversational_phrases: Vec<String>,
    /// Longest accepted name, emoji excluded
    pub max_chars: usize,
    /// Text with sentence punctuation is only accepted up to this length
    pub punctuated_max_chars: usize,
}

impl Default for NameHeuristics {
    fn default() -> Self {
        Self {
            conversational_phrases: DEFAULT_CONVERSATIONAL_PHRASES
                .iter()
                .map(|p| (*p).to_owned())
                .collect(),
            max_chars: 20,
            punctuated_max_chars: 10,
        }
    }
}

impl NameHeuristics {
    /// Heuristics with a replacement phrase denylist
    #[must_use]
    pub fn with_phrases(phrases: Vec<String>) -> Self {
        Self {
            conversational_phrases: phrases,
            ..Self::default()
        }
    }
}

const fn is_emoji(c: char) -> bool {
    matches!(
        c as u32,
        0x1F300..=0x1F9FF
            | 0x2600..=0x26FF
            | 0x2700..=0x27BF
            | 0x1F1E0..=0x1F1FF
            | 0x1FA00..=0x1FA6F
            | 0x1FA70..=0x1FAFF
    )
}

const fn is_name_script(c: char) -> bool {
    matches!(
        c,
        '\u{4E00}'..='\u{9FAF}'
            | '\u{3040}'..='\u{309F}'
            | '\u{30A0}'..='\u{30FF}'
            | 'a'..='z'
            | 'A'..='Z'
    )
}

/// Decide whether free text plausibly is a person's name
#[must_use]
pub fn looks_like_name(text: &str, heuristics: &NameHeuristics) -> bool {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return false;
    }

    let total = trimmed.chars().count();
    let emoji = trimmed.chars().filter(|c| is_emoji(*c)).count();
    if emoji > 0 && emoji * 2 >= total {
        return false;
    }

    let without_emoji: String = trimmed.chars().filter(|c| !is_emoji(*c)).collect();
    let without_emoji = without_emoji.trim();
    let length = without_emoji.chars().count();
    if length == 0 || length > heuristics.max_chars {
        return false;
    }

    if heuristics
        .conversational_phrases
        .iter()
        .any(|phrase| !phrase.is_empty() && without_emoji.contains(phrase.as_str()))
    {
        return false;
    }

    let punctuated = without_emoji.contains(['。', '、', '！', '？']);
    if punctuated && length > heuristics.punctuated_max_chars {
        return false;
    }

    without_emoji.chars().any(is_name_script)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_first_email() {
        assert_eq!(
            extract_email("山田太郎 taro@gmail.com / other@example.jp").as_deref(),
            Some("taro@gmail.com")
        );
        assert_eq!(extract_email("山田太郎"), None);
    }

    #[test]
    fn gmail_check_is_case_insensitive() {
        assert!(is_gmail(" Taro@GMAIL.com "));
        assert!(!is_gmail("taro@example.com"));
        assert!(is_valid_email("taro@example.com"));
        assert!(!is_valid_email("taro@example"));
    }

    #[test]
    fn name_extraction_strips_noise() {
        assert_eq!(
            extract_name_from_text("講師登録 奥園凌(おくぞのりょう) ryo@gmail.com よろしくお願いします"),
            "奥園凌"
        );
        assert_eq!(extract_name_from_text("はじめまして\n山田 太郎です"), "山田 太郎です");
        assert_eq!(extract_name_from_text("taro@gmail.com"), "");
        assert_eq!(extract_name_from_text("123-456"), "");
    }

    #[test]
    fn conversation_is_not_a_name() {
        let h = NameHeuristics::default();
        assert!(looks_like_name("山田太郎", &h));
        assert!(looks_like_name("Tanaka Taro", &h));
        assert!(!looks_like_name("承知しました", &h));
        assert!(!looks_like_name("明日の授業お休みします", &h));
        assert!(!looks_like_name("😀😀", &h));
        assert!(!looks_like_name("12345", &h));
        assert!(!looks_like_name("とても長いメッセージを送っていますがこれは名前ではありません", &h));
    }

    #[test]
    fn denylist_is_data() {
        let h = NameHeuristics::with_phrases(vec!["テスト".to_owned()]);
        assert!(!looks_like_name("テスト太郎", &h));
        assert!(looks_like_name("承知しました", &h));
    }

    #[test]
    fn emoji_ranges_cover_faces_and_transport() {
        assert!(is_emoji('\u{1F600}'));
        assert!(is_emoji('\u{1F680}'));
        assert!(is_emoji('\u{2600}'));
        assert!(!is_emoji('山'));
    }
}
