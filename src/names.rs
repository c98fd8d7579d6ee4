// ABOUTME: Name normalization and graduated exact/partial roster matching
// ABOUTME: Folds full-width alphanumerics, strips whitespace, and refuses to guess between ties
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Shift Sync Contributors

//! Name matching against the teacher roster
//!
//! Human-entered names carry width and whitespace noise (`Ｔａｎａｋａ　太郎`
//! versus `Tanaka太郎`), so every comparison runs on a canonical key produced
//! by [`normalize`]. Matching is graduated: exact key equality first, then
//! containment with a minimum length ratio. A tie at either level is reported
//! as [`Resolution::Multiple`] and never resolved automatically.

use crate::constants::defaults;
use crate::models::Teacher;

/// Offset between full-width and half-width ASCII code points
const FULL_WIDTH_OFFSET: u32 = 0xFEE0;

/// Canonical comparison key: full-width `Ａ-Ｚａ-ｚ０-９` folded to ASCII,
/// half-width and full-width spaces, tabs and line breaks removed
#[must_use]
pub fn normalize(text: &str) -> String {
    text.trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | '\u{3000}' | '\t' | '\n' | '\r'))
        .map(fold_full_width)
        .collect()
}

fn fold_full_width(c: char) -> char {
    if matches!(c, 'Ａ'..='Ｚ' | 'ａ'..='ｚ' | '０'..='９') {
        char::from_u32(u32::from(c) - FULL_WIDTH_OFFSET).unwrap_or(c)
    } else {
        c
    }
}

/// Anything that can be matched by name
pub trait Named {
    /// Name as stored
    fn name(&self) -> &str;
}

impl Named for Teacher {
    fn name(&self) -> &str {
        &self.display_name
    }
}

impl Named for String {
    fn name(&self) -> &str {
        self
    }
}

impl Named for &str {
    fn name(&self) -> &str {
        self
    }
}

/// Exact and partial candidates for one input key
#[derive(Debug)]
pub struct MatchSet<'a, T> {
    /// Roster entries whose key equals the input key
    pub exact: Vec<&'a T>,
    /// Roster entries related by containment above the ratio threshold
    pub partial: Vec<&'a T>,
}

/// Outcome of resolving a name against a roster
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution<T> {
    /// Exactly one candidate at the winning level
    Unique(T),
    /// Several candidates; the caller must ask for disambiguation
    Multiple(Vec<T>),
    /// No candidate at either level
    NotFound,
}

impl<T> Resolution<T> {
    /// Map the carried candidates
    pub fn map<U>(self, f: impl Fn(T) -> U) -> Resolution<U> {
        match self {
            Self::Unique(t) => Resolution::Unique(f(t)),
            Self::Multiple(ts) => Resolution::Multiple(ts.into_iter().map(f).collect()),
            Self::NotFound => Resolution::NotFound,
        }
    }
}

/// Roster matcher with a configurable partial-match threshold
#[derive(Debug, Clone, Copy)]
pub struct NameMatcher {
    partial_ratio: f64,
}

impl Default for NameMatcher {
    fn default() -> Self {
        Self::new(defaults::PARTIAL_MATCH_RATIO)
    }
}

impl NameMatcher {
    /// Create a matcher; `partial_ratio` is the minimum `min(len)/max(len)`
    #[must_use]
    pub const fn new(partial_ratio: f64) -> Self {
        Self { partial_ratio }
    }

    /// Partial-match threshold in use
    #[must_use]
    pub const fn partial_ratio(&self) -> f64 {
        self.partial_ratio
    }

    /// Collect exact and partial candidates for a normalized input key
    pub fn candidates<'a, T: Named>(&self, input_key: &str, roster: &'a [T]) -> MatchSet<'a, T> {
        let mut exact = Vec::new();
        let mut partial = Vec::new();
        if input_key.is_empty() {
            return MatchSet { exact, partial };
        }

        for entry in roster {
            let key = normalize(entry.name());
            if key.is_empty() {
                continue;
            }
            if key == input_key {
                exact.push(entry);
            } else if self.is_partial(&key, input_key) {
                partial.push(entry);
            }
        }
        MatchSet { exact, partial }
    }

    /// Resolve with the graduated policy: a unique exact match wins, any exact
    /// tie is ambiguous, otherwise the same one-versus-many rule applies to
    /// partial matches
    pub fn resolve<'a, T: Named>(&self, input_key: &str, roster: &'a [T]) -> Resolution<&'a T> {
        let MatchSet { exact, partial } = self.candidates(input_key, roster);
        match (exact.len(), partial.len()) {
            (1, _) => Resolution::Unique(exact[0]),
            (n, _) if n > 1 => Resolution::Multiple(exact),
            (_, 0) => Resolution::NotFound,
            (_, 1) => Resolution::Unique(partial[0]),
            _ => Resolution::Multiple(partial),
        }
    }

    fn is_partial(&self, a: &str, b: &str) -> bool {
        if !(a.contains(b) || b.contains(a)) {
            return false;
        }
        let (la, lb) = (a.chars().count(), b.chars().count());
        let (shorter, longer) = if la < lb { (la, lb) } else { (lb, la) };
        longer > 0 && (shorter as f64) / (longer as f64) >= self.partial_ratio
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_folds_width_and_whitespace() {
        assert_eq!(normalize(" Ｔａｎａｋａ\u{3000}太郎 "), normalize("Tanaka太郎"));
        assert_eq!(normalize("山田 太郎\n"), "山田太郎");
        assert_eq!(normalize("Ｔ０２７"), "T027");
    }

    #[test]
    fn unique_exact_match_wins_over_partials() {
        let roster = vec!["山田太郎".to_owned(), "山田太郎子".to_owned()];
        let matcher = NameMatcher::default();
        assert_eq!(
            matcher.resolve("山田太郎", &roster),
            Resolution::Unique(&roster[0])
        );
    }

    #[test]
    fn exact_tie_is_ambiguous_even_without_partials() {
        let roster = vec!["山田 太郎".to_owned(), "山田太郎".to_owned(), "鈴木一郎".to_owned()];
        let matcher = NameMatcher::default();
        match matcher.resolve("山田太郎", &roster) {
            Resolution::Multiple(found) => assert_eq!(found.len(), 2),
            other => panic!("expected ambiguity, got {other:?}"),
        }
    }

    #[test]
    fn partial_match_respects_ratio() {
        let roster = vec!["佐々木健太".to_owned()];
        let matcher = NameMatcher::default();
        // 4/5 = 0.8
        assert_eq!(
            matcher.resolve("佐々木健", &roster),
            Resolution::Unique(&roster[0])
        );
        // 2/5 = 0.4
        assert_eq!(matcher.resolve("佐々", &roster), Resolution::NotFound);
    }

    #[test]
    fn partial_candidates_below_ratio_are_dropped() {
        let roster = vec!["田中一郎".to_owned(), "田中一郎太".to_owned()];
        let matcher = NameMatcher::default();
        // 3/4 passes, 3/5 does not
        assert_eq!(
            matcher.resolve("田中一", &roster),
            Resolution::Unique(&roster[0])
        );
    }

    #[test]
    fn partial_tie_is_ambiguous() {
        let roster = vec!["田中一郎".to_owned(), "田中一朗".to_owned()];
        match NameMatcher::default().resolve("田中一", &roster) {
            Resolution::Multiple(found) => assert_eq!(found.len(), 2),
            other => panic!("expected ambiguity, got {other:?}"),
        }
    }

    #[test]
    fn empty_input_never_matches() {
        let roster = vec!["山田太郎".to_owned()];
        assert_eq!(NameMatcher::default().resolve("", &roster), Resolution::NotFound);
    }
}
