// ABOUTME: MonthKey newtype identifying a submission period in YYYY-MM form
// ABOUTME: Validates month range and provides calendar navigation helpers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Shift Sync Contributors

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::errors::{AppError, AppResult};

/// A `YYYY-MM` submission period
///
/// Ordering follows calendar order, so the lexical `max` of a set of keys is
/// also the latest month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MonthKey {
    year: i32,
    month: u32,
}

impl MonthKey {
    /// Build a key from a year and a 1-based month
    ///
    /// # Errors
    ///
    /// Returns a validation error when `month` is outside `1..=12`
    pub fn new(year: i32, month: u32) -> AppResult<Self> {
        if !(1..=12).contains(&month) || !(1000..=9999).contains(&year) {
            return Err(AppError::validation(format!(
                "Invalid month key components: year={year} month={month}"
            )));
        }
        Ok(Self { year, month })
    }

    /// Parse a `YYYY-MM` string; anything after the first seven characters
    /// (a day part stored by a spreadsheet export, for instance) is ignored
    ///
    /// # Errors
    ///
    /// Returns a validation error for malformed input
    pub fn parse(text: &str) -> AppResult<Self> {
        let trimmed = text.trim();
        let head = trimmed.get(..7).unwrap_or(trimmed);
        let invalid = || AppError::validation(format!("Invalid month key: '{trimmed}'"));

        let (year, month) = head.split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(invalid());
        }
        if !year.bytes().chain(month.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        Self::new(year, month).map_err(|_| invalid())
    }

    /// Month containing the given date
    #[must_use]
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Calendar year
    #[must_use]
    pub const fn year(self) -> i32 {
        self.year
    }

    /// 1-based month number
    #[must_use]
    pub const fn month(self) -> u32 {
        self.month
    }

    /// The following month
    #[must_use]
    pub const fn next(self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// The preceding month
    #[must_use]
    pub const fn previous(self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    /// First calendar day of the month (the submission deadline)
    #[must_use]
    pub fn first_day(self) -> NaiveDate {
        // year and month are validated at construction
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or_default()
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for MonthKey {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for MonthKey {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<MonthKey> for String {
    fn from(value: MonthKey) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_formats() {
        let key = MonthKey::parse("2026-03").unwrap();
        assert_eq!(key.year(), 2026);
        assert_eq!(key.month(), 3);
        assert_eq!(key.to_string(), "2026-03");
        assert_eq!(MonthKey::parse("2026-03-01").unwrap(), key);
    }

    #[test]
    fn rejects_out_of_range_months() {
        assert!(MonthKey::parse("2026-13").is_err());
        assert!(MonthKey::parse("2026-00").is_err());
        assert!(MonthKey::parse("2026-3").is_err());
        assert!(MonthKey::parse("山田").is_err());
    }

    #[test]
    fn navigates_across_year_boundaries() {
        let december = MonthKey::new(2025, 12).unwrap();
        assert_eq!(december.next().to_string(), "2026-01");
        assert_eq!(december.next().previous(), december);
        assert_eq!(
            december.first_day(),
            NaiveDate::from_ymd_opt(2025, 12, 1).unwrap()
        );
    }
}
