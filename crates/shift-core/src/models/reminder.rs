// ABOUTME: Reminder policy rules driving the lifecycle scheduler
// ABOUTME: Holds the audience enum, template rendering, and the default eleven-rule policy
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Shift Sync Contributors

use std::fmt;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use super::MonthKey;
use crate::errors::{AppError, AppResult};

/// Rule id of the initial request, which is handled apart from the cascade
pub const INITIAL_REQUEST_RULE_ID: &str = "initial_request";

/// Who receives a reminder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderAudience {
    /// The admin receives a digest
    Manager,
    /// Each unsubmitted teacher receives a push
    Teacher,
}

impl ReminderAudience {
    /// Stored string form
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Manager => "manager",
            Self::Teacher => "teacher",
        }
    }

    /// Parse a stored audience
    ///
    /// # Errors
    ///
    /// Returns a validation error for unknown audiences
    pub fn parse(value: &str) -> AppResult<Self> {
        match value.trim() {
            "manager" => Ok(Self::Manager),
            "teacher" => Ok(Self::Teacher),
            other => Err(AppError::validation(format!(
                "Unrecognized reminder audience: '{other}'"
            ))),
        }
    }
}

impl fmt::Display for ReminderAudience {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Values substituted into a reminder template
#[derive(Debug, Clone, Default)]
pub struct TemplateVars<'a> {
    /// Teacher surname for `{name}`
    pub name: Option<&'a str>,
    /// Month for `{monthKey}`
    pub month_key: Option<MonthKey>,
    /// Rendered status list for `{submissionList}`
    pub submission_list: Option<&'a str>,
}

/// One row of the reminder policy table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderRule {
    /// Stable rule id; also the gating key in the reminder log
    pub id: String,
    /// Human label shown to operators
    pub label: String,
    /// Days before the first of the target month
    pub days_before_deadline: i64,
    /// Recipient class
    pub audience: ReminderAudience,
    /// Message template with `{name}`, `{monthKey}`, `{submissionList}`
    pub template: String,
    /// Disabled rules are never matched
    pub enabled: bool,
}

impl ReminderRule {
    /// Whether `today` is this rule's day for `month`
    #[must_use]
    pub fn fires_on(&self, today: NaiveDate, month: MonthKey) -> bool {
        self.enabled && month.first_day() - Duration::days(self.days_before_deadline) == today
    }

    /// Substitute the template variables; unset variables are left verbatim
    #[must_use]
    pub fn render(&self, vars: &TemplateVars<'_>) -> String {
        let mut message = self.template.clone();
        if let Some(name) = vars.name.filter(|n| !n.is_empty()) {
            message = message.replace("{name}", name);
        }
        if let Some(month) = vars.month_key {
            message = message.replace("{monthKey}", &month.to_string());
        }
        if let Some(list) = vars.submission_list.filter(|l| !l.is_empty()) {
            message = message.replace("{submissionList}", list);
        }
        message.trim().to_owned()
    }
}

fn rule(
    id: &str,
    label: &str,
    days: i64,
    audience: ReminderAudience,
    template: &str,
) -> ReminderRule {
    ReminderRule {
        id: id.to_owned(),
        label: label.to_owned(),
        days_before_deadline: days,
        audience,
        template: template.to_owned(),
        enabled: true,
    }
}

/// Policy seeded into an empty reminder table
#[must_use]
pub fn default_reminder_rules() -> Vec<ReminderRule> {
    use ReminderAudience::{Manager, Teacher};

    vec![
        rule(
            INITIAL_REQUEST_RULE_ID,
            "初回申請依頼",
            21,
            Teacher,
            "【シフト申請のお願い】\n{name}先生、{monthKey}のシフト申請をお願いします。",
        ),
        rule(
            "reminder_2weeks",
            "2週間前リマインド",
            14,
            Manager,
            "【シフト未提出リマインド（{monthKey}）】\n{monthKey}のシフト提出期限まで2週間です。\n\n{submissionList}",
        ),
        rule(
            "reminder_10days",
            "10日前リマインド",
            10,
            Manager,
            "【シフト未提出リマインド（{monthKey}）】\n{monthKey}のシフト提出期限まで10日です。\n\n{submissionList}",
        ),
        rule(
            "reminder_1week_teacher",
            "1週間前リマインド",
            7,
            Teacher,
            "【シフト未提出リマインド（{monthKey}）】\n{name}先生、{monthKey}のシフト提出期限まで1週間です。",
        ),
        rule(
            "reminder_1week_manager",
            "1週間前リマインド",
            7,
            Manager,
            "【シフト未提出リマインド（{monthKey}）】\n{monthKey}のシフト未提出者をお知らせします。\n\n{submissionList}",
        ),
        rule(
            "reminder_3days_teacher",
            "3日前リマインド",
            3,
            Teacher,
            "【シフト未提出リマインド（{monthKey}）】\n{name}先生、{monthKey}のシフト提出期限まで3日です。至急、提出をお願いします！",
        ),
        rule(
            "reminder_3days_manager",
            "3日前リマインド",
            3,
            Manager,
            "【シフト未提出リマインド（{monthKey}）】\n{monthKey}のシフト未提出者をお知らせします。\n\n{submissionList}",
        ),
        rule(
            "reminder_1day_teacher",
            "1日前リマインド",
            1,
            Teacher,
            "【シフト未提出リマインド（{monthKey}）】\n{name}先生、{monthKey}のシフト提出期限は明日です。至急、提出をお願いします！",
        ),
        rule(
            "reminder_1day_manager",
            "1日前リマインド",
            1,
            Manager,
            "【シフト未提出リマインド（{monthKey}）】\n{monthKey}のシフト未提出者をお知らせします。\n\n{submissionList}",
        ),
        rule(
            "deadline_day_teacher",
            "締切日",
            0,
            Teacher,
            "【シフト提出状況（{monthKey}）】\n{name}先生、本日が{monthKey}のシフト提出期限です。至急、提出をお願いします！",
        ),
        rule(
            "deadline_day_manager",
            "締切日",
            0,
            Manager,
            "【シフト提出状況（{monthKey}）】\n{monthKey}のシフト未提出者をお知らせします。\n\n{submissionList}",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_has_eleven_rules() {
        let rules = default_reminder_rules();
        assert_eq!(rules.len(), 11);
        assert_eq!(rules[0].id, INITIAL_REQUEST_RULE_ID);
        assert_eq!(rules[0].days_before_deadline, 21);
    }

    #[test]
    fn fires_relative_to_first_of_month() {
        let month = MonthKey::new(2026, 3).unwrap();
        let rule = &default_reminder_rules()[1];
        assert!(rule.fires_on(NaiveDate::from_ymd_opt(2026, 2, 15).unwrap(), month));
        assert!(!rule.fires_on(NaiveDate::from_ymd_opt(2026, 2, 16).unwrap(), month));
    }

    #[test]
    fn render_substitutes_known_variables() {
        let rule = &default_reminder_rules()[3];
        let text = rule.render(&TemplateVars {
            name: Some("山田"),
            month_key: Some(MonthKey::new(2026, 3).unwrap()),
            submission_list: None,
        });
        assert_eq!(
            text,
            "【シフト未提出リマインド（2026-03）】\n山田先生、2026-03のシフト提出期限まで1週間です。"
        );
    }
}
