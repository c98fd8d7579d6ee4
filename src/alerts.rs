// ABOUTME: Top-level failure wrapper that logs errors and pushes a structured alert to the admin
// ABOUTME: Entry points run through it so a failure never changes the caller-facing response
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Shift Sync Contributors

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Utc};
use serde_json::Value;
use tracing::{error, warn};

use crate::constants::limits::ALERT_MAX_CHARS;
use crate::errors::AppResult;
use crate::external::ChatTransport;
use crate::lifecycle::BatchReport;

const TRUNCATION_NOTICE: &str = "\n\n（メッセージが長いため切り詰めました）";

/// Render an admin alert, truncated to the alert limit
#[must_use]
pub fn format_alert(
    at: DateTime<FixedOffset>,
    function: &str,
    error: &str,
    context: Option<&Value>,
) -> String {
    let mut message = format!(
        "【システムエラー通知】\n時刻: {}\n関数: {function}\nエラー: {error}",
        at.format("%Y-%m-%d %H:%M:%S")
    );
    if let Some(context) = context.filter(|c| !is_empty_context(c)) {
        let pretty = serde_json::to_string_pretty(context).unwrap_or_else(|_| context.to_string());
        message.push_str("\n\n詳細:\n");
        message.push_str(&pretty);
    }

    if message.chars().count() > ALERT_MAX_CHARS {
        let mut truncated: String = message.chars().take(ALERT_MAX_CHARS).collect();
        truncated.push_str(TRUNCATION_NOTICE);
        return truncated;
    }
    message
}

fn is_empty_context(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Pushes failures of entry points to the administrator
#[derive(Clone)]
pub struct AdminAlerter {
    chat: Arc<dyn ChatTransport>,
    admin_chat_user_id: Option<String>,
    timezone: FixedOffset,
}

impl AdminAlerter {
    /// Create an alerter; without an admin identity alerts are only logged
    #[must_use]
    pub fn new(
        chat: Arc<dyn ChatTransport>,
        admin_chat_user_id: Option<String>,
        timezone: FixedOffset,
    ) -> Self {
        Self {
            chat,
            admin_chat_user_id,
            timezone,
        }
    }

    /// Log a failure and push it to the admin
    pub async fn notify(&self, function: &str, err: &(dyn Display + Sync), context: Option<&Value>) {
        error!(function, error = %err, "Entry point failed");
        let Some(admin) = self.admin_chat_user_id.as_deref() else {
            warn!("No admin identity configured; error alert not sent");
            return;
        };
        let message = format_alert(
            Utc::now().with_timezone(&self.timezone),
            function,
            &err.to_string(),
            context,
        );
        if let Err(e) = self.chat.push_to(admin, &message).await {
            error!(error = %e, "Failed to deliver error alert");
        }
    }

    /// Await an entry point, alerting on error with `context` attached; the
    /// error is consumed
    pub async fn guard<T, F>(
        &self,
        function: &str,
        context: Option<&Value>,
        work: F,
    ) -> Option<T>
    where
        F: Future<Output = AppResult<T>> + Send,
    {
        match work.await {
            Ok(value) => Some(value),
            Err(e) => {
                self.notify(function, &e, context).await;
                None
            }
        }
    }

    /// Alert when a batch finished with item failures
    pub async fn report_batch(&self, function: &str, report: &BatchReport) {
        if report.is_clean() {
            return;
        }
        let context = serde_json::to_value(&report.failures).ok();
        let summary = format!("{}件の処理に失敗しました", report.failures.len());
        self.notify(function, &summary, context.as_ref()).await;
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    fn at() -> DateTime<FixedOffset> {
        FixedOffset::east_opt(9 * 3600)
            .unwrap()
            .with_ymd_and_hms(2026, 3, 1, 15, 0, 5)
            .unwrap()
    }

    #[test]
    fn alert_has_fixed_header() {
        let text = format_alert(at(), "poll_submissions", "boom", None);
        assert_eq!(
            text,
            "【システムエラー通知】\n時刻: 2026-03-01 15:00:05\n関数: poll_submissions\nエラー: boom"
        );
    }

    #[test]
    fn alert_appends_context() {
        let text = format_alert(at(), "webhook", "boom", Some(&json!({"user": "U1"})));
        assert!(text.contains("\n\n詳細:\n{\n  \"user\": \"U1\"\n}"));
    }

    #[test]
    fn long_alert_is_truncated() {
        let long = "あ".repeat(5000);
        let text = format_alert(at(), "job", &long, None);
        assert!(text.ends_with(TRUNCATION_NOTICE));
        assert_eq!(
            text.chars().count(),
            ALERT_MAX_CHARS + TRUNCATION_NOTICE.chars().count()
        );
    }
}
