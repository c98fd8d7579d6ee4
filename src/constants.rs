// ABOUTME: Application-wide constants for environment keys, defaults and document layout
// ABOUTME: Centralizes values shared by configuration, clients and lifecycle jobs
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Shift Sync Contributors

/// Environment variable names
pub mod env_keys {
    /// Database connection string
    pub const DATABASE_URL: &str = "DATABASE_URL";
    /// HTTP listen port
    pub const HTTP_PORT: &str = "HTTP_PORT";
    /// Bearer token for the messaging API
    pub const LINE_CHANNEL_ACCESS_TOKEN: &str = "LINE_CHANNEL_ACCESS_TOKEN";
    /// Channel secret used to verify webhook signatures
    pub const LINE_CHANNEL_SECRET: &str = "LINE_CHANNEL_SECRET";
    /// Messaging API base URL override
    pub const LINE_API_BASE_URL: &str = "LINE_API_BASE_URL";
    /// Chat identity of the administrator
    pub const ADMIN_LINE_USER_ID: &str = "ADMIN_LINE_USER_ID";
    /// Access token for the document provider APIs
    pub const GOOGLE_ACCESS_TOKEN: &str = "GOOGLE_ACCESS_TOKEN";
    /// Folder holding the monthly templates
    pub const TEMPLATE_FOLDER_ID: &str = "TEMPLATE_FOLDER_ID";
    /// Parent folder for per-month copies
    pub const COPIES_PARENT_FOLDER_ID: &str = "COPIES_PARENT_FOLDER_ID";
    /// Local time offset in hours used for calendar-day logic
    pub const TIMEZONE_OFFSET_HOURS: &str = "TIMEZONE_OFFSET_HOURS";
    /// Conversation state lifetime in hours
    pub const STATE_TTL_HOURS: &str = "STATE_TTL_HOURS";
    /// Seconds between document flag polls
    pub const POLL_INTERVAL_SECS: &str = "POLL_INTERVAL_SECS";
    /// Local hour at which the daily reminder cascade runs
    pub const REMINDER_HOUR: &str = "REMINDER_HOUR";
    /// Comma-separated replacement for the conversational phrase denylist
    pub const NAME_DENYLIST: &str = "NAME_DENYLIST";
    /// Minimum length ratio for partial name matches
    pub const PARTIAL_MATCH_RATIO: &str = "PARTIAL_MATCH_RATIO";
    /// Whether a matching email may move a teacher to a new chat identity
    pub const ALLOW_EMAIL_RELINK: &str = "ALLOW_EMAIL_RELINK";
    /// Log level
    pub const LOG_LEVEL: &str = "LOG_LEVEL";
    /// Log format (`json` or `pretty`)
    pub const LOG_FORMAT: &str = "LOG_FORMAT";
}

/// Default configuration values
pub mod defaults {
    /// HTTP listen port
    pub const HTTP_PORT: u16 = 8080;
    /// Messaging API base URL
    pub const LINE_API_BASE_URL: &str = "https://api.line.me";
    /// Japan Standard Time
    pub const TIMEZONE_OFFSET_HOURS: i32 = 9;
    /// Conversation states expire after a day
    pub const STATE_TTL_HOURS: i64 = 24;
    /// Five minutes between polls
    pub const POLL_INTERVAL_SECS: u64 = 300;
    /// 15:00 local
    pub const REMINDER_HOUR: u32 = 15;
    /// Partial name matches need 70% length overlap
    pub const PARTIAL_MATCH_RATIO: f64 = 0.7;
    /// Database file name under the platform data directory
    pub const DATABASE_FILE: &str = "shift_sync.db";
    /// Application data directory name
    pub const DATA_DIR_NAME: &str = "shift-sync";
}

/// Cell layout of the teacher documents
pub mod document_cells {
    /// Submit checkbox
    pub const SUBMIT_FLAG: &str = "Input!C2";
    /// Status label shown next to the checkbox
    pub const STATUS_LABEL: &str = "Input!B2";
    /// Teacher name header
    pub const TEACHER_NAME: &str = "Input!G3";
    /// Status label after submission
    pub const STATUS_SUBMITTED: &str = "提出済";
    /// Status label after reopen
    pub const STATUS_NOT_SUBMITTED: &str = "未提出";
    /// Description attached to protections created on lock
    pub const PROTECTION_DESCRIPTION: &str = "提出済みロック";
    /// Description used by older lock runs, cleared before re-locking
    pub const LEGACY_PROTECTION_DESCRIPTION: &str = "提出後ロック";
}

/// Limits applied to outbound messages
pub mod limits {
    /// Admin error alerts are truncated to this many characters
    pub const ALERT_MAX_CHARS: usize = 4000;
    /// Leading characters of a webhook body quoted in an alert
    pub const ALERT_BODY_EXCERPT_CHARS: usize = 500;
    /// Inbound webhook bodies larger than this are rejected
    pub const WEBHOOK_BODY_LIMIT_BYTES: usize = 1024 * 1024;
    /// Outbound HTTP request timeout
    pub const HTTP_TIMEOUT_SECS: u64 = 30;
}

/// Service names used in logs and error messages
pub mod service_names {
    /// Messaging API
    pub const LINE_API: &str = "line_messaging_api";
    /// Document provider
    pub const GOOGLE_API: &str = "google_workspace_api";
}
