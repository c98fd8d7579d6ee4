// ABOUTME: Environment-based configuration for the shift submission server
// ABOUTME: Parses env vars into typed sections with defaults; no global or static state
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Shift Sync Contributors

//! Server configuration
//!
//! Configuration is read once at startup from the process environment (or any
//! key lookup in tests) and passed by reference from there on. Binaries may
//! override individual values from command-line flags after loading.

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration as StdDuration;

use chrono::{Duration, FixedOffset};
use tracing::info;

use crate::constants::{defaults, env_keys};
use crate::contact::NameHeuristics;
use crate::errors::{AppError, AppResult};
use crate::names::NameMatcher;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable multi-line output
    #[default]
    Pretty,
    /// One JSON object per line
    Json,
}

impl FromStr for LogFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(AppError::config(format!("Unknown log format '{other}'"))),
        }
    }
}

/// Logging settings
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,
    /// Output format
    pub format: LogFormat,
}

/// Messaging API settings
#[derive(Clone)]
pub struct LineConfig {
    /// Bearer token for reply/push calls
    pub channel_access_token: String,
    /// Secret for webhook signature verification; verification is skipped when absent
    pub channel_secret: Option<String>,
    /// API base URL
    pub api_base_url: String,
}

impl fmt::Debug for LineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LineConfig")
            .field("channel_access_token", &"[REDACTED]")
            .field(
                "channel_secret",
                &self.channel_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .field("api_base_url", &self.api_base_url)
            .finish()
    }
}

/// Document provider settings
#[derive(Clone, Default)]
pub struct DocumentConfig {
    /// OAuth access token supplied by the deployment
    pub access_token: Option<String>,
    /// Folder searched for `{month}` templates
    pub template_folder_id: Option<String>,
    /// Parent folder of the per-month copy folders
    pub copies_parent_folder_id: Option<String>,
}

impl fmt::Debug for DocumentConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentConfig")
            .field("access_token", &self.access_token.as_ref().map(|_| "[REDACTED]"))
            .field("template_folder_id", &self.template_folder_id)
            .field("copies_parent_folder_id", &self.copies_parent_folder_id)
            .finish()
    }
}

/// Scheduler settings
#[derive(Debug, Clone, Copy)]
pub struct ScheduleConfig {
    /// Local time zone for calendar-day decisions
    pub timezone: FixedOffset,
    /// Interval between document flag polls
    pub poll_interval: StdDuration,
    /// Local hour at which the reminder cascade runs
    pub reminder_hour: u32,
}

/// Conversation behaviour settings
#[derive(Debug, Clone)]
pub struct ConversationConfig {
    /// Pending conversation states expire after this long
    pub state_ttl: Duration,
    /// Allow a matching roster email to move a teacher to a new chat identity
    pub allow_email_relink: bool,
    /// Roster matching threshold
    pub matcher: NameMatcher,
    /// Name detection heuristics
    pub name_heuristics: NameHeuristics,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            state_ttl: Duration::hours(defaults::STATE_TTL_HOURS),
            allow_email_relink: true,
            matcher: NameMatcher::default(),
            name_heuristics: NameHeuristics::default(),
        }
    }
}

/// Complete server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Database connection string
    pub database_url: String,
    /// HTTP listen port
    pub http_port: u16,
    /// Chat identity of the administrator
    pub admin_chat_user_id: Option<String>,
    /// Messaging API
    pub line: LineConfig,
    /// Document provider
    pub documents: DocumentConfig,
    /// Scheduler
    pub schedule: ScheduleConfig,
    /// Conversation behaviour
    pub conversation: ConversationConfig,
    /// Logging
    pub logging: LoggingConfig,
}

impl ServerConfig {
    /// Load configuration from the process environment
    ///
    /// # Errors
    ///
    /// Returns a config error when a value is present but unparseable
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    ///
    /// # Errors
    ///
    /// Returns a config error when a value is present but unparseable
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty());

        let offset_hours: i32 = parse_or(&get, env_keys::TIMEZONE_OFFSET_HOURS, defaults::TIMEZONE_OFFSET_HOURS)?;
        let timezone = FixedOffset::east_opt(offset_hours * 3600).ok_or_else(|| {
            AppError::config(format!("Timezone offset out of range: {offset_hours}"))
        })?;

        let reminder_hour: u32 = parse_or(&get, env_keys::REMINDER_HOUR, defaults::REMINDER_HOUR)?;
        if reminder_hour > 23 {
            return Err(AppError::config(format!(
                "{} must be 0-23, got {reminder_hour}",
                env_keys::REMINDER_HOUR
            )));
        }

        let partial_ratio: f64 =
            parse_or(&get, env_keys::PARTIAL_MATCH_RATIO, defaults::PARTIAL_MATCH_RATIO)?;
        if !(0.0..=1.0).contains(&partial_ratio) {
            return Err(AppError::config(format!(
                "{} must be within 0.0-1.0, got {partial_ratio}",
                env_keys::PARTIAL_MATCH_RATIO
            )));
        }

        let name_heuristics = get(env_keys::NAME_DENYLIST).map_or_else(NameHeuristics::default, |list| {
            NameHeuristics::with_phrases(
                list.split(',')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(ToOwned::to_owned)
                    .collect(),
            )
        });

        let logging = LoggingConfig {
            level: get(env_keys::LOG_LEVEL).unwrap_or_else(|| "info".to_owned()),
            format: get(env_keys::LOG_FORMAT)
                .map(|f| f.parse())
                .transpose()?
                .unwrap_or_default(),
        };

        Ok(Self {
            database_url: get(env_keys::DATABASE_URL).unwrap_or_else(default_database_url),
            http_port: parse_or(&get, env_keys::HTTP_PORT, defaults::HTTP_PORT)?,
            admin_chat_user_id: get(env_keys::ADMIN_LINE_USER_ID),
            line: LineConfig {
                channel_access_token: get(env_keys::LINE_CHANNEL_ACCESS_TOKEN).unwrap_or_default(),
                channel_secret: get(env_keys::LINE_CHANNEL_SECRET),
                api_base_url: get(env_keys::LINE_API_BASE_URL)
                    .unwrap_or_else(|| defaults::LINE_API_BASE_URL.to_owned()),
            },
            documents: DocumentConfig {
                access_token: get(env_keys::GOOGLE_ACCESS_TOKEN),
                template_folder_id: get(env_keys::TEMPLATE_FOLDER_ID),
                copies_parent_folder_id: get(env_keys::COPIES_PARENT_FOLDER_ID),
            },
            schedule: ScheduleConfig {
                timezone,
                poll_interval: StdDuration::from_secs(parse_or(
                    &get,
                    env_keys::POLL_INTERVAL_SECS,
                    defaults::POLL_INTERVAL_SECS,
                )?),
                reminder_hour,
            },
            conversation: ConversationConfig {
                state_ttl: Duration::hours(parse_or(
                    &get,
                    env_keys::STATE_TTL_HOURS,
                    defaults::STATE_TTL_HOURS,
                )?),
                allow_email_relink: parse_bool_or(&get, env_keys::ALLOW_EMAIL_RELINK, true)?,
                matcher: NameMatcher::new(partial_ratio),
                name_heuristics,
            },
            logging,
        })
    }

    /// Whether the given chat identity is the administrator
    #[must_use]
    pub fn is_admin(&self, chat_user_id: &str) -> bool {
        self.admin_chat_user_id
            .as_deref()
            .is_some_and(|admin| admin == chat_user_id)
    }

    /// Log a summary of the effective configuration
    pub fn log_summary(&self) {
        info!(
            http_port = self.http_port,
            admin_configured = self.admin_chat_user_id.is_some(),
            signature_verification = self.line.channel_secret.is_some(),
            documents_configured = self.documents.access_token.is_some(),
            timezone = %self.schedule.timezone,
            poll_interval_secs = self.schedule.poll_interval.as_secs(),
            reminder_hour = self.schedule.reminder_hour,
            state_ttl_hours = self.conversation.state_ttl.num_hours(),
            "Configuration loaded"
        );
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> AppResult<T>
where
    T: FromStr,
    T::Err: fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    get(key).map_or(Ok(default), |raw| {
        raw.parse()
            .map_err(|e| AppError::config(format!("Invalid value for {key} ('{raw}'): {e}")))
    })
}

fn parse_bool_or<G>(get: &G, key: &str, default: bool) -> AppResult<bool>
where
    G: Fn(&str) -> Option<String>,
{
    get(key).map_or(Ok(default), |raw| match raw.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(AppError::config(format!(
            "Invalid boolean for {key}: '{raw}'"
        ))),
    })
}

/// Path of the default SQLite database under the platform data directory
#[must_use]
pub fn default_database_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(defaults::DATA_DIR_NAME)
        .join(defaults::DATABASE_FILE)
}

fn default_database_url() -> String {
    format!("sqlite:{}?mode=rwc", default_database_path().display())
}
