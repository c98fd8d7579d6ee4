// ABOUTME: Configuration module root
// ABOUTME: Environment-driven server configuration injected at startup
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Shift Sync Contributors

/// Environment-based server configuration
pub mod environment;

pub use environment::{
    ConversationConfig, DocumentConfig, LineConfig, LogFormat, LoggingConfig, ScheduleConfig,
    ServerConfig,
};
