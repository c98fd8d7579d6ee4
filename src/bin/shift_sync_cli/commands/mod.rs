// ABOUTME: Command implementations for shift-sync-cli
// ABOUTME: One module per subcommand group
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Shift Sync Contributors

pub mod jobs;
pub mod reminders;
pub mod submissions;
pub mod teacher;

use shift_sync::config::ServerConfig;
use shift_sync::database::Database;
use shift_sync::errors::AppResult;

/// Open the configured database, migrating as needed
async fn open(config: &ServerConfig) -> AppResult<Database> {
    Database::connect(&config.database_url).await
}
