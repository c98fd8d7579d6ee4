// ABOUTME: Ledger maintenance commands for shift-sync-cli
// ABOUTME: Repairs submission keys that drifted from the month-teacher id form
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Shift Sync Contributors

use shift_sync::config::ServerConfig;
use shift_sync::errors::AppResult;
use shift_sync::ledger::SubmissionLedger;
use shift_sync::registry::TeacherRegistry;

/// Rewrite drifted keys
pub async fn repair_keys(config: &ServerConfig) -> AppResult<()> {
    let database = super::open(config).await?;
    let roster = TeacherRegistry::new(database.teachers(), config.conversation.matcher)
        .list_all()
        .await?;
    let repaired = SubmissionLedger::new(database.submissions())
        .repair_keys(&roster)
        .await?;
    println!("Repaired {repaired} submission key(s)");
    Ok(())
}
