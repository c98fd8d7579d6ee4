// ABOUTME: One-off job commands for shift-sync-cli
// ABOUTME: Builds the full server context so jobs talk to the real messaging and document APIs
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Shift Sync Contributors

use chrono::Utc;
use shift_sync::config::ServerConfig;
use shift_sync::context::ServerContext;
use shift_sync::errors::{AppError, AppResult};
use shift_sync::lifecycle::BatchReport;

fn print_report(job: &str, report: &BatchReport) -> AppResult<()> {
    println!("{job}: {}", serde_json::to_string_pretty(report)?);
    Ok(())
}

/// Poll submit flags once
pub async fn poll(config: ServerConfig) -> AppResult<()> {
    let ctx = ServerContext::connect(config).await?;
    let report = ctx
        .scheduler
        .run_poll(Utc::now())
        .await
        .ok_or_else(|| AppError::internal("Poll run failed"))?;
    print_report("poll", &report)
}

/// Run the reminder duties once
pub async fn reminders(config: ServerConfig) -> AppResult<()> {
    let ctx = ServerContext::connect(config).await?;
    let report = ctx
        .scheduler
        .run_reminders(Utc::now())
        .await
        .ok_or_else(|| AppError::internal("Reminder run failed"))?;
    print_report("reminders", &report)
}

/// Send the next month's initial request
pub async fn initial_request(config: ServerConfig, force: bool) -> AppResult<()> {
    let ctx = ServerContext::connect(config).await?;
    let outcome = ctx.reminders.initial_request(Utc::now(), force).await?;
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}
