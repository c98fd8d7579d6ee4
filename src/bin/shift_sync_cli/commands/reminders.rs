// ABOUTME: Reminder policy commands for shift-sync-cli
// ABOUTME: Seeds or resets the default rules and prints the current policy
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Shift Sync Contributors

use shift_sync::config::ServerConfig;
use shift_sync::errors::AppResult;

/// Report the seeded rules, or replace the table with the defaults
///
/// Opening the database already seeds an empty table.
pub async fn init(config: &ServerConfig, reset: bool) -> AppResult<()> {
    let rules = super::open(config).await?.reminder_rules();
    if reset {
        let written = rules.reset_defaults().await?;
        println!("Replaced reminder policy with {written} default rule(s)");
    } else {
        let present = rules.list().await?.len();
        println!("{present} reminder rule(s) present; use --reset to restore the defaults");
    }
    Ok(())
}

/// Print the rules in policy order
pub async fn list(config: &ServerConfig) -> AppResult<()> {
    let rules = super::open(config).await?.reminder_rules().list().await?;
    println!("{:<26} {:>5} {:<8} ENABLED", "ID", "DAYS", "AUDIENCE");
    for rule in rules {
        println!(
            "{:<26} {:>5} {:<8} {}",
            rule.id,
            rule.days_before_deadline,
            rule.audience.as_str(),
            rule.enabled
        );
    }
    Ok(())
}
