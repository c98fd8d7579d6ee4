// ABOUTME: Operator CLI for roster, reminder policy, job and ledger maintenance
// ABOUTME: Shares configuration and services with the server binary
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Shift Sync Contributors

//! # Shift Sync CLI
//!
//! ```bash
//! shift-sync-cli teacher add "山田 太郎" --email taro@gmail.com
//! shift-sync-cli jobs initial-request --force
//! shift-sync-cli submissions repair-keys
//! ```

mod commands;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use shift_sync::config::{LogFormat, ServerConfig};
use shift_sync::logging::init_logging;

#[derive(Parser)]
#[command(
    name = "shift-sync-cli",
    version,
    about = "Shift Sync administration",
    long_about = "Manage the teacher roster and reminder policy, and run jobs by hand"
)]
struct Cli {
    /// Database URL override
    #[arg(long, global = true)]
    database_url: Option<String>,

    /// Enable verbose logging
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Teacher roster
    Teacher {
        #[command(subcommand)]
        action: TeacherAction,
    },
    /// Reminder policy
    Reminders {
        #[command(subcommand)]
        action: ReminderAction,
    },
    /// Run a scheduled job once
    Jobs {
        #[command(subcommand)]
        action: JobAction,
    },
    /// Submission ledger maintenance
    Submissions {
        #[command(subcommand)]
        action: SubmissionAction,
    },
}

#[derive(Subcommand)]
enum TeacherAction {
    /// Add a teacher to the roster
    Add {
        /// Full name
        name: String,
        /// Gmail address used to edit documents
        #[arg(long)]
        email: Option<String>,
        /// Chat identity to link immediately
        #[arg(long)]
        chat_user_id: Option<String>,
    },
    /// List the roster
    List,
    /// Mark a teacher as on leave, or back
    Leave {
        /// Teacher id
        id: String,
        /// Clear the on-leave flag instead
        #[arg(long)]
        back: bool,
    },
}

#[derive(Subcommand)]
enum ReminderAction {
    /// Seed the default rules when the table is empty
    Init {
        /// Replace existing rules with the defaults
        #[arg(long)]
        reset: bool,
    },
    /// List the rules
    List,
}

#[derive(Subcommand)]
enum JobAction {
    /// Poll submit flags once
    Poll,
    /// Run the daily reminder duties once
    Reminders,
    /// Send the next month's initial request
    InitialRequest {
        /// Send even when today is not the configured day
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand)]
enum SubmissionAction {
    /// Rewrite drifted ledger keys to `{month}-{teacherId}`
    RepairKeys,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = ServerConfig::from_env().context("Failed to load configuration")?;
    if let Some(url) = cli.database_url {
        config.database_url = url;
    }
    config.logging.level = if cli.verbose { "debug" } else { "warn" }.to_owned();
    config.logging.format = LogFormat::Pretty;
    init_logging(&config.logging).context("Failed to initialize logging")?;

    match cli.command {
        Command::Teacher { action } => match action {
            TeacherAction::Add {
                name,
                email,
                chat_user_id,
            } => commands::teacher::add(&config, &name, email.as_deref(), chat_user_id.as_deref()).await?,
            TeacherAction::List => commands::teacher::list(&config).await?,
            TeacherAction::Leave { id, back } => commands::teacher::set_leave(&config, &id, !back).await?,
        },
        Command::Reminders { action } => match action {
            ReminderAction::Init { reset } => commands::reminders::init(&config, reset).await?,
            ReminderAction::List => commands::reminders::list(&config).await?,
        },
        Command::Jobs { action } => match action {
            JobAction::Poll => commands::jobs::poll(config).await?,
            JobAction::Reminders => commands::jobs::reminders(config).await?,
            JobAction::InitialRequest { force } => commands::jobs::initial_request(config, force).await?,
        },
        Command::Submissions { action } => match action {
            SubmissionAction::RepairKeys => commands::submissions::repair_keys(&config).await?,
        },
    }
    Ok(())
}
