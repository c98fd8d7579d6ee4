// ABOUTME: Roster commands for shift-sync-cli
// ABOUTME: Adds teachers, lists the roster and toggles the on-leave flag
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Shift Sync Contributors

use chrono::Utc;
use shift_sync::config::ServerConfig;
use shift_sync::contact::{is_gmail, is_valid_email};
use shift_sync::errors::{AppError, AppResult};
use shift_sync::registry::TeacherRegistry;
use tracing::info;

async fn registry(config: &ServerConfig) -> AppResult<TeacherRegistry> {
    let database = super::open(config).await?;
    Ok(TeacherRegistry::new(
        database.teachers(),
        config.conversation.matcher,
    ))
}

/// Add a teacher
pub async fn add(
    config: &ServerConfig,
    name: &str,
    email: Option<&str>,
    chat_user_id: Option<&str>,
) -> AppResult<()> {
    if name.trim().is_empty() {
        return Err(AppError::invalid_input("Name must not be empty"));
    }
    if let Some(email) = email {
        if !is_valid_email(email) || !is_gmail(email) {
            return Err(AppError::invalid_input(format!(
                "'{email}' is not a Gmail address"
            )));
        }
    }

    let teacher = registry(config)
        .await?
        .create(name.trim(), chat_user_id, email, Utc::now())
        .await?;
    info!(teacher_id = %teacher.id, "Teacher added from CLI");
    println!("Added {} ({})", teacher.display_name, teacher.id);
    Ok(())
}

/// Print the roster
pub async fn list(config: &ServerConfig) -> AppResult<()> {
    let teachers = registry(config).await?.list_all().await?;
    if teachers.is_empty() {
        println!("No teachers registered");
        return Ok(());
    }
    println!("{:<6} {:<20} {:<32} {:<6} LEAVE", "ID", "NAME", "EMAIL", "CHAT");
    for t in &teachers {
        println!(
            "{:<6} {:<20} {:<32} {:<6} {}",
            t.id,
            t.display_name,
            t.email.as_deref().unwrap_or("-"),
            if t.has_chat_user() { "yes" } else { "no" },
            if t.on_leave { "yes" } else { "" },
        );
    }
    println!("\n{} teacher(s)", teachers.len());
    Ok(())
}

/// Set or clear the on-leave flag
pub async fn set_leave(config: &ServerConfig, id: &str, on_leave: bool) -> AppResult<()> {
    let registry = registry(config).await?;
    if registry.get(id).await?.is_none() {
        return Err(AppError::not_found(format!("Teacher {id}")));
    }
    registry.set_on_leave(id, on_leave).await?;
    println!(
        "{id} is {}",
        if on_leave { "on leave" } else { "active" }
    );
    Ok(())
}
