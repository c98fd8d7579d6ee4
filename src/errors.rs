// ABOUTME: Error handling entry point for the server crate
// ABOUTME: Re-exports the shared AppError taxonomy and adds storage error mapping helpers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Shift Sync Contributors

pub use shift_core::errors::{AppError, AppResult, ErrorCode};

/// Map a sqlx failure into a database error with operation context
#[must_use]
pub fn db_error(operation: &str, err: &sqlx::Error) -> AppError {
    AppError::database(format!("Failed to {operation}: {err}"))
}
