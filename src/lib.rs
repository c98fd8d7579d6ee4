// ABOUTME: Main library entry point for the shift submission coordinator
// ABOUTME: Chat-driven teacher registration and the monthly shift document lifecycle
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Shift Sync Contributors

#![recursion_limit = "256"]
#![deny(unsafe_code)]

//! # Shift Sync
//!
//! Coordinates monthly shift submissions between teachers and a school
//! administrator. Teachers register through a chat channel, receive a
//! per-month spreadsheet, tick a submit box when done, and get reminders
//! until they do. The administrator can reopen a submitted sheet from chat.
//!
//! ## Architecture
//!
//! - **Router**: per-message state machine over persisted conversation states
//! - **Registry / Ledger**: teacher roster and per-month submission records
//! - **Lifecycle**: document intake, flag polling, locking, reopening, reminders
//! - **External**: messaging and document provider clients behind traits
//! - **Routes / Server**: axum HTTP surface for webhooks, forms and job triggers
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use shift_sync::config::ServerConfig;
//! use shift_sync::context::ServerContext;
//! use shift_sync::errors::AppResult;
//!
//! #[tokio::main]
//! async fn main() -> AppResult<()> {
//!     let config = ServerConfig::from_env()?;
//!     let ctx = ServerContext::connect(config).await?;
//!     println!("Listening on port {}", ctx.config.http_port);
//!     Ok(())
//! }
//! ```

/// Error alerts pushed to the administrator
pub mod alerts;

/// Parsing of admin commands, registration prefixes and confirmations
pub mod commands;

/// Configuration management
pub mod config;

/// Application constants and configuration values
pub mod constants;

/// Email and name extraction from free text
pub mod contact;

/// Shared server context
pub mod context;

/// SQLite persistence
pub mod database;

/// Unified error handling with standard error codes and HTTP responses
pub mod errors;

/// Messaging and document provider clients
pub mod external;

/// Health checks
pub mod health;

/// Submission ledger over the database
pub mod ledger;

/// Submission lifecycle services and the job scheduler
pub mod lifecycle;

/// Structured logging setup
pub mod logging;

/// Reply and notification texts
pub mod messages;

/// Domain models
pub mod models;

/// Name normalization and roster matching
pub mod names;

/// Teacher roster operations
pub mod registry;

/// Inbound chat message router
pub mod router;

/// HTTP routes
pub mod routes;

/// HTTP server assembly
pub mod server;
