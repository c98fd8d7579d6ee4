// ABOUTME: Core domain types shared by the shift submission coordinator crates
// ABOUTME: Exposes teacher, submission, conversation and reminder models plus the error taxonomy
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Shift Sync Contributors

#![deny(unsafe_code)]

//! # Shift Core
//!
//! Domain models and error types that every layer of the shift submission
//! coordinator depends on. Nothing in this crate performs I/O.
//!
//! - [`models`]: teachers, monthly submissions, pending conversation topics,
//!   and the reminder policy table
//! - [`errors`]: the [`errors::AppError`] type and its [`errors::ErrorCode`] taxonomy

/// Error taxonomy and result alias
pub mod errors;
/// Domain models
pub mod models;
