// ABOUTME: Domain model re-exports for the server crate
// ABOUTME: Canonical definitions live in shift-core
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Shift Sync Contributors

pub use shift_core::models::*;
