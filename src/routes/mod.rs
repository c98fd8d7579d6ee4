// ABOUTME: Route module organization for the shift submission HTTP endpoints
// ABOUTME: Each domain module exposes a routes() constructor over the shared server context
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Shift Sync Contributors

//! HTTP routes
//!
//! Handlers are thin: they extract the request, call one lifecycle service
//! from [`crate::context::ServerContext`] and serialize the outcome.

/// Form-driven document provisioning
pub mod forms;
/// Health check
pub mod health;
/// Manual job triggers
pub mod jobs;
/// Messaging platform webhook
pub mod webhook;

pub use forms::FormRoutes;
pub use health::HealthRoutes;
pub use jobs::JobRoutes;
pub use webhook::WebhookRoutes;
