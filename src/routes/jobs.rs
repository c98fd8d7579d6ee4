// ABOUTME: Manual triggers for the poll and reminder jobs
// ABOUTME: Each returns the batch report; a run that could not start is a 500
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Shift Sync Contributors

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;

use crate::context::ServerContext;
use crate::errors::AppError;
use crate::lifecycle::BatchReport;

/// Job trigger routes
pub struct JobRoutes;

impl JobRoutes {
    /// Create the job trigger routes
    pub fn routes(ctx: Arc<ServerContext>) -> Router {
        Router::new()
            .route("/api/jobs/poll", post(Self::handle_poll))
            .route("/api/jobs/reminders", post(Self::handle_reminders))
            .with_state(ctx)
    }

    async fn handle_poll(State(ctx): State<Arc<ServerContext>>) -> Result<Response, AppError> {
        Self::report(ctx.scheduler.run_poll(Utc::now()).await, "poll")
    }

    async fn handle_reminders(
        State(ctx): State<Arc<ServerContext>>,
    ) -> Result<Response, AppError> {
        Self::report(ctx.scheduler.run_reminders(Utc::now()).await, "reminder")
    }

    fn report(report: Option<BatchReport>, job: &str) -> Result<Response, AppError> {
        report
            .map(|r| (StatusCode::OK, Json(r)).into_response())
            .ok_or_else(|| AppError::internal(format!("The {job} run failed; see the admin alert")))
    }
}
