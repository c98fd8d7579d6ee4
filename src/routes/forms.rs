// ABOUTME: Form submission endpoint that provisions a teacher's monthly document
// ABOUTME: Returns the intake outcome as JSON; failures are alerted to the admin
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
use serde_json::json;

use crate::context::ServerContext;
use crate::errors::AppError;
use crate::lifecycle::intake::FormSubmission;

/// Form intake routes
pub struct FormRoutes;

impl FormRoutes {
    /// Create the form intake route
    pub fn routes(ctx: Arc<ServerContext>) -> Router {
        Router::new()
            .route("/api/forms/submission", post(Self::handle_submission))
            .with_state(ctx)
    }

    async fn handle_submission(
        State(ctx): State<Arc<ServerContext>>,
        Json(form): Json<FormSubmission>,
    ) -> Result<Response, AppError> {
        match ctx.intake.request_document(&form, Utc::now()).await {
            Ok(outcome) => Ok((StatusCode::OK, Json(outcome)).into_response()),
            Err(e) => {
                let context = json!({ "teacher_name": form.teacher_name });
                ctx.alerter
                    .notify("request_document", &e, Some(&context))
                    .await;
                Err(e)
            }
        }
    }
}
