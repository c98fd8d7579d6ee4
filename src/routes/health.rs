// ABOUTME: Health check route
// ABOUTME: 200 when every component is healthy, 503 otherwise
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Shift Sync Contributors

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};

use crate::context::ServerContext;
use crate::health::HealthStatus;

/// Health check routes
pub struct HealthRoutes;

impl HealthRoutes {
    /// Create the health route
    pub fn routes(ctx: Arc<ServerContext>) -> Router {
        Router::new()
            .route("/health", get(Self::handle_health))
            .with_state(ctx)
    }

    async fn handle_health(State(ctx): State<Arc<ServerContext>>) -> Response {
        let health = ctx.health.check().await;
        let status = match health.status {
            HealthStatus::Healthy => StatusCode::OK,
            HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        };
        (status, Json(health)).into_response()
    }
}
