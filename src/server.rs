// ABOUTME: HTTP server assembly: merges route modules, applies middleware and serves with graceful shutdown
// ABOUTME: Also provides the shutdown signal shared by the server and the scheduler
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Shift Sync Contributors

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tower_http::LatencyUnit;
use tracing::{error, info, Level};

use crate::constants::limits;
use crate::context::ServerContext;
use crate::errors::{AppError, AppResult};
use crate::routes::{FormRoutes, HealthRoutes, JobRoutes, WebhookRoutes};

/// Upper bound on one request, including router and job work
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Complete router with middleware applied
pub fn build_router(ctx: &Arc<ServerContext>) -> Router {
    Router::new()
        .merge(HealthRoutes::routes(Arc::clone(ctx)))
        .merge(WebhookRoutes::routes(Arc::clone(ctx)))
        .merge(FormRoutes::routes(Arc::clone(ctx)))
        .merge(JobRoutes::routes(Arc::clone(ctx)))
        .layer(RequestBodyLimitLayer::new(limits::WEBHOOK_BODY_LIMIT_BYTES))
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(
                    DefaultMakeSpan::new()
                        .level(Level::INFO)
                        .include_headers(false),
                )
                .on_response(
                    DefaultOnResponse::new()
                        .level(Level::INFO)
                        .latency_unit(LatencyUnit::Millis),
                ),
        )
}

/// Serve HTTP on `port` until `shutdown` resolves
///
/// # Errors
///
/// Returns an error if the port cannot be bound or the server fails
pub async fn serve<S>(ctx: Arc<ServerContext>, port: u16, shutdown: S) -> AppResult<()>
where
    S: Future<Output = ()> + Send + 'static,
{
    let app = build_router(&ctx);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;
    info!("HTTP server listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| AppError::internal(format!("Transport error: {e}")))?;

    info!("HTTP server stopped");
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on unix
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl-C, shutting down"),
        () = terminate => info!("Received terminate signal, shutting down"),
    }
}
