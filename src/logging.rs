// ABOUTME: Tracing subscriber initialization for binaries
// ABOUTME: EnvFilter-driven levels with pretty or JSON fmt output
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Shift Sync Contributors

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

use crate::config::{LogFormat, LoggingConfig};
use crate::errors::{AppError, AppResult};

/// Install the global tracing subscriber
///
/// `RUST_LOG` takes precedence over the configured level. Noisy HTTP client
/// internals are capped at `warn` unless explicitly requested.
///
/// # Errors
///
/// Returns an error if the filter is malformed or a subscriber is already installed
pub fn init_logging(config: &LoggingConfig) -> AppResult<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| {
            EnvFilter::try_new(format!(
                "{},hyper=warn,reqwest=warn,sqlx=warn,h2=warn",
                config.level
            ))
        })
        .map_err(|e| AppError::config(format!("Invalid log filter: {e}")))?;

    let registry = Registry::default().with(filter);
    let result = match config.format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_current_span(false).with_target(true))
            .try_init(),
        LogFormat::Pretty => registry.with(fmt::layer().with_target(true)).try_init(),
    };

    result.map_err(|e| AppError::internal(format!("Failed to install tracing subscriber: {e}")))
}
