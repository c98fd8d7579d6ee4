// ABOUTME: Service health checks for operational visibility
// ABOUTME: Reports database reachability and schema contract status with timings
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Shift Sync Contributors

//! Health checks behind `GET /health`

use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

use crate::database::Database;

/// Overall or per-component health
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// All systems operational
    Healthy,
    /// Critical systems failing
    Unhealthy,
}

/// Service information
#[derive(Debug, Clone, Serialize)]
pub struct ServiceInfo {
    /// Service name
    pub name: String,
    /// Service version
    pub version: String,
    /// Seconds since the checker was created
    pub uptime_seconds: u64,
}

/// Result of one component check
#[derive(Debug, Clone, Serialize)]
pub struct ComponentHealth {
    /// Component name
    pub name: String,
    /// Component status
    pub status: HealthStatus,
    /// Status description
    pub message: String,
    /// Check duration in milliseconds
    pub duration_ms: u64,
}

/// Health check response
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Overall status; unhealthy when any component is
    pub status: HealthStatus,
    /// Service information
    pub service: ServiceInfo,
    /// Individual component checks
    pub checks: Vec<ComponentHealth>,
    /// Response timestamp
    pub timestamp: DateTime<Utc>,
}

/// Runs component checks
#[derive(Clone)]
pub struct HealthChecker {
    start_time: Instant,
    database: Database,
}

impl HealthChecker {
    /// Create a checker; uptime counts from here
    #[must_use]
    pub fn new(database: Database) -> Self {
        Self {
            start_time: Instant::now(),
            database,
        }
    }

    /// Run every check
    pub async fn check(&self) -> HealthResponse {
        let checks = vec![self.check_database().await];
        let status = if checks.iter().all(|c| c.status == HealthStatus::Healthy) {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unhealthy
        };

        HealthResponse {
            status,
            service: ServiceInfo {
                name: env!("CARGO_PKG_NAME").to_owned(),
                version: env!("CARGO_PKG_VERSION").to_owned(),
                uptime_seconds: self.start_time.elapsed().as_secs(),
            },
            checks,
            timestamp: Utc::now(),
        }
    }

    async fn check_database(&self) -> ComponentHealth {
        let started = Instant::now();
        let (status, message) = match self.database.verify_schema().await {
            Ok(()) => (HealthStatus::Healthy, "Database reachable, schema complete".to_owned()),
            Err(e) => {
                warn!(error = %e, "Database health check failed");
                (HealthStatus::Unhealthy, e.to_string())
            }
        };
        ComponentHealth {
            name: "database".to_owned(),
            status,
            message,
            duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        }
    }
}
