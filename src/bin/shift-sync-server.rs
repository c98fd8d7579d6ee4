// ABOUTME: Server binary: HTTP webhook/forms/jobs surface plus the background scheduler
// ABOUTME: Configuration comes from the environment with command-line overrides
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Shift Sync Contributors

//! # Shift Sync Server
//!
//! ```bash
//! shift-sync-server --port 8080 --database-url sqlite:./shift_sync.db
//! ```

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info};

use shift_sync::config::ServerConfig;
use shift_sync::context::ServerContext;
use shift_sync::logging::init_logging;
use shift_sync::server::{serve, shutdown_signal};

#[derive(Parser)]
#[command(
    name = "shift-sync-server",
    version,
    about = "Shift submission coordinator server",
    long_about = "Receives chat webhooks and form submissions, and runs the document poll and reminder jobs"
)]
struct Args {
    /// HTTP port override
    #[arg(long)]
    port: Option<u16>,

    /// Database URL override
    #[arg(long)]
    database_url: Option<String>,

    /// Administrator chat identity override
    #[arg(long)]
    admin_user_id: Option<String>,

    /// Serve HTTP only; do not run the scheduler
    #[arg(long)]
    no_scheduler: bool,
}

impl Args {
    fn apply(self, config: &mut ServerConfig) {
        if let Some(port) = self.port {
            config.http_port = port;
        }
        if let Some(url) = self.database_url {
            config.database_url = url;
        }
        if let Some(admin) = self.admin_user_id {
            config.admin_chat_user_id = Some(admin);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let run_scheduler = !args.no_scheduler;

    let mut config = ServerConfig::from_env().context("Failed to load configuration")?;
    args.apply(&mut config);
    init_logging(&config.logging).context("Failed to initialize logging")?;
    config.log_summary();

    let port = config.http_port;
    let ctx = Arc::new(
        ServerContext::connect(config)
            .await
            .context("Failed to initialize server context")?,
    );

    let (stop_tx, stop_rx) = watch::channel(false);
    let scheduler = run_scheduler.then(|| {
        let scheduler = ctx.scheduler.clone();
        let mut stop = stop_rx.clone();
        tokio::spawn(async move {
            scheduler
                .run(async move {
                    // Err means the sender is gone, which also means stop
                    let _ = stop.wait_for(|stopped| *stopped).await;
                })
                .await;
        })
    });

    let server_stop = {
        let stop_tx = stop_tx.clone();
        async move {
            shutdown_signal().await;
            let _ = stop_tx.send(true);
        }
    };
    let result = serve(Arc::clone(&ctx), port, server_stop).await;

    let _ = stop_tx.send(true);
    if let Some(handle) = scheduler {
        if let Err(e) = handle.await {
            error!(error = %e, "Scheduler task ended abnormally");
        }
    }

    result.context("HTTP server failed")?;
    info!("Server shutdown complete");
    Ok(())
}
