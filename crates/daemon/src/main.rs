// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `hvfleetd` — loads settings, wires the service graph, runs inventory
//! startup discovery, then serves HTTP until it receives SIGINT/SIGTERM.
//!
//! Config errors are reported and exit the process before anything else
//! runs: no listener binds, no background loop spawns, until settings
//! have validated.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use hvfleet_core::Settings;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use hvfleet_daemon::{background, context::AppContext, router};

#[derive(Debug, Parser)]
#[command(name = "hvfleetd", about = "Hyper-V fleet orchestrator control plane")]
struct Cli {
    /// Path to a TOML config file. Settings not present in the file, and
    /// this flag if omitted entirely, fall back to field defaults, then
    /// any HVFLEET_* environment variable overrides are applied on top.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines instead of the human-readable format.
    #[arg(long)]
    json_logs: bool,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

fn listen_addr(settings: &Settings) -> String {
    settings.listen_addr.clone().unwrap_or_else(|| "0.0.0.0:8080".to_string())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let settings = match Settings::load(cli.config.as_deref()) {
        Ok(settings) => settings,
        Err(err) => {
            error!(error = %err, "failed to load configuration");
            return ExitCode::FAILURE;
        }
    };
    if let Err(err) = settings.validate() {
        error!(error = %err, "configuration failed validation");
        return ExitCode::FAILURE;
    }

    let addr = listen_addr(&settings);
    let context = AppContext::build(settings);

    info!(app_name = %context.settings.app_name, environment = %context.settings.environment_name, "starting hvfleetd");
    background::run_startup(&context).await;

    let inventory_loop = tokio::spawn(background::run_inventory_refresh_loop(context.clone()));
    let retention_loop = tokio::spawn(background::run_retention_sweep_loop(context.clone()));

    let app = router::build_router(context.clone());
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err) => {
            error!(error = %err, addr = %addr, "failed to bind listener");
            context.shutdown.cancel();
            return ExitCode::FAILURE;
        }
    };
    info!(addr = %addr, "listening");

    let shutdown_token = context.shutdown.clone();
    let serve_result = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_token))
        .await;

    context.shutdown.cancel();
    let _ = tokio::join!(inventory_loop, retention_loop);

    match serve_result {
        Ok(()) => {
            info!("hvfleetd shut down cleanly");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(error = %err, "server exited with an error");
            ExitCode::FAILURE
        }
    }
}

/// Resolves once either a termination signal arrives or the context's
/// own shutdown token is cancelled (e.g. by a bind failure elsewhere),
/// whichever comes first.
async fn shutdown_signal(shutdown: tokio_util::sync::CancellationToken) {
    let ctrl_c = async {
        let _ = signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => error!(error = %err, "failed to install SIGTERM handler"),
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT"),
        _ = terminate => info!("received SIGTERM"),
        _ = shutdown.cancelled() => {},
    }
}
