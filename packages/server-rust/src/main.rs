//! `DevCamper` API server binary.
//!
//! `main` supervises the server: it owns the serve task, turns Ctrl-C or
//! SIGTERM into a graceful drain, and exits non-zero on a fatal error.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use devcamper_server::network::{AppState, NetworkModule, ShutdownController};
use devcamper_server::{logging, DocumentStore, MemoryStore, ServerArgs, TimedStore};
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let args = ServerArgs::parse();
    if let Err(err) = logging::init(args.log_format) {
        eprintln!("failed to initialise logging: {err}");
        return ExitCode::FAILURE;
    }

    match run(args).await {
        Ok(()) => {
            info!("server stopped");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(error = ?err, "server terminated with a fatal error");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: ServerArgs) -> anyhow::Result<()> {
    let store: Arc<dyn DocumentStore> =
        Arc::new(TimedStore::new(MemoryStore::new(), args.store_timeout()));
    let state = AppState::new(store, args.query_config(), Arc::new(ShutdownController::new()));
    state
        .resources
        .initialize()
        .await
        .context("failed to declare unique indexes")?;

    let mut module = NetworkModule::new(args.network_config(), state);
    let port = module.start().await.context("failed to bind listener")?;
    info!(port, "DevCamper API listening");

    module.serve(shutdown_signal()).await
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("shutdown signal received, draining");
}
