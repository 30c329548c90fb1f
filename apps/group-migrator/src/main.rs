//! Group migration worker.
//!
//! Connects to the directory database and runs the group migration job
//! on a fixed sweep interval until it receives Ctrl+C or SIGTERM.

mod config;
mod logging;

use std::sync::Arc;

use idbridge_db::{run_migrations, DbPool};
use idbridge_groups::{MigrateGroupsJob, MigrationWorker, PgDirectoryStore};
use tokio::signal;
use tracing::{error, info};

use crate::config::AppConfig;

#[tokio::main]
async fn main() {
    let config = match AppConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("FATAL: Configuration error: {e}");
            std::process::exit(1);
        }
    };

    logging::init_logging(&config.rust_log);

    info!(
        app = %config.migration.config_namespace,
        legacy_backend = %config.migration.legacy_backend,
        federated_backend = %config.migration.federated_backend,
        "Starting group migrator"
    );

    let pool = match DbPool::connect_with_max(&config.database_url, config.max_connections).await {
        Ok(p) => p,
        Err(e) => {
            error!(error = %e, "Failed to connect to database");
            std::process::exit(1);
        }
    };

    if config.run_migrations {
        if let Err(e) = run_migrations(&pool).await {
            error!(error = %e, "Failed to run database migrations");
            std::process::exit(1);
        }
    }

    let store = Arc::new(PgDirectoryStore::new(pool, &config.migration));
    let job = Arc::new(MigrateGroupsJob::from_store(store, config.migration.clone()));

    // The worker stops once every queue handle is dropped, so this one is
    // held until exit even though the binary only sweeps.
    let (worker, _queue) = MigrationWorker::new(job, config.worker.clone());
    let worker = Arc::new(worker);

    let runner = {
        let worker = Arc::clone(&worker);
        tokio::spawn(async move { worker.run().await })
    };

    shutdown_signal().await;
    worker.shutdown();

    if let Err(e) = runner.await {
        error!(error = %e, "Migration worker task failed");
        std::process::exit(1);
    }

    info!("Group migrator shutdown complete");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
