//! # Inventory Orchestrator
//!
//! Standalone process running the job scheduler, SLA sweeps, analytics
//! recalculation and stale resource reclaimer.
//!
//! ## Usage
//!
//! ```bash
//! # In-memory storage, development configuration
//! cargo run --bin inventory-orchestrator
//!
//! # Postgres-backed, production configuration
//! INVENTORY_ENV=production INVENTORY__DATABASE__URL=postgres://... cargo run --bin inventory-orchestrator
//! ```

use anyhow::Context;
use inventory_orchestration::config::ConfigManager;
use inventory_orchestration::database::DatabaseConnection;
use inventory_orchestration::logging;
use inventory_orchestration::orchestration::{Collaborators, OrchestrationCore};
use tokio::signal;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_manager = ConfigManager::load().context("failed to load configuration")?;
    let config = config_manager.config().clone();

    logging::init_structured_logging_with(&config.logging);

    info!("🚀 Starting inventory orchestrator");
    info!("   Version: {}", env!("CARGO_PKG_VERSION"));
    info!("   Environment: {}", config_manager.environment());

    let (collaborators, database) = match config.database.url.as_deref() {
        Some(url) => {
            let database = DatabaseConnection::connect(url, &config.database)
                .await
                .context("failed to connect to Postgres")?;
            database
                .migrate()
                .await
                .context("failed to apply database migrations")?;
            let collaborators = Collaborators::postgres(database.pool().clone(), &config)?;
            (collaborators, Some(database))
        }
        None => {
            warn!("No database.url configured; using in-memory storage");
            (Collaborators::in_memory(&config)?, None)
        }
    };

    let core = OrchestrationCore::bootstrap(config, collaborators)
        .context("failed to bootstrap orchestration core")?;
    core.start();

    info!("🎉 Orchestrator running; press Ctrl+C to shut down");
    shutdown_signal().await;

    info!("🛑 Shutdown signal received");
    core.shutdown().await;
    if let Some(database) = database {
        database.close().await;
    }

    info!("👋 Orchestrator shutdown complete");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
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
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
