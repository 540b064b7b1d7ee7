//! Entra ID user-role export job.
//!
//! Loads configuration, connects to the warehouse, and runs one batch export
//! over the latest tenant/user snapshot. Exits 0 on normal completion
//! (partial per-tenant and per-user failures included), 1 when the snapshot
//! yields no tenants or startup fails.

use std::process;
use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use entra_roles_export::{
    ExportConfig, ExportError, GraphClient, Orchestrator, PgWarehouse, TenantProcessor,
};

#[tokio::main]
async fn main() {
    let config = match ExportConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };

    init_logging(&config.rust_log);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        tenant_workers = config.tenant_workers,
        user_workers = config.user_workers,
        "Starting Entra role export"
    );

    let pool = match PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
    {
        Ok(pool) => {
            info!("Warehouse connection established");
            pool
        }
        Err(e) => {
            eprintln!("Failed to connect to warehouse: {e}");
            process::exit(1);
        }
    };

    let graph = match GraphClient::new(&config.endpoints.graph) {
        Ok(g) => Arc::new(g),
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };

    let warehouse = Arc::new(PgWarehouse::new(
        pool,
        config.snapshot_table,
        config.destination_table,
    ));
    let processor = Arc::new(TenantProcessor::new(
        graph,
        warehouse.clone(),
        Arc::new(config.credentials),
        config.endpoints,
        config.user_workers,
    ));
    let orchestrator = Orchestrator::new(warehouse, processor, config.tenant_workers);

    match orchestrator.run().await {
        Ok(()) => info!("Export finished"),
        Err(ExportError::EmptySnapshot) => {
            error!("No tenants found in the snapshot source");
            process::exit(1);
        }
        Err(e) => {
            error!(error = %e, "Export failed");
            process::exit(1);
        }
    }
}

/// Initializes the tracing subscriber, honoring `RUST_LOG` when set.
fn init_logging(default_filter: &str) {
    let filter = match EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
    {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Failed to create log filter: {e}");
            process::exit(1);
        }
    };

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
