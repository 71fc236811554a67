//! Tally API Server
//!
//! Main entry point for the Tally account service.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tally_api::{AppState, create_router};
use tally_core::LedgerPolicy;
use tally_core::lock::{InMemoryLockManager, LockManager, LockTimeouts};
use tally_db::migration::{Migrator, MigratorTrait};
use tally_db::{DatabaseLockManager, SeaLedgerStore, connect_with};
use tally_shared::{AppConfig, LockBackend};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tally=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = AppConfig::load().context("failed to load configuration")?;

    // Connect to database
    let db = connect_with(&config.database).await?;
    info!("Connected to database");

    if config.database.auto_migrate {
        Migrator::up(&db, None).await?;
        info!("Migrations applied");
    }

    let locks: Arc<dyn LockManager> = match config.lock.backend {
        LockBackend::Database => Arc::new(DatabaseLockManager::new(
            db.clone(),
            config.lock.retry_interval(),
        )),
        LockBackend::Memory => {
            warn!("Using process-local account locks; run a single instance only");
            Arc::new(InMemoryLockManager::new())
        }
    };
    info!(
        backend = ?config.lock.backend,
        wait_ms = config.lock.wait_timeout_ms,
        lease_ms = config.lock.lease_timeout_ms,
        "Account locks configured"
    );

    // Create application state
    let state = AppState::new(
        Arc::new(SeaLedgerStore::new(db)),
        locks,
        LedgerPolicy::from(&config.ledger),
        LockTimeouts::from(&config.lock),
    );

    // Create router
    let app = create_router(state);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
