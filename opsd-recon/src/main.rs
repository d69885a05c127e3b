//! opsd-recon - Reconciliation Service
//!
//! Owns the entity-resolution queue: scores fuzzy-match candidates between
//! free-text identifiers and canonical entities, auto-applies confident
//! matches, queues the rest for human review across channels, and learns
//! reusable rules from repeated decisions.

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use opsd_recon::config::ServiceConfig;
use opsd_recon::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting opsd-recon (Reconciliation Service)");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = ServiceConfig::load()?;
    info!("Database: {}", config.database_path.display());

    let db_pool = opsd_common::db::init_database(&config.database_path).await?;
    info!("Database connection established");

    let addr = format!("{}:{}", config.host, config.port);
    let state = AppState::new(db_pool, config);
    let app = opsd_recon::build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
