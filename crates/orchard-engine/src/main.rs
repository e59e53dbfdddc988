//! Engine binary for the Orchard farming simulation.
//!
//! Keeps every farm moving while nobody is looking at it. Foreground reads
//! run the same per-user update, so this loop only has to make sure idle
//! farms still grow, collect weather and spawn fruit.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `orchard-config.yaml`
//! 2. Initialize structured logging (tracing)
//! 3. Connect to `PostgreSQL` and run migrations
//! 4. Load the catalog, seeding the starter catalog into an empty database
//! 5. Build the engine and run the sweep scheduler until Ctrl-C

mod error;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use orchard_core::config::{FarmConfig, LogFormat, LoggingConfig};
use orchard_core::{Engine, EngineRules, run_scheduler};
use orchard_db::{CatalogStore, Database, PgFarmStore, PoolSettings};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;

/// Application entry point for the engine.
///
/// # Errors
///
/// Returns an error if configuration, logging or database setup fails.
#[tokio::main]
async fn main() -> Result<(), EngineError> {
    // 1. Load configuration. Logging is not up yet, so the fallback is
    //    reported after initialization.
    let config_path = Path::new("orchard-config.yaml");
    let config = FarmConfig::load_or_default(config_path)?;

    // 2. Initialize structured logging.
    init_tracing(&config.logging)?;
    info!("orchard-engine starting");
    if !config_path.exists() {
        info!("Config file not found, using defaults");
    }
    info!(
        sweep_interval_ms = config.engine.sweep_interval_ms,
        seed = ?config.engine.seed,
        max_sweeps = ?config.engine.max_sweeps,
        "Configuration loaded"
    );

    // 3. Connect to PostgreSQL.
    let pool = Database::open(&PoolSettings::from(&config.infrastructure)).await?;

    // 4. Load the catalog.
    let catalog = CatalogStore::new(pool.pool()).load_or_seed().await?;
    let [plants, fruit, consumables, weather, combinations] = catalog.counts();
    info!(plants, fruit, consumables, weather, combinations, "Catalog ready");

    // 5. Run the scheduler.
    let engine = Engine::new(
        Arc::new(catalog),
        PgFarmStore::new(pool.pool().clone()),
        EngineRules::from_config(&config),
        config.engine.seed,
    );
    let result = run_scheduler(
        &engine,
        Duration::from_millis(config.engine.sweep_interval_ms),
        config.engine.max_sweeps,
        shutdown_signal(),
    )
    .await;

    pool.close().await;
    info!(end = ?result.end, sweeps = result.sweeps, "orchard-engine shutdown complete");
    Ok(())
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise the configured level applies.
fn init_tracing(logging: &LoggingConfig) -> Result<(), EngineError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    let installed = match logging.format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|e| EngineError::Logging {
        message: format!("{e}"),
    })
}

/// Resolves on Ctrl-C. If the handler cannot be installed the engine runs
/// until its sweep limit (or forever).
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(err) => {
            warn!(%err, "Could not listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    }
}
