//! forgepool controller
//!
//! Thin harness around the reconciliation engine: loads configuration from
//! the environment, wires the collaborator implementations, and runs one
//! serialized reconcile loop per pool until shutdown.
//!
//! The registry client is HTTP-backed; worker resources, credentials, and
//! pool specs are held by the in-memory stores, seeded from the pools file.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use forgepool_core::{Conventions, CredentialRecord, Orchestrator, Pool};
use forgepool_testing::{MemoryCredentialStore, MemoryPoolStore, MemoryResourceStore};

mod config;
mod registry;
mod supervisor;

use registry::HttpRegistry;
use supervisor::Supervisor;

#[tokio::main]
async fn main() -> Result<()> {
    let config = config::Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Starting forgepool controller");
    info!(
        registry_url = %config.registry_url,
        pools_path = %config.pools_path,
        discovery_interval_secs = config.discovery_interval_secs,
        "Configuration loaded"
    );

    let declared = load_pools(&config.pools_path)?;
    info!(pools = declared.len(), "Pools loaded");

    let pools = Arc::new(MemoryPoolStore::new());
    let credentials = Arc::new(MemoryCredentialStore::new());
    for pool in declared {
        // seed the long-lived token under each pool's credential reference
        if let Some(token) = &config.registry_token {
            let mut record = CredentialRecord::default();
            record
                .data
                .insert(pool.spec.credential_ref.key.clone(), token.clone());
            credentials.seed(&pool.spec.credential_ref.name, record);
        }
        pools.seed(pool);
    }

    let store = Arc::new(MemoryResourceStore::new());
    let registry = Arc::new(HttpRegistry::new(config.registry_url.clone()));

    let orchestrator = Arc::new(Orchestrator::new(
        pools.clone(),
        store,
        credentials,
        registry,
        Conventions::default(),
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let supervisor = Supervisor::new(
        orchestrator,
        pools.clone(),
        Duration::from_secs(config.discovery_interval_secs),
    );
    let supervisor_handle = tokio::spawn(async move { supervisor.run(shutdown_rx).await });

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("Shutdown signal received");

    let _ = shutdown_tx.send(true);
    supervisor_handle.await?;

    info!("Controller stopped");
    Ok(())
}

/// Reads the pool declarations. A missing file is tolerated so the
/// controller can start ahead of its configuration.
fn load_pools(path: &str) -> Result<Vec<Pool>> {
    if !std::path::Path::new(path).exists() {
        warn!(path = %path, "Pools file not found, starting with no pools");
        return Ok(Vec::new());
    }

    let raw = std::fs::read_to_string(path).with_context(|| format!("failed to read {path}"))?;
    let pools: Vec<Pool> =
        serde_json::from_str(&raw).with_context(|| format!("failed to parse {path}"))?;
    Ok(pools)
}
