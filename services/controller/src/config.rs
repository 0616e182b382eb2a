//! Configuration for the controller.

use anyhow::Result;

/// Controller configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Registry API base URL.
    pub registry_url: String,

    /// Long-lived registry token seeded into the credential store for every
    /// pool's credential reference. Optional: the store may be pre-seeded.
    pub registry_token: Option<String>,

    /// Path to the JSON file declaring the pools to manage.
    pub pools_path: String,

    /// Seconds between pool-discovery sweeps.
    pub discovery_interval_secs: u64,

    /// Log filter (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let registry_url = std::env::var("FORGEPOOL_REGISTRY_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:8080".to_string());

        let registry_token = std::env::var("FORGEPOOL_REGISTRY_TOKEN").ok();

        let pools_path =
            std::env::var("FORGEPOOL_POOLS_PATH").unwrap_or_else(|_| "pools.json".to_string());

        let discovery_interval_secs = std::env::var("FORGEPOOL_DISCOVERY_INTERVAL")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(30);

        let log_level = std::env::var("FORGEPOOL_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            registry_url,
            registry_token,
            pools_path,
            discovery_interval_secs,
            log_level,
        })
    }
}
