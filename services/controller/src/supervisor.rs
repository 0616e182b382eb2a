//! Per-pool reconcile supervision.
//!
//! One task per pool, strictly serialized within a pool: a pass commits its
//! outcome before the next one starts. Pools are independent and run in
//! parallel. Discovery re-lists pools on a fixed interval and spawns loops
//! for new ones; a loop ends itself when its pool reports `Done`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use forgepool_core::{Orchestrator, PassOutcome, PoolStore};

pub struct Supervisor {
    orchestrator: Arc<Orchestrator>,
    pools: Arc<dyn PoolStore>,
    discovery_interval: Duration,
}

impl Supervisor {
    pub fn new(
        orchestrator: Arc<Orchestrator>,
        pools: Arc<dyn PoolStore>,
        discovery_interval: Duration,
    ) -> Self {
        Self {
            orchestrator,
            pools,
            discovery_interval,
        }
    }

    /// Run discovery and per-pool loops until shutdown is signaled.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            discovery_interval_secs = self.discovery_interval.as_secs(),
            "Starting pool supervisor"
        );

        let mut loops: HashMap<String, JoinHandle<()>> = HashMap::new();
        let mut interval = tokio::time::interval(self.discovery_interval);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    loops.retain(|_, handle| !handle.is_finished());
                    match self.pools.list_names().await {
                        Ok(names) => {
                            for name in names {
                                if !loops.contains_key(&name) {
                                    info!(pool = %name, "Starting reconcile loop");
                                    let handle = tokio::spawn(run_pool(
                                        Arc::clone(&self.orchestrator),
                                        name.clone(),
                                        shutdown.clone(),
                                    ));
                                    loops.insert(name, handle);
                                }
                            }
                        }
                        Err(e) => warn!(error = %e, "Failed to list pools"),
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("Supervisor shutting down");
                        break;
                    }
                }
            }
        }

        // pool loops watch the same shutdown channel; wait for them to wind down
        for (_, handle) in loops {
            let _ = handle.await;
        }
    }
}

/// One pool's reconcile loop: a pass, then sleep for whatever the outcome
/// asked, forever — until the pool vanishes or shutdown arrives.
async fn run_pool(orchestrator: Arc<Orchestrator>, name: String, mut shutdown: watch::Receiver<bool>) {
    loop {
        let after = match orchestrator.reconcile(&name).await {
            PassOutcome::Done => {
                info!(pool = %name, "Reconcile loop ending");
                return;
            }
            PassOutcome::Retry { after } | PassOutcome::Failed { after } => after,
        };

        tokio::select! {
            _ = tokio::time::sleep(after) => {}
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    return;
                }
            }
        }
    }
}
