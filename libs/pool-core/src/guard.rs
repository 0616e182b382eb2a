//! Deregistration guard.
//!
//! A worker carrying the deregistration marker can never be fully removed by
//! the surrounding platform until the marker is cleared. This module owns
//! the clearing: the paired registry entry is deregistered first, then the
//! marker removal is persisted, so pod churn cannot orphan registry entries.
//! Entered from two directions: the retirement path for the chosen idle
//! candidate, and the per-pass sweep over workers leaving out-of-band.

use tracing::{debug, info};

use crate::conventions::Conventions;
use crate::error::CoreError;
use crate::pairing::{PairedWorker, PairingView};
use crate::registry::RegistryApi;
use crate::store::{ignore_not_found, ResourceStore};
use crate::worker::WorkerPhase;

/// Whether a release attempt got the worker to a deletable state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Release {
    /// Marker cleared (or never present); the resource may be deleted.
    Cleared,
    /// The registry refused deregistration, most likely because the entry is
    /// still executing a job. Retried on the next pass.
    Deferred,
}

pub struct DeregistrationGuard<'a> {
    pub store: &'a dyn ResourceStore,
    pub registry: &'a dyn RegistryApi,
    pub conventions: &'a Conventions,
}

impl DeregistrationGuard<'_> {
    /// Walks one pair toward deletable: deregister the registry side if it
    /// has an identity, then clear the marker and persist the update.
    ///
    /// A pair without a registry identity (registration never settled, or
    /// the entry is already gone) skips the call and clears the marker
    /// directly. Store failures propagate; registry refusals defer.
    pub async fn release(
        &self,
        scope: &str,
        token: &str,
        pair: &PairedWorker,
    ) -> Result<Release, CoreError> {
        if !pair
            .worker
            .has_finalizer(&self.conventions.deregistration_marker)
        {
            return Ok(Release::Cleared);
        }

        if let Some(entry) = &pair.entry {
            if let Some(id) = entry.id {
                info!(worker = %pair.worker.name, id, "Deregistering worker");
                if let Err(e) = self.registry.deregister(scope, token, id).await {
                    debug!(
                        worker = %pair.worker.name,
                        error = %e,
                        "Deregistration refused, deferring to next pass"
                    );
                    return Ok(Release::Deferred);
                }
            }
        }

        let mut worker = pair.worker.clone();
        worker.remove_finalizer(&self.conventions.deregistration_marker);
        self.store.update(&worker).await?;

        Ok(Release::Cleared)
    }

    /// Sweeps every pair whose worker is leaving the pool, deregistering and
    /// unblocking each one. Busy entries are swept too: the resource is
    /// going away with or without consent, so the registry entry must go
    /// with it. Completed workers additionally have their resource deleted;
    /// for terminating and evicted ones deletion is already in progress
    /// externally and only the marker stands in the way.
    pub async fn sweep(
        &self,
        scope: &str,
        token: &str,
        view: &PairingView,
    ) -> Result<(), CoreError> {
        for pair in view.deletion_sweep_candidates() {
            match self.release(scope, token, pair).await? {
                Release::Deferred => continue,
                Release::Cleared => {
                    if pair.worker.phase == WorkerPhase::Succeeded {
                        info!(worker = %pair.worker.name, "Deleting completed worker");
                        ignore_not_found(self.store.delete(&pair.worker.name).await)?;
                    }
                }
            }
        }
        Ok(())
    }
}
