//! Pairing of owned workers with their registry entries.
//!
//! The view is transient: recomputed every pass, joined by name, never
//! persisted. An entry with no matching worker forms no pair (its worker was
//! deleted out-of-band, or the name is stale) but still counts toward
//! `registered_count`; a worker with no matching entry counts toward
//! `pool_size` only. That asymmetry is exactly what `in_sync` detects.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

use crate::pool::RetirementOrder;
use crate::registry::RegistryEntry;
use crate::worker::WorkerInstance;

/// One worker and, if registration has settled, its registry entry.
#[derive(Debug, Clone)]
pub struct PairedWorker {
    pub worker: WorkerInstance,
    pub entry: Option<RegistryEntry>,
}

impl PairedWorker {
    /// An unregistered worker is not busy by definition.
    pub fn is_busy(&self) -> bool {
        self.entry.as_ref().map(|e| e.busy).unwrap_or(false)
    }
}

/// The per-pass join of workers and registry entries for one pool.
///
/// Both input lists must already be scoped to the pool: workers by ownership
/// label, entries by the pool's name prefix.
#[derive(Debug, Clone)]
pub struct PairingView {
    pairs: Vec<PairedWorker>,
    entries: Vec<RegistryEntry>,
}

impl PairingView {
    pub fn new(workers: Vec<WorkerInstance>, entries: Vec<RegistryEntry>) -> Self {
        let by_name: HashMap<&str, &RegistryEntry> =
            entries.iter().map(|e| (e.name.as_str(), e)).collect();

        let pairs = workers
            .iter()
            .map(|worker| PairedWorker {
                worker: worker.clone(),
                entry: by_name.get(worker.name.as_str()).map(|e| (*e).clone()),
            })
            .collect();

        Self { pairs, entries }
    }

    pub fn pairs(&self) -> &[PairedWorker] {
        &self.pairs
    }

    pub fn pool_size(&self) -> usize {
        self.pairs.len()
    }

    pub fn registered_count(&self) -> usize {
        self.entries.len()
    }

    /// Registrations have settled: every worker has an entry and no entry is
    /// orphaned.
    pub fn in_sync(&self) -> bool {
        self.pool_size() == self.registered_count()
    }

    pub fn busy_count(&self) -> usize {
        self.entries.iter().filter(|e| e.busy).count()
    }

    pub fn idle_count(&self) -> usize {
        self.registered_count() - self.busy_count()
    }

    /// Vacuously true for an empty registry, which is what lets a pool under
    /// its maximum grow out of the zero state.
    pub fn all_busy(&self) -> bool {
        self.busy_count() == self.registered_count()
    }

    /// Pairs eligible for retirement: not busy, not already leaving, and at
    /// least `min_ttl` old. Sorted by creation time according to `order`.
    pub fn idle_candidates(
        &self,
        now: DateTime<Utc>,
        min_ttl: Duration,
        order: RetirementOrder,
    ) -> Vec<&PairedWorker> {
        let mut idles: Vec<&PairedWorker> = self
            .pairs
            .iter()
            .filter(|pair| {
                !pair.is_busy()
                    && !pair.worker.phase.is_leaving()
                    && now >= pair.worker.created_at + min_ttl
            })
            .collect();

        idles.sort_by(|a, b| match order {
            RetirementOrder::OldestFirst => a.worker.created_at.cmp(&b.worker.created_at),
            RetirementOrder::NewestFirst => b.worker.created_at.cmp(&a.worker.created_at),
        });

        idles
    }

    /// Pairs whose worker is leaving the pool with or without consent:
    /// terminating, evicted, or completed. Busy state is irrelevant here —
    /// the resource is going away regardless.
    pub fn deletion_sweep_candidates(&self) -> Vec<&PairedWorker> {
        self.pairs
            .iter()
            .filter(|pair| pair.worker.phase.is_leaving())
            .collect()
    }
}
