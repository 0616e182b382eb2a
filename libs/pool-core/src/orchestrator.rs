//! Reconciliation orchestrator.
//!
//! Sequences one pass per pool: fetch and validate the spec, build the
//! pairing view, refresh the registration credential, sweep departing
//! workers, hold if out of sync, then grow or retire. Every outcome maps to
//! a fixed-period requeue; only a vanished pool terminates the loop. Passes
//! for one pool must be strictly serialized by the caller — the engine
//! itself never runs two concurrently.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use crate::conventions::{merge_labels, Conventions};
use crate::credentials;
use crate::error::CoreError;
use crate::guard::{DeregistrationGuard, Release};
use crate::pairing::PairingView;
use crate::policy;
use crate::pool::{Pool, DEFAULT_RECONCILIATION_PERIOD};
use crate::registry::RegistryApi;
use crate::status::{ConditionStatus, CONDITION_READY, CONDITION_SYNCED};
use crate::store::{
    ignore_not_found, CredentialStore, ListSelector, PoolStore, ResourceStore, WorkerMeta,
};

/// Terminal outcome of one reconciliation pass.
///
/// There is no backoff in this design, only fixed-period re-evaluation:
/// faster recovery, at a small risk of thrashing under sustained external
/// failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    /// The pool is gone; stop reconciling it.
    Done,
    /// Pass committed; re-evaluate after the pool's period.
    Retry { after: Duration },
    /// Pass aborted on an error recorded in status; re-evaluate after the
    /// same period.
    Failed { after: Duration },
}

pub struct Orchestrator {
    pools: Arc<dyn PoolStore>,
    store: Arc<dyn ResourceStore>,
    credentials: Arc<dyn CredentialStore>,
    registry: Arc<dyn RegistryApi>,
    conventions: Conventions,
}

impl Orchestrator {
    pub fn new(
        pools: Arc<dyn PoolStore>,
        store: Arc<dyn ResourceStore>,
        credentials: Arc<dyn CredentialStore>,
        registry: Arc<dyn RegistryApi>,
        conventions: Conventions,
    ) -> Self {
        Self {
            pools,
            store,
            credentials,
            registry,
            conventions,
        }
    }

    /// Runs a single reconciliation pass for the named pool.
    #[instrument(skip(self))]
    pub async fn reconcile(&self, pool_name: &str) -> PassOutcome {
        let mut pool = match self.pools.get(pool_name).await {
            Ok(Some(pool)) => pool,
            Ok(None) => {
                info!("Pool gone, stopping reconciliation");
                return PassOutcome::Done;
            }
            Err(e) => {
                warn!(error = %e, "Failed to fetch pool");
                return PassOutcome::Failed {
                    after: DEFAULT_RECONCILIATION_PERIOD,
                };
            }
        };

        if let Err(e) = pool.spec.validate() {
            return self.manage_outcome(&mut pool, Some(e.into())).await;
        }

        let result = self.run_pass(&mut pool).await;
        self.manage_outcome(&mut pool, result.err()).await
    }

    async fn run_pass(&self, pool: &mut Pool) -> Result<(), CoreError> {
        let now = Utc::now();

        let reference_token =
            credentials::resolve_reference_token(pool, self.credentials.as_ref()).await?;
        let view = self.build_view(pool, &reference_token).await?;

        // keep the registration credential fresh before anything needs it
        let registration_token = credentials::ensure_registration_credential(
            pool,
            &reference_token,
            self.credentials.as_ref(),
            self.registry.as_ref(),
            &self.conventions,
            now,
        )
        .await?;

        // safety sweep first: workers may have been deleted, evicted, or may
        // have completed without the pool's consent
        let guard = DeregistrationGuard {
            store: self.store.as_ref(),
            registry: self.registry.as_ref(),
            conventions: &self.conventions,
        };
        guard
            .sweep(&pool.spec.scope, &registration_token, &view)
            .await?;

        if !view.in_sync() {
            info!(
                workers = view.pool_size(),
                registered = view.registered_count(),
                "Workers and registry not in sync, holding"
            );
            pool.status.set_condition(
                now,
                CONDITION_SYNCED,
                ConditionStatus::False,
                "OutOfSync",
                "registrations still settling",
            );
            return Ok(());
        }
        pool.status
            .set_condition(now, CONDITION_SYNCED, ConditionStatus::True, "InSync", "");

        if policy::should_grow(&view, &pool.spec) {
            self.grow(pool, &view).await?;
        } else if policy::should_shrink(&view, &pool.spec) {
            self.retire_one(pool, &view, &guard, &registration_token)
                .await?;
        }

        Ok(())
    }

    async fn build_view(
        &self,
        pool: &Pool,
        reference_token: &str,
    ) -> Result<PairingView, CoreError> {
        let selector = ListSelector {
            labels: self.conventions.ownership_labels(&pool.name),
        };
        let workers = self.store.list(&selector).await?;

        let entries = self
            .registry
            .list_entries(&pool.spec.scope, reference_token)
            .await?;
        // the scope is shared: only entries named after this pool's workers
        // belong to it
        let prefix = self.conventions.worker_name_prefix(&pool.name);
        let entries = entries
            .into_iter()
            .filter(|e| e.name.starts_with(&prefix))
            .collect();

        Ok(PairingView::new(workers, entries))
    }

    async fn grow(&self, pool: &mut Pool, view: &PairingView) -> Result<(), CoreError> {
        let amount = policy::growth_amount(view, &pool.spec);
        info!(amount, registered = view.registered_count(), "Scaling up");

        pool.status.current_size = view.pool_size() as i32;
        self.pools.update_status(pool).await?;

        for _ in 0..amount {
            let meta = WorkerMeta {
                generate_name: self.conventions.worker_name_prefix(&pool.name),
                labels: merge_labels(
                    &pool.spec.template.labels,
                    &self.conventions.ownership_labels(&pool.name),
                ),
                annotations: pool.spec.template.annotations.clone(),
                finalizers: vec![self.conventions.deregistration_marker.clone()],
            };
            let worker = self.store.create(&pool.spec.template, meta).await?;
            debug!(worker = %worker.name, "Created worker");
        }

        pool.status.current_size += amount as i32;
        self.pools.update_status(pool).await?;

        Ok(())
    }

    /// Retires at most one idle candidate. One per pass bounds the blast
    /// radius and lets the next pass re-evaluate busy state, which may have
    /// changed underneath us.
    async fn retire_one(
        &self,
        pool: &mut Pool,
        view: &PairingView,
        guard: &DeregistrationGuard<'_>,
        token: &str,
    ) -> Result<(), CoreError> {
        info!(
            registered = view.registered_count(),
            max_workers = pool.spec.max_workers,
            "Scaling down"
        );

        let now = Utc::now();
        let candidates = view.idle_candidates(now, pool.spec.min_ttl(), pool.spec.retirement_order);
        for pair in candidates {
            match guard.release(&pool.spec.scope, token, pair).await? {
                Release::Deferred => continue,
                Release::Cleared => {
                    ignore_not_found(self.store.delete(&pair.worker.name).await)?;
                    pool.status.current_size -= 1;
                    self.pools.update_status(pool).await?;
                    info!(worker = %pair.worker.name, "Retired idle worker");
                    return Ok(());
                }
            }
        }

        debug!("No retirement-eligible idle worker this pass");
        Ok(())
    }

    async fn manage_outcome(&self, pool: &mut Pool, issue: Option<CoreError>) -> PassOutcome {
        let now = Utc::now();
        let after = pool.spec.reconciliation_period();

        match issue {
            None => {
                pool.status.set_condition(
                    now,
                    CONDITION_READY,
                    ConditionStatus::True,
                    "ReconcileSuccess",
                    "",
                );
                if let Err(e) = self.pools.update_status(pool).await {
                    warn!(error = %e, "Failed to persist pool status");
                    return PassOutcome::Failed { after };
                }
                PassOutcome::Retry { after }
            }
            Some(error) => {
                warn!(error = %error, "Reconciliation pass failed");
                let reason = match &error {
                    CoreError::Validation(_) => "ValidationFailed",
                    _ => "ReconcileError",
                };
                pool.status.set_condition(
                    now,
                    CONDITION_READY,
                    ConditionStatus::False,
                    reason,
                    &error.to_string(),
                );
                if let Err(e) = self.pools.update_status(pool).await {
                    warn!(error = %e, "Failed to persist pool status");
                }
                PassOutcome::Failed { after }
            }
        }
    }
}
