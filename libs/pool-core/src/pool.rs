//! Pool specification, identity, and validation.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::status::PoolStatus;
use crate::worker::WorkerTemplate;

/// Reconciliation period used when the spec does not set one.
pub const DEFAULT_RECONCILIATION_PERIOD: Duration = Duration::from_secs(60);

/// Which end of the age range retirement drains first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RetirementOrder {
    /// Retire the longest-lived idle worker first.
    #[default]
    OldestFirst,
    /// Retire the most recently created idle worker first.
    NewestFirst,
}

/// Reference to the long-lived registry credential in the credential store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRef {
    /// Record name in the credential store.
    pub name: String,
    /// Key within the record's data map holding the token.
    pub key: String,
}

/// Spec invariant violations.
///
/// Recorded as a status condition and retried at the normal period, never
/// fatal: the operator may fix the spec in place.
#[derive(Debug, Error)]
pub enum SpecError {
    #[error("max_workers ({max}) must be greater or equal to min_workers ({min})")]
    SizeBandInverted { min: u32, max: u32 },
}

/// Operator-declared desired state for one worker pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolSpec {
    /// Registry scope (organization) the pool's workers register under.
    pub scope: String,

    /// Minimum pool size. At zero workers jobs are unschedulable, so one is
    /// the useful floor.
    pub min_workers: u32,

    /// Maximum pool size. Must be greater or equal to `min_workers`.
    pub max_workers: u32,

    /// Template applied to every worker the pool creates.
    #[serde(default)]
    pub template: WorkerTemplate,

    /// Where to find the long-lived credential used against the registry.
    pub credential_ref: CredentialRef,

    /// Seconds between reconciliation passes. Defaults to 60.
    #[serde(default)]
    pub reconciliation_period_secs: Option<u64>,

    /// Minimum age in seconds before a worker is retirement-eligible.
    #[serde(default)]
    pub min_ttl_secs: u64,

    /// Which idle worker to retire first when shrinking.
    #[serde(default)]
    pub retirement_order: RetirementOrder,
}

impl PoolSpec {
    /// Validates invariants not covered by the schema itself.
    pub fn validate(&self) -> Result<(), SpecError> {
        if self.max_workers < self.min_workers {
            return Err(SpecError::SizeBandInverted {
                min: self.min_workers,
                max: self.max_workers,
            });
        }
        Ok(())
    }

    /// Returns the reconciliation period, falling back to the default.
    pub fn reconciliation_period(&self) -> Duration {
        self.reconciliation_period_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_RECONCILIATION_PERIOD)
    }

    /// Returns the retirement-eligibility floor.
    pub fn min_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.min_ttl_secs as i64)
    }
}

/// A pool resource: identity, declared spec, observed status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pool {
    pub name: String,

    pub spec: PoolSpec,

    #[serde(default)]
    pub status: PoolStatus,
}
