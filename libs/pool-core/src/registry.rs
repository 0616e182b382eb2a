//! Registry collaborator contract.
//!
//! Entries are owned by the external job-dispatch registry; the engine never
//! creates them directly. It requests creation indirectly by handing new
//! workers a registration credential, and removes entries through explicit
//! deregistration calls. The engine only depends on this capability, never
//! on a concrete client.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// External record of a registered, possibly busy, job executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEntry {
    /// Expected to match the name of the worker instance it corresponds to.
    pub name: String,

    /// Registry-assigned identity. Absent while registration is settling.
    pub id: Option<i64>,

    /// Whether the executor is currently running a job.
    #[serde(default)]
    pub busy: bool,
}

/// A short-lived registration credential minted by the registry.
#[derive(Debug, Clone)]
pub struct MintedCredential {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Registry call failures.
///
/// The engine cannot distinguish "entry still executing a job" from
/// "permanently rejected"; deregistration treats both by deferring to the
/// next pass.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("registry rejected the request: {0}")]
    Rejected(String),

    #[error("registry unavailable: {0}")]
    Unavailable(String),
}

/// Capability contract for the job-dispatch registry.
#[async_trait]
pub trait RegistryApi: Send + Sync {
    /// Lists every entry registered under the scope.
    async fn list_entries(
        &self,
        scope: &str,
        token: &str,
    ) -> Result<Vec<RegistryEntry>, RegistryError>;

    /// Removes one entry by its registry-assigned identity.
    async fn deregister(&self, scope: &str, token: &str, id: i64) -> Result<(), RegistryError>;

    /// Exchanges the long-lived reference credential for a short-lived
    /// registration credential.
    async fn mint_credential(
        &self,
        scope: &str,
        reference_token: &str,
    ) -> Result<MintedCredential, RegistryError>;
}
