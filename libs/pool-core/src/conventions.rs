//! Naming conventions stamped onto everything a pool owns.
//!
//! The engine takes these as an explicit value handed to the orchestrator at
//! construction, so embedders can namespace markers and keys without
//! touching decision logic.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conventions {
    /// Label carrying the owning pool's name.
    pub pool_label: String,

    /// Marker blocking worker deletion until registry cleanup completes.
    pub deregistration_marker: String,

    /// Key the registration token is stored under in the credential record.
    pub token_key: String,

    /// Annotation holding the token expiry as a unix epoch.
    pub expiry_annotation: String,

    /// Suffix of the per-pool credential storage key.
    pub credential_suffix: String,
}

impl Default for Conventions {
    fn default() -> Self {
        Self {
            pool_label: "forgepool.io/pool".to_string(),
            deregistration_marker: "forgepool.io/registration".to_string(),
            token_key: "REGISTRATION_TOKEN".to_string(),
            expiry_annotation: "forgepool.io/token-expiry".to_string(),
            credential_suffix: "regtoken".to_string(),
        }
    }
}

impl Conventions {
    /// Deterministic storage key for a pool's registration credential.
    pub fn credential_key(&self, pool: &str) -> String {
        format!("{}-{}", pool, self.credential_suffix)
    }

    /// Name prefix workers are generated from. Doubles as the filter that
    /// scopes registry entries to the pool.
    pub fn worker_name_prefix(&self, pool: &str) -> String {
        format!("{pool}-worker-")
    }

    /// Ownership labels stamped on owned workers and credential records.
    pub fn ownership_labels(&self, pool: &str) -> BTreeMap<String, String> {
        BTreeMap::from([(self.pool_label.clone(), pool.to_string())])
    }
}

/// Merges two label maps into a new one. Total and order-independent in its
/// inputs: `overlay` wins on key collisions, neither argument is mutated.
pub fn merge_labels(
    base: &BTreeMap<String, String>,
    overlay: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let mut merged = base.clone();
    merged.extend(overlay.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged
}
