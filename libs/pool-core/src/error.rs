//! Error types surfaced by a reconciliation pass.

use thiserror::Error;

use crate::pool::SpecError;
use crate::registry::RegistryError;
use crate::store::StoreError;

/// Everything a pass can fail with.
///
/// None of these are fatal to the surrounding process: the orchestrator maps
/// every variant to a status condition plus a fixed-period retry.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The pool spec violates a declared invariant.
    #[error(transparent)]
    Validation(#[from] SpecError),

    /// A resource or credential store call failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A registry call failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// The credential material referenced by the pool is unusable.
    #[error("credential error: {0}")]
    Credential(String),
}
