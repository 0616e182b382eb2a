//! Pool reconciliation engine.
//!
//! forgepool keeps a band of ephemeral CI workers registered against an
//! external job-dispatch registry. This crate is the engine: it pairs owned
//! worker instances with their registry entries, decides whether the pool
//! grows, shrinks, or holds, selects which idle worker to retire, and
//! guarantees a worker is deregistered from the registry before its
//! underlying resource is destroyed.
//!
//! # Invariants
//!
//! - Scaling decisions are pure functions of a [`PairingView`] and a
//!   [`PoolSpec`]; they never perform I/O.
//! - A worker carrying the deregistration marker is never deleted before a
//!   successful (or skipped-because-already-absent) deregistration call.
//! - At most one reconciliation pass runs per pool at a time; all external
//!   effects go through the collaborator traits in [`store`] and
//!   [`registry`].

pub mod conventions;
pub mod credentials;
pub mod error;
pub mod guard;
pub mod orchestrator;
pub mod pairing;
pub mod policy;
pub mod pool;
pub mod registry;
pub mod status;
pub mod store;
pub mod worker;

pub use conventions::{merge_labels, Conventions};
pub use error::CoreError;
pub use guard::{DeregistrationGuard, Release};
pub use orchestrator::{Orchestrator, PassOutcome};
pub use pairing::{PairedWorker, PairingView};
pub use pool::{CredentialRef, Pool, PoolSpec, RetirementOrder, SpecError};
pub use registry::{MintedCredential, RegistryApi, RegistryEntry, RegistryError};
pub use status::{Condition, ConditionStatus, PoolStatus};
pub use store::{
    CredentialRecord, CredentialStore, ListSelector, PoolStore, ResourceStore, StoreError,
    WorkerMeta,
};
pub use worker::{WorkerInstance, WorkerPhase, WorkerTemplate};
