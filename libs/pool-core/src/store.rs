//! Storage collaborator contracts: worker resources, credentials, pools.
//!
//! The engine drives these as blocking suspension points within a pass; the
//! storage and watch machinery behind them lives outside this crate.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pool::Pool;
use crate::worker::{WorkerInstance, WorkerTemplate};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Label-based selector for listing pool-owned workers.
#[derive(Debug, Clone, Default)]
pub struct ListSelector {
    pub labels: BTreeMap<String, String>,
}

/// Metadata stamped onto a worker at creation time.
#[derive(Debug, Clone)]
pub struct WorkerMeta {
    /// Prefix the store derives the unique worker name from.
    pub generate_name: String,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
    pub finalizers: Vec<String>,
}

/// A secret-like record holding credential material.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
    #[serde(default)]
    pub data: BTreeMap<String, String>,

    #[serde(default)]
    pub annotations: BTreeMap<String, String>,

    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

/// Worker-resource CRUD.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    async fn list(&self, selector: &ListSelector) -> Result<Vec<WorkerInstance>, StoreError>;

    /// Create-or-update keyed by the generated name.
    async fn create(
        &self,
        template: &WorkerTemplate,
        meta: WorkerMeta,
    ) -> Result<WorkerInstance, StoreError>;

    async fn update(&self, worker: &WorkerInstance) -> Result<(), StoreError>;

    /// Deleting an absent worker reports [`StoreError::NotFound`]; callers
    /// treat that as done via [`ignore_not_found`].
    async fn delete(&self, name: &str) -> Result<(), StoreError>;
}

/// Keyed credential records.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<CredentialRecord>, StoreError>;

    async fn put(&self, key: &str, record: CredentialRecord) -> Result<(), StoreError>;
}

/// Access to pool resources themselves.
#[async_trait]
pub trait PoolStore: Send + Sync {
    async fn get(&self, name: &str) -> Result<Option<Pool>, StoreError>;

    async fn update_status(&self, pool: &Pool) -> Result<(), StoreError>;

    async fn list_names(&self) -> Result<Vec<String>, StoreError>;
}

/// Collapses `NotFound` into success for idempotent deletes.
pub fn ignore_not_found(result: Result<(), StoreError>) -> Result<(), StoreError> {
    match result {
        Err(StoreError::NotFound(_)) => Ok(()),
        other => other,
    }
}
