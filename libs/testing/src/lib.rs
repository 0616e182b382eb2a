//! In-memory collaborator implementations.
//!
//! Deterministic doubles for every contract the engine consumes, used by the
//! core's pass-level tests and by the controller in local development. The
//! resource store emulates the platform's finalizer semantics: a delete
//! while a marker is present parks the worker in `Terminating`, and removal
//! only completes once the last marker is cleared.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Duration, Utc};

use forgepool_core::{
    CredentialRecord, CredentialStore, ListSelector, MintedCredential, Pool, PoolStore,
    RegistryApi, RegistryEntry, RegistryError, ResourceStore, StoreError, WorkerInstance,
    WorkerMeta, WorkerPhase, WorkerTemplate,
};

/// Pool resources held in a map, status updates applied in place.
#[derive(Default)]
pub struct MemoryPoolStore {
    pools: Mutex<BTreeMap<String, Pool>>,
}

impl MemoryPoolStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, pool: Pool) {
        self.pools.lock().unwrap().insert(pool.name.clone(), pool);
    }

    pub fn remove(&self, name: &str) {
        self.pools.lock().unwrap().remove(name);
    }

    pub fn snapshot(&self, name: &str) -> Option<Pool> {
        self.pools.lock().unwrap().get(name).cloned()
    }
}

#[async_trait]
impl PoolStore for MemoryPoolStore {
    async fn get(&self, name: &str) -> Result<Option<Pool>, StoreError> {
        Ok(self.pools.lock().unwrap().get(name).cloned())
    }

    async fn update_status(&self, pool: &Pool) -> Result<(), StoreError> {
        let mut pools = self.pools.lock().unwrap();
        match pools.get_mut(&pool.name) {
            Some(stored) => {
                stored.status = pool.status.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(pool.name.clone())),
        }
    }

    async fn list_names(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.pools.lock().unwrap().keys().cloned().collect())
    }
}

/// Worker resources held in a map, with finalizer-aware delete semantics and
/// mutation counters for idempotence assertions.
#[derive(Default)]
pub struct MemoryResourceStore {
    workers: Mutex<BTreeMap<String, WorkerInstance>>,
    name_counter: AtomicU64,
    created: AtomicU64,
    updated: AtomicU64,
    deleted: AtomicU64,
}

impl MemoryResourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, worker: WorkerInstance) {
        self.workers
            .lock()
            .unwrap()
            .insert(worker.name.clone(), worker);
    }

    pub fn get(&self, name: &str) -> Option<WorkerInstance> {
        self.workers.lock().unwrap().get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.workers.lock().unwrap().keys().cloned().collect()
    }

    pub fn set_phase(&self, name: &str, phase: WorkerPhase) {
        if let Some(worker) = self.workers.lock().unwrap().get_mut(name) {
            worker.phase = phase;
        }
    }

    pub fn created_count(&self) -> u64 {
        self.created.load(Ordering::SeqCst)
    }

    pub fn updated_count(&self) -> u64 {
        self.updated.load(Ordering::SeqCst)
    }

    pub fn deleted_count(&self) -> u64 {
        self.deleted.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ResourceStore for MemoryResourceStore {
    async fn list(&self, selector: &ListSelector) -> Result<Vec<WorkerInstance>, StoreError> {
        let workers = self.workers.lock().unwrap();
        Ok(workers
            .values()
            .filter(|w| {
                selector
                    .labels
                    .iter()
                    .all(|(k, v)| w.labels.get(k) == Some(v))
            })
            .cloned()
            .collect())
    }

    async fn create(
        &self,
        _template: &WorkerTemplate,
        meta: WorkerMeta,
    ) -> Result<WorkerInstance, StoreError> {
        let mut workers = self.workers.lock().unwrap();
        let name = loop {
            let n = self.name_counter.fetch_add(1, Ordering::SeqCst);
            let candidate = format!("{}{n:05}", meta.generate_name);
            if !workers.contains_key(&candidate) {
                break candidate;
            }
        };
        let worker = WorkerInstance {
            name,
            created_at: Utc::now(),
            phase: WorkerPhase::Pending,
            labels: meta.labels,
            annotations: meta.annotations,
            finalizers: meta.finalizers,
        };
        workers.insert(worker.name.clone(), worker.clone());
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(worker)
    }

    async fn update(&self, worker: &WorkerInstance) -> Result<(), StoreError> {
        let mut workers = self.workers.lock().unwrap();
        if !workers.contains_key(&worker.name) {
            return Err(StoreError::NotFound(worker.name.clone()));
        }
        self.updated.fetch_add(1, Ordering::SeqCst);
        // a terminating worker with no markers left is collected immediately
        if worker.phase == WorkerPhase::Terminating && worker.finalizers.is_empty() {
            workers.remove(&worker.name);
        } else {
            workers.insert(worker.name.clone(), worker.clone());
        }
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<(), StoreError> {
        let mut workers = self.workers.lock().unwrap();
        let Some(worker) = workers.get_mut(name) else {
            return Err(StoreError::NotFound(name.to_string()));
        };
        self.deleted.fetch_add(1, Ordering::SeqCst);
        if worker.finalizers.is_empty() {
            workers.remove(name);
        } else {
            worker.phase = WorkerPhase::Terminating;
        }
        Ok(())
    }
}

/// Credential records held in a map.
#[derive(Default)]
pub struct MemoryCredentialStore {
    records: Mutex<BTreeMap<String, CredentialRecord>>,
    puts: AtomicU64,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, key: &str, record: CredentialRecord) {
        self.records
            .lock()
            .unwrap()
            .insert(key.to_string(), record);
    }

    pub fn record(&self, key: &str) -> Option<CredentialRecord> {
        self.records.lock().unwrap().get(key).cloned()
    }

    pub fn put_count(&self) -> u64 {
        self.puts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn get(&self, key: &str) -> Result<Option<CredentialRecord>, StoreError> {
        Ok(self.records.lock().unwrap().get(key).cloned())
    }

    async fn put(&self, key: &str, record: CredentialRecord) -> Result<(), StoreError> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.records
            .lock()
            .unwrap()
            .insert(key.to_string(), record);
        Ok(())
    }
}

/// Scriptable registry double.
///
/// Entries are seeded by tests; deregistration removes them unless the id
/// was marked as rejected, which mimics an entry still executing a job.
#[derive(Default)]
pub struct FakeRegistry {
    entries: Mutex<Vec<RegistryEntry>>,
    rejected: Mutex<Vec<i64>>,
    deregistered: Mutex<Vec<i64>>,
    mints: AtomicU64,
    token_ttl_secs: i64,
}

impl FakeRegistry {
    pub fn new() -> Self {
        Self {
            token_ttl_secs: 3600,
            ..Self::default()
        }
    }

    pub fn with_token_ttl_secs(mut self, secs: i64) -> Self {
        self.token_ttl_secs = secs;
        self
    }

    pub fn seed_entry(&self, entry: RegistryEntry) {
        self.entries.lock().unwrap().push(entry);
    }

    /// Marks an entry id as refusing deregistration.
    pub fn reject_deregistration(&self, id: i64) {
        self.rejected.lock().unwrap().push(id);
    }

    pub fn entries(&self) -> Vec<RegistryEntry> {
        self.entries.lock().unwrap().clone()
    }

    /// Ids successfully deregistered, in call order.
    pub fn deregistered(&self) -> Vec<i64> {
        self.deregistered.lock().unwrap().clone()
    }

    pub fn mint_count(&self) -> u64 {
        self.mints.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RegistryApi for FakeRegistry {
    async fn list_entries(
        &self,
        _scope: &str,
        _token: &str,
    ) -> Result<Vec<RegistryEntry>, RegistryError> {
        Ok(self.entries.lock().unwrap().clone())
    }

    async fn deregister(&self, _scope: &str, _token: &str, id: i64) -> Result<(), RegistryError> {
        if self.rejected.lock().unwrap().contains(&id) {
            return Err(RegistryError::Rejected(format!(
                "entry {id} is executing a job"
            )));
        }
        self.entries.lock().unwrap().retain(|e| e.id != Some(id));
        self.deregistered.lock().unwrap().push(id);
        Ok(())
    }

    async fn mint_credential(
        &self,
        _scope: &str,
        _reference_token: &str,
    ) -> Result<MintedCredential, RegistryError> {
        let n = self.mints.fetch_add(1, Ordering::SeqCst);
        Ok(MintedCredential {
            token: format!("registration-token-{n}"),
            expires_at: Utc::now() + Duration::seconds(self.token_ttl_secs),
        })
    }
}
