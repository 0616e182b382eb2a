//! Deregistration-guard tests driven against in-memory collaborators.
//!
//! These live as an integration test rather than an in-module `#[cfg(test)]`
//! block so they link against the same `forgepool-core` instance as
//! `forgepool-testing`; a dev-dependency cycle would otherwise compile two
//! distinct copies of the crate's types.

use std::collections::BTreeMap;

use chrono::Utc;

use forgepool_core::{
    Conventions, DeregistrationGuard, PairedWorker, PairingView, RegistryEntry, Release,
    WorkerInstance, WorkerPhase,
};
use forgepool_testing::{FakeRegistry, MemoryResourceStore};

fn conventions() -> Conventions {
    Conventions::default()
}

fn marked_worker(name: &str, phase: WorkerPhase, conv: &Conventions) -> WorkerInstance {
    WorkerInstance {
        name: name.to_string(),
        created_at: Utc::now(),
        phase,
        labels: BTreeMap::new(),
        annotations: BTreeMap::new(),
        finalizers: vec![conv.deregistration_marker.clone()],
    }
}

fn pair(worker: WorkerInstance, entry: Option<RegistryEntry>) -> PairedWorker {
    PairedWorker { worker, entry }
}

#[tokio::test]
async fn unmarked_worker_is_immediately_deletable() {
    let conv = conventions();
    let store = MemoryResourceStore::new();
    let registry = FakeRegistry::new();
    let guard = DeregistrationGuard {
        store: &store,
        registry: &registry,
        conventions: &conv,
    };

    let mut worker = marked_worker("w1", WorkerPhase::Running, &conv);
    worker.finalizers.clear();

    let release = guard
        .release("acme", "tok", &pair(worker, None))
        .await
        .unwrap();
    assert_eq!(release, Release::Cleared);
    assert!(registry.deregistered().is_empty());
}

#[tokio::test]
async fn missing_identity_skips_the_registry_call() {
    let conv = conventions();
    let store = MemoryResourceStore::new();
    let registry = FakeRegistry::new();
    let guard = DeregistrationGuard {
        store: &store,
        registry: &registry,
        conventions: &conv,
    };

    let worker = marked_worker("w1", WorkerPhase::Running, &conv);
    store.seed(worker.clone());

    let entry = RegistryEntry {
        name: "w1".to_string(),
        id: None,
        busy: false,
    };
    let release = guard
        .release("acme", "tok", &pair(worker, Some(entry)))
        .await
        .unwrap();

    assert_eq!(release, Release::Cleared);
    assert!(registry.deregistered().is_empty());
    let updated = store.get("w1").unwrap();
    assert!(updated.finalizers.is_empty());
}

#[tokio::test]
async fn refused_deregistration_defers_and_keeps_the_marker() {
    let conv = conventions();
    let store = MemoryResourceStore::new();
    let registry = FakeRegistry::new();
    registry.reject_deregistration(7);
    let guard = DeregistrationGuard {
        store: &store,
        registry: &registry,
        conventions: &conv,
    };

    let worker = marked_worker("w1", WorkerPhase::Running, &conv);
    store.seed(worker.clone());

    let entry = RegistryEntry {
        name: "w1".to_string(),
        id: Some(7),
        busy: true,
    };
    let release = guard
        .release("acme", "tok", &pair(worker, Some(entry)))
        .await
        .unwrap();

    assert_eq!(release, Release::Deferred);
    let kept = store.get("w1").unwrap();
    assert!(kept.has_finalizer(&conv.deregistration_marker));
}

#[tokio::test]
async fn sweep_reaps_completed_workers() {
    let conv = conventions();
    let store = MemoryResourceStore::new();
    let registry = FakeRegistry::new();
    let guard = DeregistrationGuard {
        store: &store,
        registry: &registry,
        conventions: &conv,
    };

    let worker = marked_worker("w1", WorkerPhase::Succeeded, &conv);
    store.seed(worker.clone());
    registry.seed_entry(RegistryEntry {
        name: "w1".to_string(),
        id: Some(3),
        busy: false,
    });

    let view = PairingView::new(vec![worker], registry.entries());
    guard.sweep("acme", "tok", &view).await.unwrap();

    assert_eq!(registry.deregistered(), vec![3]);
    assert!(store.get("w1").is_none());
}
