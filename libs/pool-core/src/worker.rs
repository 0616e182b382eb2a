//! Worker instances and the template they are stamped from.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle phase of a worker resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WorkerPhase {
    Pending,
    Running,
    Succeeded,
    Failed,
    Terminating,
    Evicted,
}

impl WorkerPhase {
    /// True when the resource is leaving the pool, with or without consent.
    pub fn is_leaving(self) -> bool {
        matches!(self, Self::Terminating | Self::Evicted | Self::Succeeded)
    }
}

/// Template applied to every worker a pool creates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkerTemplate {
    #[serde(default)]
    pub labels: BTreeMap<String, String>,

    #[serde(default)]
    pub annotations: BTreeMap<String, String>,

    /// Opaque runtime payload handed through to the resource store.
    #[serde(default)]
    pub runtime: serde_json::Value,
}

/// A worker resource owned by a pool.
///
/// Identified by name; the name is also the join key against registry
/// entries. The deregistration marker lives in `finalizers`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerInstance {
    pub name: String,

    pub created_at: DateTime<Utc>,

    pub phase: WorkerPhase,

    #[serde(default)]
    pub labels: BTreeMap<String, String>,

    #[serde(default)]
    pub annotations: BTreeMap<String, String>,

    /// Markers blocking final removal until cleanup completes.
    #[serde(default)]
    pub finalizers: Vec<String>,
}

impl WorkerInstance {
    pub fn has_finalizer(&self, marker: &str) -> bool {
        self.finalizers.iter().any(|f| f == marker)
    }

    pub fn add_finalizer(&mut self, marker: &str) {
        if !self.has_finalizer(marker) {
            self.finalizers.push(marker.to_string());
        }
    }

    pub fn remove_finalizer(&mut self, marker: &str) {
        self.finalizers.retain(|f| f != marker);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn worker(phase: WorkerPhase) -> WorkerInstance {
        WorkerInstance {
            name: "w".to_string(),
            created_at: Utc::now(),
            phase,
            labels: BTreeMap::new(),
            annotations: BTreeMap::new(),
            finalizers: Vec::new(),
        }
    }

    #[test]
    fn finalizers_are_deduplicated() {
        let mut w = worker(WorkerPhase::Running);
        w.add_finalizer("a/b");
        w.add_finalizer("a/b");
        assert_eq!(w.finalizers.len(), 1);
        assert!(w.has_finalizer("a/b"));

        w.remove_finalizer("a/b");
        assert!(!w.has_finalizer("a/b"));
        assert!(w.finalizers.is_empty());
    }

    #[test]
    fn leaving_phases() {
        assert!(WorkerPhase::Terminating.is_leaving());
        assert!(WorkerPhase::Evicted.is_leaving());
        assert!(WorkerPhase::Succeeded.is_leaving());
        assert!(!WorkerPhase::Running.is_leaving());
        assert!(!WorkerPhase::Pending.is_leaving());
        assert!(!WorkerPhase::Failed.is_leaving());
    }
}
