//! Observed pool state: worker count plus a typed condition history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Condition type for overall pass health.
pub const CONDITION_READY: &str = "Ready";

/// Condition type tracking whether workers and registry entries agree.
pub const CONDITION_SYNCED: &str = "Synced";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

/// A single typed condition. At most one live condition exists per type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    #[serde(rename = "type")]
    pub condition_type: String,
    pub status: ConditionStatus,
    pub reason: String,
    pub message: String,
    pub last_transition_time: DateTime<Utc>,
}

/// Observed state of a pool. Mutated only by the orchestrator after each
/// pass; the serialized pass model makes the read-then-write safe.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStatus {
    /// The current size of the worker pool as last observed.
    pub current_size: i32,

    #[serde(default)]
    pub conditions: Vec<Condition>,
}

impl PoolStatus {
    /// Upserts the condition of the given type. The transition timestamp
    /// only moves when the status value actually flips.
    pub fn set_condition(
        &mut self,
        now: DateTime<Utc>,
        condition_type: &str,
        status: ConditionStatus,
        reason: &str,
        message: &str,
    ) {
        match self
            .conditions
            .iter_mut()
            .find(|c| c.condition_type == condition_type)
        {
            Some(existing) => {
                if existing.status != status {
                    existing.last_transition_time = now;
                }
                existing.status = status;
                existing.reason = reason.to_string();
                existing.message = message.to_string();
            }
            None => self.conditions.push(Condition {
                condition_type: condition_type.to_string(),
                status,
                reason: reason.to_string(),
                message: message.to_string(),
                last_transition_time: now,
            }),
        }
    }

    pub fn condition(&self, condition_type: &str) -> Option<&Condition> {
        self.conditions
            .iter()
            .find(|c| c.condition_type == condition_type)
    }
}
