//! Scaling decisions.
//!
//! Pure functions over a pairing view and a pool spec: no side effects, no
//! I/O, deterministic given the same inputs. Growth and shrink are mutually
//! exclusive within a pass — the orchestrator evaluates growth first.

use crate::pairing::PairingView;
use crate::pool::PoolSpec;

/// A pool grows when it is under its minimum, or saturated while still under
/// its maximum.
pub fn should_grow(view: &PairingView, spec: &PoolSpec) -> bool {
    view.registered_count() < spec.min_workers as usize
        || (view.all_busy() && view.registered_count() < spec.max_workers as usize)
}

/// A pool shrinks when it is over its maximum, or a second idle worker
/// appears above the minimum. The `> 1` threshold is deliberate: one idle
/// worker is kept as a warm standby, and only the second triggers a retire.
pub fn should_shrink(view: &PairingView, spec: &PoolSpec) -> bool {
    view.registered_count() > spec.max_workers as usize
        || (view.idle_count() > 1 && view.registered_count() > spec.min_workers as usize)
}

/// How many workers to create when growing: the deficit against the minimum,
/// but never fewer than one when growth was triggered by saturation rather
/// than deficit.
pub fn growth_amount(view: &PairingView, spec: &PoolSpec) -> usize {
    (spec.min_workers as i64 - view.registered_count() as i64).max(1) as usize
}
