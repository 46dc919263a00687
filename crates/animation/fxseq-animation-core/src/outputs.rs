//! Per-tick output contract of the scheduler.
//!
//! Outputs carry the property writes applied this tick (one per key), the
//! batches retired, and targets that went stale. Hosts use them for logging,
//! replication, or tests; the writes themselves already happened through the
//! [`crate::TargetStore`].

use serde::{Deserialize, Serialize};

use crate::ids::{AnimationId, BatchId, OriginId, TargetId};
use crate::target::PropertyPath;

/// One property written this tick.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Change {
    pub target: TargetId,
    pub path: PropertyPath,
    pub value: f64,
}

/// A batch whose animations all completed this tick.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetiredBatch {
    pub batch: BatchId,
    pub origin: OriginId,
}

/// An animation dropped because its target no longer resolves.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaleTargetEvent {
    pub origin: OriginId,
    pub animation: Option<AnimationId>,
    pub target: TargetId,
    pub path: PropertyPath,
}

/// Outputs returned by `AnimationScheduler::tick()`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TickOutputs {
    #[serde(default)]
    pub changes: Vec<Change>,
    #[serde(default)]
    pub retired: Vec<RetiredBatch>,
    #[serde(default)]
    pub stale: Vec<StaleTargetEvent>,
}

impl TickOutputs {
    #[inline]
    pub fn clear(&mut self) {
        self.changes.clear();
        self.retired.clear();
        self.stale.clear();
    }

    #[inline]
    pub fn push_change(&mut self, change: Change) {
        self.changes.push(change);
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty() && self.retired.is_empty() && self.stale.is_empty()
    }

    /// Value written to `(target, path)` this tick, if any.
    pub fn value_of(&self, target: TargetId, path: &str) -> Option<f64> {
        self.changes
            .iter()
            .find(|c| c.target == target && c.path.as_str() == path)
            .map(|c| c.value)
    }

    /// Whether a batch owned by `origin` retired this tick.
    pub fn retired_origin(&self, origin: OriginId) -> bool {
        self.retired.iter().any(|r| r.origin == origin)
    }
}
