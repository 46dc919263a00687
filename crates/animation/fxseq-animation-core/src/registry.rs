//! Canonical per-property values shared by every animation touching a key.
//!
//! Each `(target, path)` key holds the single value currently in effect. The
//! value is split into the last absolute value (`baseline`) and the sum of
//! relative deltas applied since (`relative_sum`), so an absolute writer and
//! any number of relative writers compose without overwriting each other:
//!
//! `canonical_value == baseline + relative_sum`
//!
//! The registry is mutated only from inside a scheduler tick; writes are
//! visible to later writers in the same tick.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::ids::{AnimationId, TargetId};
use crate::target::PropertyPath;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RegistryKey {
    pub target: TargetId,
    pub path: PropertyPath,
}

impl RegistryKey {
    pub fn new(target: TargetId, path: PropertyPath) -> Self {
        Self { target, path }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub canonical_value: f64,
    pub baseline: f64,
    pub relative_sum: f64,
    /// Absolute animation that last set the baseline.
    pub writer: Option<AnimationId>,
    #[serde(skip)]
    dirty: bool,
}

impl RegistryEntry {
    fn seeded(value: f64) -> Self {
        Self {
            canonical_value: value,
            baseline: value,
            relative_sum: 0.0,
            writer: None,
            dirty: false,
        }
    }
}

#[derive(Debug, Default)]
pub struct CoreValueRegistry {
    entries: HashMap<RegistryKey, RegistryEntry>,
}

impl CoreValueRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity),
        }
    }

    /// Canonical value for `key`, if any animation has touched it.
    #[inline]
    pub fn read(&self, key: &RegistryKey) -> Option<f64> {
        self.entries.get(key).map(|e| e.canonical_value)
    }

    /// Last absolute value (or the seeded live value) for `key`.
    #[inline]
    pub fn baseline(&self, key: &RegistryKey) -> Option<f64> {
        self.entries.get(key).map(|e| e.baseline)
    }

    #[inline]
    pub fn entry(&self, key: &RegistryKey) -> Option<&RegistryEntry> {
        self.entries.get(key)
    }

    #[inline]
    pub fn contains(&self, key: &RegistryKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Create the entry from the target's live value if it does not exist yet.
    /// Returns the canonical value in effect afterwards.
    pub fn seed(&mut self, key: &RegistryKey, live_value: f64) -> f64 {
        self.entries
            .entry(key.clone())
            .or_insert_with(|| RegistryEntry::seeded(live_value))
            .canonical_value
    }

    /// Fold accumulated relative deltas into the baseline. Called when a new
    /// absolute writer takes over a key.
    pub fn rebase(&mut self, key: &RegistryKey) {
        if let Some(e) = self.entries.get_mut(key) {
            e.baseline = e.canonical_value;
            e.relative_sum = 0.0;
        }
    }

    /// Absolute write: `value` becomes the baseline and relative deltas
    /// accumulated since the last rebase stay layered on top.
    pub fn write(&mut self, key: &RegistryKey, value: f64, writer: Option<AnimationId>) {
        let e = self
            .entries
            .entry(key.clone())
            .or_insert_with(|| RegistryEntry::seeded(value));
        e.baseline = value;
        e.canonical_value = value + e.relative_sum;
        e.writer = writer;
        e.dirty = true;
        log::trace!(
            "registry: {:?}/{} absolute {} by {:?}",
            key.target,
            key.path,
            e.canonical_value,
            writer
        );
    }

    /// Relative write: add `delta` on top of whatever is in effect.
    /// No-op on a key that was never seeded.
    pub fn add_delta(&mut self, key: &RegistryKey, delta: f64) {
        if let Some(e) = self.entries.get_mut(key) {
            e.relative_sum += delta;
            e.canonical_value += delta;
            e.dirty = true;
            log::trace!(
                "registry: {:?}/{} relative {:+} -> {}",
                key.target,
                key.path,
                delta,
                e.canonical_value
            );
        }
    }

    /// Drop `key` unless something still references it. Returns whether it was removed.
    pub fn evict_if_unreferenced(&mut self, key: &RegistryKey, referenced: bool) -> bool {
        if referenced {
            return false;
        }
        self.entries.remove(key).is_some()
    }

    /// Evict every key for which `is_referenced` returns false.
    pub fn retain_referenced(&mut self, mut is_referenced: impl FnMut(&RegistryKey) -> bool) {
        self.entries.retain(|k, _| is_referenced(k));
    }

    /// Keys written since the last drain with their final value, in key order.
    pub fn drain_dirty(&mut self) -> Vec<(RegistryKey, f64)> {
        let mut out: Vec<(RegistryKey, f64)> = self
            .entries
            .iter_mut()
            .filter(|(_, e)| e.dirty)
            .map(|(k, e)| {
                e.dirty = false;
                (k.clone(), e.canonical_value)
            })
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    pub fn keys(&self) -> impl Iterator<Item = &RegistryKey> {
        self.entries.keys()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(path: &str) -> RegistryKey {
        RegistryKey::new(TargetId(1), PropertyPath::parse(path).unwrap())
    }

    #[test]
    fn seed_is_lazy_and_once() {
        let mut reg = CoreValueRegistry::new();
        let k = key("alpha");
        assert_eq!(reg.read(&k), None);
        assert_eq!(reg.seed(&k, 0.5), 0.5);
        assert_eq!(reg.seed(&k, 0.9), 0.5);
    }

    #[test]
    fn relative_writers_compose_additively_within_a_frame() {
        let mut reg = CoreValueRegistry::new();
        let k = key("rotation");
        reg.seed(&k, 10.0);
        reg.add_delta(&k, 5.0);
        reg.add_delta(&k, -2.0);
        assert_eq!(reg.read(&k), Some(13.0));
        assert_eq!(reg.baseline(&k), Some(10.0));
    }

    #[test]
    fn absolute_write_keeps_relative_layer() {
        let mut reg = CoreValueRegistry::new();
        let k = key("scale.x");
        reg.seed(&k, 1.0);
        reg.rebase(&k);
        reg.add_delta(&k, 0.25);
        reg.write(&k, 2.0, Some(AnimationId(7)));
        assert_eq!(reg.read(&k), Some(2.25));
        assert_eq!(reg.entry(&k).unwrap().writer, Some(AnimationId(7)));
        reg.rebase(&k);
        reg.write(&k, 3.0, Some(AnimationId(8)));
        assert_eq!(reg.read(&k), Some(3.0));
    }

    #[test]
    fn drain_reports_each_dirty_key_once() {
        let mut reg = CoreValueRegistry::new();
        let a = key("alpha");
        let b = key("scale.x");
        reg.seed(&a, 0.0);
        reg.seed(&b, 1.0);
        reg.add_delta(&a, 0.1);
        reg.add_delta(&a, 0.1);
        let drained = reg.drain_dirty();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].0, a);
        assert!(reg.drain_dirty().is_empty());
    }

    #[test]
    fn eviction() {
        let mut reg = CoreValueRegistry::new();
        let a = key("alpha");
        reg.seed(&a, 0.0);
        assert!(!reg.evict_if_unreferenced(&a, true));
        assert!(reg.evict_if_unreferenced(&a, false));
        assert!(reg.is_empty());
    }
}
