//! Tick-driven evaluation of animation batches.
//!
//! `tick(dt)` pipeline:
//! 1. order batches by outstanding absolute animations (most first, stable)
//! 2. advance each batch, evaluate due animations, compose into the registry
//! 3. write each dirty key to its target once
//! 4. retire finished batches, evict unreferenced keys, go idle when empty

use std::cmp::Reverse;

use hashbrown::HashSet;
use log::{debug, trace, warn};

use crate::animation::{AnimationState, CompositionMode, PropertyAnimation};
use crate::completion::{completion_pair, CompletionHandle, CompletionSource};
use crate::config::Config;
use crate::ids::{BatchId, IdAllocator, OriginId};
use crate::outputs::{Change, RetiredBatch, StaleTargetEvent, TickOutputs};
use crate::registry::{CoreValueRegistry, RegistryKey};
use crate::target::TargetStore;

/// Animations submitted together under one owning effect.
#[derive(Clone, Debug)]
pub struct AnimationBatch {
    pub origin: OriginId,
    pub animations: Vec<PropertyAnimation>,
    elapsed_total: f64,
}

impl AnimationBatch {
    pub fn new(origin: OriginId) -> Self {
        Self {
            origin,
            animations: Vec::new(),
            elapsed_total: 0.0,
        }
    }

    pub fn with_animations(origin: OriginId, animations: Vec<PropertyAnimation>) -> Self {
        Self {
            origin,
            animations,
            elapsed_total: 0.0,
        }
    }

    pub fn push(&mut self, animation: PropertyAnimation) {
        self.animations.push(animation);
    }

    /// Start every animation `offset` ms into its own timeline.
    pub fn with_catch_up(mut self, offset: f64) -> Self {
        let offset = if offset.is_finite() { offset.max(0.0) } else { 0.0 };
        for a in &mut self.animations {
            a.timing.elapsed_before_start = offset;
        }
        self
    }

    /// Wall time since submission, in ms.
    #[inline]
    pub fn elapsed_total(&self) -> f64 {
        self.elapsed_total
    }

    pub fn len(&self) -> usize {
        self.animations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.animations.is_empty()
    }

    /// Every animation reached `Complete`. Trivially true for an empty batch.
    pub fn is_complete(&self) -> bool {
        self.animations.iter().all(PropertyAnimation::is_complete)
    }

    fn outstanding_absolute(&self) -> usize {
        self.animations
            .iter()
            .filter(|a| a.is_absolute() && !a.is_complete())
            .count()
    }
}

struct ActiveBatch {
    id: BatchId,
    batch: AnimationBatch,
    completion: CompletionSource<()>,
}

/// Owns the active batches and the value registry for one scene.
pub struct AnimationScheduler {
    config: Config,
    ids: IdAllocator,
    active: Vec<ActiveBatch>,
    registry: CoreValueRegistry,
    outputs: TickOutputs,
    running: bool,
}

impl Default for AnimationScheduler {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl AnimationScheduler {
    pub fn new(config: Config) -> Self {
        Self {
            ids: IdAllocator::new(),
            active: Vec::with_capacity(config.batch_capacity),
            registry: CoreValueRegistry::with_capacity(config.registry_capacity),
            outputs: TickOutputs::default(),
            running: false,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &CoreValueRegistry {
        &self.registry
    }

    /// Outputs of the most recent tick.
    pub fn outputs(&self) -> &TickOutputs {
        &self.outputs
    }

    pub fn active_batches(&self) -> usize {
        self.active.len()
    }

    pub fn batches(&self) -> impl Iterator<Item = &AnimationBatch> {
        self.active.iter().map(|a| &a.batch)
    }

    pub fn has_origin(&self, origin: OriginId) -> bool {
        self.active.iter().any(|a| a.batch.origin == origin)
    }

    #[inline]
    pub fn is_idle(&self) -> bool {
        !self.running
    }

    /// Mark the tick loop as running. Idempotent.
    pub fn start_tick_loop(&mut self) {
        if !self.running {
            self.running = true;
            debug!("scheduler: tick loop started");
        }
    }

    /// Enqueue `batch`; the returned handle resolves once every animation in
    /// it completes, and is abandoned if the batch is cancelled.
    pub fn submit(&mut self, mut batch: AnimationBatch) -> CompletionHandle {
        for a in &mut batch.animations {
            a.assign_id(self.ids.alloc_animation());
        }
        let id = self.ids.alloc_batch();
        let (completion, handle) = completion_pair();
        debug!(
            "scheduler: submit {:?} origin={} animations={}",
            id,
            batch.origin,
            batch.animations.len()
        );
        self.active.push(ActiveBatch {
            id,
            batch,
            completion,
        });
        self.start_tick_loop();
        handle
    }

    /// Remove every batch owned by `origin`. Their handles are abandoned,
    /// never resolved. Returns the number of batches removed.
    pub fn cancel(&mut self, origin: OriginId) -> usize {
        let before = self.active.len();
        self.active.retain(|a| a.batch.origin != origin);
        let removed = before - self.active.len();
        if removed > 0 {
            debug!("scheduler: cancelled {} batch(es) of origin={}", removed, origin);
        }
        removed
    }

    /// Advance one host frame of `dt` ms.
    pub fn tick(&mut self, dt: f64, targets: &mut dyn TargetStore) -> &TickOutputs {
        self.outputs.clear();
        if !self.running {
            return &self.outputs;
        }
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };

        // 1) Absolute-heavy batches first so relative deltas land on the right baseline.
        self.active.sort_by_key(|a| Reverse(a.batch.outstanding_absolute()));

        // 2) Evaluate and compose.
        for active in &mut self.active {
            let origin = active.batch.origin;
            active.batch.elapsed_total += dt;
            let elapsed = active.batch.elapsed_total;
            for anim in &mut active.batch.animations {
                if anim.is_complete() {
                    continue;
                }
                let position = anim.timeline_position(elapsed);
                if position < anim.timing.delay {
                    continue;
                }
                let local = position - anim.timing.delay;
                let key = RegistryKey::new(anim.target, anim.path.clone());

                if anim.state() == AnimationState::Pending {
                    if !self.registry.contains(&key) {
                        let live = targets
                            .target_mut(anim.target)
                            .and_then(|t| t.get(&anim.path));
                        match live {
                            Some(v) => {
                                self.registry.seed(&key, v);
                            }
                            None => {
                                warn!(
                                    "scheduler: target {:?} has no '{}', dropping animation",
                                    anim.target, anim.path
                                );
                                anim.set_state(AnimationState::Complete);
                                self.outputs.stale.push(StaleTargetEvent {
                                    origin,
                                    animation: anim.id(),
                                    target: anim.target,
                                    path: anim.path.clone(),
                                });
                                continue;
                            }
                        }
                    }
                    if anim.is_absolute() {
                        self.registry.rebase(&key);
                    }
                    let canonical = self.registry.read(&key).unwrap_or_default();
                    let baseline = self.registry.baseline(&key).unwrap_or(canonical);
                    anim.begin(canonical, baseline);
                }

                let sample = anim.sample(local);
                match anim.mode {
                    CompositionMode::Absolute => {
                        self.registry.write(&key, sample.value, anim.id());
                    }
                    CompositionMode::Relative => {
                        let delta = sample.value - anim.previous_value();
                        self.registry.add_delta(&key, delta);
                    }
                }
                anim.set_previous_value(sample.value);
                if sample.finished {
                    anim.set_state(AnimationState::Finishing);
                }
            }
        }

        // 3) One write per key.
        let mut stale_keys: Vec<RegistryKey> = Vec::new();
        for (key, value) in self.registry.drain_dirty() {
            let written = match targets.target_mut(key.target) {
                Some(t) => t.set(&key.path, value).is_ok(),
                None => false,
            };
            if written {
                trace!("scheduler: write {:?}/{} = {}", key.target, key.path, value);
                self.outputs.push_change(Change {
                    target: key.target,
                    path: key.path,
                    value,
                });
            } else {
                warn!(
                    "scheduler: write to {:?}/{} failed, target is stale",
                    key.target, key.path
                );
                stale_keys.push(key);
            }
        }
        if !stale_keys.is_empty() {
            self.drop_stale(&stale_keys);
        }

        // 4) Finish, retire, evict.
        for active in &mut self.active {
            for anim in &mut active.batch.animations {
                if anim.state() == AnimationState::Finishing {
                    anim.set_state(AnimationState::Complete);
                }
            }
        }
        let (done, still): (Vec<_>, Vec<_>) = std::mem::take(&mut self.active)
            .into_iter()
            .partition(|a| a.batch.is_complete());
        self.active = still;
        for active in done {
            debug!(
                "scheduler: retire {:?} origin={}",
                active.id, active.batch.origin
            );
            self.outputs.retired.push(RetiredBatch {
                batch: active.id,
                origin: active.batch.origin,
            });
            active.completion.resolve(());
        }

        let referenced: HashSet<RegistryKey> = self
            .active
            .iter()
            .flat_map(|a| a.batch.animations.iter())
            .filter(|a| !a.is_complete())
            .map(|a| RegistryKey::new(a.target, a.path.clone()))
            .collect();
        self.registry.retain_referenced(|k| referenced.contains(k));

        if self.active.is_empty() {
            self.running = false;
            debug!("scheduler: idle");
        }
        &self.outputs
    }

    fn drop_stale(&mut self, keys: &[RegistryKey]) {
        for active in &mut self.active {
            let origin = active.batch.origin;
            for anim in &mut active.batch.animations {
                if anim.is_complete() {
                    continue;
                }
                let hit = keys
                    .iter()
                    .any(|k| k.target == anim.target && k.path == anim.path);
                if hit {
                    anim.set_state(AnimationState::Complete);
                    self.outputs.stale.push(StaleTargetEvent {
                        origin,
                        animation: anim.id(),
                        target: anim.target,
                        path: anim.path.clone(),
                    });
                }
            }
        }
        for key in keys {
            self.registry.evict_if_unreferenced(key, false);
        }
    }
}

impl std::fmt::Debug for AnimationScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnimationScheduler")
            .field("running", &self.running)
            .field("batches", &self.active.len())
            .field("registry", &self.registry.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::AnimationOptions;
    use crate::ids::TargetId;
    use crate::target::{PropertyBag, TargetArena};

    fn anim(target: TargetId, path: &str, opts: AnimationOptions) -> PropertyAnimation {
        PropertyAnimation::new(target, path, opts, &Config::default()).unwrap()
    }

    #[test]
    fn submit_starts_and_empty_tick_goes_idle() {
        let mut arena = TargetArena::new();
        let mut sched = AnimationScheduler::default();
        assert!(sched.is_idle());
        let handle = sched.submit(AnimationBatch::new(OriginId::new_v4()));
        assert!(!sched.is_idle());
        sched.tick(16.0, &mut arena);
        assert!(handle.is_resolved());
        assert!(sched.is_idle());
    }

    #[test]
    fn idle_tick_is_noop() {
        let mut arena = TargetArena::new();
        let mut sched = AnimationScheduler::default();
        assert!(sched.tick(16.0, &mut arena).is_empty());
    }

    #[test]
    fn ordering_puts_absolute_heavy_batches_first() {
        let mut arena = TargetArena::new();
        let t = arena.insert(PropertyBag::new().with("alpha", 0.0));
        let mut sched = AnimationScheduler::default();
        let rel = OriginId::new_v4();
        let abs = OriginId::new_v4();
        sched.submit(AnimationBatch::with_animations(
            rel,
            vec![anim(t, "alpha", AnimationOptions::to(1.0, 100.0).relative())],
        ));
        sched.submit(AnimationBatch::with_animations(
            abs,
            vec![anim(t, "alpha", AnimationOptions::to(1.0, 1000.0))],
        ));
        sched.tick(0.0, &mut arena);
        let order: Vec<_> = sched.batches().map(|b| b.origin).collect();
        assert_eq!(order, vec![abs, rel]);
    }

    #[test]
    fn delay_holds_animation_pending() {
        let mut arena = TargetArena::new();
        let t = arena.insert(PropertyBag::new().with("alpha", 0.0));
        let mut sched = AnimationScheduler::default();
        sched.submit(AnimationBatch::with_animations(
            OriginId::new_v4(),
            vec![anim(
                t,
                "alpha",
                AnimationOptions::to(1.0, 100.0).with_from(0.0).with_delay(50.0),
            )],
        ));
        assert!(sched.tick(40.0, &mut arena).changes.is_empty());
        let out = sched.tick(20.0, &mut arena);
        assert_eq!(out.value_of(t, "alpha"), Some(0.1));
    }

    #[test]
    fn catch_up_starts_mid_curve() {
        let mut arena = TargetArena::new();
        let t = arena.insert(PropertyBag::new().with("alpha", 0.0));
        let mut sched = AnimationScheduler::default();
        let batch = AnimationBatch::with_animations(
            OriginId::new_v4(),
            vec![anim(t, "alpha", AnimationOptions::to(1.0, 1000.0).with_from(0.0))],
        )
        .with_catch_up(750.0);
        sched.submit(batch);
        let out = sched.tick(0.0, &mut arena);
        assert_eq!(out.value_of(t, "alpha"), Some(0.75));
    }

    #[test]
    fn registry_is_evicted_once_nothing_references_it() {
        let mut arena = TargetArena::new();
        let t = arena.insert(PropertyBag::new().with("alpha", 0.0));
        let mut sched = AnimationScheduler::default();
        sched.submit(AnimationBatch::with_animations(
            OriginId::new_v4(),
            vec![anim(t, "alpha", AnimationOptions::to(1.0, 10.0))],
        ));
        sched.tick(5.0, &mut arena);
        assert_eq!(sched.registry().len(), 1);
        sched.tick(5.0, &mut arena);
        assert!(sched.registry().is_empty());
        assert_eq!(arena.value(t, "alpha"), Some(1.0));
    }
}
