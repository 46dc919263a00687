//! Host-facing runtime owning the scheduler, the deferred task queue and
//! every live effect timeline.
//!
//! One `frame(dt, targets)` call per host frame routes due timeline tasks,
//! ticks the scheduler, and retires timelines that ended.

use std::fmt;

use hashbrown::HashMap;
use log::{debug, trace};
use serde::{Deserialize, Serialize};

use fxseq_animation_core::{
    AnimationScheduler, Completion, OriginId, TargetId, TargetStore, TickOutputs,
};

use crate::config::TimelineConfig;
use crate::declaration::EffectDeclaration;
use crate::error::TimelineError;
use crate::media::MediaPlayback;
use crate::sync::{SyncGroupKey, SyncGroupRegistry, SyncMembership};
use crate::timeline::{CatchUpPlan, EffectTimeline, TaskQueue};

/// Handles for a started effect.
#[derive(Clone, Debug)]
pub struct EffectPlayback {
    pub id: OriginId,
    pub duration: Completion<f64>,
    pub ended: Completion<()>,
    pub plan: CatchUpPlan,
    /// Group membership, when the effect joined a sync group.
    pub sync: Option<SyncMembership>,
}

/// What another client needs to replay an effect in step with this one.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReplicationState {
    pub id: OriginId,
    pub logical_creation_time: f64,
    pub sync_group: Option<SyncGroupKey>,
}

struct LiveEffect {
    timeline: EffectTimeline,
    media: Option<Box<dyn MediaPlayback>>,
    sync: Option<SyncGroupKey>,
}

fn media_of(media: &mut Option<Box<dyn MediaPlayback>>) -> Option<&mut dyn MediaPlayback> {
    match media {
        Some(m) => Some(m.as_mut()),
        None => None,
    }
}

#[derive(Default)]
pub struct EffectRuntime {
    config: TimelineConfig,
    scheduler: AnimationScheduler,
    queue: TaskQueue,
    sync: SyncGroupRegistry,
    effects: HashMap<OriginId, LiveEffect>,
}

impl fmt::Debug for EffectRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectRuntime")
            .field("effects", &self.effects.len())
            .field("sync_groups", &self.sync.len())
            .field("pending_tasks", &self.queue.len())
            .field("scheduler", &self.scheduler)
            .finish()
    }
}

impl EffectRuntime {
    pub fn new(config: TimelineConfig) -> Self {
        Self {
            scheduler: AnimationScheduler::new(config.animation.clone()),
            config,
            queue: TaskQueue::new(),
            sync: SyncGroupRegistry::new(),
            effects: HashMap::new(),
        }
    }

    pub fn config(&self) -> &TimelineConfig {
        &self.config
    }
    pub fn scheduler(&self) -> &AnimationScheduler {
        &self.scheduler
    }
    pub fn sync_groups(&self) -> &SyncGroupRegistry {
        &self.sync
    }
    pub fn timeline(&self, id: OriginId) -> Option<&EffectTimeline> {
        self.effects.get(&id).map(|e| &e.timeline)
    }
    pub fn is_playing(&self, id: OriginId) -> bool {
        self.effects.contains_key(&id)
    }
    pub fn len(&self) -> usize {
        self.effects.len()
    }
    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    /// Compute and start `decl` on `sprite`, observed locally at `now` ms on
    /// the shared clock. Effects in a sync group adopt the group's creation
    /// time.
    pub fn play(
        &mut self,
        decl: EffectDeclaration,
        sprite: TargetId,
        mut media: Option<Box<dyn MediaPlayback>>,
        now: f64,
    ) -> Result<EffectPlayback, TimelineError> {
        let id = decl.id;
        if self.effects.contains_key(&id) {
            return Err(TimelineError::DuplicateEffect { id });
        }

        let sync_key = decl
            .sync_group
            .as_ref()
            .map(|group| SyncGroupKey::new(decl.scene.clone(), group.clone()));
        let membership = sync_key
            .as_ref()
            .map(|key| self.sync.join(key.clone(), id, decl.logical_creation_time));
        let logical = membership.map_or(decl.logical_creation_time, |m| m.logical_creation_time);

        let mut timeline = EffectTimeline::new(decl, sprite, now).with_logical_creation_time(logical);
        let started = match timeline.compute(&self.config) {
            Ok(_) => timeline.start(&mut self.scheduler, &mut self.queue, media_of(&mut media)),
            Err(err) => Err(err),
        };
        let start = match started {
            Ok(start) => start,
            Err(err) => {
                if let Some(key) = &sync_key {
                    self.sync.leave(key, id);
                }
                return Err(err);
            }
        };

        debug!("runtime: effect {} started ({:?})", id, start.plan);
        if timeline.is_ended() {
            if let Some(key) = &sync_key {
                self.sync.leave(key, id);
            }
        } else {
            self.effects.insert(
                id,
                LiveEffect {
                    timeline,
                    media,
                    sync: sync_key,
                },
            );
        }

        Ok(EffectPlayback {
            id,
            duration: start.duration,
            ended: start.ended,
            plan: start.plan,
            sync: membership,
        })
    }

    /// End an effect gracefully, playing its out presets.
    pub fn end_effect(&mut self, id: OriginId) -> Result<(), TimelineError> {
        let effect = self
            .effects
            .get_mut(&id)
            .ok_or(TimelineError::UnknownEffect { id })?;
        effect
            .timeline
            .end(&mut self.scheduler, &mut self.queue, media_of(&mut effect.media));
        self.retire_ended();
        Ok(())
    }

    /// Drop an effect immediately; its `ended` handle is abandoned.
    pub fn cancel_effect(&mut self, id: OriginId) -> Result<(), TimelineError> {
        let effect = self
            .effects
            .get_mut(&id)
            .ok_or(TimelineError::UnknownEffect { id })?;
        effect.timeline.cancel(&mut self.scheduler, &mut self.queue);
        if let Some(m) = effect.media.as_mut() {
            m.pause();
        }
        self.retire_ended();
        Ok(())
    }

    /// Advance every effect by `dt` ms and write the frame's values to
    /// `targets`.
    pub fn frame(&mut self, dt: f64, targets: &mut dyn TargetStore) -> &TickOutputs {
        for task in self.queue.advance(dt) {
            match self.effects.get_mut(&task.effect()) {
                Some(effect) => effect.timeline.handle_task(
                    task,
                    &mut self.scheduler,
                    &mut self.queue,
                    media_of(&mut effect.media),
                ),
                None => trace!("runtime: dropping {:?} for departed effect", task),
            }
        }

        self.scheduler.tick(dt, targets);
        for effect in self.effects.values_mut() {
            effect.timeline.poll_finishing();
        }
        self.retire_ended();
        self.scheduler.outputs()
    }

    fn retire_ended(&mut self) {
        let ended: Vec<OriginId> = self
            .effects
            .iter()
            .filter(|(_, e)| e.timeline.is_ended())
            .map(|(id, _)| *id)
            .collect();
        for id in ended {
            if let Some(effect) = self.effects.remove(&id) {
                if let Some(key) = &effect.sync {
                    self.sync.leave(key, id);
                }
                debug!("runtime: effect {} retired", id);
            }
        }
    }

    /// Creation instant and group of a live effect, for late joiners on
    /// other clients.
    pub fn replication_state(&self, id: OriginId) -> Option<ReplicationState> {
        self.effects.get(&id).map(|e| ReplicationState {
            id,
            logical_creation_time: e.timeline.logical_creation_time(),
            sync_group: e.sync.clone(),
        })
    }
}
