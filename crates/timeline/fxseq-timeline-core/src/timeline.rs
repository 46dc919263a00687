//! Per-effect timeline: duration resolution, shared-clock catch-up, batch
//! submission, and media loop scheduling.
//!
//! Lifecycle:
//! `Uninitialized -> TimelineComputed -> Started -> (Looping)* -> Finishing -> Ended`
//!
//! A late observer starts with `catch_up_offset = local - logical` and lands
//! on the same loop index and phase, and the same animation values, as an
//! observer who has been playing since the logical creation time.

use std::fmt;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use fxseq_animation_core::{
    completion_pair, AnimationBatch, AnimationScheduler, AnimationShape, Completion,
    CompletionHandle, CompletionSource, OriginId, TargetId,
};

use crate::config::TimelineConfig;
use crate::declaration::EffectDeclaration;
use crate::deferred::{DeferredQueue, TaskHandle};
use crate::durations::{self, ResolvedDurations};
use crate::error::TimelineError;
use crate::media::MediaPlayback;
use crate::presets::{self, EffectAnimations};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimelineState {
    Uninitialized,
    TimelineComputed,
    Started,
    Looping,
    Finishing,
    Ended,
}

impl TimelineState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::TimelineComputed => "computed",
            Self::Started => "started",
            Self::Looping => "looping",
            Self::Finishing => "finishing",
            Self::Ended => "ended",
        }
    }
}

impl fmt::Display for TimelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Deferred work a timeline asks its owner to run later.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TimelineTask {
    /// The media reached the end of its playback window.
    CycleEnd { effect: OriginId },
    /// The loop delay elapsed; start the next cycle.
    Restart { effect: OriginId },
    /// A finite effect without media reached its total duration.
    Finish { effect: OriginId },
}

impl TimelineTask {
    pub fn effect(&self) -> OriginId {
        match *self {
            Self::CycleEnd { effect } | Self::Restart { effect } | Self::Finish { effect } => {
                effect
            }
        }
    }
}

pub type TaskQueue = DeferredQueue<TimelineTask>;

/// Loop index and phase for a catch-up offset.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CatchUpPosition {
    pub loop_index: u64,
    pub phase: f64,
}

/// Split `offset` into whole periods and the remainder. A non-positive
/// period or offset yields the start of cycle zero.
pub fn catch_up_position(offset: f64, period: f64) -> CatchUpPosition {
    if !(offset.is_finite() && offset > 0.0 && period.is_finite() && period > 0.0) {
        return CatchUpPosition {
            loop_index: 0,
            phase: 0.0,
        };
    }
    let phase = offset % period;
    let loop_index = ((offset - phase) / period).round() as u64;
    CatchUpPosition { loop_index, phase }
}

/// What the caller should do after [`EffectTimeline::start`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CatchUpPlan {
    /// The effect's finite duration already elapsed on the shared clock. The
    /// timeline ended itself, or holds its final frame when configured to.
    AlreadyFinished { hold_final_frame: bool },
    Resume {
        catch_up_offset: f64,
        current_loop_index: u64,
        loop_phase_offset: f64,
        /// Media seek position in seconds, for media-backed effects.
        media_position: Option<f64>,
    },
}

/// Handles returned by [`EffectTimeline::start`].
#[derive(Clone, Debug)]
pub struct TimelineStart {
    /// Total duration in ms, resolved immediately; infinite for endless effects.
    pub duration: Completion<f64>,
    /// Resolved when the effect has fully ended. Abandoned on cancel.
    pub ended: Completion<()>,
    pub plan: CatchUpPlan,
}

#[derive(Debug)]
pub struct EffectTimeline {
    declaration: EffectDeclaration,
    sprite: TargetId,
    logical_creation_time: f64,
    local_instantiation_time: f64,
    catch_up_offset: f64,
    durations: Option<ResolvedDurations>,
    animations: EffectAnimations,
    start_is_finite: bool,
    state: TimelineState,
    current_loop_index: u64,
    loop_phase_offset: f64,
    held_at_end: bool,
    pending_task: Option<TaskHandle>,
    batch: Option<CompletionHandle>,
    finishing: Option<CompletionHandle>,
    ended: Option<CompletionSource<()>>,
}

impl EffectTimeline {
    pub fn new(
        declaration: EffectDeclaration,
        sprite: TargetId,
        local_instantiation_time: f64,
    ) -> Self {
        Self {
            logical_creation_time: declaration.logical_creation_time,
            declaration,
            sprite,
            local_instantiation_time,
            catch_up_offset: 0.0,
            durations: None,
            animations: EffectAnimations::default(),
            start_is_finite: true,
            state: TimelineState::Uninitialized,
            current_loop_index: 0,
            loop_phase_offset: 0.0,
            held_at_end: false,
            pending_task: None,
            batch: None,
            finishing: None,
            ended: None,
        }
    }

    /// Replace the declaration's creation time, e.g. with a sync group's.
    pub fn with_logical_creation_time(mut self, time: f64) -> Self {
        self.logical_creation_time = time;
        self
    }

    #[inline]
    pub fn id(&self) -> OriginId {
        self.declaration.id
    }
    pub fn declaration(&self) -> &EffectDeclaration {
        &self.declaration
    }
    pub fn sprite(&self) -> TargetId {
        self.sprite
    }
    #[inline]
    pub fn state(&self) -> TimelineState {
        self.state
    }
    pub fn logical_creation_time(&self) -> f64 {
        self.logical_creation_time
    }
    pub fn local_instantiation_time(&self) -> f64 {
        self.local_instantiation_time
    }
    pub fn catch_up_offset(&self) -> f64 {
        self.catch_up_offset
    }
    pub fn current_loop_index(&self) -> u64 {
        self.current_loop_index
    }
    pub fn loop_phase_offset(&self) -> f64 {
        self.loop_phase_offset
    }
    pub fn durations(&self) -> Option<&ResolvedDurations> {
        self.durations.as_ref()
    }
    /// A persistent effect paused on its final frame.
    pub fn held_at_end(&self) -> bool {
        self.held_at_end
    }
    pub fn pending_task(&self) -> Option<TaskHandle> {
        self.pending_task
    }
    pub fn is_ended(&self) -> bool {
        self.state == TimelineState::Ended
    }

    fn require(
        &self,
        allowed: &[TimelineState],
        requested: &'static str,
    ) -> Result<(), TimelineError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(TimelineError::InvalidState {
                current: self.state,
                requested,
            })
        }
    }

    fn computed(&self) -> Result<ResolvedDurations, TimelineError> {
        self.durations.ok_or(TimelineError::InvalidState {
            current: self.state,
            requested: "read durations",
        })
    }

    fn transition(&mut self, next: TimelineState) {
        if self.state != next {
            debug!("timeline {}: {} -> {}", self.id(), self.state, next);
            self.state = next;
        }
    }

    fn holds_final_frame(&self) -> bool {
        self.declaration.persist && self.declaration.hold_final_frame
    }

    /// Media position in seconds for an effect-time position in ms.
    fn media_seconds(&self, effect_ms: f64) -> f64 {
        effect_ms * self.declaration.playback_rate / 1000.0
    }

    fn submit_start(&mut self, scheduler: &mut AnimationScheduler, offset: f64) {
        if !self.animations.start.is_empty() {
            let batch = AnimationBatch::with_animations(self.id(), self.animations.start.clone())
                .with_catch_up(offset);
            self.batch = Some(scheduler.submit(batch));
        }
    }

    /// Resolve durations and build every animation. Nothing is submitted if
    /// any animation fails validation.
    pub fn compute(&mut self, config: &TimelineConfig) -> Result<&ResolvedDurations, TimelineError> {
        self.require(&[TimelineState::Uninitialized], "compute")?;
        let resolved = durations::resolve(&self.declaration, config)?;
        self.animations = presets::build(&self.declaration, self.sprite, &resolved, config)?;
        self.start_is_finite = self
            .animations
            .start
            .iter()
            .all(|a| !matches!(a.shape, AnimationShape::Loop { loops: None, .. }));
        self.transition(TimelineState::TimelineComputed);
        Ok(self.durations.insert(resolved))
    }

    /// Derive the catch-up position and start playing from it.
    pub fn start(
        &mut self,
        scheduler: &mut AnimationScheduler,
        queue: &mut TaskQueue,
        media: Option<&mut dyn MediaPlayback>,
    ) -> Result<TimelineStart, TimelineError> {
        self.require(&[TimelineState::TimelineComputed], "start")?;
        let d = self.computed()?;

        let offset = self.local_instantiation_time - self.logical_creation_time;
        let offset = if offset.is_finite() { offset.max(0.0) } else { 0.0 };
        self.catch_up_offset = offset;

        let duration = Completion::resolved(d.total_or_infinite());
        let (source, ended) = completion_pair();
        self.ended = Some(source);
        self.transition(TimelineState::Started);

        if let Some(total) = d.total {
            if offset >= total && offset > 0.0 {
                let hold = self.holds_final_frame();
                debug!(
                    "timeline {}: catch-up {}ms past total {}ms, already finished",
                    self.id(),
                    offset,
                    total
                );
                if hold {
                    // Finite start animations settle on their final values on
                    // the first tick.
                    self.current_loop_index = d.max_loops.map_or(0, |n| u64::from(n) - 1);
                    if self.current_loop_index > 0 {
                        self.transition(TimelineState::Looping);
                    }
                    self.submit_start(scheduler, offset);
                    self.hold_at_end(media);
                } else {
                    self.mark_ended();
                }
                return Ok(TimelineStart {
                    duration,
                    ended,
                    plan: CatchUpPlan::AlreadyFinished {
                        hold_final_frame: hold,
                    },
                });
            }
        }

        let pos = catch_up_position(offset, d.cycle_period());
        self.current_loop_index = pos.loop_index;
        self.loop_phase_offset = pos.phase;
        if pos.loop_index > 0 {
            self.transition(TimelineState::Looping);
        }

        self.submit_start(scheduler, offset);

        let media_position = match media {
            Some(m) if self.declaration.is_media_backed() => {
                Some(self.resume_media(m, queue, &d, pos.phase))
            }
            _ => {
                if let Some(total) = d.total {
                    self.schedule(queue, total - offset, TimelineTask::Finish { effect: self.id() });
                }
                None
            }
        };

        Ok(TimelineStart {
            duration,
            ended,
            plan: CatchUpPlan::Resume {
                catch_up_offset: offset,
                current_loop_index: pos.loop_index,
                loop_phase_offset: pos.phase,
                media_position,
            },
        })
    }

    /// Seek media to the catch-up phase and schedule the next boundary.
    /// Returns the seek position in media seconds.
    fn resume_media(
        &mut self,
        media: &mut dyn MediaPlayback,
        queue: &mut TaskQueue,
        d: &ResolvedDurations,
        phase: f64,
    ) -> f64 {
        let in_cycle = phase < d.single_cycle;
        let position_ms = if in_cycle {
            d.window.start + phase
        } else {
            d.window.end
        };
        let seconds = self.media_seconds(position_ms);
        media.seek(seconds);
        if in_cycle {
            media.play();
            self.schedule_next_loop(d.single_cycle - phase, queue);
        } else {
            // Inside the loop-delay gap: hold the last frame until the restart.
            media.pause();
            self.schedule(
                queue,
                d.cycle_period() - phase,
                TimelineTask::Restart { effect: self.id() },
            );
        }
        seconds
    }

    fn schedule(&mut self, queue: &mut TaskQueue, delay: f64, task: TimelineTask) -> TaskHandle {
        if let Some(old) = self.pending_task.take() {
            queue.revoke(old);
        }
        let handle = queue.schedule(delay, task);
        self.pending_task = Some(handle);
        handle
    }

    /// Schedule the end of the current media cycle `remaining` ms from now.
    /// Replaces any pending task of this timeline.
    pub fn schedule_next_loop(&mut self, remaining: f64, queue: &mut TaskQueue) -> TaskHandle {
        self.schedule(queue, remaining, TimelineTask::CycleEnd { effect: self.id() })
    }

    fn restart_cycle(
        &mut self,
        media: Option<&mut dyn MediaPlayback>,
        queue: &mut TaskQueue,
        d: &ResolvedDurations,
    ) {
        if let Some(m) = media {
            m.seek(self.media_seconds(d.window.start));
            m.play();
        }
        self.schedule_next_loop(d.single_cycle, queue);
    }

    /// React to a deferred task that came due.
    pub fn handle_task(
        &mut self,
        task: TimelineTask,
        scheduler: &mut AnimationScheduler,
        queue: &mut TaskQueue,
        media: Option<&mut dyn MediaPlayback>,
    ) {
        if task.effect() != self.id() {
            warn!("timeline {}: ignoring task for {}", self.id(), task.effect());
            return;
        }
        let live = matches!(self.state, TimelineState::Started | TimelineState::Looping);
        if !live || self.held_at_end {
            debug!("timeline {}: ignoring {:?} while {}", self.id(), task, self.state);
            return;
        }
        let Some(d) = self.durations else {
            return;
        };
        self.pending_task = None;

        match task {
            TimelineTask::CycleEnd { effect } => {
                let played = self.current_loop_index + 1;
                if d.max_loops.is_some_and(|n| played >= u64::from(n)) {
                    self.natural_end(scheduler, queue, media);
                    return;
                }
                self.transition(TimelineState::Looping);
                if d.loop_delay > 0.0 {
                    // The index advances when the next cycle actually starts.
                    if let Some(m) = media {
                        m.pause();
                    }
                    self.schedule(queue, d.loop_delay, TimelineTask::Restart { effect });
                } else {
                    self.current_loop_index = played;
                    self.restart_cycle(media, queue, &d);
                }
            }
            TimelineTask::Restart { .. } => {
                self.current_loop_index += 1;
                self.transition(TimelineState::Looping);
                self.restart_cycle(media, queue, &d);
            }
            TimelineTask::Finish { .. } => self.natural_end(scheduler, queue, media),
        }
    }

    fn natural_end(
        &mut self,
        scheduler: &mut AnimationScheduler,
        queue: &mut TaskQueue,
        media: Option<&mut dyn MediaPlayback>,
    ) {
        if self.holds_final_frame() {
            self.hold_at_end(media);
        } else {
            self.finish(scheduler, queue, media, true);
        }
    }

    fn hold_at_end(&mut self, media: Option<&mut dyn MediaPlayback>) {
        self.held_at_end = true;
        if let (Some(m), Some(d)) = (media, self.durations) {
            m.seek(self.media_seconds(d.window.end));
            m.pause();
        }
        debug!("timeline {}: holding final frame", self.id());
    }

    fn finish(
        &mut self,
        scheduler: &mut AnimationScheduler,
        queue: &mut TaskQueue,
        media: Option<&mut dyn MediaPlayback>,
        natural: bool,
    ) {
        if let Some(h) = self.pending_task.take() {
            queue.revoke(h);
        }
        if let Some(m) = media {
            m.pause();
        }
        let batch_live = self.batch.as_ref().is_some_and(Completion::is_pending);
        if natural {
            // Out presets already ran inside the start batch.
            if batch_live && self.start_is_finite {
                self.finishing = self.batch.clone();
            } else {
                scheduler.cancel(self.id());
            }
        } else {
            scheduler.cancel(self.id());
            if !self.animations.out.is_empty() {
                let batch = AnimationBatch::with_animations(self.id(), self.animations.out.clone());
                self.finishing = Some(scheduler.submit(batch));
            }
        }
        self.transition(TimelineState::Finishing);
        self.poll_finishing();
    }

    /// Move from `Finishing` to `Ended` once the finishing batch is done.
    /// Returns whether the timeline has ended.
    pub fn poll_finishing(&mut self) -> bool {
        if self.state == TimelineState::Finishing {
            let done = self.finishing.as_ref().map_or(true, |h| !h.is_pending());
            if done {
                self.mark_ended();
            }
        }
        self.is_ended()
    }

    fn mark_ended(&mut self) {
        self.finishing = None;
        self.batch = None;
        self.transition(TimelineState::Ended);
        if let Some(source) = self.ended.take() {
            source.resolve(());
        }
    }

    /// Graceful end: play the out presets, then end. No-op once finishing.
    pub fn end(
        &mut self,
        scheduler: &mut AnimationScheduler,
        queue: &mut TaskQueue,
        media: Option<&mut dyn MediaPlayback>,
    ) {
        match self.state {
            TimelineState::Finishing | TimelineState::Ended => {}
            TimelineState::Uninitialized | TimelineState::TimelineComputed => self.mark_ended(),
            TimelineState::Started | TimelineState::Looping => {
                self.finish(scheduler, queue, media, false)
            }
        }
    }

    /// Abandon the effect: revoke pending tasks, drop its batches, and end
    /// without resolving the `ended` handle.
    pub fn cancel(&mut self, scheduler: &mut AnimationScheduler, queue: &mut TaskQueue) {
        if self.state == TimelineState::Ended {
            return;
        }
        if let Some(h) = self.pending_task.take() {
            queue.revoke(h);
        }
        scheduler.cancel(self.id());
        self.batch = None;
        self.finishing = None;
        self.ended = None;
        self.transition(TimelineState::Ended);
    }
}
