//! fxseq timeline core
//!
//! Turns an [`EffectDeclaration`] into a running [`EffectTimeline`]: resolves
//! durations and loop structure, builds preset and custom animations, derives
//! the catch-up position against a shared logical clock, and schedules media
//! loop boundaries. [`EffectRuntime`] bundles timelines with the animation
//! scheduler for hosts that want a single `frame(dt)` entry point.

pub mod config;
pub mod declaration;
pub mod deferred;
pub mod durations;
pub mod error;
pub mod media;
pub mod presets;
pub mod runtime;
pub mod sync;
pub mod timeline;

pub use config::{PresetPaths, TimelineConfig};
pub use declaration::{
    CustomAnimation, EffectDeclaration, Movement, PlaybackWindowSpec, PresetTiming, WindowBound,
};
pub use deferred::{DeferredQueue, TaskHandle};
pub use durations::{resolve as resolve_durations, PlaybackWindow, ResolvedDurations};
pub use error::TimelineError;
pub use media::{HeadlessMedia, MediaPlayback};
pub use presets::EffectAnimations;
pub use runtime::{EffectPlayback, EffectRuntime, ReplicationState};
pub use sync::{SyncGroupKey, SyncGroupRegistry, SyncMembership};
pub use timeline::{
    catch_up_position, CatchUpPlan, CatchUpPosition, EffectTimeline, TaskQueue, TimelineStart,
    TimelineState, TimelineTask,
};

pub use fxseq_animation_core as animation;
