//! fxseq animation core (engine-agnostic)
//!
//! Numeric property animations composed per `(target, property)` key and
//! evaluated by a tick-driven [`AnimationScheduler`]. Hosts implement
//! [`AnimatableTarget`] / [`TargetStore`] for their own objects and call
//! [`AnimationScheduler::tick`] once per frame.

pub mod animation;
pub mod completion;
pub mod config;
pub mod error;
pub mod ids;
pub mod interp;
pub mod outputs;
pub mod registry;
pub mod scheduler;
pub mod target;

// Re-exports for consumers (timeline, adapters)
pub use animation::{
    AnimationOptions, AnimationShape, AnimationState, CompositionMode, LoopCursor,
    PropertyAnimation, Timing, GRID_UNIT_PATHS,
};
pub use completion::{completion_pair, Completion, CompletionHandle, CompletionSource};
pub use config::Config;
pub use error::{StaleTarget, ValidationError};
pub use ids::{AnimationId, BatchId, IdAllocator, OriginId, TargetId};
pub use interp::{Easing, EasingCurve};
pub use outputs::{Change, RetiredBatch, StaleTargetEvent, TickOutputs};
pub use registry::{CoreValueRegistry, RegistryEntry, RegistryKey};
pub use scheduler::{AnimationBatch, AnimationScheduler};
pub use target::{AnimatableTarget, PropertyBag, PropertyPath, TargetArena, TargetStore};
