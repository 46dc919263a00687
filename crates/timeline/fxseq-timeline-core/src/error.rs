//! Error types for effect timelines and the runtime.

use fxseq_animation_core::{OriginId, ValidationError};

use crate::timeline::TimelineState;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum TimelineError {
    /// A preset or custom animation failed validation
    #[error("Invalid animation: {0}")]
    Validation(#[from] ValidationError),

    /// Operation not allowed in the timeline's current state
    #[error("Cannot {requested} while timeline is {current}")]
    InvalidState {
        current: TimelineState,
        requested: &'static str,
    },

    /// Declaration carries an out-of-range timing or loop setting
    #[error("Invalid effect declaration: {reason}")]
    InvalidDeclaration { reason: String },

    #[error("Unknown effect: {id}")]
    UnknownEffect { id: OriginId },

    #[error("Effect is already playing: {id}")]
    DuplicateEffect { id: OriginId },
}

impl TimelineError {
    pub(crate) fn declaration(reason: impl Into<String>) -> Self {
        Self::InvalidDeclaration {
            reason: reason.into(),
        }
    }

    #[inline]
    pub fn category(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::InvalidState { .. } => "state",
            Self::InvalidDeclaration { .. } => "declaration",
            Self::UnknownEffect { .. } | Self::DuplicateEffect { .. } => "effect",
        }
    }
}
