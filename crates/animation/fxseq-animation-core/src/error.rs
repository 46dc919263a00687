//! Error types for animation construction and target access.

use serde::{Deserialize, Serialize};

/// Rejection of a [`crate::PropertyAnimation`] at construction time.
///
/// Validation failures are surfaced synchronously to the caller and never
/// reach the scheduler.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum ValidationError {
    /// Property path is empty or contains an empty segment
    #[error("Invalid property path: '{path}'")]
    InvalidPath { path: String },

    /// A numeric field is NaN or infinite
    #[error("Field '{field}' must be a finite number")]
    NonFinite { field: String },

    /// A time field is below zero
    #[error("Field '{field}' must not be negative (got {value})")]
    Negative { field: String, value: f64 },

    /// One-shot animation without a target value
    #[error("One-shot animation requires 'to'")]
    MissingTo,

    /// Looping animation without values
    #[error("Looping animation requires at least one entry in 'values'")]
    MissingValues,

    /// Looping animation whose segment duration is zero
    #[error("Looping animation requires a positive duration")]
    ZeroLoopDuration,

    /// Explicit loop count of zero
    #[error("Loop count must be at least 1 (omit it to loop indefinitely)")]
    InvalidLoopCount,

    /// Easing identifier is not recognised
    #[error("Unknown easing function: '{name}'")]
    UnknownEasing { name: String },

    /// Grid unit scaling requested for a property that does not support it
    #[error("Grid units are only supported for position, scale, width and height (got '{path}')")]
    GridUnitsNotAllowed { path: String },
}

impl ValidationError {
    /// Field or input the error refers to, for logging.
    #[inline]
    pub fn category(&self) -> &'static str {
        match self {
            Self::InvalidPath { .. } | Self::GridUnitsNotAllowed { .. } => "path",
            Self::NonFinite { .. } | Self::Negative { .. } | Self::ZeroLoopDuration => "timing",
            Self::MissingTo | Self::MissingValues | Self::InvalidLoopCount => "shape",
            Self::UnknownEasing { .. } => "easing",
        }
    }
}

/// A target handle or property path that no longer resolves to a live value.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("Stale target: property '{path}' no longer resolves")]
pub struct StaleTarget {
    pub path: String,
}

impl StaleTarget {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_categories() {
        assert_eq!(
            ValidationError::UnknownEasing {
                name: "wobble".into()
            }
            .category(),
            "easing"
        );
        assert_eq!(ValidationError::MissingTo.category(), "shape");
        assert_eq!(
            ValidationError::NonFinite {
                field: "duration".into()
            }
            .category(),
            "timing"
        );
    }

    #[test]
    fn messages_name_the_offending_input() {
        let err = ValidationError::GridUnitsNotAllowed {
            path: "alpha".into(),
        };
        assert!(err.to_string().contains("'alpha'"));
        assert_eq!(
            StaleTarget::new("scale.x").to_string(),
            "Stale target: property 'scale.x' no longer resolves"
        );
    }

    #[test]
    fn serialization_round_trip() {
        let error = ValidationError::Negative {
            field: "delay".into(),
            value: -1.0,
        };
        let serialized = serde_json::to_string(&error).unwrap();
        let deserialized: ValidationError = serde_json::from_str(&serialized).unwrap();
        assert_eq!(error, deserialized);
    }
}
