//! Easing identifiers and interpolation helpers.
//!
//! Easings are addressed by the identifiers the effect-declaration layer uses
//! (`"linear"`, `"easeInOutCubic"`, ...). Parsing happens once, when a
//! [`crate::PropertyAnimation`] is validated; evaluation is a plain match.

pub mod functions;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Curve family shared by the in/out/in-out variants.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum EasingCurve {
    Sine,
    Quad,
    Cubic,
    Quart,
    Quint,
    Expo,
    Circ,
    Back,
    Elastic,
    Bounce,
}

impl EasingCurve {
    const ALL: [EasingCurve; 10] = [
        EasingCurve::Sine,
        EasingCurve::Quad,
        EasingCurve::Cubic,
        EasingCurve::Quart,
        EasingCurve::Quint,
        EasingCurve::Expo,
        EasingCurve::Circ,
        EasingCurve::Back,
        EasingCurve::Elastic,
        EasingCurve::Bounce,
    ];

    fn name(self) -> &'static str {
        match self {
            Self::Sine => "Sine",
            Self::Quad => "Quad",
            Self::Cubic => "Cubic",
            Self::Quart => "Quart",
            Self::Quint => "Quint",
            Self::Expo => "Expo",
            Self::Circ => "Circ",
            Self::Back => "Back",
            Self::Elastic => "Elastic",
            Self::Bounce => "Bounce",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }
}

/// Easing function applied to normalized progress.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Easing {
    #[default]
    Linear,
    EaseIn(EasingCurve),
    EaseOut(EasingCurve),
    EaseInOut(EasingCurve),
}

impl Easing {
    /// Map linear progress `t` (clamped to [0, 1]) through the curve.
    #[inline]
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::EaseIn(c) => functions::ease_in(c, t),
            Easing::EaseOut(c) => functions::ease_out(c, t),
            Easing::EaseInOut(c) => functions::ease_in_out(c, t),
        }
    }

    /// Interpolate between `from` and `to` at eased progress `t`.
    #[inline]
    pub fn interpolate(self, from: f64, to: f64, t: f64) -> f64 {
        functions::lerp(from, to, self.apply(t))
    }
}

impl FromStr for Easing {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || ValidationError::UnknownEasing {
            name: s.to_string(),
        };
        if s == "linear" {
            return Ok(Easing::Linear);
        }
        // Longest prefix first: "easeInOut" also starts with "easeIn".
        if let Some(rest) = s.strip_prefix("easeInOut") {
            return EasingCurve::from_name(rest)
                .map(Easing::EaseInOut)
                .ok_or_else(unknown);
        }
        if let Some(rest) = s.strip_prefix("easeIn") {
            return EasingCurve::from_name(rest)
                .map(Easing::EaseIn)
                .ok_or_else(unknown);
        }
        if let Some(rest) = s.strip_prefix("easeOut") {
            return EasingCurve::from_name(rest)
                .map(Easing::EaseOut)
                .ok_or_else(unknown);
        }
        Err(unknown())
    }
}

impl TryFrom<String> for Easing {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Easing> for String {
    fn from(value: Easing) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Easing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Easing::Linear => f.write_str("linear"),
            Easing::EaseIn(c) => write!(f, "easeIn{}", c.name()),
            Easing::EaseOut(c) => write!(f, "easeOut{}", c.name()),
            Easing::EaseInOut(c) => write!(f, "easeInOut{}", c.name()),
        }
    }
}
