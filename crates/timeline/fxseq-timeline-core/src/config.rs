//! Timeline configuration.

use fxseq_animation_core::Config;
use serde::{Deserialize, Serialize};

/// Sprite property paths driven by the fade/scale/rotate presets.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PresetPaths {
    pub alpha: String,
    pub scale_x: String,
    pub scale_y: String,
    pub rotation: String,
}

impl Default for PresetPaths {
    fn default() -> Self {
        Self {
            alpha: "alpha".into(),
            scale_x: "scale.x".into(),
            scale_y: "scale.y".into(),
            rotation: "rotation".into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
    /// Duration (ms) of an effect with no media, no explicit duration and
    /// nothing else that implies one.
    pub default_static_duration: f64,
    /// Degrees turned by rotate presets that do not give an amount.
    pub default_rotation: f64,
    pub presets: PresetPaths,
    pub animation: Config,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            default_static_duration: 1000.0,
            default_rotation: 360.0,
            presets: PresetPaths::default(),
            animation: Config::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_defaults() {
        let cfg: TimelineConfig =
            serde_json::from_str(r#"{ "animation": { "grid_size": 64.0 } }"#).unwrap();
        assert_eq!(cfg.default_static_duration, 1000.0);
        assert_eq!(cfg.animation.grid_size, 64.0);
        assert_eq!(cfg.presets.scale_y, "scale.y");
    }
}
