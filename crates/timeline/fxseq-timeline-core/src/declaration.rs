//! Serializable description of one effect, as received from the
//! effect-declaration layer. Only the properties that affect timing or
//! drive sprite properties are modelled here.

use fxseq_animation_core::{AnimationOptions, OriginId};
use serde::{Deserialize, Serialize};

/// Timing of a fade/scale/rotate preset.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PresetTiming {
    pub duration: f64,
    pub delay: f64,
    pub ease: Option<String>,
    /// Rotate presets only: degrees to turn. Defaults to a full turn.
    pub amount: Option<f64>,
}

impl PresetTiming {
    pub fn new(duration: f64) -> Self {
        Self {
            duration,
            ..Self::default()
        }
    }
}

/// Straight-line movement; only its duration matters to the timeline.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Movement {
    /// Distance travelled, in target units.
    pub distance: f64,
    /// Units per second. Without it the move takes the default second.
    pub speed: Option<f64>,
    pub delay: f64,
}

/// One playback window bound.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowBound {
    /// Absolute position in ms.
    Ms(f64),
    /// Fraction of the natural duration.
    Fraction(f64),
}

impl WindowBound {
    pub fn resolve(self, natural: f64) -> f64 {
        match self {
            Self::Ms(ms) => ms,
            Self::Fraction(f) => f * natural,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackWindowSpec {
    pub start: Option<WindowBound>,
    pub end: Option<WindowBound>,
}

/// Animation on an arbitrary sprite property.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CustomAnimation {
    pub path: String,
    #[serde(flatten)]
    pub options: AnimationOptions,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectDeclaration {
    pub id: OriginId,
    pub scene: String,
    pub sync_group: Option<String>,
    /// Shared creation instant (ms on the shared clock).
    pub logical_creation_time: f64,

    pub explicit_duration: Option<f64>,
    pub fade_in: Option<PresetTiming>,
    pub fade_out: Option<PresetTiming>,
    pub scale_in: Option<PresetTiming>,
    pub scale_out: Option<PresetTiming>,
    pub rotate_in: Option<PresetTiming>,
    pub rotate_out: Option<PresetTiming>,
    pub movement: Option<Movement>,
    pub custom_animations: Vec<CustomAnimation>,

    /// Natural duration of the backing media in ms, if any.
    pub media_natural_duration: Option<f64>,
    pub playback_rate: f64,
    pub loop_count: Option<u32>,
    pub loop_delay: f64,
    pub playback_window: PlaybackWindowSpec,

    /// Keep the effect alive after its last loop instead of ending it.
    pub persist: bool,
    /// For persistent effects: pause on the last frame when finished.
    pub hold_final_frame: bool,
    /// Target alpha of the fade-in preset.
    pub opacity: f64,
    /// Target scale of the scale-in preset.
    pub scale: f64,
}

impl Default for EffectDeclaration {
    fn default() -> Self {
        Self {
            id: OriginId::new_v4(),
            scene: String::new(),
            sync_group: None,
            logical_creation_time: 0.0,
            explicit_duration: None,
            fade_in: None,
            fade_out: None,
            scale_in: None,
            scale_out: None,
            rotate_in: None,
            rotate_out: None,
            movement: None,
            custom_animations: Vec::new(),
            media_natural_duration: None,
            playback_rate: 1.0,
            loop_count: None,
            loop_delay: 0.0,
            playback_window: PlaybackWindowSpec::default(),
            persist: false,
            hold_final_frame: false,
            opacity: 1.0,
            scale: 1.0,
        }
    }
}

impl EffectDeclaration {
    pub fn new(scene: impl Into<String>, logical_creation_time: f64) -> Self {
        Self {
            scene: scene.into(),
            logical_creation_time,
            ..Self::default()
        }
    }

    pub fn with_duration(mut self, ms: f64) -> Self {
        self.explicit_duration = Some(ms);
        self
    }
    pub fn with_media(mut self, natural_ms: f64) -> Self {
        self.media_natural_duration = Some(natural_ms);
        self
    }
    pub fn with_loops(mut self, count: u32) -> Self {
        self.loop_count = Some(count);
        self
    }
    pub fn with_loop_delay(mut self, ms: f64) -> Self {
        self.loop_delay = ms;
        self
    }
    pub fn with_sync_group(mut self, group: impl Into<String>) -> Self {
        self.sync_group = Some(group.into());
        self
    }
    pub fn with_fade_in(mut self, timing: PresetTiming) -> Self {
        self.fade_in = Some(timing);
        self
    }
    pub fn with_fade_out(mut self, timing: PresetTiming) -> Self {
        self.fade_out = Some(timing);
        self
    }
    pub fn with_animation(mut self, path: impl Into<String>, options: AnimationOptions) -> Self {
        self.custom_animations.push(CustomAnimation {
            path: path.into(),
            options,
        });
        self
    }
    pub fn persistent(mut self) -> Self {
        self.persist = true;
        self
    }
    pub fn holding_final_frame(mut self) -> Self {
        self.hold_final_frame = true;
        self
    }

    pub fn is_media_backed(&self) -> bool {
        self.media_natural_duration.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sparse_json_uses_defaults() {
        let decl: EffectDeclaration = serde_json::from_str(
            r#"{
                "id": "9b2f7c1e-58a4-4f0e-9d1b-3c6a2f4e8d10",
                "scene": "lobby",
                "fade_in": { "duration": 250 },
                "playback_window": { "start": { "fraction": 0.25 } },
                "custom_animations": [
                    { "path": "rotation", "to": 90, "duration": 400, "mode": "relative" }
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(decl.playback_rate, 1.0);
        assert_eq!(decl.fade_in, Some(PresetTiming::new(250.0)));
        assert_eq!(
            decl.playback_window.start,
            Some(WindowBound::Fraction(0.25))
        );
        assert_eq!(decl.custom_animations[0].options.to, Some(90.0));
        assert!(!decl.is_media_backed());
    }

    #[test]
    fn window_bounds_resolve() {
        assert_eq!(WindowBound::Ms(120.0).resolve(1000.0), 120.0);
        assert_eq!(WindowBound::Fraction(0.5).resolve(1000.0), 500.0);
    }
}
