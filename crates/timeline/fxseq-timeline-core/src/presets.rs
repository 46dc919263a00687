//! Fade/scale/rotate presets and custom animations of an effect, built into
//! validated [`PropertyAnimation`]s.

use fxseq_animation_core::{
    AnimationOptions, CompositionMode, PropertyAnimation, TargetId, ValidationError,
};

use crate::config::TimelineConfig;
use crate::declaration::{EffectDeclaration, PresetTiming};
use crate::durations::ResolvedDurations;

/// Animations of one effect.
#[derive(Clone, Debug, Default)]
pub struct EffectAnimations {
    /// Submitted when the timeline starts. For finite effects this already
    /// includes the out presets, delayed to end with the effect, unless the
    /// effect holds its final frame.
    pub start: Vec<PropertyAnimation>,
    /// Out presets with their own delay, played when the effect is ended early
    /// or has no natural end.
    pub out: Vec<PropertyAnimation>,
}

struct PresetBuilder<'a> {
    sprite: TargetId,
    config: &'a TimelineConfig,
}

impl PresetBuilder<'_> {
    fn build(
        &self,
        path: &str,
        timing: &PresetTiming,
        from: Option<f64>,
        to: f64,
        mode: CompositionMode,
    ) -> Result<PropertyAnimation, ValidationError> {
        let mut options = AnimationOptions::to(to, timing.duration)
            .with_delay(timing.delay)
            .with_mode(mode);
        options.from = from;
        options.ease = timing.ease.clone();
        PropertyAnimation::new(self.sprite, path, options, &self.config.animation)
    }

    fn scale_pair(
        &self,
        out: &mut Vec<PropertyAnimation>,
        timing: &PresetTiming,
        from: Option<f64>,
        to: f64,
    ) -> Result<(), ValidationError> {
        let paths = &self.config.presets;
        for path in [&paths.scale_x, &paths.scale_y] {
            out.push(self.build(path, timing, from, to, CompositionMode::Absolute)?);
        }
        Ok(())
    }
}

/// Build every preset and custom animation of `decl` against `sprite`.
pub fn build(
    decl: &EffectDeclaration,
    sprite: TargetId,
    durations: &ResolvedDurations,
    config: &TimelineConfig,
) -> Result<EffectAnimations, ValidationError> {
    let b = PresetBuilder { sprite, config };
    let paths = &config.presets;
    let mut start = Vec::new();
    let mut out = Vec::new();

    if let Some(t) = &decl.fade_in {
        start.push(b.build(&paths.alpha, t, Some(0.0), decl.opacity, CompositionMode::Absolute)?);
    }
    if let Some(t) = &decl.scale_in {
        b.scale_pair(&mut start, t, Some(0.0), decl.scale)?;
    }
    if let Some(t) = &decl.rotate_in {
        let amount = t.amount.unwrap_or(config.default_rotation);
        // Offset from rest: turned back by `amount`, settling at rest.
        start.push(b.build(&paths.rotation, t, Some(-amount), 0.0, CompositionMode::Relative)?);
    }
    for custom in &decl.custom_animations {
        start.push(PropertyAnimation::new(
            sprite,
            &custom.path,
            custom.options.clone(),
            &config.animation,
        )?);
    }

    if let Some(t) = &decl.fade_out {
        out.push(b.build(&paths.alpha, t, None, 0.0, CompositionMode::Absolute)?);
    }
    if let Some(t) = &decl.scale_out {
        b.scale_pair(&mut out, t, None, 0.0)?;
    }
    if let Some(t) = &decl.rotate_out {
        let amount = t.amount.unwrap_or(config.default_rotation);
        out.push(b.build(&paths.rotation, t, Some(0.0), amount, CompositionMode::Relative)?);
    }

    let closes_itself = !(decl.persist && decl.hold_final_frame);
    if let (Some(total), true) = (durations.total, closes_itself) {
        for anim in &out {
            let mut closing = anim.clone();
            closing.timing.delay = (total - anim.timing.duration + anim.timing.delay).max(0.0);
            start.push(closing);
        }
    }

    Ok(EffectAnimations { start, out })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::durations::resolve;
    use fxseq_animation_core::AnimationShape;

    fn build_for(decl: &EffectDeclaration) -> Result<EffectAnimations, ValidationError> {
        let config = TimelineConfig::default();
        let durations = resolve(decl, &config).unwrap();
        build(decl, TargetId(3), &durations, &config)
    }

    #[test]
    fn finite_effects_schedule_out_presets_at_the_end() {
        let mut decl = EffectDeclaration::default()
            .with_duration(1000.0)
            .with_fade_in(PresetTiming::new(200.0))
            .with_fade_out(PresetTiming {
                duration: 300.0,
                delay: 50.0,
                ..PresetTiming::default()
            });
        decl.opacity = 0.8;
        let anims = build_for(&decl).unwrap();
        assert_eq!(anims.start.len(), 2);
        assert_eq!(anims.out.len(), 1);
        let closing = &anims.start[1];
        assert_eq!(closing.timing.delay, 750.0);
        assert_eq!(
            anims.start[0].shape,
            AnimationShape::OneShot {
                from: Some(0.0),
                to: 0.8
            }
        );
        assert_eq!(anims.out[0].timing.delay, 50.0);
    }

    #[test]
    fn endless_effects_keep_out_presets_for_later() {
        let decl = EffectDeclaration {
            scale_out: Some(PresetTiming::new(250.0)),
            ..EffectDeclaration::default().with_duration(1000.0).persistent()
        };
        let anims = build_for(&decl).unwrap();
        assert!(anims.start.is_empty());
        assert_eq!(anims.out.len(), 2);
        assert_eq!(anims.out[0].path.as_str(), "scale.x");
        assert_eq!(anims.out[1].path.as_str(), "scale.y");
    }

    #[test]
    fn rotate_presets_are_relative() {
        let decl = EffectDeclaration {
            rotate_in: Some(PresetTiming {
                duration: 400.0,
                amount: Some(90.0),
                ..PresetTiming::default()
            }),
            ..EffectDeclaration::default()
        };
        let anims = build_for(&decl).unwrap();
        let spin = &anims.start[0];
        assert!(!spin.is_absolute());
        assert_eq!(
            spin.shape,
            AnimationShape::OneShot {
                from: Some(-90.0),
                to: 0.0
            }
        );
    }

    #[test]
    fn invalid_custom_animation_fails_the_whole_build() {
        let decl = EffectDeclaration::default().with_animation(
            "alpha",
            AnimationOptions::to(1.0, 100.0).with_ease("easeWobbly"),
        );
        assert!(matches!(
            build_for(&decl),
            Err(ValidationError::UnknownEasing { .. })
        ));
    }
}
