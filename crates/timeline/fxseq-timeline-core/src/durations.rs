//! Duration and loop-structure resolution for an effect declaration.

use serde::{Deserialize, Serialize};

use crate::config::TimelineConfig;
use crate::declaration::{EffectDeclaration, PresetTiming, WindowBound};
use crate::error::TimelineError;

/// Playback window in effect-time ms (media time divided by the playback
/// rate), `start <= end <= natural`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaybackWindow {
    pub start: f64,
    pub end: f64,
}

impl PlaybackWindow {
    #[inline]
    pub fn len(&self) -> f64 {
        self.end - self.start
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() <= 0.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResolvedDurations {
    /// Media or animation duration before windowing.
    pub natural: f64,
    pub window: PlaybackWindow,
    pub single_cycle: f64,
    pub loop_delay: f64,
    /// `None` loops until ended.
    pub max_loops: Option<u32>,
    /// `None` for endless effects.
    pub total: Option<f64>,
}

impl ResolvedDurations {
    /// One cycle plus the gap before the next.
    #[inline]
    pub fn cycle_period(&self) -> f64 {
        self.single_cycle + self.loop_delay
    }

    #[inline]
    pub fn total_or_infinite(&self) -> f64 {
        self.total.unwrap_or(f64::INFINITY)
    }

    pub fn is_endless(&self) -> bool {
        self.total.is_none()
    }
}

fn checked(field: &str, v: f64) -> Result<f64, TimelineError> {
    if !v.is_finite() || v < 0.0 {
        return Err(TimelineError::declaration(format!(
            "'{field}' must be a finite, non-negative number (got {v})"
        )));
    }
    Ok(v)
}

fn preset_pair(a: &Option<PresetTiming>, b: &Option<PresetTiming>) -> f64 {
    a.as_ref().map_or(0.0, |p| p.duration) + b.as_ref().map_or(0.0, |p| p.duration)
}

/// Longest of everything that implies a duration for an effect with no
/// explicit duration and no media.
fn static_duration(decl: &EffectDeclaration, config: &TimelineConfig) -> f64 {
    let mut longest = preset_pair(&decl.fade_in, &decl.fade_out)
        .max(preset_pair(&decl.scale_in, &decl.scale_out))
        .max(preset_pair(&decl.rotate_in, &decl.rotate_out));
    if let Some(m) = &decl.movement {
        longest = longest.max(1000.0 + m.delay);
    }
    for custom in &decl.custom_animations {
        let o = &custom.options;
        let d = if o.looping {
            match o.loops {
                Some(loops) => {
                    let segments = o.values.as_ref().map_or(1, |v| v.len().max(2) - 1);
                    o.duration * segments as f64 * f64::from(loops) + o.delay
                }
                None => 0.0,
            }
        } else {
            o.duration + o.delay
        };
        longest = longest.max(d);
    }
    if longest > 0.0 {
        longest
    } else {
        config.default_static_duration
    }
}

/// Resolve natural duration, window, cycle and total for `decl`.
pub fn resolve(
    decl: &EffectDeclaration,
    config: &TimelineConfig,
) -> Result<ResolvedDurations, TimelineError> {
    let rate = decl.playback_rate;
    if !rate.is_finite() || rate <= 0.0 {
        return Err(TimelineError::declaration(format!(
            "'playback_rate' must be positive (got {rate})"
        )));
    }
    if decl.loop_count == Some(0) {
        return Err(TimelineError::declaration("'loop_count' must be at least 1"));
    }
    let loop_delay = checked("loop_delay", decl.loop_delay)?;
    let explicit = decl
        .explicit_duration
        .map(|d| checked("explicit_duration", d))
        .transpose()?;
    let media = decl
        .media_natural_duration
        .map(|d| checked("media_natural_duration", d).map(|d| d / rate))
        .transpose()?;

    let moving = decl.movement.as_ref().and_then(|m| m.speed.map(|s| (m, s)));
    let natural = match (moving, explicit.or(media)) {
        (Some((m, speed)), _) => {
            let speed = checked("movement.speed", speed)?;
            let distance = checked("movement.distance", m.distance)?;
            let travel = if speed > 0.0 {
                distance / speed * 1000.0 + m.delay
            } else {
                0.0
            };
            travel.max(explicit.unwrap_or(0.0))
        }
        (None, Some(d)) => d,
        (None, None) => static_duration(decl, config),
    };

    let window = {
        let spec = decl.playback_window;
        let bound = |field: &str, b: Option<WindowBound>, default: f64| match b {
            None => Ok(default),
            Some(b) => {
                let v = b.resolve(natural);
                if v.is_finite() {
                    Ok(v)
                } else {
                    Err(TimelineError::declaration(format!(
                        "'playback_window.{field}' must be finite"
                    )))
                }
            }
        };
        let start = bound("start", spec.start, 0.0)?.clamp(0.0, natural);
        let end = bound("end", spec.end, natural)?.clamp(start, natural);
        PlaybackWindow { start, end }
    };
    let single_cycle = window.len();

    let max_loops = match decl.loop_count {
        Some(n) => Some(n),
        None if decl.persist => None,
        None => Some(1),
    };
    let total = max_loops.map(|n| {
        let n = f64::from(n);
        n * single_cycle + (n - 1.0) * loop_delay
    });

    Ok(ResolvedDurations {
        natural,
        window,
        single_cycle,
        loop_delay,
        max_loops,
        total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::declaration::{Movement, PlaybackWindowSpec};
    use fxseq_animation_core::AnimationOptions;

    fn resolve_default(decl: &EffectDeclaration) -> ResolvedDurations {
        resolve(decl, &TimelineConfig::default()).unwrap()
    }

    #[test]
    fn media_is_scaled_by_playback_rate() {
        let mut decl = EffectDeclaration::default().with_media(3000.0);
        decl.playback_rate = 2.0;
        let d = resolve_default(&decl);
        assert_eq!(d.natural, 1500.0);
        assert_eq!(d.total, Some(1500.0));
    }

    #[test]
    fn explicit_duration_overrides_media() {
        let decl = EffectDeclaration::default()
            .with_media(3000.0)
            .with_duration(800.0);
        assert_eq!(resolve_default(&decl).natural, 800.0);
    }

    #[test]
    fn movement_speed_takes_the_longer_of_travel_and_explicit() {
        let mut decl = EffectDeclaration::default().with_duration(500.0);
        decl.movement = Some(Movement {
            distance: 300.0,
            speed: Some(200.0),
            delay: 100.0,
        });
        assert_eq!(resolve_default(&decl).natural, 1600.0);
        decl.explicit_duration = Some(2000.0);
        assert_eq!(resolve_default(&decl).natural, 2000.0);
    }

    #[test]
    fn static_effects_use_their_longest_part() {
        let decl = EffectDeclaration::default()
            .with_fade_in(PresetTiming::new(300.0))
            .with_fade_out(PresetTiming::new(400.0))
            .with_animation(
                "rotation",
                AnimationOptions::looping(vec![0.0, 90.0, 0.0], 250.0).with_loops(3),
            );
        // Loop: 2 segments * 250 ms * 3 passes.
        assert_eq!(resolve_default(&decl).natural, 1500.0);

        let bare = EffectDeclaration::default();
        assert_eq!(resolve_default(&bare).natural, 1000.0);

        let endless = EffectDeclaration::default()
            .with_animation("alpha", AnimationOptions::looping(vec![0.0, 1.0], 100.0));
        assert_eq!(resolve_default(&endless).natural, 1000.0);
    }

    #[test]
    fn window_is_clamped_to_natural() {
        let mut decl = EffectDeclaration::default().with_media(2000.0);
        decl.playback_window = PlaybackWindowSpec {
            start: Some(WindowBound::Fraction(0.25)),
            end: Some(WindowBound::Ms(9000.0)),
        };
        let d = resolve_default(&decl);
        assert_eq!(d.window, PlaybackWindow { start: 500.0, end: 2000.0 });
        assert_eq!(d.single_cycle, 1500.0);

        decl.playback_window.end = Some(WindowBound::Ms(100.0));
        let d = resolve_default(&decl);
        assert_eq!(d.window, PlaybackWindow { start: 500.0, end: 500.0 });
        assert!(d.window.is_empty());
    }

    #[test]
    fn loop_totals() {
        let decl = EffectDeclaration::default()
            .with_duration(1000.0)
            .with_loops(3)
            .with_loop_delay(200.0);
        let d = resolve_default(&decl);
        assert_eq!(d.total, Some(3400.0));
        assert_eq!(d.cycle_period(), 1200.0);

        let persistent = EffectDeclaration::default().with_duration(1000.0).persistent();
        let d = resolve_default(&persistent);
        assert_eq!(d.max_loops, None);
        assert!(d.is_endless());
        assert_eq!(d.total_or_infinite(), f64::INFINITY);

        let once = EffectDeclaration::default().with_duration(1000.0);
        assert_eq!(resolve_default(&once).max_loops, Some(1));
    }

    #[test]
    fn rejects_bad_numbers() {
        let mut decl = EffectDeclaration::default();
        decl.playback_rate = 0.0;
        assert!(resolve(&decl, &TimelineConfig::default()).is_err());
        let decl = EffectDeclaration::default().with_loops(0);
        assert!(resolve(&decl, &TimelineConfig::default()).is_err());
        let decl = EffectDeclaration::default().with_duration(f64::NAN);
        let err = resolve(&decl, &TimelineConfig::default()).unwrap_err();
        assert_eq!(err.category(), "declaration");
    }
}
