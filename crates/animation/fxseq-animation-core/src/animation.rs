//! Property animation descriptions and their per-frame evaluation.
//!
//! A [`PropertyAnimation`] is built from [`AnimationOptions`] through
//! [`PropertyAnimation::new`], which validates and normalizes everything that
//! can be checked before the animation is scheduled. What can only be known
//! at schedule time (a missing `from`, the first value of a single-value loop)
//! is resolved against the key's canonical value on first evaluation.

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::ValidationError;
use crate::ids::{AnimationId, TargetId};
use crate::interp::Easing;
use crate::target::PropertyPath;

/// Property paths that accept grid-unit scaling.
pub const GRID_UNIT_PATHS: [&str; 6] = [
    "position.x",
    "position.y",
    "scale.x",
    "scale.y",
    "width",
    "height",
];

/// How an animation's output combines with the canonical property value.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompositionMode {
    /// The computed value replaces the canonical value outright.
    #[default]
    Absolute,
    /// The change in the computed value since last frame is added on top.
    Relative,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum AnimationShape {
    OneShot {
        from: Option<f64>,
        to: f64,
    },
    Loop {
        values: Vec<f64>,
        /// Number of passes over `values`; `None` loops indefinitely.
        loops: Option<u32>,
        ping_pong: bool,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Timing {
    /// One-shot: total duration. Loop: duration of one segment between values.
    pub duration: f64,
    pub delay: f64,
    pub easing: Easing,
    /// Portion of this animation's timeline already elapsed when it was
    /// scheduled (catch-up for late observers).
    pub elapsed_before_start: f64,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnimationState {
    #[default]
    Pending,
    Running,
    /// Produced its final value this tick; becomes `Complete` once written.
    Finishing,
    Complete,
}

/// User-facing options accepted by [`PropertyAnimation::new`]. Also the
/// serialized form of a custom animation in an effect declaration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationOptions {
    pub mode: CompositionMode,
    pub from: Option<f64>,
    pub to: Option<f64>,
    pub values: Option<Vec<f64>>,
    pub looping: bool,
    pub loops: Option<u32>,
    pub ping_pong: bool,
    pub duration: f64,
    pub delay: f64,
    /// Easing identifier; `None` means linear.
    pub ease: Option<String>,
    pub grid_units: bool,
    pub elapsed_before_start: f64,
}

impl AnimationOptions {
    /// One-shot towards `to` over `duration` ms.
    pub fn to(to: f64, duration: f64) -> Self {
        Self {
            to: Some(to),
            duration,
            ..Self::default()
        }
    }

    /// Loop through `values`, `duration` ms per segment.
    pub fn looping(values: Vec<f64>, duration: f64) -> Self {
        Self {
            values: Some(values),
            looping: true,
            duration,
            ..Self::default()
        }
    }

    pub fn with_from(mut self, from: f64) -> Self {
        self.from = Some(from);
        self
    }
    pub fn with_mode(mut self, mode: CompositionMode) -> Self {
        self.mode = mode;
        self
    }
    pub fn relative(self) -> Self {
        self.with_mode(CompositionMode::Relative)
    }
    pub fn with_delay(mut self, delay: f64) -> Self {
        self.delay = delay;
        self
    }
    pub fn with_ease(mut self, ease: impl Into<String>) -> Self {
        self.ease = Some(ease.into());
        self
    }
    pub fn with_loops(mut self, loops: u32) -> Self {
        self.loops = Some(loops);
        self
    }
    pub fn with_ping_pong(mut self) -> Self {
        self.ping_pong = true;
        self
    }
    pub fn with_grid_units(mut self) -> Self {
        self.grid_units = true;
        self
    }
    pub fn with_elapsed_before_start(mut self, elapsed: f64) -> Self {
        self.elapsed_before_start = elapsed;
        self
    }
}

fn finite(field: &str, v: f64) -> Result<f64, ValidationError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(ValidationError::NonFinite {
            field: field.to_string(),
        })
    }
}

fn non_negative(field: &str, v: f64) -> Result<f64, ValidationError> {
    let v = finite(field, v)?;
    if v < 0.0 {
        return Err(ValidationError::Negative {
            field: field.to_string(),
            value: v,
        });
    }
    Ok(v)
}

/// Value produced by one evaluation, before composition.
#[derive(Copy, Clone, Debug, PartialEq)]
pub(crate) struct Sample {
    pub value: f64,
    pub finished: bool,
}

/// Position inside a loop, derived purely from local time.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopCursor {
    pub index: usize,
    pub next_index: usize,
    /// Completed passes over the value list.
    pub loops_done: u64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PropertyAnimation {
    pub target: TargetId,
    pub path: PropertyPath,
    pub mode: CompositionMode,
    pub shape: AnimationShape,
    pub timing: Timing,
    state: AnimationState,
    id: Option<AnimationId>,
    previous_value: f64,
    cursor: LoopCursor,
}

impl PropertyAnimation {
    /// Validate `options` and build a normalized animation for `path` on `target`.
    pub fn new(
        target: TargetId,
        path: &str,
        options: AnimationOptions,
        config: &Config,
    ) -> Result<Self, ValidationError> {
        let path = PropertyPath::parse(path)?;

        let duration = non_negative("duration", options.duration)?;
        let delay = non_negative("delay", options.delay)?;
        let elapsed_before_start =
            non_negative("elapsed_before_start", options.elapsed_before_start)?;
        let easing = match options.ease.as_deref() {
            None => Easing::Linear,
            Some(name) => name.parse()?,
        };

        let scale = if options.grid_units {
            if !GRID_UNIT_PATHS.contains(&path.as_str()) {
                return Err(ValidationError::GridUnitsNotAllowed {
                    path: path.to_string(),
                });
            }
            config.grid_size
        } else {
            1.0
        };

        let shape = if options.looping {
            let values = options
                .values
                .filter(|v| !v.is_empty())
                .ok_or(ValidationError::MissingValues)?;
            let values = values
                .into_iter()
                .map(|v| finite("values", v).map(|v| v * scale))
                .collect::<Result<Vec<_>, _>>()?;
            if duration <= 0.0 {
                return Err(ValidationError::ZeroLoopDuration);
            }
            if options.loops == Some(0) {
                return Err(ValidationError::InvalidLoopCount);
            }
            AnimationShape::Loop {
                values,
                loops: options.loops,
                ping_pong: options.ping_pong,
            }
        } else {
            let to = finite("to", options.to.ok_or(ValidationError::MissingTo)?)? * scale;
            let from = options
                .from
                .map(|f| finite("from", f).map(|f| f * scale))
                .transpose()?;
            AnimationShape::OneShot { from, to }
        };

        Ok(Self {
            target,
            path,
            mode: options.mode,
            shape,
            timing: Timing {
                duration,
                delay,
                easing,
                elapsed_before_start,
            },
            state: AnimationState::Pending,
            id: None,
            previous_value: 0.0,
            cursor: LoopCursor::default(),
        })
    }

    #[inline]
    pub fn state(&self) -> AnimationState {
        self.state
    }

    #[inline]
    pub fn is_complete(&self) -> bool {
        self.state == AnimationState::Complete
    }

    #[inline]
    pub fn is_absolute(&self) -> bool {
        self.mode == CompositionMode::Absolute
    }

    /// Identifier assigned by the scheduler on submission.
    #[inline]
    pub fn id(&self) -> Option<AnimationId> {
        self.id
    }

    /// Current loop position (loops only; default for one-shots).
    #[inline]
    pub fn cursor(&self) -> LoopCursor {
        self.cursor
    }

    pub(crate) fn assign_id(&mut self, id: AnimationId) {
        self.id = Some(id);
    }

    pub(crate) fn set_state(&mut self, state: AnimationState) {
        self.state = state;
    }

    pub(crate) fn previous_value(&self) -> f64 {
        self.previous_value
    }

    pub(crate) fn set_previous_value(&mut self, v: f64) {
        self.previous_value = v;
    }

    /// Position on this animation's own timeline given the batch's elapsed wall time.
    #[inline]
    pub(crate) fn timeline_position(&self, batch_elapsed: f64) -> f64 {
        self.timing.elapsed_before_start + batch_elapsed
    }

    /// Resolve schedule-time defaults on first evaluation. `canonical` is the
    /// key's current value, `baseline` its last absolute value.
    pub(crate) fn begin(&mut self, canonical: f64, baseline: f64) {
        match &mut self.shape {
            AnimationShape::OneShot { from, .. } => {
                let start = match (*from, self.mode) {
                    (Some(f), _) => f,
                    (None, CompositionMode::Absolute) => baseline,
                    (None, CompositionMode::Relative) => canonical,
                };
                // An explicit relative `from` is an offset applied on the
                // first frame, so the contribution tracks the curve itself.
                self.previous_value = match (from.is_some(), self.mode) {
                    (true, CompositionMode::Relative) => 0.0,
                    _ => start,
                };
                *from = Some(start);
            }
            AnimationShape::Loop { values, .. } => {
                if values.len() < 2 {
                    values.insert(0, canonical);
                }
                self.previous_value = values[0];
            }
        }
        self.state = AnimationState::Running;
    }

    /// Evaluate at `local` ms since the animation's delay elapsed.
    pub(crate) fn sample(&mut self, local: f64) -> Sample {
        let easing = self.timing.easing;
        let duration = self.timing.duration;
        match &self.shape {
            AnimationShape::OneShot { from, to } => {
                let from = from.unwrap_or(*to);
                let progress = if duration <= 0.0 {
                    1.0
                } else {
                    (local / duration).clamp(0.0, 1.0)
                };
                if progress >= 1.0 {
                    Sample {
                        value: *to,
                        finished: true,
                    }
                } else {
                    Sample {
                        value: easing.interpolate(from, *to, progress),
                        finished: false,
                    }
                }
            }
            AnimationShape::Loop {
                values,
                loops,
                ping_pong,
            } => {
                let (sample, cursor) =
                    sample_loop(values, duration, *loops, *ping_pong, easing, local);
                self.cursor = cursor;
                sample
            }
        }
    }
}

/// Loop evaluation as a pure function of local time.
///
/// A pass walks `values` once (`n - 1` segments). Without ping-pong every pass
/// runs forward; with ping-pong passes alternate direction.
fn sample_loop(
    values: &[f64],
    segment: f64,
    loops: Option<u32>,
    ping_pong: bool,
    easing: Easing,
    local: f64,
) -> (Sample, LoopCursor) {
    let n = values.len();
    if n < 2 || segment <= 0.0 {
        let value = values.first().copied().unwrap_or(0.0);
        return (
            Sample {
                value,
                finished: true,
            },
            LoopCursor::default(),
        );
    }
    let per_pass = (n - 1) as u64;
    let local = local.max(0.0);
    let segments_done = (local / segment).floor() as u64;

    if let Some(loops) = loops {
        let total = u64::from(loops) * per_pass;
        if segments_done >= total {
            let last_pass = u64::from(loops) - 1;
            let ends_forward = !ping_pong || last_pass % 2 == 0;
            let (index, next_index) = if ends_forward { (n - 2, n - 1) } else { (1, 0) };
            return (
                Sample {
                    value: values[next_index],
                    finished: true,
                },
                LoopCursor {
                    index,
                    next_index,
                    loops_done: u64::from(loops),
                },
            );
        }
    }

    let pass = segments_done / per_pass;
    let within = (segments_done % per_pass) as usize;
    let forward = !ping_pong || pass % 2 == 0;
    let (index, next_index) = if forward {
        (within, within + 1)
    } else {
        (n - 1 - within, n - 2 - within)
    };
    let phase = (local - segments_done as f64 * segment) / segment;
    (
        Sample {
            value: easing.interpolate(values[index], values[next_index], phase),
            finished: false,
        },
        LoopCursor {
            index,
            next_index,
            loops_done: pass,
        },
    )
}
