//! Interpolation helpers:
//! - lerp (scalar)
//! - ease_in / ease_out / ease_in_out for each [`EasingCurve`]

use std::f64::consts::PI;

use super::EasingCurve;

const BACK_C1: f64 = 1.70158;
const BACK_C2: f64 = BACK_C1 * 1.525;
const BACK_C3: f64 = BACK_C1 + 1.0;
const ELASTIC_C4: f64 = (2.0 * PI) / 3.0;
const ELASTIC_C5: f64 = (2.0 * PI) / 4.5;

/// Linear interpolation of scalars.
#[inline]
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

#[inline]
fn power(curve: EasingCurve) -> Option<i32> {
    match curve {
        EasingCurve::Quad => Some(2),
        EasingCurve::Cubic => Some(3),
        EasingCurve::Quart => Some(4),
        EasingCurve::Quint => Some(5),
        _ => None,
    }
}

fn bounce_out(t: f64) -> f64 {
    const N1: f64 = 7.5625;
    const D1: f64 = 2.75;
    if t < 1.0 / D1 {
        N1 * t * t
    } else if t < 2.0 / D1 {
        let t = t - 1.5 / D1;
        N1 * t * t + 0.75
    } else if t < 2.5 / D1 {
        let t = t - 2.25 / D1;
        N1 * t * t + 0.9375
    } else {
        let t = t - 2.625 / D1;
        N1 * t * t + 0.984375
    }
}

pub fn ease_in(curve: EasingCurve, t: f64) -> f64 {
    if let Some(n) = power(curve) {
        return t.powi(n);
    }
    match curve {
        EasingCurve::Sine => 1.0 - (t * PI / 2.0).cos(),
        EasingCurve::Expo => {
            if t == 0.0 {
                0.0
            } else {
                2f64.powf(10.0 * t - 10.0)
            }
        }
        EasingCurve::Circ => 1.0 - (1.0 - t * t).sqrt(),
        EasingCurve::Back => BACK_C3 * t * t * t - BACK_C1 * t * t,
        EasingCurve::Elastic => {
            if t == 0.0 || t == 1.0 {
                t
            } else {
                -(2f64.powf(10.0 * t - 10.0)) * ((t * 10.0 - 10.75) * ELASTIC_C4).sin()
            }
        }
        EasingCurve::Bounce => 1.0 - bounce_out(1.0 - t),
        _ => unreachable!("power curves handled above"),
    }
}

pub fn ease_out(curve: EasingCurve, t: f64) -> f64 {
    if let Some(n) = power(curve) {
        return 1.0 - (1.0 - t).powi(n);
    }
    match curve {
        EasingCurve::Sine => (t * PI / 2.0).sin(),
        EasingCurve::Expo => {
            if t == 1.0 {
                1.0
            } else {
                1.0 - 2f64.powf(-10.0 * t)
            }
        }
        EasingCurve::Circ => (1.0 - (t - 1.0) * (t - 1.0)).sqrt(),
        EasingCurve::Back => {
            let p = t - 1.0;
            1.0 + BACK_C3 * p * p * p + BACK_C1 * p * p
        }
        EasingCurve::Elastic => {
            if t == 0.0 || t == 1.0 {
                t
            } else {
                2f64.powf(-10.0 * t) * ((t * 10.0 - 0.75) * ELASTIC_C4).sin() + 1.0
            }
        }
        EasingCurve::Bounce => bounce_out(t),
        _ => unreachable!("power curves handled above"),
    }
}

pub fn ease_in_out(curve: EasingCurve, t: f64) -> f64 {
    if let Some(n) = power(curve) {
        return if t < 0.5 {
            2f64.powi(n - 1) * t.powi(n)
        } else {
            1.0 - (-2.0 * t + 2.0).powi(n) / 2.0
        };
    }
    match curve {
        EasingCurve::Sine => -((PI * t).cos() - 1.0) / 2.0,
        EasingCurve::Expo => {
            if t == 0.0 || t == 1.0 {
                t
            } else if t < 0.5 {
                2f64.powf(20.0 * t - 10.0) / 2.0
            } else {
                (2.0 - 2f64.powf(-20.0 * t + 10.0)) / 2.0
            }
        }
        EasingCurve::Circ => {
            if t < 0.5 {
                (1.0 - (1.0 - (2.0 * t).powi(2)).sqrt()) / 2.0
            } else {
                ((1.0 - (-2.0 * t + 2.0).powi(2)).sqrt() + 1.0) / 2.0
            }
        }
        EasingCurve::Back => {
            if t < 0.5 {
                ((2.0 * t).powi(2) * ((BACK_C2 + 1.0) * 2.0 * t - BACK_C2)) / 2.0
            } else {
                ((2.0 * t - 2.0).powi(2) * ((BACK_C2 + 1.0) * (t * 2.0 - 2.0) + BACK_C2) + 2.0)
                    / 2.0
            }
        }
        EasingCurve::Elastic => {
            if t == 0.0 || t == 1.0 {
                t
            } else if t < 0.5 {
                -(2f64.powf(20.0 * t - 10.0) * ((20.0 * t - 11.125) * ELASTIC_C5).sin()) / 2.0
            } else {
                (2f64.powf(-20.0 * t + 10.0) * ((20.0 * t - 11.125) * ELASTIC_C5).sin()) / 2.0
                    + 1.0
            }
        }
        EasingCurve::Bounce => {
            if t < 0.5 {
                (1.0 - bounce_out(1.0 - 2.0 * t)) / 2.0
            } else {
                (1.0 + bounce_out(2.0 * t - 1.0)) / 2.0
            }
        }
        _ => unreachable!("power curves handled above"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lerp_endpoints_and_midpoint() {
        assert_eq!(lerp(2.0, 4.0, 0.0), 2.0);
        assert_eq!(lerp(2.0, 4.0, 1.0), 4.0);
        assert_eq!(lerp(2.0, 4.0, 0.5), 3.0);
    }

    #[test]
    fn quadratic_shapes() {
        assert!((ease_in(EasingCurve::Quad, 0.5) - 0.25).abs() < 1e-12);
        assert!((ease_out(EasingCurve::Quad, 0.5) - 0.75).abs() < 1e-12);
        assert!((ease_in_out(EasingCurve::Quad, 0.5) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn back_overshoots_below_zero() {
        assert!(ease_in(EasingCurve::Back, 0.2) < 0.0);
    }
}
