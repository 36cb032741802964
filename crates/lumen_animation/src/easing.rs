//! Easing functions for animations
//!
//! Easings parse from and print as the dotted names used in motion configs:
//! `"power3.out"`, `"expo.inOut"`, `"back.out(1.7)"`,
//! `"elastic.out(1, 0.3)"`. A bare family name such as `"power2"` means its
//! `.out` variant. `powerN` maps to the polynomial of degree N + 1.

use crate::error::AnimationError;
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;
use std::fmt;
use std::str::FromStr;

const TAU: f32 = 2.0 * PI;

/// Default overshoot for back easings
pub const BACK_OVERSHOOT: f32 = 1.70158;

/// Easing function type
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Easing {
    #[default]
    Linear,
    EaseInQuad,
    EaseOutQuad,
    EaseInOutQuad,
    EaseInCubic,
    EaseOutCubic,
    EaseInOutCubic,
    EaseInQuart,
    EaseOutQuart,
    EaseInOutQuart,
    EaseInQuint,
    EaseOutQuint,
    EaseInOutQuint,
    EaseInSine,
    EaseOutSine,
    EaseInOutSine,
    EaseInExpo,
    EaseOutExpo,
    EaseInOutExpo,
    EaseInCirc,
    EaseOutCirc,
    EaseInOutCirc,
    /// Pulls back before moving; the value is the overshoot
    BackIn(f32),
    /// Overshoots the end and settles back
    BackOut(f32),
    BackInOut(f32),
    ElasticIn { amplitude: f32, period: f32 },
    /// Springy release that oscillates around the end value
    ElasticOut { amplitude: f32, period: f32 },
    ElasticInOut { amplitude: f32, period: f32 },
    CubicBezier(f32, f32, f32, f32),
}

impl Easing {
    /// Apply the easing function to a progress value (0.0 to 1.0).
    ///
    /// Input is clamped. Back and elastic easings may return values outside
    /// `[0, 1]` between the endpoints.
    pub fn apply(&self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::EaseInQuad => t * t,
            Easing::EaseOutQuad => 1.0 - (1.0 - t) * (1.0 - t),
            Easing::EaseInOutQuad => in_out(t, |t| t * t),
            Easing::EaseInCubic => t * t * t,
            Easing::EaseOutCubic => 1.0 - (1.0 - t).powi(3),
            Easing::EaseInOutCubic => in_out(t, |t| t * t * t),
            Easing::EaseInQuart => t.powi(4),
            Easing::EaseOutQuart => 1.0 - (1.0 - t).powi(4),
            Easing::EaseInOutQuart => in_out(t, |t| t.powi(4)),
            Easing::EaseInQuint => t.powi(5),
            Easing::EaseOutQuint => 1.0 - (1.0 - t).powi(5),
            Easing::EaseInOutQuint => in_out(t, |t| t.powi(5)),
            Easing::EaseInSine => 1.0 - (t * PI / 2.0).cos(),
            Easing::EaseOutSine => (t * PI / 2.0).sin(),
            Easing::EaseInOutSine => -((PI * t).cos() - 1.0) / 2.0,
            Easing::EaseInExpo => expo_in(t),
            Easing::EaseOutExpo => 1.0 - expo_in(1.0 - t),
            Easing::EaseInOutExpo => in_out(t, expo_in),
            Easing::EaseInCirc => circ_in(t),
            Easing::EaseOutCirc => 1.0 - circ_in(1.0 - t),
            Easing::EaseInOutCirc => in_out(t, circ_in),
            Easing::BackIn(s) => back_in(t, *s),
            Easing::BackOut(s) => 1.0 - back_in(1.0 - t, *s),
            Easing::BackInOut(s) => in_out(t, |t| back_in(t, *s)),
            Easing::ElasticIn { amplitude, period } => {
                1.0 - elastic_out(1.0 - t, *amplitude, *period)
            }
            Easing::ElasticOut { amplitude, period } => elastic_out(t, *amplitude, *period),
            Easing::ElasticInOut { amplitude, period } => {
                in_out(t, |t| 1.0 - elastic_out(1.0 - t, *amplitude, *period))
            }
            Easing::CubicBezier(x1, y1, x2, y2) => cubic_bezier_ease(t, *x1, *y1, *x2, *y2),
        }
    }
}

/// Mirror an ease-in curve into an in-out curve
#[inline]
fn in_out(t: f32, ease_in: impl Fn(f32) -> f32) -> f32 {
    if t < 0.5 {
        ease_in(t * 2.0) / 2.0
    } else {
        1.0 - ease_in((1.0 - t) * 2.0) / 2.0
    }
}

#[inline]
fn expo_in(t: f32) -> f32 {
    if t <= 0.0 {
        0.0
    } else {
        2f32.powf(10.0 * t - 10.0)
    }
}

#[inline]
fn circ_in(t: f32) -> f32 {
    1.0 - (1.0 - t * t).max(0.0).sqrt()
}

#[inline]
fn back_in(t: f32, overshoot: f32) -> f32 {
    (overshoot + 1.0) * t * t * t - overshoot * t * t
}

/// Elastic release. Amplitudes below 1 are lifted to 1 and shorten the
/// period instead.
fn elastic_out(t: f32, amplitude: f32, period: f32) -> f32 {
    if t <= 0.0 {
        return 0.0;
    }
    if t >= 1.0 {
        return 1.0;
    }
    let a = amplitude.max(1.0);
    let period = period.max(f32::EPSILON) / amplitude.clamp(f32::EPSILON, 1.0);
    let shift = period / TAU * (1.0 / a).asin();
    a * 2f32.powf(-10.0 * t) * ((t - shift) * TAU / period).sin() + 1.0
}

/// Cubic bezier easing calculation (matches CSS `cubic-bezier()` timing functions).
///
/// Uses Newton-Raphson with binary-search fallback for robustness.
/// Computes in f64 internally to avoid f32 precision jitter at 120fps.
fn cubic_bezier_ease(t: f32, x1: f32, y1: f32, x2: f32, y2: f32) -> f32 {
    // Endpoints are always exact
    if t <= 0.0 {
        return 0.0;
    }
    if t >= 1.0 {
        return 1.0;
    }

    let x = t as f64;
    let x1 = x1 as f64;
    let y1 = y1 as f64;
    let x2 = x2 as f64;
    let y2 = y2 as f64;

    let mut p = x;
    for _ in 0..8 {
        let err = bezier_sample(p, x1, x2) - x;
        if err.abs() < 1e-7 {
            return bezier_sample(p, y1, y2) as f32;
        }
        let slope = bezier_slope(p, x1, x2);
        if slope.abs() < 1e-7 {
            break; // slope too flat, switch to binary search
        }
        p -= err / slope;
    }

    // Binary search fallback (always converges)
    let mut lo = 0.0_f64;
    let mut hi = 1.0_f64;
    p = x;
    for _ in 0..20 {
        let val = bezier_sample(p, x1, x2);
        if (val - x).abs() < 1e-7 {
            break;
        }
        if val < x {
            lo = p;
        } else {
            hi = p;
        }
        p = (lo + hi) * 0.5;
    }

    bezier_sample(p, y1, y2) as f32
}

/// Evaluate cubic bezier at parameter t: B(t) = 3(1-t)²t·p1 + 3(1-t)t²·p2 + t³
#[inline]
fn bezier_sample(t: f64, p1: f64, p2: f64) -> f64 {
    let a = 1.0 - 3.0 * p2 + 3.0 * p1;
    let b = 3.0 * p2 - 6.0 * p1;
    let c = 3.0 * p1;
    ((a * t + b) * t + c) * t
}

/// Derivative of cubic bezier
#[inline]
fn bezier_slope(t: f64, p1: f64, p2: f64) -> f64 {
    let a = 1.0 - 3.0 * p2 + 3.0 * p1;
    let b = 3.0 * p2 - 6.0 * p1;
    let c = 3.0 * p1;
    (3.0 * a * t + 2.0 * b) * t + c
}

// ============================================================================
// Names
// ============================================================================

#[derive(Clone, Copy)]
enum Direction {
    In,
    Out,
    InOut,
}

impl FromStr for Easing {
    type Err = AnimationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || AnimationError::UnknownEasing(s.to_string());
        let lower = s.trim().to_ascii_lowercase();
        if lower.is_empty() {
            return Err(unknown());
        }

        let (head, args) = match lower.find('(') {
            Some(open) => {
                let inner = lower[open + 1..].strip_suffix(')').ok_or_else(unknown)?;
                let args = inner
                    .split(',')
                    .map(|a| a.trim().parse::<f32>())
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|_| unknown())?;
                (&lower[..open], args)
            }
            None => (lower.as_str(), Vec::new()),
        };

        let (family, direction) = match head.split_once('.') {
            Some((family, "in")) => (family, Direction::In),
            Some((family, "out")) => (family, Direction::Out),
            Some((family, "inout")) => (family, Direction::InOut),
            Some(_) => return Err(unknown()),
            None => (head, Direction::Out),
        };

        let pick = |i: Easing, o: Easing, io: Easing| match direction {
            Direction::In => i,
            Direction::Out => o,
            Direction::InOut => io,
        };

        let easing = match family {
            "none" | "linear" => Easing::Linear,
            "power1" | "quad" => {
                pick(Easing::EaseInQuad, Easing::EaseOutQuad, Easing::EaseInOutQuad)
            }
            "power2" | "cubic" => {
                pick(Easing::EaseInCubic, Easing::EaseOutCubic, Easing::EaseInOutCubic)
            }
            "power3" | "quart" => {
                pick(Easing::EaseInQuart, Easing::EaseOutQuart, Easing::EaseInOutQuart)
            }
            "power4" | "quint" | "strong" => {
                pick(Easing::EaseInQuint, Easing::EaseOutQuint, Easing::EaseInOutQuint)
            }
            "sine" => pick(Easing::EaseInSine, Easing::EaseOutSine, Easing::EaseInOutSine),
            "expo" => pick(Easing::EaseInExpo, Easing::EaseOutExpo, Easing::EaseInOutExpo),
            "circ" => pick(Easing::EaseInCirc, Easing::EaseOutCirc, Easing::EaseInOutCirc),
            "back" => {
                let s = args.first().copied().unwrap_or(BACK_OVERSHOOT);
                pick(Easing::BackIn(s), Easing::BackOut(s), Easing::BackInOut(s))
            }
            "elastic" => {
                let amplitude = args.first().copied().unwrap_or(1.0);
                let period = args.get(1).copied().unwrap_or(0.3);
                pick(
                    Easing::ElasticIn { amplitude, period },
                    Easing::ElasticOut { amplitude, period },
                    Easing::ElasticInOut { amplitude, period },
                )
            }
            "cubicbezier" | "cubic-bezier" => match args.as_slice() {
                [x1, y1, x2, y2] => Easing::CubicBezier(*x1, *y1, *x2, *y2),
                _ => return Err(unknown()),
            },
            _ => return Err(unknown()),
        };
        Ok(easing)
    }
}

impl fmt::Display for Easing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Easing::Linear => f.write_str("none"),
            Easing::EaseInQuad => f.write_str("power1.in"),
            Easing::EaseOutQuad => f.write_str("power1.out"),
            Easing::EaseInOutQuad => f.write_str("power1.inOut"),
            Easing::EaseInCubic => f.write_str("power2.in"),
            Easing::EaseOutCubic => f.write_str("power2.out"),
            Easing::EaseInOutCubic => f.write_str("power2.inOut"),
            Easing::EaseInQuart => f.write_str("power3.in"),
            Easing::EaseOutQuart => f.write_str("power3.out"),
            Easing::EaseInOutQuart => f.write_str("power3.inOut"),
            Easing::EaseInQuint => f.write_str("power4.in"),
            Easing::EaseOutQuint => f.write_str("power4.out"),
            Easing::EaseInOutQuint => f.write_str("power4.inOut"),
            Easing::EaseInSine => f.write_str("sine.in"),
            Easing::EaseOutSine => f.write_str("sine.out"),
            Easing::EaseInOutSine => f.write_str("sine.inOut"),
            Easing::EaseInExpo => f.write_str("expo.in"),
            Easing::EaseOutExpo => f.write_str("expo.out"),
            Easing::EaseInOutExpo => f.write_str("expo.inOut"),
            Easing::EaseInCirc => f.write_str("circ.in"),
            Easing::EaseOutCirc => f.write_str("circ.out"),
            Easing::EaseInOutCirc => f.write_str("circ.inOut"),
            Easing::BackIn(s) => write!(f, "back.in({s})"),
            Easing::BackOut(s) => write!(f, "back.out({s})"),
            Easing::BackInOut(s) => write!(f, "back.inOut({s})"),
            Easing::ElasticIn { amplitude, period } => {
                write!(f, "elastic.in({amplitude}, {period})")
            }
            Easing::ElasticOut { amplitude, period } => {
                write!(f, "elastic.out({amplitude}, {period})")
            }
            Easing::ElasticInOut { amplitude, period } => {
                write!(f, "elastic.inOut({amplitude}, {period})")
            }
            Easing::CubicBezier(x1, y1, x2, y2) => write!(f, "cubicBezier({x1}, {y1}, {x2}, {y2})"),
        }
    }
}

impl TryFrom<String> for Easing {
    type Error = AnimationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Easing> for String {
    fn from(easing: Easing) -> Self {
        easing.to_string()
    }
}
