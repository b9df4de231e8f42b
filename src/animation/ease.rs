use std::f64::consts::{FRAC_PI_2, PI};

/// Easing functions used to shape the progress between two keyframes.
///
/// Families come in four directions: `*In` accelerates from rest, `*Out` decelerates into the
/// destination, `*InOut` does both, `*OutIn` decelerates to the midpoint then accelerates away.
/// Every easing maps `0 -> 0` and `1 -> 1`.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Easing {
    #[default]
    Linear,
    QuadraticIn,
    QuadraticOut,
    QuadraticInOut,
    QuadraticOutIn,
    CubicIn,
    CubicOut,
    CubicInOut,
    CubicOutIn,
    QuarticIn,
    QuarticOut,
    QuarticInOut,
    QuarticOutIn,
    QuinticIn,
    QuinticOut,
    QuinticInOut,
    QuinticOutIn,
    SinusIn,
    SinusOut,
    SinusInOut,
    SinusOutIn,
    ExpIn,
    ExpOut,
    ExpInOut,
    ExpOutIn,
    CircularIn,
    CircularOut,
    CircularInOut,
    CircularOutIn,
    BounceIn,
    BounceOut,
    ElasticIn,
    ElasticOut,
    BackIn,
    BackOut,
    BackInOut,
}

impl Easing {
    /// Every easing, in declaration order.
    pub const ALL: [Easing; 36] = [
        Self::Linear,
        Self::QuadraticIn,
        Self::QuadraticOut,
        Self::QuadraticInOut,
        Self::QuadraticOutIn,
        Self::CubicIn,
        Self::CubicOut,
        Self::CubicInOut,
        Self::CubicOutIn,
        Self::QuarticIn,
        Self::QuarticOut,
        Self::QuarticInOut,
        Self::QuarticOutIn,
        Self::QuinticIn,
        Self::QuinticOut,
        Self::QuinticInOut,
        Self::QuinticOutIn,
        Self::SinusIn,
        Self::SinusOut,
        Self::SinusInOut,
        Self::SinusOutIn,
        Self::ExpIn,
        Self::ExpOut,
        Self::ExpInOut,
        Self::ExpOutIn,
        Self::CircularIn,
        Self::CircularOut,
        Self::CircularInOut,
        Self::CircularOutIn,
        Self::BounceIn,
        Self::BounceOut,
        Self::ElasticIn,
        Self::ElasticOut,
        Self::BackIn,
        Self::BackOut,
        Self::BackInOut,
    ];

    /// Apply this easing to normalized progress `t`, clamped to `[0, 1]`.
    pub fn apply(self, t: f64) -> f64 {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        match self {
            Self::Linear => t,
            Self::QuadraticIn => quadratic(t),
            Self::QuadraticOut => out(quadratic, t),
            Self::QuadraticInOut => in_out(quadratic, t),
            Self::QuadraticOutIn => out_in(quadratic, t),
            Self::CubicIn => cubic(t),
            Self::CubicOut => out(cubic, t),
            Self::CubicInOut => in_out(cubic, t),
            Self::CubicOutIn => out_in(cubic, t),
            Self::QuarticIn => quartic(t),
            Self::QuarticOut => out(quartic, t),
            Self::QuarticInOut => in_out(quartic, t),
            Self::QuarticOutIn => out_in(quartic, t),
            Self::QuinticIn => quintic(t),
            Self::QuinticOut => out(quintic, t),
            Self::QuinticInOut => in_out(quintic, t),
            Self::QuinticOutIn => out_in(quintic, t),
            Self::SinusIn => sinus(t),
            Self::SinusOut => out(sinus, t),
            Self::SinusInOut => in_out(sinus, t),
            Self::SinusOutIn => out_in(sinus, t),
            Self::ExpIn => exp(t),
            Self::ExpOut => out(exp, t),
            Self::ExpInOut => in_out(exp, t),
            Self::ExpOutIn => out_in(exp, t),
            Self::CircularIn => circular(t),
            Self::CircularOut => out(circular, t),
            Self::CircularInOut => in_out(circular, t),
            Self::CircularOutIn => out_in(circular, t),
            Self::BounceIn => out(bounce_out, t),
            Self::BounceOut => bounce_out(t),
            Self::ElasticIn => elastic(t),
            Self::ElasticOut => out(elastic, t),
            Self::BackIn => back(t),
            Self::BackOut => out(back, t),
            Self::BackInOut => in_out(back, t),
        }
    }

    /// `true` for easings whose output never leaves `[0, 1]` and never decreases.
    pub fn is_monotonic(self) -> bool {
        !matches!(
            self,
            Self::BounceIn
                | Self::BounceOut
                | Self::ElasticIn
                | Self::ElasticOut
                | Self::BackIn
                | Self::BackOut
                | Self::BackInOut
        )
    }
}

fn out(f: fn(f64) -> f64, t: f64) -> f64 {
    1.0 - f(1.0 - t)
}

fn in_out(f: fn(f64) -> f64, t: f64) -> f64 {
    if t < 0.5 {
        f(2.0 * t) / 2.0
    } else {
        1.0 - f(2.0 - 2.0 * t) / 2.0
    }
}

fn out_in(f: fn(f64) -> f64, t: f64) -> f64 {
    if t < 0.5 {
        out(f, 2.0 * t) / 2.0
    } else {
        0.5 + f(2.0 * t - 1.0) / 2.0
    }
}

fn quadratic(t: f64) -> f64 {
    t * t
}

fn cubic(t: f64) -> f64 {
    t * t * t
}

fn quartic(t: f64) -> f64 {
    t.powi(4)
}

fn quintic(t: f64) -> f64 {
    t.powi(5)
}

fn sinus(t: f64) -> f64 {
    1.0 - (t * FRAC_PI_2).cos()
}

fn exp(t: f64) -> f64 {
    // Base 1024, rescaled so both endpoints are exact.
    (1024f64.powf(t) - 1.0) / 1023.0
}

fn circular(t: f64) -> f64 {
    1.0 - (1.0 - t * t).max(0.0).sqrt()
}

fn bounce_out(t: f64) -> f64 {
    const N: f64 = 7.5625;
    const D: f64 = 2.75;
    if t < 1.0 / D {
        N * t * t
    } else if t < 2.0 / D {
        let t = t - 1.5 / D;
        N * t * t + 0.75
    } else if t < 2.5 / D {
        let t = t - 2.25 / D;
        N * t * t + 0.9375
    } else {
        let t = t - 2.625 / D;
        N * t * t + 0.984375
    }
}

fn elastic(t: f64) -> f64 {
    const PERIOD: f64 = 0.3;
    if t <= 0.0 {
        return 0.0;
    }
    if t >= 1.0 {
        return 1.0;
    }
    let s = PERIOD / 4.0;
    let t = t - 1.0;
    -(2f64.powf(10.0 * t)) * ((t - s) * (2.0 * PI) / PERIOD).sin()
}

fn back(t: f64) -> f64 {
    const S: f64 = 1.70158;
    t * t * ((S + 1.0) * t - S)
}

#[cfg(test)]
#[path = "../../tests/unit/animation/ease.rs"]
mod tests;
