use crate::{
    animation::ease::Easing,
    animation::value::{Value, ValueKind},
    foundation::error::{TrellisError, TrellisResult},
};

/// One anchor of an animated parameter.
///
/// `easing` shapes the interval that *ends* at this keyframe, so the first keyframe's easing
/// never takes effect.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Keyframe {
    /// Scene time in seconds, `>= 0`.
    pub time: f64,
    pub value: Value,
    #[serde(default, skip_serializing_if = "is_linear")]
    pub easing: Easing,
}

fn is_linear(e: &Easing) -> bool {
    *e == Easing::Linear
}

impl Keyframe {
    pub fn new(time: f64, value: impl Into<Value>) -> Self {
        Self {
            time,
            value: value.into(),
            easing: Easing::Linear,
        }
    }

    pub fn eased(time: f64, value: impl Into<Value>, easing: Easing) -> Self {
        Self {
            time,
            value: value.into(),
            easing,
        }
    }
}

/// Validated keyframe sequence with a fixed payload kind.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "Vec<Keyframe>", into = "Vec<Keyframe>")]
pub struct AnimatedParam {
    keys: Vec<Keyframe>,
    kind: ValueKind,
}

impl AnimatedParam {
    /// Build a parameter, rejecting empty, unordered, or heterogeneous keyframes.
    pub fn new(keys: Vec<Keyframe>) -> TrellisResult<Self> {
        let Some(first) = keys.first() else {
            return Err(TrellisError::animation(
                "animated parameter needs at least one keyframe",
            ));
        };
        let kind = first.value.kind();
        if !kind.is_animatable() {
            return Err(TrellisError::animation(format!(
                "{kind} values cannot be animated"
            )));
        }
        let buffer_len = first.value.as_buffer().map(<[f32]>::len);
        if buffer_len == Some(0) {
            return Err(TrellisError::animation(
                "animated buffer keyframes must not be empty",
            ));
        }

        for (i, k) in keys.iter().enumerate() {
            if !k.time.is_finite() || k.time < 0.0 {
                return Err(TrellisError::animation(format!(
                    "keyframe {i} time must be finite and >= 0 (got {})",
                    k.time
                )));
            }
            if k.value.kind() != kind {
                return Err(TrellisError::animation(format!(
                    "keyframe {i} holds a {} value, expected {kind}",
                    k.value.kind()
                )));
            }
            if let Some(expected) = buffer_len
                && k.value.as_buffer().map(<[f32]>::len) != Some(expected)
            {
                return Err(TrellisError::animation(format!(
                    "keyframe {i} buffer length differs from keyframe 0 ({expected} elements)"
                )));
            }
        }
        if let Some(i) = keys.windows(2).position(|w| w[0].time >= w[1].time) {
            return Err(TrellisError::animation(format!(
                "keyframe times must be strictly increasing (keyframe {} at {} follows {})",
                i + 1,
                keys[i + 1].time,
                keys[i].time
            )));
        }

        Ok(Self { keys, kind })
    }

    pub fn keyframes(&self) -> &[Keyframe] {
        &self.keys
    }

    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    /// Element count of buffer payloads; `None` for other kinds.
    pub fn buffer_len(&self) -> Option<usize> {
        self.keys[0].value.as_buffer().map(<[f32]>::len)
    }

    /// Value at scene time `t`, clamped to the first and last keyframes.
    ///
    /// Never fails: non-finite `t` yields the first keyframe's value.
    pub fn evaluate(&self, t: f64) -> Value {
        let idx = self.keys.partition_point(|k| k.time <= t);
        if idx == 0 {
            return self.keys[0].value.clone();
        }
        if idx >= self.keys.len() {
            return self.keys[self.keys.len() - 1].value.clone();
        }

        let a = &self.keys[idx - 1];
        let b = &self.keys[idx];
        let span = b.time - a.time;
        if span <= 0.0 {
            return a.value.clone();
        }
        let f = b.easing.apply((t - a.time) / span);
        Value::mix(&a.value, &b.value, f).unwrap_or_else(|| a.value.clone())
    }
}

impl TryFrom<Vec<Keyframe>> for AnimatedParam {
    type Error = TrellisError;

    fn try_from(keys: Vec<Keyframe>) -> Result<Self, Self::Error> {
        Self::new(keys)
    }
}

impl From<AnimatedParam> for Vec<Keyframe> {
    fn from(p: AnimatedParam) -> Self {
        p.keys
    }
}

/// A node parameter: either a fixed value or keyframed over time.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Param {
    Constant(Value),
    Animated(AnimatedParam),
}

impl Param {
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Constant(v) => v.kind(),
            Self::Animated(a) => a.kind(),
        }
    }

    pub fn is_animated(&self) -> bool {
        matches!(self, Self::Animated(_))
    }

    pub fn evaluate(&self, t: f64) -> Value {
        match self {
            Self::Constant(v) => v.clone(),
            Self::Animated(a) => a.evaluate(t),
        }
    }

    /// Error unless the payload is of `kind`.
    pub fn expect_kind(&self, kind: ValueKind, what: &str) -> TrellisResult<()> {
        if self.kind() != kind {
            return Err(TrellisError::construction(format!(
                "{what} must be a {kind} parameter (got {})",
                self.kind()
            )));
        }
        Ok(())
    }
}

macro_rules! constant_param_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Param {
                fn from(v: $ty) -> Self {
                    Self::Constant(v.into())
                }
            }
        )*
    };
}

constant_param_from!(
    Value,
    f64,
    crate::foundation::core::Vec2,
    crate::foundation::core::Vec3,
    crate::foundation::core::Vec4,
    crate::foundation::core::Quat,
    i32,
    crate::foundation::core::Mat4,
);

impl From<AnimatedParam> for Param {
    fn from(a: AnimatedParam) -> Self {
        Self::Animated(a)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/keyframes.rs"]
mod tests;
