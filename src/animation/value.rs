use crate::foundation::core::{Mat4, Quat, Vec2, Vec3, Vec4};

/// Interpolation contract for animated payloads.
pub trait Lerp: Sized {
    /// Interpolate from `a` to `b` with normalized factor `t` in `[0, 1]`.
    fn lerp(a: &Self, b: &Self, t: f64) -> Self;
}

impl Lerp for f64 {
    fn lerp(a: &Self, b: &Self, t: f64) -> Self {
        a + (b - a) * t
    }
}

impl Lerp for f32 {
    fn lerp(a: &Self, b: &Self, t: f64) -> Self {
        (*a as f64 + ((*b as f64 - *a as f64) * t)) as f32
    }
}

impl Lerp for Vec2 {
    fn lerp(a: &Self, b: &Self, t: f64) -> Self {
        a.lerp(*b, t as f32)
    }
}

impl Lerp for Vec3 {
    fn lerp(a: &Self, b: &Self, t: f64) -> Self {
        a.lerp(*b, t as f32)
    }
}

impl Lerp for Vec4 {
    fn lerp(a: &Self, b: &Self, t: f64) -> Self {
        a.lerp(*b, t as f32)
    }
}

impl Lerp for Quat {
    fn lerp(a: &Self, b: &Self, t: f64) -> Self {
        slerp_shortest(*a, *b, t as f32)
    }
}

/// Spherical interpolation along the shorter of the two arcs between `a` and `b`.
/// The endpoints come back unchanged at `t = 0` and `t = 1`.
pub fn slerp_shortest(a: Quat, b: Quat, t: f32) -> Quat {
    if t <= 0.0 {
        return a;
    }
    if t >= 1.0 {
        return b;
    }
    let mut b = b;
    let mut dot = a.dot(b);
    if dot < 0.0 {
        b = -b;
        dot = -dot;
    }
    let va = Vec4::from(a);
    let vb = Vec4::from(b);
    if dot > 0.9995 {
        // Nearly parallel: sin(theta) vanishes, fall back to normalized lerp.
        return Quat::from_vec4(va.lerp(vb, t)).normalize();
    }
    let theta0 = dot.clamp(-1.0, 1.0).acos();
    let theta = theta0 * t;
    let sin0 = theta0.sin();
    let s0 = (theta0 - theta).sin() / sin0;
    let s1 = theta.sin() / sin0;
    Quat::from_vec4(va * s0 + vb * s1)
}

/// Discriminant of a [`Value`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Float,
    Vec2,
    Vec3,
    Vec4,
    Quat,
    Int,
    Mat4,
    Buffer,
}

impl ValueKind {
    /// Int and Mat4 payloads are constant-only.
    pub fn is_animatable(self) -> bool {
        !matches!(self, Self::Int | Self::Mat4)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Float => "float",
            Self::Vec2 => "vec2",
            Self::Vec3 => "vec3",
            Self::Vec4 => "vec4",
            Self::Quat => "quat",
            Self::Int => "int",
            Self::Mat4 => "mat4",
            Self::Buffer => "buffer",
        }
    }
}

impl std::fmt::Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Typed parameter payload: what a uniform binds and what a keyframe anchors.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    Float(f64),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    Quat(Quat),
    Int(i32),
    Mat4(Mat4),
    /// Flat block of `f32` components (vectors are stored interleaved).
    Buffer(Vec<f32>),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Float(_) => ValueKind::Float,
            Self::Vec2(_) => ValueKind::Vec2,
            Self::Vec3(_) => ValueKind::Vec3,
            Self::Vec4(_) => ValueKind::Vec4,
            Self::Quat(_) => ValueKind::Quat,
            Self::Int(_) => ValueKind::Int,
            Self::Mat4(_) => ValueKind::Mat4,
            Self::Buffer(_) => ValueKind::Buffer,
        }
    }

    /// Blend two payloads of the same kind. Returns `None` for mismatched or constant-only kinds.
    pub fn mix(a: &Value, b: &Value, t: f64) -> Option<Value> {
        Some(match (a, b) {
            (Self::Float(a), Self::Float(b)) => Self::Float(<f64 as Lerp>::lerp(a, b, t)),
            (Self::Vec2(a), Self::Vec2(b)) => Self::Vec2(<Vec2 as Lerp>::lerp(a, b, t)),
            (Self::Vec3(a), Self::Vec3(b)) => Self::Vec3(<Vec3 as Lerp>::lerp(a, b, t)),
            (Self::Vec4(a), Self::Vec4(b)) => Self::Vec4(<Vec4 as Lerp>::lerp(a, b, t)),
            (Self::Quat(a), Self::Quat(b)) => Self::Quat(<Quat as Lerp>::lerp(a, b, t)),
            (Self::Buffer(a), Self::Buffer(b)) if a.len() == b.len() => Self::Buffer(
                a.iter()
                    .zip(b.iter())
                    .map(|(x, y)| <f32 as Lerp>::lerp(x, y, t))
                    .collect(),
            ),
            _ => return None,
        })
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_vec3(&self) -> Option<Vec3> {
        match self {
            Self::Vec3(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_vec4(&self) -> Option<Vec4> {
        match self {
            Self::Vec4(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_quat(&self) -> Option<Quat> {
        match self {
            Self::Quat(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_buffer(&self) -> Option<&[f32]> {
        match self {
            Self::Buffer(v) => Some(v),
            _ => None,
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<Vec2> for Value {
    fn from(v: Vec2) -> Self {
        Self::Vec2(v)
    }
}

impl From<Vec3> for Value {
    fn from(v: Vec3) -> Self {
        Self::Vec3(v)
    }
}

impl From<Vec4> for Value {
    fn from(v: Vec4) -> Self {
        Self::Vec4(v)
    }
}

impl From<Quat> for Value {
    fn from(v: Quat) -> Self {
        Self::Quat(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<Mat4> for Value {
    fn from(v: Mat4) -> Self {
        Self::Mat4(v)
    }
}

impl From<Vec<f32>> for Value {
    fn from(v: Vec<f32>) -> Self {
        Self::Buffer(v)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/value.rs"]
mod tests;
