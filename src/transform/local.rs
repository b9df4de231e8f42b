use crate::foundation::{
    core::{Mat4, Quat, Vec3},
    error::{TrellisError, TrellisResult},
};

/// Accumulated transform state handed from a node to its child.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TransformCtx {
    pub model_view: Mat4,
    pub projection: Mat4,
}

impl TransformCtx {
    pub const IDENTITY: Self = Self {
        model_view: Mat4::IDENTITY,
        projection: Mat4::IDENTITY,
    };

    /// Child context after applying `local` below this one.
    pub fn then(&self, local: Mat4) -> Self {
        Self {
            model_view: world_transform(self.model_view, local),
            projection: self.projection,
        }
    }

    /// Combined view-projection consumed by draw calls.
    pub fn mvp(&self) -> Mat4 {
        self.projection * self.model_view
    }
}

impl Default for TransformCtx {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// `parent_world * local`.
pub fn world_transform(parent_world: Mat4, local: Mat4) -> Mat4 {
    parent_world * local
}

fn anchored(m: Mat4, anchor: Vec3) -> Mat4 {
    if anchor == Vec3::ZERO {
        return m;
    }
    Mat4::from_translation(anchor) * m * Mat4::from_translation(-anchor)
}

/// Rotation of `angle_deg` degrees about `axis`, pivoting on `anchor`.
pub fn rotate(angle_deg: f64, axis: Vec3, anchor: Vec3) -> TrellisResult<Mat4> {
    let axis = axis.try_normalize().ok_or_else(|| {
        TrellisError::construction(format!("rotation axis must be non-zero (got {axis})"))
    })?;
    let rot = Mat4::from_axis_angle(axis, angle_deg.to_radians() as f32);
    Ok(anchored(rot, anchor))
}

pub fn rotate_quat(q: Quat, anchor: Vec3) -> Mat4 {
    anchored(Mat4::from_quat(q.normalize()), anchor)
}

pub fn scale(factors: Vec3, anchor: Vec3) -> Mat4 {
    anchored(Mat4::from_scale(factors), anchor)
}

pub fn translate(v: Vec3) -> Mat4 {
    Mat4::from_translation(v)
}

/// Camera projection model.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Projection {
    /// Vertical field of view in degrees; `aspect: None` uses the scene aspect ratio.
    Perspective { fov: f32, aspect: Option<f32> },
    Orthographic {
        left: f32,
        right: f32,
        bottom: f32,
        top: f32,
    },
}

impl Projection {
    pub fn validate(&self) -> TrellisResult<()> {
        match *self {
            Self::Perspective { fov, aspect } => {
                if !(fov > 0.0 && fov < 180.0) {
                    return Err(TrellisError::construction(format!(
                        "perspective fov must be in (0, 180) degrees (got {fov})"
                    )));
                }
                if let Some(a) = aspect
                    && !(a > 0.0 && a.is_finite())
                {
                    return Err(TrellisError::construction(format!(
                        "perspective aspect must be > 0 (got {a})"
                    )));
                }
            }
            Self::Orthographic {
                left,
                right,
                bottom,
                top,
            } => {
                if left == right || bottom == top {
                    return Err(TrellisError::construction(
                        "orthographic bounds must span a non-empty area",
                    ));
                }
            }
        }
        Ok(())
    }

    /// Projection matrix with GL clip conventions.
    pub fn matrix(&self, scene_aspect: f32, near: f32, far: f32) -> Mat4 {
        match *self {
            Self::Perspective { fov, aspect } => Mat4::perspective_rh_gl(
                fov.to_radians(),
                aspect.unwrap_or(scene_aspect),
                near,
                far,
            ),
            Self::Orthographic {
                left,
                right,
                bottom,
                top,
            } => Mat4::orthographic_rh_gl(left, right, bottom, top, near, far),
        }
    }
}

/// Near/far clipping planes.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Clipping {
    pub near: f32,
    pub far: f32,
}

impl Default for Clipping {
    fn default() -> Self {
        Self {
            near: 0.1,
            far: 100.0,
        }
    }
}

impl Clipping {
    pub fn validate(&self) -> TrellisResult<()> {
        if !(self.near > 0.0 && self.far > self.near) {
            return Err(TrellisError::construction(format!(
                "clipping requires 0 < near < far (got near={} far={})",
                self.near, self.far
            )));
        }
        Ok(())
    }
}

/// `(view, projection)` for a camera looking from `eye` toward `center`.
pub fn camera(
    eye: Vec3,
    center: Vec3,
    up: Vec3,
    projection: &Projection,
    clipping: Clipping,
    scene_aspect: f32,
) -> TrellisResult<(Mat4, Mat4)> {
    let forward = center - eye;
    if forward.length_squared() == 0.0 {
        return Err(TrellisError::evaluation(
            "camera eye and center coincide",
        ));
    }
    if forward.cross(up).length_squared() == 0.0 {
        return Err(TrellisError::evaluation(
            "camera up vector is parallel to the view direction",
        ));
    }
    let view = Mat4::look_at_rh(eye, center, up);
    let proj = projection.matrix(scene_aspect, clipping.near, clipping.far);
    Ok((view, proj))
}

#[cfg(test)]
#[path = "../../tests/unit/transform/local.rs"]
mod tests;
