use crate::foundation::error::{TrellisError, TrellisResult};

pub use glam::{Mat4, Quat, Vec2, Vec3, Vec4};

/// Absolute 0-based output frame index.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameIndex(pub u64);

/// Frames-per-second represented as a rational `num/den`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Fps {
    /// Numerator (frames).
    pub num: u32,
    /// Denominator (seconds), must be non-zero.
    pub den: u32,
}

impl Fps {
    /// Create a validated FPS value.
    pub fn new(num: u32, den: u32) -> TrellisResult<Self> {
        if den == 0 {
            return Err(TrellisError::construction("Fps den must be > 0"));
        }
        if num == 0 {
            return Err(TrellisError::construction("Fps num must be > 0"));
        }
        Ok(Self { num, den })
    }

    /// Convert to floating-point FPS.
    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }

    /// Duration of one frame in seconds.
    pub fn frame_duration_secs(self) -> f64 {
        f64::from(self.den) / f64::from(self.num)
    }

    /// Scene time of the start of frame `f`.
    pub fn frame_to_secs(self, f: FrameIndex) -> f64 {
        // Exact for integral rates; avoids accumulating `frame_duration_secs` error.
        (f.0 as f64) * f64::from(self.den) / f64::from(self.num)
    }

    /// Convert seconds to a frame count using floor semantics.
    pub fn secs_to_frames_floor(self, secs: f64) -> u64 {
        (secs * self.as_f64()).floor().max(0.0) as u64
    }
}

/// Output aspect ratio as a rational `num/den`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AspectRatio {
    pub num: u32,
    pub den: u32,
}

impl AspectRatio {
    pub fn new(num: u32, den: u32) -> TrellisResult<Self> {
        if num == 0 || den == 0 {
            return Err(TrellisError::construction(
                "AspectRatio terms must both be > 0",
            ));
        }
        Ok(Self { num, den })
    }

    pub fn as_f32(self) -> f32 {
        self.num as f32 / self.den as f32
    }
}

impl Default for AspectRatio {
    fn default() -> Self {
        Self { num: 16, den: 9 }
    }
}

/// Scene-wide time configuration.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SceneTiming {
    /// Scene duration in seconds.
    pub duration: f64,
    pub framerate: Fps,
    pub aspect_ratio: AspectRatio,
}

impl SceneTiming {
    pub fn new(duration: f64, framerate: Fps, aspect_ratio: AspectRatio) -> TrellisResult<Self> {
        let timing = Self {
            duration,
            framerate,
            aspect_ratio,
        };
        timing.validate()?;
        Ok(timing)
    }

    pub fn validate(&self) -> TrellisResult<()> {
        if !self.duration.is_finite() || self.duration <= 0.0 {
            return Err(TrellisError::construction(format!(
                "scene duration must be finite and > 0 (got {})",
                self.duration
            )));
        }
        // Re-run the constructors' checks: deserialized values bypass them.
        Fps::new(self.framerate.num, self.framerate.den)?;
        AspectRatio::new(self.aspect_ratio.num, self.aspect_ratio.den)?;
        Ok(())
    }

    /// Number of whole frames covering `[0, duration)`.
    pub fn frame_count(&self) -> u64 {
        let exact = self.duration * self.framerate.as_f64();
        (exact.ceil().max(1.0)) as u64
    }

    /// Scene time of frame `f`.
    pub fn time_of(&self, f: FrameIndex) -> f64 {
        self.framerate.frame_to_secs(f)
    }
}

impl Default for SceneTiming {
    fn default() -> Self {
        Self {
            duration: 5.0,
            framerate: Fps { num: 60, den: 1 },
            aspect_ratio: AspectRatio::default(),
        }
    }
}

/// Pixel rectangle with a bottom-left origin (window coordinates).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Scissor {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Scissor {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Scissor covering a whole `width x height` target.
    pub fn full(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x
            && y >= self.y
            && i64::from(x) < i64::from(self.x) + i64::from(self.width)
            && i64::from(y) < i64::from(self.y) + i64::from(self.height)
    }

    /// Overlap of two rectangles; empty rectangles collapse to zero size.
    pub fn intersect(&self, other: &Scissor) -> Scissor {
        let x0 = i64::from(self.x).max(i64::from(other.x));
        let y0 = i64::from(self.y).max(i64::from(other.y));
        let x1 = (i64::from(self.x) + i64::from(self.width))
            .min(i64::from(other.x) + i64::from(other.width));
        let y1 = (i64::from(self.y) + i64::from(self.height))
            .min(i64::from(other.y) + i64::from(other.height));
        Scissor {
            x: x0 as i32,
            y: y0 as i32,
            width: (x1 - x0).max(0) as u32,
            height: (y1 - y0).max(0) as u32,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
