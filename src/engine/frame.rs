use crate::{resource::tracker::TrackerStats, timing::time_range::Liveness, transform::local::TransformCtx};

/// Options controlling an [`crate::Engine`].
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EngineOpts {
    /// Clear color of the default framebuffer at the start of every frame.
    pub clear_color: [f32; 4],
    /// Default framebuffer width in pixels.
    pub width: u32,
    /// Default framebuffer height in pixels.
    pub height: u32,
    /// Log a warning when a resource is read before its producer ran in the same frame.
    pub warn_on_hazards: bool,
}

impl Default for EngineOpts {
    fn default() -> Self {
        Self {
            clear_color: [0.0, 0.0, 0.0, 1.0],
            width: 640,
            height: 360,
            warn_on_hazards: true,
        }
    }
}

/// Work performed by one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub draws: u64,
    pub dispatches: u64,
    pub uploads: u64,
    pub allocations: u64,
    pub barriers: u64,
    /// Read-before-write hazards observed (see [`crate::ResourceTracker::record_write`]).
    pub hazards: u64,
    /// Subtrees gated off by a time range or a user switch.
    pub skipped_subtrees: u64,
    /// Subtrees whose resources were synced ahead of activation.
    pub prefetched_subtrees: u64,
    /// GPU resources released because their nodes were freed.
    pub releases: u64,
}

impl FrameStats {
    pub(crate) fn absorb(&mut self, t: TrackerStats) {
        self.uploads += t.uploads;
        self.allocations += t.allocations;
        self.barriers += t.barriers;
        self.hazards += t.hazards;
        self.releases += t.releases;
    }
}

/// Transient per-node evaluation state, recomputed each frame the node is visited.
#[derive(Clone, Copy, Debug)]
pub(crate) struct NodeEval {
    /// Frame serial of the last visit.
    pub frame: u64,
    pub liveness: Liveness,
    /// Transform in effect at the node when last evaluated while active.
    pub world: Option<TransformCtx>,
    /// Scene time whose payload an animated resource last uploaded.
    pub uploaded_at: Option<f64>,
}

impl NodeEval {
    pub(crate) fn new(frame: u64, liveness: Liveness) -> Self {
        Self {
            frame,
            liveness,
            world: None,
            uploaded_at: None,
        }
    }
}
