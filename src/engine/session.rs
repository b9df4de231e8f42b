use std::collections::HashMap;

use crate::{
    animation::value::Value,
    backend::gpu::{GpuBackend, GpuHandle, TargetBinding, TextureHandle},
    engine::{
        frame::{EngineOpts, FrameStats, NodeEval},
        traversal::Traversal,
    },
    foundation::core::{FrameIndex, Mat4},
    foundation::error::{TrellisError, TrellisResult},
    graph::arena::{BindingSlot, Scene},
    graph::ids::NodeId,
    graph::node::{BufferData, Node, NodeKind},
    resource::tracker::ResourceTracker,
    state::{draw_state::DrawState, stack::DrawStateStack},
    timing::time_range::Liveness,
    transform::local::TransformCtx,
};

/// Owns a scene, a backend, and the GPU-side state that connects them.
///
/// Frames are evaluated one at a time with [`Engine::render_frame`]. A failed frame leaves the
/// scene and every uploaded resource in place, so the caller can fix the cause and retry.
/// Dropping the engine releases its GPU resources newest first.
pub struct Engine<B: GpuBackend> {
    scene: Scene,
    backend: B,
    tracker: ResourceTracker,
    opts: EngineOpts,
    states: DrawStateStack,
    eval: HashMap<NodeId, NodeEval>,
    frame_serial: u64,
    torn_down: bool,
}

impl<B: GpuBackend> std::fmt::Debug for Engine<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("nodes", &self.scene.len())
            .field("resources", &self.tracker.len())
            .field("frame_serial", &self.frame_serial)
            .field("opts", &self.opts)
            .finish_non_exhaustive()
    }
}

impl<B: GpuBackend> Engine<B> {
    /// Validate `scene` against itself and the backend's limits. Nothing is uploaded yet.
    pub fn new(mut scene: Scene, backend: B, opts: EngineOpts) -> TrellisResult<Self> {
        if opts.width == 0 || opts.height == 0 {
            return Err(TrellisError::construction(format!(
                "viewport must be non-zero (got {}x{})",
                opts.width, opts.height
            )));
        }
        scene.validate()?;
        check_limits(&scene, &backend)?;
        // Nothing was ever uploaded for nodes freed before the engine existed.
        scene.take_released();

        Ok(Self {
            scene,
            backend,
            tracker: ResourceTracker::new(opts.warn_on_hazards),
            opts,
            states: DrawStateStack::new(DrawState::default()),
            eval: HashMap::new(),
            frame_serial: 0,
            torn_down: false,
        })
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn opts(&self) -> &EngineOpts {
        &self.opts
    }

    /// Serial of the last frame attempted; `0` before the first.
    pub fn frame_serial(&self) -> u64 {
        self.frame_serial
    }

    /// Evaluate and submit one frame at scene time `t` (seconds).
    #[tracing::instrument(skip(self), fields(frame = self.frame_serial + 1))]
    pub fn render_frame(&mut self, t: f64) -> TrellisResult<FrameStats> {
        if !t.is_finite() {
            return Err(TrellisError::evaluation(format!(
                "frame time must be finite (got {t})"
            )));
        }
        if self.torn_down {
            return Err(TrellisError::evaluation("engine has been torn down"));
        }
        let root = self
            .scene
            .root()
            .ok_or_else(|| TrellisError::evaluation("scene has no root node"))?;

        self.frame_serial += 1;
        self.tracker.begin_frame(self.frame_serial);
        self.release_freed()?;

        let depth = self.states.depth();
        self.backend.begin_frame()?;
        let (outcome, mut stats) = self.traverse(root, t);
        if let Err(e) = outcome {
            self.backend.abort_frame();
            self.states.reset();
            tracing::warn!(time = t, error = %e, "frame aborted");
            return Err(e);
        }
        if self.states.depth() != depth {
            self.backend.abort_frame();
            self.states.reset();
            return Err(TrellisError::evaluation(
                "draw-state stack unbalanced after traversal",
            ));
        }
        self.backend.end_frame()?;

        stats.absorb(self.tracker.stats());
        tracing::debug!(
            draws = stats.draws,
            dispatches = stats.dispatches,
            uploads = stats.uploads,
            "frame submitted"
        );
        Ok(stats)
    }

    /// [`Self::render_frame`] at the start time of frame `f`.
    pub fn render_frame_index(&mut self, f: FrameIndex) -> TrellisResult<FrameStats> {
        let t = self.scene.timing().time_of(f);
        self.render_frame(t)
    }

    fn traverse(&mut self, root: NodeId, t: f64) -> (TrellisResult<()>, FrameStats) {
        let target = TargetBinding {
            color: Vec::new(),
            depth: None,
            width: self.opts.width,
            height: self.opts.height,
            clear: Some(self.opts.clear_color),
            scissor: None,
        };
        if let Err(e) = self.backend.set_target(&target) {
            return (Err(e), FrameStats::default());
        }
        let mut walk = Traversal {
            scene: &self.scene,
            backend: &mut self.backend,
            tracker: &mut self.tracker,
            states: &mut self.states,
            eval: &mut self.eval,
            time: t,
            frame: self.frame_serial,
            aspect: self.scene.timing().aspect_ratio.as_f32(),
            target,
            stats: FrameStats::default(),
        };
        let out = walk.visit(root, TransformCtx::IDENTITY);
        (out, walk.stats)
    }

    /// Destroy the GPU side of nodes the scene freed since the last frame.
    fn release_freed(&mut self) -> TrellisResult<()> {
        let mut first_err = None;
        for id in self.scene.take_released() {
            self.eval.remove(&id);
            if let Err(e) = self.tracker.release(id, &mut self.backend) {
                tracing::warn!(node = %id, error = %e, "release failed");
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Replace a static buffer's payload; uploaded lazily on the next read. Every node reading
    /// the buffer is re-validated against the new contents, and the old payload is restored if
    /// any of them rejects it.
    pub fn update_buffer_data(&mut self, id: NodeId, data: BufferData) -> TrellisResult<()> {
        let previous = self.scene.set_buffer_data(id, data)?;
        let readers: Vec<NodeId> = self
            .scene
            .iter()
            .filter(|(_, n)| n.kind.edges().iter().any(|e| e.target == id))
            .map(|(reader, _)| reader)
            .collect();
        if let Some(err) = readers
            .iter()
            .find_map(|&reader| self.scene.validate_node_at(reader).err())
        {
            self.scene.set_buffer_data(id, previous)?;
            return Err(err);
        }

        self.tracker.mark_dirty(id);
        for reader in readers {
            if matches!(self.scene.get(reader).map(|n| &n.kind), Ok(NodeKind::Texture2D(_))) {
                self.tracker.mark_dirty(reader);
            }
        }
        Ok(())
    }

    pub fn update_uniform_value(&mut self, id: NodeId, value: Value) -> TrellisResult<()> {
        self.scene.set_uniform_value(id, value)
    }

    pub fn set_user_switch(&mut self, id: NodeId, enabled: bool) -> TrellisResult<()> {
        self.scene.set_user_switch(id, enabled)
    }

    /// Swap shader sources; the program is rebuilt on its next use. If the rebuild fails the
    /// frame fails and the previous program stays bound to the node.
    pub fn update_program_sources(
        &mut self,
        id: NodeId,
        vertex: Option<String>,
        fragment: Option<String>,
    ) -> TrellisResult<()> {
        self.scene.set_program_sources(id, vertex, fragment)?;
        self.tracker.mark_dirty(id);
        Ok(())
    }

    /// Add a node built from live references. It stays unreachable until attached.
    pub fn insert(&mut self, node: Node) -> TrellisResult<NodeId> {
        let id = self.scene.insert(node)?;
        self.scene.validate_node_at(id)?;
        check_limits(&self.scene, &self.backend)?;
        Ok(id)
    }

    pub fn add_child(&mut self, group: NodeId, child: NodeId) -> TrellisResult<()> {
        self.scene.add_child(group, child)
    }

    /// Remove `child` from `group`. Freed nodes release their GPU resources at the next frame.
    pub fn detach(&mut self, group: NodeId, child: NodeId) -> TrellisResult<()> {
        self.scene.detach(group, child)
    }

    pub fn bind(
        &mut self,
        owner: NodeId,
        slot: BindingSlot,
        name: &str,
        target: NodeId,
    ) -> TrellisResult<()> {
        self.scene.bind(owner, slot, name, target)?;
        self.scene.validate_node_at(owner)
    }

    /// Drop a named binding. A target left unreferenced is freed and releases its GPU resources
    /// at the next frame.
    pub fn unbind(&mut self, owner: NodeId, slot: BindingSlot, name: &str) -> TrellisResult<()> {
        self.scene.unbind(owner, slot, name)?;
        self.scene.validate_node_at(owner)
    }

    /// Model-view transform at `id` as of the current frame, if the node was evaluated.
    pub fn world_transform(&self, id: NodeId) -> Option<Mat4> {
        self.eval
            .get(&id)
            .filter(|e| e.frame == self.frame_serial && e.liveness == Liveness::Active)
            .and_then(|e| e.world)
            .map(|w| w.model_view)
    }

    /// How `id` was reached in the current frame. Nodes not reached are `Inactive`.
    pub fn liveness(&self, id: NodeId) -> Liveness {
        match self.eval.get(&id) {
            Some(e) if e.frame == self.frame_serial => e.liveness,
            _ => Liveness::Inactive,
        }
    }

    /// Open draw-state scopes; zero between frames.
    pub fn draw_state_depth(&self) -> usize {
        self.states.depth()
    }

    pub fn resource_handle(&self, id: NodeId) -> Option<GpuHandle> {
        self.tracker.handle(id)
    }

    pub fn texture_handle(&self, id: NodeId) -> Option<TextureHandle> {
        match self.tracker.handle(id) {
            Some(GpuHandle::Texture(h)) => Some(h),
            _ => None,
        }
    }

    /// Release every GPU resource, newest construction first. Later frames fail.
    pub fn teardown(&mut self) -> TrellisResult<()> {
        if self.torn_down {
            return Ok(());
        }
        self.torn_down = true;
        self.eval.clear();
        self.scene.take_released();
        self.tracker.release_all(&mut self.backend)
    }
}

impl<B: GpuBackend> Drop for Engine<B> {
    fn drop(&mut self) {
        if let Err(e) = self.teardown() {
            tracing::warn!(error = %e, "engine teardown failed");
        }
    }
}

fn check_limits<B: GpuBackend + ?Sized>(scene: &Scene, backend: &B) -> TrellisResult<()> {
    let limits = backend.limits();
    for (id, node) in scene.iter() {
        let err = match &node.kind {
            NodeKind::Compute(c)
                if c
                    .work_groups
                    .iter()
                    .zip(limits.max_work_groups)
                    .any(|(&n, max)| n > max) =>
            {
                format!(
                    "work groups {:?} exceed backend limits {:?}",
                    c.work_groups, limits.max_work_groups
                )
            }
            NodeKind::RenderToTexture(rtt)
                if rtt.color_textures.len() > limits.max_color_attachments as usize =>
            {
                format!(
                    "{} color textures exceed the backend limit of {}",
                    rtt.color_textures.len(),
                    limits.max_color_attachments
                )
            }
            NodeKind::Texture2D(t) if t.width.max(t.height) > limits.max_texture_size => {
                format!(
                    "{}x{} exceeds the backend texture limit of {}",
                    t.width, t.height, limits.max_texture_size
                )
            }
            _ => continue,
        };
        return Err(
            TrellisError::construction(err).in_node(node.kind.name(), node.display_label(id))
        );
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/engine/session.rs"]
mod tests;
