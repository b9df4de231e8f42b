use std::collections::{HashMap, HashSet};

use crate::{
    animation::{keyframes::Param, value::Value},
    backend::gpu::{
        BufferDesc, BufferHandle, DispatchCall, DrawCall, GpuBackend, GpuHandle, ProgramDesc,
        ProgramHandle, ProgramSource, TargetBinding, TextureDesc, TextureHandle,
    },
    engine::frame::{FrameStats, NodeEval},
    foundation::core::{Quat, Vec3},
    foundation::error::{TrellisError, TrellisResult},
    graph::arena::Scene,
    graph::ids::NodeId,
    graph::node::{
        Access, Bindings, BufferSource, Geometry, MipmapFilter, Node, NodeKind, Render,
        RenderToTexture,
    },
    resource::tracker::{ResourceDesc, ResourceTracker, ResourceUpload},
    state::stack::DrawStateStack,
    timing::time_range::Liveness,
    transform::local::{self, TransformCtx},
};

/// One frame's depth-first walk. Borrows the engine's parts for the duration of the frame.
pub(crate) struct Traversal<'a, B: GpuBackend + ?Sized> {
    pub scene: &'a Scene,
    pub backend: &'a mut B,
    pub tracker: &'a mut ResourceTracker,
    pub states: &'a mut DrawStateStack,
    pub eval: &'a mut HashMap<NodeId, NodeEval>,
    pub time: f64,
    pub frame: u64,
    pub aspect: f32,
    /// Target currently bound; restored when a render-to-texture pass ends.
    pub target: TargetBinding,
    pub stats: FrameStats,
}

fn float(p: &Param, t: f64, what: &str) -> TrellisResult<f64> {
    p.evaluate(t)
        .as_float()
        .ok_or_else(|| TrellisError::evaluation(format!("`{what}` did not evaluate to a float")))
}

fn vec3(p: &Param, t: f64, what: &str) -> TrellisResult<Vec3> {
    p.evaluate(t)
        .as_vec3()
        .ok_or_else(|| TrellisError::evaluation(format!("`{what}` did not evaluate to a vec3")))
}

fn quat(p: &Param, t: f64, what: &str) -> TrellisResult<Quat> {
    p.evaluate(t)
        .as_quat()
        .ok_or_else(|| TrellisError::evaluation(format!("`{what}` did not evaluate to a quat")))
}

impl<B: GpuBackend + ?Sized> Traversal<'_, B> {
    fn states_mut(&mut self) -> &mut DrawStateStack {
        &mut *self.states
    }

    fn mark(&mut self, id: NodeId, liveness: Liveness, world: Option<TransformCtx>) {
        let e = self
            .eval
            .entry(id)
            .or_insert_with(|| NodeEval::new(self.frame, liveness));
        // Active wins over Prefetch when a shared node is reached both ways in one frame.
        if e.frame != self.frame || liveness == Liveness::Active {
            e.frame = self.frame;
            e.liveness = liveness;
        }
        if world.is_some() {
            e.world = world;
        }
    }

    pub fn visit(&mut self, id: NodeId, ctx: TransformCtx) -> TrellisResult<()> {
        let scene = self.scene;
        let node = scene.get(id)?;
        self.visit_node(id, node, ctx)
            .map_err(|e| e.in_node(node.kind.name(), node.display_label(id)))
    }

    fn visit_node(&mut self, id: NodeId, node: &Node, ctx: TransformCtx) -> TrellisResult<()> {
        self.mark(id, Liveness::Active, Some(ctx));
        let t = self.time;
        match &node.kind {
            NodeKind::Group(g) => {
                for &child in &g.children {
                    self.visit(child, ctx)?;
                }
                Ok(())
            }
            NodeKind::Rotate(r) => {
                let angle = float(&r.angle, t, "angle")?;
                let m = local::rotate(angle, r.axis, r.anchor)?;
                self.visit(r.child, ctx.then(m))
            }
            NodeKind::RotateQuat(r) => {
                let q = quat(&r.quat, t, "quat")?;
                self.visit(r.child, ctx.then(local::rotate_quat(q, r.anchor)))
            }
            NodeKind::Scale(s) => {
                let f = vec3(&s.factors, t, "factors")?;
                self.visit(s.child, ctx.then(local::scale(f, s.anchor)))
            }
            NodeKind::Translate(tr) => {
                let v = vec3(&tr.vector, t, "vector")?;
                self.visit(tr.child, ctx.then(local::translate(v)))
            }
            NodeKind::Transform(st) => self.visit(st.child, ctx.then(st.matrix)),
            NodeKind::Camera(c) => {
                let eye = vec3(&c.eye, t, "eye")?;
                let center = vec3(&c.center, t, "center")?;
                let up = vec3(&c.up, t, "up")?;
                let (view, projection) =
                    local::camera(eye, center, up, &c.projection, c.clipping, self.aspect)?;
                let child_ctx = TransformCtx {
                    model_view: local::world_transform(ctx.model_view, view),
                    projection,
                };
                self.visit(c.child, child_ctx)
            }
            NodeKind::GraphicConfig(gc) => {
                DrawStateStack::scoped_in(self, Self::states_mut, &gc.state, |tr| {
                    tr.visit(gc.child, ctx)
                })
            }
            NodeKind::TimeRangeFilter(f) => match f.ranges.liveness(t) {
                Liveness::Active => self.visit(f.child, ctx),
                Liveness::Prefetch => {
                    self.stats.prefetched_subtrees += 1;
                    self.prefetch(f.child)
                }
                Liveness::Inactive => {
                    self.stats.skipped_subtrees += 1;
                    tracing::trace!(node = %id, time = t, "time range inactive; subtree skipped");
                    Ok(())
                }
            },
            NodeKind::UserSwitch(s) => {
                if s.enabled {
                    self.visit(s.child, ctx)
                } else {
                    self.stats.skipped_subtrees += 1;
                    tracing::trace!(node = %id, "user switch off; subtree skipped");
                    Ok(())
                }
            }
            NodeKind::RenderToTexture(rtt) => self.render_to_texture(id, node, rtt, ctx),
            NodeKind::Render(r) => self.draw(id, node, r, ctx),
            NodeKind::Compute(c) => {
                let program = self.program(c.program)?;
                let limits = self.backend.limits();
                if c.work_groups.iter().zip(limits.max_work_groups).any(|(&n, m)| n > m) {
                    return Err(TrellisError::resource(format!(
                        "work groups {:?} exceed backend limits {:?}",
                        c.work_groups, limits.max_work_groups
                    )));
                }
                let (uniforms, textures, buffers) = self.bindings(id, &c.bindings)?;
                let scene = self.scene;
                let textures = textures
                    .into_iter()
                    .zip(c.bindings.textures.values())
                    .map(|((name, h), &tex)| {
                        let access = match &scene.get(tex)?.kind {
                            NodeKind::Texture2D(tex) => tex.access,
                            _ => Access::Read,
                        };
                        Ok((name, h, access))
                    })
                    .collect::<TrellisResult<Vec<_>>>()?;
                let call = DispatchCall {
                    label: node.display_label(id),
                    program,
                    work_groups: c.work_groups,
                    uniforms,
                    textures,
                    buffers,
                };
                self.backend.dispatch(&call)?;
                self.stats.dispatches += 1;
                let label = node.display_label(id);
                // Storage buffers are writable; textures only when declared so.
                for &b in c.bindings.buffers.values() {
                    self.tracker.record_write(b, id, &label);
                }
                for (&tex, (_, _, access)) in c.bindings.textures.values().zip(&call.textures) {
                    if access.writes() {
                        self.tracker.record_write(tex, id, &label);
                    }
                }
                Ok(())
            }
            NodeKind::Geometry(g) => self.geometry(id, g).map(|_| ()),
            NodeKind::Buffer(_)
            | NodeKind::Texture2D(_)
            | NodeKind::Program(_)
            | NodeKind::ComputeProgram(_) => self.sync(id).map(|_| ()),
            NodeKind::Uniform(_) => Ok(()),
        }
    }

    fn render_to_texture(
        &mut self,
        id: NodeId,
        node: &Node,
        rtt: &RenderToTexture,
        ctx: TransformCtx,
    ) -> TrellisResult<()> {
        let mut color = Vec::with_capacity(rtt.color_textures.len());
        for &t in &rtt.color_textures {
            color.push(self.texture(t)?);
        }
        let depth = match rtt.depth_texture {
            Some(d) => Some(self.texture(d)?),
            None => None,
        };
        let scene = self.scene;
        let first = rtt
            .color_textures
            .first()
            .ok_or_else(|| TrellisError::evaluation("render-to-texture has no color texture"))?;
        let (width, height) = match &scene.get(*first)?.kind {
            NodeKind::Texture2D(t) => (t.width, t.height),
            other => {
                return Err(TrellisError::evaluation(format!(
                    "color0 is a {}, not a Texture2D",
                    other.name()
                )));
            }
        };
        let binding = TargetBinding {
            color,
            depth,
            width,
            height,
            clear: (!rtt.no_clear).then_some(rtt.clear_color),
            scissor: rtt.scissor,
        };
        self.backend.set_target(&binding)?;
        let parent = std::mem::replace(&mut self.target, binding);

        let out = self.visit(rtt.child, ctx);

        // Rebind the enclosing target without clearing it.
        let restore = TargetBinding {
            clear: None,
            ..parent.clone()
        };
        let restored = self.backend.set_target(&restore);
        self.target = parent;
        out?;
        restored?;

        let label = node.display_label(id);
        for &t in rtt.color_textures.iter().chain(rtt.depth_texture.iter()) {
            self.tracker.record_write(t, id, &label);
            let mipmapped = matches!(
                &scene.get(t)?.kind,
                NodeKind::Texture2D(tex) if tex.mipmap_filter != MipmapFilter::None
            );
            if mipmapped && let Some(GpuHandle::Texture(h)) = self.tracker.handle(t) {
                self.backend.generate_mipmaps(h)?;
            }
        }
        Ok(())
    }

    fn draw(&mut self, id: NodeId, node: &Node, r: &Render, ctx: TransformCtx) -> TrellisResult<()> {
        let scene = self.scene;
        let NodeKind::Geometry(g) = &scene.get(r.geometry)?.kind else {
            return Err(TrellisError::evaluation("`geometry` is not a Geometry node"));
        };
        let geo = self.geometry(id, g)?;
        let program = self.program(r.program)?;
        let (uniforms, textures, buffers) = self.bindings(id, &r.bindings)?;
        let mut attributes = Vec::with_capacity(r.attributes.len());
        for (name, &b) in &r.attributes {
            attributes.push((name.clone(), self.read_buffer(b, id)?));
        }
        let mut instance_attributes = Vec::with_capacity(r.instance_attributes.len());
        for (name, &b) in &r.instance_attributes {
            instance_attributes.push((name.clone(), self.read_buffer(b, id)?));
        }
        let call = DrawCall {
            label: node.display_label(id),
            program,
            topology: g.topology,
            vertices: geo.vertices,
            vertex_count: geo.vertex_count,
            uvcoords: geo.uvcoords,
            normals: geo.normals,
            indices: geo.indices,
            instances: r.nb_instances,
            uniforms,
            textures,
            buffers,
            attributes,
            instance_attributes,
            model_view: ctx.model_view,
            projection: ctx.projection,
            state: *self.states.top(),
        };
        self.backend.draw(&call)?;
        self.stats.draws += 1;
        Ok(())
    }

    /// Sync and read-track every resource a bindings table references; evaluate uniforms.
    #[allow(clippy::type_complexity)]
    fn bindings(
        &mut self,
        owner: NodeId,
        b: &Bindings,
    ) -> TrellisResult<(
        Vec<(String, Value)>,
        Vec<(String, TextureHandle)>,
        Vec<(String, BufferHandle)>,
    )> {
        let scene = self.scene;
        let mut uniforms = Vec::with_capacity(b.uniforms.len());
        for (name, &u) in &b.uniforms {
            let NodeKind::Uniform(uniform) = &scene.get(u)?.kind else {
                return Err(TrellisError::evaluation(format!(
                    "uniforms.{name} is not a Uniform node"
                )));
            };
            self.mark(u, Liveness::Active, None);
            uniforms.push((name.clone(), uniform.param.evaluate(self.time)));
        }
        let mut textures = Vec::with_capacity(b.textures.len());
        for (name, &tex) in &b.textures {
            let h = self.texture(tex)?;
            self.tracker.record_read(tex, owner, &mut *self.backend)?;
            textures.push((name.clone(), h));
        }
        let mut buffers = Vec::with_capacity(b.buffers.len());
        for (name, &buf) in &b.buffers {
            buffers.push((name.clone(), self.read_buffer(buf, owner)?));
        }
        Ok((uniforms, textures, buffers))
    }

    fn geometry(&mut self, reader: NodeId, g: &Geometry) -> TrellisResult<GeometryHandles> {
        let vertices = self.read_buffer(g.vertices, reader)?;
        let vertex_count = self.element_count(g.vertices)?;
        let uvcoords = match g.uvcoords {
            Some(b) => Some(self.read_buffer(b, reader)?),
            None => None,
        };
        let normals = match g.normals {
            Some(b) => Some(self.read_buffer(b, reader)?),
            None => None,
        };
        let indices = match g.indices {
            Some(b) => Some((self.read_buffer(b, reader)?, self.element_count(b)?)),
            None => None,
        };
        Ok(GeometryHandles {
            vertices,
            vertex_count,
            uvcoords,
            normals,
            indices,
        })
    }

    fn element_count(&self, id: NodeId) -> TrellisResult<u32> {
        match &self.scene.get(id)?.kind {
            NodeKind::Buffer(b) => u32::try_from(b.count())
                .map_err(|_| TrellisError::evaluation("buffer element count exceeds u32")),
            other => Err(TrellisError::evaluation(format!(
                "{id} is a {}, not a Buffer",
                other.name()
            ))),
        }
    }

    fn read_buffer(&mut self, id: NodeId, reader: NodeId) -> TrellisResult<BufferHandle> {
        match self.sync(id)? {
            Some(GpuHandle::Buffer(h)) => {
                self.tracker.record_read(id, reader, &mut *self.backend)?;
                Ok(h)
            }
            _ => Err(TrellisError::evaluation(format!("{id} is not a Buffer"))),
        }
    }

    fn texture(&mut self, id: NodeId) -> TrellisResult<TextureHandle> {
        match self.sync(id)? {
            Some(GpuHandle::Texture(h)) => Ok(h),
            _ => Err(TrellisError::evaluation(format!("{id} is not a Texture2D"))),
        }
    }

    fn program(&mut self, id: NodeId) -> TrellisResult<ProgramHandle> {
        match self.sync(id)? {
            Some(GpuHandle::Program(h)) => Ok(h),
            _ => Err(TrellisError::evaluation(format!("{id} is not a program"))),
        }
    }

    /// Bring one resource node's GPU side up to date. Non-GPU nodes return `None`.
    fn sync(&mut self, id: NodeId) -> TrellisResult<Option<GpuHandle>> {
        let scene = self.scene;
        let node = scene.get(id)?;
        let seq = scene.seq(id).unwrap_or_default();
        let t = self.time;
        let label = node.display_label(id);

        // Animated payloads re-upload whenever the scene time moves.
        if is_animated(scene, node) {
            let e = self
                .eval
                .entry(id)
                .or_insert_with(|| NodeEval::new(self.frame, Liveness::Active));
            if e.uploaded_at != Some(t) {
                self.tracker.mark_dirty(id);
                e.uploaded_at = Some(t);
            }
        }

        let handle = match &node.kind {
            NodeKind::Buffer(b) => self.tracker.sync(id, seq, &mut *self.backend, || {
                Ok(ResourceUpload {
                    desc: ResourceDesc::Buffer(BufferDesc {
                        label: label.clone(),
                        format: b.format,
                        count: b.count(),
                        usage: b.usage,
                    }),
                    data: Some(buffer_bytes(&b.source, t)?),
                })
            })?,
            NodeKind::Texture2D(tex) => {
                let data = match tex.data_src {
                    Some(src) => match &scene.get(src)?.kind {
                        NodeKind::Buffer(b) => Some(b),
                        _ => None,
                    },
                    None => None,
                };
                self.tracker.sync(id, seq, &mut *self.backend, || {
                    Ok(ResourceUpload {
                        desc: ResourceDesc::Texture(TextureDesc {
                            label: label.clone(),
                            width: tex.width,
                            height: tex.height,
                            format: tex.format,
                            min_filter: tex.min_filter,
                            mag_filter: tex.mag_filter,
                            mipmap_filter: tex.mipmap_filter,
                            wrap_s: tex.wrap_s,
                            wrap_t: tex.wrap_t,
                        }),
                        data: data.map(|b| buffer_bytes(&b.source, t)).transpose()?,
                    })
                })?
            }
            NodeKind::Program(p) => self.tracker.sync(id, seq, &mut *self.backend, || {
                Ok(ResourceUpload {
                    desc: ResourceDesc::Program(ProgramDesc {
                        label: label.clone(),
                        source: ProgramSource::Graphics {
                            vertex: p.vertex_source().to_string(),
                            fragment: p.fragment_source().to_string(),
                        },
                    }),
                    data: None,
                })
            })?,
            NodeKind::ComputeProgram(p) => self.tracker.sync(id, seq, &mut *self.backend, || {
                Ok(ResourceUpload {
                    desc: ResourceDesc::Program(ProgramDesc {
                        label: label.clone(),
                        source: ProgramSource::Compute {
                            compute: p.compute.clone(),
                        },
                    }),
                    data: None,
                })
            })?,
            _ => return Ok(None),
        };
        Ok(Some(handle))
    }

    /// Allocate and upload the static resources of a subtree about to become active.
    /// Nothing is evaluated, drawn, dispatched or cleared.
    fn prefetch(&mut self, root: NodeId) -> TrellisResult<()> {
        let scene = self.scene;
        let mut stack = vec![root];
        let mut seen = HashSet::new();
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            let node = scene.get(id)?;
            self.mark(id, Liveness::Prefetch, None);
            let is_static = matches!(
                node.kind,
                NodeKind::Buffer(_)
                    | NodeKind::Texture2D(_)
                    | NodeKind::Program(_)
                    | NodeKind::ComputeProgram(_)
            ) && !is_animated(scene, node);
            if is_static {
                self.sync(id)
                    .map_err(|e| e.in_node(node.kind.name(), node.display_label(id)))?;
            }
            stack.extend(node.kind.edges().into_iter().rev().map(|e| e.target));
        }
        Ok(())
    }
}

/// Buffers driven by keyframes, and textures filled from one.
fn is_animated(scene: &Scene, node: &Node) -> bool {
    match &node.kind {
        NodeKind::Buffer(b) => matches!(b.source, BufferSource::Animated(_)),
        NodeKind::Texture2D(tex) => tex.data_src.is_some_and(|src| {
            matches!(
                scene.get(src).map(|n| &n.kind),
                Ok(NodeKind::Buffer(b)) if matches!(b.source, BufferSource::Animated(_))
            )
        }),
        _ => false,
    }
}

struct GeometryHandles {
    vertices: BufferHandle,
    vertex_count: u32,
    uvcoords: Option<BufferHandle>,
    normals: Option<BufferHandle>,
    indices: Option<(BufferHandle, u32)>,
}

fn buffer_bytes(source: &BufferSource, t: f64) -> TrellisResult<Vec<u8>> {
    match source {
        BufferSource::Static(data) => Ok(data.as_bytes().to_vec()),
        BufferSource::Animated(keys) => match keys.evaluate(t) {
            Value::Buffer(v) => Ok(bytemuck::cast_slice(&v).to_vec()),
            other => Err(TrellisError::evaluation(format!(
                "animated buffer evaluated to {}",
                other.kind()
            ))),
        },
    }
}

