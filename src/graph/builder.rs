use crate::{
    animation::keyframes::{AnimatedParam, Param},
    foundation::core::{Mat4, SceneTiming, Vec3},
    foundation::error::{TrellisError, TrellisResult},
    graph::arena::Scene,
    graph::ids::NodeId,
    graph::node::{
        Buffer, BufferData, BufferFormat, Camera, Compute, ComputeProgram, Geometry,
        GraphicConfig, Group, Node, NodeKind, Program, Render, RenderToTexture, Rotate,
        RotateQuat, Scale, StaticTransform, Texture2D, TimeRangeFilter, Topology, Translate,
        Uniform, UserSwitch,
    },
    state::draw_state::DrawStateOverride,
    timing::time_range::TimeRanges,
    transform::local::{Clipping, Projection},
};

/// Incremental scene construction.
///
/// Children are created before their parents, so every method returns the new node's handle
/// and checks its references immediately. [`SceneBuilder::build`] sets the root and runs the
/// full validation pass.
pub struct SceneBuilder {
    scene: Scene,
    default_program: Option<NodeId>,
}

impl SceneBuilder {
    pub fn new(timing: SceneTiming) -> Self {
        Self {
            scene: Scene::new(timing),
            default_program: None,
        }
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    /// Insert an arbitrary node.
    pub fn add(&mut self, kind: impl Into<NodeKind>) -> TrellisResult<NodeId> {
        self.scene.insert(Node::new(kind))
    }

    pub fn label(&mut self, id: NodeId, label: impl Into<String>) -> TrellisResult<NodeId> {
        self.scene.set_label(id, label)?;
        Ok(id)
    }

    pub fn buffer(&mut self, format: BufferFormat, data: BufferData) -> TrellisResult<NodeId> {
        self.add(Buffer::new(format, data))
    }

    pub fn buffer_float(&mut self, data: impl Into<Vec<f32>>) -> TrellisResult<NodeId> {
        self.buffer(BufferFormat::FLOAT, BufferData::Float(data.into()))
    }

    pub fn buffer_vec2(&mut self, data: &[[f32; 2]]) -> TrellisResult<NodeId> {
        let flat = data.iter().flatten().copied().collect::<Vec<_>>();
        self.buffer(BufferFormat::VEC2, BufferData::Float(flat))
    }

    pub fn buffer_vec3(&mut self, data: &[[f32; 3]]) -> TrellisResult<NodeId> {
        let flat = data.iter().flatten().copied().collect::<Vec<_>>();
        self.buffer(BufferFormat::VEC3, BufferData::Float(flat))
    }

    pub fn buffer_uint(&mut self, data: impl Into<Vec<u32>>) -> TrellisResult<NodeId> {
        self.buffer(BufferFormat::UINT, BufferData::UInt(data.into()))
    }

    pub fn animated_buffer(
        &mut self,
        format: BufferFormat,
        keys: AnimatedParam,
    ) -> TrellisResult<NodeId> {
        self.add(Buffer::animated(format, keys))
    }

    pub fn texture(&mut self, texture: Texture2D) -> TrellisResult<NodeId> {
        self.add(texture)
    }

    pub fn program(
        &mut self,
        vertex: Option<&str>,
        fragment: Option<&str>,
    ) -> TrellisResult<NodeId> {
        self.add(Program {
            vertex: vertex.map(str::to_string),
            fragment: fragment.map(str::to_string),
        })
    }

    /// Shared program with both built-in stages, created on first use.
    pub fn default_program(&mut self) -> TrellisResult<NodeId> {
        if let Some(id) = self.default_program
            && self.scene.contains(id)
        {
            return Ok(id);
        }
        let id = self.add(Program::default())?;
        self.default_program = Some(id);
        Ok(id)
    }

    pub fn compute_program(&mut self, source: impl Into<String>) -> TrellisResult<NodeId> {
        self.add(ComputeProgram {
            compute: source.into(),
        })
    }

    pub fn geometry(
        &mut self,
        vertices: NodeId,
        uvcoords: Option<NodeId>,
        indices: Option<NodeId>,
        topology: Topology,
    ) -> TrellisResult<NodeId> {
        self.add(Geometry {
            vertices,
            uvcoords,
            normals: None,
            indices,
            topology,
        })
    }

    pub fn uniform(&mut self, param: impl Into<Param>) -> TrellisResult<NodeId> {
        self.add(Uniform {
            param: param.into(),
        })
    }

    /// Axis-aligned quad in the plane spanned by `width` and `height`, two triangles with UVs.
    pub fn quad(&mut self, corner: Vec3, width: Vec3, height: Vec3) -> TrellisResult<NodeId> {
        let p = |u: f32, v: f32| (corner + width * u + height * v).to_array();
        let vertices = self.buffer_vec3(&[p(0.0, 0.0), p(1.0, 0.0), p(0.0, 1.0), p(1.0, 1.0)])?;
        let uvs = self.buffer_vec2(&[[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.0]])?;
        let indices = self.buffer_uint([0, 1, 2, 1, 3, 2])?;
        self.geometry(vertices, Some(uvs), Some(indices), Topology::Triangles)
    }

    pub fn triangle(&mut self, a: Vec3, b: Vec3, c: Vec3) -> TrellisResult<NodeId> {
        let vertices = self.buffer_vec3(&[a.to_array(), b.to_array(), c.to_array()])?;
        let uvs = self.buffer_vec2(&[[0.0, 0.0], [1.0, 0.0], [0.5, 1.0]])?;
        self.geometry(vertices, Some(uvs), None, Topology::Triangles)
    }

    /// Triangle fan around the origin in the XY plane.
    pub fn circle(&mut self, radius: f32, npoints: u32) -> TrellisResult<NodeId> {
        if npoints < 3 || !(radius > 0.0) {
            return Err(TrellisError::construction(format!(
                "circle needs radius > 0 and at least 3 points (got {radius}, {npoints})"
            )));
        }
        let mut verts = vec![[0.0, 0.0, 0.0]];
        let mut uvs = vec![[0.5, 0.5]];
        for i in 0..npoints {
            let a = i as f32 / npoints as f32 * std::f32::consts::TAU;
            let (s, c) = a.sin_cos();
            verts.push([c * radius, s * radius, 0.0]);
            uvs.push([0.5 + c * 0.5, 0.5 + s * 0.5]);
        }
        let mut indices = Vec::with_capacity(npoints as usize * 3);
        for i in 0..npoints {
            indices.extend([0, 1 + i, 1 + (i + 1) % npoints]);
        }
        let vertices = self.buffer_vec3(&verts)?;
        let uvcoords = self.buffer_vec2(&uvs)?;
        let indices = self.buffer_uint(indices)?;
        self.geometry(vertices, Some(uvcoords), Some(indices), Topology::Triangles)
    }

    /// Draw `geometry`; `program` falls back to the shared default program.
    pub fn render(&mut self, geometry: NodeId, program: Option<NodeId>) -> TrellisResult<NodeId> {
        let program = match program {
            Some(p) => p,
            None => self.default_program()?,
        };
        self.add(Render::new(geometry, program))
    }

    pub fn compute(&mut self, program: NodeId, work_groups: [u32; 3]) -> TrellisResult<NodeId> {
        self.add(Compute {
            program,
            work_groups,
            bindings: Default::default(),
        })
    }

    pub fn group(&mut self, children: impl Into<Vec<NodeId>>) -> TrellisResult<NodeId> {
        self.add(Group {
            children: children.into(),
        })
    }

    /// Rotation by `angle` degrees about `axis` through the origin.
    pub fn rotate(
        &mut self,
        child: NodeId,
        angle: impl Into<Param>,
        axis: Vec3,
    ) -> TrellisResult<NodeId> {
        self.rotate_about(child, angle, axis, Vec3::ZERO)
    }

    pub fn rotate_about(
        &mut self,
        child: NodeId,
        angle: impl Into<Param>,
        axis: Vec3,
        anchor: Vec3,
    ) -> TrellisResult<NodeId> {
        self.add(Rotate {
            child,
            angle: angle.into(),
            axis,
            anchor,
        })
    }

    pub fn rotate_quat(&mut self, child: NodeId, quat: impl Into<Param>) -> TrellisResult<NodeId> {
        self.add(RotateQuat {
            child,
            quat: quat.into(),
            anchor: Vec3::ZERO,
        })
    }

    pub fn scale(&mut self, child: NodeId, factors: impl Into<Param>) -> TrellisResult<NodeId> {
        self.add(Scale {
            child,
            factors: factors.into(),
            anchor: Vec3::ZERO,
        })
    }

    pub fn translate(&mut self, child: NodeId, vector: impl Into<Param>) -> TrellisResult<NodeId> {
        self.add(Translate {
            child,
            vector: vector.into(),
        })
    }

    pub fn transform(&mut self, child: NodeId, matrix: Mat4) -> TrellisResult<NodeId> {
        self.add(StaticTransform { child, matrix })
    }

    pub fn camera(
        &mut self,
        child: NodeId,
        eye: impl Into<Param>,
        center: impl Into<Param>,
        up: impl Into<Param>,
        projection: Projection,
    ) -> TrellisResult<NodeId> {
        self.add(Camera {
            child,
            eye: eye.into(),
            center: center.into(),
            up: up.into(),
            projection,
            clipping: Clipping::default(),
        })
    }

    pub fn graphic_config(
        &mut self,
        child: NodeId,
        state: DrawStateOverride,
    ) -> TrellisResult<NodeId> {
        self.add(GraphicConfig { child, state })
    }

    pub fn time_range_filter(
        &mut self,
        child: NodeId,
        ranges: TimeRanges,
    ) -> TrellisResult<NodeId> {
        self.add(TimeRangeFilter { child, ranges })
    }

    pub fn user_switch(&mut self, child: NodeId, enabled: bool) -> TrellisResult<NodeId> {
        self.add(UserSwitch { child, enabled })
    }

    pub fn render_to_texture(
        &mut self,
        child: NodeId,
        color_textures: impl Into<Vec<NodeId>>,
    ) -> TrellisResult<NodeId> {
        self.add(RenderToTexture::new(child, color_textures.into()))
    }

    pub fn update_uniforms<'a>(
        &mut self,
        owner: NodeId,
        bindings: impl IntoIterator<Item = (&'a str, NodeId)>,
    ) -> TrellisResult<()> {
        self.scene.update_uniforms(owner, bindings)
    }

    pub fn update_textures<'a>(
        &mut self,
        owner: NodeId,
        bindings: impl IntoIterator<Item = (&'a str, NodeId)>,
    ) -> TrellisResult<()> {
        self.scene.update_textures(owner, bindings)
    }

    pub fn update_buffers<'a>(
        &mut self,
        owner: NodeId,
        bindings: impl IntoIterator<Item = (&'a str, NodeId)>,
    ) -> TrellisResult<()> {
        self.scene.update_buffers(owner, bindings)
    }

    pub fn update_attributes<'a>(
        &mut self,
        owner: NodeId,
        bindings: impl IntoIterator<Item = (&'a str, NodeId)>,
    ) -> TrellisResult<()> {
        self.scene.update_attributes(owner, bindings)
    }

    pub fn update_instance_attributes<'a>(
        &mut self,
        owner: NodeId,
        bindings: impl IntoIterator<Item = (&'a str, NodeId)>,
    ) -> TrellisResult<()> {
        self.scene.update_instance_attributes(owner, bindings)
    }

    /// Set `root`, validate, and hand over the scene. Nodes unreachable from the root are freed.
    pub fn build(mut self, root: NodeId) -> TrellisResult<Scene> {
        self.scene.set_root(root)?;
        self.scene.collect_unreachable();
        self.scene.validate()?;
        Ok(self.scene)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/graph/builder.rs"]
mod tests;
