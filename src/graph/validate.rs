use std::collections::{BTreeMap, HashMap};

use crate::{
    animation::value::ValueKind,
    foundation::error::{TrellisError, TrellisResult},
    graph::arena::Scene,
    graph::ids::NodeId,
    graph::node::{
        Bindings, Buffer, BufferData, BufferFormat, BufferSource, ComponentType, Geometry, Node,
        NodeKind, Texture2D,
    },
};

impl Scene {
    /// Check every construction invariant. A scene that passes can be rendered; a scene that
    /// fails never reaches the first frame.
    #[tracing::instrument(skip(self), fields(nodes = self.len()))]
    pub fn validate(&self) -> TrellisResult<()> {
        self.timing().validate()?;
        if self.root().is_none() {
            return Err(TrellisError::construction("scene has no root node"));
        }
        for (id, _) in self.iter() {
            self.validate_node_at(id)?;
        }
        self.check_acyclic()
    }

    /// Check one node's payload and references, with the node named in the error.
    pub(crate) fn validate_node_at(&self, id: NodeId) -> TrellisResult<()> {
        let node = self.get(id)?;
        self.validate_node(node)
            .map_err(|e| e.in_node(node.kind.name(), node.display_label(id)))
    }

    fn typed<'a>(
        &'a self,
        id: NodeId,
        slot: &str,
        want: &'static str,
    ) -> TrellisResult<&'a NodeKind> {
        let node = self.get(id).map_err(|_| {
            TrellisError::construction(format!("`{slot}` references missing node {id}"))
        })?;
        if node.kind.name() != want {
            return Err(TrellisError::construction(format!(
                "`{slot}` must reference a {want}, got {} {}",
                node.kind.name(),
                node.display_label(id)
            )));
        }
        Ok(&node.kind)
    }

    fn buffer(&self, id: NodeId, slot: &str) -> TrellisResult<&Buffer> {
        match self.typed(id, slot, "Buffer")? {
            NodeKind::Buffer(b) => Ok(b),
            other => Err(mismatch(slot, "Buffer", other)),
        }
    }

    fn texture(&self, id: NodeId, slot: &str) -> TrellisResult<&Texture2D> {
        match self.typed(id, slot, "Texture2D")? {
            NodeKind::Texture2D(t) => Ok(t),
            other => Err(mismatch(slot, "Texture2D", other)),
        }
    }

    fn geometry(&self, id: NodeId, slot: &str) -> TrellisResult<&Geometry> {
        match self.typed(id, slot, "Geometry")? {
            NodeKind::Geometry(g) => Ok(g),
            other => Err(mismatch(slot, "Geometry", other)),
        }
    }

    fn validate_bindings(&self, b: &Bindings) -> TrellisResult<()> {
        for (name, &id) in &b.uniforms {
            self.typed(id, &format!("uniforms.{name}"), "Uniform")?;
        }
        for (name, &id) in &b.textures {
            self.texture(id, &format!("textures.{name}"))?;
        }
        for (name, &id) in &b.buffers {
            self.buffer(id, &format!("buffers.{name}"))?;
        }
        Ok(())
    }

    fn validate_attributes(
        &self,
        table: &BTreeMap<String, NodeId>,
        what: &str,
        expected: usize,
        per: &str,
    ) -> TrellisResult<()> {
        for (name, &id) in table {
            let b = self.buffer(id, &format!("{what}.{name}"))?;
            if b.count() != expected {
                return Err(TrellisError::construction(format!(
                    "{what}.{name} holds {} elements, expected one per {per} ({expected})",
                    b.count()
                )));
            }
        }
        Ok(())
    }

    fn validate_node(&self, node: &Node) -> TrellisResult<()> {
        if let Some(child) = node.kind.child()
            && !self.contains(child)
        {
            return Err(TrellisError::construction(format!(
                "child {child} does not exist"
            )));
        }
        match &node.kind {
            NodeKind::Group(g) => {
                if let Some(c) = g.children.iter().find(|&&c| !self.contains(c)) {
                    return Err(TrellisError::construction(format!(
                        "child {c} does not exist"
                    )));
                }
            }
            NodeKind::Rotate(r) => {
                r.angle.expect_kind(ValueKind::Float, "angle")?;
                if r.axis.length_squared() == 0.0 || !r.axis.is_finite() {
                    return Err(TrellisError::construction(
                        "rotation axis must be a finite non-zero vector",
                    ));
                }
            }
            NodeKind::RotateQuat(r) => r.quat.expect_kind(ValueKind::Quat, "quat")?,
            NodeKind::Scale(s) => s.factors.expect_kind(ValueKind::Vec3, "factors")?,
            NodeKind::Translate(t) => t.vector.expect_kind(ValueKind::Vec3, "vector")?,
            NodeKind::Transform(t) => {
                if !t.matrix.is_finite() {
                    return Err(TrellisError::construction(
                        "transform matrix must be finite",
                    ));
                }
            }
            NodeKind::Camera(c) => {
                c.eye.expect_kind(ValueKind::Vec3, "eye")?;
                c.center.expect_kind(ValueKind::Vec3, "center")?;
                c.up.expect_kind(ValueKind::Vec3, "up")?;
                c.projection.validate()?;
                c.clipping.validate()?;
            }
            NodeKind::GraphicConfig(_)
            | NodeKind::TimeRangeFilter(_)
            | NodeKind::UserSwitch(_) => {}
            NodeKind::RenderToTexture(rtt) => {
                let Some((&first, rest)) = rtt.color_textures.split_first() else {
                    return Err(TrellisError::construction(
                        "render-to-texture needs at least one color texture",
                    ));
                };
                let t0 = self.texture(first, "color0")?;
                if t0.format.is_depth() {
                    return Err(TrellisError::construction(
                        "color0 must use a color format",
                    ));
                }
                for (i, &t) in rest.iter().enumerate() {
                    let slot = format!("color{}", i + 1);
                    let ti = self.texture(t, &slot)?;
                    if ti.format.is_depth() || (ti.width, ti.height) != (t0.width, t0.height) {
                        return Err(TrellisError::construction(format!(
                            "{slot} must be a color texture of {}x{}",
                            t0.width, t0.height
                        )));
                    }
                }
                if let Some(d) = rtt.depth_texture {
                    let td = self.texture(d, "depth")?;
                    if !td.format.is_depth() || (td.width, td.height) != (t0.width, t0.height) {
                        return Err(TrellisError::construction(format!(
                            "depth texture must use a depth format and be {}x{}",
                            t0.width, t0.height
                        )));
                    }
                }
            }
            NodeKind::Render(r) => {
                let g = self.geometry(r.geometry, "geometry")?;
                self.typed(r.program, "program", "Program")?;
                self.validate_bindings(&r.bindings)?;
                if r.nb_instances == 0 {
                    return Err(TrellisError::construction("nb_instances must be >= 1"));
                }
                let vertex_count = self.buffer(g.vertices, "geometry.vertices")?.count();
                self.validate_attributes(&r.attributes, "attributes", vertex_count, "vertex")?;
                self.validate_attributes(
                    &r.instance_attributes,
                    "instance_attributes",
                    r.nb_instances as usize,
                    "instance",
                )?;
            }
            NodeKind::Compute(c) => {
                self.typed(c.program, "program", "ComputeProgram")?;
                self.validate_bindings(&c.bindings)?;
                if c.work_groups.contains(&0) {
                    return Err(TrellisError::construction(format!(
                        "work group counts must be >= 1 (got {:?})",
                        c.work_groups
                    )));
                }
            }
            NodeKind::Buffer(b) => validate_buffer(b)?,
            NodeKind::Texture2D(t) => {
                if t.width == 0 || t.height == 0 {
                    return Err(TrellisError::construction(format!(
                        "texture size must be non-zero (got {}x{})",
                        t.width, t.height
                    )));
                }
                if let Some(src) = t.data_src {
                    let b = self.buffer(src, "data_src")?;
                    if b.byte_size() != t.byte_size() {
                        return Err(TrellisError::construction(format!(
                            "data_src holds {} bytes, a {}x{} {:?} texture needs {}",
                            b.byte_size(),
                            t.width,
                            t.height,
                            t.format,
                            t.byte_size()
                        )));
                    }
                }
            }
            NodeKind::Program(p) => {
                if p.vertex.as_deref().is_some_and(|s| s.trim().is_empty())
                    || p.fragment.as_deref().is_some_and(|s| s.trim().is_empty())
                {
                    return Err(TrellisError::construction(
                        "shader stage source must not be empty",
                    ));
                }
            }
            NodeKind::ComputeProgram(p) => {
                if p.compute.trim().is_empty() {
                    return Err(TrellisError::construction(
                        "compute shader source must not be empty",
                    ));
                }
            }
            NodeKind::Geometry(g) => {
                let vertices = self.buffer(g.vertices, "vertices")?;
                if vertices.format != BufferFormat::VEC3 || vertices.count() == 0 {
                    return Err(TrellisError::construction(
                        "vertices must be a non-empty vec3 buffer",
                    ));
                }
                let n = vertices.count();
                for (slot, id, format) in [
                    ("uvcoords", g.uvcoords, BufferFormat::VEC2),
                    ("normals", g.normals, BufferFormat::VEC3),
                ] {
                    if let Some(id) = id {
                        let b = self.buffer(id, slot)?;
                        if b.format != format || b.count() != n {
                            return Err(TrellisError::construction(format!(
                                "{slot} must hold {n} {:?}x{} elements",
                                format.component, format.components
                            )));
                        }
                    }
                }
                if let Some(id) = g.indices {
                    let b = self.buffer(id, "indices")?;
                    if b.format != BufferFormat::UINT {
                        return Err(TrellisError::construction(
                            "indices must be a uint buffer",
                        ));
                    }
                    if let BufferSource::Static(BufferData::UInt(ix)) = &b.source
                        && let Some(bad) = ix.iter().find(|&&i| i as usize >= n)
                    {
                        return Err(TrellisError::construction(format!(
                            "index {bad} out of range for {n} vertices"
                        )));
                    }
                }
            }
            NodeKind::Uniform(_) => {}
        }
        Ok(())
    }

    fn check_acyclic(&self) -> TrellisResult<()> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Open,
            Done,
        }
        let mut marks: HashMap<NodeId, Mark> = HashMap::new();
        for (start, _) in self.iter() {
            if marks.contains_key(&start) {
                continue;
            }
            // (node, next edge index)
            let mut stack: Vec<(NodeId, usize)> = vec![(start, 0)];
            marks.insert(start, Mark::Open);
            while let Some(top) = stack.last_mut() {
                let (id, next) = *top;
                top.1 += 1;
                let edges = self.get(id)?.kind.edges();
                if let Some(edge) = edges.get(next) {
                    match marks.get(&edge.target) {
                        Some(Mark::Open) => {
                            return Err(TrellisError::construction(format!(
                                "cycle through {} -> {} (`{}`)",
                                self.display_label(id),
                                self.display_label(edge.target),
                                edge.slot
                            )));
                        }
                        Some(Mark::Done) => {}
                        None => {
                            marks.insert(edge.target, Mark::Open);
                            stack.push((edge.target, 0));
                        }
                    }
                } else {
                    marks.insert(id, Mark::Done);
                    stack.pop();
                }
            }
        }
        Ok(())
    }
}

fn mismatch(slot: &str, want: &str, got: &NodeKind) -> TrellisError {
    TrellisError::construction(format!("`{slot}` must reference a {want}, got {}", got.name()))
}

fn validate_buffer(b: &Buffer) -> TrellisResult<()> {
    b.format.validate()?;
    let components = usize::from(b.format.components);
    match &b.source {
        BufferSource::Static(data) => {
            if data.component() != b.format.component {
                return Err(TrellisError::construction(format!(
                    "buffer data is {:?} but the format declares {:?}",
                    data.component(),
                    b.format.component
                )));
            }
            if data.is_empty() || data.len() % components != 0 {
                return Err(TrellisError::construction(format!(
                    "buffer holds {} components, not a non-zero multiple of {components}",
                    data.len()
                )));
            }
        }
        BufferSource::Animated(keys) => {
            if b.format.component != ComponentType::Float || keys.kind() != ValueKind::Buffer {
                return Err(TrellisError::construction(
                    "animated buffers must be float buffers keyed with buffer values",
                ));
            }
            let len = keys.buffer_len().unwrap_or(0);
            if len == 0 || len % components != 0 {
                return Err(TrellisError::construction(format!(
                    "animated buffer keyframes hold {len} components, not a non-zero multiple of {components}"
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/graph/validate.rs"]
mod tests;
