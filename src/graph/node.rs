use std::collections::BTreeMap;

use crate::{
    animation::keyframes::{AnimatedParam, Param},
    foundation::core::{Mat4, Scissor, Vec3},
    foundation::error::{TrellisError, TrellisResult},
    graph::ids::NodeId,
    state::draw_state::DrawStateOverride,
    timing::time_range::TimeRanges,
    transform::local::{Clipping, Projection},
};

/// Vertex shader used when a `Program` leaves its vertex stage unset.
pub const DEFAULT_VERTEX_SHADER: &str = include_str!("../../shaders/default.vert");
/// Fragment shader used when a `Program` leaves its fragment stage unset.
pub const DEFAULT_FRAGMENT_SHADER: &str = include_str!("../../shaders/default.frag");

/// A scene-graph node: optional debug label plus its kind-specific payload.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Node {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub kind: NodeKind,
}

impl Node {
    pub fn new(kind: impl Into<NodeKind>) -> Self {
        Self {
            label: None,
            kind: kind.into(),
        }
    }

    pub fn labeled(label: impl Into<String>, kind: impl Into<NodeKind>) -> Self {
        Self {
            label: Some(label.into()),
            kind: kind.into(),
        }
    }

    /// Label, or `#index` for unlabelled nodes.
    pub fn display_label(&self, id: NodeId) -> String {
        match &self.label {
            Some(l) => l.clone(),
            None => id.to_string(),
        }
    }
}

/// Capability set of a node kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Capability {
    Container,
    Transform,
    Filter,
    Drawable,
    ComputeDispatch,
    Resource,
}

/// Closed set of node kinds; traversal dispatches on the variant.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type")]
pub enum NodeKind {
    Group(Group),
    Rotate(Rotate),
    RotateQuat(RotateQuat),
    Scale(Scale),
    Translate(Translate),
    Transform(StaticTransform),
    Camera(Camera),
    GraphicConfig(GraphicConfig),
    TimeRangeFilter(TimeRangeFilter),
    UserSwitch(UserSwitch),
    RenderToTexture(RenderToTexture),
    Render(Render),
    Compute(Compute),
    Buffer(Buffer),
    Texture2D(Texture2D),
    Program(Program),
    ComputeProgram(ComputeProgram),
    Geometry(Geometry),
    Uniform(Uniform),
}

/// A reference from one node to another, named by the slot that holds it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Edge {
    pub slot: String,
    pub target: NodeId,
}

impl Edge {
    fn new(slot: impl Into<String>, target: NodeId) -> Self {
        Self {
            slot: slot.into(),
            target,
        }
    }
}

impl NodeKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Group(_) => "Group",
            Self::Rotate(_) => "Rotate",
            Self::RotateQuat(_) => "RotateQuat",
            Self::Scale(_) => "Scale",
            Self::Translate(_) => "Translate",
            Self::Transform(_) => "Transform",
            Self::Camera(_) => "Camera",
            Self::GraphicConfig(_) => "GraphicConfig",
            Self::TimeRangeFilter(_) => "TimeRangeFilter",
            Self::UserSwitch(_) => "UserSwitch",
            Self::RenderToTexture(_) => "RenderToTexture",
            Self::Render(_) => "Render",
            Self::Compute(_) => "Compute",
            Self::Buffer(_) => "Buffer",
            Self::Texture2D(_) => "Texture2D",
            Self::Program(_) => "Program",
            Self::ComputeProgram(_) => "ComputeProgram",
            Self::Geometry(_) => "Geometry",
            Self::Uniform(_) => "Uniform",
        }
    }

    pub fn capability(&self) -> Capability {
        match self {
            Self::Group(_) => Capability::Container,
            Self::Rotate(_)
            | Self::RotateQuat(_)
            | Self::Scale(_)
            | Self::Translate(_)
            | Self::Transform(_)
            | Self::Camera(_) => Capability::Transform,
            Self::GraphicConfig(_)
            | Self::TimeRangeFilter(_)
            | Self::UserSwitch(_)
            | Self::RenderToTexture(_) => Capability::Filter,
            Self::Render(_) => Capability::Drawable,
            Self::Compute(_) => Capability::ComputeDispatch,
            Self::Buffer(_)
            | Self::Texture2D(_)
            | Self::Program(_)
            | Self::ComputeProgram(_)
            | Self::Geometry(_)
            | Self::Uniform(_) => Capability::Resource,
        }
    }

    /// The wrapped child of transform and filter nodes.
    pub fn child(&self) -> Option<NodeId> {
        match self {
            Self::Rotate(n) => Some(n.child),
            Self::RotateQuat(n) => Some(n.child),
            Self::Scale(n) => Some(n.child),
            Self::Translate(n) => Some(n.child),
            Self::Transform(n) => Some(n.child),
            Self::Camera(n) => Some(n.child),
            Self::GraphicConfig(n) => Some(n.child),
            Self::TimeRangeFilter(n) => Some(n.child),
            Self::UserSwitch(n) => Some(n.child),
            Self::RenderToTexture(n) => Some(n.child),
            _ => None,
        }
    }

    /// Every outgoing reference, in a stable order.
    pub fn edges(&self) -> Vec<Edge> {
        let mut out = Vec::new();
        match self {
            Self::Group(g) => {
                out.extend(g.children.iter().map(|&c| Edge::new("child", c)));
            }
            Self::RenderToTexture(n) => {
                out.push(Edge::new("child", n.child));
                out.extend(
                    n.color_textures
                        .iter()
                        .enumerate()
                        .map(|(i, &t)| Edge::new(format!("color{i}"), t)),
                );
                if let Some(d) = n.depth_texture {
                    out.push(Edge::new("depth", d));
                }
            }
            Self::Render(r) => {
                out.push(Edge::new("geometry", r.geometry));
                out.push(Edge::new("program", r.program));
                r.bindings.push_edges(&mut out);
                for (name, &id) in &r.attributes {
                    out.push(Edge::new(format!("attributes.{name}"), id));
                }
                for (name, &id) in &r.instance_attributes {
                    out.push(Edge::new(format!("instance_attributes.{name}"), id));
                }
            }
            Self::Compute(c) => {
                out.push(Edge::new("program", c.program));
                c.bindings.push_edges(&mut out);
            }
            Self::Texture2D(t) => {
                if let Some(src) = t.data_src {
                    out.push(Edge::new("data_src", src));
                }
            }
            Self::Geometry(g) => {
                out.push(Edge::new("vertices", g.vertices));
                if let Some(id) = g.uvcoords {
                    out.push(Edge::new("uvcoords", id));
                }
                if let Some(id) = g.normals {
                    out.push(Edge::new("normals", id));
                }
                if let Some(id) = g.indices {
                    out.push(Edge::new("indices", id));
                }
            }
            other => {
                if let Some(child) = other.child() {
                    out.push(Edge::new("child", child));
                }
            }
        }
        out
    }

    /// Mutable access to every outgoing reference, in the same order as [`Self::edges`].
    pub(crate) fn refs_mut(&mut self) -> Vec<&mut NodeId> {
        let mut out: Vec<&mut NodeId> = Vec::new();
        match self {
            Self::Group(g) => out.extend(g.children.iter_mut()),
            Self::RenderToTexture(n) => {
                out.push(&mut n.child);
                out.extend(n.color_textures.iter_mut());
                if let Some(d) = n.depth_texture.as_mut() {
                    out.push(d);
                }
            }
            Self::Render(r) => {
                out.push(&mut r.geometry);
                out.push(&mut r.program);
                r.bindings.push_refs(&mut out);
                out.extend(r.attributes.values_mut());
                out.extend(r.instance_attributes.values_mut());
            }
            Self::Compute(c) => {
                out.push(&mut c.program);
                c.bindings.push_refs(&mut out);
            }
            Self::Texture2D(t) => {
                if let Some(src) = t.data_src.as_mut() {
                    out.push(src);
                }
            }
            Self::Geometry(g) => {
                out.push(&mut g.vertices);
                if let Some(id) = g.uvcoords.as_mut() {
                    out.push(id);
                }
                if let Some(id) = g.normals.as_mut() {
                    out.push(id);
                }
                if let Some(id) = g.indices.as_mut() {
                    out.push(id);
                }
            }
            Self::Rotate(n) => out.push(&mut n.child),
            Self::RotateQuat(n) => out.push(&mut n.child),
            Self::Scale(n) => out.push(&mut n.child),
            Self::Translate(n) => out.push(&mut n.child),
            Self::Transform(n) => out.push(&mut n.child),
            Self::Camera(n) => out.push(&mut n.child),
            Self::GraphicConfig(n) => out.push(&mut n.child),
            Self::TimeRangeFilter(n) => out.push(&mut n.child),
            Self::UserSwitch(n) => out.push(&mut n.child),
            Self::Buffer(_)
            | Self::Program(_)
            | Self::ComputeProgram(_)
            | Self::Uniform(_) => {}
        }
        out
    }
}

macro_rules! node_kind_from {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(
            impl From<$ty> for NodeKind {
                fn from(v: $ty) -> Self {
                    Self::$variant(v)
                }
            }
        )*
    };
}

node_kind_from!(
    Group(Group),
    Rotate(Rotate),
    RotateQuat(RotateQuat),
    Scale(Scale),
    Translate(Translate),
    Transform(StaticTransform),
    Camera(Camera),
    GraphicConfig(GraphicConfig),
    TimeRangeFilter(TimeRangeFilter),
    UserSwitch(UserSwitch),
    RenderToTexture(RenderToTexture),
    Render(Render),
    Compute(Compute),
    Buffer(Buffer),
    Texture2D(Texture2D),
    Program(Program),
    ComputeProgram(ComputeProgram),
    Geometry(Geometry),
    Uniform(Uniform),
);

/// Ordered children; order is draw order.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Group {
    pub children: Vec<NodeId>,
}

fn zero_anchor() -> Vec3 {
    Vec3::ZERO
}

fn is_zero(v: &Vec3) -> bool {
    *v == Vec3::ZERO
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Rotate {
    pub child: NodeId,
    /// Degrees.
    pub angle: Param,
    pub axis: Vec3,
    #[serde(default = "zero_anchor", skip_serializing_if = "is_zero")]
    pub anchor: Vec3,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RotateQuat {
    pub child: NodeId,
    pub quat: Param,
    #[serde(default = "zero_anchor", skip_serializing_if = "is_zero")]
    pub anchor: Vec3,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Scale {
    pub child: NodeId,
    pub factors: Param,
    #[serde(default = "zero_anchor", skip_serializing_if = "is_zero")]
    pub anchor: Vec3,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Translate {
    pub child: NodeId,
    pub vector: Param,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StaticTransform {
    pub child: NodeId,
    pub matrix: Mat4,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Camera {
    pub child: NodeId,
    pub eye: Param,
    pub center: Param,
    pub up: Param,
    pub projection: Projection,
    #[serde(default)]
    pub clipping: Clipping,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GraphicConfig {
    pub child: NodeId,
    #[serde(default)]
    pub state: DrawStateOverride,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TimeRangeFilter {
    pub child: NodeId,
    pub ranges: TimeRanges,
}

/// Caller-controlled gate; re-enabling resumes at the current scene time.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct UserSwitch {
    pub child: NodeId,
    pub enabled: bool,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RenderToTexture {
    pub child: NodeId,
    pub color_textures: Vec<NodeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth_texture: Option<NodeId>,
    #[serde(default)]
    pub clear_color: [f32; 4],
    /// Keep previous contents instead of clearing before the pass.
    #[serde(default)]
    pub no_clear: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scissor: Option<Scissor>,
}

impl RenderToTexture {
    pub fn new(child: NodeId, color_textures: Vec<NodeId>) -> Self {
        Self {
            child,
            color_textures,
            depth_texture: None,
            clear_color: [0.0; 4],
            no_clear: false,
            scissor: None,
        }
    }
}

/// Named resource bindings shared by draw and compute nodes.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Bindings {
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub uniforms: BTreeMap<String, NodeId>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub textures: BTreeMap<String, NodeId>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub buffers: BTreeMap<String, NodeId>,
}

impl Bindings {
    fn push_edges(&self, out: &mut Vec<Edge>) {
        for (name, &id) in &self.uniforms {
            out.push(Edge::new(format!("uniforms.{name}"), id));
        }
        for (name, &id) in &self.textures {
            out.push(Edge::new(format!("textures.{name}"), id));
        }
        for (name, &id) in &self.buffers {
            out.push(Edge::new(format!("buffers.{name}"), id));
        }
    }

    fn push_refs<'a>(&'a mut self, out: &mut Vec<&'a mut NodeId>) {
        out.extend(self.uniforms.values_mut());
        out.extend(self.textures.values_mut());
        out.extend(self.buffers.values_mut());
    }
}

fn one() -> u32 {
    1
}

fn is_one(v: &u32) -> bool {
    *v == 1
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Render {
    pub geometry: NodeId,
    pub program: NodeId,
    #[serde(default)]
    pub bindings: Bindings,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, NodeId>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub instance_attributes: BTreeMap<String, NodeId>,
    #[serde(default = "one", skip_serializing_if = "is_one")]
    pub nb_instances: u32,
}

impl Render {
    pub fn new(geometry: NodeId, program: NodeId) -> Self {
        Self {
            geometry,
            program,
            bindings: Bindings::default(),
            attributes: BTreeMap::new(),
            instance_attributes: BTreeMap::new(),
            nb_instances: 1,
        }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Compute {
    pub program: NodeId,
    pub work_groups: [u32; 3],
    #[serde(default)]
    pub bindings: Bindings,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentType {
    Float,
    Int,
    #[serde(rename = "uint")]
    UInt,
}

/// Element layout of a buffer: component type times component count.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct BufferFormat {
    pub component: ComponentType,
    pub components: u8,
}

impl BufferFormat {
    pub const FLOAT: Self = Self::float(1);
    pub const VEC2: Self = Self::float(2);
    pub const VEC3: Self = Self::float(3);
    pub const VEC4: Self = Self::float(4);
    pub const MAT4: Self = Self::float(16);
    pub const INT: Self = Self {
        component: ComponentType::Int,
        components: 1,
    };
    pub const UINT: Self = Self {
        component: ComponentType::UInt,
        components: 1,
    };

    const fn float(components: u8) -> Self {
        Self {
            component: ComponentType::Float,
            components,
        }
    }

    /// Bytes per element; every component type is 4 bytes wide.
    pub fn element_size(self) -> usize {
        4 * usize::from(self.components)
    }

    pub fn validate(self) -> TrellisResult<()> {
        if !matches!(self.components, 1..=4 | 16) {
            return Err(TrellisError::construction(format!(
                "buffer element must have 1-4 or 16 components (got {})",
                self.components
            )));
        }
        Ok(())
    }
}

/// Raw CPU-side buffer payload; components are stored flat.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum BufferData {
    Float(Vec<f32>),
    Int(Vec<i32>),
    #[serde(rename = "uint")]
    UInt(Vec<u32>),
}

impl BufferData {
    pub fn component(&self) -> ComponentType {
        match self {
            Self::Float(_) => ComponentType::Float,
            Self::Int(_) => ComponentType::Int,
            Self::UInt(_) => ComponentType::UInt,
        }
    }

    /// Number of scalar components.
    pub fn len(&self) -> usize {
        match self {
            Self::Float(v) => v.len(),
            Self::Int(v) => v.len(),
            Self::UInt(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Float(v) => bytemuck::cast_slice(v),
            Self::Int(v) => bytemuck::cast_slice(v),
            Self::UInt(v) => bytemuck::cast_slice(v),
        }
    }

    /// Zero-filled payload of `components` scalars.
    pub fn zeroed(component: ComponentType, components: usize) -> Self {
        match component {
            ComponentType::Float => Self::Float(vec![0.0; components]),
            ComponentType::Int => Self::Int(vec![0; components]),
            ComponentType::UInt => Self::UInt(vec![0; components]),
        }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BufferSource {
    Static(BufferData),
    /// Float buffer interpolated element-wise between keyframes.
    Animated(AnimatedParam),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BufferUsage {
    #[default]
    Static,
    Dynamic,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Buffer {
    pub format: BufferFormat,
    pub source: BufferSource,
    #[serde(default)]
    pub usage: BufferUsage,
}

impl Buffer {
    pub fn new(format: BufferFormat, data: BufferData) -> Self {
        Self {
            format,
            source: BufferSource::Static(data),
            usage: BufferUsage::Static,
        }
    }

    pub fn animated(format: BufferFormat, keys: AnimatedParam) -> Self {
        Self {
            format,
            source: BufferSource::Animated(keys),
            usage: BufferUsage::Dynamic,
        }
    }

    fn scalar_len(&self) -> usize {
        match &self.source {
            BufferSource::Static(d) => d.len(),
            BufferSource::Animated(a) => a.buffer_len().unwrap_or(0),
        }
    }

    /// Number of elements.
    pub fn count(&self) -> usize {
        self.scalar_len() / usize::from(self.format.components.max(1))
    }

    pub fn byte_size(&self) -> usize {
        self.scalar_len() * 4
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextureFormat {
    Rgba8Unorm,
    R8Unorm,
    R32Float,
    Rgba32Float,
    Depth16Unorm,
    Depth24UnormStencil8,
    Depth32Float,
}

impl TextureFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Self::R8Unorm => 1,
            Self::Depth16Unorm => 2,
            Self::Rgba8Unorm | Self::R32Float | Self::Depth24UnormStencil8 | Self::Depth32Float => 4,
            Self::Rgba32Float => 16,
        }
    }

    pub fn is_depth(self) -> bool {
        matches!(
            self,
            Self::Depth16Unorm | Self::Depth24UnormStencil8 | Self::Depth32Float
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Filter {
    Nearest,
    Linear,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MipmapFilter {
    None,
    Nearest,
    Linear,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Wrap {
    ClampToEdge,
    MirroredRepeat,
    Repeat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Access {
    Read,
    Write,
    ReadWrite,
}

impl Access {
    pub fn writes(self) -> bool {
        matches!(self, Self::Write | Self::ReadWrite)
    }
}

/// Fixed-size 2D texture. Dimensions and format never change after first upload.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Texture2D {
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub min_filter: Filter,
    pub mag_filter: Filter,
    pub mipmap_filter: MipmapFilter,
    pub wrap_s: Wrap,
    pub wrap_t: Wrap,
    pub access: Access,
    /// Buffer whose payload fills the texture.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_src: Option<NodeId>,
}

impl Texture2D {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            format: TextureFormat::Rgba8Unorm,
            min_filter: Filter::Linear,
            mag_filter: Filter::Linear,
            mipmap_filter: MipmapFilter::None,
            wrap_s: Wrap::ClampToEdge,
            wrap_t: Wrap::ClampToEdge,
            access: Access::Read,
            data_src: None,
        }
    }

    pub fn byte_size(&self) -> usize {
        self.width as usize * self.height as usize * self.format.bytes_per_pixel()
    }
}

/// Graphics program; unset stages use the built-in shaders.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Program {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vertex: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fragment: Option<String>,
}

impl Program {
    pub fn vertex_source(&self) -> &str {
        self.vertex.as_deref().unwrap_or(DEFAULT_VERTEX_SHADER)
    }

    pub fn fragment_source(&self) -> &str {
        self.fragment.as_deref().unwrap_or(DEFAULT_FRAGMENT_SHADER)
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ComputeProgram {
    pub compute: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topology {
    Points,
    Lines,
    LineStrip,
    #[default]
    Triangles,
    TriangleStrip,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Geometry {
    pub vertices: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uvcoords: Option<NodeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normals: Option<NodeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indices: Option<NodeId>,
    #[serde(default)]
    pub topology: Topology,
}

/// Shader parameter bound by name; constant or animated.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Uniform {
    pub param: Param,
}
