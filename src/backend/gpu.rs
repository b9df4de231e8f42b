use crate::{
    animation::value::Value,
    foundation::core::{Mat4, Scissor},
    foundation::error::TrellisResult,
    graph::node::{
        Access, BufferFormat, BufferUsage, Filter, MipmapFilter, TextureFormat, Topology, Wrap,
    },
    state::draw_state::DrawState,
};

macro_rules! handle {
    ($($(#[$m:meta])* $name:ident),* $(,)?) => {
        $(
            $(#[$m])*
            #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
            pub struct $name(pub u64);

            impl std::fmt::Display for $name {
                fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    write!(f, "{}({})", stringify!($name), self.0)
                }
            }
        )*
    };
}

handle!(
    /// Backend-owned buffer object.
    BufferHandle,
    /// Backend-owned texture object.
    TextureHandle,
    /// Backend-owned linked program.
    ProgramHandle,
);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GpuHandle {
    Buffer(BufferHandle),
    Texture(TextureHandle),
    Program(ProgramHandle),
}

impl std::fmt::Display for GpuHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buffer(h) => h.fmt(f),
            Self::Texture(h) => h.fmt(f),
            Self::Program(h) => h.fmt(f),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct BufferDesc {
    pub label: String,
    pub format: BufferFormat,
    /// Element count.
    pub count: usize,
    pub usage: BufferUsage,
}

impl BufferDesc {
    pub fn byte_size(&self) -> usize {
        self.count * self.format.element_size()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TextureDesc {
    pub label: String,
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub min_filter: Filter,
    pub mag_filter: Filter,
    pub mipmap_filter: MipmapFilter,
    pub wrap_s: Wrap,
    pub wrap_t: Wrap,
}

impl TextureDesc {
    pub fn byte_size(&self) -> usize {
        self.width as usize * self.height as usize * self.format.bytes_per_pixel()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ProgramSource {
    Graphics { vertex: String, fragment: String },
    Compute { compute: String },
}

#[derive(Clone, Debug, PartialEq)]
pub struct ProgramDesc {
    pub label: String,
    pub source: ProgramSource,
}

/// Where subsequent draws land. No color attachments means the default framebuffer.
#[derive(Clone, Debug, PartialEq)]
pub struct TargetBinding {
    pub color: Vec<TextureHandle>,
    pub depth: Option<TextureHandle>,
    pub width: u32,
    pub height: u32,
    /// Clear color applied when the target is bound; `None` keeps previous contents.
    pub clear: Option<[f32; 4]>,
    /// Pixels outside this rectangle are never touched by the pass.
    pub scissor: Option<Scissor>,
}

impl TargetBinding {
    pub fn is_default(&self) -> bool {
        self.color.is_empty()
    }
}

/// One resolved draw: every reference is already a live backend handle.
#[derive(Clone, Debug, PartialEq)]
pub struct DrawCall {
    pub label: String,
    pub program: ProgramHandle,
    pub topology: Topology,
    pub vertices: BufferHandle,
    pub vertex_count: u32,
    pub uvcoords: Option<BufferHandle>,
    pub normals: Option<BufferHandle>,
    /// Index buffer and index count.
    pub indices: Option<(BufferHandle, u32)>,
    pub instances: u32,
    pub uniforms: Vec<(String, Value)>,
    pub textures: Vec<(String, TextureHandle)>,
    pub buffers: Vec<(String, BufferHandle)>,
    pub attributes: Vec<(String, BufferHandle)>,
    pub instance_attributes: Vec<(String, BufferHandle)>,
    pub model_view: Mat4,
    pub projection: Mat4,
    pub state: DrawState,
}

impl DrawCall {
    pub fn uniform(&self, name: &str) -> Option<&Value> {
        self.uniforms
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn texture(&self, name: &str) -> Option<TextureHandle> {
        self.textures
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, h)| *h)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DispatchCall {
    pub label: String,
    pub program: ProgramHandle,
    pub work_groups: [u32; 3],
    pub uniforms: Vec<(String, Value)>,
    pub textures: Vec<(String, TextureHandle, Access)>,
    pub buffers: Vec<(String, BufferHandle)>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BackendLimits {
    pub max_work_groups: [u32; 3],
    pub max_texture_size: u32,
    pub max_color_attachments: u32,
}

impl Default for BackendLimits {
    fn default() -> Self {
        Self {
            max_work_groups: [65_535; 3],
            max_texture_size: 16_384,
            max_color_attachments: 8,
        }
    }
}

/// Narrow command interface the engine drives once per frame.
///
/// Commands arrive in traversal order between `begin_frame` and `end_frame`; `end_frame` is the
/// submission point. A failed frame ends with `abort_frame` instead.
pub trait GpuBackend {
    fn limits(&self) -> BackendLimits {
        BackendLimits::default()
    }

    fn begin_frame(&mut self) -> TrellisResult<()>;

    fn end_frame(&mut self) -> TrellisResult<()>;

    /// Drop any partially recorded work. Resources stay valid.
    fn abort_frame(&mut self) {}

    fn create_buffer(&mut self, desc: &BufferDesc) -> TrellisResult<BufferHandle>;

    fn upload_buffer(&mut self, handle: BufferHandle, bytes: &[u8]) -> TrellisResult<()>;

    fn destroy_buffer(&mut self, handle: BufferHandle) -> TrellisResult<()>;

    fn create_texture(&mut self, desc: &TextureDesc) -> TrellisResult<TextureHandle>;

    fn upload_texture(&mut self, handle: TextureHandle, bytes: &[u8]) -> TrellisResult<()>;

    fn destroy_texture(&mut self, handle: TextureHandle) -> TrellisResult<()>;

    /// Compile and link. Failures surface as resource errors.
    fn create_program(&mut self, desc: &ProgramDesc) -> TrellisResult<ProgramHandle>;

    fn destroy_program(&mut self, handle: ProgramHandle) -> TrellisResult<()>;

    fn set_target(&mut self, target: &TargetBinding) -> TrellisResult<()>;

    fn draw(&mut self, call: &DrawCall) -> TrellisResult<()>;

    fn dispatch(&mut self, call: &DispatchCall) -> TrellisResult<()>;

    /// Make prior GPU writes to `handle` visible to subsequent reads.
    fn barrier(&mut self, handle: GpuHandle) -> TrellisResult<()>;

    fn generate_mipmaps(&mut self, handle: TextureHandle) -> TrellisResult<()>;

    fn destroy(&mut self, handle: GpuHandle) -> TrellisResult<()> {
        match handle {
            GpuHandle::Buffer(h) => self.destroy_buffer(h),
            GpuHandle::Texture(h) => self.destroy_texture(h),
            GpuHandle::Program(h) => self.destroy_program(h),
        }
    }
}
