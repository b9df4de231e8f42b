//! Trellis is a scene-graph engine for real-time and offline GPU rendering.
//!
//! A scene is a DAG of typed nodes: transforms, filters, draw and compute nodes, and shared
//! resources. The engine walks it once per frame in declared order:
//!
//! - Build a [`Scene`] with [`SceneBuilder`] (or load a [`SceneDef`] from JSON)
//! - Create an [`Engine`] over a [`GpuBackend`]
//! - Call [`Engine::render_frame`] for each output time
#![forbid(unsafe_code)]

mod foundation;

pub(crate) mod animation;
pub(crate) mod backend;
pub(crate) mod engine;
pub(crate) mod graph;
pub(crate) mod resource;
pub(crate) mod state;
pub(crate) mod timing;
pub(crate) mod transform;

pub use crate::foundation::core::{
    AspectRatio, Fps, FrameIndex, Mat4, Quat, SceneTiming, Scissor, Vec2, Vec3, Vec4,
};
pub use crate::foundation::error::{ErrorCategory, TrellisError, TrellisResult};

pub use crate::animation::ease::Easing;
pub use crate::animation::keyframes::{AnimatedParam, Keyframe, Param};
pub use crate::animation::value::{Lerp, Value, ValueKind, slerp_shortest};

pub use crate::timing::time_range::{
    DEFAULT_PREFETCH_TIME, Liveness, RangeCommand, RangeKind, TimeRanges,
};

pub use crate::transform::local::{
    Clipping, Projection, TransformCtx, camera, rotate, rotate_quat, scale, translate,
    world_transform,
};

pub use crate::state::draw_state::{
    BlendFactor, BlendOp, BlendState, CompareFunc, CullMode, DepthState, DrawState,
    DrawStateOverride, StencilOp, StencilState,
};
pub use crate::state::stack::DrawStateStack;

pub use crate::graph::arena::{BindingSlot, Scene};
pub use crate::graph::builder::SceneBuilder;
pub use crate::graph::ids::NodeId;
pub use crate::graph::node::{
    Access, Bindings, Buffer, BufferData, BufferFormat, BufferSource, BufferUsage, Camera,
    Capability, ComponentType, Compute, ComputeProgram, DEFAULT_FRAGMENT_SHADER,
    DEFAULT_VERTEX_SHADER, Edge, Filter, Geometry, GraphicConfig, Group, MipmapFilter, Node,
    NodeKind, Program, Render, RenderToTexture, Rotate, RotateQuat, Scale, StaticTransform,
    Texture2D, TextureFormat, TimeRangeFilter, Topology, Translate, Uniform, UserSwitch, Wrap,
};
pub use crate::graph::serialize::{SCENE_FORMAT_VERSION, SceneDef};

pub use crate::backend::cpu::{CpuBackend, CpuBackendOpts, CpuStats, FrameRGBA};
pub use crate::backend::gpu::{
    BackendLimits, BufferDesc, BufferHandle, DispatchCall, DrawCall, GpuBackend, GpuHandle,
    ProgramDesc, ProgramHandle, ProgramSource, TargetBinding, TextureDesc, TextureHandle,
};
pub use crate::backend::recording::{Command, RecordingBackend};

pub use crate::resource::tracker::{ResourceDesc, ResourceTracker, ResourceUpload, TrackerStats};

pub use crate::engine::frame::{EngineOpts, FrameStats};
pub use crate::engine::session::Engine;
