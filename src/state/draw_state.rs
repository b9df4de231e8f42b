use crate::foundation::core::Scissor;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlendFactor {
    Zero,
    One,
    SrcColor,
    OneMinusSrcColor,
    DstColor,
    OneMinusDstColor,
    SrcAlpha,
    OneMinusSrcAlpha,
    DstAlpha,
    OneMinusDstAlpha,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlendOp {
    Add,
    Subtract,
    ReverseSubtract,
    Min,
    Max,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareFunc {
    Never,
    Less,
    Equal,
    LessEqual,
    Greater,
    NotEqual,
    GreaterEqual,
    Always,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StencilOp {
    Keep,
    Zero,
    Replace,
    Increment,
    IncrementWrap,
    Decrement,
    DecrementWrap,
    Invert,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CullMode {
    Front,
    Back,
    FrontAndBack,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct BlendState {
    pub enabled: bool,
    pub src_color: BlendFactor,
    pub dst_color: BlendFactor,
    pub src_alpha: BlendFactor,
    pub dst_alpha: BlendFactor,
    pub op_color: BlendOp,
    pub op_alpha: BlendOp,
}

impl Default for BlendState {
    fn default() -> Self {
        Self {
            enabled: false,
            src_color: BlendFactor::One,
            dst_color: BlendFactor::Zero,
            src_alpha: BlendFactor::One,
            dst_alpha: BlendFactor::Zero,
            op_color: BlendOp::Add,
            op_alpha: BlendOp::Add,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct DepthState {
    pub test: bool,
    pub write: bool,
    pub func: CompareFunc,
}

impl Default for DepthState {
    fn default() -> Self {
        Self {
            test: false,
            write: true,
            func: CompareFunc::Less,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct StencilState {
    pub test: bool,
    pub write_mask: u8,
    pub func: CompareFunc,
    pub reference: i32,
    pub read_mask: u8,
    pub fail: StencilOp,
    pub depth_fail: StencilOp,
    pub depth_pass: StencilOp,
}

impl Default for StencilState {
    fn default() -> Self {
        Self {
            test: false,
            write_mask: 0xff,
            func: CompareFunc::Always,
            reference: 0,
            read_mask: 0xff,
            fail: StencilOp::Keep,
            depth_fail: StencilOp::Keep,
            depth_pass: StencilOp::Keep,
        }
    }
}

/// Fixed-function pipeline state in effect for a draw.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct DrawState {
    pub blend: BlendState,
    /// RGBA write mask, bit 0 = red.
    pub color_write_mask: u8,
    pub depth: DepthState,
    pub stencil: StencilState,
    /// `None` disables face culling.
    pub cull: Option<CullMode>,
    /// `None` disables the scissor test.
    pub scissor: Option<Scissor>,
}

impl Default for DrawState {
    /// GL defaults: blending, depth, stencil, culling and scissoring off; all channels written.
    fn default() -> Self {
        Self {
            blend: BlendState::default(),
            color_write_mask: 0b1111,
            depth: DepthState::default(),
            stencil: StencilState::default(),
            cull: None,
            scissor: None,
        }
    }
}

/// Sparse set of draw-state fields a `GraphicConfig` node overrides.
///
/// Unset fields inherit the enclosing scope's value.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct DrawStateOverride {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blend: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blend_src_factor: Option<BlendFactor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blend_dst_factor: Option<BlendFactor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blend_src_factor_a: Option<BlendFactor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blend_dst_factor_a: Option<BlendFactor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blend_op: Option<BlendOp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blend_op_a: Option<BlendOp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_write_mask: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depth_test: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depth_write: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depth_func: Option<CompareFunc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stencil_test: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stencil_write_mask: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stencil_func: Option<CompareFunc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stencil_ref: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stencil_read_mask: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stencil_fail: Option<StencilOp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stencil_depth_fail: Option<StencilOp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stencil_depth_pass: Option<StencilOp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cull_face: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cull_face_mode: Option<CullMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scissor_test: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scissor: Option<Scissor>,
}

impl DrawStateOverride {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Premultiplied-alpha "over" blending, the common compositing setup.
    pub fn alpha_blend() -> Self {
        Self {
            blend: Some(true),
            blend_src_factor: Some(BlendFactor::One),
            blend_dst_factor: Some(BlendFactor::OneMinusSrcAlpha),
            blend_src_factor_a: Some(BlendFactor::One),
            blend_dst_factor_a: Some(BlendFactor::OneMinusSrcAlpha),
            ..Default::default()
        }
    }

    /// `base` with every set field replaced.
    pub fn apply(&self, base: &DrawState) -> DrawState {
        let mut s = *base;
        if let Some(v) = self.blend {
            s.blend.enabled = v;
        }
        if let Some(v) = self.blend_src_factor {
            s.blend.src_color = v;
        }
        if let Some(v) = self.blend_dst_factor {
            s.blend.dst_color = v;
        }
        if let Some(v) = self.blend_src_factor_a {
            s.blend.src_alpha = v;
        }
        if let Some(v) = self.blend_dst_factor_a {
            s.blend.dst_alpha = v;
        }
        if let Some(v) = self.blend_op {
            s.blend.op_color = v;
        }
        if let Some(v) = self.blend_op_a {
            s.blend.op_alpha = v;
        }
        if let Some(v) = self.color_write_mask {
            s.color_write_mask = v & 0b1111;
        }
        if let Some(v) = self.depth_test {
            s.depth.test = v;
        }
        if let Some(v) = self.depth_write {
            s.depth.write = v;
        }
        if let Some(v) = self.depth_func {
            s.depth.func = v;
        }
        if let Some(v) = self.stencil_test {
            s.stencil.test = v;
        }
        if let Some(v) = self.stencil_write_mask {
            s.stencil.write_mask = v;
        }
        if let Some(v) = self.stencil_func {
            s.stencil.func = v;
        }
        if let Some(v) = self.stencil_ref {
            s.stencil.reference = v;
        }
        if let Some(v) = self.stencil_read_mask {
            s.stencil.read_mask = v;
        }
        if let Some(v) = self.stencil_fail {
            s.stencil.fail = v;
        }
        if let Some(v) = self.stencil_depth_fail {
            s.stencil.depth_fail = v;
        }
        if let Some(v) = self.stencil_depth_pass {
            s.stencil.depth_pass = v;
        }
        match (self.cull_face, self.cull_face_mode) {
            (Some(false), _) => s.cull = None,
            (Some(true), mode) => s.cull = Some(mode.or(s.cull).unwrap_or(CullMode::Back)),
            (None, Some(mode)) => {
                if s.cull.is_some() {
                    s.cull = Some(mode);
                }
            }
            (None, None) => {}
        }
        match (self.scissor_test, self.scissor) {
            (Some(false), _) => s.scissor = None,
            (Some(true), rect) => s.scissor = rect.or(s.scissor),
            (None, Some(rect)) => {
                if s.scissor.is_some() {
                    s.scissor = Some(rect);
                }
            }
            (None, None) => {}
        }
        s
    }
}

#[cfg(test)]
#[path = "../../tests/unit/state/draw_state.rs"]
mod tests;
