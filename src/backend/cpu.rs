use std::collections::HashMap;

use crate::{
    backend::gpu::{
        BufferDesc, BufferHandle, DispatchCall, DrawCall, GpuBackend, GpuHandle, ProgramDesc,
        ProgramHandle, TargetBinding, TextureDesc, TextureHandle,
    },
    foundation::core::{Scissor, Vec4},
    foundation::error::{TrellisError, TrellisResult},
    graph::node::{TextureFormat, Topology},
    state::draw_state::{BlendFactor, BlendOp, BlendState, CullMode},
};

/// Straight-alpha RGBA8 pixels, rows top to bottom.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameRGBA {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl FrameRGBA {
    /// RGBA at `(x, y)`, or `None` outside the frame.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        let px = self.data.get(i..i + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }
}

#[derive(Clone, Copy, Debug)]
pub struct CpuBackendOpts {
    pub width: u32,
    pub height: u32,
}

impl Default for CpuBackendOpts {
    fn default() -> Self {
        Self {
            width: 640,
            height: 360,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CpuStats {
    pub draws: u64,
    pub triangles: u64,
    pub dispatches: u64,
}

/// Pixel storage; rows run bottom to top like a GL framebuffer.
#[derive(Clone, Debug)]
struct Surface {
    width: u32,
    height: u32,
    format: TextureFormat,
    data: Vec<u8>,
}

impl Surface {
    fn new(width: u32, height: u32, format: TextureFormat) -> Self {
        Self {
            width,
            height,
            format,
            data: vec![0; width as usize * height as usize * format.bytes_per_pixel()],
        }
    }

    fn texel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = (y as usize * self.width as usize + x as usize) * 4;
        [
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ]
    }
}

#[derive(Clone, Debug)]
struct CpuBuffer {
    components: usize,
    /// Raw 32-bit words; floats are reinterpreted on read.
    words: Vec<u32>,
}

enum Bound {
    Default,
    Texture(TextureHandle),
}

/// Software reference renderer.
///
/// Triangle coverage comes from `vello_cpu`; blending, culling, scissoring and the color write
/// mask are applied per pixel on top. Fragments are flat: the `color` uniform, modulated by a
/// nearest sample of `tex0` at the fragment's screen position when that texture is bound.
/// Depth and stencil state are accepted but not rasterized.
pub struct CpuBackend {
    framebuffer: Surface,
    buffers: HashMap<u64, CpuBuffer>,
    textures: HashMap<u64, Surface>,
    programs: HashMap<u64, String>,
    next_handle: u64,
    target: Bound,
    target_scissor: Option<Scissor>,
    stats: CpuStats,
}

impl CpuBackend {
    pub fn new(opts: CpuBackendOpts) -> TrellisResult<Self> {
        check_u16(opts.width, opts.height)?;
        Ok(Self {
            framebuffer: Surface::new(opts.width, opts.height, TextureFormat::Rgba8Unorm),
            buffers: HashMap::new(),
            textures: HashMap::new(),
            programs: HashMap::new(),
            next_handle: 0,
            target: Bound::Default,
            target_scissor: None,
            stats: CpuStats::default(),
        })
    }

    pub fn stats(&self) -> CpuStats {
        self.stats
    }

    pub fn live_resources(&self) -> usize {
        self.buffers.len() + self.textures.len() + self.programs.len()
    }

    /// Default framebuffer contents.
    pub fn read_frame(&self) -> FrameRGBA {
        read_surface(&self.framebuffer)
    }

    pub fn read_texture(&self, handle: TextureHandle) -> TrellisResult<FrameRGBA> {
        let tex = self
            .textures
            .get(&handle.0)
            .ok_or_else(|| unknown("texture", handle.0))?;
        if tex.format != TextureFormat::Rgba8Unorm {
            return Err(TrellisError::backend(format!(
                "cannot read back {:?} texture {handle}",
                tex.format
            )));
        }
        Ok(read_surface(tex))
    }

    fn next(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }

    fn target_mut(&mut self) -> TrellisResult<&mut Surface> {
        match self.target {
            Bound::Default => Ok(&mut self.framebuffer),
            Bound::Texture(h) => self
                .textures
                .get_mut(&h.0)
                .ok_or_else(|| unknown("texture", h.0)),
        }
    }

    fn floats(&self, handle: BufferHandle) -> TrellisResult<(&[f32], usize)> {
        let b = self
            .buffers
            .get(&handle.0)
            .ok_or_else(|| unknown("buffer", handle.0))?;
        Ok((bytemuck::cast_slice(&b.words), b.components))
    }

    fn fragment_source(&self, call: &DrawCall) -> TrellisResult<Fragment> {
        let color = match call.uniform("color") {
            Some(v) => v.as_vec4().ok_or_else(|| {
                TrellisError::backend(format!(
                    "draw '{}': uniform `color` must be a vec4, got {}",
                    call.label,
                    v.kind()
                ))
            })?,
            None => Vec4::ONE,
        };
        let texture = match call.texture("tex0") {
            Some(h) => {
                let tex = self
                    .textures
                    .get(&h.0)
                    .ok_or_else(|| unknown("texture", h.0))?;
                if tex.format != TextureFormat::Rgba8Unorm {
                    return Err(TrellisError::backend(format!(
                        "draw '{}': tex0 must be rgba8_unorm, got {:?}",
                        call.label, tex.format
                    )));
                }
                Some(tex.clone())
            }
            None => None,
        };
        Ok(Fragment { color, texture })
    }
}

struct Fragment {
    color: Vec4,
    texture: Option<Surface>,
}

impl Fragment {
    fn shade(&self, u: f32, v: f32) -> Vec4 {
        match &self.texture {
            Some(t) => {
                let x = ((u * t.width as f32) as u32).min(t.width - 1);
                let y = ((v * t.height as f32) as u32).min(t.height - 1);
                let [r, g, b, a] = t.texel(x, y);
                self.color * Vec4::new(r as f32, g as f32, b as f32, a as f32) / 255.0
            }
            None => self.color,
        }
    }
}

fn check_u16(width: u32, height: u32) -> TrellisResult<(u16, u16)> {
    let w: u16 = width
        .try_into()
        .map_err(|_| TrellisError::backend("surface width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| TrellisError::backend("surface height exceeds u16"))?;
    if w == 0 || h == 0 {
        return Err(TrellisError::backend("surface size must be non-zero"));
    }
    Ok((w, h))
}

fn unknown(kind: &str, id: u64) -> TrellisError {
    TrellisError::backend(format!("unknown {kind} handle {id}"))
}

fn read_surface(s: &Surface) -> FrameRGBA {
    let row = s.width as usize * 4;
    let mut data = Vec::with_capacity(s.data.len());
    for y in (0..s.height as usize).rev() {
        data.extend_from_slice(&s.data[y * row..(y + 1) * row]);
    }
    FrameRGBA {
        width: s.width,
        height: s.height,
        data,
    }
}

fn factor(f: BlendFactor, src: Vec4, dst: Vec4) -> Vec4 {
    match f {
        BlendFactor::Zero => Vec4::ZERO,
        BlendFactor::One => Vec4::ONE,
        BlendFactor::SrcColor => src,
        BlendFactor::OneMinusSrcColor => Vec4::ONE - src,
        BlendFactor::DstColor => dst,
        BlendFactor::OneMinusDstColor => Vec4::ONE - dst,
        BlendFactor::SrcAlpha => Vec4::splat(src.w),
        BlendFactor::OneMinusSrcAlpha => Vec4::splat(1.0 - src.w),
        BlendFactor::DstAlpha => Vec4::splat(dst.w),
        BlendFactor::OneMinusDstAlpha => Vec4::splat(1.0 - dst.w),
    }
}

fn combine(op: BlendOp, s: Vec4, d: Vec4) -> Vec4 {
    match op {
        BlendOp::Add => s + d,
        BlendOp::Subtract => s - d,
        BlendOp::ReverseSubtract => d - s,
        BlendOp::Min => s.min(d),
        BlendOp::Max => s.max(d),
    }
}

/// GL blend equation with separate color and alpha terms.
fn blend(state: &BlendState, src: Vec4, dst: Vec4) -> Vec4 {
    if !state.enabled {
        return src;
    }
    let sf = factor(state.src_color, src, dst);
    let df = factor(state.dst_color, src, dst);
    let sa = factor(state.src_alpha, src, dst).w;
    let da = factor(state.dst_alpha, src, dst).w;
    // Min/Max ignore the factors in GL.
    let (s, d) = match state.op_color {
        BlendOp::Min | BlendOp::Max => (src, dst),
        _ => (src * sf, dst * df),
    };
    let (s_a, d_a) = match state.op_alpha {
        BlendOp::Min | BlendOp::Max => (src.w, dst.w),
        _ => (src.w * sa, dst.w * da),
    };
    let rgb = combine(state.op_color, s, d);
    let a = combine(state.op_alpha, Vec4::splat(s_a), Vec4::splat(d_a)).x;
    Vec4::new(rgb.x, rgb.y, rgb.z, a)
}

fn to_unorm(v: Vec4) -> [u8; 4] {
    let c = (v.clamp(Vec4::ZERO, Vec4::ONE) * 255.0).round();
    [c.x as u8, c.y as u8, c.z as u8, c.w as u8]
}

/// Triangles of a draw in window coordinates (origin bottom-left), as vertex index triples.
fn triangles(topology: Topology, indices: &[u32]) -> Vec<[u32; 3]> {
    match topology {
        Topology::Triangles => indices
            .chunks_exact(3)
            .map(|t| [t[0], t[1], t[2]])
            .collect(),
        Topology::TriangleStrip => indices
            .windows(3)
            .enumerate()
            .map(|(i, w)| {
                // Odd triangles flip to keep a consistent winding.
                if i % 2 == 0 {
                    [w[0], w[1], w[2]]
                } else {
                    [w[1], w[0], w[2]]
                }
            })
            .collect(),
        Topology::Points | Topology::Lines | Topology::LineStrip => Vec::new(),
    }
}

impl GpuBackend for CpuBackend {
    fn begin_frame(&mut self) -> TrellisResult<()> {
        self.target = Bound::Default;
        self.target_scissor = None;
        Ok(())
    }

    fn end_frame(&mut self) -> TrellisResult<()> {
        self.target = Bound::Default;
        self.target_scissor = None;
        Ok(())
    }

    fn abort_frame(&mut self) {
        self.target = Bound::Default;
        self.target_scissor = None;
    }

    fn create_buffer(&mut self, desc: &BufferDesc) -> TrellisResult<BufferHandle> {
        let id = self.next();
        self.buffers.insert(
            id,
            CpuBuffer {
                components: usize::from(desc.format.components),
                words: vec![0; desc.count * usize::from(desc.format.components)],
            },
        );
        Ok(BufferHandle(id))
    }

    fn upload_buffer(&mut self, handle: BufferHandle, bytes: &[u8]) -> TrellisResult<()> {
        let b = self
            .buffers
            .get_mut(&handle.0)
            .ok_or_else(|| unknown("buffer", handle.0))?;
        if bytes.len() != b.words.len() * 4 {
            return Err(TrellisError::backend(format!(
                "upload of {} bytes into a {} byte buffer",
                bytes.len(),
                b.words.len() * 4
            )));
        }
        b.words = bytemuck::pod_collect_to_vec(bytes);
        Ok(())
    }

    fn destroy_buffer(&mut self, handle: BufferHandle) -> TrellisResult<()> {
        self.buffers
            .remove(&handle.0)
            .map(|_| ())
            .ok_or_else(|| unknown("buffer", handle.0))
    }

    fn create_texture(&mut self, desc: &TextureDesc) -> TrellisResult<TextureHandle> {
        check_u16(desc.width, desc.height)?;
        let id = self.next();
        self.textures
            .insert(id, Surface::new(desc.width, desc.height, desc.format));
        Ok(TextureHandle(id))
    }

    fn upload_texture(&mut self, handle: TextureHandle, bytes: &[u8]) -> TrellisResult<()> {
        let t = self
            .textures
            .get_mut(&handle.0)
            .ok_or_else(|| unknown("texture", handle.0))?;
        if bytes.len() != t.data.len() {
            return Err(TrellisError::backend(format!(
                "upload of {} bytes into a {} byte texture",
                bytes.len(),
                t.data.len()
            )));
        }
        t.data.copy_from_slice(bytes);
        Ok(())
    }

    fn destroy_texture(&mut self, handle: TextureHandle) -> TrellisResult<()> {
        self.textures
            .remove(&handle.0)
            .map(|_| ())
            .ok_or_else(|| unknown("texture", handle.0))
    }

    fn create_program(&mut self, desc: &ProgramDesc) -> TrellisResult<ProgramHandle> {
        let id = self.next();
        self.programs.insert(id, desc.label.clone());
        Ok(ProgramHandle(id))
    }

    fn destroy_program(&mut self, handle: ProgramHandle) -> TrellisResult<()> {
        self.programs
            .remove(&handle.0)
            .map(|_| ())
            .ok_or_else(|| unknown("program", handle.0))
    }

    fn set_target(&mut self, target: &TargetBinding) -> TrellisResult<()> {
        // Extra color attachments and the depth attachment are not rasterized.
        self.target = match target.color.first() {
            None => Bound::Default,
            Some(&h) => Bound::Texture(h),
        };
        self.target_scissor = target.scissor;
        let scissor = target.scissor;
        let surface = self.target_mut()?;
        if surface.format != TextureFormat::Rgba8Unorm {
            return Err(TrellisError::backend(format!(
                "cannot render into a {:?} target",
                surface.format
            )));
        }
        if let Some(clear) = target.clear {
            let rgba = to_unorm(Vec4::from_array(clear));
            let area = Scissor::full(surface.width, surface.height);
            let area = scissor.map_or(area, |s| s.intersect(&area));
            let row = surface.width as usize * 4;
            for y in area.y as usize..(area.y as u32 + area.height) as usize {
                for x in area.x as usize..(area.x as u32 + area.width) as usize {
                    let i = y * row + x * 4;
                    surface.data[i..i + 4].copy_from_slice(&rgba);
                }
            }
        }
        Ok(())
    }

    fn draw(&mut self, call: &DrawCall) -> TrellisResult<()> {
        self.stats.draws += 1;
        if !self.programs.contains_key(&call.program.0) {
            return Err(unknown("program", call.program.0));
        }
        let (positions, components) = self.floats(call.vertices)?;
        if components != 3 {
            return Err(TrellisError::backend(format!(
                "draw '{}': vertices must be vec3",
                call.label
            )));
        }
        let positions: Vec<Vec4> = positions
            .chunks_exact(3)
            .map(|p| Vec4::new(p[0], p[1], p[2], 1.0))
            .collect();
        let indices: Vec<u32> = match call.indices {
            Some((h, n)) => {
                let b = self
                    .buffers
                    .get(&h.0)
                    .ok_or_else(|| unknown("buffer", h.0))?;
                b.words.iter().take(n as usize).copied().collect()
            }
            None => (0..call.vertex_count).collect(),
        };
        let tris = triangles(call.topology, &indices);
        if tris.is_empty() {
            tracing::debug!(draw = %call.label, topology = ?call.topology, "nothing to rasterize");
            return Ok(());
        }
        let fragment = self.fragment_source(call)?;
        let state = call.state;
        let target_scissor = self.target_scissor;
        let surface = self.target_mut()?;
        let (w16, h16) = check_u16(surface.width, surface.height)?;
        let (w, h) = (surface.width as f32, surface.height as f32);

        let mvp = call.projection * call.model_view;
        let window: Vec<Option<(f64, f64)>> = positions
            .iter()
            .map(|&p| {
                let clip = mvp * p;
                if clip.w <= f32::EPSILON {
                    return None;
                }
                let ndc = clip / clip.w;
                Some((
                    f64::from((ndc.x + 1.0) * 0.5 * w),
                    f64::from((ndc.y + 1.0) * 0.5 * h),
                ))
            })
            .collect();

        let mut ctx = vello_cpu::RenderContext::new(w16, h16);
        ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(255, 255, 255, 255));
        let mut rasterized = 0u64;
        for [a, b, c] in tris {
            let corners = [a, b, c].map(|i| window.get(i as usize).copied().flatten());
            let [Some(pa), Some(pb), Some(pc)] = corners else {
                continue;
            };
            let area = (pb.0 - pa.0) * (pc.1 - pa.1) - (pc.0 - pa.0) * (pb.1 - pa.1);
            let front = area > 0.0;
            let culled = match state.cull {
                None => false,
                Some(CullMode::Back) => !front,
                Some(CullMode::Front) => front,
                Some(CullMode::FrontAndBack) => true,
            };
            if culled || area == 0.0 {
                continue;
            }
            // vello_cpu rasterizes top-down.
            let flip = |p: (f64, f64)| vello_cpu::kurbo::Point::new(p.0, f64::from(h) - p.1);
            let mut path = vello_cpu::kurbo::BezPath::new();
            path.move_to(flip(pa));
            path.line_to(flip(pb));
            path.line_to(flip(pc));
            path.close_path();
            ctx.fill_path(&path);
            rasterized += 1;
        }
        if rasterized == 0 {
            return Ok(());
        }
        ctx.flush();
        let mut coverage = vello_cpu::Pixmap::new(w16, h16);
        ctx.render_to_pixmap(&mut coverage);
        let coverage = coverage.data_as_u8_slice();

        let mut clip = Scissor::full(surface.width, surface.height);
        if let Some(s) = target_scissor {
            clip = clip.intersect(&s);
        }
        if let Some(s) = state.scissor {
            clip = clip.intersect(&s);
        }
        let mask = state.color_write_mask;
        let row = surface.width as usize * 4;
        for y in clip.y as u32..clip.y as u32 + clip.height {
            // Coverage rows are top-down, surface rows bottom-up.
            let cov_row = (surface.height - 1 - y) as usize * row;
            for x in clip.x as u32..clip.x as u32 + clip.width {
                let cov = coverage[cov_row + x as usize * 4 + 3];
                // Without blending only pixel centers inside the triangle are written.
                if cov == 0 || (!state.blend.enabled && cov < 128) {
                    continue;
                }
                let i = y as usize * row + x as usize * 4;
                let dst_px = &mut surface.data[i..i + 4];
                let dst = Vec4::new(
                    dst_px[0] as f32,
                    dst_px[1] as f32,
                    dst_px[2] as f32,
                    dst_px[3] as f32,
                ) / 255.0;
                let mut src = fragment.shade((x as f32 + 0.5) / w, (y as f32 + 0.5) / h);
                if state.blend.enabled {
                    src.w *= f32::from(cov) / 255.0;
                }
                let out = to_unorm(blend(&state.blend, src, dst));
                for (ch, value) in out.iter().enumerate() {
                    if mask & (1 << ch) != 0 {
                        dst_px[ch] = *value;
                    }
                }
            }
        }
        self.stats.triangles += rasterized;
        Ok(())
    }

    fn dispatch(&mut self, call: &DispatchCall) -> TrellisResult<()> {
        if !self.programs.contains_key(&call.program.0) {
            return Err(unknown("program", call.program.0));
        }
        self.stats.dispatches += 1;
        tracing::trace!(dispatch = %call.label, groups = ?call.work_groups, "compute skipped on cpu");
        Ok(())
    }

    fn barrier(&mut self, _handle: GpuHandle) -> TrellisResult<()> {
        Ok(())
    }

    fn generate_mipmaps(&mut self, handle: TextureHandle) -> TrellisResult<()> {
        // Single-level textures: nothing to regenerate.
        if self.textures.contains_key(&handle.0) {
            Ok(())
        } else {
            Err(unknown("texture", handle.0))
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/backend/cpu.rs"]
mod tests;
