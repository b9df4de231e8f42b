use std::collections::BTreeMap;

use crate::{
    backend::gpu::{
        BackendLimits, BufferDesc, BufferHandle, DispatchCall, DrawCall, GpuBackend, GpuHandle,
        ProgramDesc, ProgramHandle, TargetBinding, TextureDesc, TextureHandle,
    },
    foundation::error::{TrellisError, TrellisResult},
};

/// One backend call as seen by [`RecordingBackend`].
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    BeginFrame,
    EndFrame,
    AbortFrame,
    CreateBuffer(BufferHandle, BufferDesc),
    UploadBuffer(BufferHandle, usize),
    DestroyBuffer(BufferHandle),
    CreateTexture(TextureHandle, TextureDesc),
    UploadTexture(TextureHandle, usize),
    DestroyTexture(TextureHandle),
    CreateProgram(ProgramHandle, String),
    DestroyProgram(ProgramHandle),
    SetTarget(TargetBinding),
    Draw(Box<DrawCall>),
    Dispatch(DispatchCall),
    Barrier(GpuHandle),
    GenerateMipmaps(TextureHandle),
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BeginFrame => write!(f, "begin_frame"),
            Self::EndFrame => write!(f, "end_frame"),
            Self::AbortFrame => write!(f, "abort_frame"),
            Self::CreateBuffer(h, d) => write!(
                f,
                "create_buffer {h} '{}' {}x{:?}{}",
                d.label, d.count, d.format.component, d.format.components
            ),
            Self::UploadBuffer(h, n) => write!(f, "upload_buffer {h} {n}B"),
            Self::DestroyBuffer(h) => write!(f, "destroy_buffer {h}"),
            Self::CreateTexture(h, d) => write!(
                f,
                "create_texture {h} '{}' {}x{} {:?}",
                d.label, d.width, d.height, d.format
            ),
            Self::UploadTexture(h, n) => write!(f, "upload_texture {h} {n}B"),
            Self::DestroyTexture(h) => write!(f, "destroy_texture {h}"),
            Self::CreateProgram(h, label) => write!(f, "create_program {h} '{label}'"),
            Self::DestroyProgram(h) => write!(f, "destroy_program {h}"),
            Self::SetTarget(t) => {
                if t.is_default() {
                    write!(f, "set_target default {}x{}", t.width, t.height)?;
                } else {
                    let colors: Vec<String> = t.color.iter().map(|h| h.to_string()).collect();
                    write!(f, "set_target [{}] {}x{}", colors.join(", "), t.width, t.height)?;
                }
                match t.clear {
                    Some(c) => write!(f, " clear={c:?}")?,
                    None => write!(f, " no_clear")?,
                }
                if let Some(s) = t.scissor {
                    write!(f, " scissor=({}, {}, {}, {})", s.x, s.y, s.width, s.height)?;
                }
                Ok(())
            }
            Self::Draw(d) => write!(
                f,
                "draw '{}' {} vertices={} instances={}",
                d.label, d.program, d.vertex_count, d.instances
            ),
            Self::Dispatch(d) => write!(
                f,
                "dispatch '{}' {} groups={:?}",
                d.label, d.program, d.work_groups
            ),
            Self::Barrier(h) => write!(f, "barrier {h}"),
            Self::GenerateMipmaps(h) => write!(f, "generate_mipmaps {h}"),
        }
    }
}

/// Backend that performs nothing and logs every call, for tests and `trellis trace`.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    commands: Vec<Command>,
    next_handle: u64,
    live: BTreeMap<u64, &'static str>,
    fail_program: Option<String>,
    limits: BackendLimits,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(limits: BackendLimits) -> Self {
        Self {
            limits,
            ..Self::default()
        }
    }

    /// Make program creation fail for labels containing `needle`; `None` clears it.
    pub fn fail_program_compile(&mut self, needle: Option<&str>) {
        self.fail_program = needle.map(str::to_string);
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn take_commands(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.commands)
    }

    pub fn draws(&self) -> impl Iterator<Item = &DrawCall> {
        self.commands.iter().filter_map(|c| match c {
            Command::Draw(d) => Some(d.as_ref()),
            _ => None,
        })
    }

    /// Handles created and not yet destroyed.
    pub fn live_resources(&self) -> usize {
        self.live.len()
    }

    fn alloc(&mut self, kind: &'static str) -> u64 {
        self.next_handle += 1;
        self.live.insert(self.next_handle, kind);
        self.next_handle
    }

    fn free(&mut self, id: u64, kind: &'static str) -> TrellisResult<()> {
        match self.live.remove(&id) {
            Some(k) if k == kind => Ok(()),
            _ => Err(TrellisError::backend(format!(
                "destroy of unknown {kind} handle {id}"
            ))),
        }
    }

    fn check_live(&self, id: u64, kind: &'static str) -> TrellisResult<()> {
        match self.live.get(&id) {
            Some(&k) if k == kind => Ok(()),
            _ => Err(TrellisError::backend(format!(
                "use of unknown {kind} handle {id}"
            ))),
        }
    }
}

impl GpuBackend for RecordingBackend {
    fn limits(&self) -> BackendLimits {
        self.limits
    }

    fn begin_frame(&mut self) -> TrellisResult<()> {
        self.commands.push(Command::BeginFrame);
        Ok(())
    }

    fn end_frame(&mut self) -> TrellisResult<()> {
        self.commands.push(Command::EndFrame);
        Ok(())
    }

    fn abort_frame(&mut self) {
        self.commands.push(Command::AbortFrame);
    }

    fn create_buffer(&mut self, desc: &BufferDesc) -> TrellisResult<BufferHandle> {
        let h = BufferHandle(self.alloc("buffer"));
        self.commands.push(Command::CreateBuffer(h, desc.clone()));
        Ok(h)
    }

    fn upload_buffer(&mut self, handle: BufferHandle, bytes: &[u8]) -> TrellisResult<()> {
        self.check_live(handle.0, "buffer")?;
        self.commands.push(Command::UploadBuffer(handle, bytes.len()));
        Ok(())
    }

    fn destroy_buffer(&mut self, handle: BufferHandle) -> TrellisResult<()> {
        self.free(handle.0, "buffer")?;
        self.commands.push(Command::DestroyBuffer(handle));
        Ok(())
    }

    fn create_texture(&mut self, desc: &TextureDesc) -> TrellisResult<TextureHandle> {
        if desc.width.max(desc.height) > self.limits.max_texture_size {
            return Err(TrellisError::resource(format!(
                "texture '{}' exceeds the {} pixel limit",
                desc.label, self.limits.max_texture_size
            )));
        }
        let h = TextureHandle(self.alloc("texture"));
        self.commands.push(Command::CreateTexture(h, desc.clone()));
        Ok(h)
    }

    fn upload_texture(&mut self, handle: TextureHandle, bytes: &[u8]) -> TrellisResult<()> {
        self.check_live(handle.0, "texture")?;
        self.commands.push(Command::UploadTexture(handle, bytes.len()));
        Ok(())
    }

    fn destroy_texture(&mut self, handle: TextureHandle) -> TrellisResult<()> {
        self.free(handle.0, "texture")?;
        self.commands.push(Command::DestroyTexture(handle));
        Ok(())
    }

    fn create_program(&mut self, desc: &ProgramDesc) -> TrellisResult<ProgramHandle> {
        if let Some(needle) = &self.fail_program
            && desc.label.contains(needle.as_str())
        {
            return Err(TrellisError::resource(format!(
                "program '{}' failed to compile",
                desc.label
            )));
        }
        let h = ProgramHandle(self.alloc("program"));
        self.commands
            .push(Command::CreateProgram(h, desc.label.clone()));
        Ok(h)
    }

    fn destroy_program(&mut self, handle: ProgramHandle) -> TrellisResult<()> {
        self.free(handle.0, "program")?;
        self.commands.push(Command::DestroyProgram(handle));
        Ok(())
    }

    fn set_target(&mut self, target: &TargetBinding) -> TrellisResult<()> {
        for h in &target.color {
            self.check_live(h.0, "texture")?;
        }
        self.commands.push(Command::SetTarget(target.clone()));
        Ok(())
    }

    fn draw(&mut self, call: &DrawCall) -> TrellisResult<()> {
        self.check_live(call.program.0, "program")?;
        self.check_live(call.vertices.0, "buffer")?;
        self.commands.push(Command::Draw(Box::new(call.clone())));
        Ok(())
    }

    fn dispatch(&mut self, call: &DispatchCall) -> TrellisResult<()> {
        self.check_live(call.program.0, "program")?;
        let max = self.limits.max_work_groups;
        if call.work_groups.iter().zip(max).any(|(&n, m)| n > m) {
            return Err(TrellisError::backend(format!(
                "dispatch '{}' work groups {:?} exceed {:?}",
                call.label, call.work_groups, max
            )));
        }
        self.commands.push(Command::Dispatch(call.clone()));
        Ok(())
    }

    fn barrier(&mut self, handle: GpuHandle) -> TrellisResult<()> {
        self.commands.push(Command::Barrier(handle));
        Ok(())
    }

    fn generate_mipmaps(&mut self, handle: TextureHandle) -> TrellisResult<()> {
        self.check_live(handle.0, "texture")?;
        self.commands.push(Command::GenerateMipmaps(handle));
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/backend/recording.rs"]
mod tests;
