use std::collections::HashMap;

use crate::{
    backend::gpu::{BufferDesc, GpuBackend, GpuHandle, ProgramDesc, TextureDesc},
    foundation::error::{TrellisError, TrellisResult},
    graph::ids::NodeId,
};

/// What a resource node looks like on the GPU.
#[derive(Clone, Debug, PartialEq)]
pub enum ResourceDesc {
    Buffer(BufferDesc),
    Texture(TextureDesc),
    Program(ProgramDesc),
}

impl ResourceDesc {
    fn byte_size(&self) -> usize {
        match self {
            Self::Buffer(d) => d.byte_size(),
            Self::Texture(d) => d.byte_size(),
            Self::Program(_) => 0,
        }
    }

    fn label(&self) -> &str {
        match self {
            Self::Buffer(d) => &d.label,
            Self::Texture(d) => &d.label,
            Self::Program(d) => &d.label,
        }
    }
}

/// Description plus the CPU payload to upload, produced on demand when a resource is dirty.
#[derive(Clone, Debug)]
pub struct ResourceUpload {
    pub desc: ResourceDesc,
    pub data: Option<Vec<u8>>,
}

/// Per-frame counters; reset by [`ResourceTracker::begin_frame`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TrackerStats {
    pub allocations: u64,
    pub uploads: u64,
    pub barriers: u64,
    pub hazards: u64,
    pub releases: u64,
}

#[derive(Clone, Debug)]
struct TrackedResource {
    handle: GpuHandle,
    /// Construction sequence of the owning node.
    seq: u64,
    /// Fixed at first allocation; zero for programs.
    byte_size: usize,
    dirty: bool,
    /// Last frame in which a consumer read the resource, and who read it then.
    read_frame: Option<u64>,
    readers: Vec<NodeId>,
    /// A GPU write has not been made visible to readers yet.
    pending_write: bool,
}

/// Owns the mapping from resource nodes to backend handles and their dirty state.
///
/// Nothing is uploaded eagerly: callers mark payload changes dirty and the next [`sync`] in a
/// frame uploads once, however many consumers reference the resource.
///
/// [`sync`]: ResourceTracker::sync
#[derive(Debug, Default)]
pub struct ResourceTracker {
    entries: HashMap<NodeId, TrackedResource>,
    frame: u64,
    stats: TrackerStats,
    warn_on_hazards: bool,
}

impl ResourceTracker {
    pub fn new(warn_on_hazards: bool) -> Self {
        Self {
            warn_on_hazards,
            ..Default::default()
        }
    }

    pub fn begin_frame(&mut self, frame: u64) {
        self.frame = frame;
        self.stats = TrackerStats::default();
    }

    pub fn stats(&self) -> TrackerStats {
        self.stats
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn handle(&self, id: NodeId) -> Option<GpuHandle> {
        self.entries.get(&id).map(|e| e.handle)
    }

    pub fn is_dirty(&self, id: NodeId) -> bool {
        self.entries.get(&id).is_none_or(|e| e.dirty)
    }

    /// Flag a CPU-side payload change; the next `sync` re-uploads. Unknown ids are ignored
    /// since their first sync uploads anyway.
    pub fn mark_dirty(&mut self, id: NodeId) {
        if let Some(e) = self.entries.get_mut(&id) {
            e.dirty = true;
        }
    }

    /// Allocate on first use, upload when dirty, otherwise do nothing.
    ///
    /// `describe` is only called when work is needed. Buffers and textures keep the size they
    /// were allocated with; programs are recompiled in place and keep the old handle if
    /// compilation fails.
    pub fn sync<B, F>(
        &mut self,
        id: NodeId,
        seq: u64,
        backend: &mut B,
        describe: F,
    ) -> TrellisResult<GpuHandle>
    where
        B: GpuBackend + ?Sized,
        F: FnOnce() -> TrellisResult<ResourceUpload>,
    {
        if let Some(e) = self.entries.get(&id)
            && !e.dirty
        {
            return Ok(e.handle);
        }
        let upload = describe()?;

        let Some(entry) = self.entries.get_mut(&id) else {
            let handle = allocate(backend, &upload.desc)?;
            self.stats.allocations += 1;
            tracing::debug!(node = %id, %handle, label = upload.desc.label(), "resource allocated");
            // Tracked before the upload so a failed upload is retried and the handle released.
            let entry = self.entries.entry(id).or_insert(TrackedResource {
                handle,
                seq,
                byte_size: upload.desc.byte_size(),
                dirty: true,
                read_frame: None,
                readers: Vec::new(),
                pending_write: false,
            });
            if let Some(bytes) = &upload.data {
                upload_bytes(backend, handle, bytes)?;
                self.stats.uploads += 1;
            }
            entry.dirty = false;
            return Ok(handle);
        };

        match &upload.desc {
            ResourceDesc::Program(desc) => {
                let GpuHandle::Program(old) = entry.handle else {
                    return Err(TrellisError::resource(format!(
                        "{id} changed resource kind after allocation"
                    )));
                };
                let new = backend.create_program(desc)?;
                self.stats.allocations += 1;
                if let Err(e) = backend.destroy_program(old) {
                    tracing::warn!(node = %id, error = %e, "failed to destroy replaced program");
                }
                tracing::debug!(node = %id, handle = %new, "program rebuilt");
                entry.handle = GpuHandle::Program(new);
            }
            desc => {
                if desc.byte_size() != entry.byte_size {
                    return Err(TrellisError::resource(format!(
                        "{id} is fixed-size: allocated {} bytes, payload needs {}",
                        entry.byte_size,
                        desc.byte_size()
                    )));
                }
                if let Some(bytes) = &upload.data {
                    upload_bytes(backend, entry.handle, bytes)?;
                    self.stats.uploads += 1;
                    // A CPU upload supersedes any GPU write still in flight.
                    entry.pending_write = false;
                    tracing::debug!(node = %id, handle = %entry.handle, bytes = bytes.len(), "resource uploaded");
                }
            }
        }
        entry.dirty = false;
        Ok(entry.handle)
    }

    /// Note a read by `reader`. Issues a barrier first if a GPU write is still pending.
    pub fn record_read<B: GpuBackend + ?Sized>(
        &mut self,
        id: NodeId,
        reader: NodeId,
        backend: &mut B,
    ) -> TrellisResult<()> {
        let Some(e) = self.entries.get_mut(&id) else {
            return Ok(());
        };
        if e.pending_write {
            backend.barrier(e.handle)?;
            e.pending_write = false;
            self.stats.barriers += 1;
        }
        if e.read_frame != Some(self.frame) {
            e.readers.clear();
            e.read_frame = Some(self.frame);
        }
        if !e.readers.contains(&reader) {
            e.readers.push(reader);
        }
        Ok(())
    }

    /// Note a write by `writer` (compute dispatch or render-to-texture pass).
    ///
    /// Another node that already read the resource this frame saw the previous frame's
    /// contents. That is a documented hazard of declared-order scheduling, counted and
    /// optionally logged.
    pub fn record_write(&mut self, id: NodeId, writer: NodeId, label: &str) {
        let Some(e) = self.entries.get_mut(&id) else {
            return;
        };
        if e.read_frame == Some(self.frame) && e.readers.iter().any(|&r| r != writer) {
            self.stats.hazards += 1;
            if self.warn_on_hazards {
                tracing::warn!(
                    node = label,
                    frame = self.frame,
                    "resource read before its producer ran this frame; consumers saw the previous frame"
                );
            }
        }
        e.pending_write = true;
    }

    /// Destroy the GPU side of a freed node.
    pub fn release<B: GpuBackend + ?Sized>(
        &mut self,
        id: NodeId,
        backend: &mut B,
    ) -> TrellisResult<()> {
        let Some(e) = self.entries.remove(&id) else {
            return Ok(());
        };
        self.stats.releases += 1;
        tracing::debug!(node = %id, handle = %e.handle, "resource released");
        backend.destroy(e.handle)
    }

    /// Destroy everything, newest construction first. Failures are logged and skipped so the
    /// remaining handles are still released; the first failure is returned.
    pub fn release_all<B: GpuBackend + ?Sized>(&mut self, backend: &mut B) -> TrellisResult<()> {
        let mut entries: Vec<(NodeId, TrackedResource)> = self.entries.drain().collect();
        entries.sort_unstable_by(|a, b| b.1.seq.cmp(&a.1.seq));
        let mut first_err = None;
        for (id, e) in entries {
            self.stats.releases += 1;
            if let Err(err) = backend.destroy(e.handle) {
                tracing::warn!(node = %id, handle = %e.handle, error = %err, "teardown failed");
                first_err.get_or_insert(err);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

fn allocate<B: GpuBackend + ?Sized>(
    backend: &mut B,
    desc: &ResourceDesc,
) -> TrellisResult<GpuHandle> {
    Ok(match desc {
        ResourceDesc::Buffer(d) => GpuHandle::Buffer(backend.create_buffer(d)?),
        ResourceDesc::Texture(d) => GpuHandle::Texture(backend.create_texture(d)?),
        ResourceDesc::Program(d) => GpuHandle::Program(backend.create_program(d)?),
    })
}

fn upload_bytes<B: GpuBackend + ?Sized>(
    backend: &mut B,
    handle: GpuHandle,
    bytes: &[u8],
) -> TrellisResult<()> {
    match handle {
        GpuHandle::Buffer(h) => backend.upload_buffer(h, bytes),
        GpuHandle::Texture(h) => backend.upload_texture(h, bytes),
        GpuHandle::Program(_) => Ok(()),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/resource/tracker.rs"]
mod tests;
