use super::*;
use crate::{
    backend::gpu::{ProgramSource, TextureHandle},
    backend::recording::{Command, RecordingBackend},
    graph::node::{BufferFormat, BufferUsage, Filter, MipmapFilter, TextureFormat, Wrap},
};

fn id(i: u32) -> NodeId {
    NodeId::new(i, 0)
}

fn buffer(count: usize) -> ResourceUpload {
    ResourceUpload {
        desc: ResourceDesc::Buffer(BufferDesc {
            label: "buf".to_string(),
            format: BufferFormat::VEC3,
            count,
            usage: BufferUsage::Static,
        }),
        data: Some(vec![0u8; count * 12]),
    }
}

fn texture() -> ResourceUpload {
    ResourceUpload {
        desc: ResourceDesc::Texture(TextureDesc {
            label: "tex".to_string(),
            width: 4,
            height: 4,
            format: TextureFormat::Rgba8Unorm,
            min_filter: Filter::Linear,
            mag_filter: Filter::Linear,
            mipmap_filter: MipmapFilter::None,
            wrap_s: Wrap::ClampToEdge,
            wrap_t: Wrap::ClampToEdge,
        }),
        data: None,
    }
}

fn program(label: &str) -> ResourceUpload {
    ResourceUpload {
        desc: ResourceDesc::Program(ProgramDesc {
            label: label.to_string(),
            source: ProgramSource::Compute {
                compute: "void main() {}".to_string(),
            },
        }),
        data: None,
    }
}

fn count(b: &RecordingBackend, pred: impl Fn(&Command) -> bool) -> usize {
    b.commands().iter().filter(|c| pred(c)).count()
}

#[test]
fn sync_uploads_once_until_marked_dirty() {
    let mut gpu = RecordingBackend::new();
    let mut t = ResourceTracker::new(true);
    t.begin_frame(0);
    let h0 = t.sync(id(0), 0, &mut gpu, || Ok(buffer(3))).unwrap();
    let h1 = t
        .sync(id(0), 0, &mut gpu, || panic!("clean resources are not described"))
        .unwrap();
    assert_eq!(h0, h1);
    assert_eq!(t.stats().allocations, 1);
    assert_eq!(t.stats().uploads, 1);

    t.mark_dirty(id(0));
    assert!(t.is_dirty(id(0)));
    t.sync(id(0), 0, &mut gpu, || Ok(buffer(3))).unwrap();
    assert_eq!(count(&gpu, |c| matches!(c, Command::CreateBuffer(..))), 1);
    assert_eq!(count(&gpu, |c| matches!(c, Command::UploadBuffer(..))), 2);
}

#[test]
fn fixed_size_resources_cannot_grow() {
    let mut gpu = RecordingBackend::new();
    let mut t = ResourceTracker::new(true);
    t.sync(id(0), 0, &mut gpu, || Ok(buffer(3))).unwrap();
    t.mark_dirty(id(0));
    let err = t.sync(id(0), 0, &mut gpu, || Ok(buffer(4))).unwrap_err();
    assert!(err.to_string().contains("fixed-size"), "{err}");
}

#[test]
fn failed_recompile_keeps_previous_program() {
    let mut gpu = RecordingBackend::new();
    let mut t = ResourceTracker::new(true);
    let h0 = t.sync(id(0), 0, &mut gpu, || Ok(program("p"))).unwrap();

    gpu.fail_program_compile(Some("p"));
    t.mark_dirty(id(0));
    assert!(t.sync(id(0), 0, &mut gpu, || Ok(program("p"))).is_err());
    assert_eq!(t.handle(id(0)), Some(h0));
    assert!(t.is_dirty(id(0)));

    gpu.fail_program_compile(None);
    let h1 = t.sync(id(0), 0, &mut gpu, || Ok(program("p"))).unwrap();
    assert_ne!(h0, h1);
    assert_eq!(gpu.live_resources(), 1);
}

#[test]
fn pending_writes_get_one_barrier() {
    let mut gpu = RecordingBackend::new();
    let mut t = ResourceTracker::new(true);
    t.begin_frame(1);
    t.sync(id(0), 0, &mut gpu, || Ok(texture())).unwrap();
    t.record_write(id(0), id(9), "target");
    t.record_read(id(0), id(5), &mut gpu).unwrap();
    t.record_read(id(0), id(6), &mut gpu).unwrap();
    assert_eq!(t.stats().barriers, 1);
    assert_eq!(t.stats().hazards, 0);
    assert_eq!(
        count(&gpu, |c| matches!(
            c,
            Command::Barrier(GpuHandle::Texture(TextureHandle(_)))
        )),
        1
    );
}

#[test]
fn read_before_write_in_one_frame_is_a_hazard() {
    let mut gpu = RecordingBackend::new();
    let mut t = ResourceTracker::new(false);
    t.begin_frame(3);
    t.sync(id(0), 0, &mut gpu, || Ok(texture())).unwrap();
    t.record_read(id(0), id(5), &mut gpu).unwrap();
    t.record_write(id(0), id(9), "late producer");
    assert_eq!(t.stats().hazards, 1);

    t.begin_frame(4);
    t.record_write(id(0), id(9), "producer");
    assert_eq!(t.stats().hazards, 0);
}

#[test]
fn a_producer_reading_its_own_output_is_not_a_hazard() {
    let mut gpu = RecordingBackend::new();
    let mut t = ResourceTracker::new(false);
    t.begin_frame(1);
    t.sync(id(0), 0, &mut gpu, || Ok(buffer(2))).unwrap();
    t.record_read(id(0), id(7), &mut gpu).unwrap();
    t.record_write(id(0), id(7), "in-place compute");
    assert_eq!(t.stats().hazards, 0);
}

#[test]
fn release_all_runs_newest_first() {
    let mut gpu = RecordingBackend::new();
    let mut t = ResourceTracker::new(true);
    t.sync(id(0), 10, &mut gpu, || Ok(buffer(1))).unwrap();
    t.sync(id(1), 30, &mut gpu, || Ok(texture())).unwrap();
    t.sync(id(2), 20, &mut gpu, || Ok(program("p"))).unwrap();
    gpu.take_commands();

    t.release_all(&mut gpu).unwrap();
    assert!(t.is_empty());
    assert_eq!(gpu.live_resources(), 0);
    let order: Vec<&str> = gpu
        .commands()
        .iter()
        .map(|c| match c {
            Command::DestroyTexture(_) => "texture",
            Command::DestroyProgram(_) => "program",
            Command::DestroyBuffer(_) => "buffer",
            _ => "other",
        })
        .collect();
    assert_eq!(order, vec!["texture", "program", "buffer"]);
}
