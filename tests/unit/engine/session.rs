use super::*;
use crate::{
    animation::keyframes::{AnimatedParam, Keyframe},
    backend::gpu::BackendLimits,
    backend::recording::{Command, RecordingBackend},
    foundation::core::{SceneTiming, Vec3, Vec4},
    foundation::error::ErrorCategory,
    graph::builder::SceneBuilder,
    graph::node::{BufferFormat, BufferSource, Texture2D, TextureFormat},
    state::draw_state::DrawStateOverride,
    timing::time_range::{RangeCommand, TimeRanges},
};

fn builder() -> SceneBuilder {
    SceneBuilder::new(SceneTiming::default())
}

fn triangle(b: &mut SceneBuilder) -> NodeId {
    b.triangle(Vec3::ZERO, Vec3::X, Vec3::Y).unwrap()
}

fn engine(scene: Scene) -> Engine<RecordingBackend> {
    Engine::new(scene, RecordingBackend::new(), EngineOpts::default()).unwrap()
}

fn count(e: &Engine<RecordingBackend>, pred: impl Fn(&Command) -> bool) -> usize {
    e.backend().commands().iter().filter(|c| pred(c)).count()
}

#[test]
fn shared_resources_upload_once() {
    let mut b = builder();
    let geo = triangle(&mut b);
    let r0 = b.render(geo, None).unwrap();
    let r1 = b.render(geo, None).unwrap();
    let root = b.group(vec![r0, r1]).unwrap();
    let mut e = engine(b.build(root).unwrap());

    let first = e.render_frame(0.0).unwrap();
    assert_eq!(first.draws, 2);
    // vertices, uvcoords, program
    assert_eq!(first.allocations, 3);
    assert_eq!(first.uploads, 2);
    assert_eq!(count(&e, |c| matches!(c, Command::CreateProgram(..))), 1);

    let second = e.render_frame(0.1).unwrap();
    assert_eq!(second.draws, 2);
    assert_eq!(second.allocations, 0);
    assert_eq!(second.uploads, 0);
}

#[test]
fn frame_starts_with_a_cleared_default_target() {
    let mut b = builder();
    let geo = triangle(&mut b);
    let r = b.render(geo, None).unwrap();
    let mut e = Engine::new(
        b.build(r).unwrap(),
        RecordingBackend::new(),
        EngineOpts {
            clear_color: [0.5, 0.0, 0.0, 1.0],
            width: 32,
            height: 16,
            ..Default::default()
        },
    )
    .unwrap();
    e.render_frame(0.0).unwrap();
    let cmds = e.backend().commands();
    assert_eq!(cmds[0], Command::BeginFrame);
    let Command::SetTarget(t) = &cmds[1] else {
        panic!("expected set_target, got {}", cmds[1]);
    };
    assert!(t.is_default());
    assert_eq!((t.width, t.height), (32, 16));
    assert_eq!(t.clear, Some([0.5, 0.0, 0.0, 1.0]));
    assert_eq!(cmds.last(), Some(&Command::EndFrame));
}

#[test]
fn compile_failure_aborts_the_frame_and_keeps_the_stack_balanced() {
    let mut b = builder();
    let geo = triangle(&mut b);
    let prog = b.program(None, Some("void main() {}")).unwrap();
    let prog = b.label(prog, "broken-shader").unwrap();
    let r = b.render(geo, Some(prog)).unwrap();
    let r = b.label(r, "hero").unwrap();
    let cfg = b
        .graphic_config(r, DrawStateOverride::alpha_blend())
        .unwrap();
    let outer = b.graphic_config(cfg, DrawStateOverride::default()).unwrap();
    let mut e = engine(b.build(outer).unwrap());
    e.backend_mut().fail_program_compile(Some("broken"));

    let err = e.render_frame(0.0).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Resource);
    assert_eq!(err.node(), Some(("Render", "hero")));
    assert_eq!(e.draw_state_depth(), 0);
    assert_eq!(e.backend().commands().last(), Some(&Command::AbortFrame));

    // The scene and its uploaded buffers survive; fixing the cause is enough.
    e.backend_mut().fail_program_compile(None);
    let stats = e.render_frame(0.0).unwrap();
    assert_eq!(stats.draws, 1);
    assert_eq!(stats.allocations, 1);
    assert_eq!(e.draw_state_depth(), 0);
}

#[test]
fn draws_see_the_innermost_draw_state() {
    let mut b = builder();
    let geo = triangle(&mut b);
    let plain = b.render(geo, None).unwrap();
    let blended = b.render(geo, None).unwrap();
    let cfg = b
        .graphic_config(blended, DrawStateOverride::alpha_blend())
        .unwrap();
    let root = b.group(vec![cfg, plain]).unwrap();
    let mut e = engine(b.build(root).unwrap());
    e.render_frame(0.0).unwrap();
    let draws: Vec<bool> = e.backend().draws().map(|d| d.state.blend.enabled).collect();
    assert_eq!(draws, vec![true, false]);
}

#[test]
fn inactive_time_range_skips_its_subtree() {
    let mut b = builder();
    let geo = triangle(&mut b);
    let r = b.render(geo, None).unwrap();
    let ranges = TimeRanges::with_prefetch_time(
        vec![
            RangeCommand::noop(0.0),
            RangeCommand::cont(2.0),
            RangeCommand::noop(5.0),
        ],
        0.0,
    )
    .unwrap();
    let f = b.time_range_filter(r, ranges).unwrap();
    let mut e = engine(b.build(f).unwrap());

    let s = e.render_frame(1.0).unwrap();
    assert_eq!((s.draws, s.skipped_subtrees, s.allocations), (0, 1, 0));
    assert_eq!(e.liveness(r), Liveness::Inactive);
    assert_eq!(e.liveness(f), Liveness::Active);

    let s = e.render_frame(3.0).unwrap();
    assert_eq!(s.draws, 1);
    assert_eq!(e.liveness(r), Liveness::Active);

    let s = e.render_frame(5.0).unwrap();
    assert_eq!(s.draws, 0);
    assert_eq!(e.liveness(r), Liveness::Inactive);
}

#[test]
fn prefetch_uploads_without_drawing() {
    let mut b = builder();
    let geo = triangle(&mut b);
    let r = b.render(geo, None).unwrap();
    let ranges =
        TimeRanges::with_prefetch_time(vec![RangeCommand::noop(0.0), RangeCommand::cont(2.0)], 1.0)
            .unwrap();
    let f = b.time_range_filter(r, ranges).unwrap();
    let mut e = engine(b.build(f).unwrap());

    let s = e.render_frame(1.5).unwrap();
    assert_eq!(s.draws, 0);
    assert_eq!(s.prefetched_subtrees, 1);
    assert_eq!(s.allocations, 3);
    assert_eq!(e.liveness(r), Liveness::Prefetch);
    assert!(e.world_transform(r).is_none());

    let s = e.render_frame(2.0).unwrap();
    assert_eq!(s.draws, 1);
    assert_eq!(s.allocations, 0);
}

#[test]
fn prefetch_leaves_keyframed_textures_alone() {
    let mut b = builder();
    let geo = triangle(&mut b);
    let keys = AnimatedParam::new(vec![
        Keyframe::new(0.0, vec![0.0f32; 4]),
        Keyframe::new(4.0, vec![1.0f32; 4]),
    ])
    .unwrap();
    let pixels = b.animated_buffer(BufferFormat::VEC4, keys).unwrap();
    let tex = b
        .texture(Texture2D {
            format: TextureFormat::Rgba32Float,
            data_src: Some(pixels),
            ..Texture2D::new(1, 1)
        })
        .unwrap();
    let r = b.render(geo, None).unwrap();
    b.update_textures(r, [("tex0", tex)]).unwrap();
    let ranges =
        TimeRanges::with_prefetch_time(vec![RangeCommand::noop(0.0), RangeCommand::cont(2.0)], 1.0)
            .unwrap();
    let f = b.time_range_filter(r, ranges).unwrap();
    let mut e = engine(b.build(f).unwrap());

    let uploads = |e: &Engine<RecordingBackend>| {
        count(e, |c| matches!(c, Command::UploadTexture(..)))
    };
    assert_eq!(e.render_frame(1.5).unwrap().prefetched_subtrees, 1);
    e.render_frame(1.6).unwrap();
    assert_eq!(uploads(&e), 0);
    assert_eq!(e.liveness(tex), Liveness::Prefetch);

    assert_eq!(e.render_frame(2.0).unwrap().draws, 1);
    assert_eq!(uploads(&e), 1);
}

#[test]
fn index_updates_are_checked_against_the_vertex_count() {
    let mut b = builder();
    let quad = b.quad(Vec3::ZERO, Vec3::X, Vec3::Y).unwrap();
    let indices = match &b.scene().get(quad).unwrap().kind {
        NodeKind::Geometry(g) => g.indices.unwrap(),
        other => panic!("expected geometry, got {}", other.name()),
    };
    let r = b.render(quad, None).unwrap();
    let mut e = engine(b.build(r).unwrap());
    e.render_frame(0.0).unwrap();

    let err = e
        .update_buffer_data(indices, BufferData::UInt(vec![0, 1, 99, 1, 3, 2]))
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Construction);
    assert!(err.to_string().contains("index 99 out of range"), "{err}");
    let NodeKind::Buffer(buf) = &e.scene().get(indices).unwrap().kind else {
        panic!("indices must stay a buffer");
    };
    assert_eq!(
        buf.source,
        BufferSource::Static(BufferData::UInt(vec![0, 1, 2, 1, 3, 2]))
    );
    assert_eq!(e.render_frame(0.0).unwrap().uploads, 0);

    e.update_buffer_data(indices, BufferData::UInt(vec![0, 1, 3, 0, 3, 2]))
        .unwrap();
    assert_eq!(e.render_frame(0.0).unwrap().uploads, 1);
}

#[test]
fn user_switch_gates_the_subtree() {
    let mut b = builder();
    let geo = triangle(&mut b);
    let r = b.render(geo, None).unwrap();
    let sw = b.user_switch(r, false).unwrap();
    let mut e = engine(b.build(sw).unwrap());
    assert_eq!(e.render_frame(0.0).unwrap().draws, 0);
    e.set_user_switch(sw, true).unwrap();
    assert_eq!(e.render_frame(0.0).unwrap().draws, 1);
    assert!(e.set_user_switch(r, true).is_err());
}

#[test]
fn world_transform_composes_parents() {
    let mut b = builder();
    let geo = triangle(&mut b);
    let r = b.render(geo, None).unwrap();
    let t = b.translate(r, Vec3::new(1.0, 2.0, 3.0)).unwrap();
    let s = b.scale(t, Vec3::splat(2.0)).unwrap();
    let mut e = engine(b.build(s).unwrap());
    e.render_frame(0.0).unwrap();

    let world = e.world_transform(r).unwrap();
    let expected = Mat4::from_scale(Vec3::splat(2.0))
        * Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
    assert!(world.abs_diff_eq(expected, 1e-6));
    let draw = e.backend().draws().next().unwrap();
    assert!(draw.model_view.abs_diff_eq(expected, 1e-6));
}

#[test]
fn animated_uniforms_are_evaluated_per_frame() {
    let mut b = builder();
    let geo = triangle(&mut b);
    let r = b.render(geo, None).unwrap();
    let color = AnimatedParam::new(vec![
        Keyframe::new(0.0, Vec4::ZERO),
        Keyframe::new(1.0, Vec4::ONE),
    ])
    .unwrap();
    let u = b.uniform(color).unwrap();
    b.update_uniforms(r, [("color", u)]).unwrap();
    let mut e = engine(b.build(r).unwrap());

    e.render_frame(0.5).unwrap();
    let v = e.backend().draws().last().unwrap().uniform("color").cloned();
    assert_eq!(v, Some(Value::Vec4(Vec4::splat(0.5))));
    e.render_frame(4.0).unwrap();
    let v = e.backend().draws().last().unwrap().uniform("color").cloned();
    assert_eq!(v, Some(Value::Vec4(Vec4::ONE)));
}

#[test]
fn buffer_updates_upload_lazily_once() {
    let mut b = builder();
    let geo = triangle(&mut b);
    let data = b.buffer_float(vec![1.0, 2.0]).unwrap();
    let r0 = b.render(geo, None).unwrap();
    let r1 = b.render(geo, None).unwrap();
    b.update_buffers(r0, [("data", data)]).unwrap();
    b.update_buffers(r1, [("data", data)]).unwrap();
    let root = b.group(vec![r0, r1]).unwrap();
    let mut e = engine(b.build(root).unwrap());
    e.render_frame(0.0).unwrap();

    e.update_buffer_data(data, BufferData::Float(vec![3.0, 4.0]))
        .unwrap();
    assert_eq!(e.render_frame(0.0).unwrap().uploads, 1);
    assert_eq!(e.render_frame(0.0).unwrap().uploads, 0);

    let err = e
        .update_buffer_data(data, BufferData::Float(vec![1.0]))
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Construction);
}

#[test]
fn producer_after_consumer_is_a_counted_hazard() {
    let mut b = builder();
    let geo = triangle(&mut b);
    let data = b.buffer_float(vec![0.0; 4]).unwrap();
    let cp = b.compute_program("void main() {}").unwrap();
    let compute = b.compute(cp, [1, 1, 1]).unwrap();
    b.update_buffers(compute, [("data", data)]).unwrap();
    let r = b.render(geo, None).unwrap();
    b.update_buffers(r, [("data", data)]).unwrap();
    let root = b.group(vec![r, compute]).unwrap();
    let mut e = Engine::new(
        b.build(root).unwrap(),
        RecordingBackend::new(),
        EngineOpts {
            warn_on_hazards: false,
            ..Default::default()
        },
    )
    .unwrap();

    let s = e.render_frame(0.0).unwrap();
    assert_eq!((s.dispatches, s.hazards, s.barriers), (1, 1, 0));
    let s = e.render_frame(0.0).unwrap();
    assert_eq!((s.hazards, s.barriers), (1, 1));
}

#[test]
fn producer_before_consumer_gets_a_barrier() {
    let mut b = builder();
    let geo = triangle(&mut b);
    let data = b.buffer_float(vec![0.0; 4]).unwrap();
    let cp = b.compute_program("void main() {}").unwrap();
    let compute = b.compute(cp, [2, 1, 1]).unwrap();
    b.update_buffers(compute, [("data", data)]).unwrap();
    let r = b.render(geo, None).unwrap();
    b.update_buffers(r, [("data", data)]).unwrap();
    let root = b.group(vec![compute, r]).unwrap();
    let mut e = engine(b.build(root).unwrap());

    let s = e.render_frame(0.0).unwrap();
    assert_eq!((s.hazards, s.barriers), (0, 1));
    let barrier = e
        .backend()
        .commands()
        .iter()
        .position(|c| matches!(c, Command::Barrier(_)))
        .unwrap();
    let draw = e
        .backend()
        .commands()
        .iter()
        .position(|c| matches!(c, Command::Draw(_)))
        .unwrap();
    assert!(barrier < draw);
}

#[test]
fn work_groups_beyond_backend_limits_are_rejected_up_front() {
    let mut b = builder();
    let cp = b.compute_program("void main() {}").unwrap();
    let compute = b.compute(cp, [8, 1, 1]).unwrap();
    let scene = b.build(compute).unwrap();
    let gpu = RecordingBackend::with_limits(BackendLimits {
        max_work_groups: [4, 4, 4],
        ..Default::default()
    });
    let err = Engine::new(scene, gpu, EngineOpts::default()).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Construction);
    assert_eq!(err.node().map(|(k, _)| k), Some("Compute"));
}

#[test]
fn non_finite_time_is_rejected() {
    let mut b = builder();
    let geo = triangle(&mut b);
    let r = b.render(geo, None).unwrap();
    let mut e = engine(b.build(r).unwrap());
    assert!(e.render_frame(f64::NAN).is_err());
    assert!(e.render_frame(f64::INFINITY).is_err());
    assert!(e.backend().commands().is_empty());
}

#[test]
fn detached_nodes_release_their_resources_next_frame() {
    let mut b = builder();
    let g0 = triangle(&mut b);
    let g1 = b.quad(Vec3::ZERO, Vec3::X, Vec3::Y).unwrap();
    let r0 = b.render(g0, None).unwrap();
    let r1 = b.render(g1, None).unwrap();
    let root = b.group(vec![r0, r1]).unwrap();
    let mut e = engine(b.build(root).unwrap());
    e.render_frame(0.0).unwrap();
    // triangle: 2 buffers, quad: 3 buffers, one shared program
    assert_eq!(e.backend().live_resources(), 6);

    e.detach(root, r1).unwrap();
    assert!(!e.scene().contains(r1));
    let s = e.render_frame(0.0).unwrap();
    assert_eq!(s.releases, 3);
    assert_eq!(s.draws, 1);
    assert_eq!(e.backend().live_resources(), 3);
}

#[test]
fn unbinding_the_last_reference_frees_the_texture() {
    let mut b = builder();
    let geo = triangle(&mut b);
    let tex = b.texture(Texture2D::new(2, 2)).unwrap();
    let r = b.render(geo, None).unwrap();
    b.update_textures(r, [("tex0", tex)]).unwrap();
    let mut e = engine(b.build(r).unwrap());
    e.render_frame(0.0).unwrap();
    // vertices, uvcoords, program, texture
    assert_eq!(e.backend().live_resources(), 4);

    e.unbind(r, BindingSlot::Textures, "tex0").unwrap();
    assert!(!e.scene().contains(tex));
    let s = e.render_frame(0.0).unwrap();
    assert_eq!(s.releases, 1);
    assert_eq!(s.draws, 1);
    assert_eq!(e.backend().live_resources(), 3);

    // Unknown names are a no-op.
    e.unbind(r, BindingSlot::Textures, "tex0").unwrap();
}

#[test]
fn teardown_releases_newest_first() {
    let mut b = builder();
    let geo = triangle(&mut b);
    let r = b.render(geo, None).unwrap();
    let mut e = engine(b.build(r).unwrap());
    e.render_frame(0.0).unwrap();
    e.backend_mut().take_commands();

    e.teardown().unwrap();
    assert_eq!(e.backend().live_resources(), 0);
    let order: Vec<&str> = e
        .backend()
        .commands()
        .iter()
        .map(|c| match c {
            Command::DestroyProgram(_) => "program",
            Command::DestroyBuffer(_) => "buffer",
            _ => "other",
        })
        .collect();
    // The default program is created after the triangle's buffers.
    assert_eq!(order, vec!["program", "buffer", "buffer"]);
    assert!(e.render_frame(0.0).is_err());
    assert!(e.teardown().is_ok());
}

#[test]
fn program_sources_can_be_hot_swapped() {
    let mut b = builder();
    let geo = triangle(&mut b);
    let prog = b.program(None, None).unwrap();
    let prog = b.label(prog, "main").unwrap();
    let r = b.render(geo, Some(prog)).unwrap();
    let mut e = engine(b.build(r).unwrap());
    e.render_frame(0.0).unwrap();
    let before = e.resource_handle(prog).unwrap();

    e.update_program_sources(prog, None, Some("void main() { discard; }".to_string()))
        .unwrap();
    let s = e.render_frame(0.0).unwrap();
    assert_eq!(s.allocations, 1);
    assert_ne!(e.resource_handle(prog), Some(before));
    assert_eq!(e.backend().live_resources(), 3);
}
