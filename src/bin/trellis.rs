use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "trellis", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate a scene and print node counts per kind.
    Validate(InArgs),
    /// Print the scene graph in Graphviz dot format.
    Dot(InArgs),
    /// Run one frame on the recording backend and print the command log.
    Trace(TraceArgs),
    /// Render a single frame as a PNG with the CPU backend.
    Frame(FrameArgs),
    /// Render every frame of the scene as a numbered PNG sequence.
    Render(RenderArgs),
}

#[derive(Parser, Debug)]
struct InArgs {
    /// Input scene JSON.
    #[arg(long = "in")]
    in_path: PathBuf,
}

#[derive(Parser, Debug)]
struct TraceArgs {
    /// Input scene JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Scene time in seconds.
    #[arg(long, default_value_t = 0.0)]
    time: f64,

    /// Make program compilation fail for labels containing this text.
    #[arg(long)]
    fail_program: Option<String>,
}

#[derive(Parser, Debug)]
struct FrameArgs {
    /// Input scene JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Scene time in seconds.
    #[arg(long, default_value_t = 0.0)]
    time: f64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    #[arg(long, default_value_t = 640)]
    width: u32,

    #[arg(long, default_value_t = 360)]
    height: u32,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Input scene JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Directory receiving `frame_00000.png`, `frame_00001.png`, ...
    #[arg(long)]
    out_dir: PathBuf,

    #[arg(long, default_value_t = 640)]
    width: u32,

    #[arg(long, default_value_t = 360)]
    height: u32,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("TRELLIS_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Validate(args) => cmd_validate(args),
        Command::Dot(args) => cmd_dot(args),
        Command::Trace(args) => cmd_trace(args),
        Command::Frame(args) => cmd_frame(args),
        Command::Render(args) => cmd_render(args),
    }
}

fn read_scene(path: &Path) -> anyhow::Result<trellis::Scene> {
    trellis::Scene::from_path(path).with_context(|| format!("load scene '{}'", path.display()))
}

fn cmd_validate(args: InArgs) -> anyhow::Result<()> {
    let scene = read_scene(&args.in_path)?;
    let mut counts = std::collections::BTreeMap::<&str, usize>::new();
    for (_, node) in scene.iter() {
        *counts.entry(node.kind.name()).or_default() += 1;
    }
    let timing = scene.timing();
    println!(
        "ok: {} nodes, {}s at {}/{} fps ({} frames)",
        scene.len(),
        timing.duration,
        timing.framerate.num,
        timing.framerate.den,
        timing.frame_count()
    );
    for (kind, n) in counts {
        println!("  {kind}: {n}");
    }
    Ok(())
}

fn cmd_dot(args: InArgs) -> anyhow::Result<()> {
    let scene = read_scene(&args.in_path)?;
    print!("{}", scene.to_dot());
    Ok(())
}

fn cmd_trace(args: TraceArgs) -> anyhow::Result<()> {
    let scene = read_scene(&args.in_path)?;
    let mut gpu = trellis::RecordingBackend::new();
    gpu.fail_program_compile(args.fail_program.as_deref());
    let mut engine = trellis::Engine::new(scene, gpu, trellis::EngineOpts::default())?;

    let result = engine.render_frame(args.time);
    for cmd in engine.backend().commands() {
        println!("{cmd}");
    }
    let stats = result.with_context(|| format!("frame at t={}", args.time))?;
    eprintln!(
        "draws={} dispatches={} allocations={} uploads={} skipped={}",
        stats.draws, stats.dispatches, stats.allocations, stats.uploads, stats.skipped_subtrees
    );
    Ok(())
}

fn make_engine(
    path: &Path,
    width: u32,
    height: u32,
) -> anyhow::Result<trellis::Engine<trellis::CpuBackend>> {
    let scene = read_scene(path)?;
    let gpu = trellis::CpuBackend::new(trellis::CpuBackendOpts { width, height })?;
    let opts = trellis::EngineOpts {
        width,
        height,
        ..Default::default()
    };
    Ok(trellis::Engine::new(scene, gpu, opts)?)
}

fn write_png(frame: &trellis::FrameRGBA, out: &Path) -> anyhow::Result<()> {
    if let Some(parent) = out.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    image::save_buffer_with_format(
        out,
        &frame.data,
        frame.width,
        frame.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", out.display()))
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let mut engine = make_engine(&args.in_path, args.width, args.height)?;
    engine
        .render_frame(args.time)
        .with_context(|| format!("frame at t={}", args.time))?;
    write_png(&engine.backend().read_frame(), &args.out)?;
    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let mut engine = make_engine(&args.in_path, args.width, args.height)?;
    std::fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("create output dir '{}'", args.out_dir.display()))?;

    let frames = engine.scene().timing().frame_count();
    for f in 0..frames {
        engine
            .render_frame_index(trellis::FrameIndex(f))
            .with_context(|| format!("frame {f}"))?;
        let out = args.out_dir.join(format!("frame_{f:05}.png"));
        write_png(&engine.backend().read_frame(), &out)?;
    }
    eprintln!("wrote {frames} frames to {}", args.out_dir.display());
    Ok(())
}
