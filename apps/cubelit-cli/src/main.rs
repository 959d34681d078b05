use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cubelit_camera::Camera;
use cubelit_common::SceneConfig;
use cubelit_scene::{FrameMatrices, SceneLayout};
use cubelit_shader::{NagaBackend, ShaderProgramManager, StageKind};
use glam::Mat4;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cubelit-cli", about = "CLI tool for cubelit scenes")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print crate versions
    Info,
    /// Compile and link the configured shader programs without a GPU
    Check {
        /// Scene configuration file (YAML)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Print the initial view, projection and per-instance MVP matrices
    Transforms {
        /// Scene configuration file (YAML)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn load_config(path: Option<PathBuf>) -> Result<SceneConfig> {
    SceneConfig::load_or_default(path.as_deref()).context("failed to load scene config")
}

fn check(config: &SceneConfig) -> Result<()> {
    let paths = &config.shaders;
    tracing::info!(
        vertex = %paths.vertex.display(),
        scene = %paths.scene_fragment.display(),
        light = %paths.light_fragment.display(),
        "checking shader programs"
    );
    let mut programs = ShaderProgramManager::new(NagaBackend);
    let vertex = programs.load_stage(StageKind::Vertex, &paths.vertex)?;
    let scene = programs.load_stage(StageKind::Fragment, &paths.scene_fragment)?;
    let light = programs.load_stage(StageKind::Fragment, &paths.light_fragment)?;

    for (label, fragment) in [("lighting", &scene), ("light_source", &light)] {
        let handle = programs
            .build_program(label, &[&vertex, fragment])
            .with_context(|| format!("program `{label}` is invalid"))?;
        let program = programs.program(handle)?;
        tracing::debug!(
            program = label,
            uniforms = program.uniform_locations().len(),
            "linked"
        );
        println!("{label} ({handle}): OK");
        for (name, loc) in program.uniform_locations() {
            println!(
                "  {name:<24} group={} binding={} offset={:<4} size={:<4} {:?}",
                loc.group, loc.binding, loc.offset, loc.size, loc.kind
            );
        }
    }
    Ok(())
}

fn print_matrix(label: &str, m: &Mat4) {
    println!("{label}:");
    // Row-major for reading; storage is column-major.
    for row in 0..4 {
        let r = m.row(row);
        println!("  [{:>10.3} {:>10.3} {:>10.3} {:>10.3}]", r.x, r.y, r.z, r.w);
    }
}

fn transforms(config: &SceneConfig) {
    tracing::debug!(aspect = config.window.aspect(), "deriving initial transforms");
    let camera = Camera::from_config(&config.camera);
    let layout = SceneLayout::from_config(config);
    let frame = FrameMatrices::new(
        &camera,
        config.window.aspect(),
        config.projection.near,
        config.projection.far,
    );

    println!(
        "camera: position={} yaw={:.2} pitch={:.2} zoom={:.1}",
        camera.position(),
        camera.yaw(),
        camera.pitch(),
        camera.zoom()
    );
    print_matrix("view", &frame.view);
    print_matrix("projection", &frame.projection);
    for (i, (position, t)) in layout
        .instances
        .iter()
        .zip(layout.instance_transforms(&frame))
        .enumerate()
    {
        print_matrix(&format!("instance {i} at {position} mvp"), &t.mvp);
    }
    print_matrix("light marker mvp", &layout.light_marker_mvp(&frame));
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Info => {
            println!("cubelit-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("common: {}", cubelit_common::crate_info());
            println!("camera: {}", cubelit_camera::crate_info());
            println!("scene: {}", cubelit_scene::crate_info());
            println!("input: {}", cubelit_input::crate_info());
            println!("shader: {}", cubelit_shader::crate_info());
            println!("render: {}", cubelit_render_wgpu::crate_info());
        }
        Commands::Check { config } => {
            check(&load_config(config)?)?;
        }
        Commands::Transforms { config } => {
            transforms(&load_config(config)?);
        }
    }

    Ok(())
}
