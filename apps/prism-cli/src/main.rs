use clap::{Args, Parser, Subcommand};
use prism_render::setup::{animate, build_demo_scene};
use prism_render::{DeviceCommand, FrameConfig, FrameOrchestrator, RecordingDevice, Scene};
use prism_tools::SceneInspector;
use serde_json::json;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Simulated frame time for headless runs.
const FRAME_DT: f32 = 1.0 / 60.0;

#[derive(Parser)]
#[command(name = "prism-cli", about = "Headless tooling for the prism renderer")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and crate info
    Info,
    /// Render the demo scene on the recording device and print the command stream
    Trace {
        /// Number of frames to render; the last one is printed
        #[arg(short, long, default_value = "1")]
        frames: u32,
        /// Report tearing support from the simulated swap chain
        #[arg(long)]
        tearing: bool,
        #[command(flatten)]
        surface: SurfaceArgs,
    },
    /// Print the demo scene as the inspector sees it
    Inspect {
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
        #[command(flatten)]
        surface: SurfaceArgs,
    },
}

#[derive(Args)]
struct SurfaceArgs {
    #[arg(long, default_value = "1280")]
    width: u32,
    #[arg(long, default_value = "720")]
    height: u32,
    /// Frame settings as JSON
    #[arg(long)]
    config: Option<PathBuf>,
    /// Skip the blur pass
    #[arg(long)]
    no_post_process: bool,
}

impl SurfaceArgs {
    fn frame_config(&self) -> anyhow::Result<FrameConfig> {
        let mut config = match &self.config {
            Some(path) => FrameConfig::from_json_file(path)?,
            None => FrameConfig::default(),
        };
        if self.no_post_process {
            config.post_process = false;
        }
        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    // stdout carries the command's output
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Info => {
            println!("prism-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("common: {}", prism_common::crate_info());
            println!("input: {}", prism_input::crate_info());
            println!("render: {}", prism_render::crate_info());
            println!("tools: {}", prism_tools::crate_info());
        }
        Commands::Trace {
            frames,
            tearing,
            surface,
        } => {
            let mut device =
                RecordingDevice::new(surface.width, surface.height).with_tearing(tearing);
            let (mut scene, mut orchestrator) =
                build_demo_scene(&mut device, surface.frame_config()?)?;
            // setup traffic is not part of any frame
            let setup = device.take_commands();
            tracing::info!(
                frames,
                width = surface.width,
                height = surface.height,
                setup_commands = setup.len(),
                passes = ?pass_names(&orchestrator, &device),
                "tracing demo scene"
            );

            for i in 0..frames.max(1) {
                animate(&mut scene, FRAME_DT);
                let stats =
                    orchestrator.render_frame(&mut device, &scene, i as f32 * FRAME_DT)?;
                println!("{stats}");
            }

            if let Some(frame) = device.frames().last() {
                println!();
                for (n, command) in frame.commands.iter().enumerate() {
                    println!("{n:4}  {}", describe(&device, command));
                }
                println!(
                    "      present sync={} tearing={}",
                    frame.sync_interval, frame.allow_tearing
                );
                for command in device.commands() {
                    println!("      {}", describe(&device, command));
                }
            }
        }
        Commands::Inspect { json, surface } => {
            let mut device = RecordingDevice::new(surface.width, surface.height);
            let config = surface.frame_config()?;
            let (scene, _) = build_demo_scene(&mut device, config.clone())?;
            tracing::info!(
                entities = scene.entities().len(),
                cameras = scene.cameras().len(),
                lights = scene.lights().len(),
                json,
                "inspecting demo scene"
            );
            if json {
                println!("{}", serde_json::to_string_pretty(&scene_json(&scene, &config))?);
            } else {
                print_scene(&scene, &config);
            }
        }
    }

    Ok(())
}

fn pass_names(orchestrator: &FrameOrchestrator, device: &RecordingDevice) -> Vec<&'static str> {
    orchestrator.plan(device).iter().map(|pass| pass.name).collect()
}

/// A command with shader ids resolved to program names.
fn describe(device: &RecordingDevice, command: &DeviceCommand) -> String {
    match command {
        DeviceCommand::SetShader {
            shader: Some(id), ..
        }
        | DeviceCommand::UploadConstants { shader: id, .. } => match device.shader_name(*id) {
            Some(name) => format!("{command} ({name})"),
            None => command.to_string(),
        },
        _ => command.to_string(),
    }
}

fn print_scene(scene: &Scene, config: &FrameConfig) {
    println!("{}", SceneInspector::summary(scene, config));
    for index in 0..scene.entities().len() {
        if let Some(info) = SceneInspector::inspect_entity(scene, index) {
            println!("  {info}");
        }
    }
    for index in 0..scene.cameras().len() {
        if let Some(info) = SceneInspector::camera_info(scene, index) {
            println!("  {info}");
        }
    }
    for index in 0..scene.lights().len() {
        if let Some(info) = SceneInspector::light_info(scene, index) {
            println!("  {info}");
        }
    }
}

fn scene_json(scene: &Scene, config: &FrameConfig) -> serde_json::Value {
    let entities: Vec<_> = (0..scene.entities().len())
        .filter_map(|i| SceneInspector::inspect_entity(scene, i))
        .collect();
    let cameras: Vec<_> = (0..scene.cameras().len())
        .filter_map(|i| SceneInspector::camera_info(scene, i))
        .collect();
    let lights: Vec<_> = (0..scene.lights().len())
        .filter_map(|i| SceneInspector::light_info(scene, i))
        .collect();
    json!({
        "summary": SceneInspector::summary(scene, config),
        "config": config,
        "entities": entities,
        "cameras": cameras,
        "lights": lights,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demo() -> (RecordingDevice, Scene) {
        let mut device = RecordingDevice::new(640, 360);
        let (scene, _) = build_demo_scene(&mut device, FrameConfig::default()).unwrap();
        (device, scene)
    }

    #[test]
    fn scene_json_lists_everything() {
        let (_, scene) = demo();
        let value = scene_json(&scene, &FrameConfig::default());
        assert_eq!(value["entities"].as_array().unwrap().len(), 3);
        assert_eq!(value["cameras"].as_array().unwrap().len(), 2);
        assert_eq!(value["lights"].as_array().unwrap().len(), 5);
        assert_eq!(value["summary"]["has_sky"], true);
        assert_eq!(value["config"]["shadow_map_resolution"], 1024);
    }

    #[test]
    fn shader_commands_name_their_program() {
        let (device, scene) = demo();
        let shader = scene.entities()[0].material().borrow().vertex_shader().id();
        let text = describe(
            &device,
            &DeviceCommand::SetShader {
                stage: prism_render::ShaderStage::Vertex,
                shader: Some(shader),
            },
        );
        assert!(text.ends_with(&format!("({})", prism_render::shader::programs::LIT_VS)));
    }

    #[test]
    fn logged_pass_names_follow_config() {
        let mut device = RecordingDevice::new(640, 360);
        let config = FrameConfig {
            post_process: false,
            ..FrameConfig::default()
        };
        let (_, orchestrator) = build_demo_scene(&mut device, config).unwrap();
        assert_eq!(
            pass_names(&orchestrator, &device),
            vec!["shadow", "main", "sky", "overlay"]
        );
    }

    #[test]
    fn trace_flags_parse() {
        let cli = Cli::parse_from(["prism-cli", "trace", "--frames", "3", "--no-post-process"]);
        match cli.command {
            Commands::Trace {
                frames, surface, ..
            } => {
                assert_eq!(frames, 3);
                assert!(!surface.frame_config().unwrap().post_process);
            }
            _ => panic!("expected trace"),
        }
    }
}
