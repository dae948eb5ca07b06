mod overlay;
mod ui;

use anyhow::Result;
use clap::Parser;
use egui::Context as EguiContext;
use overlay::EguiOverlay;
use prism_input::{InputState, Key};
use prism_render::setup::{animate, build_demo_scene};
use prism_render::{FrameConfig, FrameOrchestrator, Scene};
use prism_render_wgpu::WgpuDevice;
use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;
use ui::InspectorState;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{DeviceEvent, ElementState, KeyEvent, MouseButton, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Fullscreen, Window, WindowId};

#[derive(Parser)]
#[command(name = "prism-desktop", about = "Prism rendering demo")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Initial window width
    #[arg(long, default_value = "1280")]
    width: u32,

    /// Initial window height
    #[arg(long, default_value = "720")]
    height: u32,

    /// Wait for vertical blank when presenting
    #[arg(long)]
    vsync: bool,

    /// Draw straight to the back buffer without the blur pass
    #[arg(long)]
    no_post_process: bool,

    /// Box blur radius in pixels (0-10)
    #[arg(long)]
    blur_radius: Option<i32>,

    /// Frame settings as JSON; flags override it
    #[arg(long)]
    config: Option<PathBuf>,
}

impl Cli {
    fn frame_config(&self) -> Result<FrameConfig> {
        let mut config = match &self.config {
            Some(path) => FrameConfig::from_json_file(path)?,
            None => FrameConfig::default(),
        };
        if self.vsync {
            config.vsync = true;
        }
        if self.no_post_process {
            config.post_process = false;
        }
        if let Some(radius) = self.blur_radius {
            config.blur_radius = radius;
        }
        config.validate()?;
        Ok(config)
    }
}

const WINDOW_TITLE: &str = "Prism";

/// How often the title bar stats are rewritten.
const TITLE_INTERVAL: Duration = Duration::from_millis(500);

fn map_key(code: KeyCode) -> Option<Key> {
    match code {
        KeyCode::KeyW => Some(Key::W),
        KeyCode::KeyA => Some(Key::A),
        KeyCode::KeyS => Some(Key::S),
        KeyCode::KeyD => Some(Key::D),
        KeyCode::Space => Some(Key::Space),
        KeyCode::ShiftLeft | KeyCode::ShiftRight => Some(Key::Shift),
        KeyCode::Escape => Some(Key::Escape),
        KeyCode::Tab => Some(Key::Tab),
        _ => None,
    }
}

/// Everything that exists once the window and GPU are up.
struct Running {
    window: Arc<Window>,
    device: WgpuDevice,
    scene: Scene,
    orchestrator: FrameOrchestrator,
    egui_winit: egui_winit::State,
    overlay: Rc<RefCell<EguiOverlay>>,
    inspector: InspectorState,
    /// When the title last showed stats; `None` while it shows the plain name.
    title_updated: Option<Instant>,
}

impl Running {
    fn update_title(&mut self, window: &ui::WindowInfo, now: Instant) {
        if !self.inspector.title_stats {
            if self.title_updated.take().is_some() {
                self.window.set_title(WINDOW_TITLE);
            }
            return;
        }
        if title_due(self.title_updated, now) {
            self.window.set_title(&ui::title_text(window));
            self.title_updated = Some(now);
        }
    }
}

/// Presses the UI consumed stay with the UI. Releases always pass so no key
/// or button stays held.
fn reaches_camera(consumed: bool, pressed: bool) -> bool {
    !(consumed && pressed)
}

fn title_due(last: Option<Instant>, now: Instant) -> bool {
    last.is_none_or(|last| now.duration_since(last) >= TITLE_INTERVAL)
}

struct App {
    config: FrameConfig,
    size: PhysicalSize<u32>,
    running: Option<Running>,
    egui_ctx: EguiContext,
    input: InputState,
    started: Instant,
    last_frame: Instant,
    fps: f32,
}

impl App {
    fn new(config: FrameConfig, width: u32, height: u32) -> Self {
        let now = Instant::now();
        Self {
            config,
            size: PhysicalSize::new(width, height),
            running: None,
            egui_ctx: EguiContext::default(),
            input: InputState::new(),
            started: now,
            last_frame: now,
            fps: 0.0,
        }
    }

    fn start(&self, event_loop: &ActiveEventLoop) -> Result<Running> {
        let mut attrs = Window::default_attributes()
            .with_title(WINDOW_TITLE)
            .with_inner_size(self.size);
        if self.config.fullscreen {
            attrs = attrs.with_fullscreen(Some(Fullscreen::Borderless(None)));
        }
        let window = Arc::new(event_loop.create_window(attrs)?);
        let size = window.inner_size();

        let mut device = pollster::block_on(WgpuDevice::new(
            window.clone(),
            size.width.max(1),
            size.height.max(1),
        ))?;
        let (scene, orchestrator) = build_demo_scene(&mut device, self.config.clone())?;

        let overlay = Rc::new(RefCell::new(EguiOverlay::new(
            device.device(),
            device.surface_format(),
        )));
        device.set_overlay(Rc::clone(&overlay));

        device.enable_depth_preview(orchestrator.shadow_map())?;
        let shadow_preview = device
            .depth_preview()
            .map(|view| overlay.borrow_mut().register_texture(device.device(), view));

        let egui_winit = egui_winit::State::new(
            self.egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );

        Ok(Running {
            window,
            device,
            scene,
            orchestrator,
            egui_winit,
            overlay,
            inspector: InspectorState {
                title_stats: true,
                shadow_preview,
            },
            title_updated: None,
        })
    }

    fn redraw(&mut self) {
        let Some(running) = self.running.as_mut() else {
            return;
        };
        let now = Instant::now();
        let dt = (now - self.last_frame).as_secs_f32().min(0.1);
        self.last_frame = now;
        if dt > 0.0 {
            self.fps = self.fps * 0.9 + 0.1 / dt;
        }

        // Build the UI first so its capture flags apply to this frame's input.
        let size = running.window.inner_size();
        let window_info = ui::WindowInfo {
            width: size.width,
            height: size.height,
            fps: self.fps,
        };
        let raw_input = running.egui_winit.take_egui_input(&running.window);
        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            ui::draw_inspector(
                ctx,
                &mut running.scene,
                &mut running.orchestrator,
                &window_info,
                &mut running.inspector,
            );
        });
        running.update_title(&window_info, now);
        running
            .egui_winit
            .handle_platform_output(&running.window, full_output.platform_output);
        let paint_jobs = self
            .egui_ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);
        running.overlay.borrow_mut().submit(
            paint_jobs,
            full_output.textures_delta,
            egui_wgpu::ScreenDescriptor {
                size_in_pixels: [size.width, size.height],
                pixels_per_point: full_output.pixels_per_point,
            },
        );

        self.input.set_capture(
            self.egui_ctx.wants_keyboard_input(),
            self.egui_ctx.wants_pointer_input(),
        );
        running.scene.update(dt, &self.input);
        animate(&mut running.scene, dt);
        self.input.begin_frame();

        let total_time = (now - self.started).as_secs_f32();
        match running
            .orchestrator
            .render_frame(&mut running.device, &running.scene, total_time)
        {
            Ok(stats) => tracing::trace!(%stats, "frame rendered"),
            Err(e) => tracing::error!("frame failed: {e}"),
        }
    }

    fn handle_key(&mut self, event_loop: &ActiveEventLoop, key: Key, pressed: bool) {
        self.input.set_key(key, pressed);
        if !pressed || self.input.keyboard_captured() {
            return;
        }
        match key {
            Key::Escape => event_loop.exit(),
            Key::Tab => {
                if let Some(running) = self.running.as_mut() {
                    running.scene.select_next_camera();
                    tracing::info!(
                        camera = running.scene.active_camera_index(),
                        "camera selected"
                    );
                }
            }
            _ => {}
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.running.is_some() {
            return;
        }
        match self.start(event_loop) {
            Ok(running) => self.running = Some(running),
            Err(e) => {
                tracing::error!("startup failed: {e:#}");
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let mut consumed = false;
        if let Some(running) = self.running.as_mut() {
            let response = running.egui_winit.on_window_event(&running.window, &event);
            if response.repaint {
                running.window.request_redraw();
            }
            consumed = response.consumed;
        }

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                if let Some(running) = self.running.as_mut() {
                    if let Err(e) = running.orchestrator.resize(
                        &mut running.device,
                        &mut running.scene,
                        new_size.width,
                        new_size.height,
                    ) {
                        tracing::error!("resize failed: {e}");
                    }
                }
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state,
                        repeat: false,
                        ..
                    },
                ..
            } => {
                let pressed = state == ElementState::Pressed;
                if let Some(key) = map_key(code).filter(|_| reaches_camera(consumed, pressed)) {
                    self.handle_key(event_loop, key, pressed);
                }
            }
            WindowEvent::MouseInput {
                button: MouseButton::Left,
                state,
                ..
            } => {
                let pressed = state == ElementState::Pressed;
                if reaches_camera(consumed, pressed) {
                    self.input.set_primary_button(pressed);
                }
            }
            WindowEvent::RedrawRequested => {
                self.redraw();
                if let Some(running) = &self.running {
                    running.window.request_redraw();
                }
            }
            _ => {}
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: winit::event::DeviceId,
        event: DeviceEvent,
    ) {
        if let DeviceEvent::MouseMotion { delta } = event {
            self.input.add_pointer_delta(delta.0 as f32, delta.1 as f32);
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(running) = &self.running {
            running.window.request_redraw();
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    let config = cli.frame_config()?;
    tracing::info!(?config, "prism-desktop starting");

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(config, cli.width, cli.height);
    event_loop.run_app(&mut app)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_config() {
        let cli = Cli::parse_from([
            "prism-desktop",
            "--vsync",
            "--no-post-process",
            "--blur-radius",
            "4",
        ]);
        let config = cli.frame_config().unwrap();
        assert!(config.vsync);
        assert!(!config.post_process);
        assert_eq!(config.blur_radius, 4);
    }

    #[test]
    fn out_of_range_blur_is_rejected() {
        let cli = Cli::parse_from(["prism-desktop", "--blur-radius", "11"]);
        assert!(cli.frame_config().is_err());
    }

    #[test]
    fn consumed_presses_skip_the_camera() {
        assert!(reaches_camera(false, true));
        assert!(!reaches_camera(true, true));
        assert!(reaches_camera(true, false));
    }

    #[test]
    fn title_refreshes_on_interval() {
        let start = Instant::now();
        assert!(title_due(None, start));
        assert!(!title_due(Some(start), start + Duration::from_millis(100)));
        assert!(title_due(Some(start), start + TITLE_INTERVAL));
    }

    #[test]
    fn movement_keys_map() {
        assert_eq!(map_key(KeyCode::ShiftRight), Some(Key::Shift));
        assert_eq!(map_key(KeyCode::KeyQ), None);
    }
}
