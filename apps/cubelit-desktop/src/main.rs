use anyhow::{Context, Result};
use clap::Parser;
use cubelit_camera::Camera;
use cubelit_common::SceneConfig;
use cubelit_input::{InputBuffer, InputEvent, InputState, Key, KeyBindings};
use cubelit_render_wgpu::{GpuContext, SceneRenderer};
use cubelit_scene::{FrameMatrices, SceneLayout};
use glam::DVec2;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, KeyEvent, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{CursorGrabMode, Window, WindowId};

/// Pixel scroll deltas are converted to lines at this rate.
const PIXELS_PER_LINE: f64 = 20.0;

#[derive(Parser)]
#[command(name = "cubelit-desktop", about = "Lit cube scene viewer")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Scene configuration file (YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn map_key(code: KeyCode) -> Key {
    match code {
        KeyCode::KeyW => Key::W,
        KeyCode::KeyA => Key::A,
        KeyCode::KeyS => Key::S,
        KeyCode::KeyD => Key::D,
        KeyCode::Escape => Key::Escape,
        _ => Key::Other,
    }
}

fn scroll_lines(delta: MouseScrollDelta) -> (f64, f64) {
    match delta {
        MouseScrollDelta::LineDelta(x, y) => (x as f64, y as f64),
        MouseScrollDelta::PixelDelta(p) => (p.x / PIXELS_PER_LINE, p.y / PIXELS_PER_LINE),
    }
}

/// Application state.
struct AppState {
    config: SceneConfig,
    layout: SceneLayout,
    camera: Camera,
    events: InputBuffer,
    input: InputState,
    last_frame: Instant,
}

impl AppState {
    fn new(config: SceneConfig) -> Self {
        let centre = DVec2::new(
            config.window.width as f64 / 2.0,
            config.window.height as f64 / 2.0,
        );
        Self {
            layout: SceneLayout::from_config(&config),
            camera: Camera::from_config(&config.camera),
            events: InputBuffer::new(),
            input: InputState::new(KeyBindings::default(), centre),
            last_frame: Instant::now(),
            config,
        }
    }

    /// Absorb this frame's input and move the camera. Returns false once
    /// shutdown was requested.
    fn update(&mut self) -> bool {
        let frame_input = self.input.apply(self.events.drain());
        let now = Instant::now();
        let dt = (now - self.last_frame).as_secs_f32();
        self.last_frame = now;
        frame_input.apply_to(&mut self.camera, dt);
        !frame_input.exit_requested
    }

    fn frame_matrices(&self, aspect: f32) -> FrameMatrices {
        let projection = &self.config.projection;
        FrameMatrices::new(&self.camera, aspect, projection.near, projection.far)
    }
}

struct Gpu {
    window: Arc<Window>,
    context: GpuContext,
    renderer: SceneRenderer,
}

struct GpuApp {
    state: AppState,
    gpu: Option<Gpu>,
    /// First fatal error; returned from `main` once the loop stops.
    exit_error: Option<anyhow::Error>,
}

impl GpuApp {
    fn new(config: SceneConfig) -> Self {
        Self {
            state: AppState::new(config),
            gpu: None,
            exit_error: None,
        }
    }

    /// Keep the first fatal error. The caller stops the event loop.
    fn record_failure(&mut self, err: anyhow::Error) {
        tracing::error!("{err:#}");
        if self.exit_error.is_none() {
            self.exit_error = Some(err);
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        self.record_failure(err);
        event_loop.exit();
    }

    /// Outcome of the run: the recorded failure, if any.
    fn finish(&mut self) -> Result<()> {
        match self.exit_error.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn init_gpu(&self, event_loop: &ActiveEventLoop) -> Result<Gpu> {
        let window_config = &self.state.config.window;
        let attrs = Window::default_attributes()
            .with_title(window_config.title.clone())
            .with_inner_size(PhysicalSize::new(window_config.width, window_config.height));
        let window = Arc::new(
            event_loop
                .create_window(attrs)
                .context("failed to create window")?,
        );

        if let Err(e) = window
            .set_cursor_grab(CursorGrabMode::Confined)
            .or_else(|_| window.set_cursor_grab(CursorGrabMode::Locked))
        {
            tracing::warn!("cursor capture unavailable: {e}");
        }
        window.set_cursor_visible(false);

        let size = window.inner_size();
        let context = GpuContext::new(window.clone(), size.width, size.height)
            .context("failed to initialize GPU")?;
        let renderer = SceneRenderer::new(
            context.device(),
            context.queue(),
            context.format(),
            context.size(),
            &self.state.config,
            &self.state.layout,
        )
        .context("failed to build scene renderer")?;

        Ok(Gpu {
            window,
            context,
            renderer,
        })
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        if !self.state.update() {
            tracing::info!("exiting");
            event_loop.exit();
            return;
        }
        let Some(gpu) = &mut self.gpu else {
            return;
        };
        let frame = self.state.frame_matrices(gpu.context.aspect());

        let output = match gpu.context.acquire() {
            Ok(Some(output)) => output,
            Ok(None) => return,
            Err(e) => {
                let err = anyhow::Error::new(e).context("surface acquire failed");
                self.fail(event_loop, err);
                return;
            }
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        if let Err(e) = gpu.renderer.render(
            gpu.context.device(),
            gpu.context.queue(),
            &view,
            &frame,
            self.state.camera.position(),
            &self.state.layout,
        ) {
            self.fail(event_loop, anyhow::Error::new(e).context("render failed"));
            return;
        }
        output.present();
    }
}

impl ApplicationHandler for GpuApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.gpu.is_some() {
            return;
        }
        match self.init_gpu(event_loop) {
            Ok(gpu) => self.gpu = Some(gpu),
            Err(e) => self.fail(event_loop, e),
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                self.state.events.push(InputEvent::CloseRequested);
            }
            WindowEvent::Resized(new_size) => {
                if let Some(gpu) = &mut self.gpu {
                    gpu.context.resize(new_size.width, new_size.height);
                    let (width, height) = gpu.context.size();
                    gpu.renderer.resize(gpu.context.device(), width, height);
                }
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state,
                        ..
                    },
                ..
            } => {
                self.state.events.push(InputEvent::Key {
                    key: map_key(code),
                    pressed: state == ElementState::Pressed,
                });
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.state.events.push(InputEvent::CursorMoved {
                    x: position.x,
                    y: position.y,
                });
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let (x, y) = scroll_lines(delta);
                self.state.events.push(InputEvent::Scroll { x, y });
            }
            WindowEvent::RedrawRequested => {
                self.redraw(event_loop);
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(gpu) = &self.gpu {
            gpu.window.request_redraw();
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    let config = SceneConfig::load_or_default(cli.config.as_deref())
        .context("failed to load scene config")?;
    tracing::info!(
        instances = config.scene.instances.len(),
        "cubelit-desktop starting"
    );

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = GpuApp::new(config);
    event_loop.run_app(&mut app)?;
    app.finish()
}
