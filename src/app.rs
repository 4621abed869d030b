//! Live mode: winit window, input routing and frame scheduling.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use glam::Vec2;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalPosition,
    event::*,
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use crate::audio::{AudioEngine, MediaElement, MediaEvent, Track};
use crate::frame::FrameLoop;
use crate::math::format_time;
use crate::params::EqConfig;
use crate::present::Presenter;
use crate::render::Canvas;

/// Arrow-key seek step (seconds)
const SEEK_STEP_S: f64 = 5.0;

/// Arrow-key volume step
const VOLUME_STEP: f32 = 0.1;

/// Which canvas a window position falls on
#[derive(Debug, Clone, Copy, PartialEq)]
enum Region {
    Scene(Vec2),
    Spectrum(Vec2),
}

/// Main application state
struct App {
    window: Option<Arc<Window>>,
    presenter: Option<Presenter>,
    frame_loop: FrameLoop,

    cursor: Option<PhysicalPosition<f64>>,
    seeking: bool,

    start_time: Instant,
    last_frame: Instant,
    error: Option<anyhow::Error>,
}

impl App {
    fn new(frame_loop: FrameLoop) -> Self {
        Self {
            window: None,
            presenter: None,
            frame_loop,
            cursor: None,
            seeking: false,
            start_time: Instant::now(),
            last_frame: Instant::now(),
            error: None,
        }
    }

    fn wall_s(&self) -> f64 {
        self.start_time.elapsed().as_secs_f64()
    }

    fn region(&self, pos: PhysicalPosition<f64>) -> Option<Region> {
        let surfaces = self.frame_loop.surfaces();
        let p = Vec2::new(pos.x as f32, pos.y as f32);
        let scene_h = surfaces.scene.height() as f32;
        if !p.is_finite() || p.x < 0.0 || p.y < 0.0 {
            return None;
        }
        if p.y < scene_h {
            Some(Region::Scene(p))
        } else if p.y < scene_h + surfaces.spectrum.height() as f32 {
            Some(Region::Spectrum(Vec2::new(p.x, p.y - scene_h)))
        } else {
            None
        }
    }

    /// Track time under a spectrum x coordinate
    fn time_at(&self, x: f32) -> f64 {
        let width = self.frame_loop.surfaces().spectrum.width().max(1) as f64;
        let duration = self.frame_loop.element().duration();
        (x as f64 / width).clamp(0.0, 1.0) * duration
    }

    fn sync_size(&mut self) {
        let Some(window) = &self.window else {
            return;
        };
        let size = window.inner_size();
        let dpr = window.scale_factor() as f32;
        if let Some(presenter) = self.presenter.as_mut() {
            presenter.resize(size.width, size.height);
        }
        self.frame_loop.resize(
            size.width as f32 / dpr,
            size.height as f32 / dpr,
            dpr,
        );
    }

    fn update_title(&self) {
        let Some(window) = &self.window else {
            return;
        };
        let element = self.frame_loop.element();
        let state = if element.paused() { "paused" } else { "playing" };
        window.set_title(&format!(
            "eqwalker  {} / {}  [{}]",
            format_time(element.current_time()),
            format_time(element.duration()),
            state
        ));
    }

    fn on_key(&mut self, event_loop: &ActiveEventLoop, code: KeyCode) {
        match code {
            KeyCode::Escape => event_loop.exit(),
            KeyCode::Space => {
                if let Err(e) = self.frame_loop.toggle() {
                    tracing::error!("Playback failed: {}", e);
                }
            }
            KeyCode::ArrowLeft => self.frame_loop.seek_by(-SEEK_STEP_S),
            KeyCode::ArrowRight => self.frame_loop.seek_by(SEEK_STEP_S),
            KeyCode::ArrowUp => {
                let v = self.frame_loop.volume() + VOLUME_STEP;
                self.frame_loop.set_volume(v);
            }
            KeyCode::ArrowDown => {
                let v = self.frame_loop.volume() - VOLUME_STEP;
                self.frame_loop.set_volume(v);
            }
            _ => {}
        }
    }

    fn on_cursor(&mut self, pos: PhysicalPosition<f64>) {
        self.cursor = Some(pos);
        let region = self.region(pos);
        let wall = self.wall_s();

        match region {
            Some(Region::Scene(p)) => self.frame_loop.input_mut().pointer_moved(p),
            _ => self.frame_loop.input_mut().pointer_left(),
        }

        if self.seeking {
            let x = match region {
                Some(Region::Scene(p)) | Some(Region::Spectrum(p)) => p.x,
                None => pos.x as f32,
            };
            let t = self.time_at(x);
            self.frame_loop.input_mut().seek_drag(t, wall);
        }
    }

    fn on_mouse(&mut self, state: ElementState) {
        match state {
            ElementState::Pressed => {
                let Some(Region::Spectrum(p)) = self.cursor.and_then(|c| self.region(c)) else {
                    return;
                };
                let t = self.time_at(p.x);
                let wall = self.wall_s();
                self.seeking = true;
                self.frame_loop.input_mut().seek_start(t, wall);
            }
            ElementState::Released => self.release_drag(),
        }
    }

    /// End a scrub whose button release may never reach this window
    fn release_drag(&mut self) {
        if self.seeking {
            self.seeking = false;
            self.frame_loop.input_mut().seek_end();
        }
    }

    fn on_cursor_left(&mut self) {
        self.cursor = None;
        self.frame_loop.input_mut().pointer_left();
        self.release_drag();
    }

    /// Advance the simulation and present one frame
    fn render_frame(&mut self, event_loop: &ActiveEventLoop) {
        let now = Instant::now();
        let dt = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;

        self.frame_loop.step(dt);

        if self
            .frame_loop
            .events()
            .iter()
            .any(|e| !matches!(e, MediaEvent::LoadedMetadata { .. }))
        {
            self.update_title();
        }

        let Some(presenter) = self.presenter.as_mut() else {
            return;
        };
        match presenter.present(self.frame_loop.surfaces()) {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => presenter.reconfigure(),
            Err(wgpu::SurfaceError::OutOfMemory) => {
                self.error = Some(anyhow::anyhow!("GPU out of memory"));
                event_loop.exit();
            }
            Err(e) => tracing::warn!("Present error: {:?}", e),
        }
    }
}

impl ApplicationHandler for App {
    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return; // Already initialized
        }

        let render = &self.frame_loop.config().render;
        let window_attributes = Window::default_attributes()
            .with_title("eqwalker")
            .with_inner_size(winit::dpi::LogicalSize::new(
                render.window_width,
                render.window_height,
            ));

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                self.error = Some(anyhow::Error::new(e).context("failed to create window"));
                event_loop.exit();
                return;
            }
        };

        match pollster::block_on(Presenter::new(Arc::clone(&window))) {
            Ok(presenter) => self.presenter = Some(presenter),
            Err(e) => {
                self.error = Some(anyhow::Error::new(e));
                event_loop.exit();
                return;
            }
        }

        tracing::info!("eqwalker is running");
        tracing::info!("Space: play/pause, arrows: seek/volume, drag the spectrum to scrub, Esc: quit");

        self.window = Some(window);
        self.sync_size();
        self.update_title();
        self.last_frame = Instant::now();
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => self.sync_size(),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        state: ElementState::Pressed,
                        physical_key: PhysicalKey::Code(code),
                        repeat,
                        ..
                    },
                ..
            } => {
                // Held arrows keep seeking; a held space must not flicker playback
                if !(repeat && code == KeyCode::Space) {
                    self.on_key(event_loop, code);
                    self.update_title();
                }
            }
            WindowEvent::CursorMoved { position, .. } => self.on_cursor(position),
            WindowEvent::CursorLeft { .. } => self.on_cursor_left(),
            WindowEvent::Focused(false) => self.release_drag(),
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => self.on_mouse(state),
            WindowEvent::RedrawRequested => self.render_frame(event_loop),
            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.frame_loop.dispose();
        tracing::info!("Shut down after {} frames", self.frame_loop.frames());
    }
}

/// Open the window and run until it closes
pub fn run(config: EqConfig, track: Track, volume: Option<f32>) -> anyhow::Result<()> {
    let engine = AudioEngine::new(config.analyser.clone());
    let element = MediaElement::with_track(track);
    let (w, h) = (
        config.render.window_width as f32,
        config.render.window_height as f32,
    );
    let mut frame_loop = FrameLoop::new(config, engine, element, w, h, 1.0)
        .context("failed to set up the frame loop")?;
    if let Some(v) = volume {
        frame_loop.set_volume(v);
    }

    let event_loop = EventLoop::new().context("failed to create event loop")?;
    let mut app = App::new(frame_loop);
    event_loop.run_app(&mut app).context("event loop failed")?;

    match app.error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
