//! Fogwalk -- first-person walkthrough of a fogged city block.
//!
//! winit drives the event loop via `ApplicationHandler`. Each `RedrawRequested`
//! runs exactly one variable-length step:
//!
//!   1. `begin_frame()` -- measure the wall-clock delta (zero on the first frame)
//!   2. poll the config file and apply edits at the frame boundary
//!   3. `FrameLoop::step` -- motion controller, then particle field
//!   4. render scene + particles offscreen, post passes to the surface, egui on top
//!
//! Controls are only live while the pointer is captured. Clicking the window
//! captures it; Escape or losing focus releases it.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use glam::Vec2;
use winit::application::ApplicationHandler;
use winit::event::{DeviceEvent, DeviceId, ElementState, MouseButton, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use fw_core::{
    load_config_from_path, load_config_or_default, ConfigWatcher, FrameClock, FrameLoop,
    InputState, KinematicBody, Key, MotionController, ParticleField, ViewAngles, Viewer,
    WalkthroughConfig,
};
use fw_devtools::{PanelStats, PanelTunables, SettingsPanel};
use fw_platform::window::PlatformConfig;
use fw_render::{FirstPersonCamera, GpuContext, GpuInitError, RenderStats, WalkthroughRenderer};

const CONFIG_PATH: &str = "assets/config/walkthrough.json";

/// All mutable state, built lazily in `ApplicationHandler::resumed` once the
/// window and GPU surface exist.
struct EngineState {
    window: Arc<Window>,
    gpu: GpuContext,
    clock: FrameClock,
    input: InputState,
    frame: FrameLoop,
    camera: FirstPersonCamera,
    renderer: WalkthroughRenderer,
    panel: SettingsPanel,

    // --- Hot-reloadable tunables -------------------------------------------------
    config: WalkthroughConfig,
    config_watcher: ConfigWatcher,

    last_render_stats: RenderStats,
}

impl EngineState {
    fn new(window: Arc<Window>, config: WalkthroughConfig) -> Result<Self, GpuInitError> {
        let gpu = GpuContext::new(window.clone())?;
        let (width, height) = gpu.size;

        let camera = FirstPersonCamera::new(&config.camera, width, height);
        let start = Vec2::new(config.camera.start_x, config.camera.start_z);
        let mut renderer = WalkthroughRenderer::new(
            &gpu.device,
            gpu.surface_format,
            width,
            height,
            &config.skyline,
            start,
        );
        let panel = SettingsPanel::new(&gpu.device, gpu.surface_format, &window);

        let mut frame = FrameLoop::new(config.motion.max_frame_dt);
        let rest = config.motion.resting_height;
        frame.attach_viewer(Viewer::new(
            MotionController::new(config.motion),
            KinematicBody::at_rest(start.x, start.y, rest),
            ViewAngles::default(),
        ));
        match ParticleField::spawn(config.particles, rest) {
            Ok(field) => {
                renderer.attach_particles(&gpu.device, &gpu.queue, &field);
                frame.attach_particles(field);
            }
            Err(err) => log::error!("Particle field disabled: {err}"),
        }

        let mut state = Self {
            window,
            gpu,
            clock: FrameClock::new(),
            input: InputState::new(),
            frame,
            camera,
            renderer,
            panel,
            config,
            config_watcher: ConfigWatcher::new(PathBuf::from(CONFIG_PATH)),
            last_render_stats: RenderStats::default(),
        };
        state.sync_camera();
        Ok(state)
    }

    fn set_capture(&mut self, captured: bool) {
        let engaged = match fw_platform::set_pointer_capture(&self.window, captured) {
            Ok(engaged) => engaged,
            Err(err) => {
                log::warn!("Pointer capture change failed: {err}");
                false
            }
        };
        self.frame.set_engaged(engaged, &mut self.input);
    }

    fn reload_config(&mut self) {
        let path = self.config_watcher.path().to_path_buf();
        let candidate = match load_config_from_path(&path) {
            Ok(config) => config,
            Err(err) => {
                log::error!("Config reload failed: {err}");
                return;
            }
        };
        if let Err(err) = self.frame.apply_config(&candidate) {
            log::error!("Config reload rejected: {err}");
            return;
        }

        if candidate.skyline != self.config.skyline {
            let start = Vec2::new(candidate.camera.start_x, candidate.camera.start_z);
            self.renderer
                .rebuild_scene(&self.gpu.device, &candidate.skyline, start);
        }
        if candidate.particles.count != self.config.particles.count {
            self.respawn_particles(&candidate);
        }
        self.camera.fov_y = candidate.camera.fov_y_deg.to_radians();
        self.camera.near = candidate.camera.near;
        self.camera.far = candidate.camera.far;
        self.config = candidate;
        log::info!("Config reloaded from {}", path.display());
    }

    fn respawn_particles(&mut self, config: &WalkthroughConfig) {
        match ParticleField::spawn(config.particles, config.motion.resting_height) {
            Ok(field) => {
                self.renderer
                    .attach_particles(&self.gpu.device, &self.gpu.queue, &field);
                self.frame.attach_particles(field);
            }
            Err(err) => log::error!("Particle respawn failed: {err}"),
        }
    }

    fn sync_camera(&mut self) {
        if let Some(viewer) = self.frame.viewer() {
            self.camera.follow(viewer.body.position, viewer.view);
        }
    }

    fn redraw(&mut self) {
        if self.gpu.size.0 == 0 || self.gpu.size.1 == 0 {
            return;
        }

        let raw_dt = self.clock.begin_frame();

        // Frame boundary: safe point for reloads and UI toggles.
        if self.config_watcher.should_reload() {
            self.reload_config();
        }
        if self.input.is_just_pressed(Key::P) || self.input.is_just_pressed(Key::F3) {
            self.panel.toggle();
        }

        let report = self.frame.step(raw_dt, &mut self.input);
        if report.particles_ticked {
            if let Some(packed) = self.frame.particle_buffer() {
                self.renderer
                    .update_particle_positions(&self.gpu.queue, packed);
            }
        }
        self.sync_camera();

        let Some((output, view)) = self.gpu.begin_frame() else {
            self.input.end_frame();
            return;
        };

        let tunables =
            PanelTunables::capture(&self.frame, &self.config.atmosphere, &self.config.post);
        let stats = panel_stats(&self.frame, &self.last_render_stats);
        let (egui_primitives, egui_textures_delta, edited) =
            self.panel
                .prepare(&self.window, &self.clock, &stats, tunables);

        if let Some(edited) = edited {
            let errors = edited.apply(
                &tunables,
                &mut self.frame,
                &mut self.config.atmosphere,
                &mut self.config.post,
            );
            for err in errors {
                log::warn!("Rejected panel edit: {err}");
            }
        }

        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.gpu.size.0, self.gpu.size.1],
            pixels_per_point: self.window.scale_factor() as f32,
        };

        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        self.last_render_stats = self.renderer.render(
            &self.gpu.queue,
            &mut encoder,
            &view,
            &self.camera,
            &self.config.atmosphere,
            &self.config.post,
        );

        self.panel.upload(
            &self.gpu.device,
            &self.gpu.queue,
            &mut encoder,
            &egui_primitives,
            &egui_textures_delta,
            &screen_descriptor,
        );

        {
            let mut egui_pass = encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("egui Render Pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Load,
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    ..Default::default()
                })
                .forget_lifetime();

            self.panel
                .paint(&mut egui_pass, &egui_primitives, &screen_descriptor);
        }

        self.panel.cleanup(&egui_textures_delta);

        self.gpu.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        self.input.end_frame();
    }
}

struct App {
    platform: PlatformConfig,
    config: WalkthroughConfig,
    state: Option<EngineState>,
}

impl App {
    fn new(config: WalkthroughConfig) -> Self {
        Self {
            platform: PlatformConfig::default(),
            config,
            state: None,
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }
        let window = match fw_platform::create_window(event_loop, &self.platform) {
            Ok(window) => window,
            Err(err) => {
                log::error!("Failed to create window: {err}");
                event_loop.exit();
                return;
            }
        };
        log::info!(
            "Window created: {}x{}",
            self.platform.width,
            self.platform.height
        );
        match EngineState::new(window, self.config) {
            Ok(state) => self.state = Some(state),
            Err(err) => {
                log::error!("Graphics initialization failed: {err}");
                event_loop.exit();
            }
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(state) = &self.state {
            state.window.request_redraw();
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: DeviceId,
        event: DeviceEvent,
    ) {
        let Some(state) = self.state.as_mut() else {
            return;
        };
        if let DeviceEvent::MouseMotion { delta: (dx, dy) } = event {
            let sensitivity = state.config.camera.mouse_sensitivity;
            state.frame.look(dx, dy, sensitivity);
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let state = match self.state.as_mut() {
            Some(s) => s,
            None => return,
        };

        let egui_consumed = state.panel.handle_window_event(&state.window, &event);

        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested, exiting.");
                event_loop.exit();
            }

            WindowEvent::Resized(physical_size) => {
                let w = physical_size.width;
                let h = physical_size.height;
                if w > 0 && h > 0 {
                    state.gpu.resize(w, h);
                    state.renderer.resize(&state.gpu.device, w, h);
                    state.camera.set_viewport(w, h);
                    log::info!("Resized to {}x{}", w, h);
                }
            }

            WindowEvent::Focused(false) => {
                if state.frame.is_engaged() {
                    state.set_capture(false);
                }
            }

            WindowEvent::MouseInput {
                state: ElementState::Pressed,
                button: MouseButton::Left,
                ..
            } if !egui_consumed && !state.frame.is_engaged() => {
                state.set_capture(true);
            }

            WindowEvent::KeyboardInput { event, .. } if !egui_consumed => {
                if let PhysicalKey::Code(key_code) = event.physical_key {
                    if let Some(key) = map_key(key_code) {
                        match event.state {
                            ElementState::Pressed => {
                                state.input.key_down(key);
                                if key == Key::Escape && state.frame.is_engaged() {
                                    state.set_capture(false);
                                }
                            }
                            ElementState::Released => state.input.key_up(key),
                        }
                    }
                }
            }

            WindowEvent::RedrawRequested => state.redraw(),

            _ => {}
        }
    }
}

/// Readouts for the settings panel from the live simulation and the last
/// rendered frame.
fn panel_stats(frame: &FrameLoop, render: &RenderStats) -> PanelStats {
    let mut stats = PanelStats {
        engaged: frame.is_engaged(),
        draw_calls: render.draw_calls,
        particles_drawn: render.particles_drawn,
        scene_triangles: render.scene_triangles,
        skipped_frames: frame.skipped_frames(),
        ..PanelStats::default()
    };
    if let Some(viewer) = frame.viewer() {
        stats.position = viewer.body.position.to_array();
        stats.velocity = viewer.body.velocity.to_array();
        stats.grounded = viewer.body.grounded;
    }
    if let Some(field) = frame.particles() {
        stats.particle_count = field.len();
        stats.particle_respawns = field.respawn_count();
    }
    stats
}

fn map_key(key_code: KeyCode) -> Option<Key> {
    match key_code {
        KeyCode::ArrowLeft => Some(Key::Left),
        KeyCode::ArrowRight => Some(Key::Right),
        KeyCode::ArrowUp => Some(Key::Up),
        KeyCode::ArrowDown => Some(Key::Down),
        KeyCode::KeyW => Some(Key::W),
        KeyCode::KeyA => Some(Key::A),
        KeyCode::KeyS => Some(Key::S),
        KeyCode::KeyD => Some(Key::D),
        KeyCode::Space => Some(Key::Space),
        KeyCode::Escape => Some(Key::Escape),
        KeyCode::KeyP => Some(Key::P),
        KeyCode::F3 => Some(Key::F3),
        _ => None,
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Fogwalk starting...");

    let config = load_config_or_default(Path::new(CONFIG_PATH));

    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(err) => {
            log::error!("Failed to create event loop: {err}");
            std::process::exit(1);
        }
    };
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(config);
    if let Err(err) = event_loop.run_app(&mut app) {
        log::error!("Event loop error: {err}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arrows_and_wasd_map_to_the_same_directions() {
        let mut input = InputState::new();
        input.key_down(map_key(KeyCode::ArrowUp).expect("mapped"));
        input.key_down(map_key(KeyCode::KeyD).expect("mapped"));
        assert!(input.forward);
        assert!(input.right);
    }

    #[test]
    fn panel_stats_carry_render_counters() {
        let mut frame = FrameLoop::new(0.25);
        frame.attach_viewer(Viewer::new(
            MotionController::new(fw_core::MotionConfig::default()),
            KinematicBody::at_rest(0.0, 20.0, 0.53),
            ViewAngles::default(),
        ));
        let render = RenderStats {
            draw_calls: 4,
            particles_drawn: 500,
            scene_triangles: 1_730,
        };
        let stats = panel_stats(&frame, &render);
        assert_eq!(stats.draw_calls, 4);
        assert_eq!(stats.particles_drawn, 500);
        assert_eq!(stats.scene_triangles, 1_730);
        assert_eq!(stats.position, [0.0, 0.53, 20.0]);
        assert_eq!(stats.particle_count, 0);
    }

    #[test]
    fn unbound_keys_are_ignored() {
        assert_eq!(map_key(KeyCode::KeyQ), None);
        assert_eq!(map_key(KeyCode::Space), Some(Key::Space));
        assert_eq!(map_key(KeyCode::KeyP), Some(Key::P));
    }
}
