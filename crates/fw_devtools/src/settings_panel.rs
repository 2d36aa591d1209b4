//! Live settings panel rendered via egui on top of the post-processed frame.
//!
//! Rendering follows the same split as any egui-wgpu integration:
//!
//!   1. `prepare()` -- run the UI, collect edits, tessellate
//!   2. `upload()`  -- push textures and buffers (borrows the encoder)
//!   3. `paint()`   -- draw into a `forget_lifetime()` render pass
//!   4. `cleanup()` -- free textures egui dropped
//!
//! The panel never mutates simulation state itself. It edits a copy of the
//! tunables and hands the copy back; `PanelTunables::apply` pushes the
//! changes through the validating setters.

use fw_core::{AtmosphereConfig, ConfigError, FrameClock, FrameLoop, MotionConfig, PostConfig};
use winit::window::Window;

#[derive(Debug, Clone, Copy, Default)]
pub struct PanelStats {
    pub position: [f32; 3],
    pub velocity: [f32; 3],
    pub grounded: bool,
    pub engaged: bool,
    pub particle_count: usize,
    pub particle_respawns: u64,
    pub draw_calls: u32,
    pub particles_drawn: u32,
    pub scene_triangles: u32,
    pub skipped_frames: u64,
}

/// Everything the panel can edit, captured from live state each frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanelTunables {
    pub motion: MotionConfig,
    pub particle_speed: f32,
    pub particle_max_height: f32,
    pub churn_probability: f32,
    pub atmosphere: AtmosphereConfig,
    pub post: PostConfig,
}

impl PanelTunables {
    pub fn capture(frame: &FrameLoop, atmosphere: &AtmosphereConfig, post: &PostConfig) -> Self {
        let motion = frame
            .viewer()
            .map(|viewer| *viewer.controller.config())
            .unwrap_or_default();
        let particles = frame.particles().map(|field| *field.config()).unwrap_or_default();
        Self {
            motion,
            particle_speed: particles.speed,
            particle_max_height: particles.max_height,
            churn_probability: particles.churn_probability,
            atmosphere: *atmosphere,
            post: *post,
        }
    }

    /// Pushes every field that differs from `previous` into live state.
    ///
    /// Each rejected value leaves its target untouched and is returned; the
    /// remaining edits still apply.
    pub fn apply(
        &self,
        previous: &PanelTunables,
        frame: &mut FrameLoop,
        atmosphere: &mut AtmosphereConfig,
        post: &mut PostConfig,
    ) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let mut record = |result: Result<(), ConfigError>| {
            if let Err(err) = result {
                errors.push(err);
            }
        };

        if let Some(viewer) = frame.viewer_mut() {
            let (new, old) = (&self.motion, &previous.motion);
            let controller = &mut viewer.controller;
            if new.gravity_multiplier != old.gravity_multiplier {
                record(controller.set_gravity_multiplier(new.gravity_multiplier));
            }
            if new.acceleration != old.acceleration {
                record(controller.set_acceleration(new.acceleration));
            }
            if new.friction_per_step != old.friction_per_step {
                record(controller.set_friction_per_step(new.friction_per_step));
            }
            if new.jump_impulse != old.jump_impulse {
                record(controller.set_jump_impulse(new.jump_impulse));
            }
        }

        if let Some(field) = frame.particles_mut() {
            if self.particle_speed != previous.particle_speed {
                record(field.set_speed(self.particle_speed));
            }
            if self.particle_max_height != previous.particle_max_height {
                record(field.set_max_height(self.particle_max_height));
            }
            if self.churn_probability != previous.churn_probability {
                record(field.set_churn_probability(self.churn_probability));
            }
        }

        if self.atmosphere != previous.atmosphere {
            match self.atmosphere.validate() {
                Ok(()) => *atmosphere = self.atmosphere,
                Err(err) => record(Err(err)),
            }
        }

        if self.post != previous.post {
            match self.post.validate() {
                Ok(()) => *post = self.post,
                Err(err) => record(Err(err)),
            }
        }

        errors
    }
}

pub struct SettingsPanel {
    pub egui_ctx: egui::Context,
    pub egui_winit_state: egui_winit::State,
    pub egui_renderer: egui_wgpu::Renderer,
    pub visible: bool,
}

impl SettingsPanel {
    pub fn new(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        window: &Window,
    ) -> Self {
        let egui_ctx = egui::Context::default();
        let egui_winit_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui_ctx.viewport_id(),
            window,
            None,
            None,
            None,
        );
        let egui_renderer = egui_wgpu::Renderer::new(device, surface_format, None, 1, false);

        Self {
            egui_ctx,
            egui_winit_state,
            egui_renderer,
            visible: false,
        }
    }

    pub fn handle_window_event(
        &mut self,
        window: &Window,
        event: &winit::event::WindowEvent,
    ) -> bool {
        let response = self.egui_winit_state.on_window_event(window, event);
        response.consumed
    }

    pub fn toggle(&mut self) {
        self.visible = !self.visible;
        log::info!("Settings panel: {}", if self.visible { "shown" } else { "hidden" });
    }

    /// Runs the UI. Returns the edited tunables when anything changed.
    pub fn prepare(
        &mut self,
        window: &Window,
        clock: &FrameClock,
        stats: &PanelStats,
        tunables: PanelTunables,
    ) -> (
        Vec<egui::ClippedPrimitive>,
        egui::TexturesDelta,
        Option<PanelTunables>,
    ) {
        let mut edited = tunables;
        let visible = self.visible;
        let raw_input = self.egui_winit_state.take_egui_input(window);
        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            lock_indicator(ctx, stats.engaged);
            if visible {
                egui::Window::new("Settings")
                    .default_pos([10.0, 10.0])
                    .resizable(false)
                    .show(ctx, |ui| {
                        stats_section(ui, clock, stats);
                        ui.separator();
                        atmosphere_section(ui, &mut edited.atmosphere);
                        ui.separator();
                        motion_section(ui, &mut edited.motion);
                        ui.separator();
                        ui.heading("Particles");
                        ui.add(
                            egui::Slider::new(&mut edited.particle_speed, 0.0..=2.0).text("Speed"),
                        );
                        ui.add(
                            egui::Slider::new(&mut edited.particle_max_height, 1.5..=20.0)
                                .text("Max height"),
                        );
                        ui.add(
                            egui::Slider::new(&mut edited.churn_probability, 0.0..=0.05)
                                .text("Churn")
                                .logarithmic(true),
                        );
                        ui.separator();
                        post_section(ui, &mut edited.post);
                    });
            }
        });

        self.egui_winit_state
            .handle_platform_output(window, full_output.platform_output);

        let primitives = self
            .egui_ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);

        let changed = (edited != tunables).then_some(edited);
        (primitives, full_output.textures_delta, changed)
    }

    /// Upload textures and update buffers. Call before creating the egui render pass.
    pub fn upload(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        primitives: &[egui::ClippedPrimitive],
        textures_delta: &egui::TexturesDelta,
        screen_descriptor: &egui_wgpu::ScreenDescriptor,
    ) {
        for (id, image_delta) in &textures_delta.set {
            self.egui_renderer
                .update_texture(device, queue, *id, image_delta);
        }

        self.egui_renderer
            .update_buffers(device, queue, encoder, primitives, screen_descriptor);
    }

    pub fn paint(
        &self,
        render_pass: &mut wgpu::RenderPass<'static>,
        primitives: &[egui::ClippedPrimitive],
        screen_descriptor: &egui_wgpu::ScreenDescriptor,
    ) {
        self.egui_renderer
            .render(render_pass, primitives, screen_descriptor);
    }

    pub fn cleanup(&mut self, textures_delta: &egui::TexturesDelta) {
        for id in &textures_delta.free {
            self.egui_renderer.free_texture(id);
        }
    }
}

fn lock_indicator(ctx: &egui::Context, engaged: bool) {
    egui::Area::new(egui::Id::new("lock_indicator"))
        .anchor(egui::Align2::RIGHT_TOP, [-12.0, 12.0])
        .interactable(false)
        .show(ctx, |ui| {
            let text = if engaged {
                "\u{1f512} Esc to release"
            } else {
                "\u{1f513} Click to look around, P for settings"
            };
            ui.label(egui::RichText::new(text).color(egui::Color32::DARK_GRAY));
        });
}

fn stats_section(ui: &mut egui::Ui, clock: &FrameClock, stats: &PanelStats) {
    ui.label(format!("FPS: {:.1}", clock.smoothed_fps));
    ui.label(format!("Frame time: {:.2} ms", clock.smoothed_frame_time_ms));
    let [px, py, pz] = stats.position;
    let [vx, vy, vz] = stats.velocity;
    ui.label(format!("Position: ({px:.2}, {py:.2}, {pz:.2})"));
    ui.label(format!("Velocity: ({vx:.2}, {vy:.2}, {vz:.2})"));
    ui.label(format!(
        "Grounded: {}   Engaged: {}",
        stats.grounded, stats.engaged
    ));
    ui.label(format!(
        "Particles: {} ({} respawns)",
        stats.particle_count, stats.particle_respawns
    ));
    ui.label(format!(
        "Draw calls: {}   Triangles: {}   Billboards: {}",
        stats.draw_calls, stats.scene_triangles, stats.particles_drawn
    ));
    if stats.skipped_frames > 0 {
        ui.label(format!("Skipped frames: {}", stats.skipped_frames));
    }
}

fn atmosphere_section(ui: &mut egui::Ui, atmosphere: &mut AtmosphereConfig) {
    ui.heading("Fog & light");
    ui.horizontal(|ui| {
        ui.label("Fog color");
        ui.color_edit_button_rgb(&mut atmosphere.fog_color);
    });
    ui.add(egui::Slider::new(&mut atmosphere.fog_near, -100.0..=100.0).text("Fog near"));
    ui.add(egui::Slider::new(&mut atmosphere.fog_far, 0.0..=300.0).text("Fog far"));
    ui.add(egui::Slider::new(&mut atmosphere.fog_density, 0.0..=1.0).text("Fog density"));
    ui.add(egui::Slider::new(&mut atmosphere.fog_alpha, 0.0..=1.0).text("Fog alpha"));
    ui.add(egui::Slider::new(&mut atmosphere.ambient_intensity, 0.0..=5.0).text("Ambient"));
    ui.add(
        egui::Slider::new(&mut atmosphere.directional_intensity, 0.0..=5.0).text("Directional"),
    );
    ui.add(
        egui::Slider::new(&mut atmosphere.environment_intensity, 0.0..=3.0).text("Environment"),
    );
}

fn motion_section(ui: &mut egui::Ui, motion: &mut MotionConfig) {
    ui.heading("Motion");
    ui.add(egui::Slider::new(&mut motion.gravity_multiplier, 0.0..=20.0).text("Gravity x"));
    ui.add(egui::Slider::new(&mut motion.acceleration, 0.0..=400.0).text("Acceleration"));
    ui.add(egui::Slider::new(&mut motion.friction_per_step, 0.0..=1.0).text("Friction"));
    ui.add(egui::Slider::new(&mut motion.jump_impulse, 0.0..=60.0).text("Jump"));
}

fn post_section(ui: &mut egui::Ui, post: &mut PostConfig) {
    ui.heading("Lens");
    ui.checkbox(&mut post.enabled, "Post-processing");
    ui.add_enabled_ui(post.enabled, |ui| {
        ui.add(egui::Slider::new(&mut post.distortion, -1.0..=2.0).text("Distortion"));
        ui.add(egui::Slider::new(&mut post.distortion_scale, 0.5..=1.5).text("Scale"));
        ui.add(egui::Slider::new(&mut post.vignette_strength, 0.0..=1.0).text("Vignette"));
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use fw_core::{
        KinematicBody, MotionController, ParticleConfig, ParticleField, ViewAngles, Viewer,
    };

    fn frame_loop() -> FrameLoop {
        let mut frame = FrameLoop::new(0.25);
        frame.attach_viewer(Viewer::new(
            MotionController::new(MotionConfig::default()),
            KinematicBody::at_rest(0.0, 20.0, 0.53),
            ViewAngles::default(),
        ));
        frame.attach_particles(
            ParticleField::spawn_seeded(ParticleConfig::default(), 0.53, 3).expect("spawn"),
        );
        frame
    }

    #[test]
    fn capture_reflects_live_state() {
        let frame = frame_loop();
        let tunables =
            PanelTunables::capture(&frame, &AtmosphereConfig::default(), &PostConfig::default());
        assert_eq!(tunables.motion, MotionConfig::default());
        assert_eq!(tunables.particle_speed, 0.2);
        assert_eq!(tunables.particle_max_height, 5.0);
    }

    #[test]
    fn apply_pushes_changed_values() {
        let mut frame = frame_loop();
        let mut atmosphere = AtmosphereConfig::default();
        let mut post = PostConfig::default();
        let before = PanelTunables::capture(&frame, &atmosphere, &post);

        let mut edited = before;
        edited.motion.acceleration = 250.0;
        edited.particle_speed = 1.0;
        edited.atmosphere.fog_far = 120.0;
        edited.post.enabled = false;

        let errors = edited.apply(&before, &mut frame, &mut atmosphere, &mut post);
        assert!(errors.is_empty());
        let viewer = frame.viewer().expect("viewer");
        assert_eq!(viewer.controller.config().acceleration, 250.0);
        assert_eq!(frame.particles().expect("particles").config().speed, 1.0);
        assert_eq!(atmosphere.fog_far, 120.0);
        assert!(!post.enabled);
    }

    #[test]
    fn rejected_values_keep_previous_state() {
        let mut frame = frame_loop();
        let mut atmosphere = AtmosphereConfig::default();
        let mut post = PostConfig::default();
        let before = PanelTunables::capture(&frame, &atmosphere, &post);

        let mut edited = before;
        // Ceiling below the eye band is invalid, as is fog_far <= fog_near.
        edited.particle_max_height = 0.5;
        edited.atmosphere.fog_far = -50.0;
        edited.motion.jump_impulse = 30.0;

        let errors = edited.apply(&before, &mut frame, &mut atmosphere, &mut post);
        assert_eq!(errors.len(), 2);
        assert_eq!(frame.particles().expect("particles").config().max_height, 5.0);
        assert_eq!(atmosphere, AtmosphereConfig::default());
        let viewer = frame.viewer().expect("viewer");
        assert_eq!(viewer.controller.config().jump_impulse, 30.0);
    }

    #[test]
    fn capture_without_components_uses_defaults() {
        let frame = FrameLoop::new(0.25);
        let tunables =
            PanelTunables::capture(&frame, &AtmosphereConfig::default(), &PostConfig::default());
        assert_eq!(tunables.particle_speed, ParticleConfig::default().speed);
    }
}
