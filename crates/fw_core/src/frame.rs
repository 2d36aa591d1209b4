//! Per-refresh simulation step.
//!
//! The loop owns the viewer and the particle field once they are attached and
//! advances them in a fixed order: controller first, particles second. Either
//! part may be absent while assets are still being set up; its share of the
//! step is then skipped.

use glam::Vec3;

use crate::config::{ConfigError, WalkthroughConfig};
use crate::input::InputState;
use crate::motion::{KinematicBody, MotionController};
use crate::particles::ParticleField;
use crate::time::{sanitize_dt, FrameDelta};
use crate::view::ViewAngles;

/// The first-person viewpoint: its controller, body and orientation.
#[derive(Debug, Clone)]
pub struct Viewer {
    pub controller: MotionController,
    pub body: KinematicBody,
    pub view: ViewAngles,
}

impl Viewer {
    pub fn new(controller: MotionController, body: KinematicBody, view: ViewAngles) -> Self {
        Self {
            controller,
            body,
            view,
        }
    }
}

/// What a single `FrameLoop::step` actually did.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameReport {
    /// dt handed to the simulation after clamping. Zero when skipped.
    pub dt: f32,
    pub skipped: bool,
    pub clamped: bool,
    pub viewer_advanced: bool,
    pub particles_ticked: bool,
}

pub struct FrameLoop {
    viewer: Option<Viewer>,
    particles: Option<ParticleField>,
    engaged: bool,
    max_frame_dt: f32,
    skipped_frames: u64,
}

impl FrameLoop {
    pub fn new(max_frame_dt: f32) -> Self {
        Self {
            viewer: None,
            particles: None,
            engaged: false,
            max_frame_dt,
            skipped_frames: 0,
        }
    }

    pub fn attach_viewer(&mut self, viewer: Viewer) {
        log::info!(
            "Viewer attached at ({:.2}, {:.2}, {:.2})",
            viewer.body.position.x,
            viewer.body.position.y,
            viewer.body.position.z
        );
        self.viewer = Some(viewer);
    }

    pub fn attach_particles(&mut self, particles: ParticleField) {
        log::info!("Particle field attached ({} particles)", particles.len());
        self.particles = Some(particles);
    }

    pub fn viewer(&self) -> Option<&Viewer> {
        self.viewer.as_ref()
    }

    pub fn viewer_mut(&mut self) -> Option<&mut Viewer> {
        self.viewer.as_mut()
    }

    pub fn particles(&self) -> Option<&ParticleField> {
        self.particles.as_ref()
    }

    pub fn particles_mut(&mut self) -> Option<&mut ParticleField> {
        self.particles.as_mut()
    }

    pub fn is_engaged(&self) -> bool {
        self.engaged
    }

    /// Follows the platform's pointer-capture flag. Releasing capture drops
    /// every held key, since key-up events for them may never arrive.
    pub fn set_engaged(&mut self, engaged: bool, input: &mut InputState) {
        if engaged == self.engaged {
            return;
        }
        self.engaged = engaged;
        if engaged {
            log::info!("Controls engaged");
        } else {
            input.release_all();
            log::info!("Controls released");
        }
    }

    pub fn max_frame_dt(&self) -> f32 {
        self.max_frame_dt
    }

    pub fn skipped_frames(&self) -> u64 {
        self.skipped_frames
    }

    /// Runs one simulation step from a raw wall-clock delta.
    pub fn step(&mut self, raw_dt: f32, input: &mut InputState) -> FrameReport {
        let dt = match sanitize_dt(raw_dt, self.max_frame_dt) {
            FrameDelta::Step(dt) => dt,
            FrameDelta::Skip => {
                self.skipped_frames += 1;
                log::warn!("Skipping frame with unusable dt {raw_dt}");
                return FrameReport {
                    skipped: true,
                    ..FrameReport::default()
                };
            }
        };

        let mut report = FrameReport {
            dt,
            clamped: dt < raw_dt,
            ..FrameReport::default()
        };

        if let Some(viewer) = self.viewer.as_mut() {
            viewer.controller.advance(
                &mut viewer.body,
                input,
                &viewer.view,
                dt,
                self.engaged,
            );
            report.viewer_advanced = self.engaged;
        }

        if let Some(particles) = self.particles.as_mut() {
            particles.tick(dt);
            report.particles_ticked = true;
        }

        report
    }

    /// Applies a mouse delta to the view while engaged.
    pub fn look(&mut self, dx: f64, dy: f64, sensitivity: f32) {
        if !self.engaged {
            return;
        }
        if let Some(viewer) = self.viewer.as_mut() {
            viewer.view.add_mouse_delta(dx, dy, sensitivity);
        }
    }

    pub fn eye_position(&self) -> Option<Vec3> {
        self.viewer.as_ref().map(|viewer| viewer.body.position)
    }

    pub fn particle_buffer(&self) -> Option<&[f32]> {
        self.particles
            .as_ref()
            .map(ParticleField::as_renderable_buffer)
    }

    /// Pushes reloaded tunables into every attached component.
    ///
    /// All checks run before anything is committed, so a rejected config
    /// leaves the viewer, the particles and `max_frame_dt` exactly as they were.
    pub fn apply_config(&mut self, config: &WalkthroughConfig) -> Result<(), ConfigError> {
        let rest = config.motion.resting_height;
        config.validate()?;
        ParticleField::check_config(&config.particles, rest)?;

        if let Some(viewer) = self.viewer.as_mut() {
            viewer.controller.apply_config(config.motion)?;
            viewer.body.resting_height = rest;
        }
        if let Some(particles) = self.particles.as_mut() {
            particles.apply_config(config.particles, rest)?;
        }
        self.max_frame_dt = config.motion.max_frame_dt;
        Ok(())
    }
}
