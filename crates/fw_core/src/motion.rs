use glam::{Vec2, Vec3};

use crate::config::{self, ConfigError, MotionConfig};
use crate::input::InputState;
use crate::view::ViewAngles;

/// The viewpoint's physical state. Position is the eye position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KinematicBody {
    pub position: Vec3,
    pub velocity: Vec3,
    pub resting_height: f32,
    pub grounded: bool,
}

impl KinematicBody {
    /// Places the body at rest on the ground at the given horizontal position.
    ///
    /// `grounded` starts false and becomes true on the first engaged step, so
    /// a jump cannot fire before the body has settled.
    pub fn at_rest(x: f32, z: f32, resting_height: f32) -> Self {
        Self {
            position: Vec3::new(x, resting_height, z),
            velocity: Vec3::ZERO,
            resting_height,
            grounded: false,
        }
    }
}

/// First-person kinematic controller: gravity, keyboard acceleration,
/// per-step friction, jump and a flat ground clamp.
#[derive(Debug, Clone)]
pub struct MotionController {
    config: MotionConfig,
}

impl MotionController {
    pub fn new(config: MotionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MotionConfig {
        &self.config
    }

    /// Advances the body by one frame.
    ///
    /// Does nothing while `engaged` is false: no gravity accrues, so the body
    /// cannot sink through the floor while pointer capture is released. dt is
    /// taken as given; the frame loop sanitizes it.
    pub fn advance(
        &self,
        body: &mut KinematicBody,
        input: &mut InputState,
        view: &ViewAngles,
        dt: f32,
        engaged: bool,
    ) {
        if !engaged {
            return;
        }
        let cfg = &self.config;

        body.velocity.y -= cfg.effective_gravity() * dt;

        let (axis_x, axis_z) = input.axis();
        // normalize_or_zero keeps a zero-length intent at zero instead of NaN.
        let direction = Vec2::new(axis_x, axis_z).normalize_or_zero();

        if input.any_forward() {
            body.velocity.z -= direction.y * cfg.acceleration * dt;
        }
        if input.any_strafe() {
            body.velocity.x -= direction.x * cfg.acceleration * dt;
        }

        // Friction is applied once per call regardless of dt.
        body.velocity.x *= cfg.friction_per_step;
        body.velocity.z *= cfg.friction_per_step;

        if input.take_jump() && body.grounded {
            body.velocity.y += cfg.jump_impulse;
            body.grounded = false;
        }

        body.position += view.ground_right() * (-body.velocity.x * dt);
        body.position += view.ground_forward() * (-body.velocity.z * dt);
        body.position.y += body.velocity.y * dt;

        if body.position.y < body.resting_height {
            body.position.y = body.resting_height;
            body.velocity.y = 0.0;
            body.grounded = true;
        }
    }

    /// Replaces every tunable at once, as done on config hot reload.
    pub fn apply_config(&mut self, config: MotionConfig) -> Result<(), ConfigError> {
        config.validate()?;
        self.config = config;
        Ok(())
    }

    pub fn set_gravity_multiplier(&mut self, value: f32) -> Result<(), ConfigError> {
        config::non_negative("motion.gravity_multiplier", value)?;
        self.config.gravity_multiplier = value;
        Ok(())
    }

    pub fn set_acceleration(&mut self, value: f32) -> Result<(), ConfigError> {
        config::non_negative("motion.acceleration", value)?;
        self.config.acceleration = value;
        Ok(())
    }

    pub fn set_friction_per_step(&mut self, value: f32) -> Result<(), ConfigError> {
        config::unit_interval("motion.friction_per_step", value)?;
        self.config.friction_per_step = value;
        Ok(())
    }

    pub fn set_jump_impulse(&mut self, value: f32) -> Result<(), ConfigError> {
        config::non_negative("motion.jump_impulse", value)?;
        self.config.jump_impulse = value;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Key;

    const DT: f32 = 1.0 / 60.0;
    const REST: f32 = 0.53;

    fn controller() -> MotionController {
        MotionController::new(MotionConfig::default())
    }

    fn grounded_body() -> KinematicBody {
        KinematicBody {
            grounded: true,
            ..KinematicBody::at_rest(0.0, 20.0, REST)
        }
    }

    #[test]
    fn resting_body_stays_put_without_input() {
        let controller = controller();
        let mut body = grounded_body();
        let start = body.position;
        let mut input = InputState::new();

        for _ in 0..600 {
            controller.advance(&mut body, &mut input, &ViewAngles::default(), DT, true);
        }

        assert!((body.position - start).length() < 1e-5);
        assert_eq!(body.velocity.y, 0.0);
        assert!(body.grounded);
    }

    #[test]
    fn first_engaged_step_grounds_the_body() {
        let controller = controller();
        let mut body = KinematicBody::at_rest(0.0, 0.0, REST);
        assert!(!body.grounded);
        controller.advance(
            &mut body,
            &mut InputState::new(),
            &ViewAngles::default(),
            DT,
            true,
        );
        assert!(body.grounded);
        assert_eq!(body.position.y, REST);
    }

    #[test]
    fn disengaged_advance_is_a_no_op() {
        let controller = controller();
        let mut body = KinematicBody {
            position: Vec3::new(1.0, 3.0, -2.0),
            velocity: Vec3::new(4.0, 5.0, -6.0),
            resting_height: REST,
            grounded: false,
        };
        let before = body;
        let mut input = InputState::new();
        input.key_down(Key::W);
        input.key_down(Key::D);

        for _ in 0..100 {
            controller.advance(&mut body, &mut input, &ViewAngles::new(0.7, 0.0), DT, false);
        }

        assert_eq!(body, before);
    }

    #[test]
    fn opposing_keys_produce_no_horizontal_drift() {
        let controller = controller();
        let mut body = grounded_body();
        let start = body.position;
        let mut input = InputState::new();
        input.key_down(Key::W);
        input.key_down(Key::S);
        input.key_down(Key::A);
        input.key_down(Key::D);

        for _ in 0..120 {
            controller.advance(&mut body, &mut input, &ViewAngles::new(1.1, 0.0), DT, true);
        }

        assert_eq!(body.velocity.x, 0.0);
        assert_eq!(body.velocity.z, 0.0);
        assert!((body.position - start).length() < 1e-5);
    }

    #[test]
    fn jump_applies_only_when_grounded() {
        let controller = controller();
        let mut body = grounded_body();
        let mut input = InputState::new();
        input.request_jump();

        controller.advance(&mut body, &mut input, &ViewAngles::default(), DT, true);

        assert!(!input.jump_pending(), "jump request is consumed");
        assert!(!body.grounded);
        let expected_vy = -MotionConfig::default().effective_gravity() * DT + 20.0;
        assert!((body.velocity.y - expected_vy).abs() < 1e-4);
        assert!(body.position.y > REST);
    }

    #[test]
    fn airborne_jump_request_is_dropped() {
        let controller = controller();
        let mut body = KinematicBody {
            position: Vec3::new(0.0, 5.0, 0.0),
            velocity: Vec3::ZERO,
            resting_height: REST,
            grounded: false,
        };
        let mut input = InputState::new();
        input.request_jump();

        controller.advance(&mut body, &mut input, &ViewAngles::default(), DT, true);

        assert!(!input.jump_pending(), "request consumed even when not honored");
        assert!(!body.grounded);
        let expected_vy = -MotionConfig::default().effective_gravity() * DT;
        assert!((body.velocity.y - expected_vy).abs() < 1e-5);
    }

    #[test]
    fn jump_lands_back_at_resting_height() {
        let controller = controller();
        let mut body = grounded_body();
        let mut input = InputState::new();
        input.request_jump();

        let mut peak = body.position.y;
        let mut landed_after = None;
        for frame in 0..240 {
            controller.advance(&mut body, &mut input, &ViewAngles::default(), DT, true);
            peak = peak.max(body.position.y);
            if frame > 0 && body.grounded {
                landed_after = Some(frame);
                break;
            }
        }

        assert!(peak > REST + 1.0, "jump should rise noticeably, peak {peak}");
        assert!(landed_after.is_some(), "body should land within four seconds");
        assert_eq!(body.position.y, REST);
        assert_eq!(body.velocity.y, 0.0);
    }

    #[test]
    fn forward_velocity_converges_to_friction_fixed_point() {
        let controller = controller();
        let mut body = grounded_body();
        let mut input = InputState::new();
        input.key_down(Key::W);

        for _ in 0..60 {
            controller.advance(&mut body, &mut input, &ViewAngles::default(), DT, true);
        }

        let cfg = MotionConfig::default();
        let f = cfg.friction_per_step;
        // Fixed point of v' = (v - a*dt) * f.
        let steady = cfg.acceleration * DT * f / (1.0 - f);
        assert!(body.velocity.z < 0.0);
        assert!(
            (body.velocity.z.abs() - steady).abs() < steady * 0.01,
            "vz {} should be within 1% of {}",
            body.velocity.z,
            steady
        );
        // Bounded above by the unfrictioned estimate a*dt/(1-f).
        assert!(body.velocity.z.abs() < cfg.acceleration * DT / (1.0 - f));
    }

    #[test]
    fn forward_moves_along_view_direction() {
        let controller = controller();
        let mut input = InputState::new();
        input.key_down(Key::W);

        let mut body = grounded_body();
        let start = body.position;
        for _ in 0..30 {
            controller.advance(&mut body, &mut input, &ViewAngles::default(), DT, true);
        }
        let moved = body.position - start;
        assert!(moved.z < -0.1, "yaw 0 walks toward -Z, moved {moved:?}");
        assert!(moved.x.abs() < 1e-4);

        let view = ViewAngles::new(std::f32::consts::FRAC_PI_2, 0.0);
        let mut body = grounded_body();
        let start = body.position;
        for _ in 0..30 {
            controller.advance(&mut body, &mut input, &view, DT, true);
        }
        let moved = body.position - start;
        assert!(moved.x < -0.1, "quarter turn left walks toward -X, moved {moved:?}");
        assert!(moved.z.abs() < 1e-4);
    }

    #[test]
    fn strafe_right_moves_along_right_vector() {
        let controller = controller();
        let mut input = InputState::new();
        input.key_down(Key::D);
        let mut body = grounded_body();
        let start = body.position;

        for _ in 0..30 {
            controller.advance(&mut body, &mut input, &ViewAngles::default(), DT, true);
        }

        assert!(body.position.x - start.x > 0.1);
        assert!((body.position.z - start.z).abs() < 1e-4);
    }

    #[test]
    fn diagonal_input_is_not_faster_than_straight() {
        let controller = controller();
        let mut straight = InputState::new();
        straight.key_down(Key::W);
        let mut diagonal = InputState::new();
        diagonal.key_down(Key::W);
        diagonal.key_down(Key::D);

        let mut a = grounded_body();
        let mut b = grounded_body();
        for _ in 0..60 {
            controller.advance(&mut a, &mut straight, &ViewAngles::default(), DT, true);
            controller.advance(&mut b, &mut diagonal, &ViewAngles::default(), DT, true);
        }

        let speed_a = Vec2::new(a.velocity.x, a.velocity.z).length();
        let speed_b = Vec2::new(b.velocity.x, b.velocity.z).length();
        assert!((speed_a - speed_b).abs() < 1e-3);
    }

    #[test]
    fn friction_decays_velocity_once_per_step() {
        let controller = controller();
        let mut body = KinematicBody {
            velocity: Vec3::new(10.0, 0.0, -10.0),
            ..grounded_body()
        };
        // A zero dt isolates the per-call decay.
        controller.advance(&mut body, &mut InputState::new(), &ViewAngles::default(), 0.0, true);
        assert!((body.velocity.x - 8.5).abs() < 1e-5);
        assert!((body.velocity.z + 8.5).abs() < 1e-5);
    }

    #[test]
    fn setters_reject_invalid_values_and_keep_previous() {
        let mut controller = controller();
        assert!(controller.set_friction_per_step(1.2).is_err());
        assert!(controller.set_acceleration(f32::NAN).is_err());
        assert!(controller.set_jump_impulse(-1.0).is_err());
        assert_eq!(*controller.config(), MotionConfig::default());

        controller.set_acceleration(200.0).expect("valid acceleration");
        controller.set_gravity_multiplier(5.0).expect("valid multiplier");
        assert_eq!(controller.config().acceleration, 200.0);
        assert!((controller.config().effective_gravity() - 49.0).abs() < 1e-4);
    }
}
