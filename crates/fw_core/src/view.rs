use glam::Vec3;

/// Pitch stops just short of straight up/down so the view basis never degenerates.
const PITCH_LIMIT: f32 = std::f32::consts::FRAC_PI_2 - 0.01;

/// First-person view orientation driven by captured mouse motion.
///
/// Right-handed, Y up. At `yaw == 0` the view looks down -Z; positive yaw
/// turns left.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ViewAngles {
    pub yaw: f32,
    pub pitch: f32,
}

impl ViewAngles {
    pub fn new(yaw: f32, pitch: f32) -> Self {
        Self {
            yaw,
            pitch: pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT),
        }
    }

    /// Applies a raw mouse delta. Moving the mouse right turns right, moving it
    /// down looks down.
    pub fn add_mouse_delta(&mut self, dx: f64, dy: f64, sensitivity: f32) {
        if !dx.is_finite() || !dy.is_finite() {
            return;
        }
        self.yaw -= dx as f32 * sensitivity;
        self.pitch = (self.pitch - dy as f32 * sensitivity).clamp(-PITCH_LIMIT, PITCH_LIMIT);
        self.yaw = self.yaw.rem_euclid(std::f32::consts::TAU);
    }

    /// Unit forward vector on the ground plane.
    pub fn ground_forward(&self) -> Vec3 {
        Vec3::new(-self.yaw.sin(), 0.0, -self.yaw.cos())
    }

    /// Unit right vector on the ground plane.
    pub fn ground_right(&self) -> Vec3 {
        Vec3::new(self.yaw.cos(), 0.0, -self.yaw.sin())
    }

    /// Full look direction including pitch.
    pub fn look_direction(&self) -> Vec3 {
        let (sp, cp) = self.pitch.sin_cos();
        Vec3::new(-self.yaw.sin() * cp, sp, -self.yaw.cos() * cp)
    }
}
