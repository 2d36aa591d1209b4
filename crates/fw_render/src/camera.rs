use fw_core::{AtmosphereConfig, CameraConfig, ViewAngles};
use glam::{Mat4, Vec3};

/// Per-frame scene constants shared by the scene and particle shaders.
///
/// Every member is a full `vec4` so the layout matches WGSL uniform
/// alignment without manual padding.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SceneUniform {
    pub view_proj: [[f32; 4]; 4],
    pub camera_position: [f32; 4],
    /// xyz forward; used for view-space fog depth.
    pub camera_forward: [f32; 4],
    pub camera_right: [f32; 4],
    pub camera_up: [f32; 4],
    /// rgb linear fog color, a fog alpha.
    pub fog_color: [f32; 4],
    /// near, far, density, unused.
    pub fog_params: [f32; 4],
    /// xyz unit direction towards the light, w intensity.
    pub light_direction: [f32; 4],
    /// ambient intensity, environment intensity, unused, unused.
    pub light_params: [f32; 4],
}

pub struct FirstPersonCamera {
    pub position: Vec3,
    pub view: ViewAngles,
    pub fov_y: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl FirstPersonCamera {
    pub fn new(config: &CameraConfig, viewport_width: u32, viewport_height: u32) -> Self {
        let mut camera = Self {
            position: Vec3::ZERO,
            view: ViewAngles::default(),
            fov_y: config.fov_y_deg.to_radians(),
            aspect: 1.0,
            near: config.near,
            far: config.far,
        };
        camera.set_viewport(viewport_width, viewport_height);
        camera
    }

    pub fn set_viewport(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.aspect = width as f32 / height as f32;
    }

    pub fn follow(&mut self, position: Vec3, view: ViewAngles) {
        self.position = position;
        self.view = view;
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_to_rh(self.position, self.view.look_direction(), Vec3::Y)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect, self.near, self.far)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    pub fn build_uniform(&self, atmosphere: &AtmosphereConfig) -> SceneUniform {
        let forward = self.view.look_direction();
        // Pitch is clamped short of the poles, so this cross never degenerates.
        let right = forward.cross(Vec3::Y).normalize();
        let up = right.cross(forward);
        let light = Vec3::from_array(atmosphere.directional_from).normalize_or_zero();
        let fog = srgb_to_linear(atmosphere.fog_color);

        SceneUniform {
            view_proj: self.view_projection().to_cols_array_2d(),
            camera_position: self.position.extend(1.0).to_array(),
            camera_forward: forward.extend(0.0).to_array(),
            camera_right: right.extend(0.0).to_array(),
            camera_up: up.extend(0.0).to_array(),
            fog_color: [fog[0], fog[1], fog[2], atmosphere.fog_alpha],
            fog_params: [
                atmosphere.fog_near,
                atmosphere.fog_far,
                atmosphere.fog_density,
                0.0,
            ],
            light_direction: light.extend(atmosphere.directional_intensity).to_array(),
            light_params: [
                atmosphere.ambient_intensity,
                atmosphere.environment_intensity,
                0.0,
                0.0,
            ],
        }
    }
}

/// Converts display (sRGB) color to the linear space shaders write in.
pub fn srgb_to_linear(color: [f32; 3]) -> [f32; 3] {
    color.map(|c| {
        if c <= 0.04045 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> FirstPersonCamera {
        let mut camera = FirstPersonCamera::new(&CameraConfig::default(), 1280, 720);
        camera.follow(Vec3::new(0.0, 0.53, 20.0), ViewAngles::default());
        camera
    }

    #[test]
    fn point_ahead_projects_to_screen_center() {
        let camera = camera();
        let clip = camera.view_projection() * Vec3::new(0.0, 0.53, 10.0).extend(1.0);
        let ndc = clip.truncate() / clip.w;
        assert!(ndc.x.abs() < 1e-4);
        assert!(ndc.y.abs() < 1e-4);
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }

    #[test]
    fn point_behind_is_clipped() {
        let camera = camera();
        let clip = camera.view_projection() * Vec3::new(0.0, 0.53, 30.0).extend(1.0);
        assert!(clip.w < 0.0);
    }

    #[test]
    fn viewport_sets_aspect_and_ignores_zero() {
        let mut camera = camera();
        assert!((camera.aspect - 1280.0 / 720.0).abs() < 1e-6);
        camera.set_viewport(0, 400);
        assert!((camera.aspect - 1280.0 / 720.0).abs() < 1e-6);
        camera.set_viewport(800, 800);
        assert_eq!(camera.aspect, 1.0);
    }

    #[test]
    fn uniform_carries_atmosphere() {
        let atmosphere = AtmosphereConfig::default();
        let uniform = camera().build_uniform(&atmosphere);
        assert_eq!(uniform.fog_color, [1.0, 1.0, 1.0, 1.0]);
        assert_eq!(uniform.fog_params[0], -33.9);
        assert_eq!(uniform.fog_params[1], 82.0);
        assert_eq!(uniform.camera_forward, [0.0, 0.0, -1.0, 0.0]);
        assert_eq!(uniform.light_direction[3], 0.0);
        let light = Vec3::new(
            uniform.light_direction[0],
            uniform.light_direction[1],
            uniform.light_direction[2],
        );
        assert!((light.length() - 1.0).abs() < 1e-5);
        // Billboard basis is orthonormal.
        let right = Vec3::from_slice(&uniform.camera_right[..3]);
        let up = Vec3::from_slice(&uniform.camera_up[..3]);
        assert!(right.dot(up).abs() < 1e-5);
        assert!((up.y - 1.0).abs() < 1e-5);
    }

    #[test]
    fn srgb_conversion_endpoints() {
        assert_eq!(srgb_to_linear([0.0, 1.0, 0.0]), [0.0, 1.0, 0.0]);
        let mid = srgb_to_linear([0.5; 3])[0];
        assert!((mid - 0.214).abs() < 1e-3);
    }
}
