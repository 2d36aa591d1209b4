pub mod camera;
pub mod gpu_context;
pub mod renderer;
mod shaders;
pub mod skyline;
pub mod vertex;

pub use camera::{FirstPersonCamera, SceneUniform};
pub use gpu_context::{GpuContext, GpuInitError};
pub use renderer::{PostUniform, RenderStats, WalkthroughRenderer};
pub use skyline::{build_scene_mesh, SceneMesh};
pub use vertex::{ParticleAttributes, SceneVertex};
