pub mod config;
pub mod frame;
pub mod input;
pub mod motion;
pub mod particles;
pub mod time;
pub mod view;

#[cfg(test)]
mod replay;

pub use config::{
    load_config_from_path, load_config_or_default, AtmosphereConfig, CameraConfig, ConfigError,
    ConfigWatcher, MotionConfig, ParticleConfig, PostConfig, SkylineConfig, WalkthroughConfig,
};
pub use frame::{FrameLoop, FrameReport, Viewer};
pub use input::{InputState, Key};
pub use motion::{KinematicBody, MotionController};
pub use particles::ParticleField;
pub use time::{sanitize_dt, FrameClock, FrameDelta};
pub use view::ViewAngles;
