//! Walkthrough tunables and their JSON loader.
//!
//! Every section deserializes with defaults, so a config file only needs the
//! fields it overrides. Validation runs after parsing and again whenever a
//! single value is changed at runtime through one of the setters on
//! `MotionController` or `ParticleField`.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config JSON {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    /// Base gravitational acceleration, before the game-feel multiplier.
    pub gravity: f32,
    pub gravity_multiplier: f32,
    /// Horizontal acceleration applied while a movement key is held.
    pub acceleration: f32,
    /// Multiplicative decay of horizontal velocity, applied once per step.
    pub friction_per_step: f32,
    pub jump_impulse: f32,
    /// Eye height the viewpoint rests at when grounded.
    pub resting_height: f32,
    /// Upper bound for a single frame's dt, in seconds.
    pub max_frame_dt: f32,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            gravity: 9.8,
            gravity_multiplier: 10.0,
            acceleration: 100.0,
            friction_per_step: 0.85,
            jump_impulse: 20.0,
            resting_height: 0.53,
            max_frame_dt: 0.25,
        }
    }
}

impl MotionConfig {
    pub fn effective_gravity(&self) -> f32 {
        self.gravity * self.gravity_multiplier
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        non_negative("motion.gravity", self.gravity)?;
        non_negative("motion.gravity_multiplier", self.gravity_multiplier)?;
        non_negative("motion.acceleration", self.acceleration)?;
        unit_interval("motion.friction_per_step", self.friction_per_step)?;
        non_negative("motion.jump_impulse", self.jump_impulse)?;
        non_negative("motion.resting_height", self.resting_height)?;
        positive("motion.max_frame_dt", self.max_frame_dt)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct ParticleConfig {
    pub count: usize,
    pub base_size: f32,
    pub speed: f32,
    pub max_height: f32,
    /// Half-width of the square particles spawn into and respawn into after
    /// crossing the ceiling.
    pub spawn_half_extent: f32,
    /// Half-width of the square particles are kept inside.
    pub bounds_half_extent: f32,
    /// Half-width used when a particle is pulled back from the horizontal edge.
    pub respawn_half_extent: f32,
    /// Height of the band just above the ground that ceiling respawns land in.
    pub ground_band: f32,
    pub churn_probability: f32,
    /// Upper bound for each color channel; particles are near-black.
    pub max_color: f32,
}

impl Default for ParticleConfig {
    fn default() -> Self {
        Self {
            count: 500,
            base_size: 0.05,
            speed: 0.2,
            max_height: 5.0,
            spawn_half_extent: 25.0,
            bounds_half_extent: 25.0,
            respawn_half_extent: 15.0,
            ground_band: 0.5,
            churn_probability: 0.001,
            max_color: 0.1,
        }
    }
}

impl ParticleConfig {
    /// Checks the field against the resting height it will be spawned around.
    ///
    /// Respawn targets must lie inside the containment bounds, otherwise a
    /// respawned particle would already violate the bounds it was reset for.
    pub fn validate(&self, resting_height: f32) -> Result<(), ConfigError> {
        positive("particles.base_size", self.base_size)?;
        non_negative("particles.speed", self.speed)?;
        positive("particles.max_height", self.max_height)?;
        non_negative("particles.spawn_half_extent", self.spawn_half_extent)?;
        non_negative("particles.bounds_half_extent", self.bounds_half_extent)?;
        non_negative("particles.respawn_half_extent", self.respawn_half_extent)?;
        non_negative("particles.ground_band", self.ground_band)?;
        unit_interval("particles.churn_probability", self.churn_probability)?;
        unit_interval("particles.max_color", self.max_color)?;

        if self.spawn_half_extent > self.bounds_half_extent {
            return Err(ConfigError::invalid(
                "particles.spawn_half_extent",
                format!(
                    "{} exceeds bounds_half_extent {}",
                    self.spawn_half_extent, self.bounds_half_extent
                ),
            ));
        }
        if self.respawn_half_extent > self.bounds_half_extent {
            return Err(ConfigError::invalid(
                "particles.respawn_half_extent",
                format!(
                    "{} exceeds bounds_half_extent {}",
                    self.respawn_half_extent, self.bounds_half_extent
                ),
            ));
        }
        if self.ground_band > self.max_height {
            return Err(ConfigError::invalid(
                "particles.ground_band",
                format!("{} exceeds max_height {}", self.ground_band, self.max_height),
            ));
        }
        if 2.0 * resting_height > self.max_height {
            return Err(ConfigError::invalid(
                "particles.max_height",
                format!(
                    "{} is below twice the resting height ({})",
                    self.max_height,
                    2.0 * resting_height
                ),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct AtmosphereConfig {
    pub fog_color: [f32; 3],
    pub fog_near: f32,
    pub fog_far: f32,
    pub fog_density: f32,
    pub fog_alpha: f32,
    pub ambient_intensity: f32,
    pub directional_intensity: f32,
    pub directional_from: [f32; 3],
    /// Sky/ground hemisphere term used in place of an environment map.
    pub environment_intensity: f32,
}

impl Default for AtmosphereConfig {
    fn default() -> Self {
        Self {
            fog_color: [1.0, 1.0, 1.0],
            fog_near: -33.9,
            fog_far: 82.0,
            fog_density: 0.0,
            fog_alpha: 1.0,
            ambient_intensity: 0.0,
            directional_intensity: 0.0,
            directional_from: [1.0, 1.0, 1.0],
            environment_intensity: 1.0,
        }
    }
}

impl AtmosphereConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for channel in self.fog_color {
            unit_interval("atmosphere.fog_color", channel)?;
        }
        finite("atmosphere.fog_near", self.fog_near)?;
        finite("atmosphere.fog_far", self.fog_far)?;
        if self.fog_far <= self.fog_near {
            return Err(ConfigError::invalid(
                "atmosphere.fog_far",
                format!("{} must be greater than fog_near {}", self.fog_far, self.fog_near),
            ));
        }
        unit_interval("atmosphere.fog_density", self.fog_density)?;
        unit_interval("atmosphere.fog_alpha", self.fog_alpha)?;
        non_negative("atmosphere.ambient_intensity", self.ambient_intensity)?;
        non_negative("atmosphere.directional_intensity", self.directional_intensity)?;
        non_negative("atmosphere.environment_intensity", self.environment_intensity)?;
        if self.directional_from.iter().all(|c| *c == 0.0) {
            return Err(ConfigError::invalid(
                "atmosphere.directional_from",
                "light direction must be non-zero",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct PostConfig {
    pub enabled: bool,
    pub distortion: f32,
    pub distortion_scale: f32,
    pub vignette_strength: f32,
    pub red_offset: f32,
    pub green_offset: f32,
    pub blue_offset: f32,
}

impl Default for PostConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            distortion: 0.8,
            distortion_scale: 0.92,
            vignette_strength: 0.6,
            red_offset: 0.001,
            green_offset: 0.0,
            blue_offset: -0.001,
        }
    }
}

impl PostConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        finite("post.distortion", self.distortion)?;
        positive("post.distortion_scale", self.distortion_scale)?;
        unit_interval("post.vignette_strength", self.vignette_strength)?;
        finite("post.red_offset", self.red_offset)?;
        finite("post.green_offset", self.green_offset)?;
        finite("post.blue_offset", self.blue_offset)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub fov_y_deg: f32,
    pub near: f32,
    pub far: f32,
    /// Start position on the ground plane; height comes from the resting height.
    pub start_x: f32,
    pub start_z: f32,
    /// Radians of yaw/pitch per raw mouse count.
    pub mouse_sensitivity: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_y_deg: 75.0,
            near: 0.1,
            far: 1000.0,
            start_x: 0.0,
            start_z: 20.0,
            mouse_sensitivity: 0.002,
        }
    }
}

impl CameraConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.fov_y_deg > 0.0 && self.fov_y_deg < 180.0) {
            return Err(ConfigError::invalid(
                "camera.fov_y_deg",
                format!("{} must be in (0, 180)", self.fov_y_deg),
            ));
        }
        positive("camera.near", self.near)?;
        if self.far <= self.near {
            return Err(ConfigError::invalid(
                "camera.far",
                format!("{} must be greater than near {}", self.far, self.near),
            ));
        }
        finite("camera.start_x", self.start_x)?;
        finite("camera.start_z", self.start_z)?;
        positive("camera.mouse_sensitivity", self.mouse_sensitivity)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct SkylineConfig {
    pub seed: u64,
    /// Blocks per side of the square city grid.
    pub grid: u32,
    pub spacing: f32,
    pub footprint: f32,
    pub min_height: f32,
    pub max_height: f32,
    /// Blocks whose center lies inside this radius of the start are skipped.
    pub clear_radius: f32,
    pub floor_y: f32,
}

impl Default for SkylineConfig {
    fn default() -> Self {
        Self {
            seed: 0x5eed_c17e,
            grid: 12,
            spacing: 9.0,
            footprint: 6.0,
            min_height: 4.0,
            max_height: 28.0,
            clear_radius: 6.0,
            floor_y: -0.5,
        }
    }
}

impl SkylineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("skyline.spacing", self.spacing)?;
        positive("skyline.footprint", self.footprint)?;
        if self.footprint > self.spacing {
            return Err(ConfigError::invalid(
                "skyline.footprint",
                format!("{} exceeds spacing {}", self.footprint, self.spacing),
            ));
        }
        positive("skyline.min_height", self.min_height)?;
        if self.max_height < self.min_height {
            return Err(ConfigError::invalid(
                "skyline.max_height",
                format!("{} is below min_height {}", self.max_height, self.min_height),
            ));
        }
        non_negative("skyline.clear_radius", self.clear_radius)?;
        finite("skyline.floor_y", self.floor_y)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct WalkthroughConfig {
    pub motion: MotionConfig,
    pub particles: ParticleConfig,
    pub atmosphere: AtmosphereConfig,
    pub post: PostConfig,
    pub camera: CameraConfig,
    pub skyline: SkylineConfig,
}

impl WalkthroughConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.motion.validate()?;
        self.particles.validate(self.motion.resting_height)?;
        self.atmosphere.validate()?;
        self.post.validate()?;
        self.camera.validate()?;
        self.skyline.validate()?;
        Ok(())
    }
}

pub fn load_config_from_path(path: &Path) -> Result<WalkthroughConfig, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config: WalkthroughConfig =
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    config.validate()?;
    Ok(config)
}

/// Loads the config, falling back to defaults when the file is missing or bad.
pub fn load_config_or_default(path: &Path) -> WalkthroughConfig {
    match load_config_from_path(path) {
        Ok(config) => {
            log::info!("Loaded config from {}", path.display());
            config
        }
        Err(ConfigError::Io { source, .. }) if source.kind() == std::io::ErrorKind::NotFound => {
            log::warn!("Config {} not found, using defaults", path.display());
            WalkthroughConfig::default()
        }
        Err(err) => {
            log::error!("{err}; using defaults");
            WalkthroughConfig::default()
        }
    }
}

/// Polls a file's modification time so edits can be picked up at frame
/// boundaries.
pub struct ConfigWatcher {
    path: PathBuf,
    last_seen_modified: Option<SystemTime>,
}

impl ConfigWatcher {
    pub fn new(path: PathBuf) -> Self {
        let last_seen_modified = modified_time(&path);
        Self {
            path,
            last_seen_modified,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn should_reload(&mut self) -> bool {
        let current = modified_time(&self.path);
        match (self.last_seen_modified, current) {
            (Some(old), Some(now)) if now > old => {
                self.last_seen_modified = Some(now);
                true
            }
            (None, Some(now)) => {
                self.last_seen_modified = Some(now);
                true
            }
            _ => false,
        }
    }
}

fn modified_time(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).ok()?.modified().ok()
}

pub(crate) fn finite(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, format!("{value} is not finite")))
    }
}

pub(crate) fn non_negative(field: &'static str, value: f32) -> Result<(), ConfigError> {
    finite(field, value)?;
    if value < 0.0 {
        return Err(ConfigError::invalid(field, format!("{value} is negative")));
    }
    Ok(())
}

pub(crate) fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    finite(field, value)?;
    if value <= 0.0 {
        return Err(ConfigError::invalid(field, format!("{value} must be > 0")));
    }
    Ok(())
}

pub(crate) fn unit_interval(field: &'static str, value: f32) -> Result<(), ConfigError> {
    finite(field, value)?;
    if !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::invalid(
            field,
            format!("{value} is outside [0, 1]"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::UNIX_EPOCH;

    fn temp_file_path(name_hint: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before unix epoch")
            .as_nanos();
        std::env::temp_dir().join(format!(
            "fw_config_test_{}_{}_{}.json",
            name_hint,
            std::process::id(),
            nanos
        ))
    }

    #[test]
    fn defaults_are_valid() {
        WalkthroughConfig::default()
            .validate()
            .expect("default config should validate");
    }

    #[test]
    fn shipped_config_matches_defaults() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../../assets/config/walkthrough.json");
        let config = load_config_from_path(&path).expect("shipped config should load");
        let defaults = WalkthroughConfig::default();
        assert_eq!(config.particles.count, defaults.particles.count);
        assert_eq!(config.skyline.seed, defaults.skyline.seed);
        assert_eq!(config.post.enabled, defaults.post.enabled);
        assert!((config.motion.resting_height - defaults.motion.resting_height).abs() < 1e-6);
        assert!((config.atmosphere.fog_near - defaults.atmosphere.fog_near).abs() < 1e-4);
    }

    #[test]
    fn partial_file_keeps_defaults_for_missing_fields() {
        let path = temp_file_path("partial");
        fs::write(
            &path,
            r#"{ "motion": { "acceleration": 150.0 }, "particles": { "count": 64 } }"#,
        )
        .expect("write config");

        let config = load_config_from_path(&path).expect("partial config should load");
        assert_eq!(config.motion.acceleration, 150.0);
        assert_eq!(config.motion.friction_per_step, 0.85);
        assert_eq!(config.particles.count, 64);
        assert_eq!(config.particles.max_height, 5.0);
        assert_eq!(config.atmosphere.fog_far, 82.0);

        let _ = fs::remove_file(path);
    }

    #[test]
    fn friction_above_one_is_rejected() {
        let path = temp_file_path("friction");
        fs::write(&path, r#"{ "motion": { "friction_per_step": 1.5 } }"#).expect("write config");

        let err = load_config_from_path(&path).expect_err("friction > 1 should fail");
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "motion.friction_per_step",
                ..
            }
        ));

        let _ = fs::remove_file(path);
    }

    #[test]
    fn malformed_json_reports_parse_error() {
        let path = temp_file_path("malformed");
        fs::write(&path, "{ motion: ").expect("write config");

        let err = load_config_from_path(&path).expect_err("malformed JSON should fail");
        assert!(matches!(err, ConfigError::Parse { .. }));

        let _ = fs::remove_file(path);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let path = temp_file_path("missing");
        let _ = fs::remove_file(&path);
        assert_eq!(load_config_or_default(&path), WalkthroughConfig::default());
    }

    #[test]
    fn respawn_outside_bounds_is_rejected() {
        let particles = ParticleConfig {
            respawn_half_extent: 30.0,
            ..ParticleConfig::default()
        };
        let err = particles.validate(0.53).expect_err("respawn > bounds should fail");
        assert!(err.to_string().contains("respawn_half_extent"));
    }

    #[test]
    fn max_height_must_clear_eye_level_band() {
        let particles = ParticleConfig {
            max_height: 1.1,
            ..ParticleConfig::default()
        };
        assert!(particles.validate(0.53).is_ok());
        assert!(particles.validate(0.55).is_ok(), "band exactly at the ceiling");
        let err = particles.validate(0.6).expect_err("1.2 band above 1.1 ceiling");
        assert!(err.to_string().contains("particles.max_height"));
    }

    #[test]
    fn inverted_fog_range_is_rejected() {
        let atmosphere = AtmosphereConfig {
            fog_near: 50.0,
            fog_far: 10.0,
            ..AtmosphereConfig::default()
        };
        assert!(atmosphere.validate().is_err());
    }

    #[test]
    fn watcher_detects_newly_created_file() {
        let path = temp_file_path("watcher_create");
        let _ = fs::remove_file(&path);

        let mut watcher = ConfigWatcher::new(path.clone());
        assert!(!watcher.should_reload(), "missing file should not reload");

        fs::write(&path, "{}").expect("write config");

        assert!(
            watcher.should_reload(),
            "creating file should trigger reload once"
        );
        assert!(
            !watcher.should_reload(),
            "without changes, second poll should not reload"
        );

        let _ = fs::remove_file(path);
    }
}
