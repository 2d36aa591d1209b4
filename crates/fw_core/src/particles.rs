//! Ambient dust particles drifting around the viewer.
//!
//! Positions live in three parallel `f32` arrays and are respawned in place,
//! so a tick touches each particle once and never allocates. The interleaved
//! render buffer is sized at spawn and refreshed at the end of every tick.
//!
//! Per particle, `tick` applies these rules in order; a later rule may
//! override an earlier one in the same tick:
//!
//!   1. drift by a small random step, biased upward on y
//!   2. crossing `max_height` respawns near the ground anywhere in the spawn square
//!   3. leaving the bounds square respawns within the tighter respawn square
//!   4. a small per-tick chance respawns as in rule 2 regardless of position

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::config::{self, ConfigError, ParticleConfig};

/// Drift step per unit speed, applied once per tick.
const DRIFT_SCALE: f32 = 0.01;
/// Offset subtracted from the uniform y sample; below 0.5 biases drift upward.
const DRIFT_LIFT_BIAS: f32 = 0.1;

pub struct ParticleField {
    config: ParticleConfig,
    resting_height: f32,
    xs: Vec<f32>,
    ys: Vec<f32>,
    zs: Vec<f32>,
    sizes: Vec<f32>,
    colors: Vec<[f32; 3]>,
    packed: Vec<f32>,
    respawn_count: u64,
    rng: ChaCha8Rng,
}

impl ParticleField {
    /// Spawns `config.count` particles seeded from the thread RNG.
    pub fn spawn(config: ParticleConfig, resting_height: f32) -> Result<Self, ConfigError> {
        let rng = ChaCha8Rng::from_rng(&mut rand::rng());
        Self::spawn_with_rng(config, resting_height, rng)
    }

    /// Spawns with a fixed seed so runs are reproducible.
    pub fn spawn_seeded(
        config: ParticleConfig,
        resting_height: f32,
        seed: u64,
    ) -> Result<Self, ConfigError> {
        Self::spawn_with_rng(config, resting_height, ChaCha8Rng::seed_from_u64(seed))
    }

    fn spawn_with_rng(
        config: ParticleConfig,
        resting_height: f32,
        mut rng: ChaCha8Rng,
    ) -> Result<Self, ConfigError> {
        Self::check_config(&config, resting_height)?;

        let n = config.count;
        let mut xs = Vec::with_capacity(n);
        let mut ys = Vec::with_capacity(n);
        let mut zs = Vec::with_capacity(n);
        let mut sizes = Vec::with_capacity(n);
        let mut colors = Vec::with_capacity(n);

        let spawn = config.spawn_half_extent;
        let eye_band = 2.0 * resting_height;
        for _ in 0..n {
            xs.push(rng.random_range(-spawn..=spawn));
            ys.push(rng.random_range(0.0..=eye_band));
            zs.push(rng.random_range(-spawn..=spawn));
            sizes.push(config.base_size * rng.random_range(0.5_f32..=1.0));
            colors.push([
                rng.random_range(0.0..=config.max_color),
                rng.random_range(0.0..=config.max_color),
                rng.random_range(0.0..=config.max_color),
            ]);
        }

        let mut field = Self {
            config,
            resting_height,
            xs,
            ys,
            zs,
            sizes,
            colors,
            packed: vec![0.0; n * 3],
            respawn_count: 0,
            rng,
        };
        field.repack();
        log::debug!("Spawned {} particles", n);
        Ok(field)
    }

    pub fn len(&self) -> usize {
        self.xs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.xs.is_empty()
    }

    pub fn config(&self) -> &ParticleConfig {
        &self.config
    }

    pub fn xs(&self) -> &[f32] {
        &self.xs
    }

    pub fn ys(&self) -> &[f32] {
        &self.ys
    }

    pub fn zs(&self) -> &[f32] {
        &self.zs
    }

    pub fn sizes(&self) -> &[f32] {
        &self.sizes
    }

    pub fn colors(&self) -> &[[f32; 3]] {
        &self.colors
    }

    /// Total respawns since spawn, for diagnostics.
    pub fn respawn_count(&self) -> u64 {
        self.respawn_count
    }

    /// Interleaved `[x0, y0, z0, x1, ...]` positions as of the last tick.
    pub fn as_renderable_buffer(&self) -> &[f32] {
        &self.packed
    }

    /// Advances every particle by one step.
    ///
    /// Drift is a fixed random step per call, like the controller's friction,
    /// so `dt` only matters through `FrameLoop` skipping unusable frames.
    pub fn tick(&mut self, _dt: f32) {
        let step = DRIFT_SCALE * self.config.speed;
        let max_height = self.config.max_height;
        let bounds = self.config.bounds_half_extent;
        let churn = self.config.churn_probability;

        for i in 0..self.xs.len() {
            self.xs[i] += (self.rng.random::<f32>() - 0.5) * step;
            self.ys[i] += (self.rng.random::<f32>() - DRIFT_LIFT_BIAS) * step;
            self.zs[i] += (self.rng.random::<f32>() - 0.5) * step;

            if self.ys[i] > max_height {
                self.respawn_near_ground(i);
            }

            if self.xs[i].abs() > bounds || self.zs[i].abs() > bounds {
                self.respawn_inside(i);
            }

            if self.rng.random::<f32>() < churn {
                self.respawn_near_ground(i);
            }
        }

        self.repack();
    }

    /// Replaces the drift and respawn tunables and the eye height the respawn
    /// band is derived from. The population size is fixed at spawn; a
    /// differing `count` is ignored with a warning.
    pub fn apply_config(
        &mut self,
        config: ParticleConfig,
        resting_height: f32,
    ) -> Result<(), ConfigError> {
        Self::check_config(&config, resting_height)?;
        if config.count != self.config.count {
            log::warn!(
                "Particle count change ({} -> {}) needs a respawn of the field; keeping {}",
                self.config.count,
                config.count,
                self.config.count
            );
        }
        self.config = ParticleConfig {
            count: self.config.count,
            ..config
        };
        self.resting_height = resting_height;
        Ok(())
    }

    /// Everything `apply_config` would reject, without touching the field.
    pub fn check_config(config: &ParticleConfig, resting_height: f32) -> Result<(), ConfigError> {
        config::non_negative("motion.resting_height", resting_height)?;
        config.validate(resting_height)
    }

    pub fn resting_height(&self) -> f32 {
        self.resting_height
    }

    pub fn set_speed(&mut self, value: f32) -> Result<(), ConfigError> {
        config::non_negative("particles.speed", value)?;
        self.config.speed = value;
        Ok(())
    }

    pub fn set_max_height(&mut self, value: f32) -> Result<(), ConfigError> {
        let candidate = ParticleConfig {
            max_height: value,
            ..self.config
        };
        candidate.validate(self.resting_height)?;
        self.config = candidate;
        Ok(())
    }

    pub fn set_churn_probability(&mut self, value: f32) -> Result<(), ConfigError> {
        config::unit_interval("particles.churn_probability", value)?;
        self.config.churn_probability = value;
        Ok(())
    }

    fn respawn_near_ground(&mut self, i: usize) {
        let spawn = self.config.spawn_half_extent;
        self.xs[i] = self.rng.random_range(-spawn..=spawn);
        self.ys[i] = self.rng.random_range(0.0..=self.config.ground_band);
        self.zs[i] = self.rng.random_range(-spawn..=spawn);
        self.respawn_count += 1;
    }

    fn respawn_inside(&mut self, i: usize) {
        let inner = self.config.respawn_half_extent;
        self.xs[i] = self.rng.random_range(-inner..=inner);
        self.ys[i] = self.rng.random_range(0.0..=2.0 * self.resting_height);
        self.zs[i] = self.rng.random_range(-inner..=inner);
        self.respawn_count += 1;
    }

    fn repack(&mut self) {
        for (i, chunk) in self.packed.chunks_exact_mut(3).enumerate() {
            chunk[0] = self.xs[i];
            chunk[1] = self.ys[i];
            chunk[2] = self.zs[i];
        }
    }
}
