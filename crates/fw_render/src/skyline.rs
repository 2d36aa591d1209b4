//! Procedural city geometry: one large ground quad and a grid of boxes.
//!
//! Layout is fully determined by `SkylineConfig::seed`, so every run shows the
//! same skyline.

use fw_core::SkylineConfig;
use glam::{Vec2, Vec3};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::vertex::SceneVertex;

pub const GROUND_HALF_EXTENT: f32 = 1000.0;
const GROUND_COLOR: [f32; 3] = [0.32, 0.32, 0.34];

#[derive(Debug, Clone, Default)]
pub struct SceneMesh {
    pub vertices: Vec<SceneVertex>,
    pub indices: Vec<u32>,
    pub block_count: usize,
}

impl SceneMesh {
    fn push_quad(&mut self, corners: [Vec3; 4], normal: Vec3, color: [f32; 3]) {
        let base = self.vertices.len() as u32;
        for corner in corners {
            self.vertices.push(SceneVertex {
                position: corner.to_array(),
                normal: normal.to_array(),
                color,
            });
        }
        self.indices
            .extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
    }

    /// Axis-aligned box standing on `floor_y`. The bottom face is omitted.
    fn push_block(&mut self, center: Vec2, half: f32, floor_y: f32, height: f32, color: [f32; 3]) {
        let (x0, x1) = (center.x - half, center.x + half);
        let (z0, z1) = (center.y - half, center.y + half);
        let (y0, y1) = (floor_y, floor_y + height);

        // Corners are wound counter-clockwise seen from outside.
        self.push_quad(
            [
                Vec3::new(x0, y0, z1),
                Vec3::new(x1, y0, z1),
                Vec3::new(x1, y1, z1),
                Vec3::new(x0, y1, z1),
            ],
            Vec3::Z,
            color,
        );
        self.push_quad(
            [
                Vec3::new(x1, y0, z0),
                Vec3::new(x0, y0, z0),
                Vec3::new(x0, y1, z0),
                Vec3::new(x1, y1, z0),
            ],
            Vec3::NEG_Z,
            color,
        );
        self.push_quad(
            [
                Vec3::new(x1, y0, z1),
                Vec3::new(x1, y0, z0),
                Vec3::new(x1, y1, z0),
                Vec3::new(x1, y1, z1),
            ],
            Vec3::X,
            color,
        );
        self.push_quad(
            [
                Vec3::new(x0, y0, z0),
                Vec3::new(x0, y0, z1),
                Vec3::new(x0, y1, z1),
                Vec3::new(x0, y1, z0),
            ],
            Vec3::NEG_X,
            color,
        );
        self.push_quad(
            [
                Vec3::new(x0, y1, z1),
                Vec3::new(x1, y1, z1),
                Vec3::new(x1, y1, z0),
                Vec3::new(x0, y1, z0),
            ],
            Vec3::Y,
            color,
        );
    }
}

/// Builds the ground plane plus skyline, keeping the area around `start`
/// (on the XZ plane) free of blocks.
pub fn build_scene_mesh(config: &SkylineConfig, start: Vec2) -> SceneMesh {
    let mut mesh = SceneMesh::default();
    let g = GROUND_HALF_EXTENT;
    let y = config.floor_y;
    mesh.push_quad(
        [
            Vec3::new(-g, y, g),
            Vec3::new(g, y, g),
            Vec3::new(g, y, -g),
            Vec3::new(-g, y, -g),
        ],
        Vec3::Y,
        GROUND_COLOR,
    );

    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let offset = (config.grid as f32 - 1.0) * 0.5;
    let half = config.footprint * 0.5;
    for gx in 0..config.grid {
        for gz in 0..config.grid {
            let center = Vec2::new(
                (gx as f32 - offset) * config.spacing,
                (gz as f32 - offset) * config.spacing,
            );
            // Draw before the clearance check so the layout of the remaining
            // blocks does not depend on where the viewer starts.
            let height = rng.random_range(config.min_height..=config.max_height);
            let shade = rng.random_range(0.45_f32..=0.8);
            if center.distance(start) < config.clear_radius {
                continue;
            }
            mesh.push_block(center, half, config.floor_y, height, [shade, shade, shade * 1.04]);
            mesh.block_count += 1;
        }
    }

    log::debug!(
        "Built skyline: {} blocks, {} vertices",
        mesh.block_count,
        mesh.vertices.len()
    );
    mesh
}
