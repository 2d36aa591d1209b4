//! Scripted input playback for deterministic controller runs.

use crate::input::{InputState, Key};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct InputScript {
    #[serde(default = "default_dt")]
    pub fixed_dt: f32,
    pub frames: Vec<ScriptFrame>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScriptFrame {
    #[serde(default)]
    pub held: Vec<ScriptKey>,
    #[serde(default)]
    pub look_dx: f64,
    #[serde(default = "default_repeat")]
    pub repeat: u32,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScriptKey {
    Forward,
    Backward,
    Left,
    Right,
    Jump,
}

impl ScriptKey {
    fn key(self) -> Key {
        match self {
            ScriptKey::Forward => Key::W,
            ScriptKey::Backward => Key::S,
            ScriptKey::Left => Key::A,
            ScriptKey::Right => Key::D,
            ScriptKey::Jump => Key::Space,
        }
    }
}

impl InputScript {
    /// One entry per simulated frame, with `repeat` unrolled.
    pub fn expanded(&self) -> Vec<&ScriptFrame> {
        let mut out = Vec::new();
        for frame in &self.frames {
            for _ in 0..frame.repeat.max(1) {
                out.push(frame);
            }
        }
        out
    }
}

/// Brings `input` in line with the keys a frame holds, generating the same
/// key-down and key-up calls a window would.
pub fn apply_frame(input: &mut InputState, frame: &ScriptFrame) {
    let all = [
        ScriptKey::Forward,
        ScriptKey::Backward,
        ScriptKey::Left,
        ScriptKey::Right,
        ScriptKey::Jump,
    ];
    for key in all {
        if frame.held.contains(&key) {
            input.key_down(key.key());
        } else {
            input.key_up(key.key());
        }
    }
}

const fn default_dt() -> f32 {
    1.0 / 60.0
}

const fn default_repeat() -> u32 {
    1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MotionConfig, ParticleConfig};
    use crate::frame::{FrameLoop, Viewer};
    use crate::motion::{KinematicBody, MotionController};
    use crate::particles::ParticleField;
    use crate::view::ViewAngles;

    const SCRIPT: &str = r#"{
      "fixed_dt": 0.016666667,
      "frames": [
        { "repeat": 10 },
        { "held": ["forward"], "repeat": 60 },
        { "held": ["forward", "jump"], "repeat": 1 },
        { "held": ["forward", "right"], "look_dx": 12.0, "repeat": 90 },
        { "held": ["backward", "left"], "repeat": 45 },
        { "repeat": 60 }
      ]
    }"#;

    fn parse() -> InputScript {
        serde_json::from_str(SCRIPT).expect("script should parse")
    }

    fn run(script: &InputScript) -> (KinematicBody, ViewAngles, Vec<f32>) {
        let rest = MotionConfig::default().resting_height;
        let mut frame = FrameLoop::new(0.25);
        frame.attach_viewer(Viewer::new(
            MotionController::new(MotionConfig::default()),
            KinematicBody::at_rest(0.0, 20.0, rest),
            ViewAngles::default(),
        ));
        frame.attach_particles(
            ParticleField::spawn_seeded(ParticleConfig::default(), rest, 99).expect("spawn"),
        );
        let mut input = InputState::new();
        frame.set_engaged(true, &mut input);

        for step in script.expanded() {
            apply_frame(&mut input, step);
            frame.look(step.look_dx, 0.0, 0.002);
            frame.step(script.fixed_dt, &mut input);
            input.end_frame();
        }

        let viewer = frame.viewer().expect("viewer attached");
        let buffer = frame
            .particle_buffer()
            .expect("particles attached")
            .to_vec();
        (viewer.body, viewer.view, buffer)
    }

    #[test]
    fn script_parses_and_expands() {
        let script = parse();
        let expanded = script.expanded();
        assert_eq!(expanded.len(), 10 + 60 + 1 + 90 + 45 + 60);
        assert!(expanded[70].held.contains(&ScriptKey::Jump));
        assert!(expanded[0].held.is_empty());
    }

    #[test]
    fn jump_fires_once_per_press() {
        let mut input = InputState::new();
        let press = ScriptFrame {
            held: vec![ScriptKey::Jump],
            look_dx: 0.0,
            repeat: 1,
        };
        apply_frame(&mut input, &press);
        assert!(input.take_jump());
        input.end_frame();
        // Still held on the next frame: no new request.
        apply_frame(&mut input, &press);
        assert!(!input.jump_pending());
    }

    #[test]
    fn scripted_run_is_deterministic() {
        let script = parse();
        let (body_a, view_a, particles_a) = run(&script);
        let (body_b, view_b, particles_b) = run(&script);

        assert_eq!(body_a, body_b);
        assert_eq!(view_a, view_b);
        assert_eq!(particles_a, particles_b);
    }

    #[test]
    fn scripted_run_ends_grounded_and_settled() {
        let script = parse();
        let (body, _, particles) = run(&script);

        assert!(body.grounded);
        assert!((body.position.y - body.resting_height).abs() < 1e-5);
        // 60 idle frames of 0.85 friction leave no meaningful horizontal speed.
        assert!(body.velocity.x.abs() < 1e-2);
        assert!(body.velocity.z.abs() < 1e-2);
        assert_eq!(particles.len(), ParticleConfig::default().count * 3);
    }
}
