//! Keyboard state for the walkthrough.
//!
//! - **Movement (level-triggered):** `forward`, `backward`, `left` and `right`
//!   are true for as long as any key bound to that direction is held. Arrow
//!   keys and WASD are interchangeable, and releasing one of two keys bound to
//!   the same direction keeps the direction active.
//!
//! - **Jump (one-shot):** a fresh Space press records a jump request. The
//!   motion controller consumes it on its next step whether or not the jump is
//!   honored. Key auto-repeat does not re-arm it.
//!
//! - **Edge queries:** `is_just_pressed` serves UI toggles such as the settings
//!   panel. Edges are cleared by `end_frame()`, which the frame loop calls after
//!   the step that could observe them.

use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Up,
    Down,
    Left,
    Right,
    W,
    A,
    S,
    D,
    Space,
    Escape,
    P,
    F3,
}

#[derive(Debug, Clone, Default)]
pub struct InputState {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
    jump_requested: bool,

    held: HashSet<Key>,
    just_pressed: HashSet<Key>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key_down(&mut self, key: Key) {
        if !self.held.insert(key) {
            return;
        }
        self.just_pressed.insert(key);
        if key == Key::Space {
            self.jump_requested = true;
        }
        self.refresh_directions();
    }

    pub fn key_up(&mut self, key: Key) {
        if self.held.remove(&key) {
            self.refresh_directions();
        }
    }

    pub fn is_held(&self, key: Key) -> bool {
        self.held.contains(&key)
    }

    pub fn is_just_pressed(&self, key: Key) -> bool {
        self.just_pressed.contains(&key)
    }

    pub fn request_jump(&mut self) {
        self.jump_requested = true;
    }

    pub fn jump_pending(&self) -> bool {
        self.jump_requested
    }

    /// Returns the pending jump request and clears it.
    pub fn take_jump(&mut self) -> bool {
        std::mem::take(&mut self.jump_requested)
    }

    /// Net directional input as `(right - left, forward - backward)`.
    ///
    /// Opposing keys held together cancel to zero on that axis.
    pub fn axis(&self) -> (f32, f32) {
        (
            f32::from(u8::from(self.right)) - f32::from(u8::from(self.left)),
            f32::from(u8::from(self.forward)) - f32::from(u8::from(self.backward)),
        )
    }

    pub fn any_strafe(&self) -> bool {
        self.left || self.right
    }

    pub fn any_forward(&self) -> bool {
        self.forward || self.backward
    }

    /// Drops every held key. Key-up events are not delivered while the window
    /// is unfocused, so this runs when pointer capture is released.
    pub fn release_all(&mut self) {
        self.held.clear();
        self.jump_requested = false;
        self.refresh_directions();
    }

    pub fn end_frame(&mut self) {
        self.just_pressed.clear();
        self.jump_requested = false;
    }

    fn refresh_directions(&mut self) {
        self.forward = self.is_held(Key::Up) || self.is_held(Key::W);
        self.backward = self.is_held(Key::Down) || self.is_held(Key::S);
        self.left = self.is_held(Key::Left) || self.is_held(Key::A);
        self.right = self.is_held(Key::Right) || self.is_held(Key::D);
    }
}
