//! Keyboard and mouse state for the fixed-step loop.
//!
//! Held buttons are level-triggered. Presses and releases are edges that stay
//! visible until `end_frame()`, which the driver calls only on frames that ran
//! at least one simulation step, so a quick tap is never dropped.
//!
//! Gameplay code does not read `InputState`; each tick works from an
//! `InputSnapshot` taken at its start.

use std::collections::HashSet;
use std::hash::Hash;

use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Left,
    Right,
    Up,
    Down,
    Escape,
    F3,
    F4,
    W,
    A,
    S,
    D,
    E,
    L,
    R,
}

/// Only the attack button is tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseBtn {
    Left,
}

/// Held set plus this frame's press/release edges for one kind of button.
#[derive(Debug, Clone)]
pub struct ButtonSet<B> {
    held: HashSet<B>,
    pressed: HashSet<B>,
    released: HashSet<B>,
}

impl<B: Copy + Eq + Hash> ButtonSet<B> {
    pub fn new() -> Self {
        Self {
            held: HashSet::new(),
            pressed: HashSet::new(),
            released: HashSet::new(),
        }
    }

    /// OS key repeat arrives as extra presses; only the first one is an edge.
    pub fn press(&mut self, button: B) {
        if self.held.insert(button) {
            self.pressed.insert(button);
        }
    }

    pub fn release(&mut self, button: B) {
        if self.held.remove(&button) {
            self.released.insert(button);
        }
    }

    pub fn held(&self, button: B) -> bool {
        self.held.contains(&button)
    }

    pub fn just_pressed(&self, button: B) -> bool {
        self.pressed.contains(&button)
    }

    pub fn just_released(&self, button: B) -> bool {
        self.released.contains(&button)
    }

    fn clear_edges(&mut self) {
        self.pressed.clear();
        self.released.clear();
    }
}

impl<B: Copy + Eq + Hash> Default for ButtonSet<B> {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Default)]
pub struct InputState {
    pub keys: ButtonSet<Key>,
    pub mouse: ButtonSet<MouseBtn>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key_down(&mut self, key: Key) {
        self.keys.press(key);
    }

    pub fn key_up(&mut self, key: Key) {
        self.keys.release(key);
    }

    pub fn mouse_down(&mut self, btn: MouseBtn) {
        self.mouse.press(btn);
    }

    pub fn mouse_up(&mut self, btn: MouseBtn) {
        self.mouse.release(btn);
    }

    pub fn is_held(&self, key: Key) -> bool {
        self.keys.held(key)
    }

    pub fn is_just_pressed(&self, key: Key) -> bool {
        self.keys.just_pressed(key)
    }

    pub fn end_frame(&mut self) {
        self.keys.clear_edges();
        self.mouse.clear_edges();
    }

    fn either_held(&self, a: Key, b: Key) -> bool {
        self.keys.held(a) || self.keys.held(b)
    }

    /// Freeze the gameplay-relevant input for one simulation tick.
    pub fn snapshot(&self) -> InputSnapshot {
        InputSnapshot {
            up: self.either_held(Key::Up, Key::W),
            down: self.either_held(Key::Down, Key::S),
            left: self.either_held(Key::Left, Key::A),
            right: self.either_held(Key::Right, Key::D),
            interact_pressed: self.keys.just_pressed(Key::E),
            attack_pressed: self.mouse.just_pressed(MouseBtn::Left),
        }
    }
}

/// Stable per-tick view of the player's controls. Directions are
/// level-triggered; interact and attack are edge-triggered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct InputSnapshot {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    pub interact_pressed: bool,
    pub attack_pressed: bool,
}

impl InputSnapshot {
    pub fn any_direction(&self) -> bool {
        self.up || self.down || self.left || self.right
    }

    /// Same held directions with the one-shot actions removed, for the
    /// extra catch-up ticks of a frame.
    pub fn without_edges(self) -> Self {
        Self {
            interact_pressed: false,
            attack_pressed: false,
            ..self
        }
    }
}
