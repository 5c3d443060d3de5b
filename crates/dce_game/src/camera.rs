//! Level-space camera that follows the player.

use glam::Vec2;

/// Visible window onto the level in world pixels, top-left origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Camera {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width,
            height,
        }
    }

    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    /// Center on `focus`, clamped so the view never leaves the level. An axis
    /// where the level is smaller than the view is pinned to 0.
    pub fn follow(&mut self, focus: Vec2, level_size: Vec2) {
        self.x = clamp_axis(focus.x - self.width * 0.5, level_size.x - self.width);
        self.y = clamp_axis(focus.y - self.height * 0.5, level_size.y - self.height);
    }
}

fn clamp_axis(value: f32, max: f32) -> f32 {
    value.min(max).max(0.0)
}
