//! Doors and their open/close animation.
//!
//! Passability changes the moment a door is toggled. Opening and Closing only
//! select which animation plays and settle into Open or Closed when the clip
//! finishes; they never block a second toggle.

use dce_core::animation::{AnimationClock, FrameTable};

use crate::collision::Aabb;
use crate::level::{DoorSpec, TileCoord};

const OPENING_FRAMES: FrameTable = FrameTable::one_shot(9, 200);
const CLOSING_FRAMES: FrameTable = FrameTable::one_shot(9, 1000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoorState {
    Closed,
    Opening,
    Open,
    Closing,
    Locked,
}

#[derive(Debug, Clone)]
pub struct Door {
    pub id: String,
    pub tile: TileCoord,
    pub collision_box: Aabb,
    pub interaction_box: Aabb,
    state: DoorState,
    animation: AnimationClock<DoorState>,
}

impl Door {
    pub fn from_spec(index: usize, spec: &DoorSpec, cell_size: f32, now_us: u64) -> Self {
        let tile = TileCoord::new(spec.x, spec.y);
        let cell = Aabb::new(
            spec.x as f32 * cell_size,
            spec.y as f32 * cell_size,
            cell_size,
            cell_size,
        );
        let state = if spec.locked {
            DoorState::Locked
        } else {
            DoorState::Closed
        };
        Self {
            id: format!("{index}-{}-{}", spec.x, spec.y),
            tile,
            collision_box: cell,
            interaction_box: cell,
            state,
            animation: AnimationClock::new(state, now_us),
        }
    }

    pub fn state(&self) -> DoorState {
        self.state
    }

    pub fn is_blocking(&self) -> bool {
        matches!(
            self.state,
            DoorState::Closed | DoorState::Closing | DoorState::Locked
        )
    }

    /// Open a closed door or close an open one. Locked doors refuse.
    /// Reversing a clip mid-way keeps the door at its current column.
    pub fn toggle(&mut self, now_us: u64) -> bool {
        let next = match self.state {
            DoorState::Closed | DoorState::Closing => DoorState::Opening,
            DoorState::Open | DoorState::Opening => DoorState::Closing,
            DoorState::Locked => return false,
        };
        let start_frame = match self.state {
            DoorState::Opening | DoorState::Closing => {
                last_column() as usize - self.animation.frame_index().min(last_column() as usize)
            }
            _ => 0,
        };
        self.state = next;
        self.animation.restart_at(next, start_frame, now_us);
        true
    }

    /// Lock a closed door or unlock a locked one.
    pub fn toggle_lock(&mut self, now_us: u64) -> bool {
        let next = match self.state {
            DoorState::Closed => DoorState::Locked,
            DoorState::Locked => DoorState::Closed,
            _ => return false,
        };
        self.state = next;
        self.animation.restart(next, now_us);
        true
    }

    pub fn message(&self) -> &'static str {
        match self.state {
            DoorState::Locked => "The door is locked.",
            DoorState::Open | DoorState::Opening => "Close door?",
            DoorState::Closed | DoorState::Closing => "Open door?",
        }
    }

    /// Advance the open/close clip and settle once it finishes.
    pub fn animate(&mut self, now_us: u64) {
        let (table, settled) = match self.state {
            DoorState::Opening => (&OPENING_FRAMES, DoorState::Open),
            DoorState::Closing => (&CLOSING_FRAMES, DoorState::Closed),
            _ => return,
        };
        self.animation.advance(table, now_us);
        if self.animation.finished() {
            log::debug!("Door {} settled {:?}", self.id, settled);
            self.state = settled;
            self.animation.restart(settled, now_us);
        }
    }

    /// Sprite sheet column: 0 is fully closed, 8 fully open.
    pub fn sprite_column(&self) -> u32 {
        let last = last_column();
        let frame = self.animation.frame_index() as u32;
        match self.state {
            DoorState::Closed | DoorState::Locked => 0,
            DoorState::Open => last,
            DoorState::Opening => frame,
            DoorState::Closing => last - frame.min(last),
        }
    }
}

fn last_column() -> u32 {
    OPENING_FRAMES.frame_count as u32 - 1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn door(locked: bool) -> Door {
        Door::from_spec(0, &DoorSpec { x: 2, y: 3, locked }, 24.0, 0)
    }

    #[test]
    fn door_boxes_cover_the_cell() {
        let d = door(false);
        assert_eq!(d.id, "0-2-3");
        assert_eq!(d.collision_box, Aabb::new(48.0, 72.0, 24.0, 24.0));
        assert_eq!(d.interaction_box, d.collision_box);
    }

    #[test]
    fn toggle_flips_passability_immediately() {
        let mut d = door(false);
        assert!(d.is_blocking());
        assert!(d.toggle(0));
        assert_eq!(d.state(), DoorState::Opening);
        assert!(!d.is_blocking());

        // Opening does not gate a second toggle.
        assert!(d.toggle(10_000));
        assert_eq!(d.state(), DoorState::Closing);
        assert!(d.is_blocking());
    }

    #[test]
    fn opening_settles_to_open_after_clip() {
        let mut d = door(false);
        d.toggle(0);
        let mut now = 0;
        for _ in 0..8 {
            now += 200_000;
            d.animate(now);
            assert_eq!(d.state(), DoorState::Opening);
        }
        assert_eq!(d.sprite_column(), 8);
        now += 200_000;
        d.animate(now);
        assert_eq!(d.state(), DoorState::Open);
        assert_eq!(d.message(), "Close door?");
    }

    #[test]
    fn reversing_mid_clip_keeps_the_current_column() {
        let mut d = door(false);
        d.toggle(0);
        for step in 1..=3 {
            d.animate(step * 200_000);
        }
        assert_eq!(d.sprite_column(), 3);

        d.toggle(600_000);
        assert_eq!(d.state(), DoorState::Closing);
        assert_eq!(d.sprite_column(), 3);
        d.animate(1_600_000);
        assert_eq!(d.sprite_column(), 2);

        d.toggle(1_700_000);
        assert_eq!(d.state(), DoorState::Opening);
        assert_eq!(d.sprite_column(), 2);
        d.animate(1_900_000);
        assert_eq!(d.sprite_column(), 3);
    }

    #[test]
    fn closing_is_slower_than_opening() {
        let mut d = door(false);
        d.toggle(0);
        for step in 1..=9 {
            d.animate(step * 200_000);
        }
        assert_eq!(d.state(), DoorState::Open);

        d.toggle(2_000_000);
        for step in 1..=9 {
            d.animate(2_000_000 + step * 200_000);
        }
        assert_eq!(d.state(), DoorState::Closing);
        for step in 1..=9 {
            d.animate(2_000_000 + step * 1_000_000);
        }
        assert_eq!(d.state(), DoorState::Closed);
        assert!(d.is_blocking());
    }

    #[test]
    fn locked_door_rejects_toggle() {
        let mut d = door(true);
        assert_eq!(d.message(), "The door is locked.");
        assert!(!d.toggle(0));
        assert_eq!(d.state(), DoorState::Locked);
        assert!(d.is_blocking());

        assert!(d.toggle_lock(0));
        assert_eq!(d.state(), DoorState::Closed);
        assert!(d.toggle(0));
        assert!(!d.toggle_lock(0), "only closed doors can be locked");
    }
}
