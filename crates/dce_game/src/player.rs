//! Player entity: hit boxes, action flags and the displayed action state.
//!
//! Actions are independent flags so attacking or interacting can overlap
//! movement. The state shown to the animation clock is derived from the flags
//! by priority: Dead > Damaged > Attacking > Interacting > Moving > Idle.

use dce_core::animation::{AnimationClock, FrameTable};
use dce_core::cooldown::{ms_to_us, Cooldown};
use dce_core::input::InputSnapshot;
use glam::Vec2;

use crate::collision::{try_move, Aabb, Obstacles};
use crate::config::PlayerTuning;
use crate::meter::Meter;

const IDLE_FRAMES: FrameTable = FrameTable::looping(7, 190);
const MOVE_FRAMES: FrameTable = FrameTable::looping(6, 125);
const DAMAGED_FRAMES: FrameTable = FrameTable::looping(4, 100);
const ATTACK_FRAMES: FrameTable = FrameTable::one_shot(3, 150);
const DEAD_FRAMES: FrameTable = FrameTable::one_shot(4, 150);

/// How long the Interacting pose is shown after a successful interaction.
const INTERACT_DISPLAY_US: u64 = 500_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    fn unit(self) -> Vec2 {
        match self {
            Direction::Up => Vec2::new(0.0, -1.0),
            Direction::Down => Vec2::new(0.0, 1.0),
            Direction::Left => Vec2::new(-1.0, 0.0),
            Direction::Right => Vec2::new(1.0, 0.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    Idle,
    Moving,
    Attacking,
    Interacting,
    Damaged,
    Dead,
}

impl PlayerState {
    pub fn frame_table(self) -> &'static FrameTable {
        match self {
            PlayerState::Idle | PlayerState::Interacting => &IDLE_FRAMES,
            PlayerState::Moving => &MOVE_FRAMES,
            PlayerState::Attacking => &ATTACK_FRAMES,
            PlayerState::Damaged => &DAMAGED_FRAMES,
            PlayerState::Dead => &DEAD_FRAMES,
        }
    }

    /// Sprite sheet row for this state.
    pub fn sheet_row(self) -> u32 {
        match self {
            PlayerState::Idle | PlayerState::Interacting => 0,
            PlayerState::Moving => 1,
            PlayerState::Attacking => 2,
            PlayerState::Damaged => 3,
            PlayerState::Dead => 4,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PlayerState::Idle => "Idle",
            PlayerState::Moving => "Moving",
            PlayerState::Attacking => "Attacking",
            PlayerState::Interacting => "Interacting",
            PlayerState::Damaged => "Damaged",
            PlayerState::Dead => "Dead",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActionFlags {
    pub moving: bool,
    pub attacking: bool,
    pub interacting: bool,
    pub damaged: bool,
    pub dead: bool,
}

#[derive(Debug, Clone)]
pub struct Player {
    /// Top-left of the sprite in world pixels.
    pub position: Vec2,
    pub size: f32,
    /// Pixels per tick.
    pub speed: f32,
    pub facing: Direction,
    /// True when the last horizontal direction was Right.
    pub facing_flip: bool,
    pub health: Meter,
    pub magic: Meter,
    pub actions: ActionFlags,
    pub attack_damage: u32,
    attack_cooldown_us: u64,
    damage_cooldown_us: u64,
    interact_cooldown_us: u64,
    attack_cooldown: Cooldown,
    attack_window: Cooldown,
    damage_cooldown: Cooldown,
    interact_cooldown: Cooldown,
    interact_window: Cooldown,
    /// A new swing must replay the attack clip even if one just ended.
    swing_pending: bool,
    animation: AnimationClock<PlayerState>,
}

impl Player {
    /// Place the player so its movement box is centered on the tile whose
    /// top-left corner is `tile_origin`.
    pub fn spawn(tile_origin: Vec2, cell_size: f32, tuning: &PlayerTuning, now_us: u64) -> Self {
        let size = tuning.size_cells * cell_size;
        let movement_center = Vec2::new(size / 3.0 + 0.15 * size, size / 2.0 + 0.225 * size);
        let tile_center = tile_origin + Vec2::splat(cell_size * 0.5);

        Self {
            position: tile_center - movement_center,
            size,
            speed: tuning.speed_cells * cell_size,
            facing: Direction::Right,
            facing_flip: false,
            health: Meter::full(tuning.health),
            magic: Meter::full(tuning.magic),
            actions: ActionFlags::default(),
            attack_damage: tuning.attack_damage,
            attack_cooldown_us: ms_to_us(tuning.attack_cooldown_ms),
            damage_cooldown_us: ms_to_us(tuning.damage_cooldown_ms),
            interact_cooldown_us: ms_to_us(tuning.interact_cooldown_ms),
            attack_cooldown: Cooldown::ready(),
            attack_window: Cooldown::ready(),
            damage_cooldown: Cooldown::ready(),
            interact_cooldown: Cooldown::ready(),
            interact_window: Cooldown::ready(),
            swing_pending: false,
            animation: AnimationClock::new(PlayerState::Idle, now_us),
        }
    }

    pub fn movement_box(&self) -> Aabb {
        let s = self.size;
        Aabb::new(
            self.position.x + s / 3.0,
            self.position.y + s / 2.0,
            0.3 * s,
            0.45 * s,
        )
    }

    pub fn damage_box(&self) -> Aabb {
        let s = self.size;
        Aabb::new(
            self.position.x + 0.3 * s,
            self.position.y + 0.2 * s,
            0.4 * s,
            0.75 * s,
        )
    }

    pub fn interaction_box(&self) -> Aabb {
        let s = self.size;
        Aabb::new(
            self.position.x - 0.1 * s,
            self.position.y - 0.1 * s,
            1.2 * s,
            1.2 * s,
        )
    }

    /// Half of the sprite on the facing side.
    pub fn attack_box(&self) -> Aabb {
        let s = self.size;
        let p = self.position;
        match self.facing {
            Direction::Left => Aabb::new(p.x, p.y, s * 0.5, s),
            Direction::Right => Aabb::new(p.x + s * 0.5, p.y, s * 0.5, s),
            Direction::Up => Aabb::new(p.x, p.y, s, s * 0.5),
            Direction::Down => Aabb::new(p.x, p.y + s * 0.5, s, s * 0.5),
        }
    }

    pub fn center(&self) -> Vec2 {
        self.position + Vec2::splat(self.size * 0.5)
    }

    pub fn is_dead(&self) -> bool {
        self.actions.dead
    }

    /// Displayed action state, picked by priority from the action flags.
    pub fn state(&self) -> PlayerState {
        let a = &self.actions;
        if a.dead {
            PlayerState::Dead
        } else if a.damaged {
            PlayerState::Damaged
        } else if a.attacking {
            PlayerState::Attacking
        } else if a.interacting {
            PlayerState::Interacting
        } else if a.moving {
            PlayerState::Moving
        } else {
            PlayerState::Idle
        }
    }

    pub fn tick_timers(&mut self, dt_us: u64) {
        if self.damage_cooldown.tick(dt_us) {
            self.actions.damaged = false;
        }
        if self.attack_window.tick(dt_us) {
            self.actions.attacking = false;
        }
        if self.interact_window.tick(dt_us) {
            self.actions.interacting = false;
        }
        self.attack_cooldown.tick(dt_us);
        self.interact_cooldown.tick(dt_us);
    }

    /// Apply held directions, vertical before horizontal. Each direction is
    /// its own all-or-nothing move. Returns true if the position changed.
    pub fn apply_movement(&mut self, input: &InputSnapshot, obstacles: &Obstacles<'_>) -> bool {
        if self.actions.dead || self.actions.damaged {
            self.actions.moving = false;
            return false;
        }
        self.actions.moving = input.any_direction();

        let held = [
            (input.up, Direction::Up),
            (input.down, Direction::Down),
            (input.left, Direction::Left),
            (input.right, Direction::Right),
        ];
        let mut moved = false;
        for (is_held, direction) in held {
            if !is_held {
                continue;
            }
            self.facing = direction;
            match direction {
                Direction::Left => self.facing_flip = false,
                Direction::Right => self.facing_flip = true,
                _ => {}
            }
            let delta = direction.unit() * self.speed;
            if try_move(&self.movement_box(), delta, obstacles) {
                self.position += delta;
                moved = true;
            }
        }
        moved
    }

    /// Returns false while already Damaged or Dead.
    pub fn take_contact_damage(&mut self, amount: u32) -> bool {
        if self.actions.damaged || self.actions.dead {
            return false;
        }
        self.health.subtract(amount);
        if self.health.is_empty() {
            self.die();
        } else {
            self.actions.damaged = true;
            self.damage_cooldown.start(self.damage_cooldown_us);
        }
        true
    }

    fn die(&mut self) {
        self.actions = ActionFlags {
            dead: true,
            ..ActionFlags::default()
        };
        self.damage_cooldown.clear();
        self.attack_window.clear();
        self.interact_window.clear();
    }

    /// Starts an attack if the cooldown has elapsed.
    pub fn try_start_attack(&mut self) -> bool {
        if self.actions.dead || self.attack_cooldown.is_active() {
            return false;
        }
        self.actions.attacking = true;
        self.attack_cooldown.start(self.attack_cooldown_us);
        self.attack_window.start(ATTACK_FRAMES.cycle_duration_us());
        self.swing_pending = true;
        true
    }

    pub fn can_interact(&self) -> bool {
        !self.actions.dead && !self.interact_cooldown.is_active()
    }

    pub fn begin_interaction(&mut self) {
        self.actions.interacting = true;
        self.interact_cooldown.start(self.interact_cooldown_us);
        self.interact_window.start(INTERACT_DISPLAY_US);
    }

    /// Sync the animation clock with the displayed state and advance it.
    pub fn animate(&mut self, now_us: u64) -> usize {
        let state = self.state();
        if std::mem::take(&mut self.swing_pending) && state == PlayerState::Attacking {
            self.animation.restart(state, now_us);
        } else {
            self.animation.set_state(state, now_us);
        }
        self.animation.advance(state.frame_table(), now_us)
    }

    pub fn frame_index(&self) -> usize {
        self.animation.frame_index()
    }
}
