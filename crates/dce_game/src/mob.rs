//! Patrolling enemies.
//!
//! Mobs walk a fixed cyclic list of waypoints and never collide with walls;
//! their routes are authored to stay inside the dungeon. Being hit does not
//! stun a mob, it keeps patrolling while Damaged.

use dce_core::animation::{AnimationClock, FrameTable};
use dce_core::cooldown::{ms_to_us, Cooldown};
use glam::Vec2;

use crate::collision::Aabb;
use crate::config::MobTuning;
use crate::level::MobSpec;
use crate::meter::Meter;

const IDLE_FRAMES: FrameTable = FrameTable::looping(6, 175);
const DAMAGED_FRAMES: FrameTable = FrameTable::looping(4, 100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MobState {
    Idle,
    Moving,
    Damaged,
}

impl MobState {
    pub fn frame_table(self) -> &'static FrameTable {
        match self {
            MobState::Idle | MobState::Moving => &IDLE_FRAMES,
            MobState::Damaged => &DAMAGED_FRAMES,
        }
    }

    pub fn sheet_row(self) -> u32 {
        match self {
            MobState::Idle | MobState::Moving => 0,
            MobState::Damaged => 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Mob {
    pub name: String,
    /// Top-left of the sprite in world pixels.
    pub position: Vec2,
    pub size: f32,
    /// Pixels per tick.
    pub speed: f32,
    pub health: Meter,
    pub attack_damage: u32,
    pub facing_flip: bool,
    waypoints: Vec<Vec2>,
    next_waypoint: usize,
    moving: bool,
    damaged: bool,
    attack_cooldown_us: u64,
    damage_cooldown_us: u64,
    attack_cooldown: Cooldown,
    damage_cooldown: Cooldown,
    animation: AnimationClock<MobState>,
}

impl Mob {
    pub fn from_spec(spec: &MobSpec, cell_size: f32, tuning: &MobTuning, now_us: u64) -> Self {
        Self {
            name: spec.name.clone(),
            position: Vec2::new(spec.x, spec.y) * cell_size,
            size: tuning.size_cells * cell_size,
            speed: spec.speed.unwrap_or(tuning.speed_cells) * cell_size,
            health: Meter::full(spec.health.unwrap_or(tuning.health)),
            attack_damage: spec.attack_damage.unwrap_or(tuning.attack_damage),
            facing_flip: false,
            waypoints: spec
                .waypoints
                .iter()
                .map(|w| Vec2::new(w.x, w.y) * cell_size)
                .collect(),
            next_waypoint: 0,
            moving: false,
            damaged: false,
            attack_cooldown_us: ms_to_us(
                spec.attack_cooldown_ms.unwrap_or(tuning.attack_cooldown_ms),
            ),
            damage_cooldown_us: ms_to_us(
                spec.damage_cooldown_ms.unwrap_or(tuning.damage_cooldown_ms),
            ),
            attack_cooldown: Cooldown::ready(),
            damage_cooldown: Cooldown::ready(),
            animation: AnimationClock::new(MobState::Idle, now_us),
        }
    }

    pub fn collision_box(&self) -> Aabb {
        let m = self.size;
        Aabb::new(
            self.position.x + 0.3 * m,
            self.position.y + 0.15 * m,
            0.4 * m,
            0.7 * m,
        )
    }

    pub fn next_waypoint(&self) -> Option<Vec2> {
        self.waypoints.get(self.next_waypoint).copied()
    }

    pub fn waypoint_index(&self) -> usize {
        self.next_waypoint
    }

    pub fn is_damaged(&self) -> bool {
        self.damaged
    }

    pub fn is_dead(&self) -> bool {
        self.health.is_empty()
    }

    pub fn state(&self) -> MobState {
        if self.is_damaged() {
            MobState::Damaged
        } else if self.moving {
            MobState::Moving
        } else {
            MobState::Idle
        }
    }

    pub fn tick_timers(&mut self, dt_us: u64) {
        if self.damage_cooldown.tick(dt_us) {
            self.damaged = false;
        }
        self.attack_cooldown.tick(dt_us);
    }

    /// One patrol step. Within `speed` of the target the mob advances to the
    /// next waypoint instead of stepping. Returns true on arrival.
    pub fn patrol(&mut self) -> bool {
        let Some(target) = self.next_waypoint() else {
            self.moving = false;
            return false;
        };
        self.moving = true;

        let delta = target - self.position;
        let distance = delta.length();
        if distance <= self.speed {
            self.next_waypoint = (self.next_waypoint + 1) % self.waypoints.len();
            return true;
        }

        self.position += delta / distance * self.speed;
        self.facing_flip = delta.x > 0.0;
        false
    }

    /// Apply a player hit. Ignored while the damage cooldown runs.
    pub fn take_hit(&mut self, damage: u32) -> bool {
        if self.damage_cooldown.is_active() {
            return false;
        }
        self.health.subtract(damage);
        self.damaged = true;
        self.damage_cooldown.start(self.damage_cooldown_us);
        true
    }

    /// Damage dealt on contact, or None while the attack cooldown runs.
    pub fn try_contact_attack(&mut self) -> Option<u32> {
        if self.attack_cooldown.is_active() {
            return None;
        }
        self.attack_cooldown.start(self.attack_cooldown_us);
        Some(self.attack_damage)
    }

    pub fn animate(&mut self, now_us: u64) -> usize {
        let state = self.state();
        self.animation.set_state(state, now_us);
        self.animation.advance(state.frame_table(), now_us)
    }

    pub fn frame_index(&self) -> usize {
        self.animation.frame_index()
    }
}
