//! One level session: every entity plus the fixed-order simulation tick.
//!
//! The driver owns a single `GameState` and calls `tick()` once per fixed
//! step with that step's input snapshot. Nothing else mutates simulation
//! state, and dropping the session drops every pending cooldown with it.

use std::collections::BTreeMap;

use dce_core::animation::{AnimationClock, FrameTable};
use dce_core::input::InputSnapshot;
use dce_devtools::HudStatus;

use crate::camera::Camera;
use crate::collision::{Aabb, CollisionGrid, Obstacles};
use crate::config::GameConfig;
use crate::door::{Door, DoorState};
use crate::error::GameError;
use crate::level::{Level, TileCoord};
use crate::mob::Mob;
use crate::player::Player;
use crate::tiles::{TileCatalog, TileInteraction};

const TORCH_FRAMES: FrameTable = FrameTable::looping(7, 125);

#[derive(Debug, Clone, PartialEq)]
pub enum TickEvent {
    PlayerDamaged { by: String, health: u32 },
    PlayerDied,
    MobHit { name: String, health: u32 },
    MobKilled { name: String },
    DoorToggled { id: String, state: DoorState },
    TileConsumed { tile: TileCoord, result_tile: String },
    InteractionRejected { reason: String },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub events: Vec<TickEvent>,
}

impl TickReport {
    fn push(&mut self, event: TickEvent) {
        self.events.push(event);
    }
}

#[derive(Debug, Clone)]
pub struct Torch {
    pub tile: TileCoord,
    animation: AnimationClock<()>,
}

impl Torch {
    pub fn frame_index(&self) -> usize {
        self.animation.frame_index()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InteractionTarget {
    Door(usize),
    Tile(TileCoord),
}

pub struct GameState {
    pub level: Level,
    pub grid: CollisionGrid,
    pub player: Player,
    pub mobs: Vec<Mob>,
    pub doors: Vec<Door>,
    pub torches: Vec<Torch>,
    pub camera: Camera,
    interactables: BTreeMap<TileCoord, TileInteraction>,
    hud: HudStatus,
    last_tick_us: u64,
}

impl GameState {
    /// Build a session at simulation time 0.
    pub fn new(level: Level, catalog: &TileCatalog, config: &GameConfig) -> Self {
        Self::new_at(level, catalog, config, 0)
    }

    pub fn new_at(level: Level, catalog: &TileCatalog, config: &GameConfig, now_us: u64) -> Self {
        let cell = level.cell_size;
        let grid = CollisionGrid::from_level(&level);

        for (coord, tile_id) in level.floor_tiles() {
            if let Err(err) = catalog.resolve(tile_id) {
                log::warn!("Level '{}' floor ({}, {}): {err}", level.id, coord.x, coord.y);
            }
        }
        let mut interactables = BTreeMap::new();
        for (coord, tile_id) in level.wall_tiles() {
            match catalog.resolve(tile_id) {
                Ok(resolved) => {
                    if let Some(interaction) = &resolved.interactable {
                        interactables.insert(*coord, interaction.clone());
                    }
                }
                Err(err) => {
                    log::warn!("Level '{}' wall ({}, {}): {err}", level.id, coord.x, coord.y)
                }
            }
        }

        let player = Player::spawn(level.tile_origin(level.start), cell, &config.player, now_us);
        let mobs = level
            .mobs
            .iter()
            .map(|spec| Mob::from_spec(spec, cell, &config.mob, now_us))
            .collect();
        let doors = level
            .doors
            .iter()
            .enumerate()
            .map(|(i, spec)| Door::from_spec(i, spec, cell, now_us))
            .collect();
        let torches = level
            .torches
            .iter()
            .map(|&tile| Torch {
                tile,
                animation: AnimationClock::new((), now_us),
            })
            .collect();
        let level_size = level.pixel_size();

        let mut state = Self {
            level,
            grid,
            player,
            mobs,
            doors,
            torches,
            camera: Camera::new(level_size.x, level_size.y),
            interactables,
            hud: HudStatus::default(),
            last_tick_us: now_us,
        };
        state.follow_player();
        state.refresh_hud();
        state
    }

    /// Resize the camera to the visible world area and re-center it.
    pub fn set_viewport(&mut self, width: f32, height: f32) {
        self.camera.width = width;
        self.camera.height = height;
        self.follow_player();
    }

    pub fn hud(&self) -> &HudStatus {
        &self.hud
    }

    pub fn live_mob_count(&self) -> usize {
        self.mobs.len()
    }

    pub fn is_interactable(&self, coord: TileCoord) -> bool {
        self.interactables.contains_key(&coord)
    }

    pub fn tick(&mut self, input: &InputSnapshot, now_us: u64) -> TickReport {
        let mut report = TickReport::default();
        let dt_us = now_us.saturating_sub(self.last_tick_us);
        self.last_tick_us = now_us;

        self.player.tick_timers(dt_us);
        for mob in &mut self.mobs {
            mob.tick_timers(dt_us);
        }

        for mob in &mut self.mobs {
            if mob.patrol() {
                log::trace!("{} heading to waypoint {}", mob.name, mob.waypoint_index());
            }
        }

        self.apply_contact_damage(&mut report);

        let door_boxes: Vec<Aabb> = self
            .doors
            .iter()
            .filter(|door| door.is_blocking())
            .map(|door| door.collision_box)
            .collect();
        let obstacles = Obstacles {
            walls: &self.grid,
            doors: &door_boxes,
        };
        self.player.apply_movement(input, &obstacles);

        if input.attack_pressed {
            self.attack(&mut report);
        }
        if input.interact_pressed {
            self.interact(now_us, &mut report);
        }

        self.mobs.retain(|mob| {
            if mob.is_dead() {
                log::info!("Mob '{}' defeated", mob.name);
                report.events.push(TickEvent::MobKilled {
                    name: mob.name.clone(),
                });
            }
            !mob.is_dead()
        });

        self.follow_player();
        self.animate(now_us);
        self.refresh_hud();
        report
    }

    fn apply_contact_damage(&mut self, report: &mut TickReport) {
        let damage_box = self.player.damage_box();
        for mob in &mut self.mobs {
            if self.player.actions.damaged || self.player.is_dead() {
                return;
            }
            if !mob.collision_box().overlaps(&damage_box) {
                continue;
            }
            let Some(damage) = mob.try_contact_attack() else {
                continue;
            };
            if self.player.take_contact_damage(damage) {
                report.push(TickEvent::PlayerDamaged {
                    by: mob.name.clone(),
                    health: self.player.health.current(),
                });
                if self.player.is_dead() {
                    log::info!("Player killed by '{}'", mob.name);
                    report.push(TickEvent::PlayerDied);
                }
            }
        }
    }

    fn attack(&mut self, report: &mut TickReport) {
        if !self.player.try_start_attack() {
            return;
        }
        let reach = self.player.attack_box();
        let damage = self.player.attack_damage;
        for mob in &mut self.mobs {
            if mob.collision_box().overlaps(&reach) && mob.take_hit(damage) {
                report.push(TickEvent::MobHit {
                    name: mob.name.clone(),
                    health: mob.health.current(),
                });
            }
        }
    }

    /// Target for the interact key. Usable doors win over usable tiles; a
    /// locked door or one the player stands in only comes back when nothing
    /// usable is in reach, so the attempt can be rejected with a reason.
    fn interaction_target(&self) -> Option<InteractionTarget> {
        self.nearest_door(true)
            .map(InteractionTarget::Door)
            .or_else(|| self.nearest_tile(true).map(InteractionTarget::Tile))
            .or_else(|| self.nearest_door(false).map(InteractionTarget::Door))
            .or_else(|| self.nearest_tile(false).map(InteractionTarget::Tile))
    }

    fn distance_to_player(&self, aabb: &Aabb) -> f32 {
        aabb.center().distance_squared(self.player.center())
    }

    fn nearest_door(&self, usable_only: bool) -> Option<usize> {
        let reach = self.player.interaction_box();
        let body = self.player.movement_box();
        self.doors
            .iter()
            .enumerate()
            .filter(|(_, door)| door.interaction_box.overlaps(&reach))
            .filter(|(_, door)| {
                !usable_only
                    || (door.state() != DoorState::Locked && !door.collision_box.overlaps(&body))
            })
            .min_by(|(_, a), (_, b)| {
                self.distance_to_player(&a.interaction_box)
                    .total_cmp(&self.distance_to_player(&b.interaction_box))
            })
            .map(|(i, _)| i)
    }

    fn nearest_tile(&self, usable_only: bool) -> Option<TileCoord> {
        let reach = self.player.interaction_box();
        let body = self.player.movement_box();
        self.interactables
            .keys()
            .map(|coord| (*coord, self.grid.cell_box(*coord)))
            .filter(|(_, cell)| cell.overlaps(&reach))
            .filter(|(_, cell)| !usable_only || !cell.overlaps(&body))
            .min_by(|(_, a), (_, b)| {
                self.distance_to_player(a)
                    .total_cmp(&self.distance_to_player(b))
            })
            .map(|(coord, _)| coord)
    }

    fn interact(&mut self, now_us: u64, report: &mut TickReport) {
        if !self.player.can_interact() {
            return;
        }
        let Some(target) = self.interaction_target() else {
            return;
        };
        let body = self.player.movement_box();

        match target {
            InteractionTarget::Door(index) => {
                let door = &mut self.doors[index];
                if door.collision_box.overlaps(&body) {
                    report.push(TickEvent::InteractionRejected {
                        reason: format!("standing in doorway {}", door.id),
                    });
                    return;
                }
                if !door.toggle(now_us) {
                    report.push(TickEvent::InteractionRejected {
                        reason: format!("door {} is locked", door.id),
                    });
                    return;
                }
                log::info!("Door {} -> {:?}", door.id, door.state());
                report.push(TickEvent::DoorToggled {
                    id: door.id.clone(),
                    state: door.state(),
                });
                self.player.begin_interaction();
            }
            InteractionTarget::Tile(coord) => {
                if self.grid.cell_box(coord).overlaps(&body) {
                    report.push(TickEvent::InteractionRejected {
                        reason: format!("standing on tile ({}, {})", coord.x, coord.y),
                    });
                    return;
                }
                match self.consume_tile(coord) {
                    Ok(result_tile) => {
                        report.push(TickEvent::TileConsumed {
                            tile: coord,
                            result_tile,
                        });
                        self.player.begin_interaction();
                    }
                    Err(err) => log::warn!("Interaction failed: {err}"),
                }
            }
        }
    }

    /// Lock or unlock the door in reach. Only closed or locked doors change.
    pub fn toggle_lock_in_reach(&mut self, now_us: u64) -> Option<TickEvent> {
        if self.player.is_dead() {
            return None;
        }
        let index = self.nearest_door(false)?;
        let door = &mut self.doors[index];
        if !door.toggle_lock(now_us) {
            return None;
        }
        log::info!("Door {} -> {:?}", door.id, door.state());
        let event = TickEvent::DoorToggled {
            id: door.id.clone(),
            state: door.state(),
        };
        self.refresh_hud();
        Some(event)
    }

    /// Replace an interactable wall tile with its result floor tile.
    fn consume_tile(&mut self, coord: TileCoord) -> Result<String, GameError> {
        let interaction = self.interactables.remove(&coord).ok_or_else(|| {
            GameError::InvalidCollisionState(format!(
                "tile ({}, {}) is not interactable",
                coord.x, coord.y
            ))
        })?;
        self.level.remove_wall_tile(coord)?;
        self.grid.remove(coord);
        self.level
            .replace_floor_tile(coord, &interaction.result_tile_key);
        log::info!(
            "Tile ({}, {}) consumed -> '{}'",
            coord.x,
            coord.y,
            interaction.result_tile_key
        );
        Ok(interaction.result_tile_key)
    }

    fn follow_player(&mut self) {
        self.camera
            .follow(self.player.center(), self.level.pixel_size());
    }

    fn animate(&mut self, now_us: u64) {
        self.player.animate(now_us);
        for mob in &mut self.mobs {
            mob.animate(now_us);
        }
        for door in &mut self.doors {
            door.animate(now_us);
        }
        for torch in &mut self.torches {
            torch.animation.advance(&TORCH_FRAMES, now_us);
        }
    }

    fn refresh_hud(&mut self) {
        let interaction_message = if self.player.is_dead() {
            None
        } else {
            self.interaction_target().and_then(|target| match target {
                InteractionTarget::Door(index) => {
                    self.doors.get(index).map(|door| door.message().to_string())
                }
                InteractionTarget::Tile(coord) => self
                    .interactables
                    .get(&coord)
                    .map(|interaction| interaction.message.clone()),
            })
        };

        self.hud = HudStatus {
            health: self.player.health.as_pair(),
            magic: self.player.magic.as_pair(),
            game_over: self.player.is_dead(),
            interaction_message,
        };
    }
}
