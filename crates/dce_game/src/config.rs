//! Game tuning loaded from `assets/config/game.json`.
//!
//! Every field has a default so the file is optional and may be partial.
//! Distances are authored in cells and converted to pixels once the catalog
//! cell size is known.

use std::fs;
use std::path::Path;

use dce_platform::window::PlatformConfig;
use serde::Deserialize;

use crate::error::GameError;

pub const CONFIG_PATH: &str = "assets/config/game.json";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub levels_dir: String,
    pub catalog_path: String,
    pub sprite_sheet_path: String,
    pub player_sheet_path: String,
    pub mob_sheet_path: String,
    pub door_sheet_path: String,
    pub torch_sheet_path: String,
    pub default_level: String,
    /// World pixels per catalog pixel.
    pub tile_scale: f32,
    pub zoom: f32,
    pub show_collision_debug: bool,
    pub window: PlatformConfig,
    pub player: PlayerTuning,
    pub mob: MobTuning,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlayerTuning {
    pub speed_cells: f32,
    pub size_cells: f32,
    pub health: u32,
    pub magic: u32,
    pub attack_damage: u32,
    pub attack_cooldown_ms: u64,
    pub damage_cooldown_ms: u64,
    pub interact_cooldown_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MobTuning {
    pub speed_cells: f32,
    pub size_cells: f32,
    pub health: u32,
    pub attack_damage: u32,
    pub attack_cooldown_ms: u64,
    pub damage_cooldown_ms: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            levels_dir: "assets/levels".to_string(),
            catalog_path: "assets/tiles/dungeon_details.json".to_string(),
            sprite_sheet_path: "assets/textures/dungeon_sheet.png".to_string(),
            player_sheet_path: "assets/textures/player_sheet.png".to_string(),
            mob_sheet_path: "assets/textures/mob_sheet.png".to_string(),
            door_sheet_path: "assets/textures/door_sheet.png".to_string(),
            torch_sheet_path: "assets/textures/torch_sheet.png".to_string(),
            default_level: "level_one".to_string(),
            tile_scale: 1.5,
            zoom: 2.0,
            show_collision_debug: false,
            window: PlatformConfig::default(),
            player: PlayerTuning::default(),
            mob: MobTuning::default(),
        }
    }
}

impl Default for PlayerTuning {
    fn default() -> Self {
        Self {
            speed_cells: 0.0625,
            size_cells: 1.5,
            health: 5,
            magic: 1,
            attack_damage: 1,
            attack_cooldown_ms: 1000,
            damage_cooldown_ms: 1000,
            interact_cooldown_ms: 1000,
        }
    }
}

impl Default for MobTuning {
    fn default() -> Self {
        Self {
            speed_cells: 0.02,
            size_cells: 1.0,
            health: 2,
            attack_damage: 1,
            attack_cooldown_ms: 1000,
            damage_cooldown_ms: 500,
        }
    }
}

impl GameConfig {
    /// World cell size in pixels for a catalog cell size.
    pub fn world_cell_size(&self, catalog_cell_size: u32) -> f32 {
        catalog_cell_size as f32 * self.tile_scale
    }
}

pub fn load_config_from_path(path: &Path) -> Result<GameConfig, GameError> {
    let raw = fs::read_to_string(path)
        .map_err(|e| GameError::Config(format!("failed to read {}: {e}", path.display())))?;
    let config: GameConfig = serde_json::from_str(&raw)
        .map_err(|e| GameError::Config(format!("failed to parse {}: {e}", path.display())))?;
    validate_config(&config)?;
    Ok(config)
}

/// Missing file means defaults; a broken file is logged and also falls back.
pub fn load_config_or_default(path: &Path) -> GameConfig {
    if !path.exists() {
        log::info!("No config at {}, using defaults", path.display());
        return GameConfig::default();
    }
    match load_config_from_path(path) {
        Ok(config) => {
            log::info!("Loaded config from {}", path.display());
            config
        }
        Err(err) => {
            log::warn!("{err}; using defaults");
            GameConfig::default()
        }
    }
}

fn validate_config(config: &GameConfig) -> Result<(), GameError> {
    if config.tile_scale <= 0.0 {
        return Err(GameError::Config("tile_scale must be > 0".to_string()));
    }
    if config.zoom <= 0.0 {
        return Err(GameError::Config("zoom must be > 0".to_string()));
    }
    if config.player.size_cells <= 0.0 || config.mob.size_cells <= 0.0 {
        return Err(GameError::Config("entity sizes must be > 0".to_string()));
    }
    if config.window.width == 0 || config.window.height == 0 {
        return Err(GameError::Config("window size must be > 0".to_string()));
    }
    if config.player.health == 0 {
        return Err(GameError::Config("player health must be > 0".to_string()));
    }
    Ok(())
}
