//! Level files: loading, validation and the in-memory level model.
//!
//! Canonical tile coordinates are `x` = column, `y` = row, both counted from
//! the top-left corner. Older level files store `baseMap`/`collisionMap` with
//! the axes swapped; they declare `"axisOrder": "yx"` and are normalized here,
//! so nothing past the loader ever sees transposed data.

use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use glam::Vec2;

use crate::error::{GameError, LevelLoadError};

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct LevelFile {
    pub level: LevelDimensions,
    #[serde(default)]
    pub start: Option<TilePoint>,
    #[serde(default)]
    pub axis_order: AxisOrder,
    pub base_map: Vec<MapTile>,
    pub collision_map: Vec<MapTile>,
    #[serde(default)]
    pub mobs: Vec<MobSpec>,
    #[serde(default)]
    pub doors: Vec<DoorSpec>,
    #[serde(default)]
    pub torches: Vec<TilePoint>,
}

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct LevelDimensions {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
pub enum AxisOrder {
    #[default]
    #[serde(rename = "xy")]
    Xy,
    #[serde(rename = "yx")]
    Yx,
}

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct TilePoint {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct MapTile {
    pub x: i32,
    pub y: i32,
    pub tile_key: String,
}

/// Mob placement. Position and waypoints are in tile units and may be
/// fractional; optional fields fall back to the configured mob defaults.
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct MobSpec {
    pub name: String,
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub waypoints: Vec<WaypointSpec>,
    #[serde(default)]
    pub health: Option<u32>,
    /// Tiles per tick.
    #[serde(default)]
    pub speed: Option<f32>,
    #[serde(default)]
    pub attack_damage: Option<u32>,
    #[serde(default)]
    pub attack_cooldown_ms: Option<u64>,
    #[serde(default)]
    pub damage_cooldown_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct WaypointSpec {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct DoorSpec {
    pub x: i32,
    pub y: i32,
    #[serde(default)]
    pub locked: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TileCoord {
    pub x: i32,
    pub y: i32,
}

impl TileCoord {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedTile {
    pub coord: TileCoord,
    pub tile_id: String,
}

/// A loaded level. Everything is fixed after load except consumed wall tiles
/// and the floor tiles that replace them.
#[derive(Debug, Clone)]
pub struct Level {
    pub id: String,
    pub width: u32,
    pub height: u32,
    /// World pixels per tile.
    pub cell_size: f32,
    pub start: TileCoord,
    floor_tiles: BTreeMap<TileCoord, String>,
    wall_tiles: BTreeMap<TileCoord, String>,
    pub doors: Vec<DoorSpec>,
    pub mobs: Vec<MobSpec>,
    pub torches: Vec<TileCoord>,
}

impl Level {
    pub fn floor_tiles(&self) -> impl Iterator<Item = (&TileCoord, &String)> {
        self.floor_tiles.iter()
    }

    pub fn wall_tiles(&self) -> impl Iterator<Item = (&TileCoord, &String)> {
        self.wall_tiles.iter()
    }

    pub fn floor_tile(&self, coord: TileCoord) -> Option<&str> {
        self.floor_tiles.get(&coord).map(String::as_str)
    }

    pub fn wall_tile(&self, coord: TileCoord) -> Option<&str> {
        self.wall_tiles.get(&coord).map(String::as_str)
    }

    pub fn remove_wall_tile(&mut self, coord: TileCoord) -> Result<PlacedTile, GameError> {
        self.wall_tiles
            .remove(&coord)
            .map(|tile_id| PlacedTile { coord, tile_id })
            .ok_or_else(|| {
                GameError::InvalidCollisionState(format!(
                    "no wall tile at ({}, {}) in level '{}'",
                    coord.x, coord.y, self.id
                ))
            })
    }

    /// Returns the previous floor tile id, if any.
    pub fn replace_floor_tile(&mut self, coord: TileCoord, tile_id: &str) -> Option<String> {
        self.floor_tiles.insert(coord, tile_id.to_string())
    }

    /// Level extent in world pixels.
    pub fn pixel_size(&self) -> Vec2 {
        Vec2::new(
            self.width as f32 * self.cell_size,
            self.height as f32 * self.cell_size,
        )
    }

    /// Top-left corner of a tile in world pixels.
    pub fn tile_origin(&self, coord: TileCoord) -> Vec2 {
        Vec2::new(coord.x as f32, coord.y as f32) * self.cell_size
    }
}

/// Polls a level file's mtime so edits are picked up at frame boundaries.
pub struct LevelWatcher {
    level_path: PathBuf,
    last_seen_modified: Option<SystemTime>,
}

impl LevelWatcher {
    pub fn new(level_path: PathBuf) -> Self {
        let last_seen_modified = modified_time(&level_path);
        Self {
            level_path,
            last_seen_modified,
        }
    }

    pub fn path(&self) -> &Path {
        &self.level_path
    }

    pub fn should_reload(&mut self) -> bool {
        let current = modified_time(&self.level_path);
        match (self.last_seen_modified, current) {
            (Some(old), Some(now)) if now > old => {
                self.last_seen_modified = Some(now);
                true
            }
            (None, Some(now)) => {
                self.last_seen_modified = Some(now);
                true
            }
            _ => false,
        }
    }
}

pub fn level_path(levels_dir: &Path, identifier: &str) -> PathBuf {
    levels_dir.join(format!("{identifier}.json"))
}

pub fn load_level(
    levels_dir: &Path,
    identifier: &str,
    cell_size: f32,
) -> Result<Level, LevelLoadError> {
    if identifier.is_empty()
        || identifier.contains(['/', '\\'])
        || identifier.contains("..")
    {
        return Err(LevelLoadError::Invalid(format!(
            "invalid level identifier '{identifier}'"
        )));
    }
    load_level_from_path(&level_path(levels_dir, identifier), cell_size)
}

pub fn load_level_from_path(path: &Path, cell_size: f32) -> Result<Level, LevelLoadError> {
    let raw = fs::read_to_string(path).map_err(|source| LevelLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let file: LevelFile = serde_json::from_str(&raw).map_err(|source| LevelLoadError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    let id = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let level = build_level(id, file, cell_size)?;
    log::info!(
        "Loaded level '{}' from {} ({}x{}, {} walls, {} mobs, {} doors)",
        level.id,
        path.display(),
        level.width,
        level.height,
        level.wall_tiles.len(),
        level.mobs.len(),
        level.doors.len()
    );
    Ok(level)
}

#[cfg(test)]
pub fn parse_level(id: &str, raw: &str, cell_size: f32) -> Result<Level, LevelLoadError> {
    let file: LevelFile = serde_json::from_str(raw).map_err(|source| LevelLoadError::Parse {
        path: PathBuf::from(id),
        source,
    })?;
    build_level(id.to_string(), file, cell_size)
}

fn build_level(id: String, mut file: LevelFile, cell_size: f32) -> Result<Level, LevelLoadError> {
    if file.axis_order == AxisOrder::Yx {
        for tile in file.base_map.iter_mut().chain(file.collision_map.iter_mut()) {
            std::mem::swap(&mut tile.x, &mut tile.y);
        }
    }
    validate_level(&file, cell_size)?;

    let LevelDimensions { width, height } = file.level;
    let floor_tiles = collect_layer(file.base_map);
    let wall_tiles = collect_layer(file.collision_map);

    let start = match file.start {
        Some(point) => TileCoord::new(point.x, point.y),
        None => floor_tiles
            .keys()
            .next()
            .copied()
            .unwrap_or(TileCoord::new(0, 0)),
    };

    Ok(Level {
        id,
        width,
        height,
        cell_size,
        start,
        floor_tiles,
        wall_tiles,
        doors: file.doors,
        mobs: file.mobs,
        torches: file
            .torches
            .iter()
            .map(|t| TileCoord::new(t.x, t.y))
            .collect(),
    })
}

fn collect_layer(tiles: Vec<MapTile>) -> BTreeMap<TileCoord, String> {
    tiles
        .into_iter()
        .map(|tile| (TileCoord::new(tile.x, tile.y), tile.tile_key))
        .collect()
}

fn validate_level(file: &LevelFile, cell_size: f32) -> Result<(), LevelLoadError> {
    let LevelDimensions { width, height } = file.level;

    if cell_size <= 0.0 {
        return invalid("cell size must be > 0".to_string());
    }
    if width == 0 || height == 0 {
        return invalid("level width and height must be > 0".to_string());
    }

    for (layer_name, layer) in [("baseMap", &file.base_map), ("collisionMap", &file.collision_map)] {
        let mut seen = HashSet::new();
        for tile in layer {
            let coord = TileCoord::new(tile.x, tile.y);
            if !in_bounds(width, height, coord) {
                return invalid(format!(
                    "{layer_name} tile '{}' out of bounds ({}, {})",
                    tile.tile_key, tile.x, tile.y
                ));
            }
            if !seen.insert(coord) {
                return invalid(format!(
                    "{layer_name} has duplicate tile at ({}, {})",
                    tile.x, tile.y
                ));
            }
        }
    }

    if let Some(start) = file.start {
        if !in_bounds(width, height, TileCoord::new(start.x, start.y)) {
            return invalid(format!("start ({}, {}) out of bounds", start.x, start.y));
        }
    }

    let mut door_cells = HashSet::new();
    for door in &file.doors {
        let coord = TileCoord::new(door.x, door.y);
        if !in_bounds(width, height, coord) {
            return invalid(format!("door out of bounds ({}, {})", door.x, door.y));
        }
        if !door_cells.insert(coord) {
            return invalid(format!("duplicate door at ({}, {})", door.x, door.y));
        }
    }

    for torch in &file.torches {
        if !in_bounds(width, height, TileCoord::new(torch.x, torch.y)) {
            return invalid(format!("torch out of bounds ({}, {})", torch.x, torch.y));
        }
    }

    let mut mob_names = HashSet::new();
    for mob in &file.mobs {
        if mob.name.is_empty() {
            return invalid("mob name must not be empty".to_string());
        }
        if !mob_names.insert(mob.name.as_str()) {
            return invalid(format!("duplicate mob name '{}'", mob.name));
        }
        if mob.speed.is_some_and(|speed| speed < 0.0) {
            return invalid(format!("mob '{}' has negative speed", mob.name));
        }
        if mob.health == Some(0) {
            return invalid(format!("mob '{}' starts with zero health", mob.name));
        }
    }

    Ok(())
}

fn invalid(msg: String) -> Result<(), LevelLoadError> {
    Err(LevelLoadError::Invalid(msg))
}

fn in_bounds(width: u32, height: u32, coord: TileCoord) -> bool {
    coord.x >= 0 && coord.y >= 0 && (coord.x as u32) < width && (coord.y as u32) < height
}

fn modified_time(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).ok()?.modified().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_dir_path(name_hint: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before unix epoch")
            .as_nanos();
        let dir = std::env::temp_dir().join(format!(
            "dce_level_test_{}_{}_{}",
            name_hint,
            std::process::id(),
            nanos
        ));
        fs::create_dir_all(&dir).expect("create temp level dir");
        dir
    }

    const SMALL_LEVEL: &str = r#"
    {
      "level": { "width": 4, "height": 3 },
      "start": { "x": 1, "y": 1 },
      "baseMap": [
        { "x": 1, "y": 1, "tileKey": "f1" },
        { "x": 2, "y": 1, "tileKey": "f1" }
      ],
      "collisionMap": [
        { "x": 3, "y": 1, "tileKey": "w1" }
      ],
      "mobs": [
        { "name": "ghoul", "x": 2, "y": 1, "waypoints": [ { "x": 2, "y": 1 }, { "x": 1, "y": 1 } ] }
      ],
      "doors": [ { "x": 0, "y": 1 } ],
      "torches": [ { "x": 0, "y": 0 } ]
    }
    "#;

    #[test]
    fn parse_level_builds_layers_and_entities() {
        let level = parse_level("small", SMALL_LEVEL, 24.0).expect("small level should parse");
        assert_eq!(level.id, "small");
        assert_eq!((level.width, level.height), (4, 3));
        assert_eq!(level.start, TileCoord::new(1, 1));
        assert_eq!(level.floor_tiles().count(), 2);
        assert_eq!(level.wall_tile(TileCoord::new(3, 1)), Some("w1"));
        assert_eq!(level.mobs.len(), 1);
        assert!(!level.doors[0].locked);
        assert_eq!(level.torches, vec![TileCoord::new(0, 0)]);
        assert_eq!(level.pixel_size(), Vec2::new(96.0, 72.0));
    }

    #[test]
    fn yx_axis_order_is_normalized_at_load() {
        let raw = r#"
        {
          "level": { "width": 5, "height": 2 },
          "axisOrder": "yx",
          "baseMap": [ { "x": 1, "y": 4, "tileKey": "f1" } ],
          "collisionMap": [ { "x": 0, "y": 3, "tileKey": "w1" } ]
        }
        "#;
        let level = parse_level("transposed", raw, 24.0).expect("yx level should parse");
        assert_eq!(level.floor_tile(TileCoord::new(4, 1)), Some("f1"));
        assert_eq!(level.wall_tile(TileCoord::new(3, 0)), Some("w1"));
    }

    #[test]
    fn missing_start_uses_first_floor_tile() {
        let raw = r#"
        {
          "level": { "width": 4, "height": 4 },
          "baseMap": [ { "x": 3, "y": 2, "tileKey": "f1" }, { "x": 2, "y": 3, "tileKey": "f1" } ],
          "collisionMap": []
        }
        "#;
        let level = parse_level("no_start", raw, 24.0).expect("level should parse");
        assert_eq!(level.start, TileCoord::new(2, 3));

        let empty = r#"{ "level": { "width": 2, "height": 2 }, "baseMap": [], "collisionMap": [] }"#;
        let level = parse_level("empty", empty, 24.0).expect("empty level should parse");
        assert_eq!(level.start, TileCoord::new(0, 0));
    }

    #[test]
    fn zero_dimensions_are_rejected() {
        let raw = r#"{ "level": { "width": 0, "height": 3 }, "baseMap": [], "collisionMap": [] }"#;
        let err = parse_level("zero", raw, 24.0).expect_err("zero width should fail");
        assert!(err.to_string().contains("width and height must be > 0"));
    }

    #[test]
    fn missing_collision_map_is_a_parse_error() {
        let raw = r#"{ "level": { "width": 2, "height": 2 }, "baseMap": [] }"#;
        let err = parse_level("partial", raw, 24.0).expect_err("collisionMap is required");
        assert!(matches!(err, LevelLoadError::Parse { .. }));
    }

    #[test]
    fn duplicate_coordinates_are_rejected() {
        let raw = r#"
        {
          "level": { "width": 4, "height": 4 },
          "baseMap": [],
          "collisionMap": [ { "x": 1, "y": 1, "tileKey": "w1" }, { "x": 1, "y": 1, "tileKey": "w2" } ]
        }
        "#;
        let err = parse_level("dup", raw, 24.0).expect_err("duplicate tile should fail");
        assert!(err.to_string().contains("duplicate tile at (1, 1)"));
    }

    #[test]
    fn out_of_bounds_tiles_are_rejected() {
        let raw = r#"
        {
          "level": { "width": 2, "height": 2 },
          "baseMap": [ { "x": 2, "y": 0, "tileKey": "f1" } ],
          "collisionMap": []
        }
        "#;
        let err = parse_level("oob", raw, 24.0).expect_err("out of bounds tile should fail");
        assert!(err.to_string().contains("out of bounds"));
    }

    #[test]
    fn duplicate_mob_names_are_rejected() {
        let raw = r#"
        {
          "level": { "width": 2, "height": 2 },
          "baseMap": [],
          "collisionMap": [],
          "mobs": [ { "name": "a", "x": 0, "y": 0 }, { "name": "a", "x": 1, "y": 1 } ]
        }
        "#;
        let err = parse_level("mobs", raw, 24.0).expect_err("duplicate mob names should fail");
        assert!(err.to_string().contains("duplicate mob name 'a'"));
    }

    #[test]
    fn wall_tile_removal_and_floor_replacement() {
        let mut level = parse_level("small", SMALL_LEVEL, 24.0).expect("level should parse");
        let removed = level
            .remove_wall_tile(TileCoord::new(3, 1))
            .expect("wall exists");
        assert_eq!(removed.tile_id, "w1");
        assert!(level.wall_tile(TileCoord::new(3, 1)).is_none());

        let err = level
            .remove_wall_tile(TileCoord::new(3, 1))
            .expect_err("second removal should fail");
        assert!(matches!(err, GameError::InvalidCollisionState(_)));

        assert_eq!(level.replace_floor_tile(TileCoord::new(1, 1), "f2"), Some("f1".to_string()));
        assert_eq!(level.replace_floor_tile(TileCoord::new(3, 1), "f2"), None);
        assert_eq!(level.floor_tile(TileCoord::new(3, 1)), Some("f2"));
    }

    #[test]
    fn load_level_resolves_identifier_in_directory() {
        let dir = temp_dir_path("load");
        fs::write(dir.join("crypt.json"), SMALL_LEVEL).expect("write level file");

        let level = load_level(&dir, "crypt", 24.0).expect("level should load");
        assert_eq!(level.id, "crypt");

        let err = load_level(&dir, "missing", 24.0).expect_err("missing level should fail");
        assert!(matches!(err, LevelLoadError::Io { .. }));

        let err = load_level(&dir, "../crypt", 24.0).expect_err("path escapes are rejected");
        assert!(matches!(err, LevelLoadError::Invalid(_)));

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn level_watcher_detects_newly_created_file() {
        let dir = temp_dir_path("watcher");
        let path = level_path(&dir, "watched");

        let mut watcher = LevelWatcher::new(path.clone());
        assert!(!watcher.should_reload(), "missing file should not reload");

        fs::write(&path, SMALL_LEVEL).expect("write level file");
        assert!(
            watcher.should_reload(),
            "creating file should trigger reload once"
        );
        assert!(
            !watcher.should_reload(),
            "without changes, second poll should not reload"
        );

        let _ = fs::remove_dir_all(dir);
    }
}
