//! Tile catalog loading and tile-id resolution.
//!
//! The catalog maps tile ids used by level files to source rectangles on the
//! dungeon sprite sheet, plus the layer the tile belongs to and an optional
//! interaction (a tile that turns into another tile when used).
//!
//! `TileCatalog::resolve(tile_id)` is the lookup used by both the collision
//! build and the mesh builder. It is pure and read-only after load.

use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use crate::error::UnknownTileError;

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TileCatalogFile {
    pub cell_size: u32,
    pub sprite_sheet_size: SheetSize,
    pub tile_key: Vec<TileDefinition>,
}

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct SheetSize {
    pub x: u32,
    pub y: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TileDefinition {
    pub id: String,
    /// Sprite sheet x offset in pixels.
    pub x: u32,
    /// Sprite sheet y offset in pixels.
    pub y: u32,
    pub layer: TileLayer,
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub interact: Option<TileInteraction>,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TileLayer {
    #[serde(alias = "floor")]
    Base,
    #[serde(alias = "wall")]
    Collision,
    Object,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TileInteraction {
    pub message: String,
    pub result_tile_key: String,
}

/// Source rectangle on the sprite sheet, in sheet pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpriteRect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTile {
    pub sprite_rect: SpriteRect,
    pub layer: TileLayer,
    pub interactable: Option<TileInteraction>,
}

#[derive(Debug, Clone)]
pub struct TileCatalog {
    pub cell_size: u32,
    pub sheet_size: (u32, u32),
    tiles: HashMap<String, ResolvedTile>,
}

impl TileCatalog {
    pub fn from_file(file: TileCatalogFile) -> Result<Self, String> {
        validate_catalog(&file)?;
        let cell = file.cell_size;
        let tiles = file
            .tile_key
            .into_iter()
            .map(|def| {
                (
                    def.id,
                    ResolvedTile {
                        sprite_rect: SpriteRect {
                            x: def.x,
                            y: def.y,
                            w: cell,
                            h: cell,
                        },
                        layer: def.layer,
                        interactable: def.interact,
                    },
                )
            })
            .collect();
        Ok(Self {
            cell_size: file.cell_size,
            sheet_size: (file.sprite_sheet_size.x, file.sprite_sheet_size.y),
            tiles,
        })
    }

    pub fn resolve(&self, tile_id: &str) -> Result<&ResolvedTile, UnknownTileError> {
        self.tiles
            .get(tile_id)
            .ok_or_else(|| UnknownTileError(tile_id.to_string()))
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    /// Normalized `[u0, v0, u1, v1]` for a sheet rectangle.
    pub fn uv_rect(&self, rect: SpriteRect) -> [f32; 4] {
        let (sheet_w, sheet_h) = (self.sheet_size.0 as f32, self.sheet_size.1 as f32);
        [
            rect.x as f32 / sheet_w,
            rect.y as f32 / sheet_h,
            (rect.x + rect.w) as f32 / sheet_w,
            (rect.y + rect.h) as f32 / sheet_h,
        ]
    }
}

pub fn load_tile_catalog_from_path(path: &Path) -> Result<TileCatalog, String> {
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read tile catalog {}: {e}", path.display()))?;
    let file: TileCatalogFile = serde_json::from_str(&raw)
        .map_err(|e| format!("Failed to parse tile catalog {}: {e}", path.display()))?;
    let catalog = TileCatalog::from_file(file)?;
    log::info!(
        "Loaded tile catalog {} ({} tiles, cell size {})",
        path.display(),
        catalog.len(),
        catalog.cell_size
    );
    Ok(catalog)
}

fn validate_catalog(file: &TileCatalogFile) -> Result<(), String> {
    if file.cell_size == 0 {
        return Err("Tile catalog validation failed: cellSize must be > 0".to_string());
    }
    if file.sprite_sheet_size.x == 0 || file.sprite_sheet_size.y == 0 {
        return Err("Tile catalog validation failed: spriteSheetSize must be > 0".to_string());
    }

    let mut ids = HashSet::new();
    for def in &file.tile_key {
        if !ids.insert(def.id.as_str()) {
            return Err(format!(
                "Tile catalog validation failed: duplicate tile id '{}'",
                def.id
            ));
        }
        let right = def.x.checked_add(file.cell_size);
        let bottom = def.y.checked_add(file.cell_size);
        let inside = matches!(
            (right, bottom),
            (Some(r), Some(b)) if r <= file.sprite_sheet_size.x && b <= file.sprite_sheet_size.y
        );
        if !inside {
            return Err(format!(
                "Tile catalog validation failed: tile '{}' rect exceeds sprite sheet bounds",
                def.id
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
pub(crate) fn test_catalog() -> TileCatalog {
    let file: TileCatalogFile = serde_json::from_str(
        r#"{
          "cellSize": 16,
          "spriteSheetSize": { "x": 64, "y": 64 },
          "tileKey": [
            { "id": "f1", "x": 0, "y": 0, "layer": "base" },
            { "id": "f2", "x": 16, "y": 0, "layer": "base" },
            { "id": "w1", "x": 0, "y": 16, "layer": "collision" },
            { "id": "chest", "x": 16, "y": 16, "layer": "collision",
              "interact": { "message": "Open chest?", "resultTileKey": "f2" } },
            { "id": "skull", "x": 32, "y": 16, "layer": "object", "detail": "bones" }
          ]
        }"#,
    )
    .expect("test catalog should parse");
    TileCatalog::from_file(file).expect("test catalog should validate")
}
