//! CPU-side sprite mesh for one frame.
//!
//! The whole visible scene is rebuilt into a single vertex/index stream every
//! frame and split into draw calls by texture. Quads are emitted in paint
//! order (floor, walls, torches, doors, mobs, player, debug boxes), so runs of
//! quads sharing a sheet collapse into one `draw_indexed` call.

use std::sync::Arc;

use dce_render::SpriteVertex;

use crate::collision::Aabb;
use crate::game_state::GameState;
use crate::level::TileCoord;
use crate::tiles::TileCatalog;

pub const TILE_SHEET: &str = "tiles";
pub const PLAYER_SHEET: &str = "player";
pub const MOB_SHEET: &str = "mob";
pub const DOOR_SHEET: &str = "door";
pub const TORCH_SHEET: &str = "torch";
pub const DEBUG_WHITE: &str = "__debug_white";

const WHITE: [f32; 4] = [1.0, 1.0, 1.0, 1.0];
const WALL_BOX_COLOR: [f32; 4] = [0.9, 0.2, 0.2, 0.35];
const INTERACTABLE_BOX_COLOR: [f32; 4] = [0.3, 0.6, 1.0, 0.4];
const DOOR_BOX_COLOR: [f32; 4] = [0.95, 0.6, 0.1, 0.35];
const MOB_BOX_COLOR: [f32; 4] = [0.9, 0.1, 0.6, 0.45];
const MOVEMENT_BOX_COLOR: [f32; 4] = [0.2, 0.9, 0.3, 0.45];
const DAMAGE_BOX_COLOR: [f32; 4] = [0.95, 0.9, 0.2, 0.3];

/// Animation sheets are uniform grids: one row per action state, one column
/// per frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SheetGrid {
    pub columns: u32,
    pub rows: u32,
}

impl SheetGrid {
    pub const fn new(columns: u32, rows: u32) -> Self {
        Self { columns, rows }
    }

    /// Normalized `[u0, v0, u1, v1]` of one cell. Out-of-range cells clamp to
    /// the last column/row.
    pub fn uv(&self, column: u32, row: u32) -> [f32; 4] {
        let columns = self.columns.max(1);
        let rows = self.rows.max(1);
        let column = column.min(columns - 1);
        let row = row.min(rows - 1);
        let (cols, rows) = (columns as f32, rows as f32);
        [
            column as f32 / cols,
            row as f32 / rows,
            (column + 1) as f32 / cols,
            (row + 1) as f32 / rows,
        ]
    }
}

pub const PLAYER_GRID: SheetGrid = SheetGrid::new(7, 5);
pub const MOB_GRID: SheetGrid = SheetGrid::new(6, 2);
pub const DOOR_GRID: SheetGrid = SheetGrid::new(9, 1);
pub const TORCH_GRID: SheetGrid = SheetGrid::new(7, 1);

/// A contiguous run of indices that share the same texture binding.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCall {
    pub texture_key: Arc<str>,
    pub index_start: u32,
    pub index_count: u32,
}

pub struct QuadSpec<'a> {
    pub texture_key: &'a str,
    /// Top-left corner in world pixels.
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub uv: [f32; 4],
    pub color: [f32; 4],
    pub flip_x: bool,
}

#[derive(Debug, Default)]
pub struct SceneMesh {
    pub vertices: Vec<SpriteVertex>,
    pub indices: Vec<u32>,
    pub draw_calls: Vec<DrawCall>,
}

impl SceneMesh {
    pub fn with_capacity(quads: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(quads * 4),
            indices: Vec::with_capacity(quads * 6),
            draw_calls: Vec::with_capacity(16),
        }
    }

    pub fn sprite_count(&self) -> usize {
        self.vertices.len() / 4
    }

    pub fn add_quad(&mut self, spec: QuadSpec<'_>) {
        let [mut u0, v0, mut u1, v1] = spec.uv;
        if spec.flip_x {
            std::mem::swap(&mut u0, &mut u1);
        }
        let (x0, y0) = (spec.x, spec.y);
        let (x1, y1) = (spec.x + spec.width, spec.y + spec.height);
        let base_index = self.vertices.len() as u32;

        // y-down world: v0 is the top edge of the sprite.
        for (position, tex_coords) in [
            ([x0, y0], [u0, v0]),
            ([x1, y0], [u1, v0]),
            ([x1, y1], [u1, v1]),
            ([x0, y1], [u0, v1]),
        ] {
            self.vertices.push(SpriteVertex {
                position,
                tex_coords,
                color: spec.color,
            });
        }

        let draw_start = self.indices.len() as u32;
        self.indices.extend_from_slice(&[
            base_index,
            base_index + 1,
            base_index + 2,
            base_index,
            base_index + 2,
            base_index + 3,
        ]);

        push_draw_call(
            &mut self.draw_calls,
            Arc::from(spec.texture_key),
            draw_start,
            6,
        );
    }

    fn add_debug_box(&mut self, aabb: &Aabb, color: [f32; 4]) {
        self.add_quad(QuadSpec {
            texture_key: DEBUG_WHITE,
            x: aabb.x,
            y: aabb.y,
            width: aabb.w,
            height: aabb.h,
            uv: [0.0, 0.0, 1.0, 1.0],
            color,
            flip_x: false,
        });
    }
}

/// Append a draw call, merging with the previous one when the texture matches
/// and indices are contiguous.
pub fn push_draw_call(
    draw_calls: &mut Vec<DrawCall>,
    texture_key: Arc<str>,
    index_start: u32,
    index_count: u32,
) {
    if let Some(last) = draw_calls.last_mut() {
        let contiguous = last.index_start + last.index_count == index_start;
        if *last.texture_key == *texture_key && contiguous {
            last.index_count += index_count;
            return;
        }
    }
    draw_calls.push(DrawCall {
        texture_key,
        index_start,
        index_count,
    });
}

/// Number of bind-group switches the render pass will issue.
pub fn count_texture_binds(draw_calls: &[DrawCall]) -> usize {
    let mut binds = 0usize;
    let mut current: Option<&str> = None;
    for draw in draw_calls {
        let key: &str = &draw.texture_key;
        if current != Some(key) {
            current = Some(key);
            binds += 1;
        }
    }
    binds
}

/// Inclusive tile range covering the camera view, clipped to the level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TileRange {
    x0: i32,
    y0: i32,
    x1: i32,
    y1: i32,
}

impl TileRange {
    fn visible(game: &GameState) -> Self {
        let level = &game.level;
        let cell = level.cell_size;
        let camera = &game.camera;
        let last_x = level.width.min(i32::MAX as u32) as i32 - 1;
        let last_y = level.height.min(i32::MAX as u32) as i32 - 1;
        Self {
            x0: ((camera.x / cell).floor() as i32).max(0),
            y0: ((camera.y / cell).floor() as i32).max(0),
            x1: (((camera.x + camera.width) / cell).ceil() as i32).min(last_x),
            y1: (((camera.y + camera.height) / cell).ceil() as i32).min(last_y),
        }
    }

    fn len(&self) -> usize {
        if self.x1 < self.x0 || self.y1 < self.y0 {
            return 0;
        }
        ((self.x1 - self.x0) as usize + 1) * ((self.y1 - self.y0) as usize + 1)
    }

    fn coords(self) -> impl Iterator<Item = TileCoord> {
        (self.y0..=self.y1).flat_map(move |y| (self.x0..=self.x1).map(move |x| TileCoord::new(x, y)))
    }
}

fn add_tile(
    mesh: &mut SceneMesh,
    game: &GameState,
    catalog: &TileCatalog,
    coord: TileCoord,
    tile_id: &str,
) {
    // Unknown ids were reported once when the level was built.
    let Ok(tile) = catalog.resolve(tile_id) else {
        log::trace!("Skipping unknown tile '{tile_id}'");
        return;
    };
    let origin = game.level.tile_origin(coord);
    let cell = game.level.cell_size;
    mesh.add_quad(QuadSpec {
        texture_key: TILE_SHEET,
        x: origin.x,
        y: origin.y,
        width: cell,
        height: cell,
        uv: catalog.uv_rect(tile.sprite_rect),
        color: WHITE,
        flip_x: false,
    });
}

pub fn build_mesh(game: &GameState, catalog: &TileCatalog, show_collision: bool) -> SceneMesh {
    let cell = game.level.cell_size;
    let range = TileRange::visible(game);
    // Floor and wall per visible cell, then entities. Debug boxes grow the buffers.
    let entities = game.mobs.len() + game.doors.len() + game.torches.len() + 1;
    let mut mesh = SceneMesh::with_capacity(range.len() * 2 + entities);

    for coord in range.coords() {
        if let Some(tile_id) = game.level.floor_tile(coord) {
            add_tile(&mut mesh, game, catalog, coord, tile_id);
        }
    }
    for coord in range.coords() {
        if let Some(tile_id) = game.level.wall_tile(coord) {
            add_tile(&mut mesh, game, catalog, coord, tile_id);
        }
    }

    for torch in &game.torches {
        let origin = game.level.tile_origin(torch.tile);
        mesh.add_quad(QuadSpec {
            texture_key: TORCH_SHEET,
            x: origin.x,
            y: origin.y,
            width: cell,
            height: cell,
            uv: TORCH_GRID.uv(torch.frame_index() as u32, 0),
            color: WHITE,
            flip_x: false,
        });
    }

    for door in &game.doors {
        let b = door.collision_box;
        mesh.add_quad(QuadSpec {
            texture_key: DOOR_SHEET,
            x: b.x,
            y: b.y,
            width: b.w,
            height: b.h,
            uv: DOOR_GRID.uv(door.sprite_column(), 0),
            color: WHITE,
            flip_x: false,
        });
    }

    // Painter's order: mobs further down the screen draw on top.
    let mut mob_order: Vec<usize> = (0..game.mobs.len()).collect();
    mob_order.sort_by(|&a, &b| {
        game.mobs[a]
            .position
            .y
            .total_cmp(&game.mobs[b].position.y)
    });
    for index in mob_order {
        let mob = &game.mobs[index];
        mesh.add_quad(QuadSpec {
            texture_key: MOB_SHEET,
            x: mob.position.x,
            y: mob.position.y,
            width: mob.size,
            height: mob.size,
            uv: MOB_GRID.uv(mob.frame_index() as u32, mob.state().sheet_row()),
            color: WHITE,
            flip_x: mob.facing_flip,
        });
    }

    let player = &game.player;
    mesh.add_quad(QuadSpec {
        texture_key: PLAYER_SHEET,
        x: player.position.x,
        y: player.position.y,
        width: player.size,
        height: player.size,
        uv: PLAYER_GRID.uv(player.frame_index() as u32, player.state().sheet_row()),
        color: WHITE,
        flip_x: player.facing_flip,
    });

    if show_collision {
        for coord in game.grid.solids_iter() {
            let color = if game.is_interactable(*coord) {
                INTERACTABLE_BOX_COLOR
            } else {
                WALL_BOX_COLOR
            };
            mesh.add_debug_box(&game.grid.cell_box(*coord), color);
        }
        for door in game.doors.iter().filter(|door| door.is_blocking()) {
            mesh.add_debug_box(&door.collision_box, DOOR_BOX_COLOR);
        }
        for mob in &game.mobs {
            mesh.add_debug_box(&mob.collision_box(), MOB_BOX_COLOR);
        }
        mesh.add_debug_box(&player.damage_box(), DAMAGE_BOX_COLOR);
        mesh.add_debug_box(&player.movement_box(), MOVEMENT_BOX_COLOR);
    }

    mesh
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::level::parse_level;
    use crate::tiles::test_catalog;

    fn game(raw: &str) -> GameState {
        let level = parse_level("mesh", raw, 24.0).expect("test level should parse");
        GameState::new(level, &test_catalog(), &GameConfig::default())
    }

    const ROOM: &str = r#"
    {
      "level": { "width": 4, "height": 3 },
      "start": { "x": 1, "y": 1 },
      "baseMap": [
        { "x": 0, "y": 1, "tileKey": "f1" },
        { "x": 1, "y": 1, "tileKey": "f2" },
        { "x": 2, "y": 1, "tileKey": "f1" }
      ],
      "collisionMap": [ { "x": 3, "y": 1, "tileKey": "w1" } ],
      "mobs": [ { "name": "ghoul", "x": 2, "y": 2 } ],
      "doors": [ { "x": 1, "y": 0 } ]
    }
    "#;

    fn texture_keys(mesh: &SceneMesh) -> Vec<&str> {
        mesh.draw_calls
            .iter()
            .map(|draw| &*draw.texture_key)
            .collect()
    }

    #[test]
    fn consecutive_quads_sharing_a_sheet_batch_into_one_call() {
        let mesh = build_mesh(&game(ROOM), &test_catalog(), false);
        assert_eq!(
            texture_keys(&mesh),
            vec![TILE_SHEET, DOOR_SHEET, MOB_SHEET, PLAYER_SHEET]
        );
        assert_eq!(mesh.draw_calls[0].index_count, 4 * 6);
        assert_eq!(mesh.sprite_count(), 7);
        assert_eq!(count_texture_binds(&mesh.draw_calls), 4);
        assert_eq!(mesh.indices.len(), 7 * 6);
    }

    #[test]
    fn collision_overlay_appends_debug_boxes() {
        let plain = build_mesh(&game(ROOM), &test_catalog(), false);
        let debug = build_mesh(&game(ROOM), &test_catalog(), true);
        // wall + closed door + mob + player damage + player movement
        assert_eq!(debug.sprite_count(), plain.sprite_count() + 5);
        assert_eq!(
            debug.draw_calls.last().map(|draw| &*draw.texture_key),
            Some(DEBUG_WHITE)
        );
    }

    #[test]
    fn unknown_tiles_are_skipped() {
        let mesh = build_mesh(
            &game(
                r#"{ "level": { "width": 2, "height": 1 }, "baseMap": [
                       { "x": 0, "y": 0, "tileKey": "f1" },
                       { "x": 1, "y": 0, "tileKey": "missing" } ],
                     "collisionMap": [] }"#,
            ),
            &test_catalog(),
            false,
        );
        // one floor tile + player
        assert_eq!(mesh.sprite_count(), 2);
    }

    #[test]
    fn tiles_outside_the_view_are_culled() {
        let raw = r#"{ "level": { "width": 40, "height": 1 }, "start": { "x": 0, "y": 0 },
                       "baseMap": [ { "x": 0, "y": 0, "tileKey": "f1" }, { "x": 39, "y": 0, "tileKey": "f1" } ],
                       "collisionMap": [] }"#;
        let mut state = game(raw);
        state.set_viewport(96.0, 24.0);
        let mesh = build_mesh(&state, &test_catalog(), false);
        assert_eq!(mesh.sprite_count(), 2);
    }

    #[test]
    fn huge_empty_level_only_reserves_the_view() {
        let mut state = game(
            r#"{ "level": { "width": 70000, "height": 70000 },
                 "baseMap": [ { "x": 0, "y": 0, "tileKey": "f1" } ], "collisionMap": [] }"#,
        );
        state.set_viewport(480.0, 320.0);
        let range = TileRange::visible(&state);
        assert_eq!((range.x0, range.y0), (0, 0));
        assert_eq!(range.len(), 21 * 15);

        let mesh = build_mesh(&state, &test_catalog(), false);
        // one floor tile + player
        assert_eq!(mesh.sprite_count(), 2);
        assert!(mesh.vertices.capacity() < 4 * 1024);
    }

    #[test]
    fn tile_range_is_clipped_to_the_level() {
        let mut state = game(
            r#"{ "level": { "width": 3, "height": 2 },
                 "baseMap": [ { "x": 0, "y": 0, "tileKey": "f1" } ], "collisionMap": [] }"#,
        );
        state.set_viewport(480.0, 320.0);
        let range = TileRange::visible(&state);
        assert_eq!(range.len(), 6);
        assert_eq!(range.coords().count(), 6);
        assert!(range.coords().all(|c| c.x < 3 && c.y < 2));
    }

    #[test]
    fn tile_quad_uses_catalog_rect_and_y_down_corners() {
        let mesh = build_mesh(
            &game(
                r#"{ "level": { "width": 1, "height": 1 },
                     "baseMap": [ { "x": 0, "y": 0, "tileKey": "f2" } ], "collisionMap": [] }"#,
            ),
            &test_catalog(),
            false,
        );
        let quad = &mesh.vertices[0..4];
        assert_eq!(quad[0].position, [0.0, 0.0]);
        assert_eq!(quad[2].position, [24.0, 24.0]);
        assert_eq!(quad[0].tex_coords, [0.25, 0.0]);
        assert_eq!(quad[2].tex_coords, [0.5, 0.25]);
    }

    #[test]
    fn flip_swaps_horizontal_texture_coordinates() {
        let mut mesh = SceneMesh::default();
        mesh.add_quad(QuadSpec {
            texture_key: PLAYER_SHEET,
            x: 0.0,
            y: 0.0,
            width: 10.0,
            height: 10.0,
            uv: [0.0, 0.0, 0.5, 1.0],
            color: WHITE,
            flip_x: true,
        });
        assert_eq!(mesh.vertices[0].tex_coords, [0.5, 0.0]);
        assert_eq!(mesh.vertices[1].tex_coords, [0.0, 0.0]);
    }

    #[test]
    fn draw_calls_split_when_texture_changes_back() {
        let mut calls = Vec::new();
        push_draw_call(&mut calls, Arc::from("a"), 0, 6);
        push_draw_call(&mut calls, Arc::from("a"), 6, 6);
        push_draw_call(&mut calls, Arc::from("b"), 12, 6);
        push_draw_call(&mut calls, Arc::from("a"), 18, 6);
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0].index_count, 12);
        assert_eq!(count_texture_binds(&calls), 3);
    }

    #[test]
    fn sheet_grid_clamps_out_of_range_cells() {
        assert_eq!(DOOR_GRID.uv(8, 0), DOOR_GRID.uv(20, 3));
        let [u0, v0, u1, v1] = PLAYER_GRID.uv(0, 4);
        assert_eq!((u0, v1), (0.0, 1.0));
        assert!((u1 - 1.0 / 7.0).abs() < 1e-6);
        assert!((v0 - 0.8).abs() < 1e-6);
    }
}
