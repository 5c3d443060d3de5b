//! Axis-aligned box collision for movement, contact damage and interaction.
//!
//! Boxes use a top-left origin with y growing downward, matching tile
//! coordinates. Overlap is strict: boxes that only share an edge do not
//! collide, so an entity can stand flush against a wall.
//!
//! Walls are kept in a cell set built from the level's collision layer. A move
//! is tested against only the cells its box touches, so the cost does not grow
//! with level size. Movement is all-or-nothing: a rejected move leaves the
//! entity where it was, and there is no sliding or partial resolution.

use std::collections::HashSet;

use glam::Vec2;

use crate::level::{Level, TileCoord};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Aabb {
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.w * 0.5, self.y + self.h * 0.5)
    }

    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.x < other.right()
            && self.right() > other.x
            && self.y < other.bottom()
            && self.bottom() > other.y
    }

    pub fn translated(&self, delta: Vec2) -> Aabb {
        Aabb {
            x: self.x + delta.x,
            y: self.y + delta.y,
            ..*self
        }
    }
}

#[derive(Debug, Clone)]
pub struct CollisionGrid {
    pub cell_size: f32,
    solids: HashSet<TileCoord>,
}

impl CollisionGrid {
    pub fn from_level(level: &Level) -> Self {
        Self {
            cell_size: level.cell_size,
            solids: level.wall_tiles().map(|(coord, _)| *coord).collect(),
        }
    }

    pub fn is_solid(&self, coord: TileCoord) -> bool {
        self.solids.contains(&coord)
    }

    /// Returns false if the cell was not solid.
    pub fn remove(&mut self, coord: TileCoord) -> bool {
        self.solids.remove(&coord)
    }

    pub fn solids_iter(&self) -> impl Iterator<Item = &TileCoord> {
        self.solids.iter()
    }

    pub fn cell_box(&self, coord: TileCoord) -> Aabb {
        Aabb::new(
            coord.x as f32 * self.cell_size,
            coord.y as f32 * self.cell_size,
            self.cell_size,
            self.cell_size,
        )
    }

    pub fn overlaps(&self, aabb: &Aabb) -> bool {
        let x0 = (aabb.x / self.cell_size).floor() as i32;
        let x1 = (aabb.right() / self.cell_size).floor() as i32;
        let y0 = (aabb.y / self.cell_size).floor() as i32;
        let y1 = (aabb.bottom() / self.cell_size).floor() as i32;

        for y in y0..=y1 {
            for x in x0..=x1 {
                let coord = TileCoord::new(x, y);
                if self.is_solid(coord) && self.cell_box(coord).overlaps(aabb) {
                    return true;
                }
            }
        }
        false
    }
}

/// Everything that can block a move this tick.
pub struct Obstacles<'a> {
    pub walls: &'a CollisionGrid,
    /// Collision boxes of doors currently in a blocking state.
    pub doors: &'a [Aabb],
}

impl Obstacles<'_> {
    pub fn blocks(&self, aabb: &Aabb) -> bool {
        self.walls.overlaps(aabb) || self.doors.iter().any(|door| door.overlaps(aabb))
    }
}

/// Accepts the move iff the translated box hits no obstacle. Level edges are
/// not obstacles; only the camera is clamped to the level.
pub fn try_move(movement_box: &Aabb, delta: Vec2, obstacles: &Obstacles<'_>) -> bool {
    !obstacles.blocks(&movement_box.translated(delta))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::parse_level;

    fn grid_with_wall_at(x: i32, y: i32) -> CollisionGrid {
        let raw = format!(
            r#"{{
              "level": {{ "width": 8, "height": 8 }},
              "baseMap": [],
              "collisionMap": [ {{ "x": {x}, "y": {y}, "tileKey": "w1" }} ]
            }}"#
        );
        let level = parse_level("walls", &raw, 32.0).expect("wall level should parse");
        CollisionGrid::from_level(&level)
    }

    #[test]
    fn overlap_is_strict_on_shared_edges() {
        let a = Aabb::new(0.0, 0.0, 10.0, 10.0);
        let touching = Aabb::new(10.0, 0.0, 10.0, 10.0);
        let overlapping = Aabb::new(9.5, 9.5, 10.0, 10.0);
        assert!(!a.overlaps(&touching));
        assert!(!touching.overlaps(&a));
        assert!(a.overlaps(&overlapping));
        assert!(overlapping.overlaps(&a));
    }

    #[test]
    fn grid_checks_only_real_overlap() {
        let grid = grid_with_wall_at(2, 1);
        assert!(grid.is_solid(TileCoord::new(2, 1)));
        // Flush against the wall's left edge.
        assert!(!grid.overlaps(&Aabb::new(48.0, 40.0, 16.0, 8.0)));
        assert!(grid.overlaps(&Aabb::new(49.0, 40.0, 16.0, 8.0)));
    }

    #[test]
    fn rejected_move_is_idempotent() {
        let grid = grid_with_wall_at(2, 1);
        let obstacles = Obstacles {
            walls: &grid,
            doors: &[],
        };
        let mut position = Aabb::new(40.0, 40.0, 16.0, 16.0);
        for _ in 0..2 {
            if try_move(&position, Vec2::new(20.0, 0.0), &obstacles) {
                position = position.translated(Vec2::new(20.0, 0.0));
            }
            assert_eq!(position, Aabb::new(40.0, 40.0, 16.0, 16.0));
        }
    }

    #[test]
    fn moving_past_level_edge_is_allowed_without_boundary_walls() {
        let grid = grid_with_wall_at(5, 5);
        let obstacles = Obstacles {
            walls: &grid,
            doors: &[],
        };
        let at_origin = Aabb::new(0.0, 0.0, 10.0, 10.0);
        assert!(try_move(&at_origin, Vec2::new(-5.0, 0.0), &obstacles));
    }

    #[test]
    fn moving_into_boundary_wall_is_rejected() {
        let grid = grid_with_wall_at(0, 0);
        let obstacles = Obstacles {
            walls: &grid,
            doors: &[],
        };
        let beside = Aabb::new(32.0, 4.0, 10.0, 10.0);
        assert!(!try_move(&beside, Vec2::new(-5.0, 0.0), &obstacles));
    }

    #[test]
    fn blocking_doors_are_obstacles() {
        let grid = grid_with_wall_at(7, 7);
        let door = [Aabb::new(64.0, 0.0, 32.0, 32.0)];
        let obstacles = Obstacles {
            walls: &grid,
            doors: &door,
        };
        let box_ = Aabb::new(50.0, 8.0, 10.0, 10.0);
        assert!(!try_move(&box_, Vec2::new(6.0, 0.0), &obstacles));
        assert!(try_move(&box_, Vec2::new(4.0, 0.0), &obstacles));
    }

    #[test]
    fn removed_cells_stop_colliding() {
        let mut grid = grid_with_wall_at(1, 1);
        assert!(grid.remove(TileCoord::new(1, 1)));
        assert!(!grid.remove(TileCoord::new(1, 1)));
        assert!(!grid.overlaps(&Aabb::new(32.0, 32.0, 32.0, 32.0)));
    }
}
