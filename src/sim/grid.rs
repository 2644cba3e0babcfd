//! The grid of occupants
//!
//! A fixed ROWS×COLS table of optional occupants, owned by the session
//! and mutated in place for the level's duration. Every occupant caches
//! its pixel center; after a descent the cached positions are recomputed
//! from the logical addresses, never drifted.

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::hex;
use crate::level::{EntitySpec, LevelConfig, ObstacleShape, SpawnPattern};

/// Index into the level palette. The engine matches on identity only;
/// the actual color string is a rendering concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ColorId(pub usize);

/// Anything stored in a grid cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Occupant {
    /// Colored, matchable, removable.
    Sphere {
        pos: Vec2,
        radius: f32,
        color: ColorId,
    },
    /// Indestructible blocker: anchors connectivity, never matches,
    /// never falls.
    Obstacle {
        pos: Vec2,
        radius: f32,
        shape: ObstacleShape,
    },
    /// Consumed for points when a sphere lands adjacent.
    Bonus {
        pos: Vec2,
        radius: f32,
        points: u32,
    },
}

impl Occupant {
    pub fn pos(&self) -> Vec2 {
        match self {
            Occupant::Sphere { pos, .. }
            | Occupant::Obstacle { pos, .. }
            | Occupant::Bonus { pos, .. } => *pos,
        }
    }

    fn set_pos(&mut self, new_pos: Vec2) {
        match self {
            Occupant::Sphere { pos, .. }
            | Occupant::Obstacle { pos, .. }
            | Occupant::Bonus { pos, .. } => *pos = new_pos,
        }
    }

    pub fn radius(&self) -> f32 {
        match self {
            Occupant::Sphere { radius, .. }
            | Occupant::Obstacle { radius, .. }
            | Occupant::Bonus { radius, .. } => *radius,
        }
    }

    /// Sphere color, if this is a sphere.
    pub fn color(&self) -> Option<ColorId> {
        match self {
            Occupant::Sphere { color, .. } => Some(*color),
            _ => None,
        }
    }

    pub fn is_sphere(&self) -> bool {
        matches!(self, Occupant::Sphere { .. })
    }
}

/// The hexagonally-packed occupant table.
#[derive(Debug, Clone)]
pub struct Grid {
    rows: usize,
    cols: usize,
    radius: f32,
    /// Pixel y of row 0; grows on descent.
    start_y: f32,
    cells: Vec<Option<Occupant>>,
}

impl Grid {
    /// An empty grid.
    pub fn new(rows: usize, cols: usize, radius: f32, start_y: f32) -> Self {
        Self {
            rows,
            cols,
            radius,
            start_y,
            cells: vec![None; rows * cols],
        }
    }

    /// Build and populate a grid from a validated level.
    pub fn from_level(level: &LevelConfig, rng: &mut Pcg32) -> Self {
        let mut grid = Self::new(level.rows, level.cols(), level.radius, level.start_y);
        grid.spawn_fill(level, rng);
        grid.spawn_entities(level);
        grid
    }

    fn spawn_fill(&mut self, level: &LevelConfig, rng: &mut Pcg32) {
        let filled_rows = level.spawn.initial_filled_rows.min(self.rows);
        let chance = level.spawn.fill_chance;
        let palette_len = level.palette.len();

        for row in 0..filled_rows {
            for col in 0..self.cols {
                let color = match level.spawn.pattern {
                    SpawnPattern::RowsFull => {
                        if rng.random::<f32>() > chance {
                            continue;
                        }
                        ColorId(col % palette_len)
                    }
                    SpawnPattern::RandomSparse => {
                        if rng.random::<f32>() > chance {
                            continue;
                        }
                        ColorId(rng.random_range(0..palette_len))
                    }
                };
                self.set_sphere(row, col, color);
            }
        }
    }

    /// Place fixed obstacle/bonus entities. Out-of-bounds entries are a
    /// level-design mistake, not a fatal one: skip with a warning.
    fn spawn_entities(&mut self, level: &LevelConfig) {
        for entity in &level.entities {
            match *entity {
                EntitySpec::Obstacle { row, col, shape } => {
                    if !self.in_bounds(row, col) {
                        log::warn!("skipping out-of-bounds obstacle at ({row}, {col})");
                        continue;
                    }
                    self.set_obstacle(row, col, shape);
                }
                EntitySpec::Bonus { row, col, points } => {
                    if !self.in_bounds(row, col) {
                        log::warn!("skipping out-of-bounds bonus at ({row}, {col})");
                        continue;
                    }
                    self.set_bonus(row, col, points.unwrap_or(level.scoring.bonus_default));
                }
            }
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn start_y(&self) -> f32 {
        self.start_y
    }

    pub fn in_bounds(&self, row: usize, col: usize) -> bool {
        row < self.rows && col < self.cols
    }

    #[inline]
    fn idx(&self, row: usize, col: usize) -> usize {
        debug_assert!(self.in_bounds(row, col));
        row * self.cols + col
    }

    /// Pixel center of (row, col) at the current grid origin.
    pub fn cell_center(&self, row: usize, col: usize) -> Vec2 {
        hex::cell_center(row, col, self.radius, self.start_y)
    }

    /// In-bounds hex neighbors of (row, col).
    pub fn neighbors(&self, row: usize, col: usize) -> Vec<(usize, usize)> {
        hex::neighbors(row, col, self.rows, self.cols)
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&Occupant> {
        self.cells[self.idx(row, col)].as_ref()
    }

    pub fn is_empty_cell(&self, row: usize, col: usize) -> bool {
        self.cells[self.idx(row, col)].is_none()
    }

    /// Store a sphere at (row, col), snapped to the cell center.
    pub fn set_sphere(&mut self, row: usize, col: usize, color: ColorId) {
        let pos = self.cell_center(row, col);
        let radius = self.radius;
        let i = self.idx(row, col);
        self.cells[i] = Some(Occupant::Sphere { pos, radius, color });
    }

    pub fn set_obstacle(&mut self, row: usize, col: usize, shape: ObstacleShape) {
        let pos = self.cell_center(row, col);
        let radius = self.radius;
        let i = self.idx(row, col);
        self.cells[i] = Some(Occupant::Obstacle { pos, radius, shape });
    }

    pub fn set_bonus(&mut self, row: usize, col: usize, points: u32) {
        let pos = self.cell_center(row, col);
        let radius = self.radius;
        let i = self.idx(row, col);
        self.cells[i] = Some(Occupant::Bonus { pos, radius, points });
    }

    pub fn remove(&mut self, row: usize, col: usize) -> Option<Occupant> {
        let i = self.idx(row, col);
        self.cells[i].take()
    }

    /// All occupied cells in row-major, col-major order. Scan order is
    /// part of the engine's observable behavior (collision and
    /// attachment tie-breaks), so it must stay stable.
    pub fn iter_occupied(&self) -> impl Iterator<Item = (usize, usize, &Occupant)> {
        self.cells.iter().enumerate().filter_map(|(i, cell)| {
            cell.as_ref()
                .map(|occ| (i / self.cols, i % self.cols, occ))
        })
    }

    /// Does any matchable sphere remain? (Win check: obstacles and
    /// bonuses do not keep the game alive.)
    pub fn has_any_sphere(&self) -> bool {
        self.cells
            .iter()
            .flatten()
            .any(|occ| occ.is_sphere())
    }

    /// Distinct sphere colors currently present, in first-seen row-major
    /// order (deterministic for the seeded color queue). Empty when no
    /// sphere remains; the session falls back to the full palette.
    pub fn sphere_colors(&self) -> Vec<ColorId> {
        let mut colors = Vec::new();
        for (_, _, occ) in self.iter_occupied() {
            if let Some(color) = occ.color() {
                if !colors.contains(&color) {
                    colors.push(color);
                }
            }
        }
        colors
    }

    /// Does any occupant's lower edge reach the given y? (Loss check.)
    pub fn crosses_line(&self, y: f32) -> bool {
        self.iter_occupied()
            .any(|(_, _, occ)| occ.pos().y + occ.radius() >= y)
    }

    /// Highest row index that holds any occupant.
    pub fn lowest_occupied_row(&self) -> Option<usize> {
        self.iter_occupied().map(|(row, _, _)| row).max()
    }

    /// Move the whole grid down one row spacing and re-derive every
    /// cached pixel position from its logical address.
    pub fn descend(&mut self) {
        self.start_y += hex::spacing_y(self.radius);
        for row in 0..self.rows {
            for col in 0..self.cols {
                let center = self.cell_center(row, col);
                let i = self.idx(row, col);
                if let Some(occ) = self.cells[i].as_mut() {
                    occ.set_pos(center);
                }
            }
        }
    }
}
