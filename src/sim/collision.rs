//! Collision detection between the in-flight projectile and the grid
//!
//! A single row-major scan over occupied cells keeps the strictly
//! closest occupant within the snap threshold; on an exact distance tie
//! the first cell found wins. That scan-order tie-break is observable
//! and kept for test reproducibility. The ceiling is only consulted
//! when no occupant collides.

use super::grid::Grid;
use super::state::Projectile;

/// What the projectile ran into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collision {
    /// An occupied cell (sphere, obstacle, or bonus).
    Occupied { row: usize, col: usize },
    /// The ceiling above row 0.
    Ceiling,
}

/// Find the nearest occupied cell within two radii of the projectile
/// center, or ceiling contact, or nothing.
pub fn detect(projectile: &Projectile, grid: &Grid) -> Option<Collision> {
    let max_d2 = (2.0 * grid.radius()).powi(2);

    let mut best: Option<(f32, usize, usize)> = None;
    for (row, col, occ) in grid.iter_occupied() {
        let d2 = projectile.pos.distance_squared(occ.pos());
        if d2 <= max_d2 && best.is_none_or(|(best_d2, _, _)| d2 < best_d2) {
            best = Some((d2, row, col));
        }
    }

    if let Some((_, row, col)) = best {
        return Some(Collision::Occupied { row, col });
    }

    // Ceiling contact: top edge at or above start_y - radius/2.
    if projectile.pos.y - projectile.radius <= grid.start_y() - grid.radius() / 2.0 {
        return Some(Collision::Ceiling);
    }

    None
}
