//! Hex-grid coordinate model
//!
//! The grid is hexagonally packed: odd rows are shifted right by one
//! radius, rows are `radius * sqrt(3)` apart. Addresses are (row, col)
//! with row 0 at the ceiling; pixel y grows downward.
//!
//! Neighbor lookup uses two delta tables keyed on row parity. The
//! asymmetry is load-bearing: a single table for both parities corrupts
//! adjacency, and with it match detection and attachment.

use glam::Vec2;

/// Square root of 3, used throughout the hex math.
pub const SQRT_3: f32 = 1.732_050_8;

/// Horizontal center-to-center spacing.
#[inline]
pub fn spacing_x(radius: f32) -> f32 {
    radius * 2.0
}

/// Vertical row-to-row spacing.
#[inline]
pub fn spacing_y(radius: f32) -> f32 {
    radius * SQRT_3
}

/// Pixel center of cell (row, col) for a grid whose row 0 sits at `start_y`.
///
/// Pure in (row, col, radius, start_y); the grid passes its current
/// origin so descent shifts every center uniformly.
pub fn cell_center(row: usize, col: usize, radius: f32, start_y: f32) -> Vec2 {
    let offset = if row % 2 == 1 { radius } else { 0.0 };
    Vec2::new(
        offset + radius + col as f32 * spacing_x(radius),
        start_y + row as f32 * spacing_y(radius),
    )
}

/// (row, col) deltas of the 6 neighbors of an odd row.
const ODD_ROW_DELTAS: [(i32, i32); 6] = [(-1, 0), (-1, 1), (0, -1), (0, 1), (1, 0), (1, 1)];

/// (row, col) deltas of the 6 neighbors of an even row.
const EVEN_ROW_DELTAS: [(i32, i32); 6] = [(-1, -1), (-1, 0), (0, -1), (0, 1), (1, -1), (1, 0)];

/// The in-bounds neighbors of (row, col), up to 6 of them, in the fixed
/// delta-table order.
pub fn neighbors(row: usize, col: usize, rows: usize, cols: usize) -> Vec<(usize, usize)> {
    let deltas = if row % 2 == 1 {
        &ODD_ROW_DELTAS
    } else {
        &EVEN_ROW_DELTAS
    };

    let mut out = Vec::with_capacity(6);
    for &(dr, dc) in deltas {
        let r = row as i32 + dr;
        let c = col as i32 + dc;
        if r >= 0 && (r as usize) < rows && c >= 0 && (c as usize) < cols {
            out.push((r as usize, c as usize));
        }
    }
    out
}
