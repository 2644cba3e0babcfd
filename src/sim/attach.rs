//! Attachment and match resolution
//!
//! Runs synchronously to completion when the projectile collides:
//! snap-cell selection, placement, same-color match removal, float-drop
//! of ceiling-disconnected spheres, bonus consumption, turn accounting,
//! periodic descent, win/lose evaluation, and rearming the shooter.
//!
//! The float check is gated strictly behind a successful match: a
//! placement alone never changes connectivity, so a non-matching shot
//! does not trigger it.

use std::collections::HashSet;

use glam::Vec2;

use super::collision::Collision;
use super::grid::{Grid, Occupant};
use super::state::{GamePhase, Outcome, Session, StepResult};
use crate::consts::MIN_MATCH_SIZE;

/// Resolve a collision: attach the projectile and run the full landing
/// flow. Returns the step's scoring deltas.
pub fn attach_projectile(session: &mut Session, collision: Collision) -> StepResult {
    let Some(projectile) = session.projectile.take() else {
        return StepResult::default();
    };

    let Some((row, col)) = select_attach_cell(&session.grid, collision, projectile.pos) else {
        // No empty cell anywhere: a legitimate endgame, not an error.
        log::info!("grid full, no cell to attach to");
        session.phase = GamePhase::Over(Outcome::Lose);
        return StepResult::default();
    };

    // Snap to the cell center; the projectile becomes a grid sphere.
    session.grid.set_sphere(row, col, projectile.color);
    log::debug!("sphere landed at ({row}, {col})");

    let mut result = StepResult::default();

    let group = find_color_group(&session.grid, row, col);
    if group.len() >= MIN_MATCH_SIZE {
        result.removed = group.len() as u32;
        for &(r, c) in &group {
            session.grid.remove(r, c);
        }
        result.fallen += drop_floating(&mut session.grid) as u32;
        log::info!(
            "popped {} spheres at ({row}, {col}), {} fell",
            result.removed,
            result.fallen
        );
    }

    let (bonus_points, sacrificed) = resolve_bonuses(&mut session.grid, row, col);
    result.bonus_points = bonus_points;
    result.fallen += sacrificed;

    session.turn_count += 1;
    if session.turn_count % session.level.turns_per_drop == 0 {
        session.grid.descend();
        log::info!("grid descended on turn {}", session.turn_count);
    }

    // Win is checked before lose: a full clear on a descent turn wins.
    if !session.grid.has_any_sphere() {
        session.phase = GamePhase::Over(Outcome::Win);
        log::info!("level cleared in {} turns", session.turn_count);
        return result;
    }
    if session.grid.crosses_line(session.danger_line_y) {
        session.phase = GamePhase::Over(Outcome::Lose);
        log::info!("danger line crossed on turn {}", session.turn_count);
        return result;
    }

    session.rearm();
    result
}

/// Keep the closest empty candidate, scan order breaking exact ties.
fn consider(
    grid: &Grid,
    pos: Vec2,
    cells: impl IntoIterator<Item = (usize, usize)>,
    best: &mut Option<(f32, usize, usize)>,
) {
    for (row, col) in cells {
        if !grid.is_empty_cell(row, col) {
            continue;
        }
        let d2 = pos.distance_squared(grid.cell_center(row, col));
        if best.is_none_or(|(best_d2, _, _)| d2 < best_d2) {
            *best = Some((d2, row, col));
        }
    }
}

/// Pick the empty cell the projectile snaps into: neighbors of the hit
/// cell (or row 0 for ceiling contact), else the globally closest empty
/// cell, else nothing (grid full).
fn select_attach_cell(
    grid: &Grid,
    collision: Collision,
    pos: Vec2,
) -> Option<(usize, usize)> {
    let mut best = None;

    match collision {
        Collision::Occupied { row, col } => {
            consider(grid, pos, grid.neighbors(row, col), &mut best);
        }
        Collision::Ceiling => {
            consider(grid, pos, (0..grid.cols()).map(|c| (0, c)), &mut best);
        }
    }

    if best.is_none() {
        let all = (0..grid.rows()).flat_map(|r| (0..grid.cols()).map(move |c| (r, c)));
        consider(grid, pos, all, &mut best);
    }

    best.map(|(_, row, col)| (row, col))
}

/// Depth-first flood over same-colored spheres reachable from the start
/// cell. Obstacles and bonuses are opaque: never traversed, never
/// included. Computed before any removal.
pub fn find_color_group(grid: &Grid, start_row: usize, start_col: usize) -> Vec<(usize, usize)> {
    let Some(color) = grid.get(start_row, start_col).and_then(|occ| occ.color()) else {
        return Vec::new();
    };

    let mut stack = vec![(start_row, start_col)];
    let mut visited = HashSet::new();
    let mut group = Vec::new();

    while let Some((row, col)) = stack.pop() {
        if !visited.insert((row, col)) {
            continue;
        }
        match grid.get(row, col) {
            Some(occ) if occ.color() == Some(color) => {}
            _ => continue,
        }
        group.push((row, col));

        for (nr, nc) in grid.neighbors(row, col) {
            if grid.get(nr, nc).and_then(|occ| occ.color()) == Some(color) {
                stack.push((nr, nc));
            }
        }
    }

    group
}

/// All occupied cells transitively reachable from an occupied row-0
/// cell. Obstacles and bonuses both conduct connectivity.
pub fn anchored_cells(grid: &Grid) -> HashSet<(usize, usize)> {
    let mut visited = HashSet::new();
    let mut stack: Vec<(usize, usize)> = (0..grid.cols())
        .filter(|&col| !grid.is_empty_cell(0, col))
        .map(|col| (0, col))
        .collect();

    while let Some((row, col)) = stack.pop() {
        if !visited.insert((row, col)) {
            continue;
        }
        for (nr, nc) in grid.neighbors(row, col) {
            if !grid.is_empty_cell(nr, nc) && !visited.contains(&(nr, nc)) {
                stack.push((nr, nc));
            }
        }
    }

    visited
}

/// Remove every sphere with no path to the ceiling row. Obstacles and
/// bonuses are structural and stay even when disconnected.
pub fn drop_floating(grid: &mut Grid) -> usize {
    let anchored = anchored_cells(grid);
    let floating: Vec<(usize, usize)> = grid
        .iter_occupied()
        .filter(|&(row, col, occ)| occ.is_sphere() && !anchored.contains(&(row, col)))
        .map(|(row, col, _)| (row, col))
        .collect();

    for &(row, col) in &floating {
        grid.remove(row, col);
    }
    floating.len()
}

/// Consume every bonus adjacent to the landing cell. If any was
/// consumed, the landed sphere is sacrificed too (counted as fallen).
fn resolve_bonuses(grid: &mut Grid, row: usize, col: usize) -> (u32, u32) {
    let bonus_cells: Vec<(usize, usize, u32)> = grid
        .neighbors(row, col)
        .into_iter()
        .filter_map(|(nr, nc)| match grid.get(nr, nc) {
            Some(&Occupant::Bonus { points, .. }) => Some((nr, nc, points)),
            _ => None,
        })
        .collect();

    if bonus_cells.is_empty() {
        return (0, 0);
    }

    let mut points = 0u32;
    for &(nr, nc, p) in &bonus_cells {
        grid.remove(nr, nc);
        points += p;
    }
    log::info!("consumed {} bonus(es) for {points} points", bonus_cells.len());

    // The landed sphere may already be gone if it completed a match.
    let mut sacrificed = 0;
    if grid.get(row, col).is_some_and(|occ| occ.is_sphere()) {
        grid.remove(row, col);
        sacrificed = 1;
    }
    (points, sacrificed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::tests::minimal_level;
    use crate::sim::grid::ColorId;
    use crate::sim::state::Projectile;
    use proptest::prelude::*;

    const RED: ColorId = ColorId(0);
    const BLUE: ColorId = ColorId(1);
    const GREEN: ColorId = ColorId(2);

    /// Bare session over a small explicit grid, radius 10.
    fn session_with(rows: usize, cols: usize) -> Session {
        let mut level = minimal_level();
        level.radius = 10.0;
        level.rows = rows;
        level.cols = Some(cols);
        level.spawn.initial_filled_rows = 0;
        Session::new(level, 99).unwrap()
    }

    fn load_projectile(session: &mut Session, pos: Vec2, color: ColorId) {
        session.projectile = Some(Projectile::new(pos, session.level.radius, color));
        session.phase = GamePhase::InFlight;
    }

    #[test]
    fn match_of_three_pops() {
        // Scenario A: two reds on row 0, a red lands beside them.
        let mut session = session_with(3, 4);
        session.grid.set_sphere(0, 0, RED);
        session.grid.set_sphere(0, 1, RED);
        session.grid.set_sphere(0, 3, BLUE); // anchor so the level isn't cleared

        let target = session.grid.cell_center(0, 2);
        load_projectile(&mut session, target + Vec2::new(0.0, 2.0), RED);
        let result = attach_projectile(&mut session, Collision::Occupied { row: 0, col: 1 });

        assert_eq!(result.removed, 3);
        assert_eq!(result.fallen, 0);
        assert_eq!(result.bonus_points, 0);
        assert!(session.grid.is_empty_cell(0, 0));
        assert!(session.grid.is_empty_cell(0, 1));
        assert!(session.grid.is_empty_cell(0, 2));
        assert!(!session.is_over());
        assert_eq!(session.turn_count, 1);
        assert_eq!(session.phase, GamePhase::Ready);
    }

    #[test]
    fn no_match_keeps_placement() {
        // Scenario B: a blue lands next to two reds.
        let mut session = session_with(3, 4);
        session.grid.set_sphere(0, 0, RED);
        session.grid.set_sphere(0, 1, RED);
        let before = session.grid.iter_occupied().count();

        let target = session.grid.cell_center(0, 2);
        load_projectile(&mut session, target, BLUE);
        let result = attach_projectile(&mut session, Collision::Occupied { row: 0, col: 1 });

        assert_eq!(result.removed, 0);
        assert_eq!(session.grid.iter_occupied().count(), before + 1);
        assert_eq!(session.grid.get(0, 2).unwrap().color(), Some(BLUE));
    }

    #[test]
    fn float_drop_clears_disconnected_group() {
        // Scenario C: popping the blues strands two greens.
        let mut session = session_with(4, 4);
        session.grid.set_sphere(0, 0, BLUE);
        session.grid.set_sphere(0, 1, BLUE);
        session.grid.set_sphere(1, 0, GREEN);
        session.grid.set_sphere(1, 1, GREEN);
        session.grid.set_sphere(0, 3, RED); // stays anchored

        let target = session.grid.cell_center(0, 2);
        load_projectile(&mut session, target, BLUE);
        let result = attach_projectile(&mut session, Collision::Occupied { row: 0, col: 1 });

        assert_eq!(result.removed, 3);
        assert_eq!(result.fallen, 2);
        assert!(session.grid.is_empty_cell(1, 0));
        assert!(session.grid.is_empty_cell(1, 1));
        assert_eq!(session.grid.get(0, 3).unwrap().color(), Some(RED));
    }

    #[test]
    fn no_float_check_without_match() {
        // A sphere hangs alone below; a non-matching landing must not
        // run the float pass.
        let mut session = session_with(4, 4);
        session.grid.set_sphere(0, 0, RED);
        session.grid.set_sphere(2, 2, GREEN); // already disconnected

        let target = session.grid.cell_center(0, 1);
        load_projectile(&mut session, target, BLUE);
        let result = attach_projectile(&mut session, Collision::Occupied { row: 0, col: 0 });

        assert_eq!(result.removed, 0);
        assert_eq!(result.fallen, 0);
        assert!(session.grid.get(2, 2).is_some());
    }

    #[test]
    fn clearing_last_spheres_wins() {
        // Scenario D.
        let mut session = session_with(3, 4);
        session.grid.set_sphere(0, 0, RED);
        session.grid.set_sphere(0, 1, RED);

        let target = session.grid.cell_center(0, 2);
        load_projectile(&mut session, target, RED);
        let result = attach_projectile(&mut session, Collision::Occupied { row: 0, col: 1 });

        assert_eq!(result.removed, 3);
        assert!(session.is_over());
        assert!(session.is_win());
    }

    #[test]
    fn crossing_danger_line_loses() {
        // Scenario E: an anchored column reaches the danger line.
        let mut session = session_with(4, 4);
        session.grid.set_sphere(0, 0, RED);
        session.grid.set_sphere(1, 0, BLUE);
        session.danger_line_y = session.grid.cell_center(1, 0).y; // lower edge crosses

        let target = session.grid.cell_center(0, 1);
        load_projectile(&mut session, target, GREEN);
        attach_projectile(&mut session, Collision::Occupied { row: 0, col: 0 });

        assert!(session.is_over());
        assert!(!session.is_win());
    }

    #[test]
    fn bonus_is_consumed_and_sphere_sacrificed() {
        // Scenario F.
        let mut session = session_with(3, 4);
        session.grid.set_sphere(0, 0, RED);
        session.grid.set_bonus(1, 0, 500);

        let target = session.grid.cell_center(0, 1);
        load_projectile(&mut session, target, BLUE);
        let result = attach_projectile(&mut session, Collision::Occupied { row: 0, col: 0 });

        assert_eq!(result.removed, 0);
        assert_eq!(result.bonus_points, 500);
        assert!(result.fallen >= 1);
        assert!(session.grid.is_empty_cell(1, 0), "bonus should be gone");
        assert!(session.grid.is_empty_cell(0, 1), "landed sphere sacrificed");
        assert!(!session.is_over());
    }

    #[test]
    fn ceiling_collision_snaps_into_row_zero() {
        let mut session = session_with(3, 4);
        session.grid.set_sphere(2, 0, RED); // keeps the level alive

        let pos = session.grid.cell_center(0, 2) - Vec2::new(1.0, 4.0);
        load_projectile(&mut session, pos, BLUE);
        attach_projectile(&mut session, Collision::Ceiling);

        assert_eq!(session.grid.get(0, 2).unwrap().color(), Some(BLUE));
    }

    #[test]
    fn full_grid_ends_in_loss_without_counting_the_turn() {
        let mut session = session_with(1, 1);
        session.grid.set_sphere(0, 0, RED);

        load_projectile(&mut session, Vec2::new(10.0, 80.0), BLUE);
        let result = attach_projectile(&mut session, Collision::Occupied { row: 0, col: 0 });

        assert_eq!(result, StepResult::default());
        assert!(session.is_over());
        assert!(!session.is_win());
        assert_eq!(session.turn_count, 0);
        assert!(session.projectile.is_none());
    }

    #[test]
    fn descent_fires_every_interval() {
        let mut session = session_with(6, 4);
        session.level.turns_per_drop = 2;
        session.grid.set_sphere(0, 0, RED);
        session.grid.set_sphere(0, 3, BLUE);
        let start_y_before = session.grid.start_y();

        // Turn 1: no descent.
        let target = session.grid.cell_center(1, 0);
        load_projectile(&mut session, target, GREEN);
        attach_projectile(&mut session, Collision::Occupied { row: 0, col: 0 });
        assert_eq!(session.turn_count, 1);
        assert_eq!(session.grid.start_y(), start_y_before);

        // Turn 2: descent, and positions track their addresses.
        let target = session.grid.cell_center(1, 3);
        load_projectile(&mut session, target, GREEN);
        attach_projectile(&mut session, Collision::Occupied { row: 0, col: 3 });
        assert_eq!(session.turn_count, 2);
        let dy = session.grid.start_y() - start_y_before;
        assert!((dy - crate::sim::hex::spacing_y(10.0)).abs() < 1e-4);
        let occ = session.grid.get(0, 0).unwrap();
        assert_eq!(occ.pos(), session.grid.cell_center(0, 0));
    }

    #[test]
    fn attachment_falls_back_to_global_nearest_when_neighbors_full() {
        let mut session = session_with(3, 3);
        // Surround (1,1) completely so its neighborhood has no space.
        for (r, c) in [(0, 1), (0, 2), (1, 0), (1, 1), (1, 2), (2, 1), (2, 2)] {
            session.grid.set_sphere(r, c, RED);
        }
        // Empty cells remain at (0,0) and (2,0).
        let pos = session.grid.cell_center(1, 1);
        load_projectile(&mut session, pos, BLUE);
        attach_projectile(&mut session, Collision::Occupied { row: 1, col: 1 });

        let placed: Vec<_> = [(0, 0), (2, 0)]
            .iter()
            .filter(|&&(r, c)| session.grid.get(r, c).map(|o| o.color()) == Some(Some(BLUE)))
            .collect();
        assert_eq!(placed.len(), 1);
    }

    #[test]
    fn group_search_is_closed_over_color_connectivity() {
        let mut session = session_with(4, 4);
        // A red chain with a blue interposed: the blue splits it.
        session.grid.set_sphere(0, 0, RED);
        session.grid.set_sphere(0, 1, RED);
        session.grid.set_sphere(0, 2, BLUE);
        session.grid.set_sphere(0, 3, RED);

        let group = find_color_group(&session.grid, 0, 0);
        let set: HashSet<_> = group.into_iter().collect();
        assert_eq!(set, HashSet::from([(0, 0), (0, 1)]));

        // Same set from any member.
        let set_b: HashSet<_> = find_color_group(&session.grid, 0, 1).into_iter().collect();
        assert_eq!(set, set_b);
    }

    #[test]
    fn obstacles_block_match_but_anchor_connectivity() {
        let mut session = session_with(4, 4);
        session.grid.set_sphere(0, 0, RED);
        session.grid.set_obstacle(0, 1, crate::level::ObstacleShape::Square);
        session.grid.set_sphere(0, 2, RED);
        session.grid.set_sphere(1, 1, GREEN); // hangs off the obstacle

        // The obstacle splits the red "group".
        let group = find_color_group(&session.grid, 0, 0);
        assert_eq!(group.len(), 1);

        // But conducts ceiling connectivity for the green below it.
        let anchored = anchored_cells(&session.grid);
        assert!(anchored.contains(&(1, 1)));

        // And survives a float pass even if disconnected.
        let fallen = drop_floating(&mut session.grid);
        assert_eq!(fallen, 0);
    }

    proptest! {
        // After a float pass every surviving sphere is ceiling-anchored.
        #[test]
        fn prop_float_drop_soundness(cells in proptest::collection::vec(any::<bool>(), 36)) {
            let mut session = session_with(6, 6);
            for (i, &filled) in cells.iter().enumerate() {
                if filled {
                    session.grid.set_sphere(i / 6, i % 6, ColorId(i % 3));
                }
            }

            let spheres_before = session.grid.iter_occupied().count();
            let fallen = drop_floating(&mut session.grid);
            let spheres_after = session.grid.iter_occupied().count();
            prop_assert_eq!(spheres_before - spheres_after, fallen);

            let anchored = anchored_cells(&session.grid);
            for (row, col, _) in session.grid.iter_occupied() {
                prop_assert!(anchored.contains(&(row, col)), "({row},{col}) floats");
            }
        }
    }
}
