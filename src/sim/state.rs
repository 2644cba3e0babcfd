//! Session state and core simulation types
//!
//! The [`Session`] owns one grid, at most one in-flight projectile, the
//! current/next color queue, and the seeded RNG. The tick and attach
//! modules mutate it; nothing else does.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::grid::{ColorId, Grid, Occupant};
use crate::level::{LevelConfig, LevelError, ObstacleShape};

/// The sphere currently being shot. Lives outside the grid until it
/// attaches; at most one exists at a time.
#[derive(Debug, Clone, PartialEq)]
pub struct Projectile {
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
    pub color: ColorId,
}

impl Projectile {
    pub fn new(pos: Vec2, radius: f32, color: ColorId) -> Self {
        Self {
            pos,
            vel: Vec2::ZERO,
            radius,
            color,
        }
    }

    /// One Euler step, unit timestep. No sub-stepping: tunneling at
    /// extreme speeds is a known limitation, not a bug to paper over.
    pub fn advance(&mut self) {
        self.pos += self.vel;
    }

    pub fn in_flight(&self) -> bool {
        self.vel != Vec2::ZERO
    }
}

/// How a finished session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Win,
    Lose,
}

/// Session state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    /// Projectile at rest on the shooter, waiting for a shot.
    Ready,
    /// Projectile moving; collisions are checked each tick.
    InFlight,
    /// Terminal.
    Over(Outcome),
}

/// Per-tick effect summary for the external scoring collaborator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepResult {
    /// Spheres removed by the match.
    pub removed: u32,
    /// Spheres dropped by the float check, plus any sphere sacrificed
    /// to a bonus.
    pub fallen: u32,
    /// Points from consumed bonuses.
    pub bonus_points: u32,
}

/// What a renderable entity is, for draw dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderKind {
    Sphere,
    Obstacle,
    Bonus,
    Projectile,
}

/// One drawable entity. The engine does no drawing; this is the whole
/// contract with the renderer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderEntity {
    pub pos: Vec2,
    pub radius: f32,
    pub kind: RenderKind,
    pub color: Option<ColorId>,
    pub shape: Option<ObstacleShape>,
}

/// One level's worth of game: grid, projectile, color queue, turn
/// counter, shooter. Constructed per level, discarded at win/lose.
#[derive(Debug, Clone)]
pub struct Session {
    pub level: LevelConfig,
    pub grid: Grid,
    pub projectile: Option<Projectile>,
    /// Color the shot after this one will have (the "next" preview).
    pub next_color: ColorId,
    /// Successful attachments so far; drives periodic descent.
    pub turn_count: u32,
    /// Shooter rest position; x follows the hex lattice (aim assist).
    pub shooter_pos: Vec2,
    pub danger_line_y: f32,
    pub phase: GamePhase,
    /// Run seed, kept for reproducibility reporting.
    pub seed: u64,
    pub(crate) rng: Pcg32,
}

impl Session {
    /// Validate the level and build a ready-to-play session.
    pub fn new(level: LevelConfig, seed: u64) -> Result<Self, LevelError> {
        level.validate()?;

        let mut rng = Pcg32::seed_from_u64(seed);
        let grid = Grid::from_level(&level, &mut rng);
        let shooter_pos = Vec2::new(level.width / 2.0, level.shooter_y());
        let danger_line_y = level.danger_line_y();

        let mut session = Self {
            grid,
            projectile: None,
            next_color: ColorId(0),
            turn_count: 0,
            shooter_pos,
            danger_line_y,
            phase: GamePhase::Ready,
            seed,
            rng,
            level,
        };

        session.reposition_shooter();
        // Queue init: first draw arms the shooter, second fills `next`.
        let current = session.draw_color();
        session.projectile = Some(Projectile::new(
            session.shooter_pos,
            session.level.radius,
            current,
        ));
        session.next_color = session.draw_color();

        log::info!(
            "session start: level `{}`, seed {}, {}x{} grid",
            session.level.name,
            seed,
            session.grid.rows(),
            session.grid.cols()
        );
        Ok(session)
    }

    /// Draw a color from those present in the grid, or from the full
    /// palette once no colored sphere remains.
    pub(crate) fn draw_color(&mut self) -> ColorId {
        let present = self.grid.sphere_colors();
        if present.is_empty() {
            ColorId(self.rng.random_range(0..self.level.palette.len()))
        } else {
            present[self.rng.random_range(0..present.len())]
        }
    }

    /// Launch the resting projectile at `angle` (radians; y grows
    /// downward, so straight up is -π/2). Ignored unless the session is
    /// in `Ready` (repeat shots from a real-time UI are routine, not
    /// errors).
    pub fn shoot(&mut self, angle: f32) {
        if self.phase != GamePhase::Ready {
            return;
        }
        let Some(projectile) = self.projectile.as_mut() else {
            return;
        };
        projectile.vel = Vec2::new(angle.cos(), angle.sin()) * self.level.shot_speed;
        self.phase = GamePhase::InFlight;
    }

    /// Re-seat the shooter under the action: one row below the lowest
    /// occupied row (clamped to the last row), at the column whose
    /// center is nearest the horizontal middle. Keeps the default aim
    /// aligned to the lattice so vertical shots land predictably.
    pub fn reposition_shooter(&mut self) {
        let last_row = self.grid.rows() - 1;
        let target_row = match self.grid.lowest_occupied_row() {
            Some(lowest) => (lowest + 1).min(last_row),
            None => last_row,
        };

        let center_x = self.level.width / 2.0;
        let mut best_col = 0;
        let mut best_dist = f32::INFINITY;
        for col in 0..self.grid.cols() {
            let d = (self.grid.cell_center(target_row, col).x - center_x).abs();
            if d < best_dist {
                best_dist = d;
                best_col = col;
            }
        }
        self.shooter_pos.x = self.grid.cell_center(target_row, best_col).x;

        // Re-center the resting projectile along with the shooter.
        if let Some(projectile) = self.projectile.as_mut() {
            if !projectile.in_flight() {
                projectile.pos.x = self.shooter_pos.x;
            }
        }
    }

    /// Put a fresh projectile on the shooter, advancing the color
    /// queue. Used after a top-exit escape and by the attach flow.
    pub(crate) fn rearm(&mut self) {
        let color = self.next_color;
        self.next_color = self.draw_color();
        self.reposition_shooter();
        self.projectile = Some(Projectile::new(
            self.shooter_pos,
            self.level.radius,
            color,
        ));
        self.phase = GamePhase::Ready;
    }

    pub fn is_over(&self) -> bool {
        matches!(self.phase, GamePhase::Over(_))
    }

    pub fn is_win(&self) -> bool {
        self.phase == GamePhase::Over(Outcome::Win)
    }

    pub fn is_ready(&self) -> bool {
        self.phase == GamePhase::Ready
    }

    /// Points for one step result under this level's weights.
    pub fn score(&self, result: StepResult) -> u32 {
        self.level.scoring.score(result)
    }

    /// The palette string behind a color id.
    pub fn palette_color(&self, color: ColorId) -> &str {
        &self.level.palette[color.0]
    }

    /// Draw-ready snapshot: every grid occupant plus the projectile.
    pub fn renderables(&self) -> Vec<RenderEntity> {
        let mut out: Vec<RenderEntity> = self
            .grid
            .iter_occupied()
            .map(|(_, _, occ)| match *occ {
                Occupant::Sphere { pos, radius, color } => RenderEntity {
                    pos,
                    radius,
                    kind: RenderKind::Sphere,
                    color: Some(color),
                    shape: None,
                },
                Occupant::Obstacle { pos, radius, shape } => RenderEntity {
                    pos,
                    radius,
                    kind: RenderKind::Obstacle,
                    color: None,
                    shape: Some(shape),
                },
                Occupant::Bonus { pos, radius, .. } => RenderEntity {
                    pos,
                    radius,
                    kind: RenderKind::Bonus,
                    color: None,
                    shape: None,
                },
            })
            .collect();

        if let Some(projectile) = &self.projectile {
            out.push(RenderEntity {
                pos: projectile.pos,
                radius: projectile.radius,
                kind: RenderKind::Projectile,
                color: Some(projectile.color),
                shape: None,
            });
        }
        out
    }
}
