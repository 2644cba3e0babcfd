//! Hexpop - a hexagonal-grid bubble shooter core engine
//!
//! Core modules:
//! - `sim`: Deterministic simulation (hex grid, projectile physics,
//!   match/float-drop resolution, session state machine)
//! - `level`: Data-driven level configuration
//!
//! Rendering, input devices, and score persistence are external
//! collaborators: the engine exposes a renderable snapshot and per-tick
//! step results, and accepts a single `shoot(angle)` command.
//!
//! Coordinates are canvas-style: y grows downward, so an upward shot
//! has a negative vertical velocity.

pub mod level;
pub mod sim;

pub use level::{LevelConfig, LevelError};
pub use sim::{GamePhase, Outcome, Session, StepResult, TickInput, tick};

/// Engine defaults, used when a level omits the matching field.
pub mod consts {
    /// Connected same-color group size that pops.
    pub const MIN_MATCH_SIZE: usize = 3;

    /// Projectile launch speed in pixels per tick.
    pub const DEFAULT_SHOT_SPEED: f32 = 9.0;

    /// Successful attachments between full-grid descents.
    pub const DEFAULT_TURNS_PER_DROP: u32 = 10;

    /// Pixel y of the first grid row.
    pub const DEFAULT_START_Y: f32 = 60.0;

    /// Shooter rest y, measured up from the bottom edge.
    pub const SHOOTER_MARGIN_Y: f32 = 60.0;

    /// Points for a consumed bonus that carries no explicit value.
    pub const DEFAULT_BONUS_POINTS: u32 = 500;

    /// Default scoring weights (points per matched / fallen sphere).
    pub const DEFAULT_POINTS_PER_REMOVED: u32 = 10;
    pub const DEFAULT_POINTS_PER_FALLEN: u32 = 5;
}
