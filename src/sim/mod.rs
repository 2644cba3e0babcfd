//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - One discrete step per external tick, no internal concurrency
//! - Seeded RNG only
//! - Stable iteration order (row-major, col-major)
//! - No rendering or platform dependencies

pub mod attach;
pub mod collision;
pub mod grid;
pub mod hex;
pub mod state;
pub mod tick;

pub use collision::{Collision, detect};
pub use grid::{ColorId, Grid, Occupant};
pub use state::{
    GamePhase, Outcome, Projectile, RenderEntity, RenderKind, Session, StepResult,
};
pub use tick::{TickInput, tick};
