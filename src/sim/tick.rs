//! Fixed-step simulation driver.
//!
//! One call advances the session by exactly one step: apply the shoot
//! command, move the projectile, bounce off side walls, and hand any
//! contact to the attachment resolver. No wall-clock time anywhere.

use super::attach;
use super::collision;
use super::state::{Session, StepResult};

/// Commands applied at the start of a step.
#[derive(Debug, Clone, Copy, Default)]
pub struct TickInput {
    /// Fire the loaded projectile at this angle (radians, straight up
    /// is -PI/2). Ignored unless the session is ready.
    pub shoot: Option<f32>,
}

/// Advance the session one step and report its scoring deltas.
pub fn tick(session: &mut Session, input: &TickInput) -> StepResult {
    if session.is_over() {
        return StepResult::default();
    }

    if let Some(angle) = input.shoot {
        session.shoot(angle);
    }

    let Some(projectile) = session.projectile.as_mut() else {
        return StepResult::default();
    };
    if !projectile.in_flight() {
        return StepResult::default();
    }

    projectile.advance();

    // Side walls reflect; the clamp keeps the sphere fully on screen.
    let radius = projectile.radius;
    let width = session.level.width;
    if projectile.pos.x - radius <= 0.0 {
        projectile.pos.x = radius;
        projectile.vel.x = -projectile.vel.x;
    } else if projectile.pos.x + radius >= width {
        projectile.pos.x = width - radius;
        projectile.vel.x = -projectile.vel.x;
    }

    if let Some(hit) = collision::detect(projectile, &session.grid) {
        return attach::attach_projectile(session, hit);
    }

    // Safety net: the ceiling band normally catches anything moving up,
    // but a projectile that somehow escapes resets rather than wedging
    // the session.
    if projectile.pos.y + radius < 0.0 {
        log::warn!("projectile left the board at x={}", projectile.pos.x);
        session.rearm();
    }

    StepResult::default()
}
