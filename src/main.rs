//! Headless autoplay runner
//!
//! Loads a level file, drives a session with randomly aimed shots at a
//! fixed step rate, and logs the outcome. Useful for smoke-testing
//! level files and for watching the engine play itself:
//!
//! ```text
//! hexpop [LEVEL_PATH] [SEED]
//! ```

use std::f32::consts::PI;
use std::fs;

use anyhow::{Context, Result};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use hexpop::sim::{Session, TickInput, tick};
use hexpop::LevelConfig;

const MAX_TICKS: u64 = 2_000_000;

fn main() -> Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let path = args.next().unwrap_or_else(|| "levels/level-01.json".into());
    let seed: u64 = match args.next() {
        Some(raw) => raw.parse().with_context(|| format!("bad seed {raw:?}"))?,
        None => 0xC0FFEE,
    };

    let json = fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
    let level = LevelConfig::from_json(&json).with_context(|| format!("parsing {path}"))?;
    log::info!("loaded level {:?} ({} rows)", level.name, level.rows);

    let mut session = Session::new(level, seed)?;
    // Separate stream so aim choices never perturb the level's colors.
    let mut aim_rng = Pcg32::seed_from_u64(seed ^ 0x9E37_79B9);

    let mut score: u32 = 0;
    let mut shots: u32 = 0;
    let mut ticks: u64 = 0;

    while !session.is_over() && ticks < MAX_TICKS {
        let input = if session.is_ready() {
            shots += 1;
            // Anywhere in the upward half-plane, minus a sliver at the
            // horizontal so every shot makes progress.
            let angle = -PI * aim_rng.random_range(0.1..0.9);
            TickInput { shoot: Some(angle) }
        } else {
            TickInput::default()
        };

        let result = tick(&mut session, &input);
        score += session.score(result);
        ticks += 1;

        if result.removed > 0 || result.bonus_points > 0 {
            log::debug!(
                "turn {}: removed {}, fell {}, bonus {}, score {score}",
                session.turn_count,
                result.removed,
                result.fallen,
                result.bonus_points
            );
        }
    }

    let verdict = if session.is_win() {
        "won"
    } else if session.is_over() {
        "lost"
    } else {
        "timed out"
    };
    println!(
        "{verdict} after {} turns ({shots} shots, {ticks} ticks), score {score}",
        session.turn_count
    );
    Ok(())
}
