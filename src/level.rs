//! Level configuration
//!
//! Levels are plain JSON blobs consumed at session construction.
//! Validation is fail-fast: a level that cannot produce a playable grid
//! is rejected with a descriptive [`LevelError`] before any state is
//! built. Out-of-bounds fixed entities, by contrast, are a tolerated
//! designer mistake and are skipped (with a warning) at spawn time.

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::sim::StepResult;

/// How the pre-filled rows are populated at spawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpawnPattern {
    /// Top rows filled column by column, palette cycling by column.
    /// A `fill_chance` below 1.0 punches random holes.
    #[default]
    RowsFull,
    /// Each cell of the top rows filled independently with probability
    /// `fill_chance`, random palette color.
    RandomSparse,
}

/// Initial grid population parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpawnSpec {
    /// Number of rows (from the top) to pre-fill.
    pub initial_filled_rows: usize,
    #[serde(default)]
    pub pattern: SpawnPattern,
    /// Fill probability in [0, 1].
    #[serde(default = "default_fill_chance")]
    pub fill_chance: f32,
}

fn default_fill_chance() -> f32 {
    1.0
}

/// Obstacle silhouette, forwarded untouched to the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObstacleShape {
    #[default]
    Square,
    Circle,
}

/// A fixed occupant placed at a grid address before play starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntitySpec {
    /// Indestructible blocker. Anchors connectivity, never matches.
    Obstacle {
        row: usize,
        col: usize,
        #[serde(default)]
        shape: ObstacleShape,
    },
    /// Consumed for points when a sphere lands next to it.
    Bonus {
        row: usize,
        col: usize,
        /// Falls back to `scoring.bonus_default` when absent.
        #[serde(default)]
        points: Option<u32>,
    },
}

/// Scoring weights applied by the external scoring collaborator.
///
/// The engine itself only reports raw counts; [`ScoringWeights::score`]
/// is the single place the weights are combined.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScoringWeights {
    #[serde(default = "default_per_removed")]
    pub per_removed: u32,
    #[serde(default = "default_per_fallen")]
    pub per_fallen: u32,
    /// Value of a bonus entity that carries no explicit `points`.
    #[serde(default = "default_bonus")]
    pub bonus_default: u32,
}

fn default_per_removed() -> u32 {
    DEFAULT_POINTS_PER_REMOVED
}

fn default_per_fallen() -> u32 {
    DEFAULT_POINTS_PER_FALLEN
}

fn default_bonus() -> u32 {
    DEFAULT_BONUS_POINTS
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            per_removed: default_per_removed(),
            per_fallen: default_per_fallen(),
            bonus_default: default_bonus(),
        }
    }
}

impl ScoringWeights {
    /// Points awarded for one step result.
    pub fn score(&self, result: StepResult) -> u32 {
        result.removed * self.per_removed + result.fallen * self.per_fallen + result.bonus_points
    }
}

/// A complete level definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelConfig {
    #[serde(default)]
    pub name: String,
    /// Playfield width in pixels (left/right walls).
    pub width: f32,
    /// Playfield height in pixels.
    pub height: f32,
    /// Sphere radius; cell spacing derives from it.
    pub radius: f32,
    /// Grid row count.
    pub rows: usize,
    /// Grid column count; derived from `width` when absent.
    #[serde(default)]
    pub cols: Option<usize>,
    /// Pixel y of row 0 at level start.
    #[serde(default = "default_start_y")]
    pub start_y: f32,
    /// Shooter rest y; defaults to `height` minus a fixed margin.
    #[serde(default)]
    pub shooter_y: Option<f32>,
    /// Ordered color identifiers (opaque to the engine, e.g. CSS hex).
    pub palette: Vec<String>,
    pub spawn: SpawnSpec,
    #[serde(default = "default_turns_per_drop")]
    pub turns_per_drop: u32,
    #[serde(default = "default_shot_speed")]
    pub shot_speed: f32,
    #[serde(default)]
    pub entities: Vec<EntitySpec>,
    #[serde(default)]
    pub scoring: ScoringWeights,
}

fn default_start_y() -> f32 {
    DEFAULT_START_Y
}

fn default_turns_per_drop() -> u32 {
    DEFAULT_TURNS_PER_DROP
}

fn default_shot_speed() -> f32 {
    DEFAULT_SHOT_SPEED
}

impl LevelConfig {
    /// Parse and validate a level from JSON.
    pub fn from_json(json: &str) -> Result<Self, LevelError> {
        let level: Self = serde_json::from_str(json).map_err(LevelError::Parse)?;
        level.validate()?;
        Ok(level)
    }

    /// Resolved column count: explicit, or as many cells as fit the
    /// playfield width at the configured radius.
    pub fn cols(&self) -> usize {
        self.cols
            .unwrap_or_else(|| ((self.width - self.radius) / (self.radius * 2.0)).floor() as usize)
    }

    /// Resolved shooter rest y.
    pub fn shooter_y(&self) -> f32 {
        self.shooter_y.unwrap_or(self.height - SHOOTER_MARGIN_Y)
    }

    /// Danger line: occupants at or past this y lose the game.
    pub fn danger_line_y(&self) -> f32 {
        self.shooter_y() - self.radius * 2.0
    }

    /// Check the level can produce a playable grid.
    pub fn validate(&self) -> Result<(), LevelError> {
        if self.radius <= 0.0 || !self.radius.is_finite() {
            return Err(LevelError::InvalidValue {
                field: "radius",
                value: self.radius,
            });
        }
        if self.width <= 0.0 || self.height <= 0.0 {
            return Err(LevelError::InvalidValue {
                field: "width/height",
                value: self.width.min(self.height),
            });
        }
        if self.rows == 0 || self.cols() == 0 {
            return Err(LevelError::InvalidGrid {
                rows: self.rows,
                cols: self.cols(),
            });
        }
        if self.palette.is_empty() {
            return Err(LevelError::EmptyPalette);
        }
        if !(0.0..=1.0).contains(&self.spawn.fill_chance) {
            return Err(LevelError::InvalidValue {
                field: "spawn.fill_chance",
                value: self.spawn.fill_chance,
            });
        }
        if self.turns_per_drop == 0 {
            return Err(LevelError::InvalidValue {
                field: "turns_per_drop",
                value: 0.0,
            });
        }
        if self.shot_speed <= 0.0 {
            return Err(LevelError::InvalidValue {
                field: "shot_speed",
                value: self.shot_speed,
            });
        }
        Ok(())
    }
}

/// Why a level was rejected at construction.
#[derive(Debug)]
pub enum LevelError {
    Parse(serde_json::Error),
    EmptyPalette,
    InvalidGrid { rows: usize, cols: usize },
    InvalidValue { field: &'static str, value: f32 },
}

impl std::fmt::Display for LevelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LevelError::Parse(e) => write!(f, "level JSON is malformed: {e}"),
            LevelError::EmptyPalette => write!(f, "level palette must list at least one color"),
            LevelError::InvalidGrid { rows, cols } => {
                write!(f, "grid dimensions must be positive (rows={rows}, cols={cols})")
            }
            LevelError::InvalidValue { field, value } => {
                write!(f, "level field `{field}` has invalid value {value}")
            }
        }
    }
}

impl std::error::Error for LevelError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LevelError::Parse(e) => Some(e),
            _ => None,
        }
    }
}
