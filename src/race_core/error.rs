//! Error - Configuration failures that keep a race from starting

use thiserror::Error;

/// Errors raised while building a track or validating a race config.
///
/// Gameplay conditions (off-track, collisions) are never errors; they are
/// surfaced as flags on the vehicles and the race.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RaceError {
    #[error("track needs at least {min} control points, got {found}")]
    TooFewControlPoints { found: usize, min: usize },

    #[error("samples per span must be at least 1")]
    NoSamplesPerSpan,

    #[error("control point {index} is not finite")]
    NonFiniteControlPoint { index: usize },

    #[error("track loop is degenerate: total length {length}")]
    DegenerateLoop { length: f32 },

    #[error("invalid race config: {0}")]
    InvalidConfig(String),
}
