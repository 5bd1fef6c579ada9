/// Represents errors that can occur while building or querying the world.
///
/// Recoverable gameplay outcomes (a placement loop running out of attempts,
/// an unreachable chase target) are not errors and never show up here.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorldError {
    #[error("Rectangle dimensions ({width}, {height}) must both be positive")]
    InvalidDimensions { width: i32, height: i32 },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Coordinates ({x}, {y}) are out of bounds for grid size ({width}, {height})")]
    GridOutOfBounds {
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    },

    #[error("Grid cell size must be positive, got {0}")]
    InvalidCellSize(i32),
}
