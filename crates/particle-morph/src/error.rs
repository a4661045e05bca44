//! Error types for the particle morph core.

use crate::gesture::Gesture;
use thiserror::Error;

/// Errors surfaced by loading, registration and state requests.
///
/// Most asset problems are recovered from inside the loader (fallbacks and
/// degenerate clouds); what reaches callers is either a precondition violation
/// or a configuration problem.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MorphError {
    /// A state was requested before the registry finished loading.
    #[error("scene is not ready; point clouds are still loading")]
    NotReady,

    /// A state was requested that has no registered point cloud.
    #[error("gesture `{0}` has no registered point cloud")]
    UnknownState(Gesture),

    /// A point cloud does not match the registry's particle count.
    #[error("point cloud for `{gesture}` has {actual} values, expected {expected}")]
    LengthMismatch {
        gesture: Gesture,
        expected: usize,
        actual: usize,
    },

    /// A color array is not parallel to its position array.
    #[error("color array has {colors} values but positions have {positions}")]
    ColorMismatch { positions: usize, colors: usize },

    /// Text input produced no "on" glyph cells.
    #[error("text produced no glyph cells to anchor particles on")]
    EmptyText,

    /// A mesh asset could not be read or parsed.
    #[error("mesh asset: {0}")]
    Mesh(String),

    /// Unparseable gesture name.
    #[error("unknown gesture name `{0}`")]
    UnknownGestureName(String),

    /// A configuration document parsed but describes an unusable scene.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("config: {0}")]
    Config(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result alias for the core crate.
pub type Result<T> = std::result::Result<T, MorphError>;
