use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by the contrast pipeline.
///
/// Only [`ContrastError::UnrecognizedColorFormat`] ever reaches the caller of
/// an entity analysis. Image and geometry problems are recovered inside the
/// extractor and compositor.
#[derive(Debug, Error)]
pub enum ContrastError {
    #[error("unrecognized color format: {0:?}")]
    UnrecognizedColorFormat(String),

    #[error("failed to decode image {}: {reason}", path.display())]
    ImageDecodeFailure { path: PathBuf, reason: String },

    #[error("degenerate region {width}x{height} after clamping to image bounds")]
    DegenerateRegion { width: u32, height: u32 },

    #[error("entity has no usable geometry")]
    MissingGeometry,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = ContrastError> = std::result::Result<T, E>;
