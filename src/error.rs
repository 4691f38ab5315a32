use thiserror::Error;

use crate::render::RenderError;

/// Library error type for image set operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The configured photo directory is missing or not a directory.
    #[error("invalid photo directory: {0}")]
    BadDir(String),

    /// An image index outside `[0, len)` was requested.
    #[error("image index {index} out of range for {len} images")]
    IndexOutOfRange { index: usize, len: usize },

    /// The renderer could not run the load at all.
    #[error(transparent)]
    Render(#[from] RenderError),
}
