//! Error types for stippler-filter

use stippler_superpixel::SuperpixelError;
use thiserror::Error;

/// Errors that can occur while filtering superpixels
#[derive(Debug, Error)]
pub enum FilterError {
    /// Core library error
    #[error("{0}")]
    Core(#[from] stippler_core::Error),

    /// Error from the wrapped superpixel generator
    #[error("superpixel generation: {0}")]
    Superpixel(#[from] SuperpixelError),

    /// Invalid parameters
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    /// The filtered segmentation was already handed over
    #[error("filtered superpixellation is not available")]
    ResultUnavailable,
}

/// Result type for filter operations
pub type FilterResult<T> = Result<T, FilterError>;
