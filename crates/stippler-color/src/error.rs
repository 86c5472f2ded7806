//! Error types for stippler-color

use thiserror::Error;

/// Errors that can occur during whole-image colour processing
#[derive(Debug, Error)]
pub enum ColorError {
    /// Core library error
    #[error("{0}")]
    Core(#[from] stippler_core::Error),

    /// Invalid parameters
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    /// The result image was already handed over
    #[error("result image is not available")]
    ResultUnavailable,
}

/// Result type for colour operations
pub type ColorResult<T> = Result<T, ColorError>;
