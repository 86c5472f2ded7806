//! Error types for stippler-superpixel

use thiserror::Error;

/// Errors that can occur during superpixel segmentation
#[derive(Debug, Error)]
pub enum SuperpixelError {
    /// Core library error
    #[error("{0}")]
    Core(#[from] stippler_core::Error),

    /// Invalid parameters
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    /// A pixel label does not name a superpixel
    #[error("label {label} at pixel {pixel} is not below the superpixel count {count}")]
    LabelOutOfRange {
        pixel: usize,
        label: usize,
        count: usize,
    },

    /// The segmentation was already handed over
    #[error("superpixellation is not available")]
    ResultUnavailable,
}

/// Result type for superpixel operations
pub type SuperpixelResult<T> = Result<T, SuperpixelError>;
