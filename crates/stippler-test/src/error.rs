//! Errors raised by the regression harness

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TestError {
    /// A PNG file could not be decoded into a raster
    #[error("cannot decode PNG '{path}': {message}")]
    PngDecode { path: String, message: String },

    /// A raster could not be encoded as PNG
    #[error("cannot encode PNG '{path}': {message}")]
    PngEncode { path: String, message: String },

    /// Building a fixture image failed
    #[error(transparent)]
    Core(#[from] stippler_core::Error),

    #[error("file access failed: {0}")]
    Io(#[from] std::io::Error),
}

pub type TestResult<T> = Result<T, TestError>;
