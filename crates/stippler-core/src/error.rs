//! Error types for stippler-core
//!
//! Provides a unified error type for image construction, pixel access and
//! the incremental algorithm protocol. The `Display` text of each variant is
//! the status message handed back to a host that drives an algorithm.

use thiserror::Error;

/// Stippler core error type
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid image dimensions
    #[error("invalid image dimensions: {width}x{height}")]
    InvalidDimension { width: u32, height: u32 },

    /// Image dimension mismatch
    #[error("dimension mismatch: expected {}x{}, got {}x{}", .expected.0, .expected.1, .actual.0, .actual.1)]
    DimensionMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },

    /// Index out of bounds
    #[error("index out of bounds: {index} >= {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    /// Channel buffer does not match the image size
    #[error("invalid data length: expected {expected}, got {actual}")]
    DataLength { expected: usize, actual: usize },

    /// Invalid parameter value
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Wrong number of input images for an algorithm
    #[error("expected {expected} input image(s), got {actual}")]
    ImageCount { expected: usize, actual: usize },

    /// Memory allocation failed
    #[error("memory allocation failed")]
    AllocationFailed,

    /// `advance` called after a failure
    #[error("Cannot increment - Processing has failed.")]
    AlreadyFailed,

    /// `advance` called after completion
    #[error("Cannot increment - Processing has already finished.")]
    AlreadyFinished,

    /// `advance` called before a successful `initialize`
    #[error("Cannot increment - Processing has not been initialized.")]
    NotInitialized,

    /// Result requested before processing finished
    #[error("processing has not finished")]
    NotFinished,

    /// Result requested from an algorithm whose output was disabled
    #[error("output is disabled for this algorithm")]
    OutputDisabled,

    /// Unreachable stage or inconsistent counters
    #[error("Unexpected progress information - Corrupted internal state.")]
    CorruptedState,

    /// Host requested cancellation between increments
    #[error("processing was cancelled")]
    Cancelled,
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Multiply two image dimensions into a pixel count.
///
/// # Errors
///
/// Returns `Error::InvalidDimension` if either side is zero or the product
/// does not fit the signed 32-bit pixel index range.
pub fn pixel_count(width: u32, height: u32) -> Result<usize> {
    if width == 0 || height == 0 {
        return Err(Error::InvalidDimension { width, height });
    }
    let n = (width as u64) * (height as u64);
    if n > i32::MAX as u64 {
        return Err(Error::InvalidDimension { width, height });
    }
    Ok(n as usize)
}

/// Allocate a vector of `len` copies of `value`, reporting failure instead
/// of aborting.
///
/// # Errors
///
/// Returns `Error::AllocationFailed` if the buffer cannot be reserved.
pub fn try_alloc<T: Clone>(len: usize, value: T) -> Result<Vec<T>> {
    let mut v = Vec::new();
    v.try_reserve_exact(len).map_err(|_| Error::AllocationFailed)?;
    v.resize(len, value);
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_count() {
        assert_eq!(pixel_count(4, 3).unwrap(), 12);
        assert!(matches!(
            pixel_count(0, 3),
            Err(Error::InvalidDimension { width: 0, height: 3 })
        ));
        assert!(pixel_count(65536, 65536).is_err());
    }

    #[test]
    fn test_try_alloc() {
        assert_eq!(try_alloc(3, 7u8).unwrap(), vec![7, 7, 7]);
        assert!(matches!(
            try_alloc(usize::MAX, 0u64),
            Err(Error::AllocationFailed)
        ));
    }

    #[test]
    fn test_status_messages() {
        assert_eq!(
            Error::AlreadyFailed.to_string(),
            "Cannot increment - Processing has failed."
        );
        assert_eq!(
            Error::AlreadyFinished.to_string(),
            "Cannot increment - Processing has already finished."
        );
        let e = Error::DimensionMismatch {
            expected: (4, 4),
            actual: (4, 5),
        };
        assert_eq!(e.to_string(), "dimension mismatch: expected 4x4, got 4x5");
    }
}
