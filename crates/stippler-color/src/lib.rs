//! stippler-color - Whole-image lightness algorithms
//!
//! Both algorithms are [`stippler_core::IncrementalAlgorithm`]s that end in
//! a lightness-only [`stippler_core::PixelImage`]:
//!
//! - [`LabGreyscale`] - Drop the a*/b* channels of an image
//! - [`MidtoneFilter`] - Emphasize midtones through two logistic curves

pub mod error;
pub mod greyscale;
pub mod midtone;

pub use error::{ColorError, ColorResult};
pub use greyscale::{GreyscaleStage, LabGreyscale};
pub use midtone::{MidtoneFilter, MidtoneOptions, MidtoneStage};

/// Pixels processed per increment
pub const PIXEL_GRANULARITY: usize = 10_000;
