//! Stippler - Incremental superpixel segmentation and filtering
//!
//! # Overview
//!
//! Every algorithm is a host-driven state machine: initialize it with its
//! images, call `advance` until it reports completion, then collect the
//! rendered raster or the programmatic result.
//!
//! - SLIC superpixels over CIE L*a*b* colour ([`superpixel`])
//! - Otsu-thresholded selection of superpixels by size, L* texture or an
//!   external soft selection map ([`filter`])
//! - Lightness-only greyscale and midtone emphasis ([`tone`])
//!
//! # Example
//!
//! ```
//! use stippler::superpixel::{Slic, SlicOptions, SuperpixelGenerator};
//! use stippler::{PixelImage, run_with_images};
//!
//! let image = PixelImage::from_interleaved_rgb(4, 4, &[128; 48]).unwrap();
//! let mut slic = Slic::new(SlicOptions::default().with_superpixels(4));
//! let raster = run_with_images(&mut slic, vec![image], &mut |_: &str| {}).unwrap();
//! assert_eq!(raster.map(|r| r.dimensions()), Some((4, 4)));
//! assert_eq!(slic.take_superpixellation().unwrap().n_superpixels(), 4);
//! ```

// Re-export core types (primary data structures used everywhere)
pub use stippler_core::*;

// Re-export domain crates as modules to avoid name conflicts
pub use stippler_color as tone;
pub use stippler_filter as filter;
pub use stippler_superpixel as superpixel;
