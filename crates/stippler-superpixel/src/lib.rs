//! stippler-superpixel - Superpixel segmentation for stippler
//!
//! This crate provides:
//!
//! - **SLIC** - Incremental Simple Linear Iterative Clustering ([`Slic`])
//! - **Superpixellation** - A segmentation with per-superpixel statistics
//!   ([`Superpixellation`], [`Superpixel`])
//! - **Generators** - The [`SuperpixelGenerator`] seam used by filters, with
//!   [`PrecomputedSuperpixels`] for segmentations built elsewhere
//!
//! # Examples
//!
//! ## Segmenting an image
//!
//! ```
//! use stippler_core::{PixelImage, run_with_images};
//! use stippler_superpixel::{Slic, SlicOptions, SuperpixelGenerator};
//!
//! let l: Vec<f64> = (0..100).map(|k| if k % 10 < 5 { 20.0 } else { 80.0 }).collect();
//! let image = PixelImage::from_lightness(10, 10, l).unwrap();
//!
//! let mut slic = Slic::new(SlicOptions::default().with_superpixels(4));
//! let output = run_with_images(&mut slic, vec![image], &mut |_: &str| {}).unwrap();
//! assert!(output.is_some());
//!
//! let segmentation = slic.take_superpixellation().unwrap();
//! let total: usize = segmentation.superpixels().iter().map(|s| s.size()).sum();
//! assert_eq!(total, 100);
//! ```
//!
//! ## Wrapping existing labels
//!
//! ```
//! use stippler_core::PixelImage;
//! use stippler_superpixel::Superpixellation;
//!
//! let image = PixelImage::from_lightness(2, 2, vec![0.0, 0.0, 100.0, 100.0]).unwrap();
//! let seg = Superpixellation::from_labels(image, vec![0, 0, 1, 1], 2).unwrap();
//! assert_eq!(seg.superpixel(1).unwrap().size(), 2);
//! ```

pub mod error;
pub mod generator;
pub mod slic;
pub mod superpixel;
pub mod superpixellation;

pub use error::{SuperpixelError, SuperpixelResult};
pub use generator::{PrecomputedSuperpixels, SuperpixelGenerator};
pub use slic::{ClusterCenter, ComponentPolicy, Slic, SlicOptions, SlicStage, Visualization};
pub use superpixel::Superpixel;
pub use superpixellation::{NO_LABEL, Superpixellation};
