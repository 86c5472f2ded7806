//! stippler-filter - Superpixel selection for stippler
//!
//! Scores every superpixel of a segmentation on one statistic, picks an
//! Otsu threshold from the score histogram and marks the superpixels on the
//! chosen side of it as selected.
//!
//! - [`LocalDataFilter`] - Incremental filter wrapping any
//!   [`stippler_superpixel::SuperpixelGenerator`]
//! - [`ScoreBasis`] - Size, L* standard deviation, or an external soft
//!   selection map
//! - [`ScoreHistogram`] - Histogram and Otsu threshold
//! - [`FilteredSuperpixellation`] - Segmentation plus selection flags
//!
//! # Examples
//!
//! ```
//! use stippler_core::{PixelImage, run_with_images};
//! use stippler_filter::{LocalDataFilter, ScoreBasis};
//! use stippler_superpixel::SlicOptions;
//!
//! let l: Vec<f64> = (0..144).map(|k| if k % 12 < 6 { 30.0 } else { 70.0 }).collect();
//! let image = PixelImage::from_lightness(12, 12, l).unwrap();
//!
//! let mut filter =
//!     LocalDataFilter::with_slic(SlicOptions::default().with_superpixels(9), ScoreBasis::Size);
//! let raster = run_with_images(&mut filter, vec![image], &mut |_: &str| {}).unwrap();
//! assert_eq!(raster.map(|r| r.dimensions()), Some((24, 12)));
//!
//! let filtered = filter.take_filtered().unwrap();
//! assert_eq!(filtered.selected_pixels().len(), 144);
//! ```

pub mod error;
pub mod filtered;
pub mod histogram;
pub mod local_data;
pub mod score;

pub use error::{FilterError, FilterResult};
pub use filtered::FilteredSuperpixellation;
pub use histogram::{ScoreHistogram, bin_count};
pub use local_data::{FilterStage, LocalDataFilter};
pub use score::{SELECTION_MAP_DESCRIPTION, ScoreBasis};
