//! Superpixel score bases

use stippler_core::colorspace::{MAX_LIGHTNESS, MIN_LIGHTNESS};
use stippler_superpixel::{Superpixel, Superpixellation};

/// Smallest possible L* standard deviation
pub const MIN_STDDEV_LIGHTNESS: f64 = 0.0;

/// Largest possible L* standard deviation, half the lightness range
pub const MAX_STDDEV_LIGHTNESS: f64 = (MAX_LIGHTNESS - MIN_LIGHTNESS) / 2.0;

/// Description of the auxiliary image needed by [`ScoreBasis::External`]
pub const SELECTION_MAP_DESCRIPTION: &str = "Open pixel soft selection map";

/// Statistic used to score superpixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScoreBasis {
    /// Pixel count relative to the mean superpixel size; keeps large
    /// superpixels
    #[default]
    Size,
    /// Standard deviation of L*, normalized over `[0, 50]`; keeps uniform
    /// superpixels
    StdDevLightness,
    /// Mean L* of a soft selection map over the superpixel; keeps dark
    /// regions of the map
    External,
}

impl ScoreBasis {
    /// Whether superpixels scoring below the threshold are selected
    ///
    /// Otherwise those at or above it are.
    pub fn selects_below(self) -> bool {
        !matches!(self, Self::Size)
    }

    pub fn is_selected(self, score: f64, threshold: f64) -> bool {
        if self.selects_below() {
            score < threshold
        } else {
            score >= threshold
        }
    }

    /// Whether this basis reads a second image
    pub fn needs_selection_map(self) -> bool {
        self == Self::External
    }

    /// Normalized score range fixed in advance, if any
    ///
    /// Other bases use the observed minimum and maximum.
    pub fn fixed_range(self) -> Option<(f64, f64)> {
        match self {
            Self::External => Some((MIN_LIGHTNESS, MAX_LIGHTNESS)),
            _ => None,
        }
    }

    /// Unnormalized statistic of one superpixel
    ///
    /// `map_lightness` is the L* plane of the selection map and is only read
    /// by [`ScoreBasis::External`].
    pub fn raw_score(self, sp: &Superpixel, map_lightness: Option<&[f64]>) -> f64 {
        match self {
            Self::Size => sp.size() as f64,
            Self::StdDevLightness => sp.std_dev_channels().l,
            Self::External => match map_lightness {
                Some(l) if !sp.is_empty() => {
                    let sum: f64 = sp.pixels().iter().map(|&k| l[k]).sum();
                    sum / sp.size() as f64
                }
                _ => 0.0,
            },
        }
    }

    /// Normalize a raw score
    pub fn normalize(self, raw: f64, segmentation: &Superpixellation) -> f64 {
        match self {
            Self::Size => {
                let pixels = segmentation.labels().len();
                if pixels == 0 {
                    0.0
                } else {
                    raw * segmentation.n_superpixels() as f64 / pixels as f64
                }
            }
            Self::StdDevLightness => {
                (raw - MIN_STDDEV_LIGHTNESS) / (MAX_STDDEV_LIGHTNESS - MIN_STDDEV_LIGHTNESS)
            }
            Self::External => raw,
        }
    }
}
