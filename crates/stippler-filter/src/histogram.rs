//! Score histogram and Otsu threshold selection
//!
//! Scores are binned into `clamp(floor(n / 3), 10, 256)` equal-width bins
//! spanning `[min, max]`, with `min` at the left edge of bin 0 and `max` at
//! the left edge of the last bin. Otsu's method then picks the bin boundary
//! that maximizes the between-class variance of the two partitions.

/// Upper bound on the number of bins
pub const MAX_HISTOGRAM_BINS: usize = 256;

/// Lower bound on the number of bins
pub const MIN_HISTOGRAM_BINS: usize = 10;

/// Scores per bin used to size the histogram
pub const SCORES_PER_BIN: usize = 3;

/// Number of bins for `n_scores` scores
pub fn bin_count(n_scores: usize) -> usize {
    (n_scores / SCORES_PER_BIN).clamp(MIN_HISTOGRAM_BINS, MAX_HISTOGRAM_BINS)
}

/// Histogram of superpixel scores
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreHistogram {
    bins: Vec<usize>,
    min: f64,
    max: f64,
    /// `(n_bins - 1) / (max - min)`; zero when the range is empty
    inverse_bin_width: f64,
    total: usize,
}

impl ScoreHistogram {
    /// Empty histogram for `n_scores` scores in `[min, max]`
    pub fn new(n_scores: usize, min: f64, max: f64) -> Self {
        let n_bins = bin_count(n_scores);
        let range = max - min;
        let inverse_bin_width = if range > 0.0 && range.is_finite() {
            (n_bins - 1) as f64 / range
        } else {
            0.0
        };
        Self {
            bins: vec![0; n_bins],
            min,
            max,
            inverse_bin_width,
            total: 0,
        }
    }

    /// Bin index of a score, clamped to the histogram
    pub fn bin_of(&self, score: f64) -> usize {
        let bin = ((score - self.min) * self.inverse_bin_width).floor();
        if bin.is_nan() || bin <= 0.0 {
            0
        } else {
            (bin as usize).min(self.bins.len() - 1)
        }
    }

    pub fn add(&mut self, score: f64) {
        let bin = self.bin_of(score);
        self.bins[bin] += 1;
        self.total += 1;
    }

    pub fn bins(&self) -> &[usize] {
        &self.bins
    }

    pub fn n_bins(&self) -> usize {
        self.bins.len()
    }

    /// Number of scores added
    pub fn total(&self) -> usize {
        self.total
    }

    /// Score at the left edge of bin `bin`
    pub fn bin_start(&self, bin: usize) -> f64 {
        if self.inverse_bin_width == 0.0 {
            self.min
        } else {
            bin as f64 / self.inverse_bin_width + self.min
        }
    }

    /// Otsu's bin boundary
    ///
    /// Boundary `t` splits the histogram into bins `[0, t)` and `[t, n)`.
    /// Boundaries leaving either side empty are skipped, and ties keep the
    /// lowest boundary. Returns 0 when no boundary separates two non-empty
    /// classes.
    pub fn otsu_bin(&self) -> usize {
        let sum_all: usize = self.bins.iter().enumerate().map(|(i, &h)| i * h).sum();

        let mut weight_dark = 0usize;
        let mut sum_dark = 0usize;
        let mut max_variance = 0.0f64;
        let mut threshold = 0usize;

        for bin in 1..self.bins.len() {
            let count = self.bins[bin - 1];
            weight_dark += count;
            if weight_dark == 0 {
                continue;
            }
            let weight_light = self.total - weight_dark;
            if weight_light == 0 {
                break;
            }

            sum_dark += (bin - 1) * count;
            let mean_dark = sum_dark as f64 / weight_dark as f64;
            let mean_light = (sum_all - sum_dark) as f64 / weight_light as f64;
            let diff = mean_light - mean_dark;
            let variance = (weight_dark as f64) * (weight_light as f64) * diff * diff;

            if variance > max_variance {
                max_variance = variance;
                threshold = bin;
            }
        }
        threshold
    }

    /// Otsu threshold as a score
    pub fn otsu_threshold(&self) -> f64 {
        self.bin_start(self.otsu_bin())
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
