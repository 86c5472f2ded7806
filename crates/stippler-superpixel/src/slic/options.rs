//! SLIC configuration

use crate::error::{SuperpixelError, SuperpixelResult};

/// Default target number of superpixels
pub const DEFAULT_SUPERPIXELS: usize = 500;

/// Default compactness weight
pub const DEFAULT_COMPACTNESS: f64 = 10.0;

/// Upper bound on k-means iterations
pub const MAX_KMEANS_ITERATIONS: usize = 15;

/// Relative residual change below which k-means stops
pub const CONVERGENCE_THRESHOLD: f64 = 0.05;

/// Search window half-size floor, in multiples of the grid interval S
pub const MIN_SEARCH_WINDOW: usize = 2;

/// Clusters processed per increment
pub const CLUSTER_GRANULARITY: usize = 10;

/// Pixels processed per increment
pub const PIXEL_GRANULARITY: usize = 1000;

/// Which connected component of a cluster keeps the cluster's label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ComponentPolicy {
    /// The largest component; ties go to the lowest component id
    #[default]
    Largest,
    /// The component under the rounded cluster centre, if the centre pixel
    /// still carries the cluster's label
    ContainsCenter,
}

/// What the output raster shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visualization {
    /// Mean superpixel colour with black boundaries
    #[default]
    Superpixels,
    /// Grey level proportional to the cluster label
    Labels,
    /// Connected-component ids, green when kept and blue when reassigned
    ConnectedComponents,
}

/// Options for [`crate::Slic`]
#[derive(Debug, Clone, PartialEq)]
pub struct SlicOptions {
    /// Target number of superpixels (k)
    pub superpixels: usize,
    /// Compactness weight (m); larger values give squarer superpixels
    pub compactness: f64,
    /// Enforce connectivity after k-means
    pub postprocess: bool,
    /// Component selection during postprocessing
    pub component_policy: ComponentPolicy,
    /// Output raster contents
    pub visualization: Visualization,
    /// Mark superpixel centroids in red
    pub mark_centers: bool,
}

impl Default for SlicOptions {
    fn default() -> Self {
        Self {
            superpixels: DEFAULT_SUPERPIXELS,
            compactness: DEFAULT_COMPACTNESS,
            postprocess: true,
            component_policy: ComponentPolicy::default(),
            visualization: Visualization::default(),
            mark_centers: false,
        }
    }
}

impl SlicOptions {
    pub fn with_superpixels(mut self, k: usize) -> Self {
        self.superpixels = k;
        self
    }

    pub fn with_compactness(mut self, m: f64) -> Self {
        self.compactness = m;
        self
    }

    pub fn with_postprocess(mut self, postprocess: bool) -> Self {
        self.postprocess = postprocess;
        self
    }

    pub fn with_component_policy(mut self, policy: ComponentPolicy) -> Self {
        self.component_policy = policy;
        self
    }

    pub fn with_visualization(mut self, visualization: Visualization) -> Self {
        self.visualization = visualization;
        self
    }

    pub fn with_center_marks(mut self, mark: bool) -> Self {
        self.mark_centers = mark;
        self
    }

    /// Check the options against themselves and an image size
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameters` if k is zero or exceeds the pixel count
    /// enough to make the grid interval S round to zero, if m is not a
    /// positive finite number, or if connected components are to be shown
    /// without postprocessing.
    pub fn validate(&self, pixel_count: usize) -> SuperpixelResult<()> {
        if self.superpixels == 0 {
            return Err(SuperpixelError::InvalidParameters(
                "number of superpixels must be positive".to_string(),
            ));
        }
        if !(self.compactness.is_finite() && self.compactness > 0.0) {
            return Err(SuperpixelError::InvalidParameters(format!(
                "compactness must be positive, got {}",
                self.compactness
            )));
        }
        if grid_interval(pixel_count, self.superpixels) == 0 {
            return Err(SuperpixelError::InvalidParameters(format!(
                "{} superpixels is too many for {} pixels",
                self.superpixels, pixel_count
            )));
        }
        if self.visualization == Visualization::ConnectedComponents && !self.postprocess {
            return Err(SuperpixelError::InvalidParameters(
                "connected component view requires postprocessing".to_string(),
            ));
        }
        Ok(())
    }
}

/// Expected superpixel side length, `S = round(sqrt(N / k))`
pub fn grid_interval(pixel_count: usize, k: usize) -> usize {
    if k == 0 {
        return 0;
    }
    (pixel_count as f64 / k as f64).sqrt().round() as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let o = SlicOptions::default();
        assert_eq!(o.superpixels, 500);
        assert_eq!(o.compactness, 10.0);
        assert!(o.postprocess);
        assert_eq!(o.component_policy, ComponentPolicy::Largest);
    }

    #[test]
    fn test_grid_interval() {
        assert_eq!(grid_interval(16, 4), 2);
        assert_eq!(grid_interval(10000, 500), 4);
        assert_eq!(grid_interval(16, 100), 0);
    }

    #[test]
    fn test_validate() {
        assert!(SlicOptions::default().with_superpixels(4).validate(16).is_ok());
        assert!(SlicOptions::default().with_superpixels(0).validate(16).is_err());
        assert!(SlicOptions::default().with_superpixels(100).validate(16).is_err());
        assert!(
            SlicOptions::default()
                .with_superpixels(4)
                .with_compactness(f64::NAN)
                .validate(16)
                .is_err()
        );
        assert!(
            SlicOptions::default()
                .with_superpixels(4)
                .with_postprocess(false)
                .with_visualization(Visualization::ConnectedComponents)
                .validate(16)
                .is_err()
        );
    }
}
