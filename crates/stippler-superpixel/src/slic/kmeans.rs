//! Local k-means over spatial position and L*a*b* colour

use stippler_core::Lab;

use super::options::{CONVERGENCE_THRESHOLD, MAX_KMEANS_ITERATIONS};

/// Cluster centre: real-valued position plus mean colour
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ClusterCenter {
    pub x: f64,
    pub y: f64,
    pub color: Lab,
}

impl ClusterCenter {
    /// Combined SLIC distance to a pixel
    ///
    /// `sqrt(dc^2 + ds^2 * spatial_weight)` with `spatial_weight = m^2 / S^2`.
    #[inline]
    pub fn distance(&self, x: f64, y: f64, color: &Lab, spatial_weight: f64) -> f64 {
        let dx = self.x - x;
        let dy = self.y - y;
        let ds_sq = dx * dx + dy * dy;
        let dc_sq = self.color.distance_squared(color);
        (dc_sq + ds_sq * spatial_weight).sqrt()
    }

    /// Squared spatial displacement from another centre
    #[inline]
    pub fn displacement_squared(&self, other: &ClusterCenter) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }
}

/// Running sums for one cluster during the update pass
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub(crate) struct CenterSums {
    x: f64,
    y: f64,
    l: f64,
    a: f64,
    b: f64,
}

impl CenterSums {
    #[inline]
    pub(crate) fn add(&mut self, x: f64, y: f64, color: &Lab) {
        self.x += x;
        self.y += y;
        self.l += color.l;
        self.a += color.a;
        self.b += color.b;
    }

    /// Mean centre over `count` pixels; `None` for an empty cluster
    pub(crate) fn mean(&self, count: usize) -> Option<ClusterCenter> {
        if count == 0 {
            return None;
        }
        let n = count as f64;
        Some(ClusterCenter {
            x: self.x / n,
            y: self.y / n,
            color: Lab::new(self.l / n, self.a / n, self.b / n),
        })
    }
}

/// Index of the centre nearest to a pixel over all clusters
pub(crate) fn nearest_center(
    centers: &[ClusterCenter],
    x: f64,
    y: f64,
    color: &Lab,
    spatial_weight: f64,
) -> usize {
    let mut best = 0;
    let mut best_distance = f64::INFINITY;
    for (c, center) in centers.iter().enumerate() {
        let d = center.distance(x, y, color, spatial_weight);
        if d < best_distance {
            best_distance = d;
            best = c;
        }
    }
    best
}

/// Whether k-means should stop after `iteration` (zero-based)
///
/// Stops at the iteration cap, or from the third iteration on once the
/// relative change of the residual's square root is at most the threshold.
/// Two zero residuals in a row count as converged.
pub(crate) fn has_converged(iteration: usize, residual: f64, previous_residual: f64) -> bool {
    if iteration + 1 >= MAX_KMEANS_ITERATIONS {
        return true;
    }
    if iteration <= 1 {
        return false;
    }
    let previous = previous_residual.sqrt();
    if previous == 0.0 {
        return residual == 0.0;
    }
    ((residual.sqrt() - previous) / previous).abs() <= CONVERGENCE_THRESHOLD
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_weighting() {
        let c = ClusterCenter {
            x: 0.0,
            y: 0.0,
            color: Lab::new(50.0, 0.0, 0.0),
        };
        let same = Lab::new(50.0, 0.0, 0.0);
        // m = 10, S = 5: weight 4, ds = 5 -> sqrt(25 * 4) = 10
        assert!((c.distance(3.0, 4.0, &same, 4.0) - 10.0).abs() < 1e-12);
        let other = Lab::new(56.0, 8.0, 0.0);
        assert!((c.distance(0.0, 0.0, &other, 4.0) - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_mean() {
        let mut s = CenterSums::default();
        s.add(1.0, 2.0, &Lab::new(10.0, 2.0, -2.0));
        s.add(3.0, 4.0, &Lab::new(30.0, 4.0, -4.0));
        let c = s.mean(2).unwrap();
        assert_eq!((c.x, c.y), (2.0, 3.0));
        assert_eq!(c.color, Lab::new(20.0, 3.0, -3.0));
        assert!(s.mean(0).is_none());
    }

    #[test]
    fn test_nearest_center() {
        let centers = [
            ClusterCenter {
                x: 0.0,
                y: 0.0,
                color: Lab::default(),
            },
            ClusterCenter {
                x: 10.0,
                y: 0.0,
                color: Lab::default(),
            },
        ];
        assert_eq!(nearest_center(&centers, 7.0, 0.0, &Lab::default(), 1.0), 1);
        // equidistant: the first centre wins
        assert_eq!(nearest_center(&centers, 5.0, 0.0, &Lab::default(), 1.0), 0);
    }

    #[test]
    fn test_convergence() {
        assert!(!has_converged(0, 0.0, 0.0));
        assert!(!has_converged(1, 4.0, 0.0));
        assert!(has_converged(2, 100.0, 100.0));
        assert!(has_converged(2, 0.0, 0.0));
        assert!(!has_converged(2, 100.0, 50.0));
        // sqrt(1.1) / sqrt(1) - 1 ~ 0.0488
        assert!(has_converged(3, 1.1, 1.0));
        assert!(has_converged(MAX_KMEANS_ITERATIONS - 1, 1000.0, 1.0));
    }
}
