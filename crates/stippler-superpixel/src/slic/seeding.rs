//! Seed grid for the initial cluster centres
//!
//! The image is covered by the smallest grid of S x S squares that contains
//! it, then the grid is scaled back onto the image. Centre `c` of `k` is
//! placed in grid square `round(c * squares / k)`, which spreads any `k`
//! evenly over the squares even when it does not match their count.

use stippler_core::PixelImage;

use super::kmeans::ClusterCenter;
use super::options::MIN_SEARCH_WINDOW;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SeedGrid {
    width: u32,
    height: u32,
    width_in_s: usize,
    width_conversion: f64,
    height_conversion: f64,
    x_offset: usize,
    y_offset: usize,
    k_conversion: f64,
    /// Half width of the labelling search window
    pub(crate) search_half_width: i64,
    /// Half height of the labelling search window
    pub(crate) search_half_height: i64,
}

impl SeedGrid {
    /// Lay out the grid for an image of `width` x `height`, interval `s`
    /// (non-zero) and `k` centres
    pub(crate) fn new(width: u32, height: u32, s: usize, k: usize) -> Self {
        let sf = s as f64;
        let width_in_s = (width as f64 / sf).ceil() as usize;
        let height_in_s = (height as f64 / sf).ceil() as usize;
        let width_conversion = sf * width as f64 / (width_in_s * s) as f64;
        let height_conversion = sf * height as f64 / (height_in_s * s) as f64;
        let k_conversion = (width_in_s * height_in_s) as f64 / k as f64;

        // Reach the next seeded square in every direction, plus slack for
        // the gradient snap and centre rounding.
        let reach = k_conversion.ceil() - 0.5;
        let floor = (MIN_SEARCH_WINDOW * s) as i64;
        let search_half_width = ((reach * width_conversion).ceil() as i64 + 4).max(floor);
        let search_half_height = ((reach * height_conversion).ceil() as i64 + 4).max(floor);

        Self {
            width,
            height,
            width_in_s,
            width_conversion,
            height_conversion,
            x_offset: (width_conversion as usize) / 2,
            y_offset: (height_conversion as usize) / 2,
            k_conversion,
            search_half_width,
            search_half_height,
        }
    }

    /// Grid position of centre `c` before snapping
    pub(crate) fn position(&self, c: usize) -> (u32, u32) {
        let square = (c as f64 * self.k_conversion).round() as usize;
        let gx = (square % self.width_in_s) as f64;
        let gy = (square / self.width_in_s) as f64;
        let x = (gx * self.width_conversion).floor() as usize + self.x_offset;
        let y = (gy * self.height_conversion).floor() as usize + self.y_offset;
        (
            x.min(self.width as usize - 1) as u32,
            y.min(self.height as usize - 1) as u32,
        )
    }

    /// Seed centre `c`: its grid position moved to the lowest-gradient pixel
    /// among itself and its 8-neighbours
    pub(crate) fn seed(&self, image: &PixelImage, c: usize) -> ClusterCenter {
        let (x, y) = self.position(c);
        let mut best = image.xy_to_index(x, y);
        let mut best_magnitude = gradient_magnitude(image, best);
        for nb in image.eight_neighbours(best).iter() {
            let magnitude = gradient_magnitude(image, nb);
            if magnitude < best_magnitude {
                best_magnitude = magnitude;
                best = nb;
            }
        }
        let (bx, by) = image.index_to_xy(best);
        ClusterCenter {
            x: bx as f64,
            y: by as f64,
            color: image.lab_at_index(best).unwrap_or_default(),
        }
    }
}

fn gradient_magnitude(image: &PixelImage, k: usize) -> f64 {
    image
        .sobel_gradient(k)
        .map_or(f64::INFINITY, |g| g.magnitude_squared())
}
