//! Superpixel - statistics of one segment
//!
//! A `Superpixel` is computed once from its pixel list and the final label
//! array, and is read-only afterwards. Its pixels are stored boundary first,
//! then interior, so both sets are contiguous slices of one buffer.

use stippler_core::{Lab, PixelImage};

/// One segment of a [`crate::Superpixellation`]
#[derive(Debug, Clone, PartialEq)]
pub struct Superpixel {
    id: usize,
    center: (u32, u32),
    center_lab: Lab,
    center_rgb: (u8, u8, u8),
    /// Boundary pixels followed by interior pixels
    pixels: Vec<usize>,
    n_boundary: usize,
    std_dev_color: f64,
    std_dev_channels: Lab,
}

impl Superpixel {
    /// Compute a superpixel from its member pixels
    ///
    /// # Arguments
    ///
    /// * `id` - Label shared by every pixel in `pixels`
    /// * `pixels` - Member pixel indices
    /// * `labels` - Final per-pixel labels of the whole image
    /// * `image` - Source image
    ///
    /// A boundary pixel lies on the image border or has a 4-neighbour with a
    /// different label. The centroid is the rounded mean pixel position,
    /// clamped to the image. Standard deviations use the sample (n - 1)
    /// estimator and are zero for fewer than two pixels.
    pub fn new(id: usize, pixels: Vec<usize>, labels: &[usize], image: &PixelImage) -> Self {
        let n = pixels.len();
        if n == 0 {
            return Self {
                id,
                center: (0, 0),
                center_lab: Lab::default(),
                center_rgb: (0, 0, 0),
                pixels,
                n_boundary: 0,
                std_dev_color: 0.0,
                std_dev_channels: Lab::default(),
            };
        }

        let lab = image.lab();
        let rgb = image.rgb();

        let (mut sx, mut sy) = (0.0f64, 0.0f64);
        let mut sum_lab = [0.0f64; 3];
        let mut sum_rgb = [0u64; 3];
        let mut boundary = Vec::new();
        let mut interior = Vec::new();
        for &k in &pixels {
            let (x, y) = image.index_to_xy(k);
            sx += x as f64;
            sy += y as f64;
            sum_lab[0] += lab.l[k];
            sum_lab[1] += lab.a[k];
            sum_lab[2] += lab.b[k];
            sum_rgb[0] += rgb.r[k] as u64;
            sum_rgb[1] += rgb.g[k] as u64;
            sum_rgb[2] += rgb.b[k] as u64;

            let neighbours = image.four_neighbours(k);
            let on_boundary =
                neighbours.len() < 4 || neighbours.iter().any(|nb| labels[nb] != labels[k]);
            if on_boundary {
                boundary.push(k);
            } else {
                interior.push(k);
            }
        }

        let nf = n as f64;
        let max_x = image.width().saturating_sub(1) as f64;
        let max_y = image.height().saturating_sub(1) as f64;
        let center = (
            (sx / nf).round().clamp(0.0, max_x) as u32,
            (sy / nf).round().clamp(0.0, max_y) as u32,
        );
        let center_lab = Lab::new(sum_lab[0] / nf, sum_lab[1] / nf, sum_lab[2] / nf);
        let mean_rgb = |s: u64| (s / n as u64).min(255) as u8;
        let center_rgb = (mean_rgb(sum_rgb[0]), mean_rgb(sum_rgb[1]), mean_rgb(sum_rgb[2]));

        let (std_dev_color, std_dev_channels) = if n > 1 {
            let mut ss = [0.0f64; 3];
            for &k in &pixels {
                let dl = lab.l[k] - center_lab.l;
                let da = lab.a[k] - center_lab.a;
                let db = lab.b[k] - center_lab.b;
                ss[0] += dl * dl;
                ss[1] += da * da;
                ss[2] += db * db;
            }
            let dof = (n - 1) as f64;
            (
                ((ss[0] + ss[1] + ss[2]) / dof).sqrt(),
                Lab::new((ss[0] / dof).sqrt(), (ss[1] / dof).sqrt(), (ss[2] / dof).sqrt()),
            )
        } else {
            (0.0, Lab::default())
        };

        let n_boundary = boundary.len();
        boundary.append(&mut interior);

        Self {
            id,
            center,
            center_lab,
            center_rgb,
            pixels: boundary,
            n_boundary,
            std_dev_color,
            std_dev_channels,
        }
    }

    #[inline]
    pub fn id(&self) -> usize {
        self.id
    }

    /// Centroid pixel position `(x, y)`
    #[inline]
    pub fn center(&self) -> (u32, u32) {
        self.center
    }

    /// Mean L*a*b* colour
    #[inline]
    pub fn center_lab(&self) -> Lab {
        self.center_lab
    }

    /// Mean RGB colour, floored
    #[inline]
    pub fn center_rgb(&self) -> (u8, u8, u8) {
        self.center_rgb
    }

    /// Number of pixels
    #[inline]
    pub fn size(&self) -> usize {
        self.pixels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// All pixels, boundary first
    pub fn pixels(&self) -> &[usize] {
        &self.pixels
    }

    pub fn boundary_pixels(&self) -> &[usize] {
        &self.pixels[..self.n_boundary]
    }

    pub fn interior_pixels(&self) -> &[usize] {
        &self.pixels[self.n_boundary..]
    }

    /// Pixel count over boundary pixel count (0 for an empty superpixel)
    pub fn area_to_perimeter_ratio(&self) -> f64 {
        if self.n_boundary == 0 {
            0.0
        } else {
            self.pixels.len() as f64 / self.n_boundary as f64
        }
    }

    /// Aggregate colour standard deviation over L*, a* and b*
    #[inline]
    pub fn std_dev_color(&self) -> f64 {
        self.std_dev_color
    }

    /// Per-channel colour standard deviations
    #[inline]
    pub fn std_dev_channels(&self) -> Lab {
        self.std_dev_channels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lightness(w: u32, h: u32, l: Vec<f64>) -> PixelImage {
        PixelImage::from_lightness(w, h, l).unwrap()
    }

    #[test]
    fn test_boundary_interior_split() {
        // 4x4 image, one label: the 4 centre pixels are interior
        let img = lightness(4, 4, vec![50.0; 16]);
        let labels = vec![0; 16];
        let sp = Superpixel::new(0, (0..16).collect(), &labels, &img);
        assert_eq!(sp.size(), 16);
        assert_eq!(sp.boundary_pixels().len(), 12);
        let mut interior = sp.interior_pixels().to_vec();
        interior.sort_unstable();
        assert_eq!(interior, vec![5, 6, 9, 10]);
        assert_eq!(sp.area_to_perimeter_ratio(), 16.0 / 12.0);
        assert_eq!(sp.center(), (2, 2));
    }

    #[test]
    fn test_label_change_marks_boundary() {
        let img = lightness(3, 3, vec![50.0; 9]);
        let mut labels = vec![0; 9];
        labels[5] = 1;
        let members: Vec<usize> = (0..9).filter(|&k| k != 5).collect();
        let sp = Superpixel::new(0, members, &labels, &img);
        // centre pixel 4 touches pixel 5
        assert!(sp.boundary_pixels().contains(&4));
        assert!(sp.interior_pixels().is_empty());
    }

    #[test]
    fn test_std_dev() {
        let img = lightness(2, 1, vec![40.0, 60.0]);
        let sp = Superpixel::new(3, vec![0, 1], &[3, 3], &img);
        assert_eq!(sp.id(), 3);
        assert!((sp.center_lab().l - 50.0).abs() < 1e-12);
        let expected = (200.0f64).sqrt();
        assert!((sp.std_dev_channels().l - expected).abs() < 1e-9);
        assert!((sp.std_dev_color() - expected).abs() < 1e-9);
        assert_eq!(sp.std_dev_channels().a, 0.0);
    }

    #[test]
    fn test_single_and_empty() {
        let img = lightness(2, 2, vec![10.0, 20.0, 30.0, 40.0]);
        let labels = [0, 1, 2, 3];
        let single = Superpixel::new(3, vec![3], &labels, &img);
        assert_eq!(single.center(), (1, 1));
        assert_eq!(single.std_dev_color(), 0.0);

        let empty = Superpixel::new(4, Vec::new(), &labels, &img);
        assert!(empty.is_empty());
        assert_eq!(empty.area_to_perimeter_ratio(), 0.0);
    }

    #[test]
    fn test_center_rounds_and_clamps() {
        // pixels (0,0) and (1,0): mean x 0.5 rounds away from zero to 1
        let img = lightness(2, 1, vec![0.0, 0.0]);
        let sp = Superpixel::new(0, vec![0, 1], &[0, 0], &img);
        assert_eq!(sp.center(), (1, 0));
    }
}
