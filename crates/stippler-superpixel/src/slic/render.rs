//! Output rendering for SLIC

use stippler_core::{PixelImage, Raster, Result, color};

use super::components::ComponentSearch;
use super::options::Visualization;
use crate::superpixel::Superpixel;

/// Boundary colour in the superpixel view
pub const BORDER_COLOR: u32 = color::BLACK;

/// Centroid marker colour
pub const CENTER_COLOR: u32 = color::RED;

/// Initial fill of the output raster
pub const BACKGROUND_COLOR: u32 = color::YELLOW;

/// Grey level `floor(value * 256 / range)`, capped at 255
pub(crate) fn proportional_grey(value: usize, range: usize) -> u8 {
    if range == 0 {
        return 0;
    }
    let level = (value as f64 * 256.0 / range as f64).floor();
    level.min(255.0) as u8
}

pub(crate) struct Painter<'a> {
    pub(crate) visualization: Visualization,
    pub(crate) mark_centers: bool,
    pub(crate) n_clusters: usize,
    pub(crate) components: &'a ComponentSearch,
}

impl Painter<'_> {
    fn put(out: &mut Raster, image: &PixelImage, k: usize, pixel: u32) -> Result<()> {
        let (x, y) = image.index_to_xy(k);
        out.set_pixel(x, y, pixel)
    }

    pub(crate) fn paint(&self, out: &mut Raster, image: &PixelImage, sp: &Superpixel) -> Result<()> {
        match self.visualization {
            Visualization::Superpixels | Visualization::Labels => {
                let fill = if self.visualization == Visualization::Labels {
                    color::grey(proportional_grey(sp.id(), self.n_clusters))
                } else {
                    let (r, g, b) = sp.center_rgb();
                    color::compose_rgb(r, g, b)
                };
                for &k in sp.interior_pixels() {
                    Self::put(out, image, k, fill)?;
                }
                for &k in sp.boundary_pixels() {
                    Self::put(out, image, k, BORDER_COLOR)?;
                }
            }
            Visualization::ConnectedComponents => {
                let n_components = self.components.n_components();
                for &k in sp.pixels() {
                    let component = self.components.component_of(k);
                    let level = proportional_grey(component, n_components);
                    let pixel = if self.components.is_kept(component) {
                        color::compose_rgb(0, level, 0)
                    } else {
                        color::compose_rgb(0, 0, level)
                    };
                    Self::put(out, image, k, pixel)?;
                }
            }
        }

        let marks = self.mark_centers || self.visualization != Visualization::Superpixels;
        if marks && !sp.is_empty() {
            let (cx, cy) = sp.center();
            let center = image.xy_to_index(cx, cy);
            Self::put(out, image, center, CENTER_COLOR)?;
            for nb in image.four_neighbours(center).iter() {
                Self::put(out, image, nb, CENTER_COLOR)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proportional_grey() {
        assert_eq!(proportional_grey(0, 4), 0);
        assert_eq!(proportional_grey(1, 4), 64);
        assert_eq!(proportional_grey(3, 4), 192);
        assert_eq!(proportional_grey(4, 4), 255);
        assert_eq!(proportional_grey(1, 0), 0);
    }

    #[test]
    fn test_paint_superpixel_view() {
        let image = PixelImage::from_lightness(3, 3, vec![50.0; 9]).unwrap();
        let labels = vec![0; 9];
        let sp = Superpixel::new(0, (0..9).collect(), &labels, &image);
        let components = ComponentSearch::default();
        let painter = Painter {
            visualization: Visualization::Superpixels,
            mark_centers: false,
            n_clusters: 1,
            components: &components,
        };
        let mut out = Raster::new_filled(3, 3, BACKGROUND_COLOR).unwrap();
        painter.paint(&mut out, &image, &sp).unwrap();
        assert_eq!(out.get_pixel(0, 0), Some(BORDER_COLOR));
        let (r, g, b) = sp.center_rgb();
        assert_eq!(out.get_rgb(1, 1), Some((r, g, b)));
    }
}
