//! Superpixellation with selection flags

use stippler_core::Error;
use stippler_superpixel::{Superpixel, Superpixellation};

use crate::error::FilterResult;

/// A [`Superpixellation`] plus a selected flag per superpixel and per pixel
///
/// A pixel's flag always equals the flag of the superpixel it belongs to.
#[derive(Debug, Clone)]
pub struct FilteredSuperpixellation {
    segmentation: Superpixellation,
    selected_superpixels: Vec<bool>,
    selected_pixels: Vec<bool>,
}

impl FilteredSuperpixellation {
    /// Wrap a segmentation with per-superpixel selection flags
    ///
    /// Per-pixel flags are derived from the label array.
    ///
    /// # Errors
    ///
    /// Returns `DataLength` if `selected` does not have one entry per
    /// superpixel.
    pub fn new(segmentation: Superpixellation, selected: Vec<bool>) -> FilterResult<Self> {
        if selected.len() != segmentation.n_superpixels() {
            return Err(Error::DataLength {
                expected: segmentation.n_superpixels(),
                actual: selected.len(),
            }
            .into());
        }
        let selected_pixels = segmentation
            .labels()
            .iter()
            .map(|&label| selected[label])
            .collect();
        Ok(Self {
            segmentation,
            selected_superpixels: selected,
            selected_pixels,
        })
    }

    /// Assemble from flags already expanded to pixels
    pub(crate) fn from_parts(
        segmentation: Superpixellation,
        selected_superpixels: Vec<bool>,
        selected_pixels: Vec<bool>,
    ) -> Self {
        debug_assert_eq!(selected_superpixels.len(), segmentation.n_superpixels());
        debug_assert_eq!(selected_pixels.len(), segmentation.labels().len());
        Self {
            segmentation,
            selected_superpixels,
            selected_pixels,
        }
    }

    /// The underlying segmentation
    pub fn superpixellation(&self) -> &Superpixellation {
        &self.segmentation
    }

    pub fn selected_superpixels(&self) -> &[bool] {
        &self.selected_superpixels
    }

    pub fn selected_pixels(&self) -> &[bool] {
        &self.selected_pixels
    }

    /// Whether superpixel `id` is selected; `None` if out of range
    pub fn is_selected(&self, id: usize) -> Option<bool> {
        self.selected_superpixels.get(id).copied()
    }

    /// Whether pixel `k` is selected; `None` if out of range
    pub fn is_pixel_selected(&self, k: usize) -> Option<bool> {
        self.selected_pixels.get(k).copied()
    }

    /// Number of selected superpixels
    pub fn n_selected(&self) -> usize {
        self.selected_superpixels.iter().filter(|&&s| s).count()
    }

    /// Selected superpixels in id order
    pub fn selected(&self) -> impl Iterator<Item = &Superpixel> + '_ {
        self.segmentation
            .superpixels()
            .iter()
            .zip(&self.selected_superpixels)
            .filter_map(|(sp, &s)| s.then_some(sp))
    }

    pub fn into_parts(self) -> (Superpixellation, Vec<bool>, Vec<bool>) {
        (
            self.segmentation,
            self.selected_superpixels,
            self.selected_pixels,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stippler_core::PixelImage;

    use crate::error::FilterError;

    fn segmentation() -> Superpixellation {
        let img = PixelImage::from_lightness(3, 1, vec![10.0, 20.0, 30.0]).unwrap();
        Superpixellation::from_labels(img, vec![0, 1, 1], 2).unwrap()
    }

    #[test]
    fn test_pixel_flags_follow_labels() {
        let filtered = FilteredSuperpixellation::new(segmentation(), vec![false, true]).unwrap();
        assert_eq!(filtered.selected_pixels(), &[false, true, true]);
        assert_eq!(filtered.n_selected(), 1);
        assert_eq!(filtered.is_selected(1), Some(true));
        assert_eq!(filtered.is_selected(2), None);
        assert_eq!(filtered.is_pixel_selected(0), Some(false));
        let ids: Vec<usize> = filtered.selected().map(|sp| sp.id()).collect();
        assert_eq!(ids, vec![1]);
    }

    #[test]
    fn test_flag_count_mismatch() {
        assert!(matches!(
            FilteredSuperpixellation::new(segmentation(), vec![true]),
            Err(FilterError::Core(Error::DataLength {
                expected: 2,
                actual: 1
            }))
        ));
    }
}
