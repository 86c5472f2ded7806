//! Superpixellation - a complete segmentation
//!
//! Owns the source image, the per-pixel label array and one [`Superpixel`]
//! per label. Every pixel index belongs to exactly one superpixel, the one
//! named by its label.

use stippler_core::PixelImage;

use crate::error::{SuperpixelError, SuperpixelResult};
use crate::superpixel::Superpixel;

/// Label of a pixel not yet assigned to any cluster
pub const NO_LABEL: usize = usize::MAX;

/// Counting sort of pixel indices into per-label buckets
///
/// Offsets start as inclusive prefix sums of the label counts. Placing
/// pixels in descending index order decrements each offset, so buckets end
/// up sorted ascending and every offset ends at its bucket start.
#[derive(Debug, Clone)]
pub(crate) struct BucketSort {
    offsets: Vec<usize>,
    sorted: Vec<usize>,
}

impl BucketSort {
    pub(crate) fn new(counts: &[usize]) -> Self {
        let mut offsets = Vec::with_capacity(counts.len());
        let mut total = 0usize;
        for &c in counts {
            total += c;
            offsets.push(total);
        }
        Self {
            offsets,
            sorted: vec![0; total],
        }
    }

    /// Place one pixel; returns `false` if its bucket is already full
    #[inline]
    pub(crate) fn place(&mut self, pixel: usize, label: usize) -> bool {
        match self.offsets.get_mut(label) {
            Some(offset) if *offset > 0 => {
                *offset -= 1;
                self.sorted[*offset] = pixel;
                true
            }
            _ => false,
        }
    }

    /// Pixels of bucket `label`, valid once every pixel is placed
    pub(crate) fn bucket(&self, label: usize, count: usize) -> &[usize] {
        let start = self.offsets[label];
        &self.sorted[start..start + count]
    }
}

/// Segmentation of an image into superpixels
#[derive(Debug, Clone)]
pub struct Superpixellation {
    image: PixelImage,
    labels: Vec<usize>,
    superpixels: Vec<Superpixel>,
}

impl Superpixellation {
    /// Build a segmentation from a complete label array
    ///
    /// # Arguments
    ///
    /// * `image` - Source image, moved into the segmentation
    /// * `labels` - One label per pixel, each below `n_superpixels`
    /// * `n_superpixels` - Number of superpixels; labels with no pixels
    ///   produce empty superpixels
    ///
    /// # Errors
    ///
    /// Returns `Core(DataLength)` if the label array does not match the
    /// image and `LabelOutOfRange` for a label outside `0..n_superpixels`.
    pub fn from_labels(
        image: PixelImage,
        labels: Vec<usize>,
        n_superpixels: usize,
    ) -> SuperpixelResult<Self> {
        if labels.len() != image.pixel_count() {
            return Err(stippler_core::Error::DataLength {
                expected: image.pixel_count(),
                actual: labels.len(),
            }
            .into());
        }

        let mut counts = vec![0usize; n_superpixels];
        for (pixel, &label) in labels.iter().enumerate() {
            if label >= n_superpixels {
                return Err(SuperpixelError::LabelOutOfRange {
                    pixel,
                    label,
                    count: n_superpixels,
                });
            }
            counts[label] += 1;
        }

        let mut buckets = BucketSort::new(&counts);
        for (pixel, &label) in labels.iter().enumerate().rev() {
            buckets.place(pixel, label);
        }

        let superpixels = (0..n_superpixels)
            .map(|id| Superpixel::new(id, buckets.bucket(id, counts[id]).to_vec(), &labels, &image))
            .collect();

        Ok(Self::from_parts(image, labels, superpixels))
    }

    /// Assemble a segmentation whose parts are already consistent
    pub(crate) fn from_parts(
        image: PixelImage,
        labels: Vec<usize>,
        superpixels: Vec<Superpixel>,
    ) -> Self {
        Self {
            image,
            labels,
            superpixels,
        }
    }

    pub fn image(&self) -> &PixelImage {
        &self.image
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Per-pixel labels, row-major
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// Label of pixel index `k`, or `None` if out of bounds
    pub fn label_at(&self, k: usize) -> Option<usize> {
        self.labels.get(k).copied()
    }

    #[inline]
    pub fn n_superpixels(&self) -> usize {
        self.superpixels.len()
    }

    pub fn superpixels(&self) -> &[Superpixel] {
        &self.superpixels
    }

    pub fn superpixel(&self, id: usize) -> Option<&Superpixel> {
        self.superpixels.get(id)
    }

    /// The superpixel containing pixel index `k`
    pub fn superpixel_at(&self, k: usize) -> Option<&Superpixel> {
        self.label_at(k).and_then(|l| self.superpixels.get(l))
    }

    /// Split into image, labels and superpixels
    pub fn into_parts(self) -> (PixelImage, Vec<usize>, Vec<Superpixel>) {
        (self.image, self.labels, self.superpixels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_sort_is_stable() {
        let labels = [1, 0, 1, 2, 0, 1];
        let counts = [2, 3, 1];
        let mut b = BucketSort::new(&counts);
        for (k, &l) in labels.iter().enumerate().rev() {
            assert!(b.place(k, l));
        }
        assert_eq!(b.bucket(0, 2), &[1, 4]);
        assert_eq!(b.bucket(1, 3), &[0, 2, 5]);
        assert_eq!(b.bucket(2, 1), &[3]);
        assert!(!b.place(0, 0));
        assert!(!b.place(0, 7));
    }

    #[test]
    fn test_from_labels() {
        let img = PixelImage::from_lightness(3, 2, vec![10.0, 10.0, 90.0, 10.0, 10.0, 90.0]).unwrap();
        let labels = vec![0, 0, 1, 0, 0, 1];
        let s = Superpixellation::from_labels(img, labels, 3).unwrap();
        assert_eq!(s.n_superpixels(), 3);
        assert_eq!(s.superpixel(0).unwrap().pixels().len(), 4);
        assert_eq!(s.superpixel(1).unwrap().center(), (2, 1));
        assert!(s.superpixel(2).unwrap().is_empty());
        assert_eq!(s.superpixel_at(5).unwrap().id(), 1);
        assert_eq!(s.label_at(6), None);
    }

    #[test]
    fn test_from_labels_rejects_bad_input() {
        let img = PixelImage::from_lightness(2, 1, vec![0.0, 0.0]).unwrap();
        assert!(matches!(
            Superpixellation::from_labels(img.clone(), vec![0], 1),
            Err(SuperpixelError::Core(stippler_core::Error::DataLength { .. }))
        ));
        assert!(matches!(
            Superpixellation::from_labels(img, vec![0, 2], 2),
            Err(SuperpixelError::LabelOutOfRange {
                pixel: 1,
                label: 2,
                count: 2
            })
        ));
    }
}
