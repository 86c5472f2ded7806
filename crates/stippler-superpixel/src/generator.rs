//! Superpixel generators
//!
//! A [`SuperpixelGenerator`] is any incremental algorithm that ends with a
//! [`Superpixellation`]. Filters hold one behind a trait object and drive it
//! before scoring its superpixels.

use stippler_core::{AlgorithmState, Error, IncrementalAlgorithm, PixelImage, Raster, Step};

use crate::error::{SuperpixelError, SuperpixelResult};
use crate::superpixellation::Superpixellation;

/// Incremental algorithm producing a segmentation
pub trait SuperpixelGenerator: IncrementalAlgorithm<Error = SuperpixelError> {
    /// Hand over the finished segmentation
    ///
    /// # Errors
    ///
    /// Fails before the generator has finished, after a failure, or when the
    /// segmentation was already taken.
    fn take_superpixellation(&mut self) -> SuperpixelResult<Superpixellation>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum HandOffStage {
    #[default]
    Start,
    End,
}

/// Generator that hands out a segmentation computed elsewhere
///
/// `initialize` accepts the image the segmentation was built on (or one of
/// the same size) and finishes after a single increment. The raster output
/// is the segmentation's own image.
#[derive(Debug)]
pub struct PrecomputedSuperpixels {
    state: AlgorithmState<HandOffStage>,
    segmentation: Option<Superpixellation>,
}

impl PrecomputedSuperpixels {
    pub fn new(segmentation: Superpixellation) -> Self {
        Self {
            state: AlgorithmState::new(),
            segmentation: Some(segmentation),
        }
    }
}

impl IncrementalAlgorithm for PrecomputedSuperpixels {
    type Error = SuperpixelError;

    fn name(&self) -> &'static str {
        "Precomputed superpixels"
    }

    fn initialize(&mut self, images: Vec<PixelImage>) -> SuperpixelResult<()> {
        self.state.reset();
        if images.len() != 1 {
            return Err(Error::ImageCount {
                expected: 1,
                actual: images.len(),
            }
            .into());
        }
        let seg = self
            .segmentation
            .as_ref()
            .ok_or(SuperpixelError::ResultUnavailable)?;
        let given = images[0].dimensions();
        let expected = seg.image().dimensions();
        if given != expected {
            return Err(Error::DimensionMismatch {
                expected,
                actual: given,
            }
            .into());
        }
        self.state.mark_initialized();
        Ok(())
    }

    fn advance(&mut self) -> SuperpixelResult<Step> {
        self.state.check_can_advance()?;
        match self.state.stage() {
            HandOffStage::Start => {
                self.state.enter(HandOffStage::End);
                self.state.finish();
                Ok(Step::done("Superpixels ready"))
            }
            HandOffStage::End => Err(self.state.fail(Error::CorruptedState.into())),
        }
    }

    fn is_finished(&self) -> bool {
        self.state.is_finished()
    }

    fn has_failed(&self) -> bool {
        self.state.has_failed()
    }

    fn disable_output(&mut self) {
        self.state.disable_output();
    }

    fn is_output_enabled(&self) -> bool {
        self.state.is_output_enabled()
    }

    fn take_output(&mut self) -> SuperpixelResult<Raster> {
        self.state.check_can_collect()?;
        if !self.state.is_output_enabled() {
            return Err(Error::OutputDisabled.into());
        }
        let seg = self
            .segmentation
            .as_ref()
            .ok_or(SuperpixelError::ResultUnavailable)?;
        Ok(seg.image().to_raster()?)
    }
}

impl SuperpixelGenerator for PrecomputedSuperpixels {
    fn take_superpixellation(&mut self) -> SuperpixelResult<Superpixellation> {
        self.state.check_can_collect()?;
        self.segmentation
            .take()
            .ok_or(SuperpixelError::ResultUnavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segmentation() -> Superpixellation {
        let img = PixelImage::from_lightness(2, 2, vec![0.0, 0.0, 100.0, 100.0]).unwrap();
        Superpixellation::from_labels(img, vec![0, 0, 1, 1], 2).unwrap()
    }

    #[test]
    fn test_hand_off() {
        let mut generator = PrecomputedSuperpixels::new(segmentation());
        assert!(generator.take_superpixellation().is_err());
        let img = PixelImage::from_lightness(2, 2, vec![0.0; 4]).unwrap();
        generator.initialize(vec![img]).unwrap();
        assert!(generator.advance().unwrap().finished);
        assert!(matches!(
            generator.advance(),
            Err(SuperpixelError::Core(Error::AlreadyFinished))
        ));
        let seg = generator.take_superpixellation().unwrap();
        assert_eq!(seg.n_superpixels(), 2);
        assert!(matches!(
            generator.take_superpixellation(),
            Err(SuperpixelError::ResultUnavailable)
        ));
    }

    #[test]
    fn test_dimension_mismatch() {
        let mut generator = PrecomputedSuperpixels::new(segmentation());
        let img = PixelImage::from_lightness(4, 1, vec![0.0; 4]).unwrap();
        assert!(matches!(
            generator.initialize(vec![img]),
            Err(SuperpixelError::Core(Error::DimensionMismatch { .. }))
        ));
        assert!(matches!(
            generator.advance(),
            Err(SuperpixelError::Core(Error::NotInitialized))
        ));
    }
}
