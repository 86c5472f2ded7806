//! Lightness-only rendition of an image
//!
//! Converts the input to L*a*b*, drops the chroma channels and converts the
//! remaining L* plane back to RGB.

use stippler_core::{AlgorithmState, Error, IncrementalAlgorithm, PixelImage, Raster, Step};

use crate::PIXEL_GRANULARITY;
use crate::error::{ColorError, ColorResult};

/// Stages of [`LabGreyscale`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GreyscaleStage {
    #[default]
    ConvertToLab,
    CopyLightness,
    BuildLightnessImage,
    ConvertToRgb,
    FillOutput,
    End,
}

/// Greyscale conversion through CIE L*
#[derive(Debug, Default)]
pub struct LabGreyscale {
    state: AlgorithmState<GreyscaleStage>,
    input: Option<PixelImage>,
    lightness: Vec<f64>,
    result: Option<PixelImage>,
    output: Option<Raster>,
}

impl LabGreyscale {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(&self) -> GreyscaleStage {
        self.state.stage()
    }

    /// Hand over the lightness-only image
    pub fn take_image(&mut self) -> ColorResult<PixelImage> {
        self.state.check_can_collect()?;
        self.result.take().ok_or(ColorError::ResultUnavailable)
    }

    fn step(&mut self) -> ColorResult<Step> {
        let stage = self.state.stage();
        let n = self.input.as_ref().map_or(0, PixelImage::pixel_count);
        let (limit, granularity) = match stage {
            GreyscaleStage::CopyLightness => (n, PIXEL_GRANULARITY),
            _ => (1, 1),
        };
        let range = self.state.chunk(limit, granularity);

        let status = match stage {
            GreyscaleStage::ConvertToLab => {
                let input = self.input.as_ref().ok_or(Error::CorruptedState)?;
                input.lab();
                "Converted image to CIE L*a*b* colour space.".to_string()
            }
            GreyscaleStage::CopyLightness => {
                let input = self.input.as_ref().ok_or(Error::CorruptedState)?;
                if self.state.at_stage_start() {
                    self.lightness = Vec::with_capacity(n);
                }
                self.lightness
                    .extend_from_slice(&input.lab().l[range.clone()]);
                format!("Copying the L* colour channel ({} / {n})", range.end)
            }
            GreyscaleStage::BuildLightnessImage => {
                let input = self.input.take().ok_or(Error::CorruptedState)?;
                let lightness = std::mem::take(&mut self.lightness);
                self.result = Some(PixelImage::from_lightness(
                    input.width(),
                    input.height(),
                    lightness,
                )?);
                "Produced image data containing only the L* channel.".to_string()
            }
            GreyscaleStage::ConvertToRgb => {
                let result = self.result.as_ref().ok_or(Error::CorruptedState)?;
                result.rgb();
                "Converted the greyscale image data to the RGB colour space.".to_string()
            }
            GreyscaleStage::FillOutput => {
                let result = self.result.as_ref().ok_or(Error::CorruptedState)?;
                self.output = Some(result.to_raster()?);
                "Converted the greyscale image data to a displayable image.".to_string()
            }
            GreyscaleStage::End => return Err(Error::CorruptedState.into()),
        };

        self.state.set_cursor(range.end);
        if range.end >= limit {
            let next = match stage {
                GreyscaleStage::ConvertToLab => GreyscaleStage::CopyLightness,
                GreyscaleStage::CopyLightness => GreyscaleStage::BuildLightnessImage,
                GreyscaleStage::BuildLightnessImage if self.state.is_output_enabled() => {
                    GreyscaleStage::ConvertToRgb
                }
                GreyscaleStage::ConvertToRgb => GreyscaleStage::FillOutput,
                _ => GreyscaleStage::End,
            };
            self.state.enter(next);
            if next == GreyscaleStage::End {
                self.state.finish();
                return Ok(Step::done(status));
            }
        }
        Ok(Step::progress(status))
    }
}

impl IncrementalAlgorithm for LabGreyscale {
    type Error = ColorError;

    fn name(&self) -> &'static str {
        "RGB to CIE L* greyscale"
    }

    fn initialize(&mut self, images: Vec<PixelImage>) -> ColorResult<()> {
        self.state.reset();
        self.lightness.clear();
        self.result = None;
        self.output = None;
        if images.len() != 1 {
            return Err(Error::ImageCount {
                expected: 1,
                actual: images.len(),
            }
            .into());
        }
        let Some(image) = images.into_iter().next() else {
            return Err(Error::CorruptedState.into());
        };
        self.input = Some(image);
        self.state.mark_initialized();
        Ok(())
    }

    fn advance(&mut self) -> ColorResult<Step> {
        self.state.check_can_advance()?;
        self.step().map_err(|e| self.state.fail(e))
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

    fn take_output(&mut self) -> ColorResult<Raster> {
        self.state.check_can_collect()?;
        if !self.state.is_output_enabled() {
            return Err(Error::OutputDisabled.into());
        }
        self.output.take().ok_or(ColorError::ResultUnavailable)
    }
}
