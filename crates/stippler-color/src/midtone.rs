//! Midtone emphasis filter
//!
//! Maps every L* value through the average of two logistic curves, one
//! rising around a low threshold and one falling around a high threshold.
//! Midtones come out light and both extremes dark. When the responses span
//! more than one unit of L* they are stretched to the full `[0, 100]` range.
//!
//! The result is a lightness-only image, suitable as the soft selection map
//! of an external-score superpixel filter.

use stippler_core::colorspace::{MAX_LIGHTNESS, MIN_LIGHTNESS};
use stippler_core::error::try_alloc;
use stippler_core::{AlgorithmState, Error, IncrementalAlgorithm, PixelImage, Raster, Step};

use crate::PIXEL_GRANULARITY;
use crate::error::{ColorError, ColorResult};

/// Fraction of the curve's range reached one bandwidth past its centre
const BANDWIDTH_FRACTION: f64 = 0.95;

/// Logistic slope reaching [`BANDWIDTH_FRACTION`] of the range over
/// `bandwidth`
pub fn slope(bandwidth: f64) -> f64 {
    -((1.0 - BANDWIDTH_FRACTION) / BANDWIDTH_FRACTION).ln() / bandwidth
}

/// Logistic curve from `min` to `max` centred on `center`
///
/// Rising curves approach `max` as `x` grows, falling curves approach
/// `min`.
pub fn sigmoid(min: f64, max: f64, scale: f64, center: f64, rising: bool, x: f64) -> f64 {
    let exponent = if rising {
        -scale * (x - center)
    } else {
        scale * (x - center)
    };
    min + (max - min) / (1.0 + exponent.exp())
}

/// Thresholds and bandwidths of the two curves, in L* units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MidtoneOptions {
    /// Centre of the rising curve
    pub low_threshold: f64,
    /// Centre of the falling curve
    pub high_threshold: f64,
    pub low_bandwidth: f64,
    pub high_bandwidth: f64,
}

impl Default for MidtoneOptions {
    fn default() -> Self {
        Self {
            low_threshold: 30.0,
            high_threshold: 70.0,
            low_bandwidth: 20.0,
            high_bandwidth: 20.0,
        }
    }
}

impl MidtoneOptions {
    pub fn with_thresholds(mut self, low: f64, high: f64) -> Self {
        self.low_threshold = low;
        self.high_threshold = high;
        self
    }

    pub fn with_bandwidths(mut self, low: f64, high: f64) -> Self {
        self.low_bandwidth = low;
        self.high_bandwidth = high;
        self
    }

    /// # Errors
    ///
    /// Returns `InvalidParameters` for non-finite values or a bandwidth
    /// that is not positive.
    pub fn validate(&self) -> ColorResult<()> {
        if !(self.low_threshold.is_finite() && self.high_threshold.is_finite()) {
            return Err(ColorError::InvalidParameters(
                "thresholds must be finite".to_string(),
            ));
        }
        for bandwidth in [self.low_bandwidth, self.high_bandwidth] {
            if !bandwidth.is_finite() || bandwidth <= 0.0 {
                return Err(ColorError::InvalidParameters(format!(
                    "bandwidth must be positive, got {bandwidth}"
                )));
            }
        }
        Ok(())
    }

    /// Unscaled response to one L* value
    pub fn response(&self, l: f64) -> f64 {
        let low = sigmoid(
            MIN_LIGHTNESS,
            MAX_LIGHTNESS,
            slope(self.low_bandwidth),
            self.low_threshold,
            true,
            l,
        );
        let high = sigmoid(
            MIN_LIGHTNESS,
            MAX_LIGHTNESS,
            slope(self.high_bandwidth),
            self.high_threshold,
            false,
            l,
        );
        0.5 * (low + high)
    }
}

/// Stages of [`MidtoneFilter`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MidtoneStage {
    #[default]
    ConvertToLab,
    Threshold,
    /// Skipped when the responses span at most one unit
    Rescale,
    BuildLightnessImage,
    ConvertToRgb,
    FillOutput,
    End,
}

/// Incremental midtone filter
#[derive(Debug, Default)]
pub struct MidtoneFilter {
    options: MidtoneOptions,
    state: AlgorithmState<MidtoneStage>,
    input: Option<PixelImage>,
    values: Vec<f64>,
    min_value: f64,
    max_value: f64,
    result: Option<PixelImage>,
    output: Option<Raster>,
}

impl MidtoneFilter {
    pub fn new(options: MidtoneOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn options(&self) -> &MidtoneOptions {
        &self.options
    }

    pub fn stage(&self) -> MidtoneStage {
        self.state.stage()
    }

    /// Smallest and largest unscaled response seen
    pub fn response_range(&self) -> (f64, f64) {
        (self.min_value, self.max_value)
    }

    /// Hand over the lightness-only result image
    pub fn take_image(&mut self) -> ColorResult<PixelImage> {
        self.state.check_can_collect()?;
        self.result.take().ok_or(ColorError::ResultUnavailable)
    }

    fn step(&mut self) -> ColorResult<Step> {
        let stage = self.state.stage();
        let n = self.input.as_ref().map_or(0, PixelImage::pixel_count);
        let (limit, granularity) = match stage {
            MidtoneStage::Threshold | MidtoneStage::Rescale => (n, PIXEL_GRANULARITY),
            _ => (1, 1),
        };
        let range = self.state.chunk(limit, granularity);

        let status = match stage {
            MidtoneStage::ConvertToLab => {
                let input = self.input.as_ref().ok_or(Error::CorruptedState)?;
                input.lab();
                "Converted the input image to the CIE L*a*b* colour space.".to_string()
            }
            MidtoneStage::Threshold => {
                let input = self.input.as_ref().ok_or(Error::CorruptedState)?;
                if self.state.at_stage_start() {
                    self.values = try_alloc(n, 0.0)?;
                    self.min_value = MAX_LIGHTNESS;
                    self.max_value = MIN_LIGHTNESS;
                }
                let l = &input.lab().l;
                for k in range.clone() {
                    let v = self.options.response(l[k]);
                    self.max_value = self.max_value.max(v);
                    self.min_value = self.min_value.min(v);
                    self.values[k] = v;
                }
                format!("Thresholding pixels ({} / {n})", range.end)
            }
            MidtoneStage::Rescale => {
                let scale = (MAX_LIGHTNESS - MIN_LIGHTNESS) / (self.max_value - self.min_value);
                for v in &mut self.values[range.clone()] {
                    *v = (*v - self.min_value) * scale + MIN_LIGHTNESS;
                }
                format!("Rescaling pixels ({} / {n})", range.end)
            }
            MidtoneStage::BuildLightnessImage => {
                let input = self.input.take().ok_or(Error::CorruptedState)?;
                let values = std::mem::take(&mut self.values);
                self.result = Some(PixelImage::from_lightness(
                    input.width(),
                    input.height(),
                    values,
                )?);
                "Created output image data in the CIE L*a*b* colour space.".to_string()
            }
            MidtoneStage::ConvertToRgb => {
                let result = self.result.as_ref().ok_or(Error::CorruptedState)?;
                result.rgb();
                "Converted the output image data to the RGB colour space.".to_string()
            }
            MidtoneStage::FillOutput => {
                let result = self.result.as_ref().ok_or(Error::CorruptedState)?;
                self.output = Some(result.to_raster()?);
                "Converted the output image data to a displayable image.".to_string()
            }
            MidtoneStage::End => return Err(Error::CorruptedState.into()),
        };

        self.state.set_cursor(range.end);
        if range.end >= limit {
            let next = match stage {
                MidtoneStage::ConvertToLab => MidtoneStage::Threshold,
                MidtoneStage::Threshold => {
                    tracing::debug!(
                        min = self.min_value,
                        max = self.max_value,
                        "midtone response range"
                    );
                    if (self.max_value - self.min_value).abs() > 1.0 {
                        MidtoneStage::Rescale
                    } else {
                        MidtoneStage::BuildLightnessImage
                    }
                }
                MidtoneStage::Rescale => MidtoneStage::BuildLightnessImage,
                MidtoneStage::BuildLightnessImage if self.state.is_output_enabled() => {
                    MidtoneStage::ConvertToRgb
                }
                MidtoneStage::ConvertToRgb => MidtoneStage::FillOutput,
                _ => MidtoneStage::End,
            };
            self.state.enter(next);
            if next == MidtoneStage::End {
                self.state.finish();
                return Ok(Step::done(status));
            }
        }
        Ok(Step::progress(status))
    }
}

impl IncrementalAlgorithm for MidtoneFilter {
    type Error = ColorError;

    fn name(&self) -> &'static str {
        "Midtone filter"
    }

    fn initialize(&mut self, images: Vec<PixelImage>) -> ColorResult<()> {
        self.state.reset();
        self.values.clear();
        self.min_value = MAX_LIGHTNESS;
        self.max_value = MIN_LIGHTNESS;
        self.result = None;
        self.output = None;

        self.options.validate()?;
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
