//! Superpixel selection by a local statistic
//!
//! [`LocalDataFilter`] drives a wrapped [`SuperpixelGenerator`] to
//! completion, scores every superpixel on its [`ScoreBasis`], histograms the
//! normalized scores and keeps the superpixels on one side of the Otsu
//! threshold.
//!
//! The optional raster output is twice the input size, doubled along the
//! shorter side (width on ties). The first half shows each superpixel's
//! score as a grey level with black borders; the second half shows selected
//! superpixels black and rejected ones white, with grey borders.

use std::fmt;
use std::ops::Range;

use stippler_core::colorspace::{MAX_RGB, RGB_RANGE};
use stippler_core::error::try_alloc;
use stippler_core::{
    AlgorithmState, Error, IncrementalAlgorithm, PixelImage, Raster, Step, color,
};
use stippler_superpixel::{Slic, SlicOptions, SuperpixelGenerator, Superpixellation};

use crate::error::{FilterError, FilterResult};
use crate::filtered::FilteredSuperpixellation;
use crate::histogram::ScoreHistogram;
use crate::score::{SELECTION_MAP_DESCRIPTION, ScoreBasis};

/// Superpixels processed per increment
pub const SUPERPIXEL_GRANULARITY: usize = 10;

/// Initial fill of the output raster
pub const BACKGROUND_COLOR: u32 = color::YELLOW;

/// Border colour in the score half
pub const SCORE_BORDER_COLOR: u32 = color::BLACK;

/// Border colour in the selection half
pub const SELECTION_BORDER_COLOR: u32 = color::MID_GREY;

/// Interior colour of selected superpixels
pub const SELECTED_COLOR: u32 = color::BLACK;

/// Interior colour of rejected superpixels
pub const REJECTED_COLOR: u32 = color::WHITE;

/// Stages of [`LocalDataFilter`], in processing order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterStage {
    #[default]
    Start,
    GenerateSuperpixels,
    /// Only with [`ScoreBasis::External`]
    ConvertSelectionMap,
    CollectStatistics,
    NormalizeStatistics,
    ConstructHistogram,
    ChooseOtsuThreshold,
    FilterSuperpixels,
    InitializeOutput,
    FillOutput,
    FinalizeOutput,
    End,
}

impl FilterStage {
    /// Whether the stage loops over superpixels
    pub fn iterates_superpixels(self) -> bool {
        matches!(
            self,
            Self::CollectStatistics
                | Self::NormalizeStatistics
                | Self::ConstructHistogram
                | Self::FilterSuperpixels
                | Self::FillOutput
        )
    }
}

/// Grey level of a score within `[min, max]`, capped at 255
fn score_grey(score: f64, min: f64, max: f64) -> u8 {
    let range = max - min;
    if range.is_nan() || range <= 0.0 {
        return 0;
    }
    let level = (score - min) * RGB_RANGE / range;
    if level > MAX_RGB {
        MAX_RGB as u8
    } else if level > 0.0 {
        level.floor() as u8
    } else {
        0
    }
}

/// Otsu-thresholded superpixel filter
pub struct LocalDataFilter {
    basis: ScoreBasis,
    generator: Box<dyn SuperpixelGenerator>,
    state: AlgorithmState<FilterStage>,
    dimensions: (u32, u32),
    selection_map: Option<PixelImage>,
    segmentation: Option<Superpixellation>,
    selected_superpixels: Vec<bool>,
    selected_pixels: Vec<bool>,
    scores: Vec<f64>,
    min_score: f64,
    max_score: f64,
    histogram: Option<ScoreHistogram>,
    threshold: f64,
    output: Option<Raster>,
    output_in_row: bool,
}

impl fmt::Debug for LocalDataFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalDataFilter")
            .field("basis", &self.basis)
            .field("generator", &self.generator.name())
            .field("state", &self.state)
            .field("dimensions", &self.dimensions)
            .field("min_score", &self.min_score)
            .field("max_score", &self.max_score)
            .field("threshold", &self.threshold)
            .finish_non_exhaustive()
    }
}

impl LocalDataFilter {
    /// Filter the output of `generator`, whose own raster output is disabled
    pub fn new(mut generator: Box<dyn SuperpixelGenerator>, basis: ScoreBasis) -> Self {
        generator.disable_output();
        Self {
            basis,
            generator,
            state: AlgorithmState::new(),
            dimensions: (0, 0),
            selection_map: None,
            segmentation: None,
            selected_superpixels: Vec::new(),
            selected_pixels: Vec::new(),
            scores: Vec::new(),
            min_score: f64::INFINITY,
            max_score: f64::NEG_INFINITY,
            histogram: None,
            threshold: 0.0,
            output: None,
            output_in_row: false,
        }
    }

    /// Filter over a fresh SLIC engine
    pub fn with_slic(options: SlicOptions, basis: ScoreBasis) -> Self {
        Self::new(Box::new(Slic::new(options)), basis)
    }

    pub fn basis(&self) -> ScoreBasis {
        self.basis
    }

    pub fn stage(&self) -> FilterStage {
        self.state.stage()
    }

    /// The wrapped generator
    pub fn generator(&self) -> &dyn SuperpixelGenerator {
        self.generator.as_ref()
    }

    /// Normalized scores, indexed by superpixel id
    pub fn scores(&self) -> &[f64] {
        &self.scores
    }

    pub fn min_score(&self) -> f64 {
        self.min_score
    }

    pub fn max_score(&self) -> f64 {
        self.max_score
    }

    /// Otsu threshold on the normalized scores
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn histogram(&self) -> Option<&ScoreHistogram> {
        self.histogram.as_ref()
    }

    /// Hand over the segmentation with its selection flags
    ///
    /// # Errors
    ///
    /// Fails before the filter has finished, after a failure, or when the
    /// result was already taken.
    pub fn take_filtered(&mut self) -> FilterResult<FilteredSuperpixellation> {
        self.state.check_can_collect()?;
        let segmentation = self
            .segmentation
            .take()
            .ok_or(FilterError::ResultUnavailable)?;
        Ok(FilteredSuperpixellation::from_parts(
            segmentation,
            std::mem::take(&mut self.selected_superpixels),
            std::mem::take(&mut self.selected_pixels),
        ))
    }

    fn n_superpixels(&self) -> usize {
        self.segmentation
            .as_ref()
            .map_or(0, Superpixellation::n_superpixels)
    }

    fn step(&mut self) -> FilterResult<Step> {
        let stage = self.state.stage();
        if stage == FilterStage::GenerateSuperpixels {
            return self.generate_superpixels();
        }

        let (limit, granularity) = if stage.iterates_superpixels() {
            (self.n_superpixels(), SUPERPIXEL_GRANULARITY)
        } else {
            (1, 1)
        };
        let range = self.state.chunk(limit, granularity);
        let first = self.state.at_stage_start();
        let n = self.n_superpixels();

        let status = match stage {
            FilterStage::Start => "Starting superpixel filter".to_string(),
            FilterStage::ConvertSelectionMap => {
                let map = self.selection_map.as_ref().ok_or(Error::CorruptedState)?;
                map.lab();
                "Converted the selection map image to the CIE L*a*b* colour space.".to_string()
            }
            FilterStage::CollectStatistics => {
                self.collect_statistics(range.clone(), first)?;
                format!("Collecting superpixel statistics ({} / {n})", range.end)
            }
            FilterStage::NormalizeStatistics => {
                self.normalize_statistics(range.clone(), first)?;
                format!("Normalizing superpixel statistics ({} / {n})", range.end)
            }
            FilterStage::ConstructHistogram => {
                if first {
                    self.histogram = Some(ScoreHistogram::new(n, self.min_score, self.max_score));
                }
                let histogram = self.histogram.as_mut().ok_or(Error::CorruptedState)?;
                for &score in &self.scores[range.clone()] {
                    histogram.add(score);
                }
                format!("Constructing histogram ({} / {n})", range.end)
            }
            FilterStage::ChooseOtsuThreshold => {
                let histogram = self.histogram.as_ref().ok_or(Error::CorruptedState)?;
                self.threshold = histogram.otsu_threshold();
                tracing::debug!(
                    bins = histogram.n_bins(),
                    min = self.min_score,
                    max = self.max_score,
                    threshold = self.threshold,
                    "Otsu threshold chosen"
                );
                "Selected Otsu threshold from histogram.".to_string()
            }
            FilterStage::FilterSuperpixels => {
                self.filter_superpixels(range.clone())?;
                format!("Filtering superpixels ({} / {n})", range.end)
            }
            FilterStage::InitializeOutput => {
                let (w, h) = self.dimensions;
                self.output_in_row = w <= h;
                let (ow, oh) = if self.output_in_row {
                    (w * 2, h)
                } else {
                    (w, h * 2)
                };
                self.output = Some(Raster::new_filled(ow, oh, BACKGROUND_COLOR)?);
                "Initialized output objects.".to_string()
            }
            FilterStage::FillOutput => {
                self.fill_output(range.clone())?;
                format!("Filling output image ({} / {n})", range.end)
            }
            FilterStage::FinalizeOutput => "Finalized output objects.".to_string(),
            FilterStage::GenerateSuperpixels | FilterStage::End => {
                return Err(Error::CorruptedState.into());
            }
        };

        self.state.set_cursor(range.end);
        if range.end >= limit {
            self.complete_stage(stage);
        }

        if self.state.is_finished() {
            Ok(Step::done(format!(
                "Selected {} of {n} superpixels",
                self.selected_superpixels.iter().filter(|&&s| s).count()
            )))
        } else {
            Ok(Step::progress(status))
        }
    }

    fn complete_stage(&mut self, stage: FilterStage) {
        let next = match stage {
            FilterStage::Start => FilterStage::GenerateSuperpixels,
            FilterStage::GenerateSuperpixels => {
                if self.basis.needs_selection_map() {
                    FilterStage::ConvertSelectionMap
                } else {
                    FilterStage::CollectStatistics
                }
            }
            FilterStage::ConvertSelectionMap => FilterStage::CollectStatistics,
            FilterStage::CollectStatistics => FilterStage::NormalizeStatistics,
            FilterStage::NormalizeStatistics => FilterStage::ConstructHistogram,
            FilterStage::ConstructHistogram => FilterStage::ChooseOtsuThreshold,
            FilterStage::ChooseOtsuThreshold => FilterStage::FilterSuperpixels,
            FilterStage::FilterSuperpixels => {
                if self.state.is_output_enabled() {
                    FilterStage::InitializeOutput
                } else {
                    FilterStage::End
                }
            }
            FilterStage::InitializeOutput => FilterStage::FillOutput,
            FilterStage::FillOutput => FilterStage::FinalizeOutput,
            FilterStage::FinalizeOutput | FilterStage::End => FilterStage::End,
        };
        tracing::debug!(from = ?stage, to = ?next, "filter stage complete");
        self.state.enter(next);
        if next == FilterStage::End {
            self.state.finish();
        }
    }

    /// Advance the generator, or collect its result once it has finished
    fn generate_superpixels(&mut self) -> FilterResult<Step> {
        if !self.generator.is_finished() {
            let step = self.generator.advance()?;
            return Ok(Step::progress(step.status));
        }

        let segmentation = self.generator.take_superpixellation()?;
        if segmentation.image().dimensions() != self.dimensions {
            return Err(Error::DimensionMismatch {
                expected: self.dimensions,
                actual: segmentation.image().dimensions(),
            }
            .into());
        }
        self.selected_superpixels = try_alloc(segmentation.n_superpixels(), false)?;
        self.selected_pixels = try_alloc(segmentation.labels().len(), false)?;
        tracing::debug!(
            generator = self.generator.name(),
            superpixels = segmentation.n_superpixels(),
            "superpixels ready for filtering"
        );
        self.segmentation = Some(segmentation);
        self.complete_stage(FilterStage::GenerateSuperpixels);
        Ok(Step::progress("Initialized superpixel filtering data."))
    }

    fn collect_statistics(&mut self, range: Range<usize>, first: bool) -> FilterResult<()> {
        if first {
            self.scores = try_alloc(self.n_superpixels(), 0.0)?;
        }
        let segmentation = self
            .segmentation
            .as_ref()
            .ok_or(Error::CorruptedState)?;
        let map = self.selection_map.as_ref().map(|m| m.lab().l.as_slice());
        for k in range {
            let sp = segmentation.superpixel(k).ok_or(Error::CorruptedState)?;
            self.scores[k] = self.basis.raw_score(sp, map);
        }
        Ok(())
    }

    fn normalize_statistics(&mut self, range: Range<usize>, first: bool) -> FilterResult<()> {
        let fixed = self.basis.fixed_range();
        if first {
            (self.min_score, self.max_score) = fixed.unwrap_or((f64::INFINITY, f64::NEG_INFINITY));
        }
        let segmentation = self
            .segmentation
            .as_ref()
            .ok_or(Error::CorruptedState)?;
        for score in &mut self.scores[range] {
            *score = self.basis.normalize(*score, segmentation);
            if fixed.is_none() {
                self.max_score = self.max_score.max(*score);
                self.min_score = self.min_score.min(*score);
            }
        }
        Ok(())
    }

    fn filter_superpixels(&mut self, range: Range<usize>) -> FilterResult<()> {
        let segmentation = self
            .segmentation
            .as_ref()
            .ok_or(Error::CorruptedState)?;
        for k in range {
            let choice = self.basis.is_selected(self.scores[k], self.threshold);
            self.selected_superpixels[k] = choice;
            let sp = segmentation.superpixel(k).ok_or(Error::CorruptedState)?;
            for &px in sp.pixels() {
                self.selected_pixels[px] = choice;
            }
        }
        Ok(())
    }

    fn fill_output(&mut self, range: Range<usize>) -> FilterResult<()> {
        let segmentation = self
            .segmentation
            .as_ref()
            .ok_or(Error::CorruptedState)?;
        let image = segmentation.image();
        let (w, h) = self.dimensions;
        let (dx, dy) = if self.output_in_row { (w, 0) } else { (0, h) };
        let mut out = self.output.take().ok_or(Error::CorruptedState)?;

        for k in range {
            let sp = segmentation.superpixel(k).ok_or(Error::CorruptedState)?;
            let grey = color::grey(score_grey(self.scores[k], self.min_score, self.max_score));
            let choice = if self.selected_superpixels[k] {
                SELECTED_COLOR
            } else {
                REJECTED_COLOR
            };
            for &px in sp.interior_pixels() {
                let (x, y) = image.index_to_xy(px);
                out.set_pixel(x, y, grey)?;
                out.set_pixel(x + dx, y + dy, choice)?;
            }
            for &px in sp.boundary_pixels() {
                let (x, y) = image.index_to_xy(px);
                out.set_pixel(x, y, SCORE_BORDER_COLOR)?;
                out.set_pixel(x + dx, y + dy, SELECTION_BORDER_COLOR)?;
            }
        }

        self.output = Some(out);
        Ok(())
    }
}

impl IncrementalAlgorithm for LocalDataFilter {
    type Error = FilterError;

    fn name(&self) -> &'static str {
        "Local data superpixel filter"
    }

    /// The generator's auxiliary images, then the selection map if the
    /// basis reads one
    fn required_images(&self) -> Vec<String> {
        let mut images = self.generator.required_images();
        if self.basis.needs_selection_map() {
            images.push(SELECTION_MAP_DESCRIPTION.to_string());
        }
        images
    }

    fn initialize(&mut self, mut images: Vec<PixelImage>) -> FilterResult<()> {
        self.state.reset();
        self.selection_map = None;
        self.segmentation = None;
        self.selected_superpixels.clear();
        self.selected_pixels.clear();
        self.scores.clear();
        self.min_score = f64::INFINITY;
        self.max_score = f64::NEG_INFINITY;
        self.histogram = None;
        self.threshold = 0.0;
        self.output = None;
        self.output_in_row = false;

        let expected = 1 + self.required_images().len();
        if images.len() != expected {
            return Err(Error::ImageCount {
                expected,
                actual: images.len(),
            }
            .into());
        }
        let primary = images[0].dimensions();

        if self.basis.needs_selection_map() {
            let map = images.pop().ok_or(Error::CorruptedState)?;
            if map.dimensions() != primary {
                tracing::warn!(
                    image = ?primary,
                    map = ?map.dimensions(),
                    "input image and selection map dimensions do not agree"
                );
                return Err(Error::DimensionMismatch {
                    expected: primary,
                    actual: map.dimensions(),
                }
                .into());
            }
            self.selection_map = Some(map);
        }

        if let Err(e) = self.generator.initialize(images) {
            self.selection_map = None;
            return Err(e.into());
        }
        self.dimensions = primary;
        self.state.mark_initialized();
        Ok(())
    }

    fn advance(&mut self) -> FilterResult<Step> {
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

    fn take_output(&mut self) -> FilterResult<Raster> {
        self.state.check_can_collect()?;
        if !self.state.is_output_enabled() {
            return Err(Error::OutputDisabled.into());
        }
        self.output.take().ok_or(FilterError::ResultUnavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stippler_superpixel::PrecomputedSuperpixels;

    /// 6x2 image: superpixel 0 covers the left 4 columns, 1 and 2 the
    /// remaining two columns
    fn segmentation() -> Superpixellation {
        let l: Vec<f64> = (0..12).map(|k| (k % 6) as f64 * 10.0).collect();
        let img = PixelImage::from_lightness(6, 2, l).unwrap();
        let labels = vec![0, 0, 0, 0, 1, 2, 0, 0, 0, 0, 1, 2];
        Superpixellation::from_labels(img, labels, 3).unwrap()
    }

    fn filter(basis: ScoreBasis) -> LocalDataFilter {
        LocalDataFilter::new(Box::new(PrecomputedSuperpixels::new(segmentation())), basis)
    }

    fn run(f: &mut LocalDataFilter, images: Vec<PixelImage>) {
        f.initialize(images).unwrap();
        while !f.advance().unwrap().finished {}
    }

    #[test]
    fn test_score_grey() {
        assert_eq!(score_grey(0.0, 0.0, 1.0), 0);
        assert_eq!(score_grey(0.5, 0.0, 1.0), 128);
        assert_eq!(score_grey(1.0, 0.0, 1.0), 255);
        assert_eq!(score_grey(2.0, 2.0, 2.0), 0);
    }

    #[test]
    fn test_required_images() {
        assert!(filter(ScoreBasis::Size).required_images().is_empty());
        assert_eq!(
            filter(ScoreBasis::External).required_images(),
            vec![SELECTION_MAP_DESCRIPTION.to_string()]
        );
    }

    #[test]
    fn test_size_filter_keeps_large() {
        let mut f = filter(ScoreBasis::Size);
        run(&mut f, vec![PixelImage::from_lightness(6, 2, vec![0.0; 12]).unwrap()]);
        // sizes 8, 2, 2 against a mean of 4
        assert!((f.max_score() - 2.0).abs() < 1e-12);
        assert!((f.min_score() - 0.5).abs() < 1e-12);
        assert!(f.threshold() > 0.5 && f.threshold() <= 2.0);
        let out = f.take_output().unwrap();
        assert_eq!(out.dimensions(), (6, 4));
        let filtered = f.take_filtered().unwrap();
        assert_eq!(filtered.selected_superpixels(), &[true, false, false]);
        assert_eq!(filtered.is_pixel_selected(6), Some(true));
        assert_eq!(filtered.is_pixel_selected(11), Some(false));
        assert!(matches!(f.take_filtered(), Err(FilterError::ResultUnavailable)));
    }

    #[test]
    fn test_stage_order() {
        let mut f = filter(ScoreBasis::StdDevLightness);
        f.disable_output();
        f.initialize(vec![PixelImage::from_lightness(6, 2, vec![0.0; 12]).unwrap()])
            .unwrap();
        let mut seen = vec![f.stage()];
        while !f.advance().unwrap().finished {
            if seen.last() != Some(&f.stage()) {
                seen.push(f.stage());
            }
        }
        assert_eq!(
            seen,
            vec![
                FilterStage::Start,
                FilterStage::GenerateSuperpixels,
                FilterStage::CollectStatistics,
                FilterStage::NormalizeStatistics,
                FilterStage::ConstructHistogram,
                FilterStage::ChooseOtsuThreshold,
                FilterStage::FilterSuperpixels,
            ]
        );
        assert_eq!(f.stage(), FilterStage::End);
        assert!(matches!(
            f.take_output(),
            Err(FilterError::Core(Error::OutputDisabled))
        ));
    }

    #[test]
    fn test_external_map_checks() {
        let mut f = filter(ScoreBasis::External);
        let img = PixelImage::from_lightness(6, 2, vec![0.0; 12]).unwrap();
        assert!(matches!(
            f.initialize(vec![img.clone()]),
            Err(FilterError::Core(Error::ImageCount {
                expected: 2,
                actual: 1
            }))
        ));
        let small = PixelImage::from_lightness(3, 2, vec![0.0; 6]).unwrap();
        assert!(matches!(
            f.initialize(vec![img, small]),
            Err(FilterError::Core(Error::DimensionMismatch { .. }))
        ));
        assert!(matches!(
            f.advance(),
            Err(FilterError::Core(Error::NotInitialized))
        ));
    }

    #[test]
    fn test_generator_rejects_input() {
        let mut f = filter(ScoreBasis::Size);
        let other = PixelImage::from_lightness(2, 2, vec![0.0; 4]).unwrap();
        assert!(matches!(
            f.initialize(vec![other]),
            Err(FilterError::Superpixel(_))
        ));
        assert!(!f.has_failed());
    }
}
