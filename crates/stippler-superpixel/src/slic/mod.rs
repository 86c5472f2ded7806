//! SLIC superpixel segmentation
//!
//! Simple Linear Iterative Clustering: k-means over position and L*a*b*
//! colour where each centre only competes for pixels inside a window around
//! itself, followed by connectivity cleanup and bucketing of pixels into
//! [`Superpixel`] records.
//!
//! [`Slic`] is an [`IncrementalAlgorithm`]; each `advance` call processes
//! at most [`CLUSTER_GRANULARITY`] clusters or [`PIXEL_GRANULARITY`] pixels
//! of the current stage.
//!
//! # Examples
//!
//! ```
//! use stippler_core::{IncrementalAlgorithm, PixelImage};
//! use stippler_superpixel::{Slic, SlicOptions, SuperpixelGenerator};
//!
//! let image = PixelImage::from_lightness(8, 8, vec![50.0; 64]).unwrap();
//! let mut slic = Slic::new(SlicOptions::default().with_superpixels(4));
//! slic.initialize(vec![image]).unwrap();
//! while !slic.advance().unwrap().finished {}
//! let segmentation = slic.take_superpixellation().unwrap();
//! assert_eq!(segmentation.n_superpixels(), 4);
//! ```

mod components;
mod kmeans;
mod options;
mod render;
mod seeding;
mod stage;

pub use kmeans::ClusterCenter;
pub use options::{
    CLUSTER_GRANULARITY, CONVERGENCE_THRESHOLD, ComponentPolicy, DEFAULT_COMPACTNESS,
    DEFAULT_SUPERPIXELS, MAX_KMEANS_ITERATIONS, MIN_SEARCH_WINDOW, PIXEL_GRANULARITY, SlicOptions,
    Visualization, grid_interval,
};
pub use render::{BACKGROUND_COLOR, BORDER_COLOR, CENTER_COLOR};
pub use stage::SlicStage;

use std::ops::Range;

use stippler_core::error::try_alloc;
use stippler_core::{AlgorithmState, Error, IncrementalAlgorithm, Lab, PixelImage, Raster, Step};

use crate::error::{SuperpixelError, SuperpixelResult};
use crate::generator::SuperpixelGenerator;
use crate::superpixel::Superpixel;
use crate::superpixellation::{BucketSort, NO_LABEL, Superpixellation};
use components::ComponentSearch;
use kmeans::{CenterSums, has_converged, nearest_center};
use render::Painter;
use seeding::SeedGrid;

/// Buffers owned by one SLIC run
#[derive(Debug)]
struct SlicWork {
    /// Target cluster count
    k: usize,
    /// Pixel count
    n: usize,
    grid: SeedGrid,
    /// `m^2 / S^2`
    spatial_weight: f64,
    centers: Vec<ClusterCenter>,
    previous: Vec<ClusterCenter>,
    sums: Vec<CenterSums>,
    counts: Vec<usize>,
    distances: Vec<f64>,
    labels: Vec<usize>,
    iteration: usize,
    residual: f64,
    previous_residual: f64,
    window: Vec<usize>,
    components: ComponentSearch,
    buckets: BucketSort,
    superpixels: Vec<Superpixel>,
}

impl SlicWork {
    fn new(image: &PixelImage, options: &SlicOptions) -> SuperpixelResult<Self> {
        let n = image.pixel_count();
        let k = options.superpixels;
        let s = grid_interval(n, k);
        let grid = SeedGrid::new(image.width(), image.height(), s, k);
        let window_capacity = ((2 * grid.search_half_width + 1) * (2 * grid.search_half_height + 1))
            .min(n as i64) as usize;

        Ok(Self {
            k,
            n,
            grid,
            spatial_weight: (options.compactness * options.compactness) / (s * s) as f64,
            centers: try_alloc(k, ClusterCenter::default())?,
            previous: try_alloc(k, ClusterCenter::default())?,
            sums: try_alloc(k, CenterSums::default())?,
            counts: try_alloc(k, 0)?,
            distances: try_alloc(n, f64::INFINITY)?,
            labels: try_alloc(n, NO_LABEL)?,
            iteration: 0,
            residual: 0.0,
            previous_residual: 0.0,
            window: Vec::with_capacity(window_capacity),
            components: ComponentSearch::default(),
            buckets: BucketSort::new(&[]),
            superpixels: Vec::new(),
        })
    }
}

/// Incremental SLIC engine
///
/// Takes ownership of its input image and hands it on inside the resulting
/// [`Superpixellation`].
#[derive(Debug)]
pub struct Slic {
    options: SlicOptions,
    state: AlgorithmState<SlicStage>,
    image: Option<PixelImage>,
    work: Option<Box<SlicWork>>,
    segmentation: Option<Superpixellation>,
    output: Option<Raster>,
}

impl Default for Slic {
    fn default() -> Self {
        Self::new(SlicOptions::default())
    }
}

impl Slic {
    pub fn new(options: SlicOptions) -> Self {
        Self {
            options,
            state: AlgorithmState::new(),
            image: None,
            work: None,
            segmentation: None,
            output: None,
        }
    }

    pub fn options(&self) -> &SlicOptions {
        &self.options
    }

    /// Current stage
    pub fn stage(&self) -> SlicStage {
        self.state.stage()
    }

    /// Zero-based k-means iteration currently running (or last run)
    pub fn iteration(&self) -> usize {
        self.work.as_ref().map_or(0, |w| w.iteration)
    }

    /// Current cluster centres
    pub fn centers(&self) -> &[ClusterCenter] {
        self.work.as_ref().map_or(&[][..], |w| &w.centers[..])
    }

    /// Number of connected components found during postprocessing
    pub fn n_components(&self) -> usize {
        self.work.as_ref().map_or(0, |w| w.components.n_components())
    }

    /// The finished segmentation, if not yet taken
    pub fn superpixellation(&self) -> Option<&Superpixellation> {
        self.segmentation.as_ref()
    }

    fn parts(&mut self) -> SuperpixelResult<(&PixelImage, &mut SlicWork)> {
        match (self.image.as_ref(), self.work.as_deref_mut()) {
            (Some(image), Some(work)) => Ok((image, work)),
            _ => Err(Error::CorruptedState.into()),
        }
    }

    fn work(&self) -> SuperpixelResult<&SlicWork> {
        self.work.as_deref().ok_or(Error::CorruptedState.into())
    }

    /// Loop bound and items per increment of a stage
    fn loop_bounds(&self, stage: SlicStage) -> SuperpixelResult<(usize, usize)> {
        if stage.iterates_clusters() {
            Ok((self.work()?.k, CLUSTER_GRANULARITY))
        } else if stage.iterates_pixels() {
            Ok((self.work()?.n, PIXEL_GRANULARITY))
        } else {
            Ok((1, 1))
        }
    }

    fn step(&mut self) -> SuperpixelResult<Step> {
        let stage = self.state.stage();
        let (limit, granularity) = self.loop_bounds(stage)?;
        let range = self.state.chunk(limit, granularity);
        let first = self.state.at_stage_start();

        let status = match stage {
            SlicStage::Start => "Starting SLIC superpixel segmentation".to_string(),
            SlicStage::ConvertColourSpace => self.convert_colour_space()?,
            SlicStage::SeedCenters => self.seed_centers(range.clone())?,
            SlicStage::LabelPixels => self.label_pixels(range.clone(), first)?,
            SlicStage::UpdateCenters => self.update_centers(range.clone(), first)?,
            SlicStage::AssessConvergence => self.assess_convergence(range.clone())?,
            SlicStage::FindComponents => self.find_components(range.clone(), first)?,
            SlicStage::ClassifyComponents => self.classify_components(range.clone(), first)?,
            SlicStage::ReassignComponents => self.reassign_components(range.clone(), first)?,
            SlicStage::SortPixels => self.sort_pixels(range.clone(), first)?,
            SlicStage::BuildSuperpixels => self.build_superpixels(range.clone(), first)?,
            SlicStage::RenderOutput => self.render_output(range.clone(), first)?,
            SlicStage::End => return Err(Error::CorruptedState.into()),
        };

        self.state.set_cursor(range.end);
        if range.end >= limit {
            self.complete_stage(stage)?;
        }

        if self.state.is_finished() {
            let work = self.work()?;
            Ok(Step::done(format!(
                "Segmented into {} superpixels after {} k-means iterations",
                work.k,
                work.iteration + 1
            )))
        } else {
            Ok(Step::progress(status))
        }
    }

    fn complete_stage(&mut self, stage: SlicStage) -> SuperpixelResult<()> {
        let next = match stage {
            SlicStage::Start => SlicStage::ConvertColourSpace,
            SlicStage::ConvertColourSpace => SlicStage::SeedCenters,
            SlicStage::SeedCenters => {
                let (_, work) = self.parts()?;
                work.previous.copy_from_slice(&work.centers);
                SlicStage::LabelPixels
            }
            SlicStage::LabelPixels => SlicStage::UpdateCenters,
            SlicStage::UpdateCenters => SlicStage::AssessConvergence,
            SlicStage::AssessConvergence => {
                let postprocess = self.options.postprocess;
                let (_, work) = self.parts()?;
                tracing::debug!(
                    iteration = work.iteration,
                    residual = work.residual,
                    previous = work.previous_residual,
                    "k-means iteration complete"
                );
                if has_converged(work.iteration, work.residual, work.previous_residual) {
                    if postprocess {
                        SlicStage::FindComponents
                    } else {
                        SlicStage::SortPixels
                    }
                } else {
                    work.iteration += 1;
                    work.previous.copy_from_slice(&work.centers);
                    work.previous_residual = work.residual;
                    work.residual = 0.0;
                    SlicStage::LabelPixels
                }
            }
            SlicStage::FindComponents => SlicStage::ClassifyComponents,
            SlicStage::ClassifyComponents => SlicStage::ReassignComponents,
            SlicStage::ReassignComponents => SlicStage::SortPixels,
            SlicStage::SortPixels => SlicStage::BuildSuperpixels,
            SlicStage::BuildSuperpixels => {
                self.assemble_segmentation()?;
                if self.state.is_output_enabled() {
                    SlicStage::RenderOutput
                } else {
                    SlicStage::End
                }
            }
            SlicStage::RenderOutput => SlicStage::End,
            SlicStage::End => return Err(Error::CorruptedState.into()),
        };

        tracing::debug!(from = ?stage, to = ?next, "SLIC stage complete");
        self.state.enter(next);
        if next == SlicStage::End {
            self.state.finish();
        }
        Ok(())
    }

    fn convert_colour_space(&mut self) -> SuperpixelResult<String> {
        let (image, _) = self.parts()?;
        image.lab();
        Ok("Converted image to CIE L*a*b*".to_string())
    }

    fn seed_centers(&mut self, range: Range<usize>) -> SuperpixelResult<String> {
        let (image, work) = self.parts()?;
        for c in range.clone() {
            work.centers[c] = work.grid.seed(image, c);
        }
        Ok(format!("Seeding cluster centers ({} / {})", range.end, work.k))
    }

    fn label_pixels(&mut self, range: Range<usize>, first: bool) -> SuperpixelResult<String> {
        let (image, work) = self.parts()?;
        if first {
            work.distances.fill(f64::INFINITY);
            work.labels.fill(NO_LABEL);
        }
        let lab = image.lab();
        for c in range.clone() {
            let center = work.centers[c];
            image.rectangular_neighbourhood(
                center.x.floor() as i64,
                center.y.floor() as i64,
                work.grid.search_half_width,
                work.grid.search_half_height,
                &mut work.window,
            );
            for &px in &work.window {
                let (x, y) = image.index_to_xy(px);
                let color = Lab::new(lab.l[px], lab.a[px], lab.b[px]);
                let d = center.distance(x as f64, y as f64, &color, work.spatial_weight);
                if d < work.distances[px] {
                    work.distances[px] = d;
                    work.labels[px] = c;
                }
            }
        }
        Ok(format!(
            "K-means iteration {}, labelling pixels ({} / {})",
            work.iteration, range.end, work.k
        ))
    }

    fn update_centers(&mut self, range: Range<usize>, first: bool) -> SuperpixelResult<String> {
        let (image, work) = self.parts()?;
        if first {
            work.sums.fill(CenterSums::default());
            work.counts.fill(0);
        }
        let lab = image.lab();
        for px in range.clone() {
            let (x, y) = image.index_to_xy(px);
            let (x, y) = (x as f64, y as f64);
            let color = Lab::new(lab.l[px], lab.a[px], lab.b[px]);
            let mut label = work.labels[px];
            if label == NO_LABEL {
                label = nearest_center(&work.centers, x, y, &color, work.spatial_weight);
                tracing::debug!(pixel = px, label, "pixel outside every search window");
                work.labels[px] = label;
            }
            work.sums[label].add(x, y, &color);
            work.counts[label] += 1;
        }
        Ok(format!(
            "K-means iteration {}, accumulating cluster centers ({} / {})",
            work.iteration, range.end, work.n
        ))
    }

    fn assess_convergence(&mut self, range: Range<usize>) -> SuperpixelResult<String> {
        let (_, work) = self.parts()?;
        for c in range.clone() {
            match work.sums[c].mean(work.counts[c]) {
                Some(center) => work.centers[c] = center,
                None => {
                    tracing::warn!(cluster = c, "empty cluster keeps its previous center");
                    work.centers[c] = work.previous[c];
                }
            }
            if work.iteration > 0 {
                work.residual += work.centers[c].displacement_squared(&work.previous[c]);
            }
        }
        let action = if work.iteration > 0 {
            "calculating residual error"
        } else {
            "normalizing cluster centers"
        };
        Ok(format!(
            "K-means iteration {}, {} ({} / {})",
            work.iteration, action, range.end, work.k
        ))
    }

    fn find_components(&mut self, range: Range<usize>, first: bool) -> SuperpixelResult<String> {
        let (image, work) = self.parts()?;
        if first {
            work.components.reset(work.n);
        }
        for _ in range.clone() {
            work.components.label_next(&work.labels, image);
        }
        Ok(format!(
            "Finding connected components ({} / {})",
            range.end, work.n
        ))
    }

    fn classify_components(&mut self, range: Range<usize>, first: bool) -> SuperpixelResult<String> {
        let policy = self.options.component_policy;
        let (image, work) = self.parts()?;
        if first {
            work.components
                .begin_classification(policy == ComponentPolicy::Largest);
        }
        for c in range.clone() {
            match policy {
                ComponentPolicy::Largest => work.components.keep_largest(c),
                ComponentPolicy::ContainsCenter => {
                    let center = work.centers[c];
                    let x = center.x.round().clamp(0.0, (image.width() - 1) as f64) as u32;
                    let y = center.y.round().clamp(0.0, (image.height() - 1) as f64) as u32;
                    work.components
                        .keep_containing(c, image.xy_to_index(x, y), &work.labels);
                }
            }
        }
        Ok(format!(
            "Classifying connected components ({} / {})",
            range.end, work.k
        ))
    }

    fn reassign_components(&mut self, range: Range<usize>, first: bool) -> SuperpixelResult<String> {
        let (image, work) = self.parts()?;
        if first {
            work.components.begin_reassignment();
        }
        for px in range.clone() {
            if !work
                .components
                .reassign(px, &mut work.labels, &mut work.counts, image)
            {
                tracing::warn!(pixel = px, "no kept component reachable, label unchanged");
            }
        }
        Ok(format!(
            "Reassigning disconnected pixels ({} / {})",
            range.end, work.n
        ))
    }

    fn sort_pixels(&mut self, range: Range<usize>, first: bool) -> SuperpixelResult<String> {
        let (_, work) = self.parts()?;
        if first {
            work.buckets = BucketSort::new(&work.counts);
        }
        // Pixels are placed in descending index order.
        for i in range.clone() {
            let px = work.n - 1 - i;
            if !work.buckets.place(px, work.labels[px]) {
                return Err(Error::CorruptedState.into());
            }
        }
        Ok(format!(
            "Sorting pixels into superpixels ({} / {})",
            range.end, work.n
        ))
    }

    fn build_superpixels(&mut self, range: Range<usize>, first: bool) -> SuperpixelResult<String> {
        let (image, work) = self.parts()?;
        if first {
            work.superpixels = Vec::with_capacity(work.k);
        }
        for c in range.clone() {
            let pixels = work.buckets.bucket(c, work.counts[c]).to_vec();
            work.superpixels
                .push(Superpixel::new(c, pixels, &work.labels, image));
        }
        Ok(format!(
            "Creating superpixels ({} / {})",
            range.end, work.k
        ))
    }

    fn assemble_segmentation(&mut self) -> SuperpixelResult<()> {
        let image = self.image.take().ok_or(Error::CorruptedState)?;
        let work = self.work.as_deref_mut().ok_or(Error::CorruptedState)?;
        let labels = std::mem::take(&mut work.labels);
        let superpixels = std::mem::take(&mut work.superpixels);
        work.distances = Vec::new();
        tracing::info!(
            superpixels = superpixels.len(),
            iterations = work.iteration + 1,
            components = work.components.n_components(),
            "SLIC segmentation complete"
        );
        self.segmentation = Some(Superpixellation::from_parts(image, labels, superpixels));
        Ok(())
    }

    fn render_output(&mut self, range: Range<usize>, first: bool) -> SuperpixelResult<String> {
        let seg = self.segmentation.as_ref().ok_or(Error::CorruptedState)?;
        let work = self.work.as_deref().ok_or(Error::CorruptedState)?;
        if first {
            self.output = Some(Raster::new_filled(
                seg.width(),
                seg.height(),
                BACKGROUND_COLOR,
            )?);
        }
        let out = self.output.as_mut().ok_or(Error::CorruptedState)?;
        let painter = Painter {
            visualization: self.options.visualization,
            mark_centers: self.options.mark_centers,
            n_clusters: work.k,
            components: &work.components,
        };
        for c in range.clone() {
            if let Some(sp) = seg.superpixel(c) {
                painter.paint(out, seg.image(), sp)?;
            }
        }
        Ok(format!("Drawing superpixels ({} / {})", range.end, work.k))
    }
}

impl IncrementalAlgorithm for Slic {
    type Error = SuperpixelError;

    fn name(&self) -> &'static str {
        "SLIC superpixels"
    }

    fn initialize(&mut self, images: Vec<PixelImage>) -> SuperpixelResult<()> {
        self.state.reset();
        self.image = None;
        self.work = None;
        self.segmentation = None;
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
        self.options.validate(image.pixel_count())?;
        let work = SlicWork::new(&image, &self.options)?;
        tracing::debug!(
            width = image.width(),
            height = image.height(),
            k = work.k,
            search_half_width = work.grid.search_half_width,
            search_half_height = work.grid.search_half_height,
            "SLIC initialized"
        );

        self.image = Some(image);
        self.work = Some(Box::new(work));
        self.state.mark_initialized();
        Ok(())
    }

    fn advance(&mut self) -> SuperpixelResult<Step> {
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

    fn take_output(&mut self) -> SuperpixelResult<Raster> {
        self.state.check_can_collect()?;
        if !self.state.is_output_enabled() {
            return Err(Error::OutputDisabled.into());
        }
        self.output.take().ok_or(SuperpixelError::ResultUnavailable)
    }
}

impl SuperpixelGenerator for Slic {
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

    fn run(slic: &mut Slic, image: PixelImage) -> usize {
        slic.initialize(vec![image]).unwrap();
        let mut steps = 0;
        while !slic.advance().unwrap().finished {
            steps += 1;
        }
        steps + 1
    }

    fn grey(w: u32, h: u32) -> PixelImage {
        let n = (w * h) as usize;
        PixelImage::from_rgb(w, h, vec![128; n], vec![128; n], vec![128; n]).unwrap()
    }

    #[test]
    fn test_initialize_rejects_bad_input() {
        let mut slic = Slic::new(SlicOptions::default().with_superpixels(100));
        assert!(matches!(
            slic.initialize(vec![grey(4, 4)]),
            Err(SuperpixelError::InvalidParameters(_))
        ));
        assert!(matches!(
            slic.initialize(vec![]),
            Err(SuperpixelError::Core(Error::ImageCount { .. }))
        ));
        assert!(matches!(
            slic.advance(),
            Err(SuperpixelError::Core(Error::NotInitialized))
        ));
    }

    #[test]
    fn test_uniform_four_by_four() {
        let mut slic = Slic::new(SlicOptions::default().with_superpixels(4));
        run(&mut slic, grey(4, 4));
        assert!(slic.is_finished());
        let seg = slic.take_superpixellation().unwrap();
        assert_eq!(seg.n_superpixels(), 4);
        let sizes: Vec<usize> = seg.superpixels().iter().map(|s| s.size()).collect();
        assert_eq!(sizes.iter().sum::<usize>(), 16);
        assert!(sizes.iter().all(|&s| s > 0));
        for sp in seg.superpixels() {
            assert!(sp.std_dev_color() < 1e-9);
        }
    }

    #[test]
    fn test_stage_sequence_without_postprocessing() {
        let options = SlicOptions::default()
            .with_superpixels(4)
            .with_postprocess(false);
        let mut slic = Slic::new(options);
        slic.initialize(vec![grey(6, 6)]).unwrap();
        let mut seen = Vec::new();
        loop {
            let stage = slic.stage();
            if seen.last() != Some(&stage) {
                seen.push(stage);
            }
            if slic.advance().unwrap().finished {
                break;
            }
        }
        assert!(!seen.contains(&SlicStage::FindComponents));
        assert!(seen.contains(&SlicStage::SortPixels));
        assert_eq!(seen.last(), Some(&SlicStage::RenderOutput));
        assert_eq!(slic.stage(), SlicStage::End);
    }

    #[test]
    fn test_output_disabled_skips_render() {
        let mut slic = Slic::new(SlicOptions::default().with_superpixels(4));
        slic.disable_output();
        run(&mut slic, grey(8, 8));
        assert!(matches!(
            slic.take_output(),
            Err(SuperpixelError::Core(Error::OutputDisabled))
        ));
        assert!(slic.take_superpixellation().is_ok());
    }

    #[test]
    fn test_take_before_finish() {
        let mut slic = Slic::new(SlicOptions::default().with_superpixels(4));
        slic.initialize(vec![grey(8, 8)]).unwrap();
        slic.advance().unwrap();
        assert!(matches!(
            slic.take_superpixellation(),
            Err(SuperpixelError::Core(Error::NotFinished))
        ));
        assert!(matches!(
            slic.take_output(),
            Err(SuperpixelError::Core(Error::NotFinished))
        ));
    }

    #[test]
    fn test_rerun_after_finish() {
        let mut slic = Slic::new(SlicOptions::default().with_superpixels(4));
        run(&mut slic, grey(8, 8));
        assert!(matches!(
            slic.advance(),
            Err(SuperpixelError::Core(Error::AlreadyFinished))
        ));
        run(&mut slic, grey(8, 8));
        assert!(slic.take_output().is_ok());
    }
}
