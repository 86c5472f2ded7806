//! SLIC processing stages

/// Stages of [`crate::Slic`], in processing order
///
/// The k-means stages repeat until convergence. The three component stages
/// are skipped when postprocessing is disabled, and rendering is skipped
/// when output is disabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SlicStage {
    #[default]
    Start,
    ConvertColourSpace,
    SeedCenters,
    LabelPixels,
    UpdateCenters,
    AssessConvergence,
    FindComponents,
    ClassifyComponents,
    ReassignComponents,
    SortPixels,
    BuildSuperpixels,
    RenderOutput,
    End,
}

impl SlicStage {
    /// Whether the stage loops over clusters (as opposed to pixels)
    pub fn iterates_clusters(self) -> bool {
        matches!(
            self,
            Self::SeedCenters
                | Self::LabelPixels
                | Self::AssessConvergence
                | Self::ClassifyComponents
                | Self::BuildSuperpixels
                | Self::RenderOutput
        )
    }

    /// Whether the stage loops over pixels
    pub fn iterates_pixels(self) -> bool {
        matches!(
            self,
            Self::UpdateCenters
                | Self::FindComponents
                | Self::ReassignComponents
                | Self::SortPixels
        )
    }
}
