//! fokal-pipeline: pure depth-proxy analysis pipeline (sans-IO).
//!
//! Derives an approximate depth map from a single 2D image through:
//! decode -> luminance frame -> gradient depth estimation ->
//! focus-region segmentation -> depth visualization, plus a separate
//! selective-blur compositor driven by the estimated depth.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! byte slices and returns structured data. File handling lives in
//! `fokal-cli`; request scheduling lives in `fokal-scheduler`.
//!
//! The depth values are a heuristic proxy (local gradient strength),
//! not metric depth: larger values mean nearer under the pipeline's
//! convention, and the compositor keeps above-threshold pixels sharp.

pub mod blur;
pub mod composite;
pub mod depth;
pub mod diagnostics;
pub mod focus;
pub mod pipeline;
pub mod preprocess;
pub mod regions;
pub mod render;
pub mod types;

pub use composite::composite;
pub use diagnostics::{AnalysisDiagnostics, Clock, InstantClock, StageDiagnostics, StageMetrics};
pub use focus::auto_focus_depth;
pub use pipeline::Pipeline;
pub use types::{
    AnalyzerConfig, AnalyzerContext, BlurParams, BoundingBox, DepthMap, Dimensions, FocusRegion,
    GrayImage, PipelineError, RegionMask, RgbaImage,
};

/// Complete result of one analysis run.
///
/// Produced whole or not at all: a failed analysis yields exactly one
/// [`PipelineError`] and no partial result. Nothing is retained by the
/// pipeline afterwards — compositing works entirely from this value.
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    /// The decoded source image, kept so compositing never re-decodes.
    pub original: RgbaImage,
    /// Depth map at the bounded processing resolution.
    pub depth_map: DepthMap,
    /// Depth map upscaled to the original resolution, ready for
    /// compositor sampling.
    pub upscaled_depth: DepthMap,
    /// Focus regions ordered by ascending mean depth, with bounding
    /// boxes and masks in original-image coordinates.
    pub regions: Vec<FocusRegion>,
    /// Grayscale depth visualization, JPEG-encoded at the original
    /// resolution.
    pub depth_image: Vec<u8>,
    /// Original image dimensions.
    pub dimensions: Dimensions,
}

/// Run the full analysis pipeline.
///
/// Takes raw image bytes (PNG, JPEG, BMP, WebP), the requested region
/// count, and the process-wide context, and produces an [`Analysis`].
///
/// # Pipeline steps
///
/// 1. Decode image and enforce the size bound
/// 2. Downscale to processing resolution and extract luminance
/// 3. Estimate the gradient-based depth-proxy map
/// 4. Upscale the depth map to the original resolution
/// 5. Segment the upscaled map into depth-bucketed focus regions
/// 6. Render the grayscale visualization
///
/// Compositing ([`composite`]) is deliberately *not* part of this run:
/// parameter changes re-composite from the returned [`Analysis`]
/// without re-running the estimator.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidRegionCount`] if `num_regions` is
/// outside `[1, 20]` (checked before the image is touched),
/// [`PipelineError::EmptyInput`] / [`PipelineError::ImageDecode`] /
/// [`PipelineError::ImageTooLarge`] for rejected inputs, and
/// [`PipelineError::Encode`] if the visualization cannot be encoded.
pub fn analyze(
    image_bytes: &[u8],
    num_regions: u32,
    ctx: &AnalyzerContext,
) -> Result<Analysis, PipelineError> {
    regions::validate_region_count(num_regions)?;
    Pipeline::new(image_bytes.to_vec(), num_regions, ctx).complete()
}

/// [`analyze`], also collecting per-stage [`AnalysisDiagnostics`].
///
/// The caller supplies the [`Clock`]; the pipeline never reads wall
/// time on its own. `total_duration` is the sum of the stage spans.
///
/// # Errors
///
/// Same failure modes as [`analyze`].
pub fn analyze_with_diagnostics<C: Clock>(
    image_bytes: &[u8],
    num_regions: u32,
    ctx: &AnalyzerContext,
    clock: &mut C,
) -> Result<(Analysis, AnalysisDiagnostics), PipelineError> {
    regions::validate_region_count(num_regions)?;

    clock.restart();
    let decoded = Pipeline::new(image_bytes.to_vec(), num_regions, ctx).decode()?;
    let decode = StageDiagnostics {
        duration: clock.elapsed(),
        metrics: decoded.metrics(),
    };

    clock.restart();
    let framed = decoded.frame();
    let preprocess = StageDiagnostics {
        duration: clock.elapsed(),
        metrics: framed.metrics(),
    };

    clock.restart();
    let estimated = framed.estimate_depth();
    let depth_estimation = StageDiagnostics {
        duration: clock.elapsed(),
        metrics: estimated.metrics(),
    };

    clock.restart();
    let segmented = estimated.segment()?;
    let segmentation = StageDiagnostics {
        duration: clock.elapsed(),
        metrics: segmented.metrics(),
    };

    clock.restart();
    let rendered = segmented.render()?;
    let render = StageDiagnostics {
        duration: clock.elapsed(),
        metrics: rendered.metrics(),
    };

    let total_duration = decode.duration
        + preprocess.duration
        + depth_estimation.duration
        + segmentation.duration
        + render.duration;

    Ok((
        rendered.into_analysis(),
        AnalysisDiagnostics {
            decode,
            preprocess,
            depth_estimation,
            segmentation,
            render,
            total_duration,
        },
    ))
}
