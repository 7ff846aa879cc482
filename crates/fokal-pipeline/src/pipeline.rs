//! Incremental pipeline: advance stage-by-stage, inspecting each
//! intermediate result before continuing.
//!
//! Unlike [`crate::analyze`] which runs the entire pipeline in one call,
//! [`Pipeline`] lets the caller drive execution one step at a time:
//!
//! ```rust
//! # use fokal_pipeline::{AnalyzerContext, Pipeline, PipelineError};
//! # fn run(png: Vec<u8>) -> Result<(), PipelineError> {
//! let ctx = AnalyzerContext::default();
//! let analysis = Pipeline::new(png, 5, &ctx)
//!     .decode()?
//!     .frame()
//!     .estimate_depth()
//!     .segment()?
//!     .render()?
//!     .into_analysis();
//! # Ok(())
//! # }
//! ```
//!
//! Each stage method consumes `self` and returns the next pipeline state
//! (or `Result` for fallible stages), making it a compile-time error to
//! skip stages or run them out of order. The caller can inspect the
//! current stage's output via accessor methods at any point, and every
//! stage past [`Pending`] reports [`StageMetrics`] for diagnostics.
//!
//! # Memory
//!
//! Every stage retains the decoded original RGBA buffer so the final
//! [`Analysis`](crate::Analysis) can hand it to the compositor without
//! re-decoding. From segmentation onward the full-resolution depth map
//! is carried as well; for very large inputs those two buffers dominate
//! memory, not the bounded processing-resolution intermediates.

use image::DynamicImage;

use crate::depth::EstimateStats;
use crate::diagnostics::StageMetrics;
use crate::preprocess::ProcessingFrame;
use crate::types::{
    AnalyzerContext, DepthMap, Dimensions, FocusRegion, PipelineError, RgbaImage,
};

// ───────────────────────── Stage 0: Pending ──────────────────────────

/// Pipeline state before any processing has occurred.
///
/// The source image bytes, region count, and context are stored but not
/// yet touched. Call [`decode`](Self::decode) to advance.
#[must_use = "pipeline stages are consumed by advancing — call .decode() to continue"]
pub struct Pending<'a> {
    ctx: &'a AnalyzerContext,
    source: Vec<u8>,
    num_regions: u32,
}

impl<'a> Pending<'a> {
    /// The raw source image bytes.
    #[must_use]
    pub fn source(&self) -> &[u8] {
        &self.source
    }

    /// Decode the source image and advance to the [`Decoded`] stage.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::EmptyInput`] if the source bytes are
    /// empty, [`PipelineError::ImageDecode`] if the image format is
    /// unrecognized or the data is corrupt, and
    /// [`PipelineError::ImageTooLarge`] if the decoded dimensions exceed
    /// the configured bound.
    pub fn decode(self) -> Result<Decoded<'a>, PipelineError> {
        let source_len = self.source.len();
        let image = crate::preprocess::decode(&self.source, self.ctx)?;
        let original = image.to_rgba8();
        Ok(Decoded {
            ctx: self.ctx,
            image,
            original,
            source_len,
            num_regions: self.num_regions,
        })
    }

    /// Run all remaining stages and return the final [`crate::Analysis`].
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if any remaining fallible stage fails.
    pub fn complete(self) -> Result<crate::Analysis, PipelineError> {
        self.decode()?.complete()
    }
}

// ───────────────────────── Stage 1: Decoded ──────────────────────────

/// Pipeline state after decoding the source image.
///
/// Call [`frame`](Self::frame) to advance.
#[must_use = "pipeline stages are consumed by advancing — call .frame() to continue"]
pub struct Decoded<'a> {
    ctx: &'a AnalyzerContext,
    image: DynamicImage,
    original: RgbaImage,
    source_len: usize,
    num_regions: u32,
}

impl<'a> Decoded<'a> {
    /// The original decoded RGBA image.
    #[must_use]
    pub const fn original(&self) -> &RgbaImage {
        &self.original
    }

    /// Metrics describing the decode.
    #[must_use]
    pub fn metrics(&self) -> StageMetrics {
        StageMetrics::Decode {
            input_bytes: self.source_len,
            width: self.original.width(),
            height: self.original.height(),
        }
    }

    /// Advance to the preprocessing stage.
    ///
    /// Downscales to the bounded processing resolution and extracts the
    /// luminance channel. Infallible: degenerate inputs are handled
    /// downstream, never here.
    pub fn frame(self) -> Framed<'a> {
        let frame = crate::preprocess::to_processing_frame(&self.image, self.ctx);
        Framed {
            ctx: self.ctx,
            original: self.original,
            frame,
            num_regions: self.num_regions,
        }
    }

    /// Run all remaining stages and return the final [`crate::Analysis`].
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if any remaining fallible stage fails.
    pub fn complete(self) -> Result<crate::Analysis, PipelineError> {
        self.frame().complete()
    }
}

// ───────────────────────── Stage 2: Framed ───────────────────────────

/// Pipeline state after reduction to the processing frame.
///
/// Call [`estimate_depth`](Self::estimate_depth) to advance.
#[must_use = "pipeline stages are consumed by advancing — call .estimate_depth() to continue"]
pub struct Framed<'a> {
    ctx: &'a AnalyzerContext,
    original: RgbaImage,
    frame: ProcessingFrame,
    num_regions: u32,
}

impl Framed<'_> {
    /// The bounded luminance frame.
    #[must_use]
    pub const fn processing_frame(&self) -> &ProcessingFrame {
        &self.frame
    }

    /// Metrics describing the preprocessing.
    #[must_use]
    pub fn metrics(&self) -> StageMetrics {
        let dims = self.frame.dimensions();
        StageMetrics::Preprocess {
            width: dims.width,
            height: dims.height,
            downscaled: dims != self.frame.original_dimensions(),
        }
    }

    /// Advance to the depth estimation stage. Infallible: degenerate
    /// gradients fall back to a uniform map.
    pub fn estimate_depth(self) -> DepthEstimated {
        let (depth, stats) = crate::depth::estimate_with_stats(&self.frame, self.ctx);
        DepthEstimated {
            smoothing_block: self.ctx.config().smoothing_block,
            original: self.original,
            depth,
            stats,
            num_regions: self.num_regions,
        }
    }

    /// Run all remaining stages and return the final [`crate::Analysis`].
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if any remaining fallible stage fails.
    pub fn complete(self) -> Result<crate::Analysis, PipelineError> {
        self.estimate_depth().complete()
    }
}

// ───────────────────────── Stage 3: DepthEstimated ───────────────────

/// Pipeline state after depth-proxy estimation.
///
/// Call [`segment`](Self::segment) to advance.
#[must_use = "pipeline stages are consumed by advancing — call .segment() to continue"]
pub struct DepthEstimated {
    smoothing_block: u32,
    original: RgbaImage,
    depth: DepthMap,
    stats: EstimateStats,
    num_regions: u32,
}

impl DepthEstimated {
    /// The depth map at processing resolution.
    #[must_use]
    pub const fn depth_map(&self) -> &DepthMap {
        &self.depth
    }

    /// Metrics describing the estimation.
    #[must_use]
    pub const fn metrics(&self) -> StageMetrics {
        StageMetrics::DepthEstimation {
            max_gradient: self.stats.max_gradient,
            degenerate_fallback: self.stats.degenerate_fallback,
            smoothing_block: self.smoothing_block,
        }
    }

    /// Advance to the segmentation stage.
    ///
    /// Upscales the depth map to the original resolution first, then
    /// segments the upscaled map, so region bounding boxes and masks
    /// come back in image coordinates.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidRegionCount`] if the requested
    /// region count lies outside the supported range.
    pub fn segment(self) -> Result<Segmented, PipelineError> {
        let upscaled = self
            .depth
            .resize(self.original.width(), self.original.height());
        let regions = crate::regions::segment(&upscaled, self.num_regions)?;
        Ok(Segmented {
            original: self.original,
            depth: self.depth,
            upscaled,
            regions,
            num_regions: self.num_regions,
        })
    }

    /// Run all remaining stages and return the final [`crate::Analysis`].
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if any remaining fallible stage fails.
    pub fn complete(self) -> Result<crate::Analysis, PipelineError> {
        self.segment()?.complete()
    }
}

// ───────────────────────── Stage 4: Segmented ────────────────────────

/// Pipeline state after focus-region segmentation.
///
/// Call [`render`](Self::render) to advance.
#[must_use = "pipeline stages are consumed by advancing — call .render() to continue"]
pub struct Segmented {
    original: RgbaImage,
    depth: DepthMap,
    upscaled: DepthMap,
    regions: Vec<FocusRegion>,
    num_regions: u32,
}

impl Segmented {
    /// The emitted focus regions, ordered by ascending depth, in image
    /// coordinates.
    #[must_use]
    pub fn regions(&self) -> &[FocusRegion] {
        &self.regions
    }

    /// The depth map upscaled to the original resolution.
    #[must_use]
    pub const fn upscaled_depth(&self) -> &DepthMap {
        &self.upscaled
    }

    /// Metrics describing the segmentation.
    #[must_use]
    pub fn metrics(&self) -> StageMetrics {
        StageMetrics::Segmentation {
            requested_regions: self.num_regions,
            emitted_regions: self.regions.len(),
        }
    }

    /// Advance to the rendering stage — the final pipeline step.
    ///
    /// Encodes the grayscale visualization from the already-upscaled
    /// depth map.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Encode`] if JPEG encoding fails.
    pub fn render(self) -> Result<Rendered, PipelineError> {
        let dimensions = Dimensions {
            width: self.original.width(),
            height: self.original.height(),
        };
        let depth_image =
            crate::render::render_depth_jpeg(&self.upscaled, dimensions.width, dimensions.height)?;
        Ok(Rendered {
            original: self.original,
            depth: self.depth,
            upscaled: self.upscaled,
            regions: self.regions,
            depth_image,
            dimensions,
        })
    }

    /// Run the remaining stage and return the final [`crate::Analysis`].
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Encode`] if JPEG encoding fails.
    pub fn complete(self) -> Result<crate::Analysis, PipelineError> {
        Ok(self.render()?.into_analysis())
    }
}

// ───────────────────────── Stage 5: Rendered ─────────────────────────

/// Pipeline state after rendering the depth visualization — the final
/// stage. Call [`into_analysis`](Self::into_analysis) to extract the
/// [`Analysis`](crate::Analysis).
#[must_use = "call .into_analysis() to extract the Analysis"]
pub struct Rendered {
    original: RgbaImage,
    depth: DepthMap,
    upscaled: DepthMap,
    regions: Vec<FocusRegion>,
    depth_image: Vec<u8>,
    dimensions: Dimensions,
}

impl Rendered {
    /// The encoded depth visualization (JPEG).
    #[must_use]
    pub fn depth_image(&self) -> &[u8] {
        &self.depth_image
    }

    /// Original image dimensions.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// Metrics describing the render.
    #[must_use]
    pub fn metrics(&self) -> StageMetrics {
        StageMetrics::Render {
            payload_bytes: self.depth_image.len(),
            width: self.dimensions.width,
            height: self.dimensions.height,
        }
    }

    /// Consume the pipeline and return the full [`Analysis`](crate::Analysis).
    #[must_use]
    pub fn into_analysis(self) -> crate::Analysis {
        crate::Analysis {
            original: self.original,
            depth_map: self.depth,
            upscaled_depth: self.upscaled,
            regions: self.regions,
            depth_image: self.depth_image,
            dimensions: self.dimensions,
        }
    }
}

// ───────────────────── Pipeline entry point ──────────────────────────

/// Incremental depth analysis pipeline.
///
/// Created via [`Pipeline::new`], which stores the source image, region
/// count, and context without doing any processing. The caller then
/// chains stage methods to advance:
///
/// ```rust
/// # use fokal_pipeline::{AnalyzerContext, Pipeline, PipelineError};
/// # fn run(png: Vec<u8>) -> Result<(), PipelineError> {
/// let ctx = AnalyzerContext::default();
/// let analysis = Pipeline::new(png, 5, &ctx)
///     .decode()?
///     .frame()
///     .estimate_depth()
///     .segment()?
///     .render()?
///     .into_analysis();
/// # Ok(())
/// # }
/// ```
pub struct Pipeline;

impl Pipeline {
    /// Create a new pipeline from source image bytes, the requested
    /// region count, and the process-wide context.
    ///
    /// No processing is performed — call [`.decode()`](Pending::decode)
    /// to begin, or [`Pending::complete`] to run everything.
    #[allow(clippy::new_ret_no_self)]
    pub const fn new(
        image_bytes: Vec<u8>,
        num_regions: u32,
        ctx: &AnalyzerContext,
    ) -> Pending<'_> {
        Pending {
            ctx,
            source: image_bytes,
            num_regions,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::AnalyzerConfig;

    /// Minimal PNG with a sharp black/white boundary.
    fn sharp_edge_png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_fn(width, height, |x, _y| {
            if x < width / 2 {
                image::Rgba([0, 0, 0, 255])
            } else {
                image::Rgba([255, 255, 255, 255])
            }
        });
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        image::ImageEncoder::write_image(
            encoder,
            img.as_raw(),
            img.width(),
            img.height(),
            image::ExtendedColorType::Rgba8,
        )
        .unwrap();
        buf
    }

    #[test]
    fn pending_exposes_source_bytes() {
        let png = sharp_edge_png(20, 20);
        let expected_len = png.len();
        let ctx = AnalyzerContext::default();
        let pending = Pipeline::new(png, 5, &ctx);
        assert_eq!(pending.source().len(), expected_len);
    }

    #[test]
    fn decode_empty_input_returns_error() {
        let ctx = AnalyzerContext::default();
        let result = Pipeline::new(vec![], 5, &ctx).decode();
        assert!(matches!(result, Err(PipelineError::EmptyInput)));
    }

    #[test]
    fn decode_corrupt_input_returns_error() {
        let ctx = AnalyzerContext::default();
        let result = Pipeline::new(vec![0xFF, 0x00], 5, &ctx).decode();
        assert!(matches!(result, Err(PipelineError::ImageDecode(_))));
    }

    #[test]
    fn decoded_exposes_original() {
        let ctx = AnalyzerContext::default();
        let decoded = Pipeline::new(sharp_edge_png(20, 20), 5, &ctx)
            .decode()
            .unwrap();
        assert_eq!(decoded.original().width(), 20);
        assert_eq!(decoded.original().height(), 20);
    }

    #[test]
    fn framed_reports_downscaling_only_when_applied() {
        let ctx = AnalyzerContext::new(AnalyzerConfig {
            processing_resolution: 16,
            ..AnalyzerConfig::default()
        });

        let small = Pipeline::new(sharp_edge_png(10, 10), 5, &ctx)
            .decode()
            .unwrap()
            .frame();
        assert!(matches!(
            small.metrics(),
            StageMetrics::Preprocess {
                downscaled: false,
                ..
            },
        ));

        let large = Pipeline::new(sharp_edge_png(64, 64), 5, &ctx)
            .decode()
            .unwrap()
            .frame();
        assert!(matches!(
            large.metrics(),
            StageMetrics::Preprocess {
                width: 16,
                height: 16,
                downscaled: true,
            },
        ));
    }

    #[test]
    fn depth_estimated_exposes_map_at_frame_resolution() {
        let ctx = AnalyzerContext::default();
        let estimated = Pipeline::new(sharp_edge_png(32, 24), 5, &ctx)
            .decode()
            .unwrap()
            .frame()
            .estimate_depth();
        let dims = estimated.depth_map().dimensions();
        assert_eq!(dims.width, 32);
        assert_eq!(dims.height, 24);
    }

    #[test]
    fn segment_rejects_invalid_region_count() {
        let ctx = AnalyzerContext::default();
        let result = Pipeline::new(sharp_edge_png(16, 16), 0, &ctx)
            .decode()
            .unwrap()
            .frame()
            .estimate_depth()
            .segment();
        assert!(matches!(
            result,
            Err(PipelineError::InvalidRegionCount { requested: 0 }),
        ));
    }

    #[test]
    fn segmented_metrics_count_emitted_regions() {
        let ctx = AnalyzerContext::default();
        let segmented = Pipeline::new(sharp_edge_png(32, 32), 5, &ctx)
            .decode()
            .unwrap()
            .frame()
            .estimate_depth()
            .segment()
            .unwrap();
        let metrics = segmented.metrics();
        assert!(matches!(
            metrics,
            StageMetrics::Segmentation {
                requested_regions: 5,
                ..
            },
        ));
        if let StageMetrics::Segmentation { emitted_regions, .. } = metrics {
            assert_eq!(emitted_regions, segmented.regions().len());
            assert!(emitted_regions >= 1);
        }
    }

    #[test]
    fn rendered_payload_matches_original_dimensions() {
        let ctx = AnalyzerContext::default();
        let rendered = Pipeline::new(sharp_edge_png(40, 30), 3, &ctx)
            .decode()
            .unwrap()
            .frame()
            .estimate_depth()
            .segment()
            .unwrap()
            .render()
            .unwrap();
        assert_eq!(rendered.dimensions(), Dimensions { width: 40, height: 30 });

        let decoded = image::load_from_memory(rendered.depth_image()).unwrap();
        assert_eq!(decoded.width(), 40);
        assert_eq!(decoded.height(), 30);
    }

    #[test]
    fn chained_api_matches_analyze() {
        let png = sharp_edge_png(40, 40);
        let ctx = AnalyzerContext::default();

        let one_shot = crate::analyze(&png, 4, &ctx).unwrap();
        let chained = Pipeline::new(png, 4, &ctx)
            .decode()
            .unwrap()
            .frame()
            .estimate_depth()
            .segment()
            .unwrap()
            .render()
            .unwrap()
            .into_analysis();

        assert_eq!(one_shot.original, chained.original);
        assert_eq!(one_shot.depth_map, chained.depth_map);
        assert_eq!(one_shot.upscaled_depth, chained.upscaled_depth);
        assert_eq!(one_shot.regions, chained.regions);
        assert_eq!(one_shot.depth_image, chained.depth_image);
        assert_eq!(one_shot.dimensions, chained.dimensions);
    }

    #[test]
    fn complete_from_mid_stage() {
        let ctx = AnalyzerContext::default();
        let framed = Pipeline::new(sharp_edge_png(24, 24), 3, &ctx)
            .decode()
            .unwrap()
            .frame();
        let analysis = framed.complete().unwrap();
        assert!(!analysis.depth_image.is_empty());
        assert!(!analysis.regions.is_empty());
    }

    #[test]
    fn segmentation_runs_at_image_resolution() {
        // A downscaled frame must not leak processing coordinates into
        // the emitted regions.
        let ctx = AnalyzerContext::new(AnalyzerConfig {
            processing_resolution: 16,
            ..AnalyzerConfig::default()
        });
        let segmented = Pipeline::new(sharp_edge_png(48, 36), 3, &ctx)
            .decode()
            .unwrap()
            .frame()
            .estimate_depth()
            .segment()
            .unwrap();

        let dims = segmented.upscaled_depth().dimensions();
        assert_eq!(dims, Dimensions { width: 48, height: 36 });
        for region in segmented.regions() {
            let bb = &region.bounding_box;
            assert!(bb.x + bb.width <= 48);
            assert!(bb.y + bb.height <= 36);
            assert_eq!(region.mask.width, bb.width);
            assert_eq!(region.mask.height, bb.height);
        }
    }
}
