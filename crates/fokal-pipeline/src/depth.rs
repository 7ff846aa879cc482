//! Depth-proxy estimation from luminance gradients.
//!
//! Not a trained depth model: the estimator derives a heuristic depth
//! stand-in from local edge strength. Sobel kernels produce horizontal
//! and vertical gradient responses, combined into a per-pixel magnitude
//! and normalized by the observed maximum. A block-averaging pass then
//! suppresses high-frequency noise.
//!
//! Convention, applied uniformly across the pipeline: **higher gradient
//! magnitude maps to a larger depth value**, and larger depth values are
//! treated as nearer. In-focus, high-detail subjects produce strong
//! gradients, so the subject lands near 1.0 and the compositor's
//! above-threshold-is-sharp rule keeps it crisp.
//!
//! Degenerate inputs (flat images with a zero gradient maximum, or any
//! non-finite intermediate) are absorbed here: the estimator falls back
//! to a uniform mid-value map and never returns an error or a NaN.

use imageproc::gradients;

use crate::preprocess::ProcessingFrame;
use crate::types::{AnalyzerContext, DepthMap};

/// Gradient maxima at or below this floor are treated as zero, and the
/// map falls back to [`DepthMap::UNIFORM_FALLBACK`] everywhere.
pub const MAGNITUDE_EPSILON: f32 = 1e-6;

/// Observations made while estimating, surfaced for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EstimateStats {
    /// Maximum gradient magnitude before normalization.
    pub max_gradient: f32,
    /// Whether the uniform fallback replaced the gradient map.
    pub degenerate_fallback: bool,
}

/// Estimate a normalized depth-proxy map from a processing frame.
///
/// Infallible by design: every failure mode of the computation
/// (flat input, non-finite maximum) degrades to the uniform fallback
/// map at the frame's resolution.
#[must_use]
pub fn estimate(frame: &ProcessingFrame, ctx: &AnalyzerContext) -> DepthMap {
    estimate_with_stats(frame, ctx).0
}

/// [`estimate`], also returning the observations diagnostics report.
#[must_use]
pub fn estimate_with_stats(
    frame: &ProcessingFrame,
    ctx: &AnalyzerContext,
) -> (DepthMap, EstimateStats) {
    let luma = frame.luma();
    let (width, height) = luma.dimensions();
    if width == 0 || height == 0 {
        return (
            DepthMap::uniform(1, 1, DepthMap::UNIFORM_FALLBACK),
            EstimateStats {
                max_gradient: 0.0,
                degenerate_fallback: true,
            },
        );
    }

    let gx = gradients::horizontal_sobel(luma);
    let gy = gradients::vertical_sobel(luma);

    let mut magnitude = Vec::with_capacity((width as usize) * (height as usize));
    let mut max_magnitude = 0.0_f32;
    for y in 0..height {
        for x in 0..width {
            let h = f32::from(gx.get_pixel(x, y).0[0]);
            let v = f32::from(gy.get_pixel(x, y).0[0]);
            let m = h.hypot(v);
            if m > max_magnitude {
                max_magnitude = m;
            }
            magnitude.push(m);
        }
    }

    if !max_magnitude.is_finite() || max_magnitude <= MAGNITUDE_EPSILON {
        return (
            DepthMap::uniform(width, height, DepthMap::UNIFORM_FALLBACK),
            EstimateStats {
                max_gradient: max_magnitude,
                degenerate_fallback: true,
            },
        );
    }

    let inv_max = 1.0 / max_magnitude;
    for m in &mut magnitude {
        *m *= inv_max;
    }

    block_average(&mut magnitude, width, height, ctx.config().smoothing_block);

    let map = DepthMap::from_raw(width, height, magnitude)
        .unwrap_or_else(|| DepthMap::uniform(width, height, DepthMap::UNIFORM_FALLBACK));
    (
        map,
        EstimateStats {
            max_gradient: max_magnitude,
            degenerate_fallback: false,
        },
    )
}

/// Replace each non-overlapping `block x block` tile with its mean,
/// re-expanded over the tile. Partial tiles at the right/bottom edges
/// average over their actual extent.
fn block_average(values: &mut [f32], width: u32, height: u32, block: u32) {
    if block <= 1 {
        return;
    }
    let w = width as usize;
    let h = height as usize;
    let b = block as usize;

    for by in (0..h).step_by(b) {
        let y_end = (by + b).min(h);
        for bx in (0..w).step_by(b) {
            let x_end = (bx + b).min(w);

            let mut sum = 0.0_f32;
            for y in by..y_end {
                for x in bx..x_end {
                    sum += values[y * w + x];
                }
            }
            #[allow(clippy::cast_precision_loss)]
            let mean = sum / ((y_end - by) * (x_end - bx)) as f32;

            for y in by..y_end {
                for x in bx..x_end {
                    values[y * w + x] = mean;
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::preprocess;
    use crate::types::{AnalyzerConfig, GrayImage};

    fn frame_from_gray(gray: GrayImage) -> ProcessingFrame {
        let dynamic = image::DynamicImage::ImageLuma8(gray);
        preprocess::to_processing_frame(&dynamic, &AnalyzerContext::default())
    }

    /// Left half dark, right half bright — one strong vertical edge.
    fn sharp_edge_frame(w: u32, h: u32) -> ProcessingFrame {
        frame_from_gray(GrayImage::from_fn(w, h, |x, _| {
            if x < w / 2 {
                image::Luma([0])
            } else {
                image::Luma([255])
            }
        }))
    }

    #[test]
    fn all_values_in_unit_range() {
        let map = estimate(&sharp_edge_frame(32, 32), &AnalyzerContext::default());
        for &v in map.values() {
            assert!(v.is_finite());
            assert!((0.0..=1.0).contains(&v), "out of range: {v}");
        }
    }

    #[test]
    fn flat_image_yields_uniform_mid_map() {
        let frame = frame_from_gray(GrayImage::from_pixel(16, 16, image::Luma([128])));
        let map = estimate(&frame, &AnalyzerContext::default());
        for &v in map.values() {
            assert!(
                (v - DepthMap::UNIFORM_FALLBACK).abs() < f32::EPSILON,
                "expected uniform fallback, got {v}",
            );
        }
    }

    #[test]
    fn black_image_yields_uniform_mid_map() {
        let frame = frame_from_gray(GrayImage::from_pixel(8, 8, image::Luma([0])));
        let map = estimate(&frame, &AnalyzerContext::default());
        assert!(map
            .values()
            .iter()
            .all(|&v| (v - DepthMap::UNIFORM_FALLBACK).abs() < f32::EPSILON));
    }

    #[test]
    fn edge_region_is_deeper_than_flat_region() {
        let ctx = AnalyzerContext::default();
        let map = estimate(&sharp_edge_frame(32, 32), &ctx);
        // The boundary column sits mid-image; far corners are flat.
        let near_edge = map.get(16, 16);
        let far_corner = map.get(1, 1);
        assert!(
            near_edge > far_corner,
            "edge {near_edge} should exceed flat {far_corner}",
        );
    }

    #[test]
    fn maximum_normalizes_to_one_before_smoothing() {
        // With smoothing disabled the peak magnitude must hit exactly 1.
        let ctx = AnalyzerContext::new(AnalyzerConfig {
            smoothing_block: 1,
            ..AnalyzerConfig::default()
        });
        let map = estimate(&sharp_edge_frame(32, 32), &ctx);
        let max = map.values().iter().copied().fold(0.0_f32, f32::max);
        assert!((max - 1.0).abs() < 1e-6, "expected max 1.0, got {max}");
    }

    #[test]
    fn smoothing_makes_blocks_constant() {
        let ctx = AnalyzerContext::default();
        let map = estimate(&sharp_edge_frame(32, 32), &ctx);
        let block = AnalyzerConfig::DEFAULT_SMOOTHING_BLOCK;
        // Every pixel within one block shares the block mean.
        for by in (0..32).step_by(block as usize) {
            for bx in (0..32).step_by(block as usize) {
                let anchor = map.get(bx, by);
                for dy in 0..block {
                    for dx in 0..block {
                        assert!(
                            (map.get(bx + dx, by + dy) - anchor).abs() < 1e-6,
                            "block at ({bx},{by}) not constant",
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn estimate_is_deterministic() {
        let ctx = AnalyzerContext::default();
        let a = estimate(&sharp_edge_frame(24, 24), &ctx);
        let b = estimate(&sharp_edge_frame(24, 24), &ctx);
        assert_eq!(a, b);
    }

    #[test]
    fn stats_flag_degenerate_fallback() {
        let ctx = AnalyzerContext::default();

        let flat = frame_from_gray(GrayImage::from_pixel(8, 8, image::Luma([200])));
        let (_, stats) = estimate_with_stats(&flat, &ctx);
        assert!(stats.degenerate_fallback);

        let (_, stats) = estimate_with_stats(&sharp_edge_frame(16, 16), &ctx);
        assert!(!stats.degenerate_fallback);
        assert!(stats.max_gradient > 0.0);
    }

    #[test]
    fn block_average_partial_edge_tiles() {
        // 5 wide with block 4: the last column forms its own partial tile.
        let mut values = vec![0.0, 0.0, 0.0, 0.0, 1.0];
        block_average(&mut values, 5, 1, 4);
        assert!((values[0]).abs() < 1e-6);
        assert!((values[4] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn block_one_is_identity() {
        let mut values = vec![0.1, 0.9, 0.4, 0.6];
        let expected = values.clone();
        block_average(&mut values, 2, 2, 1);
        assert_eq!(values, expected);
    }
}
