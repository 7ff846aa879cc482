//! Selective blur compositing.
//!
//! Blends a sharp RGBA buffer against a uniformly blurred rendition of
//! it, weighted per pixel by depth relative to the user's focus plane.
//! The function is pure and deterministic: identical inputs produce an
//! identical output buffer, so it can be re-invoked on every parameter
//! change without touching the depth estimator.
//!
//! Per-pixel weight, with `d` the sampled depth and `t` the threshold:
//!
//! ```text
//! depth_from_focus = |d - (1 - t)|
//! blur_amount      = clamp(depth_from_focus * focus_strength, 0, 1)
//! if d > t         { blur_amount = 0 }    // near pixels forced sharp
//! ```
//!
//! Each R/G/B channel is `round(original*(1-b) + blurred*b)`; the alpha
//! channel is always copied unchanged from the original.

use image::Rgba;

use crate::types::{BlurParams, DepthMap, Dimensions, PipelineError, RgbaImage};

/// Blend weight for one pixel.
fn blur_amount(depth: f32, params: &BlurParams) -> f32 {
    if depth > params.depth_threshold {
        return 0.0;
    }
    let depth_from_focus = (depth - (1.0 - params.depth_threshold)).abs();
    (depth_from_focus * params.focus_strength).clamp(0.0, 1.0)
}

/// Blend one 8-bit channel.
fn blend_channel(original: u8, blurred: u8, amount: f32) -> u8 {
    let value = f32::from(original).mul_add(1.0 - amount, f32::from(blurred) * amount);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let out = value.round().clamp(0.0, 255.0) as u8;
    out
}

/// Composite a depth-weighted blend of `original` and `blurred`.
///
/// `depth` must be the upscaled depth map at the buffers' resolution;
/// each pixel samples it directly. The blurred buffer comes from an
/// external blur primitive (see [`crate::blur`]) — the compositor
/// treats it as opaque input.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidBlurParams`] if `params` violate
/// their invariants, and [`PipelineError::DimensionMismatch`] if the
/// blurred buffer or depth map does not match `original`'s dimensions.
/// Both checks run before any output allocation.
pub fn composite(
    original: &RgbaImage,
    blurred: &RgbaImage,
    depth: &DepthMap,
    params: &BlurParams,
) -> Result<RgbaImage, PipelineError> {
    params.validate()?;

    let expected = Dimensions {
        width: original.width(),
        height: original.height(),
    };
    if blurred.dimensions() != (expected.width, expected.height) {
        return Err(PipelineError::DimensionMismatch {
            expected,
            actual: Dimensions {
                width: blurred.width(),
                height: blurred.height(),
            },
        });
    }
    if depth.dimensions() != expected {
        return Err(PipelineError::DimensionMismatch {
            expected,
            actual: depth.dimensions(),
        });
    }

    let mut output = RgbaImage::new(expected.width, expected.height);
    for y in 0..expected.height {
        for x in 0..expected.width {
            let amount = blur_amount(depth.get(x, y), params);
            let orig = original.get_pixel(x, y);
            let blur = blurred.get_pixel(x, y);
            output.put_pixel(
                x,
                y,
                Rgba([
                    blend_channel(orig[0], blur[0], amount),
                    blend_channel(orig[1], blur[1], amount),
                    blend_channel(orig[2], blur[2], amount),
                    orig[3],
                ]),
            );
        }
    }
    Ok(output)
}
