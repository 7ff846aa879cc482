//! Image decoding and reduction to the processing frame.
//!
//! The preprocessor is the entry to every analysis: raw bytes are
//! decoded, checked against the configured size bound, downscaled so
//! the long axis fits the processing resolution, and reduced to a
//! single luminance channel. All expensive downstream stages (gradient
//! pass, smoothing, segmentation) operate on this much smaller grid,
//! bounding per-request cost independent of the input resolution.

use image::DynamicImage;

use crate::types::{AnalyzerContext, Dimensions, GrayImage, PipelineError};

/// Luminance frame at the bounded processing resolution, plus the
/// original dimensions needed to scale results back up.
#[derive(Debug, Clone)]
pub struct ProcessingFrame {
    luma: GrayImage,
    original: Dimensions,
}

impl ProcessingFrame {
    /// The luminance channel at processing resolution.
    #[must_use]
    pub const fn luma(&self) -> &GrayImage {
        &self.luma
    }

    /// Processing-resolution dimensions.
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.luma.width(),
            height: self.luma.height(),
        }
    }

    /// Dimensions of the image the frame was derived from.
    #[must_use]
    pub const fn original_dimensions(&self) -> Dimensions {
        self.original
    }
}

/// Decode raw image bytes and enforce the resource bound.
///
/// Supports PNG, JPEG, BMP, and WebP (whatever the `image` crate can
/// decode). The size check runs immediately after decode, before any
/// further buffer is allocated.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `bytes` is empty,
/// [`PipelineError::ImageDecode`] if the data is unrecognized or
/// corrupt, and [`PipelineError::ImageTooLarge`] if the decoded long
/// axis exceeds `ctx.config().max_input_dimension`.
pub fn decode(bytes: &[u8], ctx: &AnalyzerContext) -> Result<DynamicImage, PipelineError> {
    if bytes.is_empty() {
        return Err(PipelineError::EmptyInput);
    }

    let img = image::load_from_memory(bytes)?;
    let dims = Dimensions {
        width: img.width(),
        height: img.height(),
    };
    let max = ctx.config().max_input_dimension;
    if dims.long_axis() > max {
        return Err(PipelineError::ImageTooLarge {
            width: dims.width,
            height: dims.height,
            max,
        });
    }
    Ok(img)
}

/// Reduce a decoded image to its processing frame.
///
/// Downscales with bilinear (Triangle) filtering so the long axis is at
/// most `ctx.config().processing_resolution`, preserving aspect ratio,
/// then extracts luminance with the standard weighting
/// (`0.299*R + 0.587*G + 0.114*B`). Images already at or below the cap
/// are converted without resampling.
#[must_use]
pub fn to_processing_frame(image: &DynamicImage, ctx: &AnalyzerContext) -> ProcessingFrame {
    let original = Dimensions {
        width: image.width(),
        height: image.height(),
    };
    let cap = ctx.config().processing_resolution.max(1);

    let luma = if original.long_axis() > cap {
        image
            .resize(cap, cap, image::imageops::FilterType::Triangle)
            .to_luma8()
    } else {
        image.to_luma8()
    };

    ProcessingFrame { luma, original }
}
