//! Grayscale visualization of the depth map.
//!
//! Purely a display/debugging aid: the depth map is upscaled to the
//! requested resolution with the same bilinear interpolation used for
//! compositor sampling, mapped to 8-bit grayscale, and encoded as JPEG.
//! Nothing downstream reads the rendered payload back.

use crate::types::{DepthMap, GrayImage, PipelineError};

/// Upscale a depth map and render it as an 8-bit grayscale image.
///
/// Each depth value `v` maps to intensity `round(v * 255)`.
#[must_use]
pub fn to_gray_image(map: &DepthMap, width: u32, height: u32) -> GrayImage {
    let scaled = map.resize(width, height);
    GrayImage::from_fn(scaled.width(), scaled.height(), |x, y| {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let intensity = (scaled.get(x, y) * 255.0).round().clamp(0.0, 255.0) as u8;
        image::Luma([intensity])
    })
}

/// Render a depth map as a JPEG payload at the given resolution.
///
/// # Errors
///
/// Returns [`PipelineError::Encode`] if JPEG encoding fails.
pub fn render_depth_jpeg(
    map: &DepthMap,
    width: u32,
    height: u32,
) -> Result<Vec<u8>, PipelineError> {
    let gray = to_gray_image(map, width, height);

    let mut payload = Vec::new();
    let encoder = image::codecs::jpeg::JpegEncoder::new(&mut payload);
    image::ImageEncoder::write_image(
        encoder,
        gray.as_raw(),
        gray.width(),
        gray.height(),
        image::ExtendedColorType::L8,
    )
    .map_err(|e| PipelineError::Encode(e.to_string()))?;

    Ok(payload)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn gray_image_matches_target_resolution() {
        let map = DepthMap::uniform(8, 8, 0.5);
        let gray = to_gray_image(&map, 32, 24);
        assert_eq!(gray.width(), 32);
        assert_eq!(gray.height(), 24);
    }

    #[test]
    fn uniform_map_renders_uniform_intensity() {
        let map = DepthMap::uniform(8, 8, 0.5);
        let gray = to_gray_image(&map, 16, 16);
        for pixel in gray.pixels() {
            assert_eq!(pixel.0[0], 128); // round(0.5 * 255)
        }
    }

    #[test]
    fn extremes_map_to_black_and_white() {
        let map = DepthMap::from_raw(2, 1, vec![0.0, 1.0]).unwrap();
        let gray = to_gray_image(&map, 2, 1);
        assert_eq!(gray.get_pixel(0, 0).0[0], 0);
        assert_eq!(gray.get_pixel(1, 0).0[0], 255);
    }

    #[test]
    fn jpeg_payload_is_nonempty_and_decodable() {
        let map = DepthMap::uniform(8, 8, 0.25);
        let payload = render_depth_jpeg(&map, 64, 48).unwrap();
        assert!(!payload.is_empty());

        let decoded = image::load_from_memory(&payload).unwrap();
        assert_eq!(decoded.width(), 64);
        assert_eq!(decoded.height(), 48);
    }

    #[test]
    fn rendering_is_deterministic() {
        let map = DepthMap::from_raw(2, 2, vec![0.1, 0.4, 0.6, 0.9]).unwrap();
        let a = render_depth_jpeg(&map, 20, 20).unwrap();
        let b = render_depth_jpeg(&map, 20, 20).unwrap();
        assert_eq!(a, b);
    }
}
