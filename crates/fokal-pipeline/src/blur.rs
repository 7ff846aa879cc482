//! Uniform Gaussian blur — the default external blur primitive.
//!
//! The compositor itself never blurs anything: it blends a sharp buffer
//! against a caller-supplied uniformly blurred one. This module is the
//! bundled collaborator producing that buffer. Any deterministic blur
//! of matching dimensions works in its place.
//!
//! `imageproc::filter::gaussian_blur_f32` only accepts single-channel
//! images, so the RGBA input is split into four channels, blurred
//! independently, and reassembled — Gaussian blur is a linear,
//! per-channel operation, so this matches blurring in color space.

use image::GrayImage;

use crate::types::RgbaImage;

/// Map a user-facing blur radius to a Gaussian sigma.
///
/// `sigma = radius / 3` puts roughly the whole kernel mass inside the
/// radius (three standard deviations).
#[must_use]
pub fn radius_to_sigma(radius: u32) -> f32 {
    #[allow(clippy::cast_precision_loss)]
    let r = radius as f32;
    r / 3.0
}

/// Uniformly blur an RGBA buffer with the given radius.
///
/// Deterministic for fixed input and radius. A radius of zero returns
/// the input unchanged.
#[must_use = "returns the blurred buffer"]
pub fn gaussian_blur_rgba(image: &RgbaImage, radius: u32) -> RgbaImage {
    if radius == 0 {
        return image.clone();
    }
    let sigma = radius_to_sigma(radius);

    let (w, h) = (image.width(), image.height());

    let channels: [GrayImage; 4] = std::array::from_fn(|c| {
        GrayImage::from_fn(w, h, |x, y| image::Luma([image.get_pixel(x, y).0[c]]))
    });

    let blurred: [GrayImage; 4] =
        std::array::from_fn(|c| imageproc::filter::gaussian_blur_f32(&channels[c], sigma));

    RgbaImage::from_fn(w, h, |x, y| {
        image::Rgba([
            blurred[0].get_pixel(x, y).0[0],
            blurred[1].get_pixel(x, y).0[0],
            blurred[2].get_pixel(x, y).0[0],
            blurred[3].get_pixel(x, y).0[0],
        ])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Left half red, right half blue — sharp color boundary at x=5.
    fn two_tone_image() -> RgbaImage {
        RgbaImage::from_fn(10, 10, |x, _y| {
            if x < 5 {
                image::Rgba([255, 0, 0, 255])
            } else {
                image::Rgba([0, 0, 255, 255])
            }
        })
    }

    #[test]
    fn zero_radius_returns_identical_image() {
        let img = two_tone_image();
        assert_eq!(gaussian_blur_rgba(&img, 0), img);
    }

    #[test]
    fn output_dimensions_preserved() {
        let img = RgbaImage::new(17, 31);
        let blurred = gaussian_blur_rgba(&img, 5);
        assert_eq!(blurred.width(), 17);
        assert_eq!(blurred.height(), 31);
    }

    #[test]
    fn blur_softens_color_boundary() {
        let blurred = gaussian_blur_rgba(&two_tone_image(), 6);
        // Red channel should be intermediate on both sides of the edge.
        assert!(blurred.get_pixel(4, 5).0[0] < 255);
        assert!(blurred.get_pixel(5, 5).0[0] > 0);
    }

    #[test]
    fn uniform_image_stays_uniform() {
        let img = RgbaImage::from_pixel(10, 10, image::Rgba([100, 150, 200, 250]));
        let blurred = gaussian_blur_rgba(&img, 5);
        for pixel in blurred.pixels() {
            for (c, &expected) in [100_u8, 150, 200, 250].iter().enumerate() {
                let diff = i16::from(pixel.0[c]) - i16::from(expected);
                assert!(diff.abs() <= 1, "channel {c} drifted to {}", pixel.0[c]);
            }
        }
    }

    #[test]
    fn blur_is_deterministic() {
        let img = two_tone_image();
        assert_eq!(gaussian_blur_rgba(&img, 7), gaussian_blur_rgba(&img, 7));
    }

    #[test]
    fn radius_to_sigma_scales_linearly() {
        assert!((radius_to_sigma(3) - 1.0).abs() < f32::EPSILON);
        assert!((radius_to_sigma(15) - 5.0).abs() < f32::EPSILON);
    }
}
