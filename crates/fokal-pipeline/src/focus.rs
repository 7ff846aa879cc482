//! Automatic focus plane selection.
//!
//! Picks a plausible subject depth without user input by looking at the
//! central half-crop of the depth map, where the subject usually sits.
//! Two estimates are averaged for stability: the median depth of the
//! crop and the modal depth of a 50-bin histogram over the same crop.
//!
//! The core never applies this on its own — callers (e.g. the CLI) use
//! it to default the compositor's `depth_threshold` when the user does
//! not supply one.

use crate::types::DepthMap;

/// Number of histogram bins used for the modal-depth estimate.
const HISTOGRAM_BINS: usize = 50;

/// Estimate the focus plane depth for a map's likely subject.
///
/// Returns a value in `[0, 1]`. For a uniform map the result equals
/// the uniform value.
#[must_use]
pub fn auto_focus_depth(map: &DepthMap) -> f32 {
    let width = map.width();
    let height = map.height();

    // Central half-crop; degenerates to the full extent below 4 pixels.
    let x0 = width / 4;
    let x1 = (3 * width / 4).max(x0 + 1).min(width);
    let y0 = height / 4;
    let y1 = (3 * height / 4).max(y0 + 1).min(height);

    let mut samples = Vec::with_capacity(((x1 - x0) * (y1 - y0)) as usize);
    for y in y0..y1 {
        for x in x0..x1 {
            samples.push(map.get(x, y));
        }
    }

    let median = median(&mut samples);
    let modal = histogram_mode(&samples);

    ((median + modal) / 2.0).clamp(0.0, 1.0)
}

/// Median of a non-empty sample set. Sorts in place.
fn median(samples: &mut [f32]) -> f32 {
    samples.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = samples.len() / 2;
    if samples.len() % 2 == 0 {
        (samples[mid - 1] + samples[mid]) / 2.0
    } else {
        samples[mid]
    }
}

/// Center of the most populated histogram bin.
fn histogram_mode(samples: &[f32]) -> f32 {
    let mut counts = [0_u32; HISTOGRAM_BINS];
    for &v in samples {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let bin = ((v * HISTOGRAM_BINS as f32).floor() as usize).min(HISTOGRAM_BINS - 1);
        counts[bin] += 1;
    }

    let best = counts
        .iter()
        .enumerate()
        .max_by_key(|&(_, count)| count)
        .map_or(0, |(bin, _)| bin);

    #[allow(clippy::cast_precision_loss)]
    let center = (best as f32 + 0.5) / HISTOGRAM_BINS as f32;
    center
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn uniform_map_returns_near_uniform_value() {
        let map = DepthMap::uniform(40, 40, 0.5);
        let focus = auto_focus_depth(&map);
        // Median is exactly 0.5; the histogram mode is its bin center
        // (0.51), so the average sits within a bin width of 0.5.
        assert!((focus - 0.5).abs() < 0.02, "got {focus}");
    }

    #[test]
    fn result_always_in_unit_range() {
        for v in [0.0, 0.33, 1.0] {
            let focus = auto_focus_depth(&DepthMap::uniform(10, 10, v));
            assert!((0.0..=1.0).contains(&focus));
        }
    }

    #[test]
    fn center_subject_dominates_border() {
        // Near subject (0.9) filling the center crop, far border (0.1).
        let data = (0..40)
            .flat_map(|y| {
                (0..40).map(move |x| {
                    if (10..30).contains(&x) && (10..30).contains(&y) {
                        0.9
                    } else {
                        0.1
                    }
                })
            })
            .collect();
        let map = DepthMap::from_raw(40, 40, data).unwrap();
        let focus = auto_focus_depth(&map);
        assert!(focus > 0.8, "expected subject depth, got {focus}");
    }

    #[test]
    fn bimodal_crop_follows_majority() {
        // Center crop is 60% at 0.8, 40% at 0.2: both the median and
        // mode land on the majority depth.
        let data = (0..20)
            .flat_map(|y| (0..20).map(move |_x| if y < 12 { 0.8 } else { 0.2 }))
            .collect();
        let map = DepthMap::from_raw(20, 20, data).unwrap();
        let focus = auto_focus_depth(&map);
        assert!(focus > 0.7, "expected majority depth, got {focus}");
    }

    #[test]
    fn tiny_map_does_not_panic() {
        let focus = auto_focus_depth(&DepthMap::uniform(1, 1, 0.7));
        assert!((0.0..=1.0).contains(&focus));
    }

    #[test]
    fn median_of_even_set_averages_middle_pair() {
        let mut samples = vec![0.4, 0.1, 0.3, 0.2];
        assert!((median(&mut samples) - 0.25).abs() < 1e-6);
    }

    #[test]
    fn histogram_mode_finds_dominant_bin() {
        let samples = vec![0.11, 0.12, 0.115, 0.9];
        let mode = histogram_mode(&samples);
        assert!((mode - 0.11).abs() < 0.02, "got {mode}");
    }
}
