//! Depth-bucket segmentation into selectable focus regions.
//!
//! Partitions the unit depth interval into `num_regions` equal-width
//! buckets and emits one [`FocusRegion`] per non-empty bucket: mean
//! member depth, member-pixel fraction (confidence), a bounding box
//! clipped to the image, and a binary mask local to that box.
//!
//! Buckets partition all pixels, so the emitted confidences always sum
//! to 1.0 (within floating tolerance). Empty buckets are omitted
//! entirely rather than emitted as zero-area placeholders, so the
//! returned count can be less than `num_regions`. Output order is
//! ascending bucket index — ascending mean depth — and is identical
//! for identical inputs.

use crate::types::{
    AnalyzerConfig, BoundingBox, DepthMap, FocusRegion, PipelineError, RegionMask,
};

/// Per-bucket accumulator while sweeping the depth map.
struct BucketAccumulator {
    count: u64,
    depth_sum: f64,
    min_x: u32,
    min_y: u32,
    max_x: u32,
    max_y: u32,
}

impl BucketAccumulator {
    const fn new() -> Self {
        Self {
            count: 0,
            depth_sum: 0.0,
            min_x: u32::MAX,
            min_y: u32::MAX,
            max_x: 0,
            max_y: 0,
        }
    }

    fn record(&mut self, x: u32, y: u32, depth: f32) {
        self.count += 1;
        self.depth_sum += f64::from(depth);
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }
}

/// Bucket index for a depth value: equal-width partition of `[0, 1]`
/// with the closing edge folded into the last bucket.
fn bucket_index(depth: f32, num_regions: u32) -> u32 {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let idx = (depth * num_regions as f32).floor() as u32;
    idx.min(num_regions - 1)
}

/// Check a requested region count against the supported range.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidRegionCount`] if `num_regions` lies
/// outside `[1, 20]`.
pub const fn validate_region_count(num_regions: u32) -> Result<(), PipelineError> {
    if num_regions < AnalyzerConfig::MIN_REGIONS || num_regions > AnalyzerConfig::MAX_REGIONS {
        return Err(PipelineError::InvalidRegionCount {
            requested: num_regions,
        });
    }
    Ok(())
}

/// Segment a depth map into at most `num_regions` focus regions.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidRegionCount`] if `num_regions` lies
/// outside `[1, 20]`. Validation happens before any allocation.
pub fn segment(map: &DepthMap, num_regions: u32) -> Result<Vec<FocusRegion>, PipelineError> {
    validate_region_count(num_regions)?;

    let width = map.width();
    let height = map.height();
    let total_pixels = map.dimensions().pixel_count();

    let mut buckets: Vec<BucketAccumulator> = (0..num_regions)
        .map(|_| BucketAccumulator::new())
        .collect();
    for y in 0..height {
        for x in 0..width {
            let depth = map.get(x, y);
            buckets[bucket_index(depth, num_regions) as usize].record(x, y, depth);
        }
    }

    let mut regions = Vec::new();
    for (bucket, acc) in buckets.iter().enumerate() {
        if acc.count == 0 {
            continue;
        }

        let bounding_box = BoundingBox {
            x: acc.min_x,
            y: acc.min_y,
            width: acc.max_x - acc.min_x + 1,
            height: acc.max_y - acc.min_y + 1,
        };
        #[allow(clippy::cast_possible_truncation)]
        let mask = build_mask(map, bounding_box, bucket as u32, num_regions);

        #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
        let region = FocusRegion {
            id: regions.len() as u32,
            depth: (acc.depth_sum / acc.count as f64) as f32,
            confidence: (acc.count as f64 / total_pixels as f64) as f32,
            bounding_box,
            mask,
        };
        regions.push(region);
    }

    Ok(regions)
}

/// Second pass over one bounding box, marking the pixels whose depth
/// falls in the region's bucket. The mask is local to the box, so its
/// memory is bounded by the region extent rather than the image.
fn build_mask(map: &DepthMap, bbox: BoundingBox, bucket: u32, num_regions: u32) -> RegionMask {
    let mut data = vec![0_u8; (bbox.width as usize) * (bbox.height as usize)];
    for local_y in 0..bbox.height {
        for local_x in 0..bbox.width {
            let depth = map.get(bbox.x + local_x, bbox.y + local_y);
            if bucket_index(depth, num_regions) == bucket {
                data[(local_y * bbox.width + local_x) as usize] = 1;
            }
        }
    }
    RegionMask {
        width: bbox.width,
        height: bbox.height,
        data,
    }
}
