//! Shared types for the fokal analysis pipeline.

use serde::{Deserialize, Serialize};

/// Re-export `GrayImage` so downstream crates can reference luminance
/// frames without depending on `image` directly.
pub use image::GrayImage;

/// Re-export `RgbaImage` so downstream crates can reference pixel
/// buffers without depending on `image` directly.
pub use image::RgbaImage;

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Total pixel count (`width * height`).
    #[must_use]
    pub const fn pixel_count(self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// The longer of the two axes.
    #[must_use]
    pub const fn long_axis(self) -> u32 {
        if self.width >= self.height {
            self.width
        } else {
            self.height
        }
    }
}

/// Normalized depth-proxy map at a fixed resolution.
///
/// Values are finite and lie in `[0, 1]`, row-major. Larger values mean
/// *nearer* under the pipeline's convention (strong local gradients map
/// to large depth values, and the compositor keeps large-depth pixels
/// sharp). Constructors scrub non-finite input so the invariant holds
/// for every map that can exist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepthMap {
    width: u32,
    height: u32,
    data: Vec<f32>,
}

impl DepthMap {
    /// Depth assigned everywhere when the input is degenerate (flat
    /// image, zero gradient maximum).
    pub const UNIFORM_FALLBACK: f32 = 0.5;

    /// Build a map from row-major values, clamping to `[0, 1]` and
    /// replacing non-finite entries with [`Self::UNIFORM_FALLBACK`].
    ///
    /// Returns `None` if `data.len() != width * height` or either
    /// dimension is zero.
    #[must_use]
    pub fn from_raw(width: u32, height: u32, mut data: Vec<f32>) -> Option<Self> {
        if width == 0 || height == 0 || data.len() != (width as usize) * (height as usize) {
            return None;
        }
        for v in &mut data {
            *v = if v.is_finite() {
                v.clamp(0.0, 1.0)
            } else {
                Self::UNIFORM_FALLBACK
            };
        }
        Some(Self {
            width,
            height,
            data,
        })
    }

    /// A map holding the same value everywhere.
    ///
    /// Non-finite values fall back to [`Self::UNIFORM_FALLBACK`].
    #[must_use]
    pub fn uniform(width: u32, height: u32, value: f32) -> Self {
        let v = if value.is_finite() {
            value.clamp(0.0, 1.0)
        } else {
            Self::UNIFORM_FALLBACK
        };
        Self {
            width: width.max(1),
            height: height.max(1),
            data: vec![v; (width.max(1) as usize) * (height.max(1) as usize)],
        }
    }

    /// Map width in pixels.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Map height in pixels.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Map dimensions.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.width,
            height: self.height,
        }
    }

    /// Depth value at `(x, y)`. Coordinates are clamped to the map, so
    /// out-of-range lookups return the nearest edge value.
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> f32 {
        let x = x.min(self.width - 1) as usize;
        let y = y.min(self.height - 1) as usize;
        self.data[y * self.width as usize + x]
    }

    /// All values, row-major.
    #[must_use]
    pub fn values(&self) -> &[f32] {
        &self.data
    }

    /// Bilinearly interpolated depth at fractional coordinates.
    ///
    /// Coordinates are clamped to the map extent, so any finite input
    /// yields a value that preserves the `[0, 1]` invariant.
    #[must_use]
    pub fn sample_bilinear(&self, fx: f32, fy: f32) -> f32 {
        let max_x = (self.width - 1) as f32;
        let max_y = (self.height - 1) as f32;
        let fx = if fx.is_finite() { fx.clamp(0.0, max_x) } else { 0.0 };
        let fy = if fy.is_finite() { fy.clamp(0.0, max_y) } else { 0.0 };

        let x0 = fx.floor();
        let y0 = fy.floor();
        let tx = fx - x0;
        let ty = fy - y0;

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let (x0, y0) = (x0 as u32, y0 as u32);
        let x1 = (x0 + 1).min(self.width - 1);
        let y1 = (y0 + 1).min(self.height - 1);

        let top = self.get(x0, y0).mul_add(1.0 - tx, self.get(x1, y0) * tx);
        let bottom = self.get(x0, y1).mul_add(1.0 - tx, self.get(x1, y1) * tx);
        top.mul_add(1.0 - ty, bottom * ty)
    }

    /// Resize to `width x height` by bilinear interpolation.
    ///
    /// This is the depth upscaler: the estimator produces maps at the
    /// bounded processing resolution, and compositing/visualization
    /// need them at the original image resolution. Dimensions of zero
    /// are clamped to one.
    #[must_use]
    pub fn resize(&self, width: u32, height: u32) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        if width == self.width && height == self.height {
            return self.clone();
        }

        // Map each target pixel center back into source coordinates.
        let sx = f64::from(self.width) / f64::from(width);
        let sy = f64::from(self.height) / f64::from(height);

        let mut data = Vec::with_capacity((width as usize) * (height as usize));
        for y in 0..height {
            #[allow(clippy::cast_possible_truncation)]
            let fy = ((f64::from(y) + 0.5) * sy - 0.5).max(0.0) as f32;
            for x in 0..width {
                #[allow(clippy::cast_possible_truncation)]
                let fx = ((f64::from(x) + 0.5) * sx - 0.5).max(0.0) as f32;
                data.push(self.sample_bilinear(fx, fy));
            }
        }
        Self {
            width,
            height,
            data,
        }
    }
}

/// Axis-aligned bounding box in image coordinates, clipped to the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Left edge (inclusive).
    pub x: u32,
    /// Top edge (inclusive).
    pub y: u32,
    /// Width in pixels (at least 1 for a non-empty region).
    pub width: u32,
    /// Height in pixels (at least 1 for a non-empty region).
    pub height: u32,
}

/// Binary membership mask local to a region's bounding box.
///
/// Storing masks in bounding-box-local coordinates (rather than over
/// the full image) bounds memory to the region extent. Entries are 0
/// or 1, row-major.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionMask {
    /// Mask width — equals the bounding box width.
    pub width: u32,
    /// Mask height — equals the bounding box height.
    pub height: u32,
    /// Row-major 0/1 membership indicators.
    pub data: Vec<u8>,
}

impl RegionMask {
    /// Whether the mask marks `(x, y)` (bounding-box-local) as a member.
    #[must_use]
    pub fn contains(&self, x: u32, y: u32) -> bool {
        x < self.width
            && y < self.height
            && self.data[(y * self.width + x) as usize] != 0
    }
}

/// One depth-bucketed focus region, exposed for UI selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FocusRegion {
    /// Stable identifier, ascending by mean depth, contiguous from 0
    /// over the emitted regions.
    pub id: u32,
    /// Mean depth of the member pixels.
    pub depth: f32,
    /// Member-pixel fraction of the total pixel count. Confidences
    /// across one segmentation sum to 1.0.
    pub confidence: f32,
    /// Axis-aligned bounding box over the member pixels.
    pub bounding_box: BoundingBox,
    /// Binary membership mask local to `bounding_box`.
    pub mask: RegionMask,
}

/// User-facing compositing parameters, supplied per call and never
/// persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlurParams {
    /// Scales the distance-from-focus into a blend weight. Must be
    /// positive.
    pub focus_strength: f32,
    /// Radius handed to the external blur primitive. The compositor
    /// treats it as opaque; it only needs to be at least 1.
    pub blur_radius: u32,
    /// Focus plane position in `[0, 1]`. Pixels with depth above the
    /// threshold are forced sharp.
    pub depth_threshold: f32,
}

impl BlurParams {
    /// Check the parameter invariants.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidBlurParams`] if `focus_strength`
    /// is not a positive finite number, `blur_radius` is zero, or
    /// `depth_threshold` is outside `[0, 1]`.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if !(self.focus_strength.is_finite() && self.focus_strength > 0.0) {
            return Err(PipelineError::InvalidBlurParams(format!(
                "focus_strength must be positive and finite, got {}",
                self.focus_strength,
            )));
        }
        if self.blur_radius == 0 {
            return Err(PipelineError::InvalidBlurParams(
                "blur_radius must be at least 1".into(),
            ));
        }
        if !(self.depth_threshold.is_finite()
            && (0.0..=1.0).contains(&self.depth_threshold))
        {
            return Err(PipelineError::InvalidBlurParams(format!(
                "depth_threshold must lie in [0, 1], got {}",
                self.depth_threshold,
            )));
        }
        Ok(())
    }
}

impl Default for BlurParams {
    fn default() -> Self {
        Self {
            focus_strength: 1.0,
            blur_radius: 15,
            depth_threshold: 0.5,
        }
    }
}

/// Configuration for the analysis pipeline.
///
/// Built once into an [`AnalyzerContext`] at process startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// Cap on the long axis of the processing frame. Depth estimation
    /// cost is bounded by this regardless of input resolution.
    pub processing_resolution: u32,

    /// Side length of the non-overlapping block-average smoothing pass
    /// applied to the raw gradient map.
    pub smoothing_block: u32,

    /// Inputs whose long axis exceeds this are rejected before
    /// preprocessing begins (resource bound).
    pub max_input_dimension: u32,
}

impl AnalyzerConfig {
    /// Default processing-resolution cap (long side).
    pub const DEFAULT_PROCESSING_RESOLUTION: u32 = 512;
    /// Default smoothing block side length.
    pub const DEFAULT_SMOOTHING_BLOCK: u32 = 4;
    /// Default maximum accepted input dimension.
    pub const DEFAULT_MAX_INPUT_DIMENSION: u32 = 8192;

    /// Lower bound on `num_regions` accepted by the segmenter.
    pub const MIN_REGIONS: u32 = 1;
    /// Upper bound on `num_regions` accepted by the segmenter.
    pub const MAX_REGIONS: u32 = 20;
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            processing_resolution: Self::DEFAULT_PROCESSING_RESOLUTION,
            smoothing_block: Self::DEFAULT_SMOOTHING_BLOCK,
            max_input_dimension: Self::DEFAULT_MAX_INPUT_DIMENSION,
        }
    }
}

/// Process-wide analysis context: built once at startup, read-only
/// thereafter, passed by reference into every pipeline entry point.
///
/// Requests share nothing else, so no teardown or per-request
/// re-initialization is needed.
#[derive(Debug, Clone)]
pub struct AnalyzerContext {
    config: AnalyzerConfig,
}

impl AnalyzerContext {
    /// Build a context from a configuration.
    #[must_use]
    pub const fn new(config: AnalyzerConfig) -> Self {
        Self { config }
    }

    /// The configuration this context was built from.
    #[must_use]
    pub const fn config(&self) -> &AnalyzerConfig {
        &self.config
    }
}

impl Default for AnalyzerContext {
    fn default() -> Self {
        Self::new(AnalyzerConfig::default())
    }
}

/// Errors that can occur during analysis or compositing.
///
/// Numeric degeneracy (flat images, zero gradient maxima) is *not*
/// represented here: the depth estimator absorbs it via the uniform
/// fallback and never surfaces it to callers.
///
/// Uses custom `Serialize`/`Deserialize` because `image::ImageError`
/// does not implement serde traits. The `ImageDecode` variant is
/// serialized as its `Display` string.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Failed to decode the input image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// The requested region count is outside the accepted range.
    #[error(
        "num_regions must lie in [{min}, {max}], got {requested}",
        min = AnalyzerConfig::MIN_REGIONS,
        max = AnalyzerConfig::MAX_REGIONS,
    )]
    InvalidRegionCount {
        /// The rejected value.
        requested: u32,
    },

    /// Compositing parameters violate their invariants.
    #[error("invalid blur parameters: {0}")]
    InvalidBlurParams(String),

    /// Buffers handed to the compositor do not share dimensions.
    #[error("dimension mismatch: expected {expected:?}, got {actual:?}")]
    DimensionMismatch {
        /// Dimensions of the reference buffer.
        expected: Dimensions,
        /// Dimensions of the offending buffer.
        actual: Dimensions,
    },

    /// The input exceeds the configured size bound.
    #[error("image {width}x{height} exceeds the maximum accepted dimension {max}")]
    ImageTooLarge {
        /// Input width in pixels.
        width: u32,
        /// Input height in pixels.
        height: u32,
        /// Configured bound on the long axis.
        max: u32,
    },

    /// Encoding the depth visualization failed.
    #[error("failed to encode depth visualization: {0}")]
    Encode(String),
}

/// Serde-compatible proxy for `PipelineError`.
///
/// `image::ImageError` does not implement serde, so the `ImageDecode`
/// variant stores its `Display` string instead. A deserialized decode
/// error cannot reconstruct the original typed error; the message is
/// preserved in a text-only variant.
#[derive(Serialize, Deserialize)]
enum PipelineErrorProxy {
    ImageDecode(String),
    EmptyInput,
    InvalidRegionCount(u32),
    InvalidBlurParams(String),
    DimensionMismatch(Dimensions, Dimensions),
    ImageTooLarge(u32, u32, u32),
    Encode(String),
}

impl Serialize for PipelineError {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let proxy = match self {
            Self::ImageDecode(e) => PipelineErrorProxy::ImageDecode(e.to_string()),
            Self::EmptyInput => PipelineErrorProxy::EmptyInput,
            Self::InvalidRegionCount { requested } => {
                PipelineErrorProxy::InvalidRegionCount(*requested)
            }
            Self::InvalidBlurParams(s) => PipelineErrorProxy::InvalidBlurParams(s.clone()),
            Self::DimensionMismatch { expected, actual } => {
                PipelineErrorProxy::DimensionMismatch(*expected, *actual)
            }
            Self::ImageTooLarge { width, height, max } => {
                PipelineErrorProxy::ImageTooLarge(*width, *height, *max)
            }
            Self::Encode(s) => PipelineErrorProxy::Encode(s.clone()),
        };
        proxy.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PipelineError {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let proxy = PipelineErrorProxy::deserialize(deserializer)?;
        Ok(match proxy {
            // The original image::ImageError cannot be reconstructed;
            // preserve the message in the Encode variant's string form.
            PipelineErrorProxy::ImageDecode(msg) => {
                Self::Encode(format!("image decode error: {msg}"))
            }
            PipelineErrorProxy::EmptyInput => Self::EmptyInput,
            PipelineErrorProxy::InvalidRegionCount(requested) => {
                Self::InvalidRegionCount { requested }
            }
            PipelineErrorProxy::InvalidBlurParams(s) => Self::InvalidBlurParams(s),
            PipelineErrorProxy::DimensionMismatch(expected, actual) => {
                Self::DimensionMismatch { expected, actual }
            }
            PipelineErrorProxy::ImageTooLarge(width, height, max) => {
                Self::ImageTooLarge { width, height, max }
            }
            PipelineErrorProxy::Encode(s) => Self::Encode(s),
        })
    }
}
